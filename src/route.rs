//! Route representation.
//!
//! A route is a permutation of all city indices and is implicitly closed:
//! the salesman returns from the last city to the first.

use crate::distance::DistanceMatrix;
use crate::error::{Result, TspError};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// A closed tour visiting every city exactly once
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Route {
    cities: Vec<usize>,
}

impl Route {
    /// Create a route from a city sequence, checking that it is a permutation of `0..len`
    pub fn new(cities: Vec<usize>) -> Result<Self> {
        check_permutation(&cities, cities.len())?;
        Ok(Route { cities })
    }

    /// Uniformly random permutation of `0..n`
    pub fn random<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let mut cities: Vec<usize> = (0..n).collect();
        cities.shuffle(rng);
        Route { cities }
    }

    /// The identity tour `0, 1, ..., n-1`
    pub fn identity(n: usize) -> Self {
        Route { cities: (0..n).collect() }
    }

    pub fn cities(&self) -> &[usize] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.cities
    }

    /// City at a position, wrapping around the tour
    #[inline]
    pub fn city_at(&self, pos: usize) -> usize {
        self.cities[pos % self.cities.len()]
    }

    /// First position holding `city`
    pub fn position(&self, city: usize) -> Option<usize> {
        self.cities.iter().position(|&c| c == city)
    }

    /// Total distance of the closed tour.
    ///
    /// Fails if the route does not cover exactly the cities of `distances`.
    pub fn total_distance(&self, distances: &DistanceMatrix) -> Result<f64> {
        if self.cities.len() != distances.len() {
            return Err(TspError::InvalidRoute(format!(
                "route visits {} cities but the instance has {}",
                self.cities.len(),
                distances.len()
            )));
        }
        Ok(self.length(distances))
    }

    /// Tour length without the size check, for routes already known to match the matrix
    pub(crate) fn length(&self, distances: &DistanceMatrix) -> f64 {
        tour_length(&self.cities, distances)
    }

    /// Reverse the segment `[i..=j]`
    pub fn reverse_segment(&mut self, i: usize, j: usize) {
        self.cities[i..=j].reverse();
    }

    /// Exchange the cities at two positions
    pub fn swap(&mut self, i: usize, j: usize) {
        self.cities.swap(i, j);
    }

    /// Remove the city at `from` and reinsert it so that it ends up at position `to`
    pub fn relocate(&mut self, from: usize, to: usize) {
        let city = self.cities.remove(from);
        self.cities.insert(to, city);
    }
}

impl TryFrom<Vec<usize>> for Route {
    type Error = TspError;

    fn try_from(cities: Vec<usize>) -> Result<Self> {
        Route::new(cities)
    }
}

impl From<Route> for Vec<usize> {
    fn from(route: Route) -> Self {
        route.cities
    }
}

impl AsRef<[usize]> for Route {
    fn as_ref(&self) -> &[usize] {
        &self.cities
    }
}

/// Total distance of a closed tour given as a plain index sequence.
///
/// The sequence must be a permutation of `0..distances.len()`; duplicates,
/// missing or out-of-range indices are reported instead of being mis-scored.
pub fn total_distance(route: &[usize], distances: &DistanceMatrix) -> Result<f64> {
    check_permutation(route, distances.len())?;
    Ok(tour_length(route, distances))
}

fn tour_length(route: &[usize], distances: &DistanceMatrix) -> f64 {
    if route.len() < 2 {
        return 0.0;
    }

    let mut length = 0.0;
    for pair in route.windows(2) {
        length += distances.distance(pair[0], pair[1]);
    }

    length + distances.distance(route[route.len() - 1], route[0])
}

fn check_permutation(route: &[usize], n: usize) -> Result<()> {
    if route.len() != n {
        return Err(TspError::InvalidRoute(format!(
            "route has {} entries, expected {}",
            route.len(),
            n
        )));
    }

    let mut seen = vec![false; n];
    for &city in route {
        if city >= n {
            return Err(TspError::InvalidRoute(format!(
                "city {} is out of range 0..{}",
                city, n
            )));
        }
        if seen[city] {
            return Err(TspError::InvalidRoute(format!("city {} appears twice", city)));
        }
        seen[city] = true;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::City;
    use rand_chacha::ChaCha8Rng;

    fn square_matrix() -> DistanceMatrix {
        DistanceMatrix::build(&[
            City::new(0.0, 0.0),
            City::new(0.0, 4.0),
            City::new(3.0, 0.0),
            City::new(3.0, 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_total_distance_includes_closing_edge() {
        let dm = square_matrix();

        // 0 -> 2 -> 3 -> 1 -> 0 = 3 + 4 + 3 + 4
        assert!((total_distance(&[0, 2, 3, 1], &dm).unwrap() - 14.0).abs() < 1e-10);
        // 0 -> 1 -> 2 -> 3 -> 0 = 4 + 5 + 4 + 5
        assert!((total_distance(&[0, 1, 2, 3], &dm).unwrap() - 18.0).abs() < 1e-10);
    }

    #[test]
    fn test_total_distance_rejects_non_permutations() {
        let dm = square_matrix();

        assert!(matches!(total_distance(&[0, 1, 1, 3], &dm), Err(TspError::InvalidRoute(_))));
        assert!(matches!(total_distance(&[0, 1, 2], &dm), Err(TspError::InvalidRoute(_))));
        assert!(matches!(total_distance(&[0, 1, 2, 4], &dm), Err(TspError::InvalidRoute(_))));
        assert!(matches!(Route::new(vec![2, 2, 0]), Err(TspError::InvalidRoute(_))));
    }

    #[test]
    fn test_route_size_mismatch() {
        let dm = square_matrix();
        let route = Route::identity(3);
        assert!(matches!(route.total_distance(&dm), Err(TspError::InvalidRoute(_))));
    }

    #[test]
    fn test_random_route_is_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for n in [2, 5, 50] {
            let route = Route::random(n, &mut rng);
            let mut sorted = route.cities().to_vec();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_random_route_reaches_every_permutation() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut counts = std::collections::HashMap::new();
        for _ in 0..6000 {
            *counts.entry(Route::random(3, &mut rng)).or_insert(0usize) += 1;
        }

        assert_eq!(counts.len(), 6);
        for &count in counts.values() {
            assert!(count > 800 && count < 1200, "skewed shuffle: {}", count);
        }
    }

    #[test]
    fn test_mutations_preserve_permutation() {
        let mut route = Route::identity(6);
        route.reverse_segment(1, 4);
        assert_eq!(route.cities(), &[0, 4, 3, 2, 1, 5]);

        route.swap(0, 5);
        assert_eq!(route.cities(), &[5, 4, 3, 2, 1, 0]);

        route.relocate(0, 3);
        assert_eq!(route.cities(), &[4, 3, 2, 5, 1, 0]);
        assert!(Route::new(route.into_vec()).is_ok());
    }

    #[test]
    fn test_serde_validates() {
        let route: Route = serde_json::from_str("[2, 0, 1]").unwrap();
        assert_eq!(route.position(1), Some(2));
        assert!(serde_json::from_str::<Route>("[0, 0, 1]").is_err());
    }
}
