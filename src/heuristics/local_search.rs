//! Local search improvement heuristics for the TSP.
//!
//! The 2-opt search removes two edges `(i-1, i)` and `(j, j+1)` and reconnects
//! the tour by reversing `route[i..=j]`. Every accepted move strictly shortens
//! the tour, so repeated passes always terminate in a local optimum where no
//! crossing edges remain.

use crate::distance::DistanceMatrix;
use crate::error::{Result, TspError};
use crate::route::Route;

/// Minimum gain for a reversal to count as an improvement
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// Trait for local search improvement methods
pub trait LocalSearch {
    fn improve(&self, distances: &DistanceMatrix, route: &mut Route) -> Result<bool>;
    fn name(&self) -> &str;
}

/// Change in tour length caused by reversing `route[i..=j]` (negative is better).
///
/// Only the two boundary edges are compared; indices wrap around the tour.
#[inline]
pub fn reversal_delta(route: &Route, distances: &DistanceMatrix, i: usize, j: usize) -> f64 {
    let n = route.len();
    let before = route.city_at(i + n - 1);
    let first = route.city_at(i);
    let last = route.city_at(j);
    let after = route.city_at(j + 1);

    distances.distance(before, last) + distances.distance(first, after)
        - distances.distance(before, first)
        - distances.distance(last, after)
}

/// Whether `(i, j)` is a reversal that changes the tour's edge set.
///
/// Reversing the whole tour, or a single city, leaves every edge in place.
#[inline]
pub(crate) fn is_proper_reversal(n: usize, i: usize, j: usize) -> bool {
    n >= 4 && i < j && !(i == 0 && j == n - 1)
}

/// Progress of a 2-opt run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// A pass is in progress and has not changed the tour yet
    Scanning,
    /// The current pass accepted at least one reversal
    Improved,
    /// A full pass found nothing to improve
    Converged,
}

/// Summary of a 2-opt run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoOptStats {
    pub passes: usize,
    pub reversals: usize,
    pub state: SearchState,
}

/// 2-Opt Local Search
///
/// First improvement: each improving reversal is applied as soon as it is
/// found, and passes repeat until one of them makes no change.
#[derive(Debug, Clone, Default)]
pub struct TwoOptSearch;

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch
    }

    /// Improve `route` to a 2-opt local optimum and return it
    pub fn optimize(&self, mut route: Route, distances: &DistanceMatrix) -> Result<Route> {
        self.run(distances, &mut route)?;
        Ok(route)
    }

    /// Run passes until convergence, reporting how much work was done.
    ///
    /// Fails if the route does not cover exactly the cities of `distances`.
    pub fn run(&self, distances: &DistanceMatrix, route: &mut Route) -> Result<TwoOptStats> {
        let n = route.len();
        if n != distances.len() {
            return Err(TspError::InvalidRoute(format!(
                "route visits {} cities but the instance has {}",
                n,
                distances.len()
            )));
        }

        let mut stats = TwoOptStats {
            passes: 0,
            reversals: 0,
            state: SearchState::Scanning,
        };

        if n < 4 {
            stats.state = SearchState::Converged;
            return Ok(stats);
        }

        loop {
            stats.passes += 1;
            stats.state = SearchState::Scanning;

            for i in 0..n {
                for j in i + 1..n {
                    if !is_proper_reversal(n, i, j) {
                        continue;
                    }
                    if reversal_delta(route, distances, i, j) < -IMPROVEMENT_EPSILON {
                        route.reverse_segment(i, j);
                        stats.reversals += 1;
                        stats.state = SearchState::Improved;
                    }
                }
            }

            log::debug!(
                "[2-opt] pass {} done, {} reversals so far, length {:.3}",
                stats.passes,
                stats.reversals,
                route.length(distances)
            );

            if stats.state == SearchState::Scanning {
                stats.state = SearchState::Converged;
                break;
            }
        }

        log::info!(
            "[2-opt] converged after {} passes and {} reversals",
            stats.passes,
            stats.reversals
        );
        Ok(stats)
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, distances: &DistanceMatrix, route: &mut Route) -> Result<bool> {
        Ok(self.run(distances, route)?.reversals > 0)
    }

    fn name(&self) -> &str {
        "2-Opt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::City;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn create_test_matrix() -> DistanceMatrix {
        DistanceMatrix::build(&[
            City::new(0.0, 0.0),
            City::new(0.0, 4.0),
            City::new(3.0, 0.0),
            City::new(3.0, 4.0),
        ])
        .unwrap()
    }

    fn permutations(items: Vec<usize>) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut result = Vec::new();
        for k in 0..items.len() {
            let mut rest = items.clone();
            let head = rest.remove(k);
            for mut tail in permutations(rest) {
                tail.insert(0, head);
                result.push(tail);
            }
        }
        result
    }

    fn scattered_matrix(n: usize, seed: u64) -> DistanceMatrix {
        use rand::Rng;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let cities: Vec<City> = (0..n)
            .map(|_| City::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect();
        DistanceMatrix::build(&cities).unwrap()
    }

    #[test]
    fn test_two_opt() {
        let dm = create_test_matrix();
        let route = Route::new(vec![0, 1, 2, 3]).unwrap();

        let improved = TwoOptSearch::new().optimize(route, &dm).unwrap();
        assert!((improved.total_distance(&dm).unwrap() - 14.0).abs() < 1e-10);
    }

    #[test]
    fn test_two_opt_from_every_permutation() {
        let dm = create_test_matrix();
        let search = TwoOptSearch::new();

        for perm in permutations(vec![0, 1, 2, 3]) {
            let mut route = Route::new(perm.clone()).unwrap();
            let stats = search.run(&dm, &mut route).unwrap();

            assert_eq!(stats.state, SearchState::Converged);
            assert!(
                (route.total_distance(&dm).unwrap() - 14.0).abs() < 1e-10,
                "start {:?} ended at {:?}",
                perm,
                route.cities()
            );
        }
    }

    #[test]
    fn test_reversal_delta_matches_full_recomputation() {
        let dm = scattered_matrix(9, 3);
        let route = Route::new(vec![4, 1, 7, 0, 8, 2, 6, 3, 5]).unwrap();
        let base = route.total_distance(&dm).unwrap();

        for i in 0..9 {
            for j in i + 1..9 {
                if !is_proper_reversal(9, i, j) {
                    continue;
                }
                let mut moved = route.clone();
                moved.reverse_segment(i, j);
                let expected = moved.total_distance(&dm).unwrap() - base;
                assert!((reversal_delta(&route, &dm, i, j) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_converged_route_is_local_optimum() {
        let dm = scattered_matrix(40, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let start = Route::random(40, &mut rng);
        let start_length = start.total_distance(&dm).unwrap();

        let route = TwoOptSearch::new().optimize(start, &dm).unwrap();

        assert!(route.total_distance(&dm).unwrap() <= start_length);
        for i in 0..40 {
            for j in i + 1..40 {
                if is_proper_reversal(40, i, j) {
                    assert!(reversal_delta(&route, &dm, i, j) >= -IMPROVEMENT_EPSILON);
                }
            }
        }
    }

    #[test]
    fn test_second_run_makes_no_change() {
        let dm = scattered_matrix(25, 8);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut route = Route::random(25, &mut rng);
        let search = TwoOptSearch::new();

        assert!(search.improve(&dm, &mut route).unwrap());
        let stats = search.run(&dm, &mut route).unwrap();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.reversals, 0);
    }

    #[test]
    fn test_small_tours_are_already_converged() {
        let dm = DistanceMatrix::build(&[
            City::new(0.0, 0.0),
            City::new(1.0, 0.0),
            City::new(0.0, 1.0),
        ])
        .unwrap();
        let mut route = Route::new(vec![2, 0, 1]).unwrap();

        let stats = TwoOptSearch::new().run(&dm, &mut route).unwrap();
        assert_eq!(stats.state, SearchState::Converged);
        assert_eq!(stats.reversals, 0);
        assert_eq!(route.cities(), &[2, 0, 1]);
    }

    #[test]
    fn test_route_must_match_matrix() {
        let dm = create_test_matrix();
        let search = TwoOptSearch::new();

        let longer = Route::identity(8);
        assert!(matches!(search.optimize(longer, &dm), Err(TspError::InvalidRoute(_))));

        let mut shorter = Route::new(vec![2, 0, 1]).unwrap();
        assert!(matches!(search.run(&dm, &mut shorter), Err(TspError::InvalidRoute(_))));
        assert!(matches!(search.improve(&dm, &mut shorter), Err(TspError::InvalidRoute(_))));
        assert_eq!(shorter.cities(), &[2, 0, 1]);
    }
}
