//! Euclidean distance model.
//!
//! Distances are symmetric, so only the strict lower triangle is stored:
//! the entry for `(i, j)` lives at `(max(i, j), min(i, j))` and the diagonal
//! is implicitly zero.

use crate::error::{Result, TspError};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A city location in the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl City {
    pub fn new(x: f64, y: f64) -> Self {
        City { x, y }
    }

    /// Euclidean distance to another city
    #[inline]
    pub fn distance_to(&self, other: &City) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for City {
    fn from((x, y): (f64, f64)) -> Self {
        City { x, y }
    }
}

/// Read-only symmetric distance matrix over `n` cities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    size: usize,
    lower: Vec<f64>,
}

impl DistanceMatrix {
    /// Build the matrix from city coordinates.
    ///
    /// A tour needs at least two cities, and every coordinate must be finite.
    pub fn build(cities: &[City]) -> Result<Self> {
        if cities.len() < 2 {
            return Err(TspError::InvalidInput(format!(
                "a tour needs at least 2 cities, got {}",
                cities.len()
            )));
        }
        if let Some(idx) = cities.iter().position(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(TspError::InvalidInput(format!(
                "city {} has a non-finite coordinate ({}, {})",
                idx, cities[idx].x, cities[idx].y
            )));
        }

        let n = cities.len();
        let mut lower = Vec::with_capacity(n * (n - 1) / 2);
        for i in 1..n {
            for j in 0..i {
                lower.push(cities[i].distance_to(&cities[j]));
            }
        }

        Ok(DistanceMatrix { size: n, lower })
    }

    /// Accept a pre-parsed full `n x n` matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if n < 2 {
            return Err(TspError::InvalidInput(format!(
                "a tour needs at least 2 cities, got {}",
                n
            )));
        }
        if let Some(i) = rows.iter().position(|row| row.len() != n) {
            return Err(TspError::InvalidInput(format!(
                "row {} has {} entries, expected {}",
                i,
                rows[i].len(),
                n
            )));
        }

        let mut lower = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            if rows[i][i] != 0.0 {
                return Err(TspError::InvalidInput(format!(
                    "distance({i}, {i}) must be 0, got {}",
                    rows[i][i]
                )));
            }
            for j in 0..i {
                let d = rows[i][j];
                if !d.is_finite() || d < 0.0 {
                    return Err(TspError::InvalidInput(format!(
                        "distance({}, {}) = {} is not a finite non-negative number",
                        i, j, d
                    )));
                }
                if (d - rows[j][i]).abs() > SYMMETRY_TOLERANCE {
                    return Err(TspError::InvalidInput(format!(
                        "matrix is not symmetric at ({}, {}): {} vs {}",
                        i, j, d, rows[j][i]
                    )));
                }
                lower.push(d);
            }
        }

        Ok(DistanceMatrix { size: n, lower })
    }

    /// Number of cities
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the distance between two cities
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return 0.0;
        }
        let (hi, lo) = if i > j { (i, j) } else { (j, i) };
        self.lower[hi * (hi - 1) / 2 + lo]
    }

    /// Nearest other city to `city`, scanning the full row.
    ///
    /// Ties resolve to the lowest index.
    pub fn nearest_neighbor(&self, city: usize) -> usize {
        (0..self.size)
            .filter(|&other| other != city)
            .min_by_key(|&other| (OrderedFloat(self.distance(city, other)), other))
            .unwrap_or(city)
    }

    /// Expand back into a full row-major matrix
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.size)
            .map(|i| (0..self.size).map(|j| self.distance(i, j)).collect())
            .collect()
    }

    /// Check the packed storage and its entries, used after deserializing a cache
    pub(crate) fn check_consistency(&self) -> Result<()> {
        let expected = self.size * self.size.saturating_sub(1) / 2;
        if self.size < 2 || self.lower.len() != expected {
            return Err(TspError::InvalidInput(format!(
                "distance matrix of size {} holds {} entries, expected {}",
                self.size,
                self.lower.len(),
                expected
            )));
        }
        if let Some(idx) = self.lower.iter().position(|d| !d.is_finite() || *d < 0.0) {
            return Err(TspError::InvalidInput(format!(
                "packed distance {} = {} is not a finite non-negative number",
                idx, self.lower[idx]
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_cities() -> Vec<City> {
        vec![
            City::new(0.0, 0.0),
            City::new(0.0, 4.0),
            City::new(3.0, 0.0),
            City::new(3.0, 4.0),
        ]
    }

    #[test]
    fn test_distance_calculation() {
        let dm = DistanceMatrix::build(&square_cities()).unwrap();

        assert_eq!(dm.len(), 4);
        assert!((dm.distance(0, 1) - 4.0).abs() < 1e-10);
        assert!((dm.distance(0, 2) - 3.0).abs() < 1e-10);
        assert!((dm.distance(0, 3) - 5.0).abs() < 1e-10);
        assert!((dm.distance(1, 2) - 5.0).abs() < 1e-10);
        assert!((dm.distance(1, 3) - 3.0).abs() < 1e-10);
        assert!((dm.distance(2, 3) - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_symmetry_and_zero_diagonal() {
        let cities: Vec<City> = (0..12)
            .map(|k| City::new((k * 7 % 11) as f64, (k * 5 % 13) as f64 * 0.5))
            .collect();
        let dm = DistanceMatrix::build(&cities).unwrap();

        for i in 0..cities.len() {
            assert_eq!(dm.distance(i, i), 0.0);
            for j in 0..cities.len() {
                assert_eq!(dm.distance(i, j), dm.distance(j, i));
            }
        }
    }

    #[test]
    fn test_too_few_cities() {
        assert!(matches!(DistanceMatrix::build(&[]), Err(TspError::InvalidInput(_))));
        assert!(matches!(
            DistanceMatrix::build(&[City::new(1.0, 1.0)]),
            Err(TspError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_finite_coordinate() {
        let cities = vec![City::new(0.0, 0.0), City::new(f64::NAN, 1.0)];
        assert!(matches!(DistanceMatrix::build(&cities), Err(TspError::InvalidInput(_))));
    }

    #[test]
    fn test_from_rows() {
        let dm = DistanceMatrix::build(&square_cities()).unwrap();
        let rebuilt = DistanceMatrix::from_rows(dm.to_rows()).unwrap();
        assert_eq!(dm, rebuilt);

        let asymmetric = vec![vec![0.0, 1.0], vec![2.0, 0.0]];
        assert!(matches!(
            DistanceMatrix::from_rows(asymmetric),
            Err(TspError::InvalidInput(_))
        ));

        let ragged = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(DistanceMatrix::from_rows(ragged), Err(TspError::InvalidInput(_))));
    }

    #[test]
    fn test_deserialized_matrix_is_checked() {
        let good: DistanceMatrix = serde_json::from_str(r#"{"size":3,"lower":[1.0,2.0,1.5]}"#).unwrap();
        assert!(good.check_consistency().is_ok());

        for bad in [
            r#"{"size":3,"lower":[1.0,2.0]}"#,
            r#"{"size":3,"lower":[1.0,-2.0,1.5]}"#,
            r#"{"size":1,"lower":[]}"#,
        ] {
            let dm: DistanceMatrix = serde_json::from_str(bad).unwrap();
            assert!(matches!(dm.check_consistency(), Err(TspError::InvalidInput(_))), "{}", bad);
        }
    }

    #[test]
    fn test_nearest_neighbor_ties_lowest_index() {
        // 1 and 2 are both at distance 1 from 0
        let cities = vec![
            City::new(0.0, 0.0),
            City::new(1.0, 0.0),
            City::new(0.0, 1.0),
            City::new(5.0, 5.0),
        ];
        let dm = DistanceMatrix::build(&cities).unwrap();

        assert_eq!(dm.nearest_neighbor(0), 1);
        assert_eq!(dm.nearest_neighbor(3), 1);
    }
}
