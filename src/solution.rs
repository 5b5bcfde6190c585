//! Solution record returned by every solving strategy.
//!
//! Wraps the best route found together with its total distance and some
//! bookkeeping about how it was obtained.

use crate::distance::DistanceMatrix;
use crate::error::Result;
use crate::route::Route;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Represents a solution to the TSP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// The tour as a permutation of city indices
    pub route: Route,
    /// Total length of the closed tour
    pub total_distance: f64,
    /// Algorithm that generated this solution
    pub algorithm: String,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of iterations (passes or generations, if applicable)
    pub iterations: Option<usize>,
}

impl Solution {
    /// Create a solution from a route
    pub fn from_route(distances: &DistanceMatrix, route: Route, algorithm: &str) -> Result<Self> {
        let total_distance = route.total_distance(distances)?;

        Ok(Solution {
            route,
            total_distance,
            algorithm: algorithm.to_string(),
            computation_time: 0.0,
            iterations: None,
        })
    }

    /// Recompute the total distance from the route
    pub fn validate(&mut self, distances: &DistanceMatrix) -> Result<()> {
        self.total_distance = self.route.total_distance(distances)?;
        Ok(())
    }

    /// Route as 1-based city numbers, one per line
    pub fn route_lines(&self) -> String {
        self.route
            .cities()
            .iter()
            .map(|city| (city + 1).to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Write the route file consumed by the grading scripts
    pub fn write_route_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.route_lines().as_bytes())?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the full solution as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({})", self.algorithm)?;
        writeln!(f, "  Distance: {:.2}", self.total_distance)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        if let Some(iter) = self.iterations {
            writeln!(f, "  Iterations: {}", iter)?;
        }
        writeln!(f, "  Route: {:?}", self.route.cities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::City;

    fn create_test_matrix() -> DistanceMatrix {
        DistanceMatrix::build(&[
            City::new(0.0, 0.0),
            City::new(0.0, 4.0),
            City::new(3.0, 0.0),
            City::new(3.0, 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_solution_creation() {
        let dm = create_test_matrix();
        let route = Route::new(vec![0, 2, 3, 1]).unwrap();
        let sol = Solution::from_route(&dm, route, "test").unwrap();

        assert!((sol.total_distance - 14.0).abs() < 1e-10);
        assert_eq!(sol.algorithm, "test");
        assert_eq!(sol.route_lines(), "1\n3\n4\n2");
    }

    #[test]
    fn test_json_round_trip_checks_route() {
        let dm = create_test_matrix();
        let sol = Solution::from_route(&dm, Route::new(vec![0, 2, 3, 1]).unwrap(), "test").unwrap();

        let parsed: Solution = serde_json::from_str(&sol.to_json().unwrap()).unwrap();
        assert_eq!(parsed.route, sol.route);

        let tampered = r#"{"route":[0,0,1,2],"total_distance":1.0,"algorithm":"x","computation_time":0.0,"iterations":null}"#;
        assert!(serde_json::from_str::<Solution>(tampered).is_err());
    }

    #[test]
    fn test_solution_rejects_foreign_route() {
        let dm = create_test_matrix();
        assert!(Solution::from_route(&dm, Route::identity(5), "test").is_err());
    }
}
