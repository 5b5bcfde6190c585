//! Heuristics module for the TSP.
//!
//! This module exports the construction, improvement and evolutionary
//! heuristics, plus [`Method`] and [`solve`] to run one of them by name.

pub mod construction;
pub mod local_search;
pub mod genetic;

pub use construction::*;
pub use local_search::*;
pub use genetic::*;

use crate::error::{Result, TspError};
use crate::instance::TspInstance;
use crate::route::Route;
use crate::solution::Solution;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Solving strategy selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Greedy,
    TwoOpt,
    Genetic,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Greedy, Method::TwoOpt, Method::Genetic];
}

impl FromStr for Method {
    type Err = TspError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greedy" => Ok(Method::Greedy),
            "2opt" | "two-opt" => Ok(Method::TwoOpt),
            "ga" | "genetic" => Ok(Method::Genetic),
            other => Err(TspError::InvalidInput(format!(
                "unknown method '{}' (expected greedy, 2opt or ga)",
                other
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Greedy => "greedy",
            Method::TwoOpt => "2opt",
            Method::Genetic => "ga",
        };
        write!(f, "{}", name)
    }
}

/// Knobs shared by [`solve`]
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Greedy start city, overriding the first city of the initial route
    pub start_city: Option<usize>,
    /// Genetic algorithm settings
    pub ga: GAConfig,
}

/// Run exactly one strategy on `instance`.
///
/// `initial_route` seeds the greedy start city and is the starting point of
/// 2-opt; the genetic algorithm ignores it and evolves a fresh population.
pub fn solve(
    method: Method,
    instance: &TspInstance,
    initial_route: &Route,
    options: &SolveOptions,
) -> Result<Solution> {
    let distances = &instance.distances;
    if initial_route.len() != distances.len() {
        return Err(TspError::InvalidRoute(format!(
            "initial route has {} cities, instance has {}",
            initial_route.len(),
            distances.len()
        )));
    }

    log::info!("Solving {} ({} cities) with {}", instance.name, distances.len(), method);
    let start = Instant::now();

    let mut solution = match method {
        Method::Greedy => {
            let start_city = options
                .start_city
                .or_else(|| initial_route.cities().first().copied())
                .unwrap_or(0);
            let heuristic = NearestNeighborHeuristic::new(start_city);
            let route = heuristic.construct(distances)?;
            Solution::from_route(distances, route, heuristic.name())?
        }
        Method::TwoOpt => {
            let search = TwoOptSearch::new();
            let mut route = initial_route.clone();
            let stats = search.run(distances, &mut route)?;
            let mut sol = Solution::from_route(distances, route, search.name())?;
            sol.iterations = Some(stats.passes);
            sol
        }
        Method::Genetic => {
            let mut ga = GeneticAlgorithm::new(distances, options.ga.clone())?;
            ga.run()?
        }
    };

    solution.computation_time = start.elapsed().as_secs_f64();
    Ok(solution)
}
