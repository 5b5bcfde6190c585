//! TSP Solver Library
//!
//! Heuristic solvers for the symmetric Euclidean Traveling Salesman Problem.
//!
//! # Features
//!
//! - Precomputed symmetric distance matrix built from 2D coordinates
//! - Greedy nearest-neighbor construction
//! - 2-opt local search (first improvement, runs to a local optimum)
//! - Elitist genetic algorithm with 2-opt based repair operators
//! - TSPLIB parsing and a JSON cache of coordinates and distances
//! - Benchmarking and SVG visualization tools
//!
//! # Example
//!
//! ```no_run
//! use tsp_solver::heuristics::{solve, Method, SolveOptions};
//! use tsp_solver::instance::TspInstance;
//! use tsp_solver::route::Route;
//!
//! // Load instance
//! let instance = TspInstance::load("berlin52.tsp").unwrap();
//!
//! // Evolve a tour with the genetic algorithm
//! let initial = Route::identity(instance.dimension());
//! let solution = solve(Method::Genetic, &instance, &initial, &SolveOptions::default()).unwrap();
//!
//! println!("Tour length: {:.2}", solution.total_distance);
//! ```

pub mod error;
pub mod distance;
pub mod route;
pub mod instance;
pub mod solution;
pub mod heuristics;
pub mod benchmark;
pub mod visualization;

pub use distance::{City, DistanceMatrix};
pub use error::{Result, TspError};
pub use instance::TspInstance;
pub use route::Route;
pub use solution::Solution;
