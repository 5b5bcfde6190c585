use crate::distance::DistanceMatrix;
use crate::error::{Result, TspError};
use crate::route::Route;
use ordered_float::OrderedFloat;

pub trait ConstructionHeuristic {
    fn construct(&self, distances: &DistanceMatrix) -> Result<Route>;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly visiting the nearest unvisited city.
/// Deterministic for a given start city; it stops at a local optimum and
/// generally does not find the shortest tour.
pub struct NearestNeighborHeuristic {
    pub start_city: usize,
}

impl NearestNeighborHeuristic {
    pub fn new(start_city: usize) -> Self {
        NearestNeighborHeuristic { start_city }
    }
}

impl Default for NearestNeighborHeuristic {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, distances: &DistanceMatrix) -> Result<Route> {
        nearest_neighbor_tour(self.start_city, distances, distances.len())
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

/// Greedy tour from `start_city` over the `n` cities of `distances`.
///
/// Distance ties go to the lowest city index.
pub fn nearest_neighbor_tour(start_city: usize, distances: &DistanceMatrix, n: usize) -> Result<Route> {
    if n != distances.len() {
        return Err(TspError::InvalidInput(format!(
            "asked for {} cities but the distance matrix has {}",
            n,
            distances.len()
        )));
    }
    if start_city >= n {
        return Err(TspError::InvalidInput(format!(
            "start city {} is out of range 0..{}",
            start_city, n
        )));
    }

    let mut tour = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    tour.push(start_city);
    visited[start_city] = true;

    let mut current = start_city;
    while tour.len() < n {
        let next = (0..n)
            .filter(|&city| !visited[city])
            .min_by_key(|&city| (OrderedFloat(distances.distance(current, city)), city))
            .ok_or_else(|| TspError::InvalidInput("ran out of unvisited cities".to_string()))?;

        tour.push(next);
        visited[next] = true;
        current = next;
    }

    Route::new(tour)
}
