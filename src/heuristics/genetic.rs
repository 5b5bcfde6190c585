//! Genetic Algorithm for the TSP.
//!
//! This module implements a steady, elitist genetic algorithm with:
//! - Elitism: the best 10% (at least one) of each generation is carried over unchanged
//! - Biased parent selection: 80% of parents come from the best 20% of the generation
//! - Repair operators derived from 2-opt (untie, point switch, greedy point)
//! - A pure mutation operator (random switch) for diversity
//! - Termination on stagnation of the best distance
//!
//! Every child is built from a copy of its parent, so the parent generation is
//! never modified while the child generation is assembled.
//!
//! Random draws for one child happen in a fixed order: the operator draw, the
//! parent pool draw, the parent index draw, then the operator's own draws
//! (two per trial for untie, one per trial for point switch, one for greedy
//! point, two for random switch).

use crate::distance::DistanceMatrix;
use crate::error::{Result, TspError};
use crate::heuristics::local_search::{is_proper_reversal, reversal_delta, IMPROVEMENT_EPSILON};
use crate::route::Route;
use crate::solution::Solution;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Smallest population that keeps the elite, top and bottom pools non-empty
pub const MIN_POPULATION: usize = 3;

/// Individual in the genetic algorithm population
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    /// The tour representation
    pub route: Route,
    /// Total distance of the tour, cached when the individual is created
    pub total_distance: f64,
}

impl Individual {
    pub fn new(route: Route, distances: &DistanceMatrix) -> Self {
        let total_distance = route.length(distances);
        Individual { route, total_distance }
    }
}

/// Operators used to produce a child from one parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Random 2-opt trials that remove crossing edges
    Untie,
    /// Random adjacent swaps that resolve zigzags
    PointSwitch,
    /// Move one city next to its nearest neighbor
    GreedyPoint,
    /// Swap two random cities without any check
    RandomSwitch,
}

impl Operator {
    pub const ALL: [Operator; 4] = [
        Operator::Untie,
        Operator::PointSwitch,
        Operator::GreedyPoint,
        Operator::RandomSwitch,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Untie => "untie",
            Operator::PointSwitch => "point_switch",
            Operator::GreedyPoint => "greedy_point",
            Operator::RandomSwitch => "random_switch",
        }
    }

    fn index(&self) -> usize {
        match self {
            Operator::Untie => 0,
            Operator::PointSwitch => 1,
            Operator::GreedyPoint => 2,
            Operator::RandomSwitch => 3,
        }
    }
}

/// Relative probability of each operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorWeights {
    pub untie: f64,
    pub point_switch: f64,
    pub greedy_point: f64,
    pub random_switch: f64,
}

impl Default for OperatorWeights {
    fn default() -> Self {
        OperatorWeights {
            untie: 0.85,
            point_switch: 0.05,
            greedy_point: 0.05,
            random_switch: 0.05,
        }
    }
}

impl OperatorWeights {
    fn weight(&self, op: Operator) -> f64 {
        match op {
            Operator::Untie => self.untie,
            Operator::PointSwitch => self.point_switch,
            Operator::GreedyPoint => self.greedy_point,
            Operator::RandomSwitch => self.random_switch,
        }
    }
}

/// Discrete distribution over operators, sampled from a uniform draw in `[0, 1)`
#[derive(Debug, Clone)]
pub struct OperatorTable {
    thresholds: Vec<(Operator, f64)>,
}

impl OperatorTable {
    pub fn new(weights: &OperatorWeights) -> Result<Self> {
        let mut total = 0.0;
        for op in Operator::ALL {
            let w = weights.weight(op);
            if !w.is_finite() || w < 0.0 {
                return Err(TspError::InvalidInput(format!(
                    "weight of {} must be a finite non-negative number, got {}",
                    op.name(),
                    w
                )));
            }
            total += w;
        }
        if total <= 0.0 {
            return Err(TspError::InvalidInput(
                "at least one operator needs a positive weight".to_string(),
            ));
        }

        let mut cumulative = 0.0;
        let thresholds = Operator::ALL
            .iter()
            .filter(|op| weights.weight(**op) > 0.0)
            .map(|&op| {
                cumulative += weights.weight(op) / total;
                (op, cumulative)
            })
            .collect();

        Ok(OperatorTable { thresholds })
    }

    /// Operator selected by the uniform draw `r`
    pub fn pick(&self, r: f64) -> Operator {
        self.thresholds
            .iter()
            .find(|(_, upper)| r < *upper)
            .or_else(|| self.thresholds.last())
            .map(|(op, _)| *op)
            .unwrap_or(Operator::Untie)
    }
}

/// Genetic Algorithm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GAConfig {
    /// Population size (default: max(3, n / 10))
    pub population_size: Option<usize>,
    /// Generations without improvement before stopping (default: population size)
    pub patience: Option<usize>,
    /// Share of each generation copied unchanged
    pub elite_fraction: f64,
    /// Share of the generation forming the preferred parent pool
    pub top_fraction: f64,
    /// Probability of drawing a parent from the preferred pool
    pub top_pick_probability: f64,
    /// Repair trials per individual of the population (untie, point switch)
    pub trials_per_individual: usize,
    /// Operator probabilities
    pub operator_weights: OperatorWeights,
    /// Random seed
    pub seed: u64,
    /// Hard cap on generations (optional)
    pub max_generations: Option<usize>,
    /// Time limit in seconds (optional)
    pub time_limit: Option<f64>,
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfig {
            population_size: None,
            patience: None,
            elite_fraction: 0.1,
            top_fraction: 0.2,
            top_pick_probability: 0.8,
            trials_per_individual: 10,
            operator_weights: OperatorWeights::default(),
            seed: 42,
            max_generations: None,
            time_limit: None,
        }
    }
}

impl GAConfig {
    /// Population size used for an instance with `n` cities
    pub fn population_for(&self, n: usize) -> usize {
        match self.population_size {
            Some(size) if size < MIN_POPULATION => {
                log::warn!(
                    "[GA] population size {} raised to the minimum of {}",
                    size,
                    MIN_POPULATION
                );
                MIN_POPULATION
            }
            Some(size) => size,
            None => (n / 10).max(MIN_POPULATION),
        }
    }

    /// Stagnation threshold for a given population size
    pub fn patience_for(&self, population: usize) -> usize {
        self.patience.unwrap_or(population).max(1)
    }

    /// Number of individuals copied unchanged into the next generation
    pub fn elite_count(&self, population: usize) -> usize {
        ((population as f64 * self.elite_fraction) as usize).clamp(1, population.max(1))
    }
}

/// A generation kept sorted by ascending total distance (best first)
#[derive(Debug, Clone, Default)]
pub struct Generation {
    individuals: Vec<Individual>,
}

impl Generation {
    pub fn new() -> Self {
        Generation { individuals: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Generation {
            individuals: Vec::with_capacity(capacity),
        }
    }

    /// Insert while keeping the order; equal distances keep insertion order
    pub fn insert(&mut self, individual: Individual) {
        let pos = self
            .individuals
            .partition_point(|existing| existing.total_distance <= individual.total_distance);
        self.individuals.insert(pos, individual);
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn best(&self) -> Option<&Individual> {
        self.individuals.first()
    }

    /// The `count` best individuals
    pub fn elites(&self, count: usize) -> &[Individual] {
        &self.individuals[..count.min(self.individuals.len())]
    }

    /// Pick a parent: with probability `top_pick_probability` from the best
    /// `top_fraction` of the generation (at least one), otherwise from the rest.
    ///
    /// When the chosen pool is empty the whole generation is used instead.
    pub fn choose_parent<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        top_fraction: f64,
        top_pick_probability: f64,
    ) -> Result<&Individual> {
        if self.individuals.is_empty() {
            return Err(TspError::DegenerateGeneration(0));
        }

        let len = self.individuals.len();
        let top = ((len as f64 * top_fraction) as usize).clamp(1, len);
        let pool = if rng.gen::<f64>() < top_pick_probability {
            &self.individuals[..top]
        } else {
            &self.individuals[top..]
        };
        let pool = if pool.is_empty() { &self.individuals[..] } else { pool };

        Ok(&pool[rng.gen_range(0..pool.len())])
    }
}

/// Random 2-opt trials on a copy of `parent`: each trial draws two positions
/// and reverses the segment between them if that shortens the tour.
pub fn untie<R: Rng + ?Sized>(
    parent: &Route,
    distances: &DistanceMatrix,
    trials: usize,
    rng: &mut R,
) -> Route {
    let mut child = parent.clone();
    let n = child.len();
    if n < 4 {
        return child;
    }

    for _ in 0..trials {
        let a = rng.gen_range(0..n);
        let b = rng.gen_range(0..n);
        let (i, j) = if a < b { (a, b) } else { (b, a) };
        if !is_proper_reversal(n, i, j) {
            continue;
        }
        if reversal_delta(&child, distances, i, j) < -IMPROVEMENT_EPSILON {
            child.reverse_segment(i, j);
        }
    }

    child
}

/// Like [`untie`] but restricted to swapping neighbouring positions.
///
/// Position `n - 1` pairs with position `0`, so the two cities around the
/// closing edge can be exchanged too.
pub fn point_switch<R: Rng + ?Sized>(
    parent: &Route,
    distances: &DistanceMatrix,
    trials: usize,
    rng: &mut R,
) -> Route {
    let mut child = parent.clone();
    let n = child.len();
    if n < 4 {
        return child;
    }

    for _ in 0..trials {
        let i = rng.gen_range(0..n);
        if i == n - 1 {
            // Same edge change as reversing everything between the two ends
            if reversal_delta(&child, distances, 1, n - 2) < -IMPROVEMENT_EPSILON {
                child.swap(0, n - 1);
            }
        } else if reversal_delta(&child, distances, i, i + 1) < -IMPROVEMENT_EPSILON {
            child.reverse_segment(i, i + 1);
        }
    }

    child
}

/// Move a random city directly before or after its nearest neighbor, keeping
/// whichever of the parent and the two candidates is shortest.
pub fn greedy_point<R: Rng + ?Sized>(parent: &Route, distances: &DistanceMatrix, rng: &mut R) -> Route {
    let n = parent.len();
    let pos = rng.gen_range(0..n);
    let city = parent.cities()[pos];
    let neighbour = distances.nearest_neighbor(city);

    // Routes are permutations, so the first occurrence is the only one
    let Some(neighbour_pos) = parent.position(neighbour) else {
        return parent.clone();
    };
    let target = if neighbour_pos > pos { neighbour_pos - 1 } else { neighbour_pos };

    let mut before = parent.clone();
    before.relocate(pos, target);
    let mut after = parent.clone();
    after.relocate(pos, target + 1);

    let mut best = parent.clone();
    let mut best_length = parent.length(distances);
    for candidate in [before, after] {
        let length = candidate.length(distances);
        if length < best_length {
            best_length = length;
            best = candidate;
        }
    }

    best
}

/// Swap two uniformly random positions
pub fn random_switch<R: Rng + ?Sized>(parent: &Route, rng: &mut R) -> Route {
    let mut child = parent.clone();
    let n = child.len();
    let i = rng.gen_range(0..n);
    let j = rng.gen_range(0..n);
    child.swap(i, j);
    child
}

/// Apply one operator to a parent route
pub fn apply_operator<R: Rng + ?Sized>(
    op: Operator,
    parent: &Route,
    distances: &DistanceMatrix,
    trials: usize,
    rng: &mut R,
) -> Route {
    match op {
        Operator::Untie => untie(parent, distances, trials, rng),
        Operator::PointSwitch => point_switch(parent, distances, trials, rng),
        Operator::GreedyPoint => greedy_point(parent, distances, rng),
        Operator::RandomSwitch => random_switch(parent, rng),
    }
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm<'a> {
    config: GAConfig,
    distances: &'a DistanceMatrix,
    operators: OperatorTable,
    rng: ChaCha8Rng,
    population_size: usize,
    generation: usize,
    no_improve_count: usize,
    history: Vec<f64>,
    operator_counts: [usize; 4],
}

impl<'a> GeneticAlgorithm<'a> {
    pub fn new(distances: &'a DistanceMatrix, config: GAConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(distances, config, rng)
    }

    /// Use an explicit random source instead of seeding from the config
    pub fn with_rng(distances: &'a DistanceMatrix, config: GAConfig, rng: ChaCha8Rng) -> Result<Self> {
        let operators = OperatorTable::new(&config.operator_weights)?;
        let population_size = config.population_for(distances.len());

        Ok(GeneticAlgorithm {
            config,
            distances,
            operators,
            rng,
            population_size,
            generation: 0,
            no_improve_count: 0,
            history: Vec::new(),
            operator_counts: [0; 4],
        })
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Random routes inserted in order of distance
    pub fn create_first_generation(&mut self) -> Generation {
        let n = self.distances.len();
        let mut generation = Generation::with_capacity(self.population_size);

        for _ in 0..self.population_size {
            let route = Route::random(n, &mut self.rng);
            generation.insert(Individual::new(route, self.distances));
        }

        generation
    }

    /// Build the next generation: elites first, then one child per operator draw
    pub fn create_child_generation(&mut self, parent_generation: &Generation) -> Result<Generation> {
        let population = self.population_size;
        let elites = self.config.elite_count(population);
        let trials = self.config.trials_per_individual * population;

        let mut child_generation = Generation::with_capacity(population);
        for elite in parent_generation.elites(elites) {
            child_generation.insert(elite.clone());
        }

        while child_generation.len() < population {
            let op = self.operators.pick(self.rng.gen::<f64>());
            let parent = parent_generation.choose_parent(
                &mut self.rng,
                self.config.top_fraction,
                self.config.top_pick_probability,
            )?;

            let child = apply_operator(op, &parent.route, self.distances, trials, &mut self.rng);
            self.operator_counts[op.index()] += 1;
            child_generation.insert(Individual::new(child, self.distances));
        }

        Ok(child_generation)
    }

    /// Run the genetic algorithm until the best distance stagnates
    pub fn run(&mut self) -> Result<Solution> {
        let start = Instant::now();
        let patience = self.config.patience_for(self.population_size);

        let mut parent_generation = self.create_first_generation();
        let mut best_distance = parent_generation
            .best()
            .map(|ind| ind.total_distance)
            .ok_or(TspError::DegenerateGeneration(0))?;
        self.history.push(best_distance);

        log::info!(
            "[GA] {} cities, population {}, patience {}, initial best {:.3}",
            self.distances.len(),
            self.population_size,
            patience,
            best_distance
        );

        while self.no_improve_count < patience {
            if let Some(max) = self.config.max_generations {
                if self.generation >= max {
                    log::info!("[GA] generation cap {} reached", max);
                    break;
                }
            }
            if let Some(limit) = self.config.time_limit {
                if start.elapsed().as_secs_f64() >= limit {
                    log::info!("[GA] time limit of {:.1}s reached", limit);
                    break;
                }
            }

            let child_generation = self.create_child_generation(&parent_generation)?;
            let child_best = child_generation
                .best()
                .map(|ind| ind.total_distance)
                .ok_or(TspError::DegenerateGeneration(0))?;

            if child_best < best_distance {
                best_distance = child_best;
                self.no_improve_count = 0;
            } else {
                self.no_improve_count += 1;
            }

            parent_generation = child_generation;
            self.generation += 1;
            self.history.push(best_distance);

            log::debug!(
                "[GA] Gen {}  Best {:.3}  Stagnation {}/{}  Elapsed {:.2}s",
                self.generation,
                best_distance,
                self.no_improve_count,
                patience,
                start.elapsed().as_secs_f64()
            );
        }

        let best = parent_generation
            .best()
            .ok_or(TspError::DegenerateGeneration(0))?;

        log::info!(
            "[GA] finished after {} generations, best {:.3}, operators used: {}",
            self.generation,
            best.total_distance,
            self.operator_usage()
                .iter()
                .map(|(op, count)| format!("{}={}", op.name(), count))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut solution = Solution::from_route(self.distances, best.route.clone(), "GeneticAlgorithm")?;
        solution.computation_time = start.elapsed().as_secs_f64();
        solution.iterations = Some(self.generation);

        Ok(solution)
    }

    /// Best distance after each generation, starting with the initial one
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Get current generation
    pub fn current_generation(&self) -> usize {
        self.generation
    }

    /// How many children each operator produced so far
    pub fn operator_usage(&self) -> Vec<(Operator, usize)> {
        Operator::ALL
            .iter()
            .map(|&op| (op, self.operator_counts[op.index()]))
            .collect()
    }
}

/// Evolve a population over the `n` cities of `distances` and return the best tour.
pub fn evolve(distances: &DistanceMatrix, n: usize, config: GAConfig) -> Result<(Route, f64)> {
    if n != distances.len() {
        return Err(TspError::InvalidInput(format!(
            "asked for {} cities but the distance matrix has {}",
            n,
            distances.len()
        )));
    }

    let mut ga = GeneticAlgorithm::new(distances, config)?;
    let solution = ga.run()?;
    Ok((solution.route, solution.total_distance))
}
