//! Benchmarking and experimentation module for the TSP solvers.
//!
//! Provides tools for running repeated experiments, collecting statistics,
//! and comparing the greedy, 2-opt and genetic strategies.

use crate::error::Result;
use crate::heuristics::genetic::GAConfig;
use crate::heuristics::{solve, Method, SolveOptions};
use crate::instance::TspInstance;
use crate::route::Route;

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Result of running a single algorithm on an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResult {
    /// Algorithm name
    pub algorithm: String,
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Run number, starting at 0
    pub run: usize,
    /// Seed used for this run
    pub seed: u64,
    /// Tour length
    pub distance: f64,
    /// Computation time in seconds
    pub time: f64,
    /// Number of iterations (if applicable)
    pub iterations: Option<usize>,
}

/// Aggregated statistics for an algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmStatistics {
    /// Algorithm name
    pub algorithm: String,
    /// Number of runs aggregated
    pub num_runs: usize,
    /// Average tour length
    pub avg_distance: f64,
    /// Best tour length
    pub best_distance: f64,
    /// Worst tour length
    pub worst_distance: f64,
    /// Standard deviation of the tour length
    pub std_distance: f64,
    /// Average time
    pub avg_time: f64,
    /// Total time
    pub total_time: f64,
    /// Average gap to the best tour found on the same instance, in percent
    pub avg_gap: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Number of runs per algorithm
    pub num_runs: usize,
    /// Seed of the first run; run `k` uses `seed + k`, wrapping at `u64::MAX`
    pub seed: u64,
    /// Genetic algorithm settings (the seed is replaced per run)
    pub ga: GAConfig,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            num_runs: 5,
            seed: 0,
            ga: GAConfig::default(),
            show_progress: true,
        }
    }
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<AlgorithmResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
        }
    }

    /// Run every method `num_runs` times on an instance.
    ///
    /// Greedy starts from city `seed % n`, 2-opt from a random tour drawn with
    /// `seed`, and the genetic algorithm is seeded with `seed`.
    pub fn run(&mut self, instance: &TspInstance) -> Result<()> {
        log::info!("Running benchmark on instance: {}", instance.name);

        let n = instance.dimension();
        let total = (self.config.num_runs * Method::ALL.len()) as u64;
        let progress = self.progress_bar(total, &instance.name);

        for method in Method::ALL {
            for run in 0..self.config.num_runs {
                let seed = self.config.seed.wrapping_add(run as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let initial = match method {
                    Method::TwoOpt => Route::random(n, &mut rng),
                    _ => Route::identity(n),
                };
                let options = SolveOptions {
                    start_city: Some((seed % n as u64) as usize),
                    ga: GAConfig {
                        seed,
                        ..self.config.ga.clone()
                    },
                };

                progress.set_message(format!("{} run {}", method, run));
                let solution = solve(method, instance, &initial, &options)?;

                self.results.push(AlgorithmResult {
                    algorithm: solution.algorithm.clone(),
                    instance: instance.name.clone(),
                    dimension: n,
                    run,
                    seed,
                    distance: solution.total_distance,
                    time: solution.computation_time,
                    iterations: solution.iterations,
                });
                progress.inc(1);
            }
        }

        progress.finish_and_clear();
        Ok(())
    }

    /// Run the benchmark on multiple instances, one after the other
    pub fn run_on_instances(&mut self, instances: &[TspInstance]) -> Result<()> {
        for (i, instance) in instances.iter().enumerate() {
            log::info!(
                "[{}/{}] {} (n={})",
                i + 1,
                instances.len(),
                instance.name,
                instance.dimension()
            );
            self.run(instance)?;
        }
        Ok(())
    }

    fn progress_bar(&self, len: u64, prefix: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let style = ProgressStyle::default_bar()
            .template("{prefix:.cyan} [{bar:40.white}] {pos:>4}/{len:4} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(len);
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar
    }

    /// Compute statistics for each algorithm
    pub fn compute_statistics(&self) -> Vec<AlgorithmStatistics> {
        let mut best_per_instance: HashMap<&str, f64> = HashMap::new();
        for result in &self.results {
            let best = best_per_instance
                .entry(result.instance.as_str())
                .or_insert(result.distance);
            *best = best.min(result.distance);
        }

        let mut by_algorithm: HashMap<&str, Vec<&AlgorithmResult>> = HashMap::new();
        for result in &self.results {
            by_algorithm
                .entry(result.algorithm.as_str())
                .or_default()
                .push(result);
        }

        let mut statistics: Vec<AlgorithmStatistics> = by_algorithm
            .into_iter()
            .map(|(algorithm, results)| {
                let distances: Vec<f64> = results.iter().map(|r| r.distance).collect();
                let times: Vec<f64> = results.iter().map(|r| r.time).collect();
                let gaps: Vec<f64> = results
                    .iter()
                    .map(|r| {
                        let best = best_per_instance[r.instance.as_str()];
                        if best > 0.0 {
                            (r.distance - best) / best * 100.0
                        } else {
                            0.0
                        }
                    })
                    .collect();

                AlgorithmStatistics {
                    algorithm: algorithm.to_string(),
                    num_runs: results.len(),
                    avg_distance: Statistics::mean(&distances),
                    best_distance: Statistics::min(&distances),
                    worst_distance: Statistics::max(&distances),
                    std_distance: Statistics::population_std_dev(&distances),
                    avg_time: Statistics::mean(&times),
                    total_time: times.iter().sum(),
                    avg_gap: Statistics::mean(&gaps),
                }
            })
            .collect();

        statistics.sort_by_key(|s| (OrderedFloat(s.avg_distance), s.algorithm.clone()));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("          TSP Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        report.push_str(&format!(
            "Runs per algorithm: {} (seeds {}..{})\n\n",
            self.config.num_runs,
            self.config.seed,
            self.config.seed.wrapping_add(self.config.num_runs as u64)
        ));

        report.push_str("Algorithm Performance Summary:\n");
        report.push_str("-".repeat(80).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<20} {:>6} {:>12} {:>12} {:>10} {:>8} {:>10}\n",
            "Algorithm", "Runs", "Avg Dist", "Best Dist", "Std", "Gap%", "Avg Time"
        ));
        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        for stat in self.compute_statistics() {
            report.push_str(&format!(
                "{:<20} {:>6} {:>12.2} {:>12.2} {:>10.2} {:>8.2} {:>10.4}\n",
                stat.algorithm,
                stat.num_runs,
                stat.avg_distance,
                stat.best_distance,
                stat.std_distance,
                stat.avg_gap,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(80).as_str());
        report.push('\n');

        report.push_str("\nBest Solutions per Instance:\n");

        let mut instance_best: HashMap<&str, &AlgorithmResult> = HashMap::new();
        for result in &self.results {
            let entry = instance_best.entry(result.instance.as_str()).or_insert(result);
            if result.distance < entry.distance {
                *entry = result;
            }
        }

        let mut names: Vec<&&str> = instance_best.keys().collect();
        names.sort();
        for name in names {
            let best = instance_best[*name];
            report.push_str(&format!(
                "  {}: {:.2} ({}, seed {})\n",
                name, best.distance, best.algorithm, best.seed
            ));
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[AlgorithmResult] {
        &self.results
    }
}

/// Load every `.tsp` file and `.json` cache of a directory, smallest first
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<TspInstance>> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let wanted = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("tsp") | Some("json")
        );
        if !wanted {
            continue;
        }
        match TspInstance::load(&path) {
            Ok(instance) => instances.push(instance),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    instances.sort_by_key(|i| i.dimension());
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::City;

    fn create_test_instance() -> TspInstance {
        TspInstance::from_cities(
            "square",
            vec![
                City::new(0.0, 0.0),
                City::new(0.0, 4.0),
                City::new(3.0, 0.0),
                City::new(3.0, 4.0),
            ],
        )
        .unwrap()
    }

    fn quiet_config(num_runs: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            num_runs,
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.num_runs, 5);
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn test_run_records_every_method() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(quiet_config(2));
        benchmark.run(&instance).unwrap();

        assert_eq!(benchmark.results().len(), 6);
        for result in benchmark.results() {
            assert!((result.distance - 14.0).abs() < 1e-10, "{:?}", result);
            assert_eq!(result.dimension, 4);
        }

        let seeds: Vec<u64> = benchmark.results().iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_seeds_wrap_at_the_top_of_the_range() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(BenchmarkConfig {
            seed: u64::MAX,
            ..quiet_config(2)
        });
        benchmark.run(&instance).unwrap();

        let seeds: Vec<u64> = benchmark.results().iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![u64::MAX, 0, u64::MAX, 0, u64::MAX, 0]);
        assert!(benchmark.generate_report().contains("seeds 18446744073709551615..1"));
    }

    #[test]
    fn test_run_on_instances() {
        let square = create_test_instance();
        let triangle = TspInstance::from_cities(
            "triangle",
            vec![City::new(0.0, 0.0), City::new(3.0, 0.0), City::new(0.0, 4.0)],
        )
        .unwrap();

        let mut benchmark = Benchmark::new(quiet_config(1));
        benchmark.run_on_instances(&[square, triangle]).unwrap();

        assert_eq!(benchmark.results().len(), 6);
        let report = benchmark.generate_report();
        assert!(report.contains("square: 14.00"));
        assert!(report.contains("triangle: 12.00"));
    }

    #[test]
    fn test_statistics() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(quiet_config(3));
        benchmark.run(&instance).unwrap();

        let stats = benchmark.compute_statistics();
        assert_eq!(stats.len(), 3);
        for stat in &stats {
            assert_eq!(stat.num_runs, 3);
            assert!((stat.best_distance - 14.0).abs() < 1e-10);
            assert!(stat.std_distance.abs() < 1e-10);
            assert!(stat.avg_gap.abs() < 1e-10);
        }
    }

    #[test]
    fn test_exports_and_report() {
        let instance = create_test_instance();
        let mut benchmark = Benchmark::new(quiet_config(1));
        benchmark.run(&instance).unwrap();

        let path = std::env::temp_dir().join(format!("tsp-bench-{}.csv", std::process::id()));
        benchmark.export_to_csv(&path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<AlgorithmResult> = reader
            .deserialize::<AlgorithmResult>()
            .map(|r| r.unwrap())
            .collect();
        std::fs::remove_file(&path).ok();
        assert_eq!(rows.len(), 3);

        let report = benchmark.generate_report();
        assert!(report.contains("GeneticAlgorithm"));
        assert!(report.contains("square: 14.00"));
    }
}
