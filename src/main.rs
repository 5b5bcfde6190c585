//! TSP Solver - Command Line Interface
//!
//! Solves Euclidean TSP instances with a greedy, 2-opt or genetic strategy and
//! writes the route as 1-based city numbers, one per line.

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tsp_solver::benchmark::{load_instances_from_dir, Benchmark, BenchmarkConfig};
use tsp_solver::heuristics::genetic::GAConfig;
use tsp_solver::heuristics::{solve, Method, SolveOptions};
use tsp_solver::instance::TspInstance;
use tsp_solver::route::Route;
use tsp_solver::visualization::Visualizer;
use tsp_solver::{Result, TspError};

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "tsp-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Heuristic solver for the Euclidean Traveling Salesman Problem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance and write the route file
    Solve {
        /// Method: 'ga' (genetic algorithm), 'greedy' (nearest neighbor) or '2opt'
        #[arg(default_value = "ga")]
        method: String,

        /// Instance path, or a name looked up in data/ (e.g. bier127, a280)
        #[arg(default_value = "a280")]
        data: String,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Greedy start city (0-based), instead of the first city of the random route
        #[arg(long)]
        start_city: Option<usize>,

        /// Route file, one 1-based city number per line
        #[arg(short, long, default_value = "solution.csv")]
        output: PathBuf,

        /// Also save the full solution as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Save an SVG drawing of the tour
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Genetic algorithm settings as a JSON file
        #[arg(long)]
        ga_config: Option<PathBuf>,

        /// Population size for the genetic algorithm
        #[arg(short, long)]
        population: Option<usize>,

        /// Stop the genetic algorithm after this many generations
        #[arg(long)]
        max_generations: Option<usize>,

        /// Time limit in seconds for the genetic algorithm
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse a TSPLIB file and save coordinates and distances as a JSON cache
    Cache {
        /// Instance path or name
        data: String,

        /// Cache file to write
        out: PathBuf,
    },

    /// Run every method several times and report statistics
    Benchmark {
        /// Instance path or name, or a directory of instances
        data: String,

        /// Number of runs per algorithm
        #[arg(short, long, default_value = "5")]
        runs: usize,

        /// Seed of the first run
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,

        /// Genetic algorithm settings as a JSON file
        #[arg(long)]
        ga_config: Option<PathBuf>,
    },

    /// Analyze an instance
    Analyze {
        /// Instance path or name
        data: String,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Solve {
            method,
            data,
            seed,
            start_city,
            output,
            json,
            svg,
            ga_config,
            population,
            max_generations,
            time_limit,
            verbose,
        } => {
            let ga = load_ga_config(ga_config.as_deref()).map(|mut config| {
                config.seed = seed;
                if population.is_some() {
                    config.population_size = population;
                }
                if max_generations.is_some() {
                    config.max_generations = max_generations;
                }
                if time_limit.is_some() {
                    config.time_limit = time_limit;
                }
                config
            });
            ga.and_then(|ga| {
                let options = SolveOptions { start_city, ga };
                solve_instance(&method, &data, seed, &options, &output, json, svg, verbose)
            })
        }

        Commands::Cache { data, out } => build_cache(&data, &out),

        Commands::Benchmark {
            data,
            runs,
            seed,
            output_dir,
            ga_config,
        } => load_ga_config(ga_config.as_deref())
            .and_then(|ga| run_benchmark(&data, runs, seed, ga, &output_dir)),

        Commands::Analyze { data } => analyze_instance(&data),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// An existing path is used as is; a bare name is looked up in `data/`,
/// preferring the JSON cache over the TSPLIB file.
fn resolve_data(data: &str) -> PathBuf {
    let direct = PathBuf::from(data);
    if direct.exists() {
        return direct;
    }

    let cached = Path::new("data").join(format!("{}.json", data));
    if cached.exists() {
        return cached;
    }
    Path::new("data").join(format!("{}.tsp", data))
}

fn load_instance(data: &str) -> Result<TspInstance> {
    let path = resolve_data(data);
    log::info!("Loading instance from {}", path.display());
    TspInstance::load(&path)
}

fn load_ga_config(path: Option<&Path>) -> Result<GAConfig> {
    match path {
        Some(path) => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        None => Ok(GAConfig::default()),
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    method: &str,
    data: &str,
    seed: u64,
    options: &SolveOptions,
    output: &Path,
    json: Option<PathBuf>,
    svg: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let method: Method = method.parse()?;

    println!("Running with {{ method: '{}', data: '{}' }}.", method, data);
    println!("Initializing TSP instance..");
    let instance = load_instance(data)?;

    if verbose {
        println!("{}", instance.statistics());
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let initial = Route::random(instance.dimension(), &mut rng);

    println!("Solving '{}' with {}..", instance.name, method);
    let solution = solve(method, &instance, &initial, options)?;

    println!("\n========== Results ==========");
    println!("Algorithm: {}", solution.algorithm);
    println!("Distance: {:.2}", solution.total_distance);
    println!("Time: {:.4}s", solution.computation_time);
    if let Some(iter) = solution.iterations {
        println!("Iterations: {}", iter);
    }

    if verbose {
        println!("\nRoute: {:?}", solution.route.cities());
    }

    solution.write_route_file(output)?;
    println!("\nShortest distance found: {}", solution.total_distance);
    println!("Route saved to {:?}", output);

    if let Some(json_path) = json {
        solution.save_json(&json_path)?;
        println!("Solution saved to {:?}", json_path);
    }

    if let Some(svg_path) = svg {
        let viz = Visualizer::new();
        let drawing = viz.generate_svg(&instance, &solution);
        viz.save_svg(&drawing, &svg_path)?;
        println!("Visualization saved to {:?}", svg_path);
    }

    Ok(())
}

fn build_cache(data: &str, out: &Path) -> Result<()> {
    let instance = load_instance(data)?;
    println!("Making TSP distance matrix for {} cities..", instance.dimension());

    instance.save_cache(out)?;
    println!("Cache saved to {:?}", out);
    Ok(())
}

fn run_benchmark(data: &str, runs: usize, seed: u64, ga: GAConfig, output: &Path) -> Result<()> {
    let path = resolve_data(data);
    let instances = if path.is_dir() {
        println!("Loading instances from {:?}...", path);
        load_instances_from_dir(&path)?
    } else {
        vec![TspInstance::load(&path)?]
    };

    println!("Found {} instances", instances.len());
    if instances.is_empty() {
        return Err(TspError::InvalidInput(format!(
            "no instances found in {}",
            path.display()
        )));
    }

    std::fs::create_dir_all(output)?;

    let config = BenchmarkConfig {
        num_runs: runs,
        seed,
        ga,
        ..Default::default()
    };

    let mut benchmark = Benchmark::new(config);
    benchmark.run_on_instances(&instances)?;

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    benchmark.export_statistics_csv(&stats_path)?;
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_instance(data: &str) -> Result<()> {
    let instance = load_instance(data)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    let identity = Route::identity(instance.dimension());
    let greedy = solve(Method::Greedy, &instance, &identity, &SolveOptions::default())?;
    let improved = solve(Method::TwoOpt, &instance, &greedy.route, &SolveOptions::default())?;

    println!("Quick Solution Estimates:");
    println!(
        "  Nearest Neighbor: {:.2} ({:.4}s)",
        greedy.total_distance, greedy.computation_time
    );
    println!(
        "  Nearest Neighbor + 2-Opt: {:.2} ({:.4}s)",
        improved.total_distance, improved.computation_time
    );

    Ok(())
}
