use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use signalsim::{
    ArrivalMode, ConcurrencyMode, Direction, ExecutionConfig, ExperimentRunner, ExperimentSummary,
    IntersectionConfig, PolicyComparison, PolicyKind, RunReport,
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Fixed,
    Adaptive,
    /// Run both policies over the same seeds
    Both,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArrivalArg {
    Poisson,
    Fixed,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    North,
    South,
    East,
    West,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::North => Direction::North,
            DirectionArg::South => Direction::South,
            DirectionArg::East => Direction::East,
            DirectionArg::West => Direction::West,
        }
    }
}

#[derive(Parser)]
#[command(name = "signalsim")]
#[command(about = "Four-way traffic light simulation with fixed-cycle and adaptive control")]
struct Cli {
    /// JSON file with an IntersectionConfig; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Light control policy
    #[arg(long, value_enum, default_value = "fixed")]
    policy: PolicyArg,

    /// Green time for north-south traffic in seconds
    #[arg(long)]
    green_ns: Option<f64>,

    /// Green time for east-west traffic in seconds
    #[arg(long)]
    green_ew: Option<f64>,

    /// All-red clearance time in seconds
    #[arg(long)]
    red: Option<f64>,

    /// Mean seconds between arrivals
    #[arg(long)]
    arrival_mean: Option<f64>,

    /// Arrival process
    #[arg(long, value_enum)]
    arrivals: Option<ArrivalArg>,

    /// Simulated seconds per run
    #[arg(long)]
    sim_time: Option<f64>,

    /// Seconds a car needs to cross
    #[arg(long)]
    drive_time: Option<f64>,

    /// Queue length that triggers an adaptive switch
    #[arg(long)]
    threshold: Option<usize>,

    /// Cars waiting at t=0
    #[arg(long)]
    initial_cars: Option<usize>,

    /// Approach of the initial cars
    #[arg(long, value_enum)]
    initial_direction: Option<DirectionArg>,

    /// Number of independent runs
    #[arg(long)]
    runs: Option<usize>,

    /// Base seed; run i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Stop generating after this many cars per run
    #[arg(long)]
    max_cars: Option<u64>,

    /// Execute runs on a rayon thread pool
    #[arg(long)]
    parallel: bool,

    /// Thread pool size for --parallel
    #[arg(long)]
    threads: Option<usize>,

    /// Print reports as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn load_config(&self) -> Result<IntersectionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => IntersectionConfig::default(),
        };

        if let Some(v) = self.green_ns {
            config.green_time_ns = v;
        }
        if let Some(v) = self.green_ew {
            config.green_time_ew = v;
        }
        if let Some(v) = self.red {
            config.red_time = v;
        }
        if let Some(v) = self.arrival_mean {
            config.arrival_mean = v;
        }
        if let Some(v) = self.arrivals {
            config.arrival_mode = match v {
                ArrivalArg::Poisson => ArrivalMode::Poisson,
                ArrivalArg::Fixed => ArrivalMode::Fixed,
            };
        }
        if let Some(v) = self.sim_time {
            config.simulation_time = v;
        }
        if let Some(v) = self.drive_time {
            config.drive_time = v;
        }
        if let Some(v) = self.threshold {
            config.queue_threshold = v;
        }
        if let Some(v) = self.initial_cars {
            config.initial_cars = v;
        }
        if let Some(v) = self.initial_direction {
            config.initial_direction = v.into();
        }
        if let Some(v) = self.runs {
            config.num_runs = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if self.max_cars.is_some() {
            config.max_cars = self.max_cars;
        }
        match self.policy {
            PolicyArg::Fixed => config.policy = PolicyKind::FixedCycle,
            PolicyArg::Adaptive => config.policy = PolicyKind::Adaptive,
            PolicyArg::Both => {}
        }

        config.validate()?;
        Ok(config)
    }

    fn execution(&self) -> ExecutionConfig {
        let mut execution = ExecutionConfig::new();
        if self.parallel {
            execution = execution.with_concurrency(ConcurrencyMode::Rayon);
        }
        if let Some(threads) = self.threads {
            execution = execution.with_thread_pool_size(threads);
        }
        execution
    }
}

fn print_reports(reports: &[RunReport], summary: &ExperimentSummary, json: bool) -> Result<()> {
    if json {
        for report in reports {
            println!("{}", serde_json::to_string(report)?);
        }
        println!("{}", serde_json::to_string(summary)?);
    } else {
        for report in reports {
            println!("{}", report);
        }
        println!("{}", summary);
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let execution = cli.execution();

    if let PolicyArg::Both = cli.policy {
        let comparison = PolicyComparison::run(&config, &execution)?;
        let (fixed, adaptive) = comparison.summaries();

        if !cli.json {
            println!("== fixed-cycle ==");
        }
        print_reports(&comparison.fixed_cycle, &fixed, cli.json)?;
        if !cli.json {
            println!();
            println!("== adaptive ==");
        }
        print_reports(&comparison.adaptive, &adaptive, cli.json)?;
        return Ok(());
    }

    let runner = ExperimentRunner::new(config, execution)?;
    let reports = runner.run_all()?;
    let summary = runner.summarize(&reports);
    print_reports(&reports, &summary, cli.json)
}
