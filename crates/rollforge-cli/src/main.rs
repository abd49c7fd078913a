// ABOUTME: Command-line interface for the rollforge dice-formula engine.
// ABOUTME: Provides roll and simulation commands with optional JSON output.

use clap::{Args, Parser, Subcommand};
use rollforge::{FastRng, RollOptions};

#[derive(Parser)]
#[command(name = "rollforge")]
#[command(about = "A dice-formula engine with advantage, criticals, and double-digit dice")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Roll a dice formula
    Roll {
        /// Dice formula (e.g., "2d6! + 3", "d66a")
        formula: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Seed the RNG for reproducible rolls
        #[arg(long)]
        seed: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Simulate rolling a formula many times
    Sim {
        /// Dice formula (e.g., "2d6")
        formula: String,

        /// Number of trials to run
        #[arg(short, long, default_value = "10000")]
        n: usize,

        #[command(flatten)]
        options: OptionArgs,

        /// Seed the RNG for a reproducible simulation
        #[arg(long)]
        seed: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct OptionArgs {
    /// Advantage level: roll N extra dice, drop the lowest
    #[arg(short, long, conflicts_with = "disadvantage")]
    advantage: Option<u32>,

    /// Disadvantage level: roll N extra dice, drop the highest
    #[arg(short, long)]
    disadvantage: Option<u32>,

    /// Allow the first kept die to critical and explode
    #[arg(long)]
    crits: bool,

    /// Explode every kept max-face die, not just the first
    #[arg(long)]
    explode_all: bool,

    /// Add one flat bonus die per critical hit
    #[arg(long)]
    vicious: bool,

    /// A first kept die of 1 fumbles, zeroing the total
    #[arg(long)]
    fumbles: bool,
}

impl OptionArgs {
    fn to_options(&self) -> RollOptions {
        let advantage = match (self.advantage, self.disadvantage) {
            (Some(n), _) => n as i32,
            (None, Some(n)) => -(n as i32),
            (None, None) => 0,
        };
        RollOptions {
            advantage,
            criticals: self.crits || self.explode_all || self.vicious,
            explode_all: self.explode_all,
            vicious: self.vicious,
            fumbles: self.fumbles,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Roll {
            formula,
            options,
            seed,
            json,
        } => {
            let opts = options.to_options();
            let result = match seed {
                Some(seed) => {
                    rollforge::roll_with_rng(&formula, opts, &mut FastRng::with_seed(seed))
                }
                None => rollforge::roll(&formula, opts),
            };
            match result {
                Ok(result) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&result).unwrap());
                    } else {
                        print_roll(&result);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Sim {
            formula,
            n,
            options,
            seed,
            json,
        } => {
            let opts = options.to_options();
            let result = match seed {
                Some(seed) => rollforge::simulate_seeded(&formula, opts, n, seed),
                None => rollforge::simulate(&formula, opts, n),
            };
            match result {
                Ok(result) => {
                    if json {
                        print_sim_json(&result);
                    } else {
                        print_sim_histogram(&formula, &result);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn print_roll(result: &rollforge::FormulaResult) {
    println!("{}", result.formula);
    println!("{}", result.display);
    println!("total: {}", result.total);
    if result.criticals > 0 {
        let word = if result.criticals == 1 {
            "critical hit"
        } else {
            "critical hits"
        };
        println!("{} {}!", result.criticals, word);
    }
    if result.fumble {
        println!("fumble!");
    }
}

fn print_sim_json(result: &rollforge::SimResult) {
    use serde_json::json;

    let output = json!({
        "n": result.n,
        "min": result.min,
        "max": result.max,
        "mean": result.mean,
        "std_dev": result.std_dev,
        "crit_rate": result.crit_rate,
        "fumble_rate": result.fumble_rate,
        "distribution": result.distribution,
    });

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

fn print_sim_histogram(formula: &str, result: &rollforge::SimResult) {
    println!("{} (n={})", formula, result.n);
    println!();

    let outcomes = result.sorted_outcomes();
    let max_count = outcomes.iter().map(|(_, c)| *c).max().unwrap_or(1);
    let max_bar_width = 40;

    for (value, count) in outcomes {
        let pct = (count as f64 / result.n as f64) * 100.0;
        let bar_width = (count as f64 / max_count as f64 * max_bar_width as f64) as usize;
        let bar: String = "█".repeat(bar_width);

        println!("{:>4}: {:40} {:5.1}%", value, bar, pct);
    }

    println!();
    println!("mean: {:.2}, std: {:.2}", result.mean, result.std_dev);
    if result.crit_rate > 0.0 {
        println!("crit rate: {:.1}%", result.crit_rate * 100.0);
    }
    if result.fumble_rate > 0.0 {
        println!("fumble rate: {:.1}%", result.fumble_rate * 100.0);
    }
}
