use beam::prelude::*;
use clap::Parser;
use colored::*;
use std::{path::PathBuf, process::ExitCode};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Explicit corotational beam dynamics.
#[derive(Debug, Parser)]
#[command(name = "corobeam", version, about, long_about = None)]
struct Cli {
    /// RON input file with `config` and `geometry` sections
    input: PathBuf,
    /// Directory for the CSV snapshots, overrides the input file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Worker thread count, overrides the input file
    #[arg(short = 'j', long)]
    threads: Option<usize>,
    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

fn run(cli: &Cli) -> Result<SolveSummary, BeamErrors> {
    let input = SimulationInput::load(&cli.input)?;
    info!("loaded {:?}", cli.input);

    let mut builder = input.config;
    if let Some(output) = &cli.output {
        builder.output_dir = Some(output.clone());
    }
    if let Some(threads) = cli.threads {
        builder.n_threads = Some(threads);
    }

    let config = builder.build()?;
    let geometry = input.geometry.build()?;
    println!(
        "{} {} nodes, {} elements, t_end = {} s",
        "beam:".bold(),
        geometry.n_nodes(),
        geometry.n_elements(),
        config.t_end
    );

    let mut simulation = Simulation::new(config, geometry)?;
    println!(
        "{} {:.3e} s ({} steps)",
        "dt:".bold(),
        simulation.config.dt,
        simulation.config.n_steps()
    );

    simulation.solve(&RunOptions {
        show_progress: !cli.quiet,
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    println!("{}", "corobeam".cyan().bold());

    match run(&cli) {
        Ok(summary) => {
            println!(
                "{} {} steps to t = {:.6} s, {} snapshots, kinetic {:.4e} J, strain {:.4e} J ({:.2?})",
                "done:".green().bold(),
                summary.n_steps,
                summary.t_end,
                summary.snapshots,
                summary.kinetic_energy,
                summary.strain_energy,
                summary.elapsed,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
