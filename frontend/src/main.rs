use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cabinet_core::board::Board;
use cabinet_machines::registry;
use clap::{Parser, Subcommand};

mod runner;
mod snapshot;

#[derive(Parser)]
#[command(name = "cabinet", about = "Headless arcade board runner")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List built-in machines
    List,
    /// Run a built-in machine or a description file
    Run {
        /// Machine name, or path to a .toml description
        machine: String,

        /// Number of frames to run
        #[arg(long, default_value_t = 60)]
        frames: u64,

        /// Write the last frame to this PNG file
        #[arg(long)]
        png: Option<PathBuf>,

        /// Integer pixel scale for the PNG
        #[arg(long, default_value_t = 1)]
        scale: u32,
    },
}

fn open(machine: &str) -> Result<Board> {
    if machine.ends_with(".toml") {
        let path = PathBuf::from(machine);
        return cabinet_machines::load_file(&path)
            .with_context(|| format!("loading {}", path.display()));
    }
    let Some(entry) = registry::find(machine) else {
        let names: Vec<_> = registry::all().iter().map(|e| e.name).collect();
        bail!("unknown machine \"{machine}\" (available: {})", names.join(", "));
    };
    entry
        .create()
        .with_context(|| format!("building {}", entry.name))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::List => {
            for entry in registry::all() {
                println!("{:<12} {}", entry.name, entry.summary);
            }
        }
        Command::Run {
            machine,
            frames,
            png,
            scale,
        } => {
            let mut board = open(&machine)?;
            let summary = runner::run(&mut board, frames)?;
            log::info!("{summary}");
            if let Some(path) = png {
                snapshot::write_png(&board, &path, scale.max(1))
                    .with_context(|| format!("writing {}", path.display()))?;
                log::info!("wrote {}", path.display());
            }
        }
    }
    Ok(())
}
