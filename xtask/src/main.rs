mod batch;
mod mem_size;
mod name_pattern;
mod show;

#[macro_use]
extern crate clap;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
        .unwrap();

    use Commands::*;
    match Cli::parse().command {
        Show(args) => args.show(),
        Batch(args) => args.batch(),
    }
}

#[derive(Parser)]
#[clap(name = "npz-utils")]
#[clap(version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show arrays stored in an npz archive
    Show(show::ShowArgs),
    /// Preview calibration batches
    Batch(batch::BatchArgs),
}

const YES: &str = "✔️  ";
const ERR: &str = "❌  ";
