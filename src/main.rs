use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use edit_distance::matrix::{run_matrix, OutputFormat};
use edit_distance::pairwise::DEFAULT_BATCH_SIZE;
use edit_distance::{distance, error_chain, Granularity, MatrixError, PairwiseConfig};

#[derive(Parser, Debug)]
#[command(name = "edit-distance", about = "Levenshtein edit distance between strings")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the distance between two strings.
    Pair {
        a: String,
        b: String,
        /// Compare Unicode characters instead of bytes.
        #[arg(long)]
        chars: bool,
    },
    /// Compute every pairwise distance between the lines of a file.
    Matrix {
        /// One record per line; `.gz` files are decompressed.
        input: String,
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Ipc)]
        format: OutputFormat,
        /// Compare Unicode characters instead of bytes.
        #[arg(long)]
        chars: bool,
        /// Skip records longer than this many bytes.
        #[arg(long)]
        max_len: Option<usize>,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
}

fn granularity(chars: bool) -> Granularity {
    if chars {
        Granularity::Chars
    } else {
        Granularity::Bytes
    }
}

fn run(args: Args) -> Result<(), MatrixError> {
    match args.command {
        Command::Pair { a, b, chars } => {
            println!("{}", distance(&a, &b, granularity(chars)));
        }
        Command::Matrix { input, output, format, chars, max_len, batch_size } => {
            let config = PairwiseConfig { granularity: granularity(chars), max_len, batch_size };
            run_matrix(&input, &output, format, &config)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("edit_distance=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", error_chain(&err));
            ExitCode::FAILURE
        }
    }
}
