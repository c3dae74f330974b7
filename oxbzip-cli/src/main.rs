//! Command-line driver for the oxbzip codec.
//!
//! Compatible with the classic bzip2 flag surface: `-z`/`-d`/`-t` select
//! the operation, `-1`..`-9` the block size, and the `BZIP2`/`BZIP`
//! environment variables inject default flags ahead of the command line.
//! Invoked through a name containing "unzip" it defaults to decompression;
//! through a name containing "zcat", to decompression onto stdout.

mod driver;

use clap::{ArgAction, Parser};
use driver::{Config, OpMode};
use std::ffi::OsString;

#[derive(Parser, Debug)]
#[command(
    name = "oxbzip",
    version,
    about = "A block-sorting file compressor, bzip2-compatible",
    after_help = "If no file names are given, oxbzip compresses or decompresses\n\
                  from standard input to standard output."
)]
struct Cli {
    /// Force compression
    #[arg(short = 'z', long)]
    compress: bool,

    /// Force decompression
    #[arg(short = 'd', long)]
    decompress: bool,

    /// Test compressed file integrity
    #[arg(short = 't', long)]
    test: bool,

    /// Output to standard output; keep input files unchanged
    #[arg(short = 'c', long = "stdout")]
    to_stdout: bool,

    /// Keep (do not delete) input files
    #[arg(short = 'k', long)]
    keep: bool,

    /// Overwrite existing output files
    #[arg(short = 'f', long)]
    force: bool,

    /// Suppress noncritical warning messages
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Be verbose; repeat for more detail
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Use less memory when decompressing (slower)
    #[arg(short = 's', long)]
    small: bool,

    /// Set block size to 100k
    #[arg(short = '1', hide = true)]
    one: bool,
    /// Set block size to 200k
    #[arg(short = '2', hide = true)]
    two: bool,
    /// Set block size to 300k
    #[arg(short = '3', hide = true)]
    three: bool,
    /// Set block size to 400k
    #[arg(short = '4', hide = true)]
    four: bool,
    /// Set block size to 500k
    #[arg(short = '5', hide = true)]
    five: bool,
    /// Set block size to 600k
    #[arg(short = '6', hide = true)]
    six: bool,
    /// Set block size to 700k
    #[arg(short = '7', hide = true)]
    seven: bool,
    /// Set block size to 800k
    #[arg(short = '8', hide = true)]
    eight: bool,
    /// Set block size to 900k (default)
    #[arg(short = '9', hide = true)]
    nine: bool,

    /// Alias for -1
    #[arg(long)]
    fast: bool,

    /// Alias for -9
    #[arg(long)]
    best: bool,

    /// Accepted for compatibility with old scripts; no effect
    #[arg(long, hide = true)]
    repetitive_fast: bool,

    /// Accepted for compatibility with old scripts; no effect
    #[arg(long, hide = true)]
    repetitive_best: bool,

    /// Files to process; "-" or no files means standard input
    files: Vec<OsString>,
}

/// Build the effective argument vector: flags from `BZIP2` then `BZIP`
/// (split on whitespace) go ahead of the real command line.
fn effective_args() -> Vec<OsString> {
    let mut raw = std::env::args_os();
    let mut args: Vec<OsString> =
        vec![raw.next().unwrap_or_else(|| OsString::from("oxbzip"))];
    for var in ["BZIP2", "BZIP"] {
        if let Ok(value) = std::env::var(var) {
            args.extend(value.split_whitespace().map(OsString::from));
        }
    }
    args.extend(raw);
    args
}

/// Last block-size flag on the command line wins, as with bzip2; digits
/// may appear inside combined flag groups like `-kv9`.
fn resolve_level(args: &[OsString]) -> u8 {
    let mut level = 9u8;
    for arg in args.iter().skip(1) {
        let Some(s) = arg.to_str() else { continue };
        if s == "--" {
            break;
        }
        if s == "--fast" {
            level = 1;
        } else if s == "--best" {
            level = 9;
        } else if s.len() > 1 && s.starts_with('-') && !s.starts_with("--") {
            for ch in s.chars().skip(1) {
                if let Some(d) = ch.to_digit(10) {
                    if (1..=9).contains(&d) {
                        level = d as u8;
                    }
                }
            }
        }
    }
    level
}

fn main() {
    let args = effective_args();
    let cli = Cli::parse_from(&args);

    let prog = std::path::Path::new(&args[0])
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mode = if cli.test {
        OpMode::Test
    } else if cli.decompress {
        OpMode::Decompress
    } else if cli.compress {
        OpMode::Compress
    } else if prog.contains("unzip") || prog.contains("zcat") {
        OpMode::Decompress
    } else {
        OpMode::Compress
    };

    let config = Config {
        mode,
        to_stdout: cli.to_stdout || prog.contains("zcat"),
        keep: cli.keep,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose,
        small: cli.small,
        level: resolve_level(&args),
    };

    std::process::exit(driver::run(&config, &cli.files));
}
