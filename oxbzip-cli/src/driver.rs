//! Per-file operations: compress, decompress, test.
//!
//! The driver owns everything the codec must not: file naming, suffix
//! mapping, overwrite policy, permission/mtime preservation, terminal
//! checks, warning output and exit codes. Exit codes follow bzip2: 0 for
//! success, 1 for I/O or usage trouble, 2 for corrupt compressed data,
//! 3 for internal consistency violations.

use oxbzip::{BlockSize, BzDecoder, BzEncoder, BzError};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

/// What to do with each file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    Compress,
    Decompress,
    Test,
}

/// Resolved command-line options.
pub struct Config {
    pub mode: OpMode,
    pub to_stdout: bool,
    pub keep: bool,
    pub force: bool,
    pub quiet: bool,
    pub verbose: u8,
    pub small: bool,
    pub level: u8,
}

const EXIT_OK: i32 = 0;
const EXIT_TROUBLE: i32 = 1;
const EXIT_DATA_ERROR: i32 = 2;
const EXIT_INTERNAL: i32 = 3;

/// Suffix map applied when decompressing: strip the compressed suffix, or
/// swap the tar shorthands.
const SUFFIXES: [(&str, &str); 4] = [
    (".bz2", ""),
    (".bz", ""),
    (".tbz2", ".tar"),
    (".tbz", ".tar"),
];

/// Process every file (or stdin when none), returning the worst exit code.
pub fn run(config: &Config, files: &[OsString]) -> i32 {
    let mut worst = EXIT_OK;

    if files.is_empty() {
        worst = worst.max(process_stdio(config));
    } else {
        for name in files {
            let code = if name.to_str() == Some("-") {
                process_stdio(config)
            } else {
                process_file(config, Path::new(name))
            };
            worst = worst.max(code);
        }
    }

    worst
}

fn warn(config: &Config, message: &str) {
    if !config.quiet {
        eprintln!("oxbzip: {message}");
    }
}

fn error(message: &str) {
    eprintln!("oxbzip: {message}");
}

fn exit_code_for(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => EXIT_DATA_ERROR,
        // Sequence/parameter violations surface as Other: those are bugs in
        // this driver, not in the user's data.
        io::ErrorKind::Other => EXIT_INTERNAL,
        _ => EXIT_TROUBLE,
    }
}

fn level(config: &Config) -> BlockSize {
    // The CLI only produces 1..=9, so this cannot fail.
    BlockSize::new(config.level).unwrap_or_default()
}

/// stdin -> stdout processing.
fn process_stdio(config: &Config) -> i32 {
    let stdin = io::stdin();
    let stdout = io::stdout();

    match config.mode {
        OpMode::Compress => {
            if stdout.is_terminal() && !config.force {
                error("compressed data not written to a terminal; use -f to force");
                return EXIT_TROUBLE;
            }
            let mut reader = stdin.lock();
            let writer = BufWriter::new(stdout.lock());
            match compress_stream(config, &mut reader, writer) {
                Ok((raw, packed)) => {
                    report_ratio(config, "(stdin)", raw, packed);
                    EXIT_OK
                }
                Err(e) => {
                    error(&format!("(stdin): {e}"));
                    exit_code_for(&e)
                }
            }
        }
        OpMode::Decompress => {
            if stdin.is_terminal() && !config.force {
                error("compressed data not read from a terminal; use -f to force");
                return EXIT_TROUBLE;
            }
            let reader = stdin.lock();
            let mut writer = BufWriter::new(stdout.lock());
            match decompress_stream(config, reader, &mut writer) {
                Ok(_) => EXIT_OK,
                Err(e) => {
                    error(&format!("(stdin): {e}"));
                    exit_code_for(&e)
                }
            }
        }
        OpMode::Test => {
            let reader = stdin.lock();
            match decompress_stream(config, reader, &mut io::sink()) {
                Ok(_) => EXIT_OK,
                Err(e) => {
                    error(&format!("(stdin): {e}"));
                    exit_code_for(&e)
                }
            }
        }
    }
}

/// One named input file.
fn process_file(config: &Config, input: &Path) -> i32 {
    let display = input.display().to_string();

    // The symlink itself is inspected, not its target; -f waives the
    // regular-file requirement.
    let meta = match fs::symlink_metadata(input) {
        Ok(m) => m,
        Err(e) => {
            error(&format!("can't open input file {display}: {e}"));
            return EXIT_TROUBLE;
        }
    };
    if !config.force && !meta.is_file() {
        warn(config, &format!("{display} is not a regular file, skipping"));
        return EXIT_TROUBLE;
    }

    match config.mode {
        OpMode::Compress => compress_file(config, input, &display),
        OpMode::Decompress => decompress_file(config, input, &display),
        OpMode::Test => test_file(config, input, &display),
    }
}

fn compress_file(config: &Config, input: &Path, display: &str) -> i32 {
    let name = input.to_string_lossy();
    if SUFFIXES.iter().any(|(sfx, _)| name.ends_with(sfx)) {
        warn(
            config,
            &format!("input file {display} already has a compressed suffix"),
        );
        return EXIT_TROUBLE;
    }

    if config.to_stdout {
        let stdout = io::stdout();
        if stdout.is_terminal() && !config.force {
            error("compressed data not written to a terminal; use -f to force");
            return EXIT_TROUBLE;
        }
        let mut reader = match open_input(input, display) {
            Ok(r) => r,
            Err(code) => return code,
        };
        let writer = BufWriter::new(stdout.lock());
        return match compress_stream(config, &mut reader, writer) {
            Ok((raw, packed)) => {
                report_ratio(config, display, raw, packed);
                EXIT_OK
            }
            Err(e) => {
                error(&format!("{display}: {e}"));
                exit_code_for(&e)
            }
        };
    }

    let output = PathBuf::from(format!("{name}.bz2"));
    if let Some(code) = refuse_existing_output(config, &output) {
        return code;
    }

    let mut reader = match open_input(input, display) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let out_file = match File::create(&output) {
        Ok(f) => f,
        Err(e) => {
            error(&format!("can't create output file {}: {e}", output.display()));
            return EXIT_TROUBLE;
        }
    };

    match compress_stream(config, &mut reader, BufWriter::new(out_file)) {
        Ok((raw, packed)) => {
            report_ratio(config, display, raw, packed);
            finish_output(config, input, &output)
        }
        Err(e) => {
            error(&format!("{display}: {e}"));
            let _ = fs::remove_file(&output);
            exit_code_for(&e)
        }
    }
}

fn decompress_file(config: &Config, input: &Path, display: &str) -> i32 {
    if config.to_stdout {
        let reader = match open_input(input, display) {
            Ok(r) => r,
            Err(code) => return code,
        };
        let stdout = io::stdout();
        let mut writer = BufWriter::new(stdout.lock());
        return match decompress_stream(config, reader, &mut writer) {
            Ok(_) => EXIT_OK,
            Err(e) => {
                error(&format!("{display}: {e}"));
                exit_code_for(&e)
            }
        };
    }

    let name = input.to_string_lossy();
    let (output, known_suffix) = decompressed_name(&name);
    if !known_suffix {
        warn(
            config,
            &format!("can't guess original name for {display}, using {output}"),
        );
    }
    let output = PathBuf::from(output);
    if let Some(code) = refuse_existing_output(config, &output) {
        return code;
    }

    let reader = match open_input(input, display) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let out_file = match File::create(&output) {
        Ok(f) => f,
        Err(e) => {
            error(&format!("can't create output file {}: {e}", output.display()));
            return EXIT_TROUBLE;
        }
    };

    match decompress_stream(config, reader, &mut BufWriter::new(out_file)) {
        Ok(_) => finish_output(config, input, &output),
        Err(e) => {
            error(&format!("{display}: {e}"));
            let _ = fs::remove_file(&output);
            exit_code_for(&e)
        }
    }
}

fn test_file(config: &Config, input: &Path, display: &str) -> i32 {
    let reader = match open_input(input, display) {
        Ok(r) => r,
        Err(code) => return code,
    };
    match decompress_stream(config, reader, &mut io::sink()) {
        Ok(_) => {
            if config.verbose > 0 {
                eprintln!("oxbzip: {display}: ok");
            }
            EXIT_OK
        }
        Err(e) => {
            error(&format!("{display}: {e}"));
            exit_code_for(&e)
        }
    }
}

fn open_input(input: &Path, display: &str) -> Result<BufReader<File>, i32> {
    File::open(input).map(BufReader::new).map_err(|e| {
        error(&format!("can't open input file {display}: {e}"));
        EXIT_TROUBLE
    })
}

/// Returns an exit code when the output may not be written.
fn refuse_existing_output(config: &Config, output: &Path) -> Option<i32> {
    if output.exists() {
        if config.force {
            if let Err(e) = fs::remove_file(output) {
                error(&format!("can't remove {}: {e}", output.display()));
                return Some(EXIT_TROUBLE);
            }
        } else {
            error(&format!("output file {} already exists", output.display()));
            return Some(EXIT_TROUBLE);
        }
    }
    None
}

/// Carry mode and timestamps over, then delete the input unless kept.
fn finish_output(config: &Config, input: &Path, output: &Path) -> i32 {
    if let Err(e) = copy_metadata(input, output) {
        warn(
            config,
            &format!("can't copy attributes to {}: {e}", output.display()),
        );
    }
    if !config.keep {
        if let Err(e) = fs::remove_file(input) {
            error(&format!("can't remove input file {}: {e}", input.display()));
            return EXIT_TROUBLE;
        }
    }
    EXIT_OK
}

fn copy_metadata(input: &Path, output: &Path) -> io::Result<()> {
    let meta = fs::metadata(input)?;
    fs::set_permissions(output, meta.permissions())?;
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    let atime = filetime::FileTime::from_last_access_time(&meta);
    filetime::set_file_times(output, atime, mtime)
}

/// Map a compressed file name to its decompressed output name; the flag
/// reports whether the suffix was recognised.
fn decompressed_name(name: &str) -> (String, bool) {
    for (sfx, replacement) in SUFFIXES {
        if name.len() > sfx.len() && name.ends_with(sfx) {
            return (
                format!("{}{replacement}", &name[..name.len() - sfx.len()]),
                true,
            );
        }
    }
    (format!("{name}.out"), false)
}

/// Counts bytes on their way to the real writer, for the -v report.
struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn compress_stream<R: Read, W: Write>(
    config: &Config,
    reader: &mut R,
    writer: W,
) -> io::Result<(u64, u64)> {
    let counting = CountingWriter {
        inner: writer,
        count: 0,
    };
    let mut encoder = BzEncoder::new(counting, level(config)).map_err(bz_to_io)?;
    io::copy(reader, &mut encoder)?;
    let raw = encoder.total_in();
    let mut counting = encoder.finish().map_err(bz_to_io)?;
    counting.flush()?;
    Ok((raw, counting.count))
}

fn decompress_stream<R: Read, W: Write>(
    config: &Config,
    reader: R,
    writer: &mut W,
) -> io::Result<u64> {
    let mut decoder = BzDecoder::with_small(reader, config.small);
    let n = io::copy(&mut decoder, writer)?;
    writer.flush()?;
    Ok(n)
}

fn bz_to_io(e: BzError) -> io::Error {
    match e {
        BzError::Io(inner) => inner,
        other if other.is_data_error() => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        other => io::Error::other(other.to_string()),
    }
}

fn report_ratio(config: &Config, name: &str, raw: u64, packed: u64) {
    if config.verbose == 0 {
        return;
    }
    if raw == 0 || packed == 0 {
        eprintln!("  {name}: no data compressed.");
        return;
    }
    let ratio = raw as f64 / packed as f64;
    let bits_per_byte = 8.0 * packed as f64 / raw as f64;
    let saved = 100.0 * (1.0 - packed as f64 / raw as f64);
    eprintln!(
        "  {name}: {ratio:.3}:1, {bits_per_byte:.3} bits/byte, {saved:.2}% saved, {raw} in, {packed} out."
    );
}
