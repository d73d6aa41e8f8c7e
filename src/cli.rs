// Command-line front end for vlqmap.
//
// Subcommands map one-to-one onto library operations: generate, merge,
// decode, check and recode. Errors are reported on stderr with a `vlqmap:`
// prefix and a non-zero exit code.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::envelope::{ParsedMap, WriteOptions};
use crate::io::{self as map_io, MissingSources, ReadOptions, WriteStats};
use crate::ops::{self, LinePlacement, MergeOptions};

const BUF_SIZE: usize = 64 * 1024;

/// Exit code for `check` when the map is readable but not clean.
const EXIT_INVALID: i32 = 2;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Source map (revision 3) encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "vlqmap",
    version,
    about = "Source map v3 codec",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate an identity source map for a text file.
    Generate(GenerateArgs),
    /// Merge source maps, in order, into one.
    Merge(MergeArgs),
    /// Print every decoded segment of a source map.
    Decode(MapArgs),
    /// Validate a source map's indices and mappings.
    Check(MapArgs),
    /// Re-encode a source map with minimal deltas.
    Recode(RecodeArgs),
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// Use empty content for sources that cannot be read from disk.
    #[arg(long)]
    lenient: bool,
}

impl ReadArgs {
    fn options(&self) -> ReadOptions {
        ReadOptions {
            missing_sources: if self.lenient {
                MissingSources::Empty
            } else {
                MissingSources::Error
            },
        }
    }
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Text file to map.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Name recorded as `file` and as the single source (default: file name).
    #[arg(long)]
    name: Option<String>,

    /// Output map file (default: `<INPUT>.map`).
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Indent the JSON output (builds the map in memory instead of streaming).
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Maps to merge, in order.
    #[arg(required = true, num_args = 1.., value_hint = ValueHint::FilePath)]
    maps: Vec<PathBuf>,

    /// Name of the merged generated file.
    #[arg(long)]
    file: String,

    /// Keep generated line numbers instead of concatenating inputs.
    #[arg(long)]
    overlay: bool,

    /// Output map file (default: stdout).
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    read: ReadArgs,
}

#[derive(Args, Debug)]
struct MapArgs {
    /// Source map file.
    #[arg(value_hint = ValueHint::FilePath)]
    map: PathBuf,

    #[command(flatten)]
    read: ReadArgs,
}

#[derive(Args, Debug)]
struct RecodeArgs {
    /// Source map file.
    #[arg(value_hint = ValueHint::FilePath)]
    map: PathBuf,

    /// Output map file (default: stdout).
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Indent the JSON output.
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    read: ReadArgs,
}

// ---------------------------------------------------------------------------
// Global options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Options {
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

impl Options {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            json_output: cli.json_output,
        }
    }

    fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("vlqmap".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = Options::from_cli(&cli).log_filter();
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn read_map(path: &Path, opts: ReadOptions) -> Result<ParsedMap, i32> {
    map_io::read_file(path, opts).map_err(|e| {
        eprintln!("vlqmap: {}: {e}", path.display());
        1
    })
}

fn check_overwrite(path: &Path, opts: &Options) -> Result<(), i32> {
    if path.exists() && !opts.force {
        eprintln!(
            "vlqmap: output file exists, use -f to overwrite: {}",
            path.display()
        );
        return Err(1);
    }
    Ok(())
}

/// Write `bytes` to `path`, or to stdout when `path` is `None`.
fn write_output(path: Option<&Path>, bytes: &[u8], opts: &Options) -> Result<(), i32> {
    let result = match path {
        Some(path) => {
            check_overwrite(path, opts)?;
            std::fs::write(path, bytes)
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(bytes).and_then(|()| out.flush())
        }
    };
    result.map_err(|e| {
        eprintln!("vlqmap: write: {e}");
        1
    })
}

fn report_stats(command: &str, stats: &WriteStats, opts: &Options) {
    if opts.json_output {
        let sha256 = stats
            .sha256
            .map(|d| d.iter().map(|b| format!("{b:02x}")).collect::<String>());
        let value = serde_json::json!({
            "command": command,
            "bytes": stats.bytes,
            "lines": stats.lines,
            "segments": stats.segments,
            "sha256": sha256,
        });
        eprintln!("{value}");
    } else if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "vlqmap: {command}: {} lines, {} segments, {} bytes",
            stats.lines, stats.segments, stats.bytes
        );
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_generate(args: &GenerateArgs, opts: &Options) -> i32 {
    let output = args.output.clone().unwrap_or_else(|| {
        let mut name = args.input.clone().into_os_string();
        name.push(".map");
        PathBuf::from(name)
    });
    if let Err(code) = check_overwrite(&output, opts) {
        return code;
    }

    let result = if args.pretty {
        map_io::generate_file(&args.input, args.name.as_deref()).and_then(|map| {
            map_io::write_file(&output, &map, WriteOptions { pretty: true })
        })
    } else {
        map_io::stream_generate_file(&args.input, &output, args.name.as_deref())
    };
    match result {
        Ok(stats) => {
            report_stats("generate", &stats, opts);
            0
        }
        Err(e) => {
            eprintln!("vlqmap: generate: {}: {e}", args.input.display());
            1
        }
    }
}

fn cmd_merge(args: &MergeArgs, opts: &Options) -> i32 {
    let mut maps = Vec::with_capacity(args.maps.len());
    for path in &args.maps {
        match read_map(path, args.read.options()) {
            Ok(parsed) => maps.push(parsed.map),
            Err(code) => return code,
        }
    }

    let merge_opts = MergeOptions {
        placement: if args.overlay {
            LinePlacement::Overlay
        } else {
            LinePlacement::Concatenate
        },
    };
    let merged = ops::merge(&args.file, &maps, merge_opts);
    let json = match merged.to_json(WriteOptions {
        pretty: args.pretty,
    }) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("vlqmap: merge: {e}");
            return 1;
        }
    };
    if let Err(code) = write_output(args.output.as_deref(), &json, opts) {
        return code;
    }

    let stats = WriteStats {
        bytes: json.len() as u64,
        lines: merged.mappings.line_count(),
        segments: merged.mappings.segment_count(),
        sha256: None,
    };
    report_stats("merge", &stats, opts);
    0
}

fn cmd_decode(args: &MapArgs, opts: &Options) -> i32 {
    let parsed = match read_map(&args.map, args.read.options()) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let map = &parsed.map;
    let tracked = map.table.name_mode().is_tracked();

    let mut out = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
    let result = (|| -> io::Result<()> {
        for (line, seg) in map.mappings.iter() {
            let source = map
                .table
                .sources
                .get(seg.source_index as usize)
                .map_or("?", String::as_str);
            write!(
                out,
                "{line}:{}\t{source}:{}:{}",
                seg.generated_column, seg.source_line, seg.source_column
            )?;
            if tracked {
                let name = map
                    .table
                    .names
                    .get(seg.name_index as usize)
                    .map_or("?", String::as_str);
                write!(out, "\t{name}")?;
            }
            writeln!(out)?;
        }
        out.flush()
    })();
    if let Err(e) = result {
        eprintln!("vlqmap: decode: {e}");
        return 1;
    }

    if opts.json_output {
        let value = serde_json::json!({
            "command": "decode",
            "lines": parsed.decode.lines,
            "segments": parsed.decode.segments,
            "degraded_fields": parsed.decode.degraded_fields,
            "skipped_tokens": parsed.decode.skipped_tokens,
        });
        eprintln!("{value}");
    }
    0
}

fn cmd_check(args: &MapArgs, opts: &Options) -> i32 {
    let parsed = match read_map(&args.map, args.read.options()) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let mut code = 0;
    if let Err(e) = parsed.map.validate() {
        eprintln!("vlqmap: check: {}: {e}", args.map.display());
        code = EXIT_INVALID;
    }
    if parsed.decode.is_degraded() {
        eprintln!(
            "vlqmap: check: {}: {} mapping field(s) could not be decoded",
            args.map.display(),
            parsed.decode.degraded_fields
        );
        code = EXIT_INVALID;
    }
    if !parsed.missing_content.is_empty() {
        eprintln!(
            "vlqmap: check: {}: {} source(s) without content",
            args.map.display(),
            parsed.missing_content.len()
        );
    }

    if code == 0 && !opts.quiet {
        println!(
            "{}: ok ({} lines, {} segments, {} sources)",
            args.map.display(),
            parsed.decode.lines,
            parsed.decode.segments,
            parsed.map.table.len()
        );
    }
    code
}

fn cmd_recode(args: &RecodeArgs, opts: &Options) -> i32 {
    let parsed = match read_map(&args.map, args.read.options()) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let json = match parsed.map.to_json(WriteOptions {
        pretty: args.pretty,
    }) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("vlqmap: recode: {e}");
            return 1;
        }
    };
    if let Err(code) = write_output(args.output.as_deref(), &json, opts) {
        return code;
    }

    let stats = WriteStats {
        bytes: json.len() as u64,
        lines: parsed.map.mappings.line_count(),
        segments: parsed.map.mappings.segment_count(),
        sha256: None,
    };
    report_stats("recode", &stats, opts);
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = Options::from_cli(&cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(opts.log_filter()))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match &cli.command {
        Cmd::Generate(args) => cmd_generate(args, &opts),
        Cmd::Merge(args) => cmd_merge(args, &opts),
        Cmd::Decode(args) => cmd_decode(args, &opts),
        Cmd::Check(args) => cmd_check(args, &opts),
        Cmd::Recode(args) => cmd_recode(args, &opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
