// Command-line front-end for midips.
//
// Explicit subcommands with long-form options; `c` and `a` stay available
// as short aliases for `create` and `apply`. Only this module reports errors
// and picks the process exit status.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::io::{apply_patch_file, create_patch_file};
use crate::ips::apply::{ApplyOptions, PatchReader};
use crate::ips::create::CreateOptions;
use crate::ips::hunk::OverflowPolicy;
use crate::stream::{ByteStream, OpenMode};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// IPS patch creator/applier.
#[derive(Parser, Debug)]
#[command(
    name = "midips",
    version,
    about = "Create and apply IPS patches",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output, including hunk lines).
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
    /// Create an IPS patch that turns SOURCE into TARGET.
    #[command(visible_alias = "c")]
    Create(CreateArgs),
    /// Apply an IPS patch to a file in place.
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),
    /// Print every hunk of an IPS patch without applying it.
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Original file.
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Modified file.
    #[arg(long, short = 't', value_hint = ValueHint::FilePath)]
    target: PathBuf,

    /// Patch file to write.
    #[arg(long, short = 'o', value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Write one line per hunk to this file instead of stdout.
    #[arg(long, short = 'l', value_hint = ValueHint::FilePath)]
    log: Option<PathBuf>,

    /// Fail instead of skipping hunks past offset 0xFFFFFF.
    #[arg(long = "strict-offsets")]
    strict_offsets: bool,

    /// Terminate the patch with the `EOF` record other IPS tools expect.
    #[arg(long = "eof-marker")]
    eof_marker: bool,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// IPS patch to apply.
    #[arg(long, short = 'p', value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// File patched in place.
    #[arg(long, short = 'a', value_hint = ValueHint::FilePath)]
    file: PathBuf,

    /// Write one line per hunk to this file instead of stdout.
    #[arg(long, short = 'l', value_hint = ValueHint::FilePath)]
    log: Option<PathBuf>,

    /// Apply hunks past offset 0xFFFFFF instead of skipping them.
    #[arg(long = "allow-above-u24")]
    allow_above_u24: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// IPS patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create,
    Apply,
    Inspect,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    source_file: Option<PathBuf>,
    target_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    patch_file: Option<PathBuf>,
    log_file: Option<PathBuf>,
    strict_offsets: bool,
    eof_marker: bool,
    allow_above_u24: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Inspect,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        source_file: None,
        target_file: None,
        output_file: None,
        patch_file: None,
        log_file: None,
        strict_offsets: false,
        eof_marker: false,
        allow_above_u24: false,
    };

    match cli.command {
        Cmd::Create(args) => {
            opts.command = Command::Create;
            opts.source_file = Some(args.source);
            opts.target_file = Some(args.target);
            opts.output_file = Some(args.output);
            opts.log_file = args.log;
            opts.strict_offsets = args.strict_offsets;
            opts.eof_marker = args.eof_marker;
        }
        Cmd::Apply(args) => {
            opts.command = Command::Apply;
            opts.patch_file = Some(args.patch);
            // The patched file is both read and written.
            opts.target_file = Some(args.file);
            opts.log_file = args.log;
            opts.allow_above_u24 = args.allow_above_u24;
        }
        Cmd::Inspect(args) => {
            opts.command = Command::Inspect;
            opts.patch_file = Some(args.patch);
        }
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("midips".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn build_create_options(opts: &Options) -> CreateOptions {
    CreateOptions {
        overflow: if opts.strict_offsets {
            OverflowPolicy::Fail
        } else {
            OverflowPolicy::Skip
        },
        eof_marker: opts.eof_marker,
    }
}

fn build_apply_options(opts: &Options) -> ApplyOptions {
    ApplyOptions {
        allow_above_u24: opts.allow_above_u24,
    }
}

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Hunk line sink: the `--log` file, stdout, or nothing in quiet mode.
fn open_hunk_log(path: Option<&Path>, quiet: bool) -> io::Result<Option<Box<dyn Write>>> {
    match path {
        Some(p) => Ok(Some(Box::new(BufWriter::new(File::create(p)?)))),
        None if quiet => Ok(None),
        None => Ok(Some(Box::new(BufWriter::new(io::stdout().lock())))),
    }
}

fn print_json(json: serde_json::Value) {
    match serde_json::to_string_pretty(&json) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("midips: json error: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Create command
// ---------------------------------------------------------------------------

fn cmd_create(opts: &Options) -> i32 {
    let (Some(source), Some(target), Some(output)) =
        (&opts.source_file, &opts.target_file, &opts.output_file)
    else {
        eprintln!("midips: create requires --source, --target and --output");
        return 1;
    };

    if output.exists() && !opts.force {
        eprintln!(
            "midips: output file exists, use -f to overwrite: {}",
            output.display()
        );
        return 1;
    }

    let mut hunk_log = match open_hunk_log(opts.log_file.as_deref(), opts.quiet) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("midips: log file: {e}");
            return 1;
        }
    };

    let result = create_patch_file(
        source,
        target,
        output,
        &build_create_options(opts),
        hunk_log.as_mut().map(|w| &mut **w as &mut dyn Write),
    );
    if let Some(w) = hunk_log.as_mut()
        && let Err(e) = w.flush()
    {
        eprintln!("midips: log flush error: {e}");
    }

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("midips: create error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "midips: create: source size: {}, target size: {}, patch size: {}, hunks: {} \
             (skipped: {})",
            stats.source_size,
            stats.target_size,
            stats.patch_size,
            stats.summary.written,
            stats.summary.skipped
        );
    }

    if opts.json_output {
        print_json(serde_json::json!({
            "command": "create",
            "source_size": stats.source_size,
            "target_size": stats.target_size,
            "patch_size": stats.patch_size,
            "hunks": stats.summary.hunks,
            "written": stats.summary.written,
            "skipped": stats.summary.skipped,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Apply command
// ---------------------------------------------------------------------------

fn cmd_apply(opts: &Options) -> i32 {
    let (Some(patch), Some(file)) = (&opts.patch_file, &opts.target_file) else {
        eprintln!("midips: apply requires --patch and --file");
        return 1;
    };

    let mut hunk_log = match open_hunk_log(opts.log_file.as_deref(), opts.quiet) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("midips: log file: {e}");
            return 1;
        }
    };

    let result = apply_patch_file(
        patch,
        file,
        &build_apply_options(opts),
        hunk_log.as_mut().map(|w| &mut **w as &mut dyn Write),
    );
    if let Some(w) = hunk_log.as_mut()
        && let Err(e) = w.flush()
    {
        eprintln!("midips: log flush error: {e}");
    }

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("midips: apply error: {e}");
            return 1;
        }
    };

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "midips: apply: file size: {}, hunks: {}, written: {}, no-op: {}, skipped: {}",
            stats.file_size,
            stats.summary.hunks,
            stats.summary.written,
            stats.summary.noops,
            stats.summary.skipped
        );
    }

    if opts.json_output {
        print_json(serde_json::json!({
            "command": "apply",
            "patch_size": stats.patch_size,
            "file_size": stats.file_size,
            "hunks": stats.summary.hunks,
            "written": stats.summary.written,
            "noops": stats.summary.noops,
            "skipped": stats.summary.skipped,
            "bytes_written": stats.summary.bytes_written,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Inspect command
// ---------------------------------------------------------------------------

fn cmd_inspect(opts: &Options) -> i32 {
    let Some(path) = &opts.patch_file else {
        eprintln!("midips: inspect requires a patch file");
        return 1;
    };

    let mut input = match ByteStream::open(path, OpenMode::Read) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("midips: {e}");
            return 1;
        }
    };
    let patch_size = input.size();

    let reader = match PatchReader::new(&mut input) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("midips: {}: {e}", path.display());
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut hunks = 0u64;
    let mut rle = 0u64;
    let mut above_ceiling = 0u64;

    for item in reader {
        let hunk = match item {
            Ok(h) => h,
            Err(e) => {
                let _ = out.flush();
                eprintln!("midips: {}: {e}", path.display());
                return 1;
            }
        };
        hunks += 1;
        rle += hunk.is_rle() as u64;
        above_ceiling += hunk.is_above_ceiling() as u64;
        if let Err(e) = writeln!(out, "{hunk}") {
            eprintln!("midips: write error: {e}");
            return 1;
        }
    }
    if let Err(e) = out.flush() {
        eprintln!("midips: write error: {e}");
        return 1;
    }

    if !opts.quiet {
        eprintln!("midips: {}: {hunks} hunks ({rle} RLE)", path.display());
    }

    if opts.json_output {
        print_json(serde_json::json!({
            "command": "inspect",
            "patch_size": patch_size,
            "hunks": hunks,
            "rle_hunks": rle,
            "above_ceiling": above_ceiling,
        }));
    }

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Create => cmd_create(&opts),
        Command::Apply => cmd_apply(&opts),
        Command::Inspect => cmd_inspect(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
