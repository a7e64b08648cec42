// Command-line front end for oxibps.
//
// Explicit subcommands: `apply` writes a patched file, `header` and
// `commands` inspect a patch without a source, `config` prints the build.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::bps::{self, CommandKind, LogDiagnostics};
use crate::io::{self as file_io, FileApplyStats};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// BPS binary patch applier.
#[derive(Parser, Debug)]
#[command(
    name = "oxibps",
    version,
    about = "BPS binary patch applier",
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

    /// Verbose mode (use twice to log every command).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Apply a BPS patch to a source file.
    Apply(ApplyArgs),
    /// Print the header and footer of a BPS patch.
    Header(PrintArgs),
    /// Print every command in a BPS patch.
    Commands(PrintArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Source file the patch applies to.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Apply and verify only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Output file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PrintArgs {
    /// Patch file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Apply,
    PrintHeader,
    PrintCommands,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    no_output: bool,
    source_file: Option<PathBuf>,
    patch_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        use_stdout: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        no_output: false,
        source_file: None,
        patch_file: None,
        output_file: None,
        json_output: cli.json_output,
    };

    match cli.command {
        Cmd::Apply(args) => {
            opts.command = Command::Apply;
            opts.use_stdout = args.stdout;
            opts.no_output = args.no_output;
            opts.source_file = Some(args.source);
            opts.patch_file = Some(args.patch);
            opts.output_file = args.output;
        }
        Cmd::Header(args) => {
            opts.command = Command::PrintHeader;
            opts.patch_file = Some(args.patch);
        }
        Cmd::Commands(args) => {
            opts.command = Command::PrintCommands;
            opts.patch_file = Some(args.patch);
        }
        Cmd::Config => {}
    }
    opts
}

/// Log filter for the requested verbosity.
fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxibps".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = log_filter(&opts);
    }
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxibps version {version} (Rust), Copyright (C) oxibps contributors");
    eprintln!("Licensed under the MIT License");

    let cli = cfg!(feature = "cli") as u8;
    let file_io = cfg!(feature = "file-io") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("CLI={cli}");
    eprintln!("FILE_IO={file_io}");
    eprintln!("BPS_MAGIC={}", String::from_utf8_lossy(&bps::BPS_MAGIC));
    eprintln!("BPS_FOOTER_LEN={}", bps::FOOTER_LEN);
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Apply command
// ---------------------------------------------------------------------------

fn print_apply_stats(opts: &Options, stats: &FileApplyStats) {
    if opts.verbose > 0 && !opts.quiet {
        let c = &stats.patch.commands;
        eprintln!(
            "oxibps: applied: output size: {}, commands: {} \
             (sourceRead {}, targetRead {}, sourceCopy {}, targetCopy {})",
            stats.output_size,
            c.total(),
            c.source_read,
            c.target_read,
            c.source_copy,
            c.target_copy
        );
    }
    if opts.json_output {
        let c = &stats.patch.commands;
        let sha256 = stats.output_sha256.map(|d| bps::HexBytes(&d).to_string());
        let json = serde_json::json!({
            "command": "apply",
            "source_size": stats.patch.source_size,
            "target_size": stats.patch.target_size,
            "patch_size": stats.patch.patch_size,
            "metadata_len": stats.patch.metadata_len,
            "output_size": stats.output_size,
            "output_sha256": sha256,
            "commands": {
                "source_read": c.source_read,
                "target_read": c.target_read,
                "source_copy": c.source_copy,
                "target_copy": c.target_copy,
            },
        });
        match serde_json::to_string_pretty(&json) {
            Ok(s) => eprintln!("{s}"),
            Err(e) => eprintln!("oxibps: json: {e}"),
        }
    }
}

fn cmd_apply(opts: &Options) -> i32 {
    let Some(patch_path) = opts.patch_file.as_deref() else {
        eprintln!("oxibps: apply requires a patch file");
        return 1;
    };

    let Some(source_path) = opts.source_file.as_deref() else {
        eprintln!("oxibps: apply requires a source file");
        return 1;
    };

    let result = if opts.no_output {
        file_io::apply_to_writer(source_path, patch_path, &mut io::sink(), &mut LogDiagnostics)
    } else if opts.use_stdout || opts.output_file.is_none() {
        let mut out = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
        file_io::apply_to_writer(source_path, patch_path, &mut out, &mut LogDiagnostics)
    } else {
        let Some(path) = opts.output_file.as_deref() else {
            return 1;
        };
        if path.exists() && !opts.force {
            eprintln!(
                "oxibps: output file exists, use -f to overwrite: {}",
                path.display()
            );
            return 1;
        }
        file_io::apply_file(source_path, patch_path, path, &mut LogDiagnostics)
    };

    match result {
        Ok(stats) => {
            print_apply_stats(opts, &stats);
            0
        }
        Err(e) => {
            eprintln!("oxibps: {}: {e}", patch_path.display());
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Print commands
// ---------------------------------------------------------------------------

fn read_patch(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            eprintln!("oxibps: {}: {e}", path.display());
            None
        }
    }
}

fn cmd_print_header(opts: &Options) -> i32 {
    let Some(path) = opts.patch_file.as_deref() else {
        eprintln!("oxibps: print commands require a patch file");
        return 1;
    };
    let Some(patch) = read_patch(path) else {
        return 1;
    };

    let (header, footer, commands) = match bps::inspect(&patch) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("oxibps: invalid BPS patch: {e}");
            return 1;
        }
    };
    let command_bytes = patch
        .len()
        .saturating_sub(header.encoded_len() + bps::FOOTER_LEN);
    let computed = bps::Checksum::of(&patch[..patch.len().saturating_sub(4)]);

    println!("BPS patch size:               {}", patch.len());
    println!("BPS header size:              {}", header.encoded_len());
    println!("BPS source size:              {}", header.source_size);
    println!("BPS target size:              {}", header.target_size);
    println!("BPS metadata size:            {}", header.metadata.len());
    if !header.metadata.is_empty() {
        println!("BPS metadata:                 {}", header.metadata_str());
    }
    println!("BPS command bytes:            {command_bytes}");
    println!("BPS source CRC32:             {}", footer.source);
    println!("BPS target CRC32:             {}", footer.target);
    if computed == footer.patch {
        println!("BPS patch CRC32:              {} (ok)", footer.patch);
    } else {
        println!(
            "BPS patch CRC32:              {} (computed {computed})",
            footer.patch
        );
    }

    let mut counts = bps::CommandCounts::default();
    let mut described: u64 = 0;
    let mut stream_error = None;
    for entry in commands {
        match entry {
            Ok(entry) => {
                counts.record(entry.command.kind());
                described = described.saturating_add(entry.command.len());
            }
            Err(e) => {
                stream_error = Some(e);
                break;
            }
        }
    }
    for kind in CommandKind::ALL {
        println!("BPS {:<26}{}", format!("{kind} commands:"), counts.get(kind));
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "header",
            "patch_size": patch.len(),
            "source_size": header.source_size,
            "target_size": header.target_size,
            "metadata_len": header.metadata.len(),
            "source_crc32": footer.source.to_string(),
            "target_crc32": footer.target.to_string(),
            "patch_crc32": footer.patch.to_string(),
            "commands": counts.total(),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(s) => eprintln!("{s}"),
            Err(e) => eprintln!("oxibps: json: {e}"),
        }
    }

    if let Some(e) = stream_error {
        eprintln!("oxibps: command stream: {e}");
        return 1;
    }
    if described != header.target_size && !opts.quiet {
        eprintln!(
            "oxibps: warning: commands describe {described} bytes, header declares {}",
            header.target_size
        );
    }
    0
}

fn cmd_print_commands(opts: &Options) -> i32 {
    let Some(path) = opts.patch_file.as_deref() else {
        eprintln!("oxibps: print commands require a patch file");
        return 1;
    };
    let Some(patch) = read_patch(path) else {
        return 1;
    };

    let (_, _, commands) = match bps::inspect(&patch) {
        Ok(parts) => parts,
        Err(e) => {
            eprintln!("oxibps: invalid BPS patch: {e}");
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(BUF_SIZE, stdout.lock());
    let mut total: u64 = 0;
    let mut status = 0;

    let _ = writeln!(out, "  Offset   Target     Command        Length  From");
    for entry in commands {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let _ = out.flush();
                eprintln!("oxibps: command {total}: {e}");
                status = 1;
                break;
            }
        };
        let from = match entry.copy_from {
            Some(from) => format!("{from:#08x}"),
            None => String::new(),
        };
        let written = writeln!(
            out,
            "{:#08x} {:#010x} {:<12} {:>8}  {from}",
            entry.patch_offset,
            entry.output_offset,
            entry.command.kind(),
            entry.command.len()
        );
        if let Err(e) = written {
            eprintln!("oxibps: write error: {e}");
            return 1;
        }
        total += 1;
    }

    if let Err(e) = out.flush() {
        eprintln!("oxibps: write flush error: {e}");
        return 1;
    }
    if opts.verbose > 0 && !opts.quiet {
        eprintln!("oxibps: {total} commands");
    }
    status
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        eprintln!(
            "oxibps: warning: -c option overrides output filename: {}",
            path.display()
        );
    }

    let exit_code = match opts.command {
        Command::Apply => cmd_apply(&opts),
        Command::PrintHeader => cmd_print_header(&opts),
        Command::PrintCommands => cmd_print_commands(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
