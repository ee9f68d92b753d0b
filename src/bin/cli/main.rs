//! CLI tool that patches the game's asset container in place.

mod exit_codes;
mod output;
mod progress;

use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use nwpatch::patch::DEFAULT_TARGETS;
use nwpatch::{
    ArchiveLocator, EntryMethod, FixedLocator, PatchOptions, PatchTable, Patcher, default_locator,
};

use exit_codes::ExitCode;

/// Patches the game's package.nw with replacement atlas images
#[derive(Parser)]
#[command(name = "nwpatch")]
#[command(author, version, about = "Patches the game's package.nw with replacement atlas images", long_about = None)]
pub struct Cli {
    /// Container to patch (skips searching the Steam library)
    #[arg(long, short = 'a', env = "NWPATCH_ARCHIVE")]
    archive: Option<PathBuf>,

    /// Directory holding img/atlas0.png, img/atlas1.png and img/atlas2.png
    /// (default: `package` next to the executable)
    #[arg(long, short = 'p', env = "NWPATCH_PAYLOAD_DIR")]
    payload_dir: Option<PathBuf>,

    /// Suffix appended to the container path for the backup
    #[arg(long, default_value = nwpatch::backup::DEFAULT_SUFFIX)]
    backup_suffix: String,

    /// Store entries from non-zip sources without compression
    #[arg(long)]
    store: bool,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human")]
    format: OutputFormat,

    /// Suppress progress and log output
    #[arg(long, short = 'q')]
    quiet: bool,

    /// Wait for Enter before exiting
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = cfg!(windows),
        default_missing_value = "true"
    )]
    pause: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                exit_codes::BAD_ARGS
            } else {
                exit_codes::SUCCESS
            };
            std::process::exit(code);
        }
    };

    init_logging(cli.quiet);

    let exit_code = run(&cli);

    if cli.pause {
        pause();
    }
    std::process::exit(exit_code.code());
}

fn init_logging(quiet: bool) {
    let level = if quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli) -> ExitCode {
    let formatter = output::create_formatter(cli.format);

    let Some(payload_dir) = cli.payload_dir.clone().or_else(default_payload_dir) else {
        eprintln!("Error: cannot determine the payload directory, pass --payload-dir");
        return ExitCode::Failure;
    };
    let table = match PatchTable::load_targets(&payload_dir, DEFAULT_TARGETS) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: failed to load payloads: {}", e);
            return exit_codes::error_to_exit_code(&e);
        }
    };

    let locator: Box<dyn ArchiveLocator> = match &cli.archive {
        Some(path) => Box::new(FixedLocator::new(path)),
        None => default_locator(),
    };
    let method = if cli.store {
        EntryMethod::Stored
    } else {
        EntryMethod::Deflated
    };
    let options = PatchOptions::new()
        .backup_suffix(cli.backup_suffix.as_str())
        .default_method(method);
    let patcher = Patcher::new(locator, table).options(options);

    let quiet = cli.quiet || cli.format == OutputFormat::Json;
    let mut progress = progress::CliProgress::new(quiet);

    match patcher.run(&mut progress) {
        Ok(report) => {
            progress.finish(nwpatch::PatchState::Succeeded);
            println!("{}", formatter.format_report(&report));
            ExitCode::Success
        }
        Err(failure) => {
            progress.finish(failure.state);
            let message = formatter.format_failure(&failure);
            if cli.format == OutputFormat::Json {
                println!("{}", message);
            } else {
                eprint!("{}", message);
            }
            exit_codes::failure_to_exit_code(&failure)
        }
    }
}

/// Returns `package/` next to the executable.
fn default_payload_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("package"))
}

fn pause() {
    print!("Press Enter to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
