//! CLI entry point for coffeewatch.
//!
//! Compiles CoffeeScript sources to JavaScript on demand or whenever they
//! change, routing each output by the configured watch patterns.
//!
//! # Usage
//!
//! ```bash
//! coffeewatch [OPTIONS] <COMMAND>
//!
//! # Compile every source under app/coffeescripts into public/javascripts
//! coffeewatch --input app/coffeescripts --output public/javascripts compile
//!
//! # Recompile on change, starting with a full build
//! coffeewatch --input app/coffeescripts watch --all-on-start
//!
//! # Delete the outputs of sources that are gone
//! coffeewatch --input app/coffeescripts clean app/coffeescripts/old.coffee
//! ```
//!
//! Settings are read from `coffeewatch.json` in the working root (or the file
//! named by `--config`); command-line flags override them.

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{WrapErr, eyre};
use cw_compiler::CoffeeCommand;
use cw_core::{BareOption, Config, RunSummary, UnmatchedPolicy};
use cw_runner::{Orchestrator, TracingReporter, WatchPattern, compile_patterns};
use cw_watcher::{BatchPaths, EventBatchStats, FileEventBatch, FileWatcher, SourceFilter};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Watches and compiles CoffeeScript sources.
#[derive(Parser)]
#[command(name = "coffeewatch", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Working root that source paths are relative to.
    ///
    /// Defaults to the current directory.
    #[arg(short, long, global = true, env = "COFFEEWATCH_PATH")]
    path: Option<Utf8PathBuf>,

    /// Configuration file (defaults to `coffeewatch.json` in the working root).
    #[arg(short, long, global = true, env = "COFFEEWATCH_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// CoffeeScript compiler executable (defaults to `coffee` on PATH).
    #[arg(long, global = true, env = "COFFEEWATCH_COFFEE")]
    coffee: Option<Utf8PathBuf>,

    /// Run options overriding the configuration file.
    #[command(flatten)]
    run: RunArgs,

    /// Directory name to ignore when searching and watching (repeatable).
    #[arg(long = "skip-dir", value_name = "NAME", global = true)]
    skip_dirs: Vec<String>,

    /// Follow symbolic links when searching for sources.
    #[arg(long, global = true)]
    follow_links: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Flags that map onto [`cw_core::RunOptions`].
///
/// Switches only ever turn a setting on, so a value from the configuration
/// file cannot be switched off from the command line.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Input directory; adds a pattern matching every source beneath it.
    #[arg(short, long, global = true)]
    input: Option<Utf8PathBuf>,

    /// Output root (defaults to the input directory).
    #[arg(short, long, global = true)]
    output: Option<Utf8PathBuf>,

    /// Watch pattern (regular expression, repeatable). Capture group 1 is the
    /// sub-path mirrored under the output root.
    #[arg(long = "pattern", value_name = "REGEX", global = true)]
    patterns: Vec<String>,

    /// Write every output directly into the output root.
    #[arg(long, global = true)]
    shallow: bool,

    /// Compile every file without the top-level function wrapper.
    #[arg(long, global = true, conflicts_with = "bare_files")]
    bare: bool,

    /// Compile only this file name without the wrapper (repeatable).
    #[arg(long = "bare-file", value_name = "NAME", global = true)]
    bare_files: Vec<String>,

    /// Parse every source as literate CoffeeScript.
    #[arg(long, global = true)]
    literate: bool,

    /// Route and compile without writing or deleting anything.
    #[arg(long, global = true)]
    noop: bool,

    /// Do not report successful runs (failures and recoveries still are).
    #[arg(long, global = true)]
    hide_success: bool,

    /// Write a throwing stub where an output failed to compile.
    #[arg(long, global = true)]
    error_to_output: bool,

    /// Write a `.js.map` next to every output.
    #[arg(long, global = true)]
    source_map: bool,

    /// Source root recorded in source maps (defaults to the input directory).
    #[arg(long, global = true)]
    source_root: Option<String>,

    /// Replace the start-of-run message.
    #[arg(long, global = true)]
    message: Option<String>,

    /// Where to send files no pattern matches.
    #[arg(long, value_enum, global = true)]
    unmatched: Option<UnmatchedArg>,
}

/// Command-line spelling of [`UnmatchedPolicy`].
#[derive(Clone, Copy, Debug, ValueEnum)]
enum UnmatchedArg {
    /// Leave the file alone.
    Skip,
    /// Write the output next to the source.
    SourceDirectory,
    /// Write the output into the output root.
    OutputRoot,
}

impl From<UnmatchedArg> for UnmatchedPolicy {
    fn from(arg: UnmatchedArg) -> Self {
        match arg {
            UnmatchedArg::Skip => Self::Skip,
            UnmatchedArg::SourceDirectory => Self::SourceDirectory,
            UnmatchedArg::OutputRoot => Self::OutputRoot,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile the given sources, or every matching source when none are given.
    Compile {
        /// Sources relative to the working root.
        paths: Vec<String>,

        /// Print the run summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete the outputs of the given sources.
    Clean {
        /// Sources relative to the working root; they need not exist.
        #[arg(required = true)]
        paths: Vec<String>,

        /// Print the removed paths as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Recompile sources as they change and clean up after removed ones.
    Watch {
        /// Compile every matching source before watching.
        #[arg(long)]
        all_on_start: bool,

        /// Debounce window in milliseconds.
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },

    /// Locate the CoffeeScript compiler and print its version.
    Check,
}

impl RunArgs {
    /// Folds the flags into `config`.
    fn apply(&self, config: &mut Config) {
        let run = &mut config.run;

        if let Some(input) = &self.input {
            run.input = Some(input.clone());
        }
        if let Some(output) = &self.output {
            run.output = Some(output.clone());
        }
        if self.bare {
            run.bare = BareOption::Always(true);
        } else if !self.bare_files.is_empty() {
            run.bare = BareOption::per_file(self.bare_files.iter().cloned());
        }
        if self.source_root.is_some() {
            run.source_root.clone_from(&self.source_root);
        }
        if self.message.is_some() {
            run.message.clone_from(&self.message);
        }
        if let Some(unmatched) = self.unmatched {
            run.unmatched = unmatched.into();
        }

        run.shallow |= self.shallow;
        run.literate |= self.literate;
        run.noop |= self.noop;
        run.hide_success |= self.hide_success;
        run.error_to_output |= self.error_to_output;
        run.source_map |= self.source_map;

        config.patterns.extend(self.patterns.iter().cloned());
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` when set; otherwise `debug` with `--verbose`, else
/// `info`. The `notify` backend is held at `warn`.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,mio=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Everything a command needs, resolved from flags and the config file.
struct Context {
    root: Utf8PathBuf,
    config: Config,
    patterns: Vec<WatchPattern>,
    coffee: CoffeeCommand,
}

impl Context {
    fn orchestrator(&self) -> Orchestrator<&CoffeeCommand, TracingReporter> {
        Orchestrator::new(&self.coffee, TracingReporter, self.root.clone())
            .with_sources(self.config.sources.clone())
    }

    fn source_filter(&self) -> SourceFilter {
        self.config
            .sources
            .skip_dirs
            .iter()
            .fold(SourceFilter::default(), |filter, dir| filter.exclude_dir(dir.as_str()))
    }
}

/// Builds the [`Context`] from CLI arguments.
///
/// # Errors
///
/// Returns an error if the working root is not a directory, the config file
/// cannot be loaded, the merged options are invalid, or a pattern does not
/// compile.
fn build_context(cli: &Cli) -> color_eyre::Result<Context> {
    let root = cli.path.clone().unwrap_or_else(|| Utf8PathBuf::from("."));

    if !root.exists() {
        return Err(eyre!("Path does not exist: {root}"));
    }
    if !root.is_dir() {
        return Err(eyre!("Path is not a directory: {root}"));
    }

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("Failed to load configuration from {path}"))?,
        None => Config::discover(&root).wrap_err("Failed to load configuration")?,
    };

    cli.run.apply(&mut config);
    config.sources.skip_dirs.extend(cli.skip_dirs.iter().cloned());
    config.sources.follow_links |= cli.follow_links;
    config.run.validate()?;

    let patterns = compile_patterns(&config.patterns, &config.run)?;
    if patterns.is_empty() && !config.run.shallow {
        info!("No watch patterns configured; use --input or --pattern to route sources");
    }

    let coffee = cli
        .coffee
        .clone()
        .map_or_else(CoffeeCommand::new, CoffeeCommand::with_program);

    debug!(root = %root, patterns = patterns.len(), "Configuration loaded");

    Ok(Context {
        root,
        config,
        patterns,
        coffee,
    })
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Compiles the given paths, or everything matching when none are given.
///
/// # Errors
///
/// Returns an error if the working root cannot be walked or stdout fails.
fn run_compile(ctx: &Context, paths: &[String], json: bool) -> color_eyre::Result<ExitCode> {
    let mut orchestrator = ctx.orchestrator();

    let summary = if paths.is_empty() {
        orchestrator.run_all(&ctx.patterns, &ctx.config.run)?
    } else {
        orchestrator.run_on_changes(paths, &ctx.patterns, &ctx.config.run)
    };

    if json {
        print_json(&summary)?;
    }

    Ok(exit_code(&summary))
}

/// Deletes the artifacts of the given paths.
///
/// # Errors
///
/// Returns an error if stdout fails.
fn run_clean(ctx: &Context, paths: &[String], json: bool) -> color_eyre::Result<ExitCode> {
    let removed = ctx
        .orchestrator()
        .run_on_removals(paths, &ctx.patterns, &ctx.config.run);

    if json {
        print_json(&removed)?;
    } else if removed.is_empty() {
        info!("Nothing to remove");
    }

    Ok(ExitCode::SUCCESS)
}

/// Watches the working root until interrupted.
///
/// # Errors
///
/// Returns an error if the watcher cannot start or stops abnormally.
async fn run_watch(
    ctx: &Context,
    all_on_start: bool,
    debounce_ms: Option<u64>,
) -> color_eyre::Result<ExitCode> {
    let mut watch = ctx.config.watch;
    if let Some(ms) = debounce_ms {
        watch.debounce_ms = ms;
    }

    let mut orchestrator = ctx.orchestrator();
    let options = &ctx.config.run;

    if all_on_start || options.all_on_start {
        orchestrator.run_all(&ctx.patterns, options)?;
    }

    let mut watcher = FileWatcher::new(&ctx.root, &watch, ctx.source_filter()).await?;
    let settle = Duration::from_millis(watch.debounce_ms);
    let root = watcher.watch_path().to_path_buf();

    info!(root = %root, debounce_ms = watch.debounce_ms, "Watching for changes");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            batch = watcher.next_batch(settle) => {
                let Some(batch) = batch else {
                    info!("Watcher stopped");
                    break;
                };
                handle_batch(&mut orchestrator, &batch, &root, &ctx.patterns, options);
            }
            () = &mut shutdown => {
                info!("Received shutdown signal, stopping");
                break;
            }
        }
    }

    watcher.shutdown().await?;
    Ok(ExitCode::SUCCESS)
}

/// Feeds one batch of events to the orchestrator, removals first.
fn handle_batch(
    orchestrator: &mut Orchestrator<&CoffeeCommand, TracingReporter>,
    batch: &FileEventBatch,
    root: &Utf8Path,
    patterns: &[WatchPattern],
    options: &cw_core::RunOptions,
) {
    let stats = EventBatchStats::from_batch(batch);
    debug!(
        events = stats.total_events,
        sources = stats.source_events,
        removals = stats.removals,
        "Processing batch"
    );

    let BatchPaths { changed, removed } = batch.split(root);

    if !removed.is_empty() {
        orchestrator.run_on_removals(&removed, patterns, options);
    }
    if !changed.is_empty() {
        orchestrator.run_on_changes(&changed, patterns, options);
    }
}

/// Locates the compiler and prints its path and version.
///
/// # Errors
///
/// Returns an error if the compiler cannot be found or run.
fn run_check(ctx: &Context) -> color_eyre::Result<ExitCode> {
    let program = ctx.coffee.locate()?.to_owned();
    let version = ctx.coffee.version()?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{program}: CoffeeScript {version}")?;

    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| eyre!("Failed to serialize JSON: {e}"))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

fn exit_code(summary: &RunSummary) -> ExitCode {
    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to listen for SIGTERM");
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    // Install color-eyre before anything can fail.
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let ctx = build_context(&cli)?;

    match &cli.command {
        Commands::Compile { paths, json } => run_compile(&ctx, paths, *json),
        Commands::Clean { paths, json } => run_clean(&ctx, paths, *json),
        Commands::Watch {
            all_on_start,
            debounce_ms,
        } => run_watch(&ctx, *all_on_start, *debounce_ms).await,
        Commands::Check => run_check(&ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("coffeewatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["compile", "a.coffee", "--input", "src", "--bare"]);
        assert_eq!(cli.run.input.as_deref(), Some(Utf8Path::new("src")));
        assert!(cli.run.bare);
        assert!(matches!(cli.command, Commands::Compile { ref paths, json: false } if paths == &["a.coffee"]));
    }

    #[test]
    fn test_bare_conflicts_with_bare_file() {
        let result = Cli::try_parse_from(["coffeewatch", "--bare", "--bare-file", "a.coffee", "check"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_clean_requires_paths() {
        assert!(Cli::try_parse_from(["coffeewatch", "clean"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config: Config = serde_json::from_str(
            r#"{ "patterns": ["^lib/(.+\\.coffee)$"], "run": { "output": "dist", "literate": true } }"#,
        )
        .unwrap();

        let cli = parse(&[
            "--output",
            "public",
            "--bare-file",
            "vendor.coffee",
            "--pattern",
            "^app/(.+)$",
            "--unmatched",
            "source-directory",
            "--noop",
            "compile",
        ]);
        cli.run.apply(&mut config);

        assert_eq!(config.run.output.as_deref(), Some(Utf8Path::new("public")));
        assert_eq!(config.run.bare, BareOption::per_file(["vendor.coffee"]));
        assert_eq!(config.run.unmatched, UnmatchedPolicy::SourceDirectory);
        assert!(config.run.noop);
        // Switches never turn a configured setting off.
        assert!(config.run.literate);
        assert_eq!(config.patterns, ["^lib/(.+\\.coffee)$", "^app/(.+)$"]);
    }

    #[test]
    fn test_build_context_from_discovered_config() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        std::fs::write(
            root.join(Config::FILE_NAME),
            r#"{ "run": { "input": "app", "hide_success": true } }"#,
        )
        .unwrap();

        let cli = parse(&["--path", root.as_str(), "--shallow", "compile"]);
        let ctx = build_context(&cli).unwrap();

        assert!(ctx.config.run.hide_success);
        assert!(ctx.config.run.shallow);
        assert_eq!(ctx.patterns.len(), 1);
        assert!(ctx.patterns[0].is_match(Utf8Path::new("app/x/a.coffee")));
    }

    #[test]
    fn test_skip_dirs_reach_discovery_and_watching() {
        use cw_watcher::FileFilter;

        let temp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();
        std::fs::write(
            root.join(Config::FILE_NAME),
            r#"{ "sources": { "skip_dirs": ["vendor"] } }"#,
        )
        .unwrap();

        let cli = parse(&["--path", root.as_str(), "--skip-dir", "tmp", "--follow-links", "check"]);
        let ctx = build_context(&cli).unwrap();

        assert_eq!(ctx.config.sources.skip_dirs, ["vendor", "tmp"]);
        assert!(ctx.config.sources.follow_links);

        let filter = ctx.source_filter();
        assert!(!filter.should_process(Utf8Path::new("/p/tmp/a.coffee")));
        assert!(!filter.should_process(Utf8Path::new("/p/vendor/a.coffee")));
        assert!(filter.should_process(Utf8Path::new("/p/app/a.coffee")));
    }

    #[test]
    fn test_build_context_rejects_missing_root() {
        let cli = parse(&["--path", "/nonexistent/coffeewatch/root", "check"]);
        assert!(build_context(&cli).is_err());
    }

    #[test]
    fn test_build_context_rejects_bad_pattern() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(temp.path()).unwrap();

        let cli = parse(&["--path", root.as_str(), "--pattern", "(unclosed", "check"]);
        assert!(build_context(&cli).is_err());
    }

    #[test]
    fn test_exit_code_follows_summary() {
        let mut summary = RunSummary::default();
        assert_eq!(exit_code(&summary), ExitCode::SUCCESS);
        summary.push_error(cw_core::FileError::new("a.coffee", "boom"));
        assert_eq!(exit_code(&summary), ExitCode::FAILURE);
    }
}
