//! The run orchestrator.
//!
//! [`Orchestrator`] drives one batch at a time through the pipeline:
//!
//! ```text
//! raw paths ─► Inspector ─► route ─► (read ─► compile ─► write)* ─► report
//! ```
//!
//! A failing file never stops the batch; its error is recorded and the next
//! file is processed. A compiler that cannot be reached at all is reported
//! once and the run writes nothing. Exactly one outcome is reported per run.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use cw_compiler::{CompileOptions, Compiler};
use cw_core::{FileError, RunOptions, RunSummary, SourcesConfig, join_paths};
use tracing::{debug, warn};

use crate::discover::SourceWalker;
use crate::error::RunnerError;
use crate::inspector::{CleanOptions, Inspector};
use crate::pattern::WatchPattern;
use crate::reporter::{Notification, Reporter, TracingReporter};
use crate::router::{RoutingDecision, route};
use crate::writer::{ArtifactWriter, WrittenPaths};

/// Coordinates compile and removal runs for one working root.
///
/// The orchestrator remembers whether its previous run failed. With
/// `hide_success` set, success is then still reported once so recovery is
/// visible, and suppressed again on the runs after that.
///
/// # Examples
///
/// ```no_run
/// use cw_compiler::CoffeeCommand;
/// use cw_core::RunOptions;
/// use cw_runner::{Orchestrator, TracingReporter, WatchPattern};
///
/// let mut orchestrator = Orchestrator::new(CoffeeCommand::new(), TracingReporter, ".");
/// let patterns = [WatchPattern::new(r"^app/coffeescripts/(.+\.coffee)$")?];
/// let options = RunOptions {
///     output: Some("public/javascripts".into()),
///     ..RunOptions::default()
/// };
///
/// let summary = orchestrator.run_on_changes(["app/coffeescripts/app.coffee"], &patterns, &options);
/// for artifact in &summary.changed_artifacts {
///     println!("{artifact}");
/// }
/// # Ok::<(), cw_runner::RunnerError>(())
/// ```
#[derive(Debug)]
pub struct Orchestrator<C, R = TracingReporter> {
    compiler: C,
    reporter: R,
    writer: ArtifactWriter,
    sources: SourcesConfig,
    last_run_failed: bool,
}

impl<C: Compiler, R: Reporter> Orchestrator<C, R> {
    /// Creates an orchestrator for sources under `working_root`.
    pub fn new(compiler: C, reporter: R, working_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            compiler,
            reporter,
            writer: ArtifactWriter::new(working_root),
            sources: SourcesConfig::default(),
            last_run_failed: false,
        }
    }

    /// Sets how [`Orchestrator::run_all`] searches for sources.
    #[must_use]
    pub fn with_sources(mut self, sources: SourcesConfig) -> Self {
        self.sources = sources;
        self
    }

    /// Returns `true` if the last reported run had errors.
    #[inline]
    #[must_use]
    pub const fn last_run_failed(&self) -> bool {
        self.last_run_failed
    }

    /// Returns the compiler.
    #[inline]
    pub const fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Returns the reporter.
    #[inline]
    pub const fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Returns the working root.
    #[inline]
    #[must_use]
    pub fn working_root(&self) -> &Utf8Path {
        self.writer.working_root()
    }

    /// Returns an inspector for this working root.
    #[must_use]
    pub fn inspector(&self) -> Inspector<'_> {
        Inspector::new(self.working_root())
    }

    /// Compiles `files` and reports the outcome.
    ///
    /// `files` are expected to be clean (see [`Inspector::clean`]). A batch
    /// in which no file is routed (empty, or every file skipped as
    /// unmatched) does nothing and reports nothing.
    pub fn run(
        &mut self,
        files: &[Utf8PathBuf],
        patterns: &[WatchPattern],
        options: &RunOptions,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        if files.is_empty() {
            return summary;
        }

        let decisions = route(patterns, files, options).decisions();
        if decisions.is_empty() {
            debug!(count = files.len(), "No file routed; nothing to compile");
            return summary;
        }

        self.reporter.info(&start_message(files, options));

        match self.compiler.ensure_available() {
            Ok(()) => self.compile_routed(&decisions, options, &mut summary),
            Err(err) => {
                warn!(error = %err, "Compiler unavailable; nothing compiled");
                summary.push_error(FileError::run_wide(err.to_string()));
            }
        }

        self.report(&summary, options);
        summary
    }

    /// Deletes the artifacts `files` would have been compiled to.
    ///
    /// Artifacts that do not exist are skipped. Returns the removed paths (the
    /// would-be removals under noop).
    pub fn remove(
        &self,
        files: &[Utf8PathBuf],
        patterns: &[WatchPattern],
        options: &RunOptions,
    ) -> Vec<Utf8PathBuf> {
        let mut removed: Vec<Utf8PathBuf> = Vec::new();

        for decision in route(patterns, files, options).decisions() {
            match self.writer.remove(&decision, options) {
                Ok(paths) => {
                    for path in paths {
                        if !removed.contains(&path) {
                            removed.push(path);
                        }
                    }
                }
                Err(err) => {
                    warn!(source = %decision.source, error = %err, "Failed to remove artifact");
                    self.reporter.error(&err.to_string());
                }
            }
        }

        if !removed.is_empty() {
            let verb = if options.noop { "Would remove" } else { "Removed" };
            let message = format!("{verb} {}", join_paths(&removed));
            self.reporter.success(&message);
            self.reporter.notify(&Notification::success(message));
        }

        removed
    }

    /// Cleans raw changed paths and compiles what survives.
    pub fn run_on_changes<I, S>(
        &mut self,
        paths: I,
        patterns: &[WatchPattern],
        options: &RunOptions,
    ) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = self.inspector().clean(paths, CleanOptions::default());
        self.run(&files, patterns, options)
    }

    /// Cleans raw removed paths and deletes their artifacts.
    pub fn run_on_removals<I, S>(
        &self,
        paths: I,
        patterns: &[WatchPattern],
        options: &RunOptions,
    ) -> Vec<Utf8PathBuf>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = self.inspector().clean(
            paths,
            CleanOptions {
                allow_missing: true,
            },
        );
        self.remove(&files, patterns, options)
    }

    /// Compiles every source under the working root that a pattern matches.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Walk`] or [`RunnerError::NonUtf8Path`] if the
    /// working root cannot be searched.
    pub fn run_all(
        &mut self,
        patterns: &[WatchPattern],
        options: &RunOptions,
    ) -> Result<RunSummary, RunnerError> {
        let files: Vec<_> = SourceWalker::new(self.working_root())
            .with_skip_dirs(&self.sources.skip_dirs)
            .with_follow_links(self.sources.follow_links)
            .collect_sources()?
            .into_iter()
            .filter(|file| patterns.iter().any(|p| p.is_match(file)))
            .collect();

        debug!(count = files.len(), "Compiling all matching sources");
        Ok(self.run(&files, patterns, options))
    }

    fn compile_routed(
        &self,
        decisions: &[RoutingDecision],
        options: &RunOptions,
        summary: &mut RunSummary,
    ) {
        for decision in decisions {
            match self.compile_one(decision, options) {
                Ok(written) => summary.extend_artifacts(written),
                Err(err) if err.is_fatal() => {
                    warn!(source = %decision.source, error = %err, "Aborting run");
                    summary.push_error(FileError::run_wide(err.file_message()));
                    break;
                }
                Err(err) => {
                    warn!(source = %decision.source, error = %err, "Failed to build artifact");
                    let error = FileError::new(decision.source.clone(), err.file_message());

                    let stub = (options.error_to_output
                        && matches!(err, RunnerError::Compile { .. }))
                    .then(|| self.writer.write_error_stub(decision, &error, options));

                    summary.push_error(error);
                    match stub {
                        Some(Ok(path)) => summary.push_artifact(path),
                        Some(Err(stub_err)) => summary.push_error(FileError::new(
                            decision.source.clone(),
                            stub_err.file_message(),
                        )),
                        None => {}
                    }
                }
            }
        }
    }

    fn compile_one(
        &self,
        decision: &RoutingDecision,
        options: &RunOptions,
    ) -> Result<WrittenPaths, RunnerError> {
        let on_disk = self.writer.resolve(&decision.source);
        let source =
            fs::read_to_string(&on_disk).map_err(|e| RunnerError::read(&decision.source, e))?;

        let compile_options = CompileOptions::for_file(&decision.source, options);
        let output = self
            .compiler
            .compile(&source, &compile_options)
            .map_err(|e| RunnerError::compile(&decision.source, e))?;

        self.writer.write(&output, decision, options)
    }

    fn report(&mut self, summary: &RunSummary, options: &RunOptions) {
        if !summary.is_success() {
            let text = summary.error_text();
            self.reporter.error(&text);
            self.reporter.notify(&Notification::failure(text));
            self.last_run_failed = true;
        } else if !options.hide_success || self.last_run_failed {
            let verb = if options.noop { "verified" } else { "generated" };
            let message = format!("Successfully {verb} {}", summary.artifact_list());
            self.reporter.success(&message);
            self.reporter.notify(&Notification::success(message));
            self.last_run_failed = false;
        }
    }
}

/// The start notice: the configured message, or the verb and file list.
fn start_message(files: &[Utf8PathBuf], options: &RunOptions) -> String {
    options.message.clone().unwrap_or_else(|| {
        let verb = if options.noop { "Verify" } else { "Compile" };
        format!("{verb} {}", join_paths(files))
    })
}
