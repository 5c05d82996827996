//! Artifact persistence.
//!
//! [`ArtifactWriter`] turns compile output and a [`RoutingDecision`] into
//! files under the working root. Every path it returns is the routed,
//! root-relative path; only the disk operations themselves are resolved
//! against the root. In noop mode the same paths come back but the disk is
//! never touched.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use cw_compiler::CompileOutput;
use cw_core::{FileError, RunOptions, source_map_file_name};
use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace};

use crate::error::RunnerError;
use crate::router::RoutingDecision;

/// Paths produced by one write: the primary artifact and maybe its map.
pub type WrittenPaths = SmallVec<[Utf8PathBuf; 2]>;

/// Writes and removes artifacts relative to a working root.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    working_root: Utf8PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer rooted at `working_root`.
    #[must_use]
    pub fn new(working_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            working_root: working_root.into(),
        }
    }

    /// Returns the working root.
    #[inline]
    #[must_use]
    pub fn working_root(&self) -> &Utf8Path {
        &self.working_root
    }

    /// Resolves a routed path to its location on disk.
    ///
    /// Empty paths resolve to the working root; absolute paths are kept.
    #[must_use]
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.as_str().is_empty() {
            self.working_root.clone()
        } else if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_root.join(path)
        }
    }

    /// Persists compiled output, returning the artifact paths.
    ///
    /// With a source map, a `sourceMappingURL` comment naming the sidecar is
    /// appended to the JavaScript and the sidecar is written next to it.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Write`] if the destination directory cannot be
    /// created or an artifact cannot be written.
    ///
    /// # Examples
    ///
    /// ```
    /// use cw_compiler::CompileOutput;
    /// use cw_core::RunOptions;
    /// use cw_runner::{ArtifactWriter, RoutingDecision};
    ///
    /// let writer = ArtifactWriter::new("/nonexistent");
    /// let decision = RoutingDecision {
    ///     source: "a.coffee".into(),
    ///     destination_directory: "out".into(),
    ///     destination_filename: "a.js".to_owned(),
    /// };
    /// let noop = RunOptions { noop: true, ..RunOptions::default() };
    ///
    /// let written = writer.write(&CompileOutput::js("var a;\n"), &decision, &noop)?;
    /// assert_eq!(written.as_slice(), ["out/a.js"]);
    /// # Ok::<(), cw_runner::RunnerError>(())
    /// ```
    pub fn write(
        &self,
        output: &CompileOutput,
        decision: &RoutingDecision,
        options: &RunOptions,
    ) -> Result<WrittenPaths, RunnerError> {
        let js_path = decision.output_path();
        let mut written: WrittenPaths = smallvec![js_path.clone()];

        let mut js = output.js.clone();
        if output.source_map.is_some() {
            let map_name = source_map_file_name(&decision.destination_filename);
            js.push_str("\n//# sourceMappingURL=");
            js.push_str(&map_name);
            js.push('\n');
            written.push(decision.source_map_path());
        }

        if options.noop {
            trace!(artifacts = ?written, "Noop; skipping write");
            return Ok(written);
        }

        self.ensure_directory(&decision.destination_directory)?;
        self.write_file(&js_path, &js)?;
        if let Some(map) = &output.source_map {
            self.write_file(&decision.source_map_path(), map)?;
        }

        debug!(source = %decision.source, artifacts = ?written, "Wrote artifacts");
        Ok(written)
    }

    /// Writes a stub that throws `error` when loaded, in place of the output.
    ///
    /// Consumers of the artifact then fail loudly instead of running a stale
    /// build of a source that no longer compiles.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Write`] on I/O failure.
    pub fn write_error_stub(
        &self,
        decision: &RoutingDecision,
        error: &FileError,
        options: &RunOptions,
    ) -> Result<Utf8PathBuf, RunnerError> {
        let js_path = decision.output_path();
        if options.noop {
            return Ok(js_path);
        }

        self.ensure_directory(&decision.destination_directory)?;
        self.write_file(&js_path, &error_stub(error))?;

        debug!(source = %decision.source, artifact = %js_path, "Wrote error stub");
        Ok(js_path)
    }

    /// Deletes the artifacts a compile of `decision` would have produced.
    ///
    /// Returns the artifacts that existed. Under noop they are reported but
    /// left in place.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Remove`] if an existing artifact cannot be
    /// deleted.
    pub fn remove(
        &self,
        decision: &RoutingDecision,
        options: &RunOptions,
    ) -> Result<WrittenPaths, RunnerError> {
        let mut removed = WrittenPaths::new();

        for artifact in [decision.output_path(), decision.source_map_path()] {
            let on_disk = self.resolve(&artifact);
            if !on_disk.is_file() {
                trace!(artifact = %artifact, "No artifact to remove");
                continue;
            }
            if !options.noop {
                fs::remove_file(&on_disk).map_err(|e| RunnerError::remove(&artifact, e))?;
            }
            removed.push(artifact);
        }

        Ok(removed)
    }

    fn ensure_directory(&self, directory: &Utf8Path) -> Result<(), RunnerError> {
        let on_disk = self.resolve(directory);
        if !on_disk.is_dir() {
            fs::create_dir_all(&on_disk).map_err(|e| RunnerError::write(directory, e))?;
        }
        Ok(())
    }

    fn write_file(&self, path: &Utf8Path, contents: &str) -> Result<(), RunnerError> {
        fs::write(self.resolve(path), contents).map_err(|e| RunnerError::write(path, e))
    }
}

/// `throw "<error>";` with the message encoded as a string literal.
fn error_stub(error: &FileError) -> String {
    let text = error.to_string();
    let literal = serde_json::to_string(&text).unwrap_or_else(|_| format!("{text:?}"));
    format!("throw {literal};")
}
