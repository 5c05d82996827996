//! A [`Compiler`] backed by the `coffee` executable.
//!
//! Without source maps the source is piped through `coffee --stdio --print`.
//! With source maps the CLI has to write files, so the source is compiled in
//! a scratch directory with `--compile --map` and the resulting map has its
//! `file`, `sources` and `sourceRoot` fields replaced by the descriptor's.

use std::io::{self, Write};
use std::process::{Child, Command, Output, Stdio};
use std::sync::OnceLock;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;
use tracing::{debug, trace};

use crate::compiler::{CompileOutput, Compiler};
use crate::error::CompilerError;
use crate::options::{CompileOptions, SourceMapOptions};

/// Name of the executable looked up on `PATH`.
pub const DEFAULT_PROGRAM: &str = "coffee";

/// File stem used inside the scratch directory for source map compiles.
const SCRATCH_STEM: &str = "source";

/// Prefix of the trailing comment the CLI appends when it writes a map.
const MAPPING_COMMENT: &str = "//# sourceMappingURL=";

/// Compiles CoffeeScript by spawning the `coffee` command line tool.
///
/// The executable is located lazily and the result cached, so constructing a
/// `CoffeeCommand` never fails; a missing compiler surfaces as
/// [`CompilerError::Unavailable`] from [`Compiler::ensure_available`].
///
/// # Examples
///
/// ```no_run
/// use cw_compiler::{CoffeeCommand, CompileOptions, Compiler};
///
/// let coffee = CoffeeCommand::new();
/// coffee.ensure_available()?;
///
/// let out = coffee.compile("square = (x) -> x * x", &CompileOptions::default())?;
/// println!("{}", out.js);
/// # Ok::<(), cw_compiler::CompilerError>(())
/// ```
#[derive(Debug, Default)]
pub struct CoffeeCommand {
    /// Explicit program name or path; `None` means [`DEFAULT_PROGRAM`].
    program: Option<Utf8PathBuf>,

    /// The located executable, once found.
    resolved: OnceLock<Utf8PathBuf>,
}

impl CoffeeCommand {
    /// Creates a compiler that looks up `coffee` on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compiler using `program`, a bare name or a path.
    #[must_use]
    pub fn with_program(program: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
            resolved: OnceLock::new(),
        }
    }

    /// Returns the path of the executable, locating it on first use.
    pub fn locate(&self) -> Result<&Utf8Path, CompilerError> {
        if let Some(path) = self.resolved.get() {
            return Ok(path);
        }

        let program = self
            .program
            .as_deref()
            .unwrap_or_else(|| Utf8Path::new(DEFAULT_PROGRAM));

        let path = if program.components().count() > 1 {
            if !program.is_file() {
                return Err(CompilerError::unavailable(format!(
                    "`{program}` does not exist"
                )));
            }
            program.to_path_buf()
        } else {
            find_on_path(program.as_str()).ok_or_else(|| {
                CompilerError::unavailable(format!("could not find `{program}` in PATH"))
            })?
        };

        trace!(path = %path, "Located CoffeeScript compiler");
        Ok(self.resolved.get_or_init(|| path))
    }

    /// Returns the compiler's version number, e.g. `2.7.0`.
    ///
    /// # Errors
    ///
    /// [`CompilerError::Unavailable`] when the program cannot be found or run,
    /// or prints no version number.
    pub fn version(&self) -> Result<String, CompilerError> {
        let program = self.locate()?;
        let output = command(program).arg("--version").output().map_err(|e| {
            CompilerError::unavailable(format!("failed to launch `{program}`: {e}"))
        })?;

        let text = String::from_utf8_lossy(&output.stdout);
        text.split_whitespace()
            .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))
            .map(str::to_owned)
            .ok_or_else(|| {
                CompilerError::unavailable(format!(
                    "`{program}` did not report a version: {}",
                    text.trim()
                ))
            })
    }

    fn compile_stdio(
        program: &Utf8Path,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        let mut cmd = command(program);
        cmd.args(["--stdio", "--print"])
            .args(flag_args(options))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = spawn(&mut cmd, program)?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("compiler stdin not piped"))?;

        // Feed stdin from a second thread so a large output cannot block the
        // child while we are still writing.
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(source.as_bytes()));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (written, output)
        });

        let output = output?;
        if !output.status.success() {
            return Err(failure(&output, None));
        }
        written?;

        Ok(CompileOutput::js(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }

    fn compile_with_map(
        program: &Utf8Path,
        source: &str,
        options: &CompileOptions,
        map: &SourceMapOptions,
    ) -> Result<CompileOutput, CompilerError> {
        let scratch = tempfile::tempdir()?;
        let dir = Utf8Path::from_path(scratch.path())
            .ok_or_else(|| io::Error::other("temporary directory is not valid UTF-8"))?;

        let extension = if options.literate { "litcoffee" } else { "coffee" };
        let input = dir.join(format!("{SCRATCH_STEM}.{extension}"));
        std::fs::write(&input, source)?;

        let mut cmd = command(program);
        cmd.args(["--compile", "--map", "--output", dir.as_str()])
            .args(flag_args(options))
            .arg(input.as_str())
            .stdin(Stdio::null());

        let output = run(&mut cmd, program)?;
        if !output.status.success() {
            let shown = map.source_files.first().map(|p| (input.as_str(), p.as_str()));
            return Err(failure(&output, shown));
        }

        let js = std::fs::read_to_string(dir.join(format!("{SCRATCH_STEM}.js")))?;
        let raw_map = std::fs::read_to_string(dir.join(format!("{SCRATCH_STEM}.js.map")))?;

        debug!(
            generated = %map.generated_file,
            "Compiled with source map"
        );

        Ok(CompileOutput {
            js: strip_mapping_comment(&js),
            source_map: Some(rewrite_source_map(&raw_map, map)?),
        })
    }
}

impl Compiler for CoffeeCommand {
    fn ensure_available(&self) -> Result<(), CompilerError> {
        self.locate().map(|_| ())
    }

    fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilerError> {
        let program = self.locate()?;
        match &options.source_map {
            None => Self::compile_stdio(program, source, options),
            Some(map) => Self::compile_with_map(program, source, options, map),
        }
    }
}

/// Creates a command for the compiler executable.
fn command(program: &Utf8Path) -> Command {
    Command::new(program.as_std_path())
}

/// Flags shared by both invocation styles.
fn flag_args(options: &CompileOptions) -> impl Iterator<Item = &'static str> {
    [
        options.bare.then_some("--bare"),
        options.literate.then_some("--literate"),
    ]
    .into_iter()
    .flatten()
}

fn launch_error(program: &Utf8Path, error: io::Error) -> CompilerError {
    match error.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            CompilerError::unavailable(format!("failed to launch `{program}`: {error}"))
        }
        _ => CompilerError::Io(error),
    }
}

fn spawn(cmd: &mut Command, program: &Utf8Path) -> Result<Child, CompilerError> {
    cmd.spawn().map_err(|e| launch_error(program, e))
}

fn run(cmd: &mut Command, program: &Utf8Path) -> Result<Output, CompilerError> {
    cmd.output().map_err(|e| launch_error(program, e))
}

/// Builds the error for a failed compile from the process output.
///
/// `rename` replaces a scratch path in the message with the name the user
/// knows the source by.
fn failure(output: &Output, rename: Option<(&str, &str)>) -> CompilerError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = [stderr.trim(), stdout.trim()]
        .into_iter()
        .find(|t| !t.is_empty())
        .map_or_else(
            || format!("compiler exited with {}", output.status),
            str::to_owned,
        );

    match rename {
        Some((from, to)) => CompilerError::syntax(text.replace(from, to)),
        None => CompilerError::syntax(text),
    }
}

/// Removes the trailing `sourceMappingURL` comment the CLI appends.
fn strip_mapping_comment(js: &str) -> String {
    let mut lines: Vec<&str> = js.lines().collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    if lines.last().is_some_and(|line| line.starts_with(MAPPING_COMMENT)) {
        lines.pop();
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Replaces the naming fields of a v3 source map with the descriptor's.
fn rewrite_source_map(raw: &str, map: &SourceMapOptions) -> Result<String, CompilerError> {
    let mut value: Value = serde_json::from_str(raw)?;
    let object = value.as_object_mut().ok_or_else(|| {
        <serde_json::Error as serde::de::Error>::custom("source map is not a JSON object")
    })?;

    object.insert("file".to_owned(), Value::from(map.generated_file.as_str()));
    object.insert(
        "sources".to_owned(),
        Value::from(
            map.source_files
                .iter()
                .map(|p| p.as_str().to_owned())
                .collect::<Vec<_>>(),
        ),
    );
    object.insert("sourceRoot".to_owned(), Value::from(map.source_root.as_str()));

    Ok(serde_json::to_string(&value)?)
}

/// Resolves a bare program name through `which` (or `where` on Windows).
fn find_on_path(program: &str) -> Option<Utf8PathBuf> {
    let which_cmd = if cfg!(windows) { "where" } else { "which" };

    let output = Command::new(which_cmd).arg(program).output().ok()?;
    if !output.status.success() {
        debug!(program, "Executable not found in PATH");
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Utf8PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map_options() -> SourceMapOptions {
        SourceMapOptions {
            generated_file: Utf8PathBuf::from("a.js"),
            source_files: vec![Utf8PathBuf::from("a.coffee")],
            source_root: "src".to_owned(),
        }
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let coffee = CoffeeCommand::with_program("/nonexistent/bin/coffee");

        let err = coffee.ensure_available().unwrap_err();
        assert!(err.is_fatal());

        let err = coffee
            .compile("a = 1", &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(err, CompilerError::Unavailable { .. }));
    }

    #[test]
    fn test_flag_args() {
        let options = CompileOptions {
            bare: true,
            literate: true,
            source_map: None,
        };
        assert_eq!(
            flag_args(&options).collect::<Vec<_>>(),
            vec!["--bare", "--literate"]
        );
        assert_eq!(flag_args(&CompileOptions::default()).count(), 0);
    }

    #[test]
    fn test_strip_mapping_comment() {
        let js = "(function() {\n  var a;\n}).call(this);\n\n//# sourceMappingURL=source.js.map\n";
        assert_eq!(
            strip_mapping_comment(js),
            "(function() {\n  var a;\n}).call(this);\n"
        );
        assert_eq!(strip_mapping_comment("var a;\n"), "var a;\n");
    }

    #[test]
    fn test_rewrite_source_map() {
        let raw = r#"{"version":3,"file":"source.js","sourceRoot":"","sources":["source.coffee"],"names":[],"mappings":"AAAA"}"#;
        let rewritten = rewrite_source_map(raw, &sample_map_options()).unwrap();
        let value: Value = serde_json::from_str(&rewritten).unwrap();

        assert_eq!(value["file"], "a.js");
        assert_eq!(value["sources"][0], "a.coffee");
        assert_eq!(value["sourceRoot"], "src");
        assert_eq!(value["mappings"], "AAAA");
    }

    #[test]
    fn test_rewrite_source_map_rejects_non_objects() {
        let err = rewrite_source_map("[1, 2]", &sample_map_options()).unwrap_err();
        assert!(matches!(err, CompilerError::InvalidSourceMap(_)));
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Writes an executable shell script standing in for `coffee`.
        fn script(dir: &Utf8Path, name: &str, body: &str) -> Utf8PathBuf {
            let path = dir.join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_stdio_compile_passes_flags_and_source() {
            let temp = tempfile::tempdir().unwrap();
            let dir = Utf8Path::from_path(temp.path()).unwrap();
            let program = script(dir, "coffee", r#"echo "$@"; cat"#);

            let coffee = CoffeeCommand::with_program(program);
            let options = CompileOptions {
                bare: true,
                literate: false,
                source_map: None,
            };
            let out = coffee.compile("x = 1\n", &options).unwrap();

            assert_eq!(out.js, "--stdio --print --bare\nx = 1\n");
            assert!(out.source_map.is_none());
        }

        #[test]
        fn test_stdio_compile_reports_syntax_errors() {
            let temp = tempfile::tempdir().unwrap();
            let dir = Utf8Path::from_path(temp.path()).unwrap();
            let program = script(
                dir,
                "coffee",
                "cat > /dev/null; echo \"[stdin]:2:1: error: unexpected indentation\" >&2; exit 1",
            );

            let coffee = CoffeeCommand::with_program(program);
            let err = coffee
                .compile("a =\n  1\n", &CompileOptions::default())
                .unwrap_err();

            assert!(!err.is_fatal());
            assert_eq!(err.to_string(), "[stdin]:2:1: error: unexpected indentation");
        }

        #[test]
        fn test_map_compile_rewrites_map_and_strips_comment() {
            let temp = tempfile::tempdir().unwrap();
            let dir = Utf8Path::from_path(temp.path()).unwrap();
            let program = script(
                dir,
                "coffee",
                r#"out=""
while [ $# -gt 1 ]; do
  if [ "$1" = "--output" ]; then out="$2"; shift; fi
  shift
done
printf 'var a;\n\n//# sourceMappingURL=source.js.map\n' > "$out/source.js"
printf '{"version":3,"file":"source.js","sources":["source.coffee"],"names":[],"mappings":"AAAA"}' > "$out/source.js.map""#,
            );

            let coffee = CoffeeCommand::with_program(program);
            let options = CompileOptions {
                bare: false,
                literate: false,
                source_map: Some(sample_map_options()),
            };
            let out = coffee.compile("a = undefined\n", &options).unwrap();

            assert_eq!(out.js, "var a;\n");
            let map: Value = serde_json::from_str(out.source_map.as_deref().unwrap()).unwrap();
            assert_eq!(map["file"], "a.js");
            assert_eq!(map["sources"][0], "a.coffee");
            assert_eq!(map["sourceRoot"], "src");
        }

        #[test]
        fn test_version_parses_number() {
            let temp = tempfile::tempdir().unwrap();
            let dir = Utf8Path::from_path(temp.path()).unwrap();
            let program = script(dir, "coffee", "echo 'CoffeeScript version 2.7.0'");

            let coffee = CoffeeCommand::with_program(program);
            assert_eq!(coffee.version().unwrap(), "2.7.0");
        }

        #[test]
        fn test_version_without_number_is_unavailable() {
            let temp = tempfile::tempdir().unwrap();
            let dir = Utf8Path::from_path(temp.path()).unwrap();
            let program = script(dir, "coffee", "echo 'usage: coffee [options] path'");

            let err = CoffeeCommand::with_program(program).version().unwrap_err();
            assert!(err.is_fatal());
            assert!(err.to_string().contains("did not report a version"));
        }
    }
}
