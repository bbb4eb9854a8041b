//! Works out where the issue JSON comes from and where the result goes.
//!
//! Two invocation shapes are supported:
//!
//! ```sh
//! cat issue.json | issue-to-markdown [output]
//! issue-to-markdown <input.json> [output]
//! ```
//!
//! The output path may come first when both are given; whichever argument ends
//! in `.json` is the input.

use crate::utils::{Mode, has_extension};
use eyre::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Invocation mistakes. Each maps to its own exit code.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("only an output path may follow piped input, got {0} arguments")]
    StdinExtraArguments(usize),

    #[error("stdin was empty")]
    EmptyStdin,

    #[error("expected an input .json file and an optional output path, got {0} arguments")]
    ArgumentCount(usize),

    #[error("neither {0} nor {1} is a .json file")]
    NoJsonArgument(String, String),

    #[error("JSON data file is missing, did you mean to send it over stdin? ({0})")]
    MissingJsonSource(String),
}

impl UsageError {
    pub fn exit_code(&self) -> i32 {
        match self {
            UsageError::StdinExtraArguments(_) => 2,
            UsageError::EmptyStdin => 3,
            UsageError::ArgumentCount(_) => 4,
            UsageError::NoJsonArgument(..) => 5,
            UsageError::MissingJsonSource(_) => 6,
        }
    }
}

/// How piped input is detected. The process implementation only checks whether
/// stdin is a terminal; other front-ends can supply their own.
///
/// A non-terminal stdin counts as piped even when nothing will ever be written
/// to it (an inherited pipe from a CI runner or a parent process). With no
/// `.json` argument, [`resolve`] then blocks in [`StdinProbe::read_all`] until
/// the writer closes its end. Pass the input file explicitly, or redirect
/// stdin from `/dev/null`, in those environments.
pub trait StdinProbe {
    /// True when something other than a terminal is attached to stdin.
    fn is_piped(&self) -> bool;

    /// Reads stdin to the end. Blocks until the writer closes the pipe.
    fn read_all(&mut self) -> Result<String>;
}

pub struct ProcessStdin;

impl StdinProbe for ProcessStdin {
    fn is_piped(&self) -> bool {
        !std::io::stdin().is_terminal()
    }

    fn read_all(&mut self) -> Result<String> {
        let mut text = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut text)
            .wrap_err("Failed to read stdin")?;
        Ok(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Issue JSON already read from stdin, trimmed.
    Piped(String),
    File(PathBuf),
}

impl InputSource {
    pub fn read(&self) -> Result<String> {
        match self {
            InputSource::Piped(text) => Ok(text.clone()),
            InputSource::File(path) => fs::read_to_string(path)
                .wrap_err_with(|| format!("Failed to read: {}", path.display())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIo {
    pub source: InputSource,
    pub output: PathBuf,
}

/// Resolves input and output from the positional `paths`.
///
/// Stdin is only consulted when `force_stdin` is set, or when no argument names
/// a `.json` file and the probe says something is piped in. An empty pipe falls
/// back to the file arguments if there are any.
pub fn resolve(
    paths: &[PathBuf],
    force_stdin: bool,
    mode: Mode,
    probe: &mut dyn StdinProbe,
    cwd: &Path,
) -> Result<ResolvedIo> {
    let names_json = paths.iter().any(|p| has_extension(p, "json"));

    if force_stdin || (!names_json && probe.is_piped()) {
        let text = probe.read_all()?;
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            return resolve_piped(paths, mode, cwd, trimmed.to_string());
        }
        if force_stdin || paths.is_empty() {
            return Err(UsageError::EmptyStdin.into());
        }
        debug!("stdin is piped but empty, using file arguments");
    }

    resolve_files(paths, mode, cwd)
}

fn resolve_piped(paths: &[PathBuf], mode: Mode, cwd: &Path, json: String) -> Result<ResolvedIo> {
    let output = match paths {
        [] => cwd.join(format!("output.{}", mode.extension())),
        [output] => with_output_extension(output, mode),
        _ => return Err(UsageError::StdinExtraArguments(paths.len()).into()),
    };
    debug!(output = %output.display(), "reading issue from stdin");
    Ok(ResolvedIo {
        source: InputSource::Piped(json),
        output,
    })
}

fn resolve_files(paths: &[PathBuf], mode: Mode, cwd: &Path) -> Result<ResolvedIo> {
    let (input, output) = match paths {
        [input] => {
            reject_output_as_input(input, mode)?;
            (input.clone(), output_beside(input, mode, cwd))
        }
        [first, second] => {
            let (input, output) = if has_extension(first, "json") {
                (first, second)
            } else if has_extension(second, "json") {
                (second, first)
            } else {
                return Err(UsageError::NoJsonArgument(
                    first.display().to_string(),
                    second.display().to_string(),
                )
                .into());
            };
            reject_output_as_input(input, mode)?;
            (input.clone(), with_output_extension(output, mode))
        }
        _ => return Err(UsageError::ArgumentCount(paths.len()).into()),
    };

    debug!(input = %input.display(), output = %output.display(), "resolved paths");
    Ok(ResolvedIo {
        source: InputSource::File(input),
        output,
    })
}

fn reject_output_as_input(input: &Path, mode: Mode) -> Result<()> {
    if has_extension(input, mode.extension()) {
        return Err(UsageError::MissingJsonSource(input.display().to_string()).into());
    }
    Ok(())
}

/// `dir/issue.json` → `<abs dir>/issue.<ext>`
fn output_beside(input: &Path, mode: Mode, cwd: &Path) -> PathBuf {
    let absolute = cwd.join(input);
    let dir = absolute.parent().unwrap_or(cwd);
    let stem = absolute
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{}.{}", stem, mode.extension()))
}

/// Appends the mode's extension unless the path already ends with it.
fn with_output_extension(path: &Path, mode: Mode) -> PathBuf {
    if has_extension(path, mode.extension()) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(mode.extension());
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct FakeStdin {
        piped: bool,
        text: &'static str,
        reads: usize,
    }

    impl FakeStdin {
        fn terminal() -> Self {
            Self {
                piped: false,
                text: "",
                reads: 0,
            }
        }

        fn piped(text: &'static str) -> Self {
            Self {
                piped: true,
                text,
                reads: 0,
            }
        }
    }

    impl StdinProbe for FakeStdin {
        fn is_piped(&self) -> bool {
            self.piped
        }

        fn read_all(&mut self) -> Result<String> {
            self.reads += 1;
            Ok(self.text.to_string())
        }
    }

    fn paths(raw: &[&str]) -> Vec<PathBuf> {
        raw.iter().map(PathBuf::from).collect()
    }

    fn usage_error(result: Result<ResolvedIo>) -> UsageError {
        let report = result.unwrap_err();
        report.downcast_ref::<UsageError>().unwrap().clone()
    }

    const CWD: &str = "/work";

    #[test]
    fn piped_input_without_arguments_writes_into_cwd() {
        let mut stdin = FakeStdin::piped("  {\"number\": 1}\n");
        let resolved = resolve(&[], false, Mode::Package, &mut stdin, Path::new(CWD)).unwrap();

        assert_eq!(resolved.source, InputSource::Piped("{\"number\": 1}".to_string()));
        assert_eq!(resolved.output, PathBuf::from("/work/output.zip"));
    }

    #[rstest]
    #[case(Mode::Inline, "notes", "notes.md")]
    #[case(Mode::Inline, "notes.MD", "notes.MD")]
    #[case(Mode::Package, "bundle.zip", "bundle.zip")]
    #[case(Mode::Package, "bundle.tar", "bundle.tar.zip")]
    fn piped_input_coerces_output_extension(
        #[case] mode: Mode,
        #[case] given: &str,
        #[case] expected: &str,
    ) {
        let mut stdin = FakeStdin::piped("{}");
        let resolved = resolve(&paths(&[given]), false, mode, &mut stdin, Path::new(CWD)).unwrap();

        assert_eq!(resolved.output, PathBuf::from(expected));
    }

    #[test]
    fn piped_input_with_two_arguments_is_rejected() {
        let mut stdin = FakeStdin::piped("{}");
        let err = usage_error(resolve(
            &paths(&["a.zip", "b.zip"]),
            false,
            Mode::Package,
            &mut stdin,
            Path::new(CWD),
        ));

        assert_eq!(err, UsageError::StdinExtraArguments(2));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn empty_pipe_without_arguments_is_an_error() {
        let mut stdin = FakeStdin::piped(" \n ");
        let err = usage_error(resolve(&[], false, Mode::Package, &mut stdin, Path::new(CWD)));

        assert_eq!(err, UsageError::EmptyStdin);
    }

    #[test]
    fn forced_stdin_that_is_empty_is_an_error_even_with_arguments() {
        let mut stdin = FakeStdin::terminal();
        let err = usage_error(resolve(
            &paths(&["out.zip"]),
            true,
            Mode::Package,
            &mut stdin,
            Path::new(CWD),
        ));

        assert_eq!(err, UsageError::EmptyStdin);
    }

    #[test]
    fn empty_pipe_with_arguments_falls_back_to_files() {
        let mut stdin = FakeStdin::piped("");
        let resolved = resolve(
            &paths(&["out", "in"]),
            false,
            Mode::Package,
            &mut stdin,
            Path::new(CWD),
        );

        assert_eq!(
            usage_error(resolved),
            UsageError::NoJsonArgument("out".to_string(), "in".to_string())
        );
        assert_eq!(stdin.reads, 1);
    }

    #[test]
    fn json_argument_means_stdin_is_never_read() {
        let mut stdin = FakeStdin::piped("{\"ignored\": true}");
        let resolved = resolve(
            &paths(&["issue.json"]),
            false,
            Mode::Package,
            &mut stdin,
            Path::new(CWD),
        )
        .unwrap();

        assert_eq!(resolved.source, InputSource::File(PathBuf::from("issue.json")));
        assert_eq!(stdin.reads, 0);
    }

    #[rstest]
    #[case(Mode::Package, "issue.json", "/work/issue.zip")]
    #[case(Mode::Inline, "data/42.json", "/work/data/42.md")]
    #[case(Mode::Inline, "/abs/dir/issue.JSON", "/abs/dir/issue.md")]
    fn single_input_derives_output_beside_it(
        #[case] mode: Mode,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let mut stdin = FakeStdin::terminal();
        let resolved = resolve(&paths(&[input]), false, mode, &mut stdin, Path::new(CWD)).unwrap();

        assert_eq!(resolved.source, InputSource::File(PathBuf::from(input)));
        assert_eq!(resolved.output, PathBuf::from(expected));
    }

    #[rstest]
    #[case(&["issue.json", "out"], "issue.json", "out.zip")]
    #[case(&["out.zip", "issue.json"], "issue.json", "out.zip")]
    #[case(&["a.json", "b.json"], "a.json", "b.json.zip")]
    fn two_arguments_pick_the_json_one_as_input(
        #[case] args: &[&str],
        #[case] input: &str,
        #[case] output: &str,
    ) {
        let mut stdin = FakeStdin::terminal();
        let resolved =
            resolve(&paths(args), false, Mode::Package, &mut stdin, Path::new(CWD)).unwrap();

        assert_eq!(resolved.source, InputSource::File(PathBuf::from(input)));
        assert_eq!(resolved.output, PathBuf::from(output));
    }

    #[rstest]
    #[case(&[])]
    #[case(&["a.json", "b", "c"])]
    fn file_mode_needs_one_or_two_arguments(#[case] args: &[&str]) {
        let mut stdin = FakeStdin::terminal();
        let err = usage_error(resolve(
            &paths(args),
            false,
            Mode::Package,
            &mut stdin,
            Path::new(CWD),
        ));

        assert_eq!(err, UsageError::ArgumentCount(args.len()));
        assert_eq!(err.exit_code(), 4);
    }

    #[rstest]
    #[case(Mode::Package, "previous.zip")]
    #[case(Mode::Inline, "previous.md")]
    fn output_extension_as_sole_input_is_rejected(#[case] mode: Mode, #[case] input: &str) {
        let mut stdin = FakeStdin::terminal();
        let err = usage_error(resolve(&paths(&[input]), false, mode, &mut stdin, Path::new(CWD)));

        assert_eq!(err, UsageError::MissingJsonSource(input.to_string()));
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn file_source_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("issue.json");
        fs::write(&path, "{\"number\": 7}").unwrap();

        assert_eq!(InputSource::File(path).read().unwrap(), "{\"number\": 7}");
        assert!(InputSource::File(dir.path().join("absent.json")).read().is_err());
    }
}
