use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// `User-Agent` sent with every request unless the config file overrides it.
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Where localized images end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Embed every image as a `data:` URL inside a single `.md` file.
    Inline,
    /// Download images next to the Markdown and zip the lot.
    #[default]
    #[value(alias = "file")]
    #[serde(alias = "file")]
    Package,
}

impl Mode {
    /// Extension of the artifact this mode produces.
    pub fn extension(self) -> &'static str {
        match self {
            Mode::Inline => "md",
            Mode::Package => "zip",
        }
    }
}

/// Configuration required to run a conversion.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    pub mode: Mode,
    /// Positional paths exactly as given on the command line.
    pub paths: Vec<PathBuf>,
    /// Read the issue from stdin without probing.
    pub force_stdin: bool,
    pub user_agent: String,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            paths: Vec::new(),
            force_stdin: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            token: None,
            timeout: None,
        }
    }
}

/// Case-insensitive extension check (`issue.JSON` counts as JSON).
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
