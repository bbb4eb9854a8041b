use crate::assets::ImageLocalizer;
use crate::exporter;
use crate::github::{Fetcher, HttpFetcher};
use crate::importer::Issue;
use crate::package;
use crate::resolve::{self, StdinProbe};
use crate::utils::{ExportConfig, Mode};
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The main entry point: resolve paths, parse, render, package.
/// Returns the path of the artifact that was written.
pub fn execute(config: &ExportConfig, stdin: &mut dyn StdinProbe) -> Result<PathBuf> {
    let cwd = std::env::current_dir().wrap_err("Failed to read current directory")?;
    let resolved = resolve::resolve(&config.paths, config.force_stdin, config.mode, stdin, &cwd)?;

    let json = resolved.source.read()?;
    let issue: Issue = serde_json::from_str(&json).wrap_err("Failed to parse issue JSON")?;
    info!(number = issue.number, title = %issue.title, "converting issue");

    let fetcher = HttpFetcher::new(config)?;
    convert(&issue, &fetcher, config.mode, &resolved.output)?;
    Ok(resolved.output)
}

/// Renders `issue` and writes it to `output` in the shape `mode` asks for.
///
/// Nothing is created at `output` unless rendering, including every download,
/// succeeded.
pub fn convert(issue: &Issue, fetcher: &dyn Fetcher, mode: Mode, output: &Path) -> Result<()> {
    match mode {
        Mode::Inline => {
            let mut localizer = ImageLocalizer::inline(fetcher);
            let mut markdown = Vec::new();
            exporter::write_issue_markdown(&mut markdown, issue, fetcher, &mut localizer)?;
            package::write_file(output, &markdown)
        }
        Mode::Package => {
            // Removed on drop, whichever way this arm exits.
            let staging = tempfile::tempdir().wrap_err("Failed to create staging directory")?;
            debug!(dir = %staging.path().display(), "staging package");

            let mut localizer = ImageLocalizer::staged(fetcher, staging.path());
            let mut markdown = Vec::new();
            exporter::write_issue_markdown(&mut markdown, issue, fetcher, &mut localizer)?;

            let markdown_path = staging.path().join(package::markdown_name(output)?);
            fs::write(&markdown_path, &markdown)
                .wrap_err_with(|| format!("Failed to write: {}", markdown_path.display()))?;

            package::write_archive(staging.path(), output)?;
            Ok(())
        }
    }
}
