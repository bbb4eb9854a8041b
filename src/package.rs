use eyre::{Context, Result, eyre};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Permissions given to every artifact, independent of the process umask.
pub const OUTPUT_PERMISSIONS: u32 = 0o666;

/// Name of the Markdown file inside an archive: `out/report.zip` → `report.md`.
pub fn markdown_name(archive: &Path) -> Result<String> {
    let stem = archive
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| eyre!("Output path has no usable file name: {}", archive.display()))?;
    Ok(format!("{stem}.md"))
}

/// Writes `contents` to `destination`.
///
/// The bytes go to a temp file in the same directory, which is renamed over the
/// destination only once fully written.
pub fn write_file(destination: &Path, contents: &[u8]) -> Result<()> {
    let mut staged = temp_beside(destination)?;
    staged
        .write_all(contents)
        .wrap_err_with(|| format!("Failed to write: {}", destination.display()))?;
    persist(staged, destination)?;
    info!(path = %destination.display(), bytes = contents.len(), "wrote markdown");
    Ok(())
}

/// Zips every regular file directly inside `source_dir` into `destination`.
///
/// Entries are stored flat, sorted by name, deflate-compressed. Returns the
/// number of entries written.
pub fn write_archive(source_dir: &Path, destination: &Path) -> Result<usize> {
    let listing = fs::read_dir(source_dir)
        .wrap_err_with(|| format!("Failed to list: {}", source_dir.display()))?
        .collect::<Result<Vec<_>, _>>()
        .wrap_err_with(|| format!("Failed to list: {}", source_dir.display()))?;
    let mut entries: Vec<PathBuf> = listing
        .into_iter()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    let mut zip = ZipWriter::new(temp_beside(destination)?);
    for path in &entries {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| eyre!("Non UTF-8 file name: {}", path.display()))?;
        let bytes = fs::read(path).wrap_err_with(|| format!("Failed to read: {}", path.display()))?;
        zip.start_file(name, entry_options())
            .wrap_err_with(|| format!("Failed to add {name} to archive"))?;
        zip.write_all(&bytes)
            .wrap_err_with(|| format!("Failed to add {name} to archive"))?;
    }
    let staged = zip.finish().wrap_err("Failed to finalize archive")?;
    persist(staged, destination)?;

    info!(path = %destination.display(), entries = entries.len(), "wrote archive");
    Ok(entries.len())
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(OUTPUT_PERMISSIONS)
}

fn temp_beside(destination: &Path) -> Result<NamedTempFile> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir)
        .wrap_err_with(|| format!("Failed to create temporary file in {}", dir.display()))
}

fn persist(staged: NamedTempFile, destination: &Path) -> Result<()> {
    set_output_permissions(staged.as_file())?;
    staged
        .persist(destination)
        .map_err(|e| e.error)
        .wrap_err_with(|| format!("Failed to create: {}", destination.display()))?;
    Ok(())
}

/// Applies [`OUTPUT_PERMISSIONS`] to the open file itself, so the process umask
/// is never touched.
#[cfg(unix)]
fn set_output_permissions(file: &File) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(OUTPUT_PERMISSIONS))
        .wrap_err("Failed to set output permissions")
}

#[cfg(not(unix))]
fn set_output_permissions(_file: &File) -> Result<()> {
    Ok(())
}
