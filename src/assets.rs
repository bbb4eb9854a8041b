use crate::github::Fetcher;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use eyre::{Context, Result, eyre};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

/// `![caption](url)`: caption is non-greedy, url is any run without `)`.
static IMAGE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[(.*?)\]\(([^)]*)\)").expect("image tag pattern is valid"));

/// An image tag found in a Markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference<'a> {
    pub caption: &'a str,
    pub url: &'a str,
}

/// Image tags with the byte range each one occupies.
fn image_tags(markdown: &str) -> impl Iterator<Item = (Range<usize>, ImageReference<'_>)> {
    IMAGE_TAG.captures_iter(markdown).filter_map(|caps| {
        let tag = caps.get(0)?;
        let reference = ImageReference {
            caption: caps.get(1).map_or("", |m| m.as_str()),
            url: caps.get(2).map_or("", |m| m.as_str()),
        };
        Some((tag.range(), reference))
    })
}

/// All image tags in `markdown`, in document order.
pub fn find_images(markdown: &str) -> Vec<ImageReference<'_>> {
    image_tags(markdown).map(|(_, reference)| reference).collect()
}

/// Parses an image URL and returns it with its lower-cased file extension.
///
/// The extension is taken from the URL path only, so `a.PNG?raw=true` is `png`.
pub fn parse_image_url(raw: &str) -> Result<(Url, String)> {
    let url = Url::parse(raw.trim()).wrap_err_with(|| format!("Invalid image URL: {raw}"))?;
    let extension = Path::new(url.path())
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| eyre!("No extension at the end of {raw}"))?;
    Ok((url, extension))
}

/// Stable file name for a downloaded image: SHA-256 of the URL text plus extension.
pub fn asset_name(raw_url: &str, extension: &str) -> String {
    format!("{:x}.{}", Sha256::digest(raw_url.as_bytes()), extension)
}

/// `data:image/<ext>;base64,<payload>`
pub fn data_url(extension: &str, bytes: &[u8]) -> String {
    format!("data:image/{};base64,{}", extension, STANDARD.encode(bytes))
}

enum Placement {
    Inline,
    Staged {
        dir: PathBuf,
        written: HashSet<String>,
    },
}

/// Downloads the images a Markdown body references and rewrites the tags to
/// point at the local copy.
pub struct ImageLocalizer<'a> {
    fetcher: &'a dyn Fetcher,
    placement: Placement,
}

impl<'a> ImageLocalizer<'a> {
    /// Images become `data:` URLs inside the document.
    pub fn inline(fetcher: &'a dyn Fetcher) -> Self {
        Self {
            fetcher,
            placement: Placement::Inline,
        }
    }

    /// Images are written into `dir`, once per distinct URL, and referenced by
    /// bare file name.
    pub fn staged(fetcher: &'a dyn Fetcher, dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            placement: Placement::Staged {
                dir: dir.into(),
                written: HashSet::new(),
            },
        }
    }

    /// Rewrites every image tag in `markdown`. Fails on the first image that
    /// cannot be resolved, leaving no partial result.
    pub fn localize(&mut self, markdown: &str) -> Result<String> {
        let mut out = String::with_capacity(markdown.len());
        let mut last = 0;
        for (range, image) in image_tags(markdown) {
            out.push_str(&markdown[last..range.start]);
            let local = self.localize_one(image.url)?;
            out.push_str(&format!("![{}]({})", image.caption, local));
            last = range.end;
        }
        out.push_str(&markdown[last..]);
        Ok(out)
    }

    fn localize_one(&mut self, raw_url: &str) -> Result<String> {
        // Already embedded; nothing to fetch.
        if raw_url.trim_start().starts_with("data:") {
            return Ok(raw_url.to_string());
        }

        let (url, extension) = parse_image_url(raw_url)?;
        match &mut self.placement {
            Placement::Inline => {
                let bytes = self.fetcher.fetch_image(&url)?;
                Ok(data_url(&extension, &bytes))
            }
            Placement::Staged { dir, written } => {
                let name = asset_name(raw_url, &extension);
                if written.contains(&name) {
                    debug!(%url, name = %name, "image already staged");
                    return Ok(name);
                }
                let bytes = self.fetcher.fetch_image(&url)?;
                fs::write(dir.join(&name), &bytes)
                    .wrap_err_with(|| format!("Failed to write asset: {name}"))?;
                written.insert(name.clone());
                Ok(name)
            }
        }
    }
}
