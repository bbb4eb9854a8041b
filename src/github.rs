//! HTTP access to GitHub: the comment list and the images referenced from
//! issue bodies. Everything is a plain blocking GET.

use crate::importer::{Comment, Issue};
use crate::utils::{ExportConfig, Mode};
use eyre::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;

/// Environment variable holding an optional bearer token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Remote operations the renderer depends on. Tests swap in a fake.
pub trait Fetcher {
    /// GET the comment list behind an issue's `comments_url`.
    fn fetch_comments(&self, comments_url: &str) -> Result<Vec<Comment>>;

    /// GET the raw bytes of an image.
    fn fetch_image(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Reads `GITHUB_TOKEN`, ignoring it when blank.
pub fn token_from_env() -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .wrap_err_with(|| format!("{TOKEN_ENV} is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        // Only the packaging mode asks for compressed transfers.
        let compressed = config.mode == Mode::Package;
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .gzip(compressed)
            .deflate(compressed)
            .brotli(compressed);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().wrap_err("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_comments(&self, comments_url: &str) -> Result<Vec<Comment>> {
        debug!(url = comments_url, "fetching comments");
        self.client
            .get(comments_url)
            .header(ACCEPT, "application/json")
            .send()
            .and_then(|r| r.error_for_status())
            .wrap_err_with(|| format!("Failed to fetch comments: {comments_url}"))?
            .json::<Vec<Comment>>()
            .wrap_err_with(|| format!("Failed to parse comments from {comments_url}"))
    }

    fn fetch_image(&self, url: &Url) -> Result<Vec<u8>> {
        debug!(%url, "downloading image");
        let bytes = self
            .client
            .get(url.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .wrap_err_with(|| format!("Failed to download image: {url}"))?;
        Ok(bytes.to_vec())
    }
}

/// Fetches the comments of `issue`, first page only.
///
/// GitHub paginates at 30 comments by default; a shortfall against the issue's
/// own count is reported, not papered over.
pub fn fetch_issue_comments(fetcher: &dyn Fetcher, issue: &Issue) -> Result<Vec<Comment>> {
    let comments = fetcher.fetch_comments(&issue.comments_url)?;
    let fetched = comments.len() as u64;
    if fetched < issue.comments {
        warn!(
            "issue #{} has {} comments but only {} were returned; later pages are not fetched",
            issue.number, issue.comments, fetched
        );
    }
    debug!(count = fetched, "fetched comments");
    Ok(comments)
}
