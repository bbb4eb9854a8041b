//! In-memory stand-ins for the network, shared by unit tests.

use crate::github::Fetcher;
use crate::importer::{Comment, User};
use eyre::{Result, eyre};
use std::cell::{Cell, RefCell};
use std::io;
use std::sync::{Arc, Mutex};
use url::Url;

/// Records every call and serves canned responses.
#[derive(Default)]
pub struct FakeFetcher {
    comments: Option<Vec<Comment>>,
    fail_images: bool,
    comment_calls: Cell<usize>,
    image_calls: RefCell<Vec<String>>,
}

impl FakeFetcher {
    /// No comments endpoint: any comment fetch fails.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comments(comments: Vec<(&str, &str, &str)>) -> Self {
        let comments = comments
            .into_iter()
            .map(|(login, created_at, body)| Comment {
                user: User {
                    login: login.to_string(),
                },
                created_at: created_at.parse().unwrap(),
                body: body.to_string(),
            })
            .collect();
        Self {
            comments: Some(comments),
            ..Self::default()
        }
    }

    pub fn failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.get()
    }

    pub fn image_calls(&self) -> Vec<String> {
        self.image_calls.borrow().clone()
    }

    /// Payload served for `url`, so tests can check what landed where.
    pub fn payload_for(url: &str) -> Vec<u8> {
        format!("image:{url}").into_bytes()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch_comments(&self, comments_url: &str) -> Result<Vec<Comment>> {
        self.comment_calls.set(self.comment_calls.get() + 1);
        self.comments
            .clone()
            .ok_or_else(|| eyre!("connection refused: {comments_url}"))
    }

    fn fetch_image(&self, url: &Url) -> Result<Vec<u8>> {
        self.image_calls.borrow_mut().push(url.to_string());
        if self.fail_images {
            return Err(eyre!("connection refused: {url}"));
        }
        Ok(Self::payload_for(url.as_str()))
    }
}

/// Minimal issue JSON with the given body and comment count.
pub fn issue_json(body: &str, comments: u64) -> String {
    serde_json::json!({
        "number": 5,
        "title": "Bug",
        "body": body,
        "user": {"login": "al"},
        "milestone": null,
        "comments": comments,
        "comments_url": "https://api.github.com/repos/o/r/issues/5/comments",
    })
    .to_string()
}

/// Shared sink for formatted log lines.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a thread-local subscriber and returns what it logged at
/// `warn` or above.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    (result, logged)
}
