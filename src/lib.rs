//! # issue-to-markdown
//!
//! A CLI tool that turns a GitHub issue, as returned by the REST API, into a
//! standalone Markdown document.
//!
//! ## What it does
//!
//! The issue JSON is read from a file or from stdin. The title, reporter and
//! milestone become a small header, the body follows with its headings pushed
//! one level down, and every comment is appended under a
//! `### @user wrote on <date>` heading with its own headings pushed three
//! levels down. Comments are fetched from the issue's `comments_url` (first page
//! only).
//!
//! Images referenced from the body or the comments are downloaded so the result
//! works offline. Two modes decide where they go:
//!
//! - `inline`: each image is embedded as a `data:` URL in a single `.md` file.
//! - `package`: each image is saved once under a hash of its URL, and the
//!   Markdown plus images are zipped into a single `.zip`.
//!
//! Either the whole document is produced or nothing is written: a failed
//! download or a failed comment fetch aborts the conversion.
//!
//! ## Usage
//!
//! ```sh
//! # Zip the issue and its images next to the input
//! issue-to-markdown issue-42.json
//!
//! # Straight from the API, images inlined
//! gh api repos/owner/repo/issues/42 | issue-to-markdown --mode inline issue-42.md
//! ```
//!
//! A `GITHUB_TOKEN` in the environment is sent as a bearer token with every
//! request. Defaults can be persisted in `~/.config/issue-to-markdown/config.toml`.

pub mod assets;
pub mod exporter;
pub mod github;
pub mod importer;
pub mod package;
pub mod pipeline;
pub mod resolve;
pub mod utils;

#[cfg(test)]
mod test_support;
