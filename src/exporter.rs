use crate::assets::ImageLocalizer;
use crate::github::{self, Fetcher};
use crate::importer::{Comment, Issue};
use eyre::{Context, Result};
use std::io::Write;

/// Body headings sit one level under the document title.
pub const BODY_HEADING_SHIFT: usize = 1;
/// Comment headings sit under the `### @user wrote on ...` line.
pub const COMMENT_HEADING_SHIFT: usize = 3;

/// Pushes every Markdown heading `levels` deeper by prefixing extra `#`s.
///
/// Fenced code blocks are copied verbatim, so `#include` in a C snippet stays put.
pub fn shift_headings(markdown: &str, levels: usize) -> String {
    let prefix = "#".repeat(levels);
    let mut out = String::with_capacity(markdown.len() + prefix.len() * 4);
    let mut fence: Option<Fence> = None;

    for line in markdown.split_inclusive('\n') {
        match fence {
            Some(open) if open.is_closed_by(line) => fence = None,
            Some(_) => {}
            None => match Fence::opened_by(line) {
                Some(opened) => fence = Some(opened),
                None if line.starts_with('#') => out.push_str(&prefix),
                None => {}
            },
        }
        out.push_str(line);
    }
    out
}

/// An open code fence: its marker character and the length of the opening run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn opened_by(line: &str) -> Option<Fence> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        (len >= 3).then_some(Fence { marker, len })
    }

    /// Only a bare run of the same marker, at least as long, closes a fence.
    /// "```rust" inside a backtick block is content.
    fn is_closed_by(self, line: &str) -> bool {
        let run = line.trim();
        run.len() >= self.len && run.chars().all(|c| c == self.marker)
    }
}

/// `Saturday 09 January 2021`
pub fn comment_date(comment: &Comment) -> String {
    comment.created_at.format("%A %d %B %Y").to_string()
}

/// Writes the full Markdown document for `issue`.
///
/// Comments are fetched only when the issue reports at least one. Every image in
/// the body and the comments goes through `localizer` before anything is written
/// for that section.
pub fn write_issue_markdown<W: Write>(
    writer: &mut W,
    issue: &Issue,
    fetcher: &dyn Fetcher,
    localizer: &mut ImageLocalizer<'_>,
) -> Result<()> {
    writeln!(writer, "# #{} – {}", issue.number, issue.title)?;
    writeln!(writer, "**Reported by @{}**", issue.user.login)?;
    if let Some(milestone) = &issue.milestone {
        writeln!(writer, "**Milestone: {}**", milestone.title)?;
    }
    writeln!(writer)?;

    let body = shift_headings(&issue.body, BODY_HEADING_SHIFT);
    let body = localizer
        .localize(&body)
        .wrap_err_with(|| format!("Failed to localize images in issue #{}", issue.number))?;
    write!(writer, "{}\n\n", body)?;

    if issue.comments > 0 {
        let comments = github::fetch_issue_comments(fetcher, issue)?;
        for comment in &comments {
            write_comment(writer, comment, localizer)?;
        }
    }

    Ok(())
}

fn write_comment<W: Write>(
    writer: &mut W,
    comment: &Comment,
    localizer: &mut ImageLocalizer<'_>,
) -> Result<()> {
    let body = shift_headings(&comment.body, COMMENT_HEADING_SHIFT);
    let body = localizer.localize(&body).wrap_err_with(|| {
        format!("Failed to localize images in comment by @{}", comment.user.login)
    })?;

    write!(
        writer,
        "\n### @{} wrote on {}\n\n",
        comment.user.login,
        comment_date(comment)
    )?;
    write!(writer, "{}\n\n", body)?;
    Ok(())
}
