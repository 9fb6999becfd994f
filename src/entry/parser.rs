//! Line-oriented parser turning raw note text into [`Entry`] values.
//!
//! The rules are data, not code: a heading pattern, a [`CodeDetector`] and
//! an optional tag-line pattern, all carried by [`ParserConfig`].

use std::borrow::Borrow;
use std::iter::{Enumerate, Peekable};
use std::str::Lines;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::identifiers::{CreatedOrder, EntryId};
use super::entry::{Entry, EntryError, Segment};
use super::tags::TagSet;

pub const DEFAULT_HEADING: &str = r"^#\s*(?P<id>\d+)\b\s*(?P<title>.*?)\s*$";
pub const DEFAULT_TAG_LINE: &str = r"(?i)^tags:\s*(.*)$";
pub const DEFAULT_FENCE: &str = "```";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Code fence opened on line {line} is never closed")]
    UnterminatedFence { line: usize },
    #[error("Heading on line {line} has an entry number out of range: {value}")]
    InvalidEntryId { line: usize, value: String },
    #[error("Heading pattern matched line {line} without capturing an entry number")]
    MissingIdCapture { line: usize },
    #[error("Code fence must not be empty")]
    EmptyFence,
    #[error(transparent)]
    Entry(#[from] EntryError),
}

/// How code excerpts are told apart from prose inside an entry body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CodeDetector {
    /// Code sits between a fence line and the next closing fence line.
    /// Text after the opening fence is the language label.
    Fenced {
        #[serde(default = "default_fence")]
        fence: String,
    },
    /// A run of lines indented by at least `width` spaces (or a tab).
    Indented {
        #[serde(default = "default_indent_width")]
        width: usize,
    },
    /// Prose lines start with `marker`; every other non-blank line is code.
    CommentedProse {
        #[serde(default = "default_prose_marker")]
        marker: String,
    },
}

fn default_fence() -> String {
    DEFAULT_FENCE.to_string()
}

fn default_indent_width() -> usize {
    4
}

fn default_prose_marker() -> String {
    "#".to_string()
}

impl Default for CodeDetector {
    fn default() -> Self {
        CodeDetector::Fenced {
            fence: default_fence(),
        }
    }
}

fn default_heading() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(DEFAULT_HEADING).expect("default heading pattern compiles"))
}

fn default_tag_line() -> &'static Regex {
    static TAG_LINE: OnceLock<Regex> = OnceLock::new();
    TAG_LINE.get_or_init(|| Regex::new(DEFAULT_TAG_LINE).expect("default tag pattern compiles"))
}

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub heading: Regex,
    pub code: CodeDetector,
    pub tag_line: Option<Regex>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            heading: default_heading().clone(),
            code: CodeDetector::default(),
            tag_line: Some(default_tag_line().clone()),
        }
    }
}

impl ParserConfig {
    pub fn new(heading: Regex, code: CodeDetector) -> Self {
        Self {
            heading,
            code,
            ..Self::default()
        }
    }

    pub fn with_heading(mut self, heading: Regex) -> Self {
        self.heading = heading;
        self
    }

    pub fn with_code_detector(mut self, code: CodeDetector) -> Self {
        self.code = code;
        self
    }

    pub fn with_tag_line(mut self, tag_line: Option<Regex>) -> Self {
        self.tag_line = tag_line;
        self
    }

    /// Heading pattern for series-style headings such as
    /// `# Episode 12 Title` or `# Episodes 94 & 95`.
    ///
    /// The word matches case-insensitively, with an optional plural `s`
    /// and an optional space between any two letters (`Rails cast 11`).
    /// For a joint heading the first number becomes the entry id.
    pub fn heading_prefix(word: &str) -> Result<Regex, regex::Error> {
        let word = word
            .trim()
            .chars()
            .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
            .collect::<Vec<_>>()
            .join(r"\s?");
        Regex::new(&format!(
            r"^#\s*(?i:{word})s?\s+(?P<id>\d+)(?:\s*&\s*\d+)?\b\s*(?P<title>.*?)\s*$"
        ))
    }

    /// Preset for a flat notes file: `# <word> <n> <title>` headings, prose
    /// written as `#` comment lines, bare lines as code.
    pub fn notes_file(word: &str) -> Result<Self, regex::Error> {
        Ok(Self::default()
            .with_heading(Self::heading_prefix(word)?)
            .with_code_detector(CodeDetector::CommentedProse {
                marker: "#".to_string(),
            }))
    }
}

/// Parser over raw note text. Holds no state between runs.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Lazily parse `raw` into entries, in input order.
    ///
    /// Each yielded entry carries its parse ordinal as `created_order`.
    /// The iterator stops after the first error. An unusable config (an
    /// empty fence) is reported as the first item.
    pub fn entries<'a>(&'a self, raw: &'a str) -> Entries<'a> {
        Entries {
            config: &self.config,
            lines: raw.lines().enumerate().peekable(),
            next_order: CreatedOrder::FIRST,
            pending: self.check_config().err(),
            done: false,
        }
    }

    fn check_config(&self) -> Result<(), ParseError> {
        match &self.config.code {
            CodeDetector::Fenced { fence } if fence.trim().is_empty() => Err(ParseError::EmptyFence),
            _ => Ok(()),
        }
    }

    pub fn parse_all(&self, raw: &str) -> Result<Vec<Entry>, ParseError> {
        self.entries(raw).collect()
    }
}

pub struct Entries<'a> {
    config: &'a ParserConfig,
    lines: Peekable<Enumerate<Lines<'a>>>,
    next_order: CreatedOrder,
    pending: Option<ParseError>,
    done: bool,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(e) = self.pending.take() {
            self.done = true;
            return Some(Err(e));
        }
        match self.next_entry() {
            Some(Ok(entry)) => Some(Ok(entry)),
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl<'a> Entries<'a> {
    fn next_entry(&mut self) -> Option<Result<Entry, ParseError>> {
        let (heading_line, heading) = self.next_heading()?;
        let (id, title) = match self.read_heading(heading_line, heading) {
            Ok(parts) => parts,
            Err(e) => return Some(Err(e)),
        };

        let body = match self.collect_body() {
            Ok(body) => body,
            Err(e) => return Some(Err(e)),
        };
        let (segments, tags) = build_body(&body, self.config);

        let order = self.next_order;
        self.next_order = order.next();

        tracing::debug!(
            id = %id,
            title = %title,
            segments = segments.len(),
            line = heading_line,
            "parsed entry"
        );

        Some(
            Entry::new(id, title, segments, tags)
                .map(|entry| entry.with_created_order(order))
                .map_err(ParseError::from),
        )
    }

    /// Skip preamble lines up to the next heading. Returns its 1-based line.
    fn next_heading(&mut self) -> Option<(usize, &'a str)> {
        for (idx, line) in self.lines.by_ref() {
            if self.config.heading.is_match(line) {
                return Some((idx + 1, line));
            }
            if !line.trim().is_empty() {
                tracing::debug!(line = idx + 1, "skipping text before first heading");
            }
        }
        None
    }

    fn read_heading(&self, line_no: usize, line: &str) -> Result<(EntryId, String), ParseError> {
        let caps = self
            .config
            .heading
            .captures(line)
            .ok_or(ParseError::MissingIdCapture { line: line_no })?;

        let raw_id = caps
            .name("id")
            .or_else(|| caps.get(1))
            .ok_or(ParseError::MissingIdCapture { line: line_no })?
            .as_str();
        let id = raw_id.parse::<EntryId>().map_err(|_| ParseError::InvalidEntryId {
            line: line_no,
            value: raw_id.to_string(),
        })?;

        let title = caps
            .name("title")
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Ok((id, title))
    }

    /// Take body lines up to the next heading outside a code fence.
    fn collect_body(&mut self) -> Result<Vec<&'a str>, ParseError> {
        let fence = match &self.config.code {
            CodeDetector::Fenced { fence } => Some(fence.as_str()),
            _ => None,
        };
        let mut open_fence: Option<usize> = None;
        let mut body = Vec::new();

        while let Some(&(idx, line)) = self.lines.peek() {
            if open_fence.is_none() && self.config.heading.is_match(line) {
                break;
            }
            if let Some(fence) = fence {
                if line.trim_start().starts_with(fence) {
                    open_fence = match open_fence {
                        None => Some(idx + 1),
                        Some(_) if line.trim() == fence => None,
                        Some(opened) => Some(opened),
                    };
                }
            }
            body.push(line);
            self.lines.next();
        }

        match open_fence {
            Some(line) => Err(ParseError::UnterminatedFence { line }),
            None => Ok(body),
        }
    }
}

enum Line<'a> {
    Blank,
    Prose(&'a str),
    Code(&'a str),
}

/// Accumulates segments for one entry body.
struct BodyBuilder<'c> {
    tag_line: Option<&'c Regex>,
    segments: Vec<Segment>,
    text: Vec<String>,
    tags: TagSet,
}

impl<'c> BodyBuilder<'c> {
    fn new(tag_line: Option<&'c Regex>) -> Self {
        Self {
            tag_line,
            segments: Vec::new(),
            text: Vec::new(),
            tags: TagSet::new(),
        }
    }

    fn push_prose(&mut self, line: &str) {
        if let Some(pattern) = self.tag_line {
            if let Some(caps) = pattern.captures(line.trim()) {
                let list = caps.get(1).map_or("", |m| m.as_str());
                self.tags.merge(TagSet::parse_list(list));
                return;
            }
        }
        self.text.push(line.to_string());
    }

    fn push_blank(&mut self) {
        self.text.push(String::new());
    }

    fn push_code<S: Borrow<str>>(&mut self, label: Option<String>, lines: &[S]) {
        self.flush_text();
        self.segments.push(Segment::code(label, lines.join("\n")));
    }

    fn flush_text(&mut self) {
        let start = self.text.iter().position(|l| !l.trim().is_empty());
        let end = self.text.iter().rposition(|l| !l.trim().is_empty());
        if let (Some(start), Some(end)) = (start, end) {
            self.segments.push(Segment::text(self.text[start..=end].join("\n")));
        }
        self.text.clear();
    }

    fn finish(mut self) -> (Vec<Segment>, TagSet) {
        self.flush_text();
        if self.segments.is_empty() {
            self.segments.push(Segment::text(""));
        }
        (self.segments, self.tags)
    }
}

fn build_body(body: &[&str], config: &ParserConfig) -> (Vec<Segment>, TagSet) {
    let mut builder = BodyBuilder::new(config.tag_line.as_ref());

    match &config.code {
        CodeDetector::Fenced { fence } => {
            let fence = fence.as_str();
            let mut lines = body.iter();
            while let Some(line) = lines.next() {
                let trimmed = line.trim_start();
                if let Some(rest) = trimmed.strip_prefix(fence) {
                    let label = Some(rest.trim()).filter(|l| !l.is_empty()).map(str::to_string);
                    let code: Vec<&str> = lines
                        .by_ref()
                        .take_while(|l| l.trim() != fence)
                        .copied()
                        .collect();
                    builder.push_code(label, &code);
                } else if line.trim().is_empty() {
                    builder.push_blank();
                } else {
                    builder.push_prose(line);
                }
            }
        }
        CodeDetector::Indented { width } => {
            let classified: Vec<Line> = body
                .iter()
                .map(|&line| {
                    if line.trim().is_empty() {
                        Line::Blank
                    } else if indent_columns(line, *width) >= *width {
                        Line::Code(line)
                    } else {
                        Line::Prose(line)
                    }
                })
                .collect();
            group_runs(&classified, &mut builder, |lines| strip_common_indent(lines, *width));
        }
        CodeDetector::CommentedProse { marker } => {
            let classified: Vec<Line> = body
                .iter()
                .map(|&line| {
                    if line.trim().is_empty() {
                        Line::Blank
                    } else if let Some(rest) = line.trim_start().strip_prefix(marker.as_str()) {
                        Line::Prose(rest.strip_prefix(' ').unwrap_or(rest))
                    } else {
                        Line::Code(line)
                    }
                })
                .collect();
            group_runs(&classified, &mut builder, |lines| {
                lines.iter().map(|l| l.to_string()).collect()
            });
        }
    }

    builder.finish()
}

/// Group classified lines: a code run absorbs blank lines only when more
/// code follows them.
fn group_runs<'a, F>(lines: &[Line<'a>], builder: &mut BodyBuilder<'_>, shape: F)
where
    F: Fn(&[&'a str]) -> Vec<String>,
{
    let mut idx = 0;
    while idx < lines.len() {
        match lines[idx] {
            Line::Blank => {
                builder.push_blank();
                idx += 1;
            }
            Line::Prose(text) => {
                builder.push_prose(text);
                idx += 1;
            }
            Line::Code(_) => {
                let mut run: Vec<&'a str> = Vec::new();
                let mut pending_blanks = 0;
                while idx < lines.len() {
                    match lines[idx] {
                        Line::Code(code) => {
                            run.extend(std::iter::repeat("").take(pending_blanks));
                            pending_blanks = 0;
                            run.push(code);
                        }
                        Line::Blank => pending_blanks += 1,
                        Line::Prose(_) => break,
                    }
                    idx += 1;
                }
                let shaped = shape(&run);
                builder.push_code(None, &shaped);
                for _ in 0..pending_blanks {
                    builder.push_blank();
                }
            }
        }
    }
}

/// Leading whitespace measured in columns. A tab advances to the next
/// multiple of `width`.
fn indent_columns(line: &str, width: usize) -> usize {
    let tab = width.max(1);
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .fold(0, |col, c| if c == '\t' { (col / tab + 1) * tab } else { col + 1 })
}

/// Remove the indentation shared by every non-blank line, keeping
/// relative indentation. Tabs are expanded before measuring.
fn strip_common_indent(lines: &[&str], width: usize) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_columns(l, width))
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                return String::new();
            }
            let rest = l.trim_start_matches([' ', '\t']);
            let columns = indent_columns(l, width);
            format!("{}{}", " ".repeat(columns - indent), rest)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_indent_is_stripped_once() {
        let lines = ["    def a", "      b", "", "    end"];
        assert_eq!(strip_common_indent(&lines, 4), vec!["def a", "  b", "", "end"]);
    }

    #[test]
    fn tab_expands_to_indent_width() {
        assert_eq!(indent_columns("\tx", 4), 4);
        assert_eq!(indent_columns("  \tx", 4), 4);
        assert_eq!(indent_columns("  x", 4), 2);
    }

    #[test]
    fn mixed_tabs_and_spaces_keep_relative_indent() {
        let lines = ["\tfoo", "      bar"];
        assert_eq!(strip_common_indent(&lines, 4), vec!["foo", "  bar"]);

        let lines = ["\tfoo", "  bar"];
        assert_eq!(strip_common_indent(&lines, 2), vec!["foo", "bar"]);
    }

    #[test]
    fn prefix_heading_reads_joint_numbers() {
        let heading = ParserConfig::heading_prefix("Episode").unwrap();
        let caps = heading.captures("# Episodes 94 & 95 Joint").unwrap();
        assert_eq!(&caps["id"], "94");
        assert_eq!(&caps["title"], "Joint");
        assert!(!heading.is_match("# use 5 things"));
    }
}
