//! Configuration for parsing and searching notes.
//!
//! Loaded from TOML; every field has a default, so an empty file (or no
//! file at all) yields a working configuration.

use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entry::parser::{CodeDetector, ParserConfig, DEFAULT_HEADING, DEFAULT_TAG_LINE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid {field} pattern: {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("Code fence must not be empty")]
    EmptyFence,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub parser: ParserSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

/// Parser rules in their serializable form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParserSettings {
    /// Heading regex; needs an `id` group (or a first group) holding the number
    #[serde(default = "default_heading")]
    pub heading: String,

    /// Series word for `# <word> <n> <title>` headings; overrides `heading`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_prefix: Option<String>,

    /// Tag line regex; group 1 holds the tag list. Empty disables tag lines.
    #[serde(default = "default_tag_line")]
    pub tag_line: String,

    #[serde(default)]
    pub code: CodeDetector,
}

/// Search defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchSettings {
    /// Applied when a request carries no limit; absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<usize>,
}

fn default_heading() -> String {
    DEFAULT_HEADING.to_string()
}

fn default_tag_line() -> String {
    DEFAULT_TAG_LINE.to_string()
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            heading: default_heading(),
            heading_prefix: None,
            tag_line: default_tag_line(),
            code: CodeDetector::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Compile the parser rules.
    pub fn parser_config(&self) -> Result<ParserConfig, ConfigError> {
        self.parser.compile()
    }
}

impl ParserSettings {
    pub fn compile(&self) -> Result<ParserConfig, ConfigError> {
        let heading = match &self.heading_prefix {
            Some(word) => ParserConfig::heading_prefix(word),
            None => Regex::new(&self.heading),
        }
        .map_err(|source| ConfigError::InvalidPattern {
            field: "heading",
            source,
        })?;

        let tag_line = if self.tag_line.trim().is_empty() {
            None
        } else {
            Some(
                Regex::new(&self.tag_line).map_err(|source| ConfigError::InvalidPattern {
                    field: "tag_line",
                    source,
                })?,
            )
        };

        if matches!(&self.code, CodeDetector::Fenced { fence } if fence.trim().is_empty()) {
            return Err(ConfigError::EmptyFence);
        }

        Ok(ParserConfig::new(heading, self.code.clone()).with_tag_line(tag_line))
    }
}
