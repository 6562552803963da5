//! Target URL patterns.
//!
//! A target is a host with an optional path, e.g. `example.com`,
//! `*.example.com` or `example.com/blog/*`. It is compiled once into an
//! anchored, case-insensitive regex tested against `host + path` of each
//! result URL.

use regex::{Regex, RegexBuilder};
use url::Url;

use crate::{Result, ResultItem, SearchError};

/// Compiled target pattern.
#[derive(Debug, Clone)]
pub struct TargetPattern {
    source: String,
    regex: Regex,
}

impl TargetPattern {
    /// Compiles a target string.
    pub fn compile(target: &str) -> Result<Self> {
        let literal = target.strip_prefix("*.").unwrap_or(target);

        let mut pattern = format!("(.*\\.)?{}", regex::escape(literal));

        if let Some(stripped) = pattern.strip_suffix("\\*") {
            pattern = format!("{}.*", stripped);
        }

        if !literal.contains('/') {
            pattern.push_str("/.*");
        }

        let regex = RegexBuilder::new(&format!("^{}$", pattern))
            .case_insensitive(true)
            .build()
            .map_err(|e| SearchError::InvalidQuery(format!("invalid target '{}': {}", target, e)))?;

        Ok(Self {
            source: target.to_string(),
            regex,
        })
    }

    /// The target string the pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Tests a result item. Items without a parsable URL never match.
    pub fn is_match(&self, item: &ResultItem) -> bool {
        item.url
            .as_deref()
            .is_some_and(|url| self.matches_url(url))
    }

    /// Tests an absolute URL; query string and fragment are ignored.
    pub fn matches_url(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => {
                let subject = format!("{}{}", parsed.host_str().unwrap_or_default(), parsed.path());
                self.regex.is_match(&subject)
            }
            Err(_) => false,
        }
    }

    /// Tests a bare `host + path` string.
    pub fn matches_subject(&self, subject: &str) -> bool {
        self.regex.is_match(subject)
    }
}
