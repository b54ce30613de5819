// SPDX-License-Identifier: Apache-2.0

//! Dotted field paths with quoted and regex segments.
//!
//! `.metadata.annotations."a.b/c"` keeps the quoted run as one literal segment;
//! `` .metadata.name.`^kube-` `` compiles the backtick run into a regex that is
//! matched against mapping keys during traversal.

use std::fmt;

use regex::Regex;

use crate::errors::{CoreError, ErrorCode, Result};

#[derive(Debug, Clone)]
pub enum PathStep {
    Literal(String),
    Pattern(Regex),
}

impl PathStep {
    /// Whether this step selects the given mapping key.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Literal(s) => s == key,
            Self::Pattern(re) => re.is_match(key),
        }
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(s) => Some(s),
            Self::Pattern(_) => None,
        }
    }
}

impl PartialEq for PathStep {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    steps: Vec<PathStep>,
}

impl FieldPath {
    #[must_use]
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Parse a dot-separated path. Double-quoted runs stay literal segments
    /// (dots included), backtick runs compile to regexes. A quote with no
    /// closing partner is a syntax error; malformed paths never panic.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim_start_matches('.');
        let (scrubbed, replacements) = extract_quoted_runs(input, trimmed)?;

        let mut steps = Vec::new();
        for segment in scrubbed.split('.') {
            let step = match replacements.iter().find(|r| r.placeholder == segment) {
                Some(rep) if rep.quote == '`' => {
                    let re = Regex::new(&rep.body).map_err(|e| {
                        CoreError::new(
                            ErrorCode::PathSyntax,
                            format!("invalid regex segment in path {input}: {e}"),
                        )
                    })?;
                    PathStep::Pattern(re)
                }
                Some(rep) => PathStep::Literal(rep.body.clone()),
                None => PathStep::Literal(segment.to_string()),
            };
            steps.push(step);
        }
        Ok(Self { steps })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.steps {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            match step {
                PathStep::Literal(s) if s.contains('.') => write!(f, "\"{s}\"")?,
                PathStep::Literal(s) => write!(f, "{s}")?,
                PathStep::Pattern(re) => write!(f, "`{}`", re.as_str())?,
            }
        }
        Ok(())
    }
}

struct QuotedRun {
    placeholder: String,
    body: String,
    quote: char,
}

/// Replace balanced quoted runs with stable placeholders so the remainder can
/// be split on dots. Any unpaired quote is a syntax error.
fn extract_quoted_runs(original: &str, path: &str) -> Result<(String, Vec<QuotedRun>)> {
    let mut scrubbed = String::with_capacity(path.len());
    let mut replacements = Vec::new();
    let mut rest = path;
    while let Some(pos) = rest.find(['"', '`']) {
        let quote = rest[pos..].chars().next().unwrap_or('"');
        scrubbed.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let Some(end) = after.find(quote) else {
            return Err(CoreError::new(
                ErrorCode::PathSyntax,
                format!("mismatched quote `{quote}` in path {original}"),
            ));
        };
        let run = QuotedRun {
            placeholder: format!("driftlens-entry-{}", replacements.len()),
            body: after[..end].to_string(),
            quote,
        };
        scrubbed.push_str(&run.placeholder);
        replacements.push(run);
        rest = &after[end + 1..];
    }
    scrubbed.push_str(rest);
    Ok((scrubbed, replacements))
}
