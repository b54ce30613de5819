// SPDX-License-Identifier: Apache-2.0

use std::fmt;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Classification of every failure the engine can report. Fatal codes abort a
/// run; the rest aggregate into the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[non_exhaustive]
pub enum ErrorCode {
    ConfigNotFound,
    ConfigMalformed,
    PathSyntax,
    TemplateCompile,
    TemplateExpand,
    UnknownMatch,
    MultipleMatches,
    PatchApply,
    Traverse,
    Io,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigNotFound => "config_not_found",
            Self::ConfigMalformed => "config_malformed",
            Self::PathSyntax => "path_syntax",
            Self::TemplateCompile => "template_compile",
            Self::TemplateExpand => "template_expand",
            Self::UnknownMatch => "unknown_match",
            Self::MultipleMatches => "multiple_matches",
            Self::PatchApply => "patch_apply",
            Self::Traverse => "traverse",
            Self::Io => "io",
        }
    }

    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::ConfigNotFound | Self::ConfigMalformed | Self::Io)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    code: ErrorCode,
    message: String,
}

impl CoreError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CoreError {}

impl From<std::io::Error> for CoreError {
    fn from(value: std::io::Error) -> Self {
        let code = if value.kind() == std::io::ErrorKind::NotFound {
            ErrorCode::ConfigNotFound
        } else {
            ErrorCode::Io
        };
        Self::new(code, value.to_string())
    }
}

/// Process exit mapping for drivers sitting on top of the engine.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExitCode {
    Success = 0,
    Differences = 1,
    Usage = 2,
    Validation = 3,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Differences => "differences",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}
