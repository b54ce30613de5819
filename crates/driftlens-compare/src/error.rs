// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use driftlens_core::{CoreError, ErrorCode};

/// Engine failures. Structured variants keep enough context for the summary;
/// `code()` maps each onto the shared taxonomy.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CompareError {
    Config {
        code: ErrorCode,
        message: String,
    },
    Compile {
        template: String,
        message: String,
    },
    Expand {
        template: String,
        message: String,
    },
    UnknownMatch {
        key: String,
    },
    MultipleMatches {
        key: String,
        names: Vec<String>,
    },
    PatchApply {
        key: String,
        message: String,
    },
    Core(CoreError),
    Joined(Vec<CompareError>),
}

impl CompareError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config { code, .. } => *code,
            Self::Compile { .. } => ErrorCode::TemplateCompile,
            Self::Expand { .. } => ErrorCode::TemplateExpand,
            Self::UnknownMatch { .. } => ErrorCode::UnknownMatch,
            Self::MultipleMatches { .. } => ErrorCode::MultipleMatches,
            Self::PatchApply { .. } => ErrorCode::PatchApply,
            Self::Core(err) => err.code(),
            Self::Joined(parts) => parts.first().map_or(ErrorCode::Io, Self::code),
        }
    }

    /// Collapse a batch of errors: one error stays itself, several join.
    #[must_use]
    pub fn joined(mut errors: Vec<CompareError>) -> Self {
        if errors.len() == 1 {
            errors.remove(0)
        } else {
            Self::Joined(errors)
        }
    }

    /// True when every leaf of this (possibly joined) error carries one of the
    /// allowed codes. Used to decide whether a miss may be ignored.
    #[must_use]
    pub fn only_codes(&self, allowed: &[ErrorCode]) -> bool {
        match self {
            Self::Joined(parts) => parts.iter().all(|part| part.only_codes(allowed)),
            other => allowed.contains(&other.code()),
        }
    }
}

impl fmt::Display for CompareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, .. } => write!(f, "{message}"),
            Self::Compile { template, message } => {
                write!(f, "failed to compile template {template}: {message}")
            }
            Self::Expand { template, message } => {
                write!(f, "failed to expand template {template}: {message}")
            }
            Self::UnknownMatch { key } => {
                write!(f, "no template could be matched for: {key}")
            }
            Self::MultipleMatches { key, names } => write!(
                f,
                "multiple templates were matched for: {key}. The matches are: {}",
                names.join(", ")
            ),
            Self::PatchApply { key, message } => {
                write!(f, "failed to apply override for {key}: {message}")
            }
            Self::Core(err) => write!(f, "{err}"),
            Self::Joined(parts) => {
                let mut first = true;
                for part in parts {
                    if !first {
                        writeln!(f)?;
                    }
                    first = false;
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompareError {}

impl From<CoreError> for CompareError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}

/// Ordered aggregation of non-fatal errors collected across a load or a batch.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<CompareError>,
}

impl ErrorList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CompareError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompareError> {
        self.errors.iter()
    }

    pub fn into_result(self) -> Result<(), CompareError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CompareError::joined(self.errors))
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_error_flattens_singletons() {
        let err = CompareError::joined(vec![CompareError::UnknownMatch {
            key: "v1_Pod_p".to_string(),
        }]);
        assert!(matches!(err, CompareError::UnknownMatch { .. }));
    }

    #[test]
    fn only_codes_inspects_joined_leaves() {
        let err = CompareError::joined(vec![
            CompareError::UnknownMatch {
                key: "a".to_string(),
            },
            CompareError::MultipleMatches {
                key: "b".to_string(),
                names: vec![],
            },
        ]);
        assert!(err.only_codes(&[ErrorCode::UnknownMatch, ErrorCode::MultipleMatches]));
        assert!(!err.only_codes(&[ErrorCode::UnknownMatch]));
    }

    #[test]
    fn error_list_joins_in_order() {
        let mut list = ErrorList::new();
        list.push(CompareError::UnknownMatch {
            key: "x".to_string(),
        });
        list.push(CompareError::UnknownMatch {
            key: "y".to_string(),
        });
        let err = list.into_result().expect_err("non-empty");
        let rendered = err.to_string();
        assert!(rendered.contains("x"));
        assert!(rendered.contains("y"));
    }
}
