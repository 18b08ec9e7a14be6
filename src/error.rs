pub type HectorResult<T> = std::result::Result<T, HectorError>;

/// Errors raised while reading a skeleton (the snippets builders fill in).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnexpectedEOF {
        /// Describes what was expected, e.g., "(expected '<% } %>')"
        expected_what: String,
    },
    UnknownKeyword {
        keyword: String,
    },
    Expected {
        description: String,
    },
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEOF { expected_what } => {
                write!(f, "Unexpected EOF{}", expected_what)
            }
            Self::UnknownKeyword { keyword } => {
                write!(f, "Unknown directive '{}'", keyword)
            }
            Self::Expected { description } => {
                write!(f, "Expected {}", description)
            }
        }
    }
}

impl std::error::Error for ParseErrorKind {}

impl ParseErrorKind {
    pub fn unexpected_eof(expected: Option<String>) -> Self {
        Self::UnexpectedEOF {
            expected_what: expected.map_or_else(String::new, |e| format!(" (expected '{}')", e)),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub kind: ParseErrorKind,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Skeleton error at line {}, column {}: {}",
            self.line, self.column, self.kind
        )
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// A template did not match the grammar.
///
/// Reported at the right-most position any alternative reached, together with
/// every token description that was attempted there.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxError {
    /// Sorted and deduplicated.
    pub expected: Vec<String>,
    /// `None` at end of input.
    pub found: Option<char>,
    /// Character offset into the source.
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn message(&self) -> String {
        let expected = match self.expected.as_slice() {
            [] => "end of input".to_string(),
            [single] => single.clone(),
            [init @ .., last] => format!("{} or {}", init.join(", "), last),
        };
        let found = self
            .found
            .map_or_else(|| "end of input".to_string(), |c| format!("{:?}", c.to_string()));
        format!("Expected {} but {} found.", expected, found)
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Syntax error at line {}, column {}: {}",
            self.line,
            self.column,
            self.message()
        )
    }
}

impl std::error::Error for SyntaxError {}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HectorError {
    Syntax(SyntaxError),
    BuilderNotFound {
        node_type: String,
    },
    InvalidNodeType {
        expected: String,
        found: String,
    },
    MissingContext,
    MissingField {
        field: String,
    },
    NestingTooDeep {
        limit: usize,
    },
    Skeleton(ParseError),
}

impl std::fmt::Display for HectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax(syntax_error) => {
                write!(f, "{}", syntax_error)
            }
            Self::BuilderNotFound { node_type } => {
                write!(f, "No builder for type: {}", node_type)
            }
            Self::InvalidNodeType { expected, found } => {
                write!(f, "Invalid node type: expected {}, found {}", expected, found)
            }
            Self::MissingContext => {
                write!(f, "A context name is required to generate output")
            }
            Self::MissingField { field } => {
                write!(f, "Skeleton field not supplied: {}", field)
            }
            Self::NestingTooDeep { limit } => {
                write!(f, "Template nested more than {} levels deep", limit)
            }
            Self::Skeleton(parse_error) => {
                write!(f, "{}", parse_error)
            }
        }
    }
}

impl std::error::Error for HectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Syntax(syntax_error) => Some(syntax_error),
            Self::Skeleton(parse_error) => Some(parse_error),
            Self::BuilderNotFound { .. }
            | Self::InvalidNodeType { .. }
            | Self::MissingContext
            | Self::MissingField { .. }
            | Self::NestingTooDeep { .. } => None,
        }
    }
}

impl From<SyntaxError> for HectorError {
    fn from(error: SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

impl From<ParseError> for HectorError {
    fn from(error: ParseError) -> Self {
        Self::Skeleton(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_error(expected: &[&str], found: Option<char>) -> SyntaxError {
        SyntaxError {
            expected: expected.iter().map(|e| e.to_string()).collect(),
            found,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_message_lists_alternatives() {
        let err = syntax_error(&["property", "string", "variable"], Some(';'));
        assert_eq!(
            err.message(),
            "Expected property, string or variable but \";\" found."
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_message_at_end_of_input() {
        let err = syntax_error(&["\"}\""], None);
        assert_eq!(err.message(), "Expected \"}\" but end of input found.");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_display_carries_position() {
        let mut err = syntax_error(&[], Some('x'));
        err.line = 3;
        err.column = 7;
        let rendered = HectorError::from(err).to_string();
        assert!(rendered.starts_with("Syntax error at line 3, column 7"));
        assert!(rendered.contains("Expected end of input"));
    }
}
