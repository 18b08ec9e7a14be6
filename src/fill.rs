use std::{borrow::Cow, collections::BTreeMap};

use crate::error::{HectorError, HectorResult, ParseError, ParseErrorKind};

type ParseResult<T> = Result<T, ParseError>;

/// A value substituted into a skeleton.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field<'a> {
    Text(Cow<'a, str>),
    Flag(bool),
}

impl Field<'_> {
    /// Flags are taken as-is, text is truthy when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(text) => !text.is_empty(),
            Self::Flag(flag) => *flag,
        }
    }

    fn write_to(&self, output: &mut String) {
        match self {
            Self::Text(text) => output.push_str(text),
            Self::Flag(true) => output.push_str("true"),
            Self::Flag(false) => output.push_str("false"),
        }
    }
}

impl<'a> From<&'a str> for Field<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Field<'_> {
    fn from(text: String) -> Self {
        Self::Text(Cow::Owned(text))
    }
}

impl From<bool> for Field<'_> {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

/// The named values a skeleton is filled with.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Fields<'a> {
    data: BTreeMap<String, Field<'a>>,
}

impl Fields<'_> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'a> Fields<'a> {
    pub fn insert<T: AsRef<str>, V: Into<Field<'a>>>(&mut self, name: T, value: V) -> &mut Self {
        self.data.insert(name.as_ref().to_string(), value.into());
        self
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&Field<'a>> {
        self.data.get(name.as_ref())
    }

    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.data.contains_key(name.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Condition {
    field: String,
    negated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Copied through unchanged.
    Constant(String),
    /// `$name`
    Placeholder(String),
    /// `<% if (name) { %> ... <% } else { %> ... <% } %>`
    If {
        condition: Condition,
        body: Vec<Segment>,
        else_branch: Vec<Segment>,
    },
}

const ELSE_TAG: [&str; 5] = ["<%", "}", "else", "{", "%>"];
const END_TAG: [&str; 3] = ["<%", "}", "%>"];

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// The starting location of the current line
    line_start_pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Parser {
            input,
            pos: 0,
            line: 1,
            line_start_pos: 0,
        }
    }

    #[inline]
    const fn current_column(&self) -> usize {
        self.pos - self.line_start_pos + 1
    }

    #[inline]
    const fn make_error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            line: self.line,
            column: self.current_column(),
            kind,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    /// Advances past `current_char`, tracking line starts.
    #[inline]
    fn advance_by_char(&mut self, current_char: char) {
        let char_len = current_char.len_utf8();
        if current_char == '\n' {
            self.line += 1;
            self.line_start_pos = self.pos + char_len;
        }
        self.pos += char_len;
    }

    /// Used for fixed delimiters, which never contain newlines.
    #[inline]
    const fn advance_bytes_no_newline(&mut self, len: usize) {
        self.pos += len;
    }

    const fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self, s: &str) -> bool {
        self.input
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(s))
    }

    /// Checks for a sequence of tokens, ignoring whitespace between them.
    fn peek_n<const N: usize>(&self, tokens: [&str; N]) -> bool {
        let mut parser = Self {
            input: self.input,
            pos: self.pos,
            line: self.line,
            line_start_pos: self.line_start_pos,
        };

        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                parser.consume_whitespace();
            }
            if !parser.peek(token) {
                return false;
            }
            parser.advance_bytes_no_newline(token.len());
        }
        true
    }

    fn consume(&mut self, s: &str) -> bool {
        if self.peek(s) {
            self.advance_bytes_no_newline(s.len());
            true
        } else {
            false
        }
    }

    fn consume_whitespace(&mut self) {
        while let Some(current_char) = self.current_char() {
            if !current_char.is_whitespace() {
                break;
            }
            self.advance_by_char(current_char);
        }
    }

    fn expect(&mut self, s: &str) -> ParseResult<()> {
        if self.consume(s) {
            Ok(())
        } else {
            Err(self.make_error(ParseErrorKind::Expected {
                description: format!("'{}'", s),
            }))
        }
    }

    fn consume_identifier(&mut self) -> ParseResult<&'a str> {
        let start = self.pos;
        while let Some(current_char) = self.current_char() {
            if current_char.is_ascii_alphanumeric() || current_char == '_' {
                self.advance_bytes_no_newline(current_char.len_utf8());
            } else {
                break;
            }
        }
        match self.input.get(start..self.pos) {
            Some(identifier) if !identifier.is_empty() => Ok(identifier),
            _ => Err(self.make_error(ParseErrorKind::Expected {
                description: "identifier".to_string(),
            })),
        }
    }

    /// `$` followed by something that can start a field name.
    fn at_placeholder(&self) -> bool {
        self.peek("$")
            && self
                .input
                .get(self.pos + 1..)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    }

    fn parse_constant(&mut self) -> Segment {
        let start = self.pos;
        // Always take the first character: a lone `$` is plain text.
        if let Some(current_char) = self.current_char() {
            self.advance_by_char(current_char);
        }
        while let Some(current_char) = self.current_char() {
            if self.peek("<%") || self.at_placeholder() {
                break;
            }
            self.advance_by_char(current_char);
        }
        Segment::Constant(self.input.get(start..self.pos).unwrap_or_default().to_string())
    }

    fn parse_placeholder(&mut self) -> ParseResult<Segment> {
        self.expect("$")?;
        let name = self.consume_identifier()?;
        Ok(Segment::Placeholder(name.to_string()))
    }

    fn parse_segment(&mut self) -> ParseResult<Segment> {
        if self.peek("<%") {
            self.parse_directive()
        } else if self.at_placeholder() {
            self.parse_placeholder()
        } else {
            Ok(self.parse_constant())
        }
    }

    fn parse_segments(&mut self, in_block: bool) -> ParseResult<Vec<Segment>> {
        let mut segments = Vec::new();
        loop {
            if self.eof() {
                if in_block {
                    return Err(
                        self.make_error(ParseErrorKind::unexpected_eof(Some("<% } %>".to_string())))
                    );
                }
                break;
            }
            if in_block && (self.peek_n(ELSE_TAG) || self.peek_n(END_TAG)) {
                break;
            }
            segments.push(self.parse_segment()?);
        }
        Ok(segments)
    }

    fn expect_tag<const N: usize>(&mut self, tokens: [&str; N]) -> ParseResult<()> {
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 {
                self.consume_whitespace();
            }
            self.expect(token)?;
        }
        Ok(())
    }

    fn parse_directive(&mut self) -> ParseResult<Segment> {
        self.expect("<%")?;
        self.consume_whitespace();
        let keyword = self.consume_identifier()?;
        if keyword != "if" {
            return Err(self.make_error(ParseErrorKind::UnknownKeyword {
                keyword: keyword.to_string(),
            }));
        }

        self.consume_whitespace();
        self.expect("(")?;
        self.consume_whitespace();
        let negated = self.consume("!");
        self.consume_whitespace();
        let field = self.consume_identifier()?.to_string();
        self.consume_whitespace();
        self.expect_tag([")", "{", "%>"])?;

        let body = self.parse_segments(true)?;
        let mut else_branch = Vec::new();
        if self.peek_n(ELSE_TAG) {
            self.expect_tag(ELSE_TAG)?;
            else_branch = self.parse_segments(true)?;
            if !self.peek_n(END_TAG) {
                return Err(self.make_error(ParseErrorKind::Expected {
                    description: "'<% } %>'".to_string(),
                }));
            }
        }
        self.expect_tag(END_TAG)?;

        Ok(Segment::If {
            condition: Condition { field, negated },
            body,
            else_branch,
        })
    }
}

/// A parsed skeleton, ready to be filled any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    segments: Vec<Segment>,
}

impl Skeleton {
    /// # Errors
    /// Returns a [`ParseError`] if a directive is malformed or left open.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let mut parser = Parser::new(source);
        let segments = parser.parse_segments(false)?;
        Ok(Self { segments })
    }

    /// Substitutes `fields` into the skeleton.
    ///
    /// `$name` placeholders without a matching field are left as written.
    ///
    /// # Errors
    /// - If a conditional names a field that was not supplied.
    pub fn fill(&self, fields: &Fields<'_>) -> HectorResult<String> {
        let mut output = String::new();
        render_segments(&self.segments, fields, &mut output)?;
        Ok(output)
    }
}

fn render_segments(
    segments: &[Segment],
    fields: &Fields<'_>,
    output: &mut String,
) -> HectorResult<()> {
    for segment in segments {
        match segment {
            Segment::Constant(data) => output.push_str(data),
            Segment::Placeholder(name) => match fields.get(name) {
                Some(field) => field.write_to(output),
                None => {
                    output.push('$');
                    output.push_str(name);
                }
            },
            Segment::If {
                condition,
                body,
                else_branch,
            } => {
                let value = fields
                    .get(&condition.field)
                    .ok_or_else(|| HectorError::MissingField {
                        field: condition.field.clone(),
                    })?
                    .is_truthy();
                if value != condition.negated {
                    render_segments(body, fields, output)?;
                } else {
                    render_segments(else_branch, fields, output)?;
                }
            }
        }
    }
    Ok(())
}

/// Parses `skeleton` and fills it with `fields` in one step.
///
/// # Errors
/// - [`HectorError::Skeleton`] if the skeleton is malformed.
/// - [`HectorError::MissingField`] if a conditional field is not supplied.
pub fn fill(skeleton: &str, fields: &Fields<'_>) -> HectorResult<String> {
    Skeleton::parse(skeleton)?.fill(fields)
}
