use std::{borrow::Cow, collections::HashMap};

use tracing::debug;

use crate::{
    ast::{
        Argument, Attribute, ConstructorName, Html, MAX_NESTING, Node, StringLiteral, Template,
        Value, Variable, View, push_coalesced, push_escaped,
    },
    error::SyntaxError,
    options::GrammarProfile,
    symbols::SymbolTable,
};

/// `None` means the rule did not match. Position is restored by whoever
/// started the alternative.
type Rule<T> = Option<T>;

/// Output of a successful parse.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parsed {
    pub template: Template,
    /// Every identifier the parser read, including ones inside alternatives
    /// that were later abandoned.
    pub symbols: SymbolTable,
}

const fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_inline_whitespace(c: char) -> bool {
    c == '\u{feff}' || (c.is_whitespace() && !is_line_terminator(c))
}

const fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

struct Parser<'a> {
    input: &'a str,
    /// Byte offset into `input`
    pos: usize,
    profile: GrammarProfile,
    /// Greater than zero inside a named rule, whose inner failures are
    /// summarised by the rule's own name.
    silence: usize,
    /// Furthest byte offset any rule has failed at
    rightmost: usize,
    /// What was attempted at `rightmost`
    expected: Vec<Cow<'static, str>>,
    symbols: SymbolTable,
    /// Bodies currently open
    depth: usize,
    /// Where the first body past `MAX_NESTING` started
    too_deep: Option<usize>,
    /// Helper outcome by start offset, with the offset it ended at
    helpers: HashMap<usize, Option<(Html, usize)>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, profile: GrammarProfile) -> Self {
        Parser {
            input,
            pos: 0,
            profile,
            silence: 0,
            rightmost: 0,
            expected: Vec::new(),
            symbols: SymbolTable::new(),
            depth: 0,
            too_deep: None,
            helpers: HashMap::new(),
        }
    }

    fn rest(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or_default()
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Advances past `c`, which must be the current character.
    #[inline]
    const fn bump(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn peek(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    const fn reporting(&self) -> bool {
        self.silence == 0 && self.pos >= self.rightmost
    }

    /// Records that `description` was expected at the current position.
    fn fail<D: Into<Cow<'static, str>>>(&mut self, description: D) {
        if !self.reporting() {
            return;
        }
        if self.pos > self.rightmost {
            self.rightmost = self.pos;
            self.expected.clear();
        }
        self.expected.push(description.into());
    }

    /// Runs `rule` as one token: on failure the position is rewound and only
    /// `name` is reported.
    fn named<T, F>(&mut self, name: &'static str, rule: F) -> Rule<T>
    where
        F: FnOnce(&mut Self) -> Rule<T>,
    {
        let start = self.pos;
        self.silence += 1;
        let result = rule(self);
        self.silence -= 1;
        if result.is_none() {
            self.pos = start;
            self.fail(name);
        }
        result
    }

    /// Runs `rule`, rewinding to the starting position if it fails.
    fn attempt<T, F>(&mut self, rule: F) -> Rule<T>
    where
        F: FnOnce(&mut Self) -> Rule<T>,
    {
        let start = self.pos;
        let result = rule(self);
        if result.is_none() {
            self.pos = start;
        }
        result
    }

    fn literal(&mut self, s: &'static str) -> Rule<()> {
        if self.peek(s) {
            self.pos += s.len();
            Some(())
        } else {
            if self.reporting() {
                self.fail(format!("{:?}", s));
            }
            None
        }
    }

    /// A literal word that may not run on into an identifier.
    fn keyword(&mut self, word: &'static str) -> Rule<()> {
        self.attempt(|p| {
            p.literal(word)?;
            match p.current_char() {
                Some(c) if is_identifier_part(c) => None,
                Some(_) | None => Some(()),
            }
        })
    }

    /// Opens a body that starts at `start`, failing once `MAX_NESTING`
    /// bodies are already open.
    fn descend(&mut self, start: usize) -> bool {
        if self.depth >= MAX_NESTING {
            if self.too_deep.is_none() {
                self.too_deep = Some(start);
            }
            return false;
        }
        self.depth += 1;
        true
    }

    const fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Skips whitespace, line terminators and comments.
    fn skip_trivia(&mut self) {
        self.skip(true);
    }

    /// Skips whitespace and comments without leaving the current line.
    fn skip_line_trivia(&mut self) {
        self.skip(false);
    }

    fn skip(&mut self, cross_lines: bool) {
        loop {
            if let Some(c) = self.current_char() {
                if is_inline_whitespace(c) || (cross_lines && is_line_terminator(c)) {
                    self.bump(c);
                    continue;
                }
            }

            if self.peek("/*") {
                let body = self.rest().get(2..).unwrap_or_default();
                match body.find("*/") {
                    Some(end)
                        if cross_lines
                            || !body.get(..end).unwrap_or_default().contains(is_line_terminator) =>
                    {
                        self.pos += end + 4;
                        continue;
                    }
                    Some(_) | None => break,
                }
            }

            if self.peek("//") {
                while let Some(c) = self.current_char() {
                    if is_line_terminator(c) {
                        break;
                    }
                    self.bump(c);
                }
                continue;
            }

            break;
        }
    }

    /// `[a-zA-Z_][a-zA-Z_0-9]*`, recorded into the symbol table.
    fn identifier(&mut self) -> Rule<String> {
        self.named("identifier", |p| {
            let start = p.pos;
            match p.current_char() {
                Some(c) if is_identifier_start(c) => p.bump(c),
                Some(_) | None => return None,
            }
            while let Some(c) = p.current_char() {
                if !is_identifier_part(c) {
                    break;
                }
                p.bump(c);
            }
            let name = p.input.get(start..p.pos)?.to_string();
            p.symbols.insert(&name);
            Some(name)
        })
    }

    /// Dotted identifier path. A trailing dot is left unconsumed.
    fn property(&mut self) -> Rule<String> {
        self.named("property", |p| {
            let mut path = p.identifier()?;
            while let Some(segment) = p.attempt(|p| {
                p.literal(".")?;
                p.identifier()
            }) {
                path.push('.');
                path.push_str(&segment);
            }
            Some(path)
        })
    }

    /// Single or double quoted, re-emitted as a double-quoted literal.
    fn string_literal(&mut self) -> Rule<StringLiteral> {
        self.named("string", |p| {
            let quote = match p.current_char() {
                Some(c @ ('"' | '\'')) => c,
                Some(_) | None => return None,
            };
            p.bump(quote);

            let mut body = String::new();
            loop {
                let c = p.current_char()?;
                if c == quote {
                    p.bump(c);
                    break;
                }
                if is_line_terminator(c) {
                    return None;
                }
                p.bump(c);
                if c == '\\' {
                    p.escape_sequence(&mut body)?;
                } else {
                    push_escaped(&mut body, c);
                }
            }
            Some(StringLiteral::from_escaped(&body))
        })
    }

    /// Decodes the character after a backslash into `body`.
    fn escape_sequence(&mut self, body: &mut String) -> Rule<()> {
        let c = self.current_char()?;
        self.bump(c);
        match c {
            // Line continuation
            '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                if c == '\r' && self.peek("\n") {
                    self.bump('\n');
                }
            }
            'b' => push_escaped(body, '\u{8}'),
            'f' => push_escaped(body, '\u{c}'),
            'n' => push_escaped(body, '\n'),
            'r' => push_escaped(body, '\r'),
            't' => push_escaped(body, '\t'),
            'v' => push_escaped(body, '\u{b}'),
            // Numeric escapes are left for the output language to decode.
            'x' | 'u' | '0'..='9' => {
                body.push('\\');
                body.push(c);
            }
            other => push_escaped(body, other),
        }
        Some(())
    }

    /// `$name`, `$name?`, optionally followed by attributes.
    fn variable(&mut self) -> Rule<Variable> {
        self.named("variable", |p| {
            p.literal("$")?;
            let name = p.identifier()?;
            let is_conditional = p.keyword("?").is_some();
            let attributes = p
                .attempt(|p| {
                    p.skip_trivia();
                    p.attributes()
                })
                .unwrap_or_default();
            Some(Variable {
                name,
                is_conditional,
                attributes,
            })
        })
    }

    fn variable_statement(&mut self) -> Rule<Variable> {
        self.attempt(|p| {
            let variable = p.variable()?;
            p.skip_trivia();
            p.literal(";")?;
            Some(variable)
        })
    }

    /// `key.path = value`
    fn attribute(&mut self) -> Rule<Attribute> {
        self.attempt(|p| {
            let key = p.property()?;
            p.skip_trivia();
            p.literal("=")?;
            p.skip_trivia();
            let value = if let Some(literal) = p.string_literal() {
                Value::StringLiteral(literal)
            } else if let Some(variable) = p.variable() {
                Value::Variable(variable)
            } else {
                Value::Identifier(p.identifier()?)
            };
            Some(Attribute::new(key, value))
        })
    }

    fn attributes(&mut self) -> Rule<Vec<Attribute>> {
        let mut attributes = vec![self.attribute()?];
        while let Some(attribute) = self.attempt(|p| {
            p.skip_trivia();
            p.attribute()
        }) {
            attributes.push(attribute);
        }
        Some(attributes)
    }

    /// `key = value;` written directly in a body.
    fn attribute_statement(&mut self) -> Rule<Attribute> {
        self.attempt(|p| {
            let attribute = p.attribute()?;
            p.skip_trivia();
            p.literal(";")?;
            Some(attribute)
        })
    }

    /// `key: value;`
    fn argument(&mut self) -> Rule<Argument> {
        self.attempt(|p| {
            let key = p.identifier()?;
            p.skip_trivia();
            p.literal(":")?;
            p.skip_trivia();
            let value = if let Some(literal) = p.string_literal() {
                Value::StringLiteral(literal)
            } else if let Some(variable) = p.variable() {
                Value::Variable(variable)
            } else {
                Value::View(Box::new(p.inline_instance()?))
            };
            p.skip_trivia();
            p.literal(";")?;
            Some(Argument { key, value })
        })
    }

    fn arguments(&mut self) -> Rule<Vec<Node>> {
        let mut arguments = vec![Node::Argument(self.argument()?)];
        while let Some(argument) = self.attempt(|p| {
            p.skip_trivia();
            p.argument()
        }) {
            arguments.push(Node::Argument(argument));
        }
        Some(arguments)
    }

    /// A constructor with attributes on a single line, used as an argument value.
    fn inline_instance(&mut self) -> Rule<View> {
        let constructor = self.property()?;
        let attributes = self
            .attempt(|p| {
                p.skip_line_trivia();
                p.attributes()
            })
            .unwrap_or_default();
        Some(View {
            constructor: ConstructorName::Identifier(constructor),
            attributes,
            children: Vec::new(),
        })
    }

    fn constructor_name(&mut self, allow_variable: bool) -> Rule<ConstructorName> {
        if allow_variable {
            if let Some(variable) = self.variable() {
                return Some(ConstructorName::Variable(variable));
            }
        }
        self.property().map(ConstructorName::Identifier)
    }

    /// `Name attrs;` or `Name attrs { body }`, the latter optionally followed by `;`.
    fn template_instance(&mut self, allow_variable: bool) -> Rule<View> {
        self.attempt(|p| {
            let constructor = p.constructor_name(allow_variable)?;
            p.skip_trivia();
            let attributes = p.attributes().unwrap_or_default();
            p.skip_trivia();

            if p.literal(";").is_some() {
                return Some(View {
                    constructor,
                    attributes,
                    children: Vec::new(),
                });
            }

            if p.peek("{") && !p.descend(p.pos) {
                return None;
            }
            p.literal("{")?;
            p.skip_trivia();
            let children = p.children().unwrap_or_default();
            p.ascend();
            p.skip_trivia();
            p.literal("}")?;
            p.attempt(|p| {
                p.skip_trivia();
                p.literal(";")
            });

            Some(View {
                constructor,
                attributes,
                children,
            })
        })
    }

    /// `def Name { ... }`
    fn view_declaration(&mut self) -> Rule<View> {
        self.attempt(|p| {
            p.keyword("def")?;
            p.skip_trivia();
            p.template_instance(false)
        })
    }

    /// A body holds elements or arguments, never both.
    fn children(&mut self) -> Rule<Vec<Node>> {
        if let Some(elements) = self.elements() {
            return Some(elements);
        }
        self.arguments()
    }

    fn elements(&mut self) -> Rule<Vec<Node>> {
        let mut nodes = Vec::new();
        push_coalesced(&mut nodes, self.element()?);
        while let Some(node) = self.attempt(|p| {
            p.skip_trivia();
            p.element()
        }) {
            push_coalesced(&mut nodes, node);
        }
        Some(nodes)
    }

    fn element(&mut self) -> Rule<Node> {
        if let Some(variable) = self.variable_statement() {
            return Some(Node::VariableStatement(variable));
        }
        if let Some(view) = self.view_declaration() {
            return Some(Node::ViewDeclaration(view));
        }
        if let Some(attribute) = self.attribute_statement() {
            return Some(Node::Attribute(attribute));
        }
        if let Some(view) = self.template_instance(true) {
            return Some(Node::View(view));
        }
        if self.profile == GrammarProfile::Markup {
            if let Some(html) = self.helper() {
                return Some(Node::Html(html));
            }
        }
        self.string_literal().map(Node::StringLiteral)
    }

    /// `<tag name attr="x"> ... </tag>`
    ///
    /// Outcomes are remembered per offset, so enclosing helpers scanning
    /// their content never re-parse a nested helper.
    fn helper(&mut self) -> Rule<Html> {
        let start = self.pos;
        if let Some(outcome) = self.helpers.get(&start).cloned() {
            let (html, end) = outcome?;
            self.pos = end;
            return Some(html);
        }
        let html = self.parse_helper();
        let outcome = html.clone().map(|html| (html, self.pos));
        self.helpers.insert(start, outcome);
        html
    }

    fn parse_helper(&mut self) -> Rule<Html> {
        self.attempt(|p| {
            let open = p.pos;
            p.literal("<")?;
            p.skip_trivia();
            let tag = p.identifier()?;
            p.skip_trivia();
            // A second identifier is the outlet name, unless it starts an attribute.
            let name = p.attempt(|p| {
                let name = p.identifier()?;
                let end = p.pos;
                p.skip_trivia();
                if p.peek("=") {
                    return None;
                }
                p.pos = end;
                Some(name)
            });
            p.skip_trivia();
            let attributes = p.attributes().unwrap_or_default();
            p.skip_trivia();
            p.literal(">")?;

            if !p.descend(open) {
                return None;
            }
            let children = p.helper_content();
            p.ascend();
            let children = children?;

            p.literal("</")?;
            p.skip_trivia();
            let closing_start = p.pos;
            let closing = p.identifier()?;
            if closing != tag {
                p.pos = closing_start;
                if p.reporting() {
                    p.fail(format!("{:?}", tag));
                }
                return None;
            }
            p.skip_trivia();
            p.literal(">")?;

            Some(Html {
                tag,
                name,
                attributes,
                children,
            })
        })
    }

    /// Raw text and nested helpers up to the next closing tag.
    fn helper_content(&mut self) -> Rule<Vec<Node>> {
        let mut children = Vec::new();
        let mut text = String::new();
        loop {
            if self.peek("</") {
                break;
            }
            if let Some(html) = self.helper() {
                if !text.is_empty() {
                    push_coalesced(
                        &mut children,
                        Node::StringLiteral(StringLiteral::from_escaped(&text)),
                    );
                    text.clear();
                }
                children.push(Node::Html(html));
                continue;
            }
            let Some(c) = self.current_char() else {
                self.fail("\"</\"");
                return None;
            };
            push_escaped(&mut text, c);
            self.bump(c);
        }
        if !text.is_empty() {
            push_coalesced(
                &mut children,
                Node::StringLiteral(StringLiteral::from_escaped(&text)),
            );
        }
        Some(children)
    }

    fn template(&mut self) -> Template {
        Template {
            nodes: self.elements().unwrap_or_default(),
        }
    }

    /// Builds the error for the furthest point the parse reached.
    fn syntax_error(mut self) -> SyntaxError {
        let offset = self.pos.max(self.rightmost);
        if self.pos > self.rightmost {
            self.expected.clear();
        }

        let mut expected: Vec<String> = self.expected.into_iter().map(Cow::into_owned).collect();
        expected.sort();
        expected.dedup();
        error_at(self.input, offset, expected)
    }
}

/// A [`SyntaxError`] at byte `offset` of `input`.
fn error_at(input: &str, offset: usize, expected: Vec<String>) -> SyntaxError {
    let consumed = input.get(..offset).unwrap_or_default();
    let (line, column) = line_and_column(consumed);

    SyntaxError {
        expected,
        found: input.get(offset..).and_then(|rest| rest.chars().next()),
        offset: consumed.chars().count(),
        line,
        column,
    }
}

/// 1-based line and column of the position just past `consumed`.
fn line_and_column(consumed: &str) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    let mut after_cr = false;
    for c in consumed.chars() {
        match c {
            '\n' if after_cr => {}
            '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                line += 1;
                column = 1;
            }
            _ => column += 1,
        }
        after_cr = c == '\r';
    }
    (line, column)
}

/// Parses `source` into a template and the identifiers it mentions.
///
/// # Errors
/// Returns a [`SyntaxError`] at the right-most position any alternative
/// reached if `source` does not match the grammar.
pub fn parse(source: &str, profile: GrammarProfile) -> Result<Parsed, SyntaxError> {
    let mut parser = Parser::new(source, profile);
    parser.skip_trivia();
    let template = parser.template();
    parser.skip_trivia();

    // Reported even when another alternative absorbed the deep body as text.
    if let Some(offset) = parser.too_deep {
        let error = error_at(
            source,
            offset,
            vec![format!("at most {} levels of nesting", MAX_NESTING)],
        );
        debug!(line = error.line, column = error.column, "template nested too deeply");
        return Err(error);
    }

    if parser.pos < source.len() {
        let error = parser.syntax_error();
        debug!(line = error.line, column = error.column, "syntax error");
        return Err(error);
    }

    debug!(
        nodes = template.nodes.len(),
        symbols = parser.symbols.len(),
        "parsed template"
    );
    Ok(Parsed {
        template,
        symbols: parser.symbols,
    })
}
