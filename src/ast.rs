/// Deepest nesting of bodies the parser accepts and the generator walks.
pub const MAX_NESTING: usize = 128;

/// A parsed template: the root elements in document order.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Text. Verbatim in value position, echoed in body position.
    StringLiteral(StringLiteral),
    /// A variable reference used as an expression.
    Variable(Variable),
    /// `$name;` - the value is echoed into the current context.
    VariableStatement(Variable),
    Attribute(Attribute),
    Argument(Argument),
    View(View),
    /// `def Name { ... }` - declares a new view type.
    ViewDeclaration(View),
    /// `<tag>...</tag>`, only produced by the markup grammar profile.
    Html(Html),
}

impl Node {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::StringLiteral(_) => "StringLiteral",
            Self::Variable(_) => "Variable",
            Self::VariableStatement(_) => "VariableStatement",
            Self::Attribute(attribute) => attribute.kind.type_name(),
            Self::Argument(_) => "Argument",
            Self::View(_) => "View",
            Self::ViewDeclaration(_) => "ViewDeclaration",
            Self::Html(_) => "Html",
        }
    }
}

/// A string literal, normalised to a double-quoted output-language literal.
///
/// `value` always carries the surrounding quotes and is already escaped, so
/// builders can emit it as-is.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringLiteral {
    pub value: String,
}

impl StringLiteral {
    /// Builds a literal from raw text, escaping it.
    pub fn new(text: &str) -> Self {
        let mut body = String::with_capacity(text.len());
        for c in text.chars() {
            push_escaped(&mut body, c);
        }
        Self::from_escaped(&body)
    }

    /// Wraps an already escaped body in quotes.
    pub(crate) fn from_escaped(body: &str) -> Self {
        Self {
            value: format!("\"{}\"", body),
        }
    }

    /// The escaped text between the quotes.
    pub fn body(&self) -> &str {
        self.value
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(&self.value)
    }

    /// Appends another literal's text onto this one.
    pub fn extend(&mut self, other: &Self) {
        self.value = format!("\"{}{}\"", self.body(), other.body());
    }
}

/// Escapes a single character for a double-quoted output literal.
pub(crate) fn push_escaped(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{8}' => out.push_str("\\b"),
        '\u{b}' => out.push_str("\\v"),
        '\u{c}' => out.push_str("\\f"),
        '\u{2028}' => out.push_str("\\u2028"),
        '\u{2029}' => out.push_str("\\u2029"),
        c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
        c => out.push(c),
    }
}

/// `$name`, or `$name?` for existence-guarded access.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub is_conditional: bool,
    /// Attributes written directly after the reference.
    pub attributes: Vec<Attribute>,
}

impl Variable {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            is_conditional: false,
            attributes: Vec::new(),
        }
    }

    pub fn conditional<N: Into<String>>(name: N) -> Self {
        Self {
            is_conditional: true,
            ..Self::new(name)
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Assigned onto an instance at construction time.
    Statement,
    /// A member of a declared view type.
    Declaration,
}

impl AttributeKind {
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Statement => "AttributeStatement",
            Self::Declaration => "AttributeDeclaration",
        }
    }
}

/// `key.path = value`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub kind: AttributeKind,
    /// Dotted property path.
    pub key: String,
    pub value: Value,
}

impl Attribute {
    pub fn new<K: Into<String>>(key: K, value: Value) -> Self {
        Self {
            kind: AttributeKind::Statement,
            key: key.into(),
            value,
        }
    }
}

/// `key: value;` - populates the incoming data context of an instance.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub key: String,
    pub value: Value,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    StringLiteral(StringLiteral),
    Variable(Variable),
    /// A bare identifier, referenced as-is in the output.
    Identifier(String),
    /// Single-line instantiation; only valid as an argument value.
    View(Box<View>),
}

impl Value {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::StringLiteral(_) => "StringLiteral",
            Self::Variable(_) => "Variable",
            Self::Identifier(_) => "Identifier",
            Self::View(_) => "View",
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorName {
    /// A (possibly dotted) view or element name.
    Identifier(String),
    /// Resolved at runtime.
    Variable(Variable),
}

impl ConstructorName {
    pub fn name(&self) -> &str {
        match self {
            Self::Identifier(name) => name,
            Self::Variable(variable) => &variable.name,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub constructor: ConstructorName,
    pub attributes: Vec<Attribute>,
    /// Either elements or arguments, never both.
    pub children: Vec<Node>,
}

impl View {
    pub fn new<N: Into<String>>(constructor: N) -> Self {
        Self {
            constructor: ConstructorName::Identifier(constructor.into()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Html {
    pub tag: String,
    /// Outlet property assigned on the enclosing context.
    pub name: Option<String>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

/// Appends `node`, merging it into the previous child when both are text.
pub(crate) fn push_coalesced(nodes: &mut Vec<Node>, node: Node) {
    if let Node::StringLiteral(text) = &node {
        if let Some(Node::StringLiteral(previous)) = nodes.last_mut() {
            previous.extend(text);
            return;
        }
    }
    nodes.push(node);
}
