use std::collections::BTreeMap;

use crate::{
    error::{HectorError, HectorResult, ParseError},
    fill::Skeleton,
};

/// One snippet of output code a builder fills in.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkeletonKind {
    /// Appends an evaluated value onto a context.
    Echo,
    /// A variable used as an expression.
    Variable,
    /// A variable echoed as a statement.
    VariableStatement,
    AttributeStatement,
    AttributeDeclaration,
    Argument,
    /// Construction of a view appended onto its context.
    View,
    /// Construction of a view as an expression.
    InlineView,
    ViewDeclaration,
}

impl SkeletonKind {
    pub const ALL: [Self; 9] = [
        Self::Echo,
        Self::Variable,
        Self::VariableStatement,
        Self::AttributeStatement,
        Self::AttributeDeclaration,
        Self::Argument,
        Self::View,
        Self::InlineView,
        Self::ViewDeclaration,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Echo => "Echo",
            Self::Variable => "Variable",
            Self::VariableStatement => "VariableStatement",
            Self::AttributeStatement => "AttributeStatement",
            Self::AttributeDeclaration => "AttributeDeclaration",
            Self::Argument => "Argument",
            Self::View => "View",
            Self::InlineView => "InlineView",
            Self::ViewDeclaration => "ViewDeclaration",
        }
    }
}

const ECHO: &str = "Hector.echo.call($contextName, $value)";

const VARIABLE: &str = "<% if (isConditional) { %>\
(typeof $value !== \"undefined\" ? $evaluation : undefined)\
<% } else { %>$evaluation<% } %>";

const VARIABLE_STATEMENT: &str = "<% if (isConditional) { %>\
if (typeof $value !== \"undefined\") {
    $evaluation;
}
<% } else { %>$evaluation;
<% } %>";

const ATTRIBUTE_STATEMENT: &str = "$contextName.$key = $value;\n";

const ATTRIBUTE_DECLARATION: &str = "$key: $value";

const ARGUMENT: &str = "$contextName.context.$key = $value;\n";

const VIEW: &str = "<% if (isDynamic) { %><% if (isConditional) { %>\
if (typeof $constructorName !== \"undefined\") {
var $varName = new $constructorName();
$inner$contextName.appendChild($varName);
}
<% } else { %>var $varName = new $constructorName();
$inner$contextName.appendChild($varName);
<% } %><% } else { %>var $varName = (typeof $constructorName !== \"undefined\")
    ? new $constructorName()
    : new $elementConstructor(\"$constructorName\");
$inner$contextName.appendChild($varName);
<% } %>";

const INLINE_VIEW: &str = "<% if (isConditional) { %>\
(typeof $constructorName !== \"undefined\" ? <% } %>(function () {
var $varName = <% if (isDynamic) { %>new $constructorName()<% } else { %>\
(typeof $constructorName !== \"undefined\")
    ? new $constructorName()
    : new $elementConstructor(\"$constructorName\")<% } %>;
$inner    return $varName;
})()<% if (isConditional) { %> : undefined)<% } %>";

const VIEW_DECLARATION: &str = "$namespace.$constructorName = Backbone.View.extend({
    $members
});
";

const BACKBONE_ATTRIBUTE_STATEMENT: &str =
    "Hector.Backbone.setAttribute(\"$key\", $value, $contextName);\n";

const BACKBONE_VIEW: &str = "<% if (isDynamic) { %><% if (isConditional) { %>\
if (typeof $constructorName !== \"undefined\") {
var $varName = new $constructorName();
$inner$contextName.$el.append($varName.el);
}
<% } else { %>var $varName = new $constructorName();
$inner$contextName.$el.append($varName.el);
<% } %><% } else { %>var $varName = (typeof $constructorName !== \"undefined\")
    ? new $constructorName()
    : new $elementConstructor(\"$constructorName\");
$inner$contextName.$el.append($varName.el);
<% } %>";

const BACKBONE_VIEW_DECLARATION: &str =
    "$namespace.$constructorName = Hector.Backbone.View.extend({
    $members
});
";

const fn hector_source(kind: SkeletonKind) -> &'static str {
    match kind {
        SkeletonKind::Echo => ECHO,
        SkeletonKind::Variable => VARIABLE,
        SkeletonKind::VariableStatement => VARIABLE_STATEMENT,
        SkeletonKind::AttributeStatement => ATTRIBUTE_STATEMENT,
        SkeletonKind::AttributeDeclaration => ATTRIBUTE_DECLARATION,
        SkeletonKind::Argument => ARGUMENT,
        SkeletonKind::View => VIEW,
        SkeletonKind::InlineView => INLINE_VIEW,
        SkeletonKind::ViewDeclaration => VIEW_DECLARATION,
    }
}

const fn backbone_source(kind: SkeletonKind) -> &'static str {
    match kind {
        SkeletonKind::AttributeStatement => BACKBONE_ATTRIBUTE_STATEMENT,
        SkeletonKind::View => BACKBONE_VIEW,
        SkeletonKind::ViewDeclaration => BACKBONE_VIEW_DECLARATION,
        SkeletonKind::Echo
        | SkeletonKind::Variable
        | SkeletonKind::VariableStatement
        | SkeletonKind::AttributeDeclaration
        | SkeletonKind::Argument
        | SkeletonKind::InlineView => hector_source(kind),
    }
}

/// The runtime the generated code is written against.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Target {
    /// The standalone Hector runtime (`javascript/hector`).
    #[default]
    Hector,
    /// Hector on top of Backbone views (`javascript/backbone`).
    Backbone,
    /// Caller supplied skeletons. Kinds left out raise
    /// [`HectorError::BuilderNotFound`] when a node needs them.
    Custom(BTreeMap<SkeletonKind, String>),
}

impl Target {
    /// Looks up a built-in target by its runtime name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "javascript/hector" => Some(Self::Hector),
            "javascript/backbone" => Some(Self::Backbone),
            _ => None,
        }
    }

    /// Skeleton text for `kind`, if this target provides one.
    pub fn source(&self, kind: SkeletonKind) -> Option<&str> {
        match self {
            Self::Hector => Some(hector_source(kind)),
            Self::Backbone => Some(backbone_source(kind)),
            Self::Custom(sources) => sources.get(&kind).map(String::as_str),
        }
    }
}

/// A target's skeletons, parsed once up front.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkeletonSet {
    skeletons: BTreeMap<SkeletonKind, Skeleton>,
}

impl SkeletonSet {
    /// # Errors
    /// Returns the first skeleton that fails to parse.
    pub fn for_target(target: &Target) -> Result<Self, ParseError> {
        let mut skeletons = BTreeMap::new();
        for kind in SkeletonKind::ALL {
            if let Some(source) = target.source(kind) {
                skeletons.insert(kind, Skeleton::parse(source)?);
            }
        }
        Ok(Self { skeletons })
    }

    /// # Errors
    /// [`HectorError::BuilderNotFound`] if the target has no skeleton for `kind`.
    pub fn get(&self, kind: SkeletonKind) -> HectorResult<&Skeleton> {
        self.skeletons
            .get(&kind)
            .ok_or_else(|| HectorError::BuilderNotFound {
                node_type: kind.name().to_string(),
            })
    }

    pub fn contains(&self, kind: SkeletonKind) -> bool {
        self.skeletons.contains_key(&kind)
    }
}
