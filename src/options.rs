use crate::target::Target;

/// Which surface syntax the parser accepts.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum GrammarProfile {
    /// `Name attr = "x";` and `Name { ... }` only.
    #[default]
    Statement,
    /// Statement syntax plus `<tag name attr="x">...</tag>` helpers.
    Markup,
}

/// How a declared view's body is attached to its type.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BodyStyle {
    /// An escaped string literal, compiled by the runtime on first use.
    #[default]
    String,
    /// A `function (scope) { ... }` literal.
    Function,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub target: Target,
    pub profile: GrammarProfile,
    /// Object declared view types are attached to.
    pub namespace: String,
    /// Context name used for the root walk and for declaration bodies.
    pub root_context: String,
    /// Expression constructing a generic element from a tag name.
    pub element_constructor: String,
    pub declaration_body: BodyStyle,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            target: Target::default(),
            profile: GrammarProfile::default(),
            namespace: "window".to_string(),
            root_context: "this".to_string(),
            element_constructor: "HectorOptions.elementConstructor".to_string(),
            declaration_body: BodyStyle::default(),
        }
    }
}

impl Options {
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_profile(mut self, profile: GrammarProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_namespace<N: Into<String>>(mut self, namespace: N) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_root_context<N: Into<String>>(mut self, root_context: N) -> Self {
        self.root_context = root_context.into();
        self
    }

    pub fn with_declaration_body(mut self, style: BodyStyle) -> Self {
        self.declaration_body = style;
        self
    }
}
