use tracing::trace;

use crate::{
    allocator::IdentifierAllocator,
    ast::{
        Argument, Attribute, AttributeKind, ConstructorName, Html, MAX_NESTING, Node,
        StringLiteral, Value, Variable, View,
    },
    error::{HectorError, HectorResult},
    fill::{Fields, Skeleton},
    options::{BodyStyle, Options},
    symbols::SymbolTable,
    target::{SkeletonKind, SkeletonSet},
};

/// Separator between members of a declared view type.
const MEMBER_SEPARATOR: &str = ",\n    ";

/// Runtime expression for a template variable.
fn evaluation(variable: &Variable) -> String {
    format!("scope.{}", variable.name)
}

/// `"Name";` marker emitted ahead of every construction.
fn breadcrumb(name: &str) -> String {
    format!("{};\n", StringLiteral::new(name).value)
}

/// Walks an AST and emits output code, one builder per node kind.
///
/// A generator belongs to a single compilation: it owns the identifier
/// allocator, and borrows the symbols read by the parser.
#[derive(Debug)]
pub struct Generator<'a> {
    skeletons: &'a SkeletonSet,
    options: &'a Options,
    symbols: &'a SymbolTable,
    allocator: IdentifierAllocator,
    /// Walks currently in progress
    depth: usize,
}

impl<'a> Generator<'a> {
    pub fn new(skeletons: &'a SkeletonSet, options: &'a Options, symbols: &'a SymbolTable) -> Self {
        Self {
            skeletons,
            options,
            symbols,
            allocator: IdentifierAllocator::new(),
            depth: 0,
        }
    }

    /// Emits `nodes` against the configured root context.
    ///
    /// # Errors
    /// Any error raised by a builder; no partial output is returned.
    pub fn generate(&mut self, nodes: &[Node]) -> HectorResult<String> {
        let root = self.options.root_context.clone();
        Ok(self.walk(nodes, &root)?.concat())
    }

    /// Dispatches every node against `context`, in document order.
    ///
    /// # Errors
    /// - [`HectorError::MissingContext`] if `context` is empty.
    /// - [`HectorError::NestingTooDeep`] past [`MAX_NESTING`] bodies below
    ///   the root.
    /// - Any error raised by a builder.
    pub fn walk(&mut self, nodes: &[Node], context: &str) -> HectorResult<Vec<String>> {
        if context.is_empty() {
            return Err(HectorError::MissingContext);
        }
        if self.depth > MAX_NESTING {
            return Err(HectorError::NestingTooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        let fragments: HectorResult<Vec<String>> = nodes
            .iter()
            .map(|node| self.dispatch(node, context))
            .collect();
        self.depth -= 1;
        fragments
    }

    /// Emits a single node.
    ///
    /// # Errors
    /// - [`HectorError::BuilderNotFound`] if the target has no skeleton the
    ///   node needs.
    /// - [`HectorError::InvalidNodeType`] if a value sits in a position that
    ///   does not accept it.
    pub fn dispatch(&mut self, node: &Node, context: &str) -> HectorResult<String> {
        trace!(node_type = node.type_name(), context, "dispatch");
        match node {
            Node::StringLiteral(literal) => self.text(literal, context),
            Node::Variable(variable) => self.variable(variable),
            Node::VariableStatement(variable) => self.variable_statement(variable, context),
            Node::Attribute(attribute) => {
                let separator = match attribute.kind {
                    AttributeKind::Statement => "",
                    AttributeKind::Declaration => MEMBER_SEPARATOR,
                };
                Ok(self.attribute(attribute, context)?.join(separator))
            }
            Node::Argument(argument) => self.argument(argument, context),
            Node::View(view) => self.view(view, context),
            Node::ViewDeclaration(view) => self.view_declaration(view),
            Node::Html(html) => self.html(html, context),
        }
    }

    fn skeleton(&self, kind: SkeletonKind) -> HectorResult<&'a Skeleton> {
        let skeletons: &'a SkeletonSet = self.skeletons;
        skeletons.get(kind)
    }

    /// Text in a body is echoed into the context.
    fn text(&self, literal: &StringLiteral, context: &str) -> HectorResult<String> {
        let mut fields = Fields::new();
        fields
            .insert("contextName", context)
            .insert("value", literal.value.as_str());
        Ok(format!("{};\n", self.skeleton(SkeletonKind::Echo)?.fill(&fields)?))
    }

    /// A variable as an expression, guarded when written `$name?`.
    fn variable(&self, variable: &Variable) -> HectorResult<String> {
        let value = evaluation(variable);
        let mut fields = Fields::new();
        fields
            .insert("value", value.as_str())
            .insert("evaluation", value.as_str())
            .insert("isConditional", variable.is_conditional);
        self.skeleton(SkeletonKind::Variable)?.fill(&fields)
    }

    fn variable_statement(&self, variable: &Variable, context: &str) -> HectorResult<String> {
        let value = evaluation(variable);

        let mut echo_fields = Fields::new();
        echo_fields
            .insert("contextName", context)
            .insert("value", value.as_str());
        let echo = self.skeleton(SkeletonKind::Echo)?.fill(&echo_fields)?;

        let mut fields = Fields::new();
        fields
            .insert("value", value.as_str())
            .insert("evaluation", echo)
            .insert("isConditional", variable.is_conditional);
        let mut output = self.skeleton(SkeletonKind::VariableStatement)?.fill(&fields)?;

        output.push_str(&self.hoisted(variable, AttributeKind::Statement, context)?.concat());
        Ok(output)
    }

    /// Attributes written after a variable, applied to `context`.
    fn hoisted(
        &self,
        variable: &Variable,
        kind: AttributeKind,
        context: &str,
    ) -> HectorResult<Vec<String>> {
        let mut fragments = Vec::new();
        for attribute in &variable.attributes {
            let attribute = Attribute {
                kind,
                ..attribute.clone()
            };
            fragments.extend(self.attribute(&attribute, context)?);
        }
        Ok(fragments)
    }

    /// A value in attribute or argument position.
    fn value(&self, value: &Value) -> HectorResult<String> {
        match value {
            Value::StringLiteral(literal) => Ok(literal.value.clone()),
            Value::Variable(variable) => self.variable(variable),
            Value::Identifier(name) => Ok(name.clone()),
            Value::View(_) => Err(HectorError::InvalidNodeType {
                expected: "StringLiteral, Variable or Identifier".to_string(),
                found: value.type_name().to_string(),
            }),
        }
    }

    fn fill_attribute(
        &self,
        kind: AttributeKind,
        key: &str,
        value: &str,
        context: &str,
    ) -> HectorResult<String> {
        let skeleton = match kind {
            AttributeKind::Statement => SkeletonKind::AttributeStatement,
            AttributeKind::Declaration => SkeletonKind::AttributeDeclaration,
        };
        let mut fields = Fields::new();
        fields
            .insert("key", key)
            .insert("value", value)
            .insert("contextName", context);
        self.skeleton(skeleton)?.fill(&fields)
    }

    /// The attribute itself followed by any attributes hoisted from its value.
    fn attribute(&self, attribute: &Attribute, context: &str) -> HectorResult<Vec<String>> {
        let value = self.value(&attribute.value)?;
        let mut fragments = vec![self.fill_attribute(attribute.kind, &attribute.key, &value, context)?];
        if let Value::Variable(variable) = &attribute.value {
            fragments.extend(self.hoisted(variable, attribute.kind, context)?);
        }
        Ok(fragments)
    }

    /// Assigns into the incoming data of the instance named by `context`.
    fn argument(&mut self, argument: &Argument, context: &str) -> HectorResult<String> {
        let value = match &argument.value {
            Value::View(view) => self.inline_view(view)?,
            Value::StringLiteral(_) | Value::Variable(_) | Value::Identifier(_) => {
                self.value(&argument.value)?
            }
        };

        let mut fields = Fields::new();
        fields
            .insert("contextName", context)
            .insert("key", argument.key.as_str())
            .insert("value", value);
        let mut output = self.skeleton(SkeletonKind::Argument)?.fill(&fields)?;

        if let Value::Variable(variable) = &argument.value {
            output.push_str(&self.hoisted(variable, AttributeKind::Statement, context)?.concat());
        }
        Ok(output)
    }

    fn constructor_expression(constructor: &ConstructorName) -> (String, bool, bool) {
        match constructor {
            ConstructorName::Identifier(name) => (name.clone(), false, false),
            ConstructorName::Variable(variable) => (evaluation(variable), true, variable.is_conditional),
        }
    }

    /// Children, then attributes, then attributes hoisted from a dynamic
    /// constructor, all against the new instance.
    fn instance_body(
        &mut self,
        constructor: &ConstructorName,
        attributes: &[Attribute],
        children: &[Node],
        var_name: &str,
    ) -> HectorResult<String> {
        let mut inner = self.walk(children, var_name)?.concat();
        for attribute in attributes {
            let attribute = Attribute {
                kind: AttributeKind::Statement,
                ..attribute.clone()
            };
            inner.push_str(&self.attribute(&attribute, var_name)?.concat());
        }
        if let ConstructorName::Variable(variable) = constructor {
            inner.push_str(&self.hoisted(variable, AttributeKind::Statement, var_name)?.concat());
        }
        Ok(inner)
    }

    /// Constructs an instance and appends it onto `context`, returning the
    /// output and the instance's name.
    fn instance(
        &mut self,
        constructor: &ConstructorName,
        attributes: &[Attribute],
        children: &[Node],
        context: &str,
    ) -> HectorResult<(String, String)> {
        let var_name = self.allocator.create(self.symbols);
        let inner = self.instance_body(constructor, attributes, children, &var_name)?;
        let (constructor_name, is_dynamic, is_conditional) = Self::constructor_expression(constructor);

        let mut fields = Fields::new();
        fields
            .insert("contextName", context)
            .insert("varName", var_name.as_str())
            .insert("constructorName", constructor_name)
            .insert("elementConstructor", self.options.element_constructor.as_str())
            .insert("inner", inner)
            .insert("isDynamic", is_dynamic)
            .insert("isConditional", is_conditional);

        let mut output = breadcrumb(constructor.name());
        output.push_str(&self.skeleton(SkeletonKind::View)?.fill(&fields)?);
        Ok((output, var_name))
    }

    fn view(&mut self, view: &View, context: &str) -> HectorResult<String> {
        let (output, _) = self.instance(&view.constructor, &view.attributes, &view.children, context)?;
        Ok(output)
    }

    /// A view in argument position: a bare constructor reference, or a
    /// construction expression when it carries attributes.
    fn inline_view(&mut self, view: &View) -> HectorResult<String> {
        let has_hoisted = match &view.constructor {
            ConstructorName::Identifier(_) => false,
            ConstructorName::Variable(variable) => !variable.attributes.is_empty(),
        };
        if view.attributes.is_empty() && view.children.is_empty() && !has_hoisted {
            return match &view.constructor {
                ConstructorName::Identifier(name) => Ok(name.clone()),
                ConstructorName::Variable(variable) => self.variable(variable),
            };
        }

        let var_name = self.allocator.create(self.symbols);
        let inner = self.instance_body(&view.constructor, &view.attributes, &view.children, &var_name)?;
        let (constructor_name, is_dynamic, is_conditional) =
            Self::constructor_expression(&view.constructor);

        let mut fields = Fields::new();
        fields
            .insert("varName", var_name.as_str())
            .insert("constructorName", constructor_name)
            .insert("elementConstructor", self.options.element_constructor.as_str())
            .insert("inner", inner)
            .insert("isDynamic", is_dynamic)
            .insert("isConditional", is_conditional);
        self.skeleton(SkeletonKind::InlineView)?.fill(&fields)
    }

    /// A markup helper: an element construction, plus an outlet property on
    /// `context` when the helper is named.
    fn html(&mut self, html: &Html, context: &str) -> HectorResult<String> {
        let constructor = ConstructorName::Identifier(html.tag.clone());
        let (mut output, var_name) =
            self.instance(&constructor, &html.attributes, &html.children, context)?;
        if let Some(name) = &html.name {
            output.push_str(&self.fill_attribute(AttributeKind::Statement, name, &var_name, context)?);
        }
        Ok(output)
    }

    /// Runs `body` with a fresh identifier scope, restoring the enclosing
    /// scope whether or not `body` succeeds.
    fn in_declaration_scope<T, F>(&mut self, body: F) -> HectorResult<T>
    where
        F: FnOnce(&mut Self) -> HectorResult<T>,
    {
        self.allocator.save();
        let result = body(self);
        let restored = self.allocator.restore();
        debug_assert!(restored, "declaration scope closed without being opened");
        result
    }

    fn view_declaration(&mut self, view: &View) -> HectorResult<String> {
        let name = match &view.constructor {
            ConstructorName::Identifier(name) => name,
            ConstructorName::Variable(_) => {
                return Err(HectorError::InvalidNodeType {
                    expected: "Identifier".to_string(),
                    found: "Variable".to_string(),
                });
            }
        };

        self.in_declaration_scope(|generator| {
            let root = generator.options.root_context.clone();

            let mut members = Vec::new();
            for attribute in &view.attributes {
                let attribute = Attribute {
                    kind: AttributeKind::Declaration,
                    ..attribute.clone()
                };
                members.extend(generator.attribute(&attribute, &root)?);
            }

            let mut body = breadcrumb(name);
            body.push_str(&generator.walk(&view.children, &root)?.concat());
            let template = match generator.options.declaration_body {
                BodyStyle::String => StringLiteral::new(&body).value,
                BodyStyle::Function => format!("function (scope) {{\n{}}}", body),
            };
            members.push(generator.fill_attribute(
                AttributeKind::Declaration,
                "template",
                &template,
                &root,
            )?);

            let mut fields = Fields::new();
            fields
                .insert("namespace", generator.options.namespace.as_str())
                .insert("constructorName", name.as_str())
                .insert("members", members.join(MEMBER_SEPARATOR));
            generator.skeleton(SkeletonKind::ViewDeclaration)?.fill(&fields)
        })
    }

    #[cfg(test)]
    fn scope_depth(&self) -> usize {
        self.allocator.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::GrammarProfile, parser::parse, target::Target};

    fn generate_with(source: &str, options: &Options) -> HectorResult<String> {
        let parsed = parse(source, options.profile)?;
        let skeletons = SkeletonSet::for_target(&options.target)?;
        Generator::new(&skeletons, options, &parsed.symbols).generate(&parsed.template.nodes)
    }

    fn generate(source: &str) -> String {
        generate_with(source, &Options::default()).unwrap()
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_text_is_echoed() {
        assert_eq!(generate("\"hi\""), "Hector.echo.call(this, \"hi\");\n");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_variable_statement_plain_and_guarded() {
        assert_eq!(generate("$name;"), "Hector.echo.call(this, scope.name);\n");
        assert_eq!(
            generate("$name?;"),
            "if (typeof scope.name !== \"undefined\") {\n    Hector.echo.call(this, scope.name);\n}\n"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_void_view() {
        assert_eq!(
            generate("Label title = \"x\";"),
            "\"Label\";\n\
             var a = (typeof Label !== \"undefined\")\n    ? new Label()\n    : new HectorOptions.elementConstructor(\"Label\");\n\
             a.title = \"x\";\n\
             this.appendChild(a);\n"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_children_use_the_new_context() {
        let output = generate("Panel { \"x\" Label; }");
        assert!(output.contains("Hector.echo.call(a, \"x\");"));
        assert!(output.contains("var b = (typeof Label"));
        assert!(output.contains("a.appendChild(b);"));
        assert!(output.ends_with("this.appendChild(a);\n"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_allocation_skips_template_symbols() {
        let output = generate("a { b; }");
        assert!(output.contains("var c = "));
        assert!(output.contains("var d = "));
        assert!(!output.contains("var a = "));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_dynamic_conditional_constructor() {
        let output = generate("$widget? title = \"t\" { }");
        assert!(output.contains("if (typeof scope.widget !== \"undefined\") {"));
        assert!(output.contains("var a = new scope.widget();"));
        assert!(output.contains("a.title = \"t\";"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_arguments_assign_into_context() {
        let output = generate("Label { text: $greeting; icon: Icon; }");
        assert!(output.contains("a.context.text = scope.greeting;\n"));
        assert!(output.contains("a.context.icon = Icon;\n"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_inline_view_with_attributes() {
        let output = generate("Label { icon: Icon size = \"s\"; }");
        assert!(output.contains("a.context.icon = (function () {\nvar b = (typeof Icon"));
        assert!(output.contains("b.size = \"s\";\n    return b;\n})();"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_variable_attributes_are_hoisted() {
        let output = generate("Label title = $t color = \"red\";");
        assert!(output.contains("a.title = scope.t;\n"));
        assert!(output.contains("a.color = \"red\";\n"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_view_declaration_string_body() {
        let output = generate("def Card title = \"c\" { \"x\" };");
        assert_eq!(
            output,
            "window.Card = Backbone.View.extend({\n    \
             title: \"c\",\n    \
             template: \"\\\"Card\\\";\\nHector.echo.call(this, \\\"x\\\");\\n\"\n\
             });\n"
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_view_declaration_function_body() {
        let options = Options::default()
            .with_declaration_body(BodyStyle::Function)
            .with_namespace("App");
        let output = generate_with("def Card { $x; }", &options).unwrap();
        assert!(output.starts_with("App.Card = Backbone.View.extend({\n"));
        assert!(output.contains(
            "template: function (scope) {\n\"Card\";\nHector.echo.call(this, scope.x);\n}"
        ));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_declarations_restart_identifiers() {
        let options = Options::default().with_declaration_body(BodyStyle::Function);
        let output = generate_with("X; def A { Y; }; Z;", &options).unwrap();
        assert!(output.contains("var a = (typeof X"));
        assert!(output.contains("var a = (typeof Y"));
        assert!(output.contains("var b = (typeof Z"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_scope_is_restored_on_error() {
        let mut sources = std::collections::BTreeMap::new();
        sources.insert(SkeletonKind::Echo, "echo($value)".to_string());
        let options = Options::default().with_target(Target::Custom(sources));
        let skeletons = SkeletonSet::for_target(&options.target).unwrap();
        let parsed = parse("def A { B; }", GrammarProfile::Statement).unwrap();

        let mut generator = Generator::new(&skeletons, &options, &parsed.symbols);
        let err = generator.generate(&parsed.template.nodes).unwrap_err();
        assert_eq!(
            err,
            HectorError::BuilderNotFound {
                node_type: "View".to_string()
            }
        );
        assert_eq!(generator.scope_depth(), 0);
    }

    fn nested(depth: usize) -> View {
        let mut view = View::new("A");
        for _ in 1..depth {
            let mut parent = View::new("A");
            parent.children = vec![Node::View(view)];
            view = parent;
        }
        view
    }

    #[test]
    #[ntest::timeout(1000)]
    fn test_walk_depth_is_bounded() {
        let skeletons = SkeletonSet::for_target(&Target::Hector).unwrap();
        let options = Options::default();
        let symbols = SymbolTable::new();
        let mut generator = Generator::new(&skeletons, &options, &symbols);

        let output = generator
            .generate(&[Node::View(nested(MAX_NESTING))])
            .unwrap();
        assert_eq!(output.matches("appendChild").count(), MAX_NESTING);

        assert_eq!(
            generator.generate(&[Node::View(nested(MAX_NESTING + 1))]),
            Err(HectorError::NestingTooDeep { limit: MAX_NESTING })
        );

        // The failed walk leaves the generator usable
        assert!(generator.generate(&[Node::View(View::new("B"))]).is_ok());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_missing_context() {
        let options = Options::default().with_root_context("");
        assert_eq!(generate_with("Label;", &options), Err(HectorError::MissingContext));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_view_attribute_value_is_invalid() {
        let skeletons = SkeletonSet::for_target(&Target::Hector).unwrap();
        let options = Options::default();
        let symbols = SymbolTable::new();
        let mut view = View::new("Label");
        view.attributes = vec![Attribute::new("icon", Value::View(Box::new(View::new("Icon"))))];

        let err = Generator::new(&skeletons, &options, &symbols)
            .dispatch(&Node::View(view), "this")
            .unwrap_err();
        assert_eq!(
            err,
            HectorError::InvalidNodeType {
                expected: "StringLiteral, Variable or Identifier".to_string(),
                found: "View".to_string(),
            }
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_declaration_needs_identifier() {
        let skeletons = SkeletonSet::for_target(&Target::Hector).unwrap();
        let options = Options::default();
        let symbols = SymbolTable::new();
        let view = View {
            constructor: ConstructorName::Variable(Variable::new("x")),
            attributes: Vec::new(),
            children: Vec::new(),
        };
        let err = Generator::new(&skeletons, &options, &symbols)
            .dispatch(&Node::ViewDeclaration(view), "this")
            .unwrap_err();
        assert!(matches!(err, HectorError::InvalidNodeType { .. }));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_markup_helper_with_outlet() {
        let options = Options::default().with_profile(GrammarProfile::Markup);
        let output = generate_with("<ul items>x</ul>", &options).unwrap();
        assert!(output.contains("new HectorOptions.elementConstructor(\"ul\")"));
        assert!(output.contains("Hector.echo.call(a, \"x\");"));
        assert!(output.ends_with("this.appendChild(a);\nthis.items = a;\n"));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_backbone_target() {
        let options = Options::default().with_target(Target::Backbone);
        let output = generate_with("def Card { Label title = \"t\"; }", &options).unwrap();
        assert!(output.starts_with("window.Card = Hector.Backbone.View.extend({"));
        assert!(output.contains("Hector.Backbone.setAttribute(\\\"title\\\", \\\"t\\\", a);"));
        assert!(output.contains("this.$el.append(a.el);"));
    }
}
