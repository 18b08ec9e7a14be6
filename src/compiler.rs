use tracing::{debug, instrument};

use crate::{
    ast::Template,
    builders::Generator,
    error::HectorResult,
    options::Options,
    parser::{self, Parsed},
    symbols::SymbolTable,
    target::SkeletonSet,
};

/// `Compiler` turns Hector templates into code for the configured target.
///
/// Skeletons are parsed once when the compiler is built. Every call to
/// [`compile`](Self::compile) gets its own symbol table and identifier
/// allocator, so one compiler can be shared between independent compilations.
///
/// # Examples
///
/// ```
/// use hector::{Compiler, Options};
///
/// let compiler = Compiler::new(Options::default()).unwrap();
/// let output = compiler.compile("Label text = \"hi\";").unwrap();
///
/// assert!(output.starts_with("\"Label\";\n"));
/// assert!(output.contains("a.text = \"hi\";"));
/// assert!(output.ends_with("this.appendChild(a);\n"));
/// ```
#[derive(Debug, Clone)]
pub struct Compiler {
    options: Options,
    skeletons: SkeletonSet,
}

impl Compiler {
    /// # Errors
    /// [`HectorError::Skeleton`](crate::HectorError::Skeleton) if a skeleton of
    /// the configured target is malformed.
    pub fn new(options: Options) -> HectorResult<Self> {
        let skeletons = SkeletonSet::for_target(&options.target)?;
        Ok(Self { options, skeletons })
    }

    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Parses `source` with the configured grammar profile.
    ///
    /// # Errors
    /// [`HectorError::Syntax`](crate::HectorError::Syntax) if `source` does not
    /// match the grammar.
    pub fn parse(&self, source: &str) -> HectorResult<Parsed> {
        Ok(parser::parse(source, self.options.profile)?)
    }

    /// Emits code for an already parsed template.
    ///
    /// # Errors
    /// Any generation error; see [`Generator::dispatch`].
    pub fn generate(&self, template: &Template, symbols: &SymbolTable) -> HectorResult<String> {
        let mut generator = Generator::new(&self.skeletons, &self.options, symbols);
        let output = generator.generate(&template.nodes)?;
        debug!(bytes = output.len(), "generated output");
        Ok(output)
    }

    /// Parses and generates in one step. Empty input yields empty output.
    ///
    /// # Errors
    /// The first syntax or generation error; output is never partial.
    #[instrument(level = "debug", skip_all, fields(source_len = source.len()))]
    pub fn compile(&self, source: &str) -> HectorResult<String> {
        if source.is_empty() {
            return Ok(String::new());
        }
        let parsed = self.parse(source)?;
        self.generate(&parsed.template, &parsed.symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::HectorError, options::GrammarProfile, target::Target};

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_source() {
        let compiler = Compiler::new(Options::default()).unwrap();
        assert_eq!(compiler.compile("").unwrap(), "");
        assert_eq!(compiler.compile(" \n// only a comment\n").unwrap(), "");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_compile_is_repeatable() {
        let compiler = Compiler::new(Options::default()).unwrap();
        let source = "Panel { Label; Label; }";
        let first = compiler.compile(source).unwrap();
        assert_eq!(compiler.compile(source).unwrap(), first);
        assert!(first.contains("var a = "));
        assert!(first.contains("var c = "));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_syntax_error_is_wrapped() {
        let compiler = Compiler::new(Options::default()).unwrap();
        let err = compiler.compile("Label {").unwrap_err();
        assert!(matches!(err, HectorError::Syntax(_)));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_profile_is_applied() {
        let markup = Compiler::new(Options::default().with_profile(GrammarProfile::Markup)).unwrap();
        assert!(markup.compile("<p>hi</p>").is_ok());
        let statement = Compiler::new(Options::default()).unwrap();
        assert!(statement.compile("<p>hi</p>").is_err());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_malformed_custom_target() {
        let mut sources = std::collections::BTreeMap::new();
        sources.insert(crate::target::SkeletonKind::Echo, "<% else %>".to_string());
        let err = Compiler::new(Options::default().with_target(Target::Custom(sources))).unwrap_err();
        assert!(matches!(err, HectorError::Skeleton(_)));
    }
}
