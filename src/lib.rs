mod allocator;
mod ast;
mod builders;
mod compiler;
mod error;
mod fill;
mod options;
mod parser;
mod symbols;
mod target;

// Public exports.
pub use allocator::{IdentifierAllocator, identifier_for};
pub use ast::{
    Argument, Attribute, AttributeKind, ConstructorName, Html, MAX_NESTING, Node, StringLiteral,
    Template, Value, Variable, View,
};
pub use builders::Generator;
pub use compiler::Compiler;
pub use error::{HectorError, HectorResult, ParseError, ParseErrorKind, SyntaxError};
pub use fill::{Field, Fields, Skeleton, fill};
pub use options::{BodyStyle, GrammarProfile, Options};
pub use parser::Parsed;
pub use symbols::SymbolTable;
pub use target::{SkeletonKind, SkeletonSet, Target};

/// Compiles `source` with the default options.
///
/// # Errors
/// See [`Compiler::compile`].
pub fn compile(source: &str) -> HectorResult<String> {
    Compiler::new(Options::default())?.compile(source)
}

/// Parses `source` with the given grammar profile.
///
/// # Errors
/// [`HectorError::Syntax`] if `source` does not match the grammar.
pub fn parse(source: &str, profile: GrammarProfile) -> HectorResult<Parsed> {
    Ok(parser::parse(source, profile)?)
}
