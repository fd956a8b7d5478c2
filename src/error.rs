//! Error and diagnostic types.

use thiserror::Error;

/// An advisory problem found while converting a document.
///
/// Diagnostics never stop a conversion; they are collected in discovery order on the
/// [ParseResult][crate::ParseResult] next to the HTML that was produced anyway.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The parent restricts its children and `child` is not among them.
    #[error("tag {child} not allowed as child of {parent}")]
    ChildNotAllowed { parent: String, child: String },

    /// The child restricts its parents and `parent` is not among them.
    #[error("tag {parent} not allowed as parent of {child}")]
    ParentNotAllowed { parent: String, child: String },

    /// Bracket characters survived rendering, so some delimiters never found a partner.
    #[error("tags appear misaligned")]
    Misaligned,
}

/// Errors raised when building or extending a [TagRegistry][crate::TagRegistry].
#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    /// Tag names must be ASCII alphanumeric/underscore, or exactly `*`.
    #[error("invalid tag name: {0:?}")]
    InvalidTagName(String),

    /// The delimiter pattern derived from the tag names could not be compiled.
    #[error("failed to build delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),
}
