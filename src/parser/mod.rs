use std::borrow::Cow;

use bitflags::bitflags;

use crate::registry::TagRegistry;

use self::rules::{ListItemRule, NoParseRule, TokenRule};

pub use self::tree::{Document, Item, Node, NodeId};

/// Options for a single conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    pub feature_flags: ParserFeature,
}

impl ParserConfig {
    pub fn new(feature_flags: ParserFeature) -> Self {
        Self { feature_flags }
    }
}

bitflags! {
    /// Post-processing applied to the rendered HTML.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ParserFeature: u32 {
        /// Strip any bracketed run left over from delimiters that never found a partner.
        const REMOVE_MISALIGNED = 1 << 0;
        /// Wrap the output in a block that preserves whitespace and line breaks.
        const ADD_LINE_BREAKS = 1 << 1;
        /// Keep stray brackets as `&#91;`/`&#93;` entities instead of decoding them.
        const ESCAPE_HTML = 1 << 2;
    }
}

pub(crate) mod normalize;
pub(crate) mod rules;
mod tree;

/// Turns BBCode text into a depth-annotated [Document], using the tags of a registry.
#[doc(alias = "parser")]
#[derive(Clone, Copy, Debug)]
pub struct BBParser<'r> {
    registry: &'r TagRegistry,
}

impl<'r> BBParser<'r> {
    pub fn new(registry: &'r TagRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r TagRegistry {
        self.registry
    }

    /// Parse the given input.
    /// # Remarks
    /// Parsing never fails. Delimiters that cannot be paired are kept as [Item::Raw] text.
    pub fn parse(&self, input: &str) -> Document {
        let escaped = normalize::escape_angle_brackets(input);
        let tokens = normalize::tokenize(self.registry, &escaped);
        let tokens = NoParseRule.apply(self.registry, tokens);
        let tokens = ListItemRule.apply(self.registry, tokens);
        tree::annotate(tokens)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    /// Verbatim source for delimiters, escaped text otherwise.
    pub span: Cow<'a, str>,
    pub kind: TokenKind<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BBTag<'a> {
    pub tag: &'a str,
    pub args: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind<'a> {
    OpenBBTag(BBTag<'a>),
    CloseBBTag(BBTag<'a>),
    Text,
}

impl<'a> Token<'a> {
    pub fn text(span: impl Into<Cow<'a, str>>) -> Self {
        Self {
            span: span.into(),
            kind: TokenKind::Text,
        }
    }

    pub fn tag_name(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::OpenBBTag(BBTag { tag, .. }) | TokenKind::CloseBBTag(BBTag { tag, .. }) => {
                Some(tag)
            }
            TokenKind::Text => None,
        }
    }

    pub fn args(&self) -> Option<&'a str> {
        match self.kind {
            TokenKind::OpenBBTag(BBTag { args, .. }) => Some(args),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, TokenKind::Text)
    }

    pub fn is_open(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::OpenBBTag(t) if t.tag.eq_ignore_ascii_case(name))
    }

    pub fn is_close(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::CloseBBTag(t) if t.tag.eq_ignore_ascii_case(name))
    }
}

#[cfg(all(test, feature = "builtins"))]
mod tests;
