//! HTML serialization of a depth-annotated [Document].
//!  Every tag's markup comes from its [HtmlTagWriter]; the serializer only walks the tree, calls the writers
//!  innermost first, and cleans up whatever delimiters were left unresolved.
use std::sync::LazyLock;

use regex::Regex;
use static_assertions::{assert_impl_all, assert_obj_safe};
use tracing::{debug, trace};

use crate::error::{Diagnostic, RegistryError};
use crate::parser::normalize::unescape_brackets;
use crate::parser::{BBParser, Document, Item, Node, ParserConfig, ParserFeature};
use crate::registry::{TagDefinition, TagRegistry};
use crate::validate::validate;

/// The primary trait for converting BBCode tags to HTML.
///
/// `params` is the raw suffix following the tag name (`=value` or ` value`), or empty.
/// `content` is the tag's already rendered inner HTML, or its escaped raw text for opaque tags.
pub trait HtmlTagWriter: Send + Sync {
    /// Produce the opening HTML for a tag, pushing it into the given buffer.
    /// # Remarks
    /// The `out` buffer provided may already have contents, an implementation must not overwrite prior contents.
    fn open_tag(&self, params: &str, content: &str, out: &mut String);

    /// Produce the closing HTML for a tag, pushing it into the given buffer.
    /// # Remarks
    /// The `out` buffer provided may already have contents, an implementation must not overwrite prior contents.
    fn close_tag(&self, params: &str, content: &str, out: &mut String);
}

assert_obj_safe!(HtmlTagWriter);

/// A tag writer built from two closures, each returning a fragment for `(params, content)`.
pub struct FnTagWriter<Open, Close> {
    open: Open,
    close: Close,
}

impl<Open, Close> FnTagWriter<Open, Close>
where
    Open: Fn(&str, &str) -> String + Send + Sync,
    Close: Fn(&str, &str) -> String + Send + Sync,
{
    pub fn new(open: Open, close: Close) -> Self {
        Self { open, close }
    }
}

impl<Open, Close> HtmlTagWriter for FnTagWriter<Open, Close>
where
    Open: Fn(&str, &str) -> String + Send + Sync,
    Close: Fn(&str, &str) -> String + Send + Sync,
{
    fn open_tag(&self, params: &str, content: &str, out: &mut String) {
        out.push_str(&(self.open)(params, content));
    }

    fn close_tag(&self, params: &str, content: &str, out: &mut String) {
        out.push_str(&(self.close)(params, content));
    }
}

/// Strip the separator (`=` or space) off a tag's raw parameters, giving the argument proper.
pub fn tag_argument(params: &str) -> &str {
    params.get(1..).unwrap_or("")
}

/// The outcome of one conversion: HTML plus every diagnostic found along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    pub html: String,
    /// Set iff `diagnostics` is non-empty.
    pub error: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// Diagnostics as human readable messages, in discovery order.
    pub fn error_queue(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MISALIGNED_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));

const LINE_BREAK_OPEN: &str = "<div style=\"white-space:pre-wrap;\">";
const LINE_BREAK_CLOSE: &str = "</div>";

/// Converts BBCode text to HTML using the tags of its registry.
#[derive(Clone, Debug, Default)]
pub struct HtmlSerializer {
    registry: TagRegistry,
}

assert_impl_all!(HtmlSerializer: Send, Sync);

impl HtmlSerializer {
    /// Construct a serializer over the built-in tags, if enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a serializer over the given registry.
    pub fn with_registry(registry: TagRegistry) -> Self {
        Self { registry }
    }

    /// A new serializer whose registry also holds the given tags, overriding existing ones by name.
    /// # Remarks
    /// `self` is left untouched, so conversions already sharing it are unaffected.
    pub fn with_tags(
        &self,
        tags: impl IntoIterator<Item = TagDefinition>,
    ) -> Result<Self, RegistryError> {
        Ok(Self::with_registry(self.registry.extend(tags)?))
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Convert the given BBCode to HTML.
    /// # Remarks
    /// This never fails: structural problems and misaligned tags are reported as diagnostics
    /// next to a best-effort rendering.
    pub fn serialize(&self, text: &str, config: &ParserConfig) -> ParseResult {
        let document = BBParser::new(&self.registry).parse(text);
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(annotated = %document.annotated(), "annotated document");
        }

        let mut diagnostics = validate(&self.registry, &document);

        let mut html = String::with_capacity(text.len());
        self.write_items(&document, document.items(), &mut html);

        if html.contains(['[', ']']) {
            diagnostics.push(Diagnostic::Misaligned);
        }

        let flags = config.feature_flags;
        if flags.contains(ParserFeature::REMOVE_MISALIGNED) {
            html = MISALIGNED_RUN.replace_all(&html, "").into_owned();
        }

        if flags.contains(ParserFeature::ADD_LINE_BREAKS) {
            html = format!("{LINE_BREAK_OPEN}{html}{LINE_BREAK_CLOSE}");
        }

        if !flags.contains(ParserFeature::ESCAPE_HTML) {
            html = unescape_brackets(&html);
        }

        debug!(
            input_len = text.len(),
            output_len = html.len(),
            diagnostics = diagnostics.len(),
            "serialized bbcode"
        );

        ParseResult {
            html,
            error: !diagnostics.is_empty(),
            diagnostics,
        }
    }

    /// Render the given items, innermost tags first.
    ///
    /// Walks with an explicit stack of partially rendered tags rather than recursing, so arbitrarily
    /// deep nesting only costs memory.
    fn write_items(&self, document: &Document, items: &[Item], out: &mut String) {
        let mut stack = vec![RenderFrame {
            node: None,
            items: items.iter(),
            content: String::new(),
        }];

        while let Some(frame) = stack.last_mut() {
            match frame.items.next() {
                Some(Item::Text(text) | Item::Raw(text)) => frame.content.push_str(text),
                Some(Item::Tag(id)) => {
                    let node = document.node(*id);
                    if self.registry.get(node.name()).is_some_and(|x| x.is_opaque()) {
                        let content = document.escaped_text(node.children());
                        self.write_node(node, &content, &mut frame.content);
                    } else {
                        stack.push(RenderFrame {
                            node: Some(node),
                            items: node.children().iter(),
                            content: String::new(),
                        });
                    }
                }
                None => {
                    let Some(done) = stack.pop() else {
                        break;
                    };
                    match (done.node, stack.last_mut()) {
                        (Some(node), Some(parent)) => {
                            self.write_node(node, &done.content, &mut parent.content)
                        }
                        _ => out.push_str(&done.content),
                    }
                }
            }
        }
    }

    /// Write one tag around its already rendered content.
    fn write_node(&self, node: &Node, content: &str, out: &mut String) {
        let Some(def) = self.registry.get(node.name()) else {
            // Only registered names become delimiters, so this is unreachable for documents
            // parsed with this registry.
            out.push_str(node.open_span());
            out.push_str(content);
            out.push_str(node.close_span());
            return;
        };

        let writer = def.writer();
        writer.open_tag(node.params(), content, out);
        if def.display_content() {
            out.push_str(content);
        }
        writer.close_tag(node.params(), content, out);
    }
}

/// A tag whose children are still being rendered.
struct RenderFrame<'d> {
    /// `None` for the top level.
    node: Option<&'d Node>,
    items: std::slice::Iter<'d, Item>,
    content: String,
}

#[cfg(feature = "builtins")]
pub mod builtins;
