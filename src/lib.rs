//! Extensible BBCode to HTML converter for untrusted input.
//!
//! Raw HTML in the input is always escaped. Tags are checked against the parent/child restrictions of
//! their definitions, and anything wrong with the markup is reported as a [Diagnostic] next to a
//! best-effort rendering rather than as a failure.
//!
//! ```
//! use bbsafe::{process, ParserConfig};
//!
//! let result = process("[b]hi[/b] <script>", &ParserConfig::default());
//! assert_eq!(result.html, "<span class='xbbcode-b'>hi</span> &lt;script&gt;");
//! assert!(!result.error);
//! ```
use std::sync::LazyLock;

mod error;
pub mod html;
mod parser;
mod registry;
mod validate;

pub use error::{Diagnostic, RegistryError};
pub use html::{FnTagWriter, HtmlSerializer, HtmlTagWriter, ParseResult};
pub use parser::{BBParser, Document, Item, Node, NodeId, ParserConfig, ParserFeature};
pub use registry::{is_valid_tag_name, TagDefinition, TagRegistry, LIST_CONTAINERS, LIST_ITEM};
pub use validate::{validate, ROOT_TAG};

static DEFAULT_SERIALIZER: LazyLock<HtmlSerializer> = LazyLock::new(HtmlSerializer::default);

/// Convert the given BBCode using the default tag set.
pub fn process(text: &str, config: &ParserConfig) -> ParseResult {
    DEFAULT_SERIALIZER.serialize(text, config)
}
