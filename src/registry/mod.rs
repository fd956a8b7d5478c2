//! The set of tags a converter understands, along with the lookup structures derived from it.
//!
//! A [TagRegistry] is an immutable value. Extending it produces a new registry with every derived
//! structure rebuilt, so a registry can be shared between threads and never observed half-updated.
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use static_assertions::assert_impl_all;
use tracing::warn;

use crate::error::RegistryError;
use crate::html::{FnTagWriter, HtmlTagWriter};

/// The list item tag. It is the only tag without a closing form in the markup.
pub const LIST_ITEM: &str = "*";

/// Tags whose `[*]` children receive implicit closing delimiters.
pub const LIST_CONTAINERS: &[&str] = &["list", "ul", "ol"];

/// Everything the converter needs to know about one tag.
#[derive(Clone)]
pub struct TagDefinition {
    name: String,
    writer: Arc<dyn HtmlTagWriter>,
    display_content: bool,
    opaque: bool,
    allowed_children: HashSet<String>,
    allowed_parents: HashSet<String>,
}

impl TagDefinition {
    /// Define a tag rendered by the given writer, displaying its content, with no nesting restrictions.
    pub fn new(name: impl Into<String>, writer: impl HtmlTagWriter + 'static) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            writer: Arc::new(writer),
            display_content: true,
            opaque: false,
            allowed_children: HashSet::new(),
            allowed_parents: HashSet::new(),
        }
    }

    /// Define a tag from a pair of render closures, `(params, content) -> html`.
    pub fn from_fns<Open, Close>(name: impl Into<String>, open: Open, close: Close) -> Self
    where
        Open: Fn(&str, &str) -> String + Send + Sync + 'static,
        Close: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self::new(name, FnTagWriter::new(open, close))
    }

    /// Never interpret the content of this tag as further markup.
    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    /// Drop the rendered content, keeping only what the writer produces around it.
    /// # Remarks
    /// The writer still receives the content, which is how tags like `[img]` take their payload.
    pub fn hide_content(mut self) -> Self {
        self.display_content = false;
        self
    }

    /// Restrict the tags allowed as direct children of this one.
    pub fn allow_children<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_children
            .extend(names.into_iter().map(|x| x.as_ref().to_ascii_lowercase()));
        self
    }

    /// Restrict the tags allowed as the direct parent of this one.
    pub fn allow_parents<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_parents
            .extend(names.into_iter().map(|x| x.as_ref().to_ascii_lowercase()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn writer(&self) -> &dyn HtmlTagWriter {
        self.writer.as_ref()
    }

    pub fn display_content(&self) -> bool {
        self.display_content
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    /// Direct children this tag accepts. Empty means any.
    pub fn allowed_children(&self) -> &HashSet<String> {
        &self.allowed_children
    }

    /// Direct parents this tag accepts. Empty means any.
    pub fn allowed_parents(&self) -> &HashSet<String> {
        &self.allowed_parents
    }

    /// Whether `child` may appear directly inside this tag.
    pub fn accepts_child(&self, child: &str) -> bool {
        self.allowed_children.is_empty() || self.allowed_children.contains(child)
    }

    /// Whether this tag may appear directly inside `parent`.
    pub fn accepts_parent(&self, parent: &str) -> bool {
        self.allowed_parents.is_empty() || self.allowed_parents.contains(parent)
    }
}

impl fmt::Debug for TagDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDefinition")
            .field("name", &self.name)
            .field("display_content", &self.display_content)
            .field("opaque", &self.opaque)
            .field("allowed_children", &self.allowed_children)
            .field("allowed_parents", &self.allowed_parents)
            .finish_non_exhaustive()
    }
}

/// Whether `name` can be registered: ASCII alphanumerics and underscores, or exactly `*`.
pub fn is_valid_tag_name(name: &str) -> bool {
    name == LIST_ITEM
        || (!name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_'))
}

/// Tag definitions keyed by lowercase name, plus the structures derived from the name list.
#[derive(Clone, Debug)]
pub struct TagRegistry {
    tags: BTreeMap<String, TagDefinition>,
    names: Vec<String>,
    opaque_names: Vec<String>,
    delimiter: Option<Regex>,
}

assert_impl_all!(TagRegistry: Send, Sync);

impl TagRegistry {
    /// A registry with no tags at all. Every bracket is plain text to it.
    pub fn empty() -> Self {
        Self {
            tags: BTreeMap::new(),
            names: vec![],
            opaque_names: vec![],
            delimiter: None,
        }
    }

    /// Build a registry from the given definitions. Later definitions override earlier ones of the same name.
    pub fn new(tags: impl IntoIterator<Item = TagDefinition>) -> Result<Self, RegistryError> {
        Self::empty().extend(tags)
    }

    /// The built-in tag set, see [builtins][crate::html::builtins].
    #[cfg(feature = "builtins")]
    #[allow(clippy::expect_used)] // Built-in names are statically valid.
    pub fn builtin() -> Self {
        Self::new(crate::html::builtins::all_tags()).expect("built-in tags form a valid registry")
    }

    /// Merge the given definitions into a copy of this registry, overriding by name,
    /// and rebuild every derived lookup structure.
    pub fn extend(
        &self,
        tags: impl IntoIterator<Item = TagDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut merged = self.tags.clone();
        for tag in tags {
            if !is_valid_tag_name(&tag.name) {
                return Err(RegistryError::InvalidTagName(tag.name));
            }
            merged.insert(tag.name.clone(), tag);
        }

        Self::rebuild(merged)
    }

    fn rebuild(tags: BTreeMap<String, TagDefinition>) -> Result<Self, RegistryError> {
        for def in tags.values() {
            for other in def.allowed_children.iter().chain(&def.allowed_parents) {
                if !tags.contains_key(other) {
                    warn!(tag = %def.name, restriction = %other, "restriction names an unregistered tag");
                }
            }
        }

        let names: Vec<String> = tags.keys().cloned().collect();
        let opaque_names = tags
            .values()
            .filter(|x| x.opaque)
            .map(|x| x.name.clone())
            .collect();
        let delimiter = delimiter_pattern(&names)?;

        Ok(Self {
            tags,
            names,
            opaque_names,
            delimiter,
        })
    }

    /// The current definitions, keyed by lowercase name.
    pub fn tags(&self) -> &BTreeMap<String, TagDefinition> {
        &self.tags
    }

    /// Look a tag up by name, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&TagDefinition> {
        if name.bytes().any(|b| b.is_ascii_uppercase()) {
            self.tags.get(&name.to_ascii_lowercase())
        } else {
            self.tags.get(name)
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All registered names in sorted order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names of the tags whose content is never parsed, in sorted order.
    pub fn opaque_names(&self) -> &[String] {
        &self.opaque_names
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether the named tag is a list container, i.e. its `[*]` children are closed implicitly.
    pub fn is_list_container(&self, name: &str) -> bool {
        LIST_CONTAINERS.iter().any(|x| x.eq_ignore_ascii_case(name)) && self.contains(name)
    }

    /// Pattern recognizing any opener or closer of a registered tag, `None` when no tags exist.
    ///
    /// Captures `close` for closers, and `open` plus an optional `params` for openers.
    pub(crate) fn delimiter(&self) -> Option<&Regex> {
        self.delimiter.as_ref()
    }
}

#[cfg(feature = "builtins")]
impl Default for TagRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(not(feature = "builtins"))]
impl Default for TagRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

fn delimiter_pattern(names: &[String]) -> Result<Option<Regex>, regex::Error> {
    if names.is_empty() {
        return Ok(None);
    }

    let openers = names
        .iter()
        .map(|x| regex::escape(x))
        .collect::<Vec<_>>()
        .join("|");
    let closers = names
        .iter()
        .filter(|x| *x != LIST_ITEM)
        .map(|x| regex::escape(x))
        .collect::<Vec<_>>()
        .join("|");

    let pattern = if closers.is_empty() {
        format!(r"(?i)\[(?P<open>{openers})(?P<params>[ =][^\]]*)?\]")
    } else {
        format!(r"(?i)\[(?:/(?P<close>{closers})|(?P<open>{openers})(?P<params>[ =][^\]]*)?)\]")
    };

    Regex::new(&pattern).map(Some)
}
