//! Depth annotation: pairs delimiters into tag nodes and records how deeply each one is nested.
//!
//! A closer pairs with an opener only when the two are adjacent once every tag between them has been
//! paired, which is the same as requiring the innermost open frame to have the closer's name and to
//! contain nothing unresolved. Anything that fails to pair is kept verbatim as [Item::Raw], and taints
//! every enclosing frame so that none of them can pair either.
use super::normalize::escape_brackets;
use super::{BBTag, Token, TokenKind};

/// Index of a [Node] within its [Document].
pub type NodeId = usize;

/// One piece of a tag's (or the document's) content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// Escaped text.
    Text(String),
    /// A delimiter that never found a partner, kept as written.
    Raw(String),
    /// A paired tag.
    Tag(NodeId),
}

/// A paired tag instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    params: String,
    depth: usize,
    open_span: String,
    close_span: String,
    children: Vec<Item>,
}

impl Node {
    /// Lowercase tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw parameters as written after the name, including the leading `=` or space.
    pub fn params(&self) -> &str {
        &self.params
    }

    /// Number of paired tags enclosing this one.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn open_span(&self) -> &str {
        &self.open_span
    }

    pub fn close_span(&self) -> &str {
        &self.close_span
    }

    pub fn children(&self) -> &[Item] {
        &self.children
    }
}

/// A parsed document: top level items plus an arena holding every paired tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    items: Vec<Item>,
}

impl Document {
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The node with the given id.
    /// # Panics
    /// If `id` does not belong to this document, i.e. it was not taken from one of its [Item::Tag]s.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Whether any delimiter was left unpaired.
    pub fn has_raw(&self) -> bool {
        self.items
            .iter()
            .chain(self.nodes.iter().flat_map(|x| x.children.iter()))
            .any(|x| matches!(x, Item::Raw(_)))
    }

    /// Depth-tagged rendering of the document, e.g. `[b@0]x[/b@0]`. Meant for inspection.
    pub fn annotated(&self) -> String {
        let mut out = String::new();
        for step in self.walk(&self.items) {
            match step {
                Step::Text(text) | Step::Raw(text) => out.push_str(text),
                Step::Open(node) => {
                    out.push_str(&format!("[{}@{}{}]", node.name, node.depth, node.params))
                }
                Step::Close(node) => out.push_str(&format!("[/{}@{}]", node.name, node.depth)),
            }
        }
        out
    }

    /// The given items as source text with every bracket escaped, as shown inside opaque tags.
    pub fn escaped_text(&self, items: &[Item]) -> String {
        let mut out = String::new();
        for step in self.walk(items) {
            match step {
                Step::Text(text) => out.push_str(text),
                Step::Raw(text) => out.push_str(&escape_brackets(text)),
                Step::Open(node) => out.push_str(&escape_brackets(&node.open_span)),
                Step::Close(node) => out.push_str(&escape_brackets(&node.close_span)),
            }
        }
        out
    }

    /// Visit the items in source order without recursing, so nesting depth is bounded by memory only.
    fn walk<'d>(&'d self, items: &'d [Item]) -> Walk<'d> {
        Walk {
            document: self,
            pending: items.iter().rev().map(Pending::Item).collect(),
        }
    }
}

enum Step<'d> {
    Text(&'d str),
    Raw(&'d str),
    Open(&'d Node),
    Close(&'d Node),
}

enum Pending<'d> {
    Item(&'d Item),
    Close(&'d Node),
}

struct Walk<'d> {
    document: &'d Document,
    pending: Vec<Pending<'d>>,
}

impl<'d> Iterator for Walk<'d> {
    type Item = Step<'d>;

    fn next(&mut self) -> Option<Step<'d>> {
        let step = match self.pending.pop()? {
            Pending::Item(Item::Text(text)) => Step::Text(text),
            Pending::Item(Item::Raw(text)) => Step::Raw(text),
            Pending::Item(Item::Tag(id)) => {
                let node = self.document.node(*id);
                self.pending.push(Pending::Close(node));
                self.pending
                    .extend(node.children.iter().rev().map(Pending::Item));
                Step::Open(node)
            }
            Pending::Close(node) => Step::Close(node),
        };
        Some(step)
    }
}

/// An opener waiting for its closer. Its content is everything in the shared item list from `start` on.
struct Frame<'a> {
    open: Token<'a>,
    start: usize,
    /// Holds an unresolved delimiter, so this frame can no longer pair.
    tainted: bool,
}

fn push_text(items: &mut Vec<Item>, floor: usize, text: &str) {
    if items.len() > floor {
        if let Some(Item::Text(last)) = items.last_mut() {
            last.push_str(text);
            return;
        }
    }
    items.push(Item::Text(text.to_owned()));
}

/// Pair the delimiters of the token stream and compute every tag's depth.
///
/// Items go into one flat list. Each opener leaves a raw placeholder behind and records where its
/// content starts; pairing moves that content into the new node once, and an opener that never pairs
/// simply leaves its placeholder and content where they are.
pub(crate) fn annotate(tokens: Vec<Token<'_>>) -> Document {
    let mut nodes: Vec<Node> = vec![];
    let mut items: Vec<Item> = vec![];
    let mut stack: Vec<Frame<'_>> = vec![];

    for tk in tokens {
        let floor = stack.last().map_or(0, |x| x.start);
        match tk.kind {
            TokenKind::Text => push_text(&mut items, floor, &tk.span),
            TokenKind::OpenBBTag(_) => {
                items.push(Item::Raw(tk.span.to_string()));
                stack.push(Frame {
                    open: tk,
                    start: items.len(),
                    tainted: false,
                });
            }
            TokenKind::CloseBBTag(BBTag { tag, .. }) => {
                let closes_top = stack.last().is_some_and(|x| x.open.is_open(tag));
                if !closes_top {
                    items.push(Item::Raw(tk.span.to_string()));
                    if let Some(top) = stack.last_mut() {
                        top.tainted = true;
                    }
                    continue;
                }

                let Some(frame) = stack.pop() else {
                    continue;
                };

                if frame.tainted {
                    items.push(Item::Raw(tk.span.to_string()));
                    if let Some(top) = stack.last_mut() {
                        top.tainted = true;
                    }
                    continue;
                }

                let children = items.split_off(frame.start);
                // Drop the opener's placeholder.
                items.pop();

                let id = nodes.len();
                nodes.push(Node {
                    name: frame.open.tag_name().unwrap_or_default().to_ascii_lowercase(),
                    params: frame.open.args().unwrap_or_default().to_owned(),
                    depth: 0,
                    open_span: frame.open.span.into_owned(),
                    close_span: tk.span.to_string(),
                    children,
                });
                items.push(Item::Tag(id));
            }
        }
    }

    assign_depths(&mut nodes, &items);

    Document { nodes, items }
}

fn assign_depths(nodes: &mut [Node], items: &[Item]) {
    let mut pending: Vec<(NodeId, usize)> = items
        .iter()
        .filter_map(|x| match x {
            Item::Tag(id) => Some((*id, 0)),
            _ => None,
        })
        .collect();

    while let Some((id, depth)) = pending.pop() {
        nodes[id].depth = depth;
        pending.extend(nodes[id].children.iter().filter_map(|x| match x {
            Item::Tag(child) => Some((*child, depth + 1)),
            _ => None,
        }));
    }
}
