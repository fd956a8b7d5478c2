//! Token rewrites applied between tokenizing and annotation.
use std::borrow::Cow;
use std::collections::HashMap;

use crate::registry::{TagRegistry, LIST_ITEM};

use super::normalize::escape_brackets;
use super::{BBTag, Token, TokenKind};

pub(crate) trait TokenRule {
    fn apply<'a>(&self, registry: &TagRegistry, tokens: Vec<Token<'a>>) -> Vec<Token<'a>>;
}

/// Disables parsing within opaque tags, de-tokenizing everything up to the first matching closer back
/// into escaped text.
/// # Remarks
/// An opaque opener without a closer is left alone and ends up unmatched.
pub(crate) struct NoParseRule;

impl NoParseRule {
    /// For every opaque opener, the index of the first following closer with the same name.
    ///
    /// One backward pass, remembering the nearest closer seen so far for each opaque name.
    fn releases(registry: &TagRegistry, tokens: &[Token<'_>]) -> Vec<Option<usize>> {
        let mut release = vec![None; tokens.len()];
        let mut nearest: HashMap<&str, usize> = HashMap::new();

        for (idx, tk) in tokens.iter().enumerate().rev() {
            let (TokenKind::OpenBBTag(BBTag { tag, .. }) | TokenKind::CloseBBTag(BBTag { tag, .. })) =
                &tk.kind
            else {
                continue;
            };
            let Some(def) = registry.get(tag).filter(|x| x.is_opaque()) else {
                continue;
            };

            if matches!(tk.kind, TokenKind::CloseBBTag(_)) {
                nearest.insert(def.name(), idx);
            } else {
                release[idx] = nearest.get(def.name()).copied();
            }
        }

        release
    }
}

impl TokenRule for NoParseRule {
    fn apply<'a>(&self, registry: &TagRegistry, tokens: Vec<Token<'a>>) -> Vec<Token<'a>> {
        if registry.opaque_names().is_empty() {
            return tokens;
        }

        let releases = Self::releases(registry, &tokens);

        let mut out = Vec::with_capacity(tokens.len());
        let mut idx = 0;
        while idx < tokens.len() {
            let tk = &tokens[idx];
            let Some(release) = releases[idx] else {
                out.push(tk.clone());
                idx += 1;
                continue;
            };

            out.push(tk.clone());
            let inner: String = tokens[(idx + 1)..release]
                .iter()
                .map(|x| {
                    if x.is_text() {
                        x.span.clone()
                    } else {
                        escape_brackets(&x.span)
                    }
                })
                .collect();
            if !inner.is_empty() {
                out.push(Token::text(inner));
            }
            out.push(tokens[release].clone());
            idx = release + 1;
        }

        out
    }
}

/// Gives every `[*]` inside a list container an explicit closer, placed before the next `[*]` of the
/// same list or before the list's own closer, whichever comes first.
/// # Remarks
/// Only containers whose opener and closer pair up are considered. `[*]` anywhere else is left alone.
pub(crate) struct ListItemRule;

const LIST_ITEM_CLOSE: &str = "[/*]";

impl ListItemRule {
    fn list_item_close<'a>() -> Token<'a> {
        Token {
            span: Cow::Borrowed(LIST_ITEM_CLOSE),
            kind: TokenKind::CloseBBTag(BBTag {
                tag: LIST_ITEM,
                args: "",
            }),
        }
    }

    /// Which tokens are list container delimiters with a partner.
    fn paired_containers(registry: &TagRegistry, tokens: &[Token<'_>]) -> Vec<bool> {
        let mut paired = vec![false; tokens.len()];
        let mut open: Vec<(usize, &str)> = vec![];

        for (idx, tk) in tokens.iter().enumerate() {
            match &tk.kind {
                TokenKind::OpenBBTag(BBTag { tag, .. }) if registry.is_list_container(tag) => {
                    open.push((idx, *tag));
                }
                TokenKind::CloseBBTag(BBTag { tag, .. }) if registry.is_list_container(tag) => {
                    if let Some(&(opener, name)) = open.last() {
                        if name.eq_ignore_ascii_case(tag) {
                            open.pop();
                            paired[opener] = true;
                            paired[idx] = true;
                        }
                    }
                }
                _ => {}
            }
        }

        paired
    }
}

impl TokenRule for ListItemRule {
    fn apply<'a>(&self, registry: &TagRegistry, tokens: Vec<Token<'a>>) -> Vec<Token<'a>> {
        if !registry.contains(LIST_ITEM) {
            return tokens;
        }

        let paired = Self::paired_containers(registry, &tokens);

        // One entry per enclosing list, set while one of its items is open.
        let mut lists: Vec<bool> = vec![];
        let mut out = Vec::with_capacity(tokens.len());

        for (tk, paired) in tokens.into_iter().zip(paired) {
            match &tk.kind {
                TokenKind::OpenBBTag(_) if paired => lists.push(false),
                TokenKind::CloseBBTag(_) if paired => {
                    if lists.pop() == Some(true) {
                        out.push(Self::list_item_close());
                    }
                }
                TokenKind::OpenBBTag(BBTag { tag, .. }) if *tag == LIST_ITEM => {
                    if let Some(item_open) = lists.last_mut() {
                        if *item_open {
                            out.push(Self::list_item_close());
                        }
                        *item_open = true;
                    }
                }
                _ => {}
            }
            out.push(tk);
        }

        out
    }
}
