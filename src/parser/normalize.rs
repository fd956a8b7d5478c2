//! Turns raw input into tokens: escaped text and delimiters of registered tags.
use std::borrow::Cow;

use crate::registry::TagRegistry;

use super::{BBTag, Token, TokenKind};

pub(crate) const OPEN_BRACKET_ENTITY: &str = "&#91;";
pub(crate) const CLOSE_BRACKET_ENTITY: &str = "&#93;";

/// Escape `<` and `>`. This must run before anything else looks at the input.
pub(crate) fn escape_angle_brackets(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>']) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(text.replace('<', "&lt;").replace('>', "&gt;"))
}

/// Escape `[` and `]` so they can no longer be mistaken for delimiters.
pub(crate) fn escape_brackets(text: &str) -> Cow<'_, str> {
    if !text.contains(['[', ']']) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(
        text.replace('[', OPEN_BRACKET_ENTITY)
            .replace(']', CLOSE_BRACKET_ENTITY),
    )
}

/// Turn bracket entities back into literal brackets. Angle bracket entities are left alone.
pub(crate) fn unescape_brackets(text: &str) -> String {
    text.replace(OPEN_BRACKET_ENTITY, "[")
        .replace(CLOSE_BRACKET_ENTITY, "]")
}

/// Split already angle-escaped text into tokens.
///
/// Any `[name]`, `[name=args]`, `[name args]` or `[/name]` of a registered tag becomes a delimiter token.
/// Every other bracket ends up escaped inside a text token.
pub(crate) fn tokenize<'a>(registry: &TagRegistry, text: &'a str) -> Vec<Token<'a>> {
    let mut tokens = vec![];
    let Some(pattern) = registry.delimiter() else {
        push_text(&mut tokens, text);
        return tokens;
    };

    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };

        let kind = if let Some(close) = caps.name("close") {
            TokenKind::CloseBBTag(BBTag {
                tag: close.as_str(),
                args: "",
            })
        } else if let Some(open) = caps.name("open") {
            TokenKind::OpenBBTag(BBTag {
                tag: open.as_str(),
                args: caps.name("params").map_or("", |x| x.as_str()),
            })
        } else {
            continue;
        };

        // Case-insensitive matching is Unicode-aware; the registry lookup is not.
        let known = match &kind {
            TokenKind::OpenBBTag(t) | TokenKind::CloseBBTag(t) => registry.contains(t.tag),
            TokenKind::Text => false,
        };
        if !known {
            continue;
        }

        push_text(&mut tokens, &text[last..whole.start()]);
        tokens.push(Token {
            span: Cow::Borrowed(whole.as_str()),
            kind,
        });
        last = whole.end();
    }

    push_text(&mut tokens, &text[last..]);
    tokens
}

fn push_text<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str) {
    if text.is_empty() {
        return;
    }

    tokens.push(Token {
        span: escape_brackets(text),
        kind: TokenKind::Text,
    });
}
