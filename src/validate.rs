//! Parent/child restriction checks over a parsed [Document].
use crate::error::Diagnostic;
use crate::parser::{Document, Item, Node};
use crate::registry::{TagDefinition, TagRegistry};

/// Name of the pseudo-tag enclosing the whole document. It restricts nothing.
pub const ROOT_TAG: &str = "document";

/// Check every paired tag against the restrictions of its direct parent and its own.
/// # Remarks
/// All direct children of a tag are checked before descending into any of them. The document is
/// only inspected; violations are reported, never corrected.
pub fn validate(registry: &TagRegistry, document: &Document) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    // Levels still to check, innermost on top. Each level's children are pushed in reverse so they
    // are visited in document order.
    let mut pending: Vec<(Option<&TagDefinition>, &str, &[Item])> =
        vec![(None, ROOT_TAG, document.items())];

    while let Some((parent, parent_name, items)) = pending.pop() {
        let children: Vec<&Node> = items
            .iter()
            .filter_map(|x| match x {
                Item::Tag(id) => Some(document.node(*id)),
                _ => None,
            })
            .collect();

        check_children(registry, parent, parent_name, &children, &mut diagnostics);

        pending.extend(
            children
                .into_iter()
                .rev()
                .map(|x| (registry.get(x.name()), x.name(), x.children())),
        );
    }

    diagnostics
}

fn check_children(
    registry: &TagRegistry,
    parent: Option<&TagDefinition>,
    parent_name: &str,
    children: &[&Node],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for child in children {
        if parent.is_some_and(|p| !p.accepts_child(child.name())) {
            diagnostics.push(Diagnostic::ChildNotAllowed {
                parent: parent_name.to_owned(),
                child: child.name().to_owned(),
            });
        }

        if registry
            .get(child.name())
            .is_some_and(|c| !c.accepts_parent(parent_name))
        {
            diagnostics.push(Diagnostic::ParentNotAllowed {
                parent: parent_name.to_owned(),
                child: child.name().to_owned(),
            });
        }
    }
}

#[cfg(all(test, feature = "builtins"))]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::parser::BBParser;

    fn messages(input: &str) -> Vec<String> {
        let registry = TagRegistry::builtin();
        let document = BBParser::new(&registry).parse(input);
        validate(&registry, &document)
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[rstest]
    #[case("[b]x[/b]")]
    #[case("[table][tr][td]x[/td][th]y[/th][/tr][/table]")]
    #[case("[table][thead][tr][th]h[/th][/tr][/thead][tbody][tr][td]x[/td][/tr][/tbody][/table]")]
    #[case("[list][*]a[*][b]b[/b][/list]")]
    #[case("[ol][li]a[/li][/ol]")]
    fn well_formed_has_no_diagnostics(#[case] input: &str) {
        assert_eq!(messages(input), Vec::<String>::new());
    }

    #[test]
    fn row_outside_table() {
        assert_eq!(
            messages("[tr][td]x[/td][/tr]"),
            vec!["tag document not allowed as parent of tr"]
        );
    }

    #[test]
    fn both_directions_are_reported() {
        assert_eq!(
            messages("[list][td]x[/td][/list]"),
            vec![
                "tag td not allowed as child of list",
                "tag list not allowed as parent of td",
            ]
        );
    }

    #[test]
    fn siblings_are_checked_before_descending() {
        assert_eq!(
            messages("[table][b][td]x[/td][/b][i]y[/i][/table]"),
            vec![
                "tag b not allowed as child of table",
                "tag i not allowed as child of table",
                "tag b not allowed as parent of td",
            ]
        );
    }

    #[test]
    fn unrestricted_parent_accepts_anything() {
        assert_eq!(
            messages("[quote][b][i][u]x[/u][/i][/b][color=red]y[/color][/quote]"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn unpaired_tags_are_not_checked() {
        // The unclosed [tr] is raw text, so [td] sits directly in the document.
        assert_eq!(
            messages("[table][tr][td]x[/td][/table]"),
            vec!["tag document not allowed as parent of td"]
        );
    }

    #[test]
    fn deep_nesting_is_checked() {
        let input = format!(
            "{}[td]x[/td]{}",
            "[quote]".repeat(20_000),
            "[/quote]".repeat(20_000)
        );
        assert_eq!(
            messages(&input),
            vec!["tag quote not allowed as parent of td"]
        );
    }

    #[test]
    fn every_node_is_registered() {
        let registry = TagRegistry::builtin();
        let document = BBParser::new(&registry)
            .parse("[list][*][url=http://a.b]x[/url][*][nope]y[/nope][/list][code][foo][/code]");
        assert!(!document.nodes().is_empty());
        assert!(document.nodes().iter().all(|x| registry.contains(x.name())));
    }
}
