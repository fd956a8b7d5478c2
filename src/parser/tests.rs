use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::{BBParser, Item, TagRegistry};

const LOREM_IPSUM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. In lorem quam, fermentum id porttitor ac, iaculis eu arcu. Aliquam vulputate tempus felis consequat elementum.";

fn annotate(input: &str) -> String {
    BBParser::new(&TagRegistry::builtin()).parse(input).annotated()
}

#[test]
pub fn just_text() {
    let document = BBParser::new(&TagRegistry::builtin()).parse(LOREM_IPSUM);
    assert_eq!(document.items(), [Item::Text(LOREM_IPSUM.to_owned())]);
    assert!(document.nodes().is_empty());
}

#[test]
pub fn empty_input() {
    let document = BBParser::new(&TagRegistry::builtin()).parse("");
    assert!(document.items().is_empty());
}

#[rstest]
#[case("[b]x[/b]", "[b@0]x[/b@0]")]
#[case("[b][i]x[/i][/b]", "[b@0][i@1]x[/i@1][/b@0]")]
#[case("[b][b]x[/b][/b]", "[b@0][b@1]x[/b@1][/b@0]")]
#[case("[b]x[/b][b]y[/b]", "[b@0]x[/b@0][b@0]y[/b@0]")]
#[case("[B]x[/b]", "[b@0]x[/b@0]")]
#[case("[color=red]x[/color]", "[color@0=red]x[/color@0]")]
#[case("[quote Alice]x[/quote]", "[quote@0 Alice]x[/quote@0]")]
pub fn depths(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(annotate(input), expected);
}

#[rstest]
// Crossed tags: neither pair can resolve.
#[case("[b][i]x[/b][/i]", "[b][i]x[/b][/i]")]
// An unclosed inner tag blocks its parent, but resolved siblings keep their depth.
#[case("[b][i]x[/i][u]y[/b]", "[b][i@0]x[/i@0][u]y[/b]")]
// A stray closer blocks every enclosing tag.
#[case("[b][b]x[/i][/b][/b]", "[b][b]x[/i][/b][/b]")]
#[case("[b]x[/b][/b]", "[b@0]x[/b@0][/b]")]
#[case("[b]x", "[b]x")]
pub fn unpaired_delimiters_stay_raw(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(annotate(input), expected);
}

#[test]
pub fn raw_delimiters_are_reported() {
    let registry = TagRegistry::builtin();
    assert!(BBParser::new(&registry).parse("[b]x").has_raw());
    assert!(!BBParser::new(&registry).parse("[b]x[/b]").has_raw());
}

#[test]
pub fn list_items_are_paired() {
    assert_eq!(
        annotate("[list][*]a[*]b[/list]"),
        "[list@0][*@1]a[/*@1][*@1]b[/*@1][/list@0]"
    );
}

#[test]
pub fn nested_lists() {
    assert_eq!(
        annotate("[list][*]a[list][*]b[/list][*]c[/list]"),
        "[list@0][*@1]a[list@2][*@3]b[/*@3][/list@2][/*@1][*@1]c[/*@1][/list@0]"
    );
}

#[test]
pub fn list_item_outside_list_stays_raw() {
    assert_eq!(annotate("[*]a [b]x[/b]"), "[*]a [b@0]x[/b@0]");
}

#[test]
pub fn opaque_content_is_text() {
    let registry = TagRegistry::builtin();
    let document = BBParser::new(&registry).parse("[code][b]x[/b][/code]");
    assert_eq!(document.nodes().len(), 1);
    let code = document.node(0);
    assert_eq!(code.name(), "code");
    assert_eq!(
        code.children(),
        [Item::Text("&#91;b&#93;x&#91;/b&#93;".to_owned())]
    );
}

#[test]
pub fn stray_brackets_are_escaped() {
    assert_eq!(annotate("a[1] [b]]"), "a&#91;1&#93; [b]&#93;");
}

#[test]
pub fn angle_brackets_are_escaped() {
    assert_eq!(
        annotate("[b]<i>[/b]"),
        "[b@0]&lt;i&gt;[/b@0]"
    );
}

#[test]
pub fn spans_keep_source_text() {
    let registry = TagRegistry::builtin();
    let document = BBParser::new(&registry).parse("[URL=http://x.io]x[/Url]");
    let node = document.node(0);
    assert_eq!(node.name(), "url");
    assert_eq!(node.params(), "=http://x.io");
    assert_eq!(node.open_span(), "[URL=http://x.io]");
    assert_eq!(node.close_span(), "[/Url]");
    assert_eq!(node.depth(), 0);
}

#[test]
pub fn deep_nesting_is_annotated() {
    const DEEP: usize = 20_000;
    let input = format!("{}x{}", "[i]".repeat(DEEP), "[/i]".repeat(DEEP));
    let document = BBParser::new(&TagRegistry::builtin()).parse(&input);

    assert_eq!(document.nodes().len(), DEEP);
    assert!(!document.has_raw());
    assert_eq!(
        document.nodes().iter().map(|x| x.depth()).max(),
        Some(DEEP - 1)
    );
    assert!(document.annotated().starts_with("[i@0][i@1][i@2]"));
}

#[test]
pub fn unclosed_openers_keep_their_content_in_order() {
    assert_eq!(
        annotate("[b]a[i]b[u]c[/u]d"),
        "[b]a[i]b[u@0]c[/u@0]d"
    );
    assert_eq!(annotate("[b]x[b]x[b]x"), "[b]x[b]x[b]x");
}

#[test]
#[should_panic]
pub fn node_from_another_document_panics() {
    let registry = TagRegistry::builtin();
    let parser = BBParser::new(&registry);
    let other = parser.parse("[b]x[/b][i]y[/i]");
    let Some(Item::Tag(id)) = other.items().last() else {
        panic!("expected a tag");
    };
    parser.parse("[b]x[/b]").node(*id);
}
