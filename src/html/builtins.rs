//! Built-in implementations of the common BBCode tags.
//!
//! Tags taking an argument validate it and fall back to a safe default instead of failing, so a bad
//! colour or URL never breaks a conversion.
use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use super::{tag_argument, HtmlTagWriter};
use crate::registry::{TagDefinition, LIST_ITEM};

macro_rules! simple_tag {
    ($doc:expr, $name:ident, $open:expr, $close:expr) => {
        #[derive(Copy, Clone, Debug, Default)]
        #[doc = $doc]
        #[doc = "# Exact output"]
        #[doc = "This tag converts exactly to"]
        #[doc = "```html"]
        #[doc = $open]
        #[doc = " contents"]
        #[doc = $close]
        #[doc = "```"]
        pub struct $name;

        impl HtmlTagWriter for $name {
            fn open_tag(&self, _: &str, _: &str, out: &mut String) {
                out.push_str($open)
            }

            fn close_tag(&self, _: &str, _: &str, out: &mut String) {
                out.push_str($close)
            }
        }
    };
}

simple_tag! {
    "A list item, `[*]` or `[li]`, which converts directly to HTML5 `<li>`.",
    ListItemTag, "<li>", "</li>"
}
simple_tag! {
    "A bold tag with no arguments.",
    BoldTag, "<span class='xbbcode-b'>", "</span>"
}
simple_tag! {
    "A tag with no output of its own, used to mark content as BBCode for structural checks.",
    PassthroughTag, "", ""
}
simple_tag! {
    "Centering tag with no arguments.",
    CenterTag, "<span class='xbbcode-center'>", "</span>"
}
simple_tag! {
    "Code styling tag. Its content is never parsed.",
    CodeTag, "<span class='xbbcode-code'>", "</span>"
}
simple_tag! {
    "An italic tag with no arguments.",
    ItalicTag, "<span class='xbbcode-i'>", "</span>"
}
simple_tag! {
    "Justify tag with no arguments.",
    JustifyTag, "<span class='xbbcode-justify'>", "</span>"
}
simple_tag! {
    "Left-align tag with no arguments.",
    LeftTag, "<span class='xbbcode-left'>", "</span>"
}
simple_tag! {
    "Right-align tag with no arguments.",
    RightTag, "<span class='xbbcode-right'>", "</span>"
}
simple_tag! {
    "Unordered list tag, `[list]` or `[ul]`, which converts directly to HTML5 `<ul>`.",
    UnorderedListTag, "<ul>", "</ul>"
}
simple_tag! {
    "Ordered list tag, which converts directly to HTML5 `<ol>`.",
    OrderedListTag, "<ol>", "</ol>"
}
simple_tag! {
    "A block quote tag with no arguments.",
    BlockQuoteTag, "<blockquote class='xbbcode-blockquote'>", "</blockquote>"
}
simple_tag! {
    "Strike-through tag with no arguments.",
    StrikeTag, "<span class='xbbcode-s'>", "</span>"
}
simple_tag! {
    "Subscript tag with no arguments, which converts directly to HTML5 `<sub>`.",
    SubscriptTag, "<sub>", "</sub>"
}
simple_tag! {
    "Superscript tag with no arguments, which converts directly to HTML5 `<sup>`.",
    SuperscriptTag, "<sup>", "</sup>"
}
simple_tag! {
    "Table tag with no arguments.",
    TableTag, "<table class='xbbcode-table'>", "</table>"
}
simple_tag! {
    "Table body tag, which converts directly to HTML5 `<tbody>`.",
    TableBodyTag, "<tbody>", "</tbody>"
}
simple_tag! {
    "Table cell tag.",
    TableCellTag, "<td class='xbbcode-td'>", "</td>"
}
simple_tag! {
    "Table footer tag, which converts directly to HTML5 `<tfoot>`.",
    TableFootTag, "<tfoot>", "</tfoot>"
}
simple_tag! {
    "Table header cell tag.",
    TableHeaderCellTag, "<th class='xbbcode-th'>", "</th>"
}
simple_tag! {
    "Table header tag.",
    TableHeadTag, "<thead class='xbbcode-thead'>", "</thead>"
}
simple_tag! {
    "Table row tag.",
    TableRowTag, "<tr class='xbbcode-tr'>", "</tr>"
}
simple_tag! {
    "An underline tag with no arguments.",
    UnderlineTag, "<span class='xbbcode-u'>", "</span>"
}

/// CSS named colours accepted by the colour tags, sorted.
pub const CSS_COLORS: &[&str] = &[
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue", "darkcyan",
    "darkgoldenrod", "darkgray", "darkgreen", "darkkhaki", "darkmagenta", "darkolivegreen",
    "darkorange", "darkorchid", "darkred", "darksalmon", "darkseagreen", "darkslateblue",
    "darkslategray", "darkturquoise", "darkviolet", "deeppink", "deepskyblue", "dimgray",
    "dodgerblue", "firebrick", "floralwhite", "forestgreen", "fuchsia", "gainsboro", "ghostwhite",
    "gold", "goldenrod", "gray", "green", "greenyellow", "honeydew", "hotpink", "indianred",
    "indigo", "ivory", "khaki", "lavender", "lavenderblush", "lawngreen", "lemonchiffon",
    "lightblue", "lightcoral", "lightcyan", "lightgoldenrodyellow", "lightgray", "lightgreen",
    "lightpink", "lightsalmon", "lightseagreen", "lightskyblue", "lightslategray",
    "lightsteelblue", "lightyellow", "lime", "limegreen", "linen", "magenta", "maroon",
    "mediumaquamarine", "mediumblue", "mediumorchid", "mediumpurple", "mediumseagreen",
    "mediumslateblue", "mediumspringgreen", "mediumturquoise", "mediumvioletred", "midnightblue",
    "mintcream", "mistyrose", "moccasin", "navajowhite", "navy", "oldlace", "olive", "olivedrab",
    "orange", "orangered", "orchid", "palegoldenrod", "palegreen", "paleturquoise",
    "palevioletred", "papayawhip", "peachpuff", "peru", "pink", "plum", "powderblue", "purple",
    "red", "rosybrown", "royalblue", "saddlebrown", "salmon", "sandybrown", "seagreen", "seashell",
    "sienna", "silver", "skyblue", "slateblue", "slategray", "snow", "springgreen", "steelblue",
    "tan", "teal", "thistle", "tomato", "turquoise", "violet", "wheat", "white", "whitesmoke",
    "yellow", "yellowgreen",
];

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static COLOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?[a-fA-F0-9]{6}$").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?|file|c):(?:/{1,3}|\\)[-a-zA-Z0-9:;@#%&()~_?+=/\\.]*$")
        .expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\s@]+@[^\s@]+\.[^\s@]+").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static FONT_FACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^(?:[a-z][a-z0-9_]+|"[a-z][a-z0-9_\s]+")$"#).expect("valid regex")
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").expect("valid regex"));

/// A CSS colour for the given value: a known colour name, or a six digit hex code (`#` optional).
pub fn css_color(value: &str) -> Option<Cow<'_, str>> {
    if CSS_COLORS.binary_search(&value).is_ok() {
        Some(Cow::Borrowed(value))
    } else if COLOR_CODE.is_match(value) {
        if value.starts_with('#') {
            Some(Cow::Borrowed(value))
        } else {
            Some(Cow::Owned(format!("#{value}")))
        }
    } else {
        None
    }
}

/// Whether the given value is a URL the link and image tags will emit.
pub fn is_safe_url(value: &str) -> bool {
    URL.is_match(value)
}

/// Text content of rendered HTML, i.e. with every tag removed.
fn strip_html(html: &str) -> Cow<'_, str> {
    HTML_TAG.replace_all(html, "")
}

fn attribute(value: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

/// `[color=red]`, falling back to black.
#[derive(Copy, Clone, Debug, Default)]
pub struct ColorTag;

impl HtmlTagWriter for ColorTag {
    fn open_tag(&self, params: &str, _: &str, out: &mut String) {
        let value = tag_argument(params).to_lowercase();
        let color = css_color(&value).unwrap_or(Cow::Borrowed("black"));
        out.push_str(&format!("<span style=\"color:{}\">", attribute(&color)));
    }

    fn close_tag(&self, _: &str, _: &str, out: &mut String) {
        out.push_str("</span>")
    }
}

/// `[large=color]` and `[small=color]`: a fixed text size with an optional colour, falling back to `inherit`.
#[derive(Copy, Clone, Debug)]
pub struct SizedColorTag {
    size: u32,
}

impl SizedColorTag {
    pub const LARGE: Self = Self { size: 36 };
    pub const SMALL: Self = Self { size: 10 };
}

impl HtmlTagWriter for SizedColorTag {
    fn open_tag(&self, params: &str, _: &str, out: &mut String) {
        let color = css_color(tag_argument(params)).unwrap_or(Cow::Borrowed("inherit"));
        out.push_str(&format!(
            "<span class=\"xbbcode-size-{}\" style=\"color:{}\">",
            self.size,
            attribute(&color)
        ));
    }

    fn close_tag(&self, _: &str, _: &str, out: &mut String) {
        out.push_str("</span>")
    }
}

/// `[size=N]` with `N` in `4..=40`, falling back to 14.
#[derive(Copy, Clone, Debug, Default)]
pub struct SizeTag;

impl SizeTag {
    pub const MIN: i64 = 4;
    pub const MAX: i64 = 40;
    pub const DEFAULT: i64 = 14;

    /// Leading integer of the argument, ignoring whatever follows it (`12px` is 12).
    fn leading_integer(value: &str) -> Option<i64> {
        let value = value.trim_start();
        let sign_len = usize::from(value.starts_with(['+', '-']));
        let digits = value[sign_len..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        value[..(sign_len + digits)].parse().ok()
    }
}

impl HtmlTagWriter for SizeTag {
    fn open_tag(&self, params: &str, _: &str, out: &mut String) {
        let size = Self::leading_integer(tag_argument(params))
            .filter(|x| (Self::MIN..=Self::MAX).contains(x))
            .unwrap_or(Self::DEFAULT);
        out.push_str(&format!("<span class=\"xbbcode-size-{size}\">"));
    }

    fn close_tag(&self, _: &str, _: &str, out: &mut String) {
        out.push_str("</span>")
    }
}

/// `[font=name]` and `[face=name]`, falling back to `inherit`.
#[derive(Copy, Clone, Debug, Default)]
pub struct FontFaceTag;

impl HtmlTagWriter for FontFaceTag {
    fn open_tag(&self, params: &str, _: &str, out: &mut String) {
        let face = Some(tag_argument(params))
            .filter(|x| FONT_FACE.is_match(x))
            .unwrap_or("inherit");
        out.push_str(&format!(
            "<span style=\"font-family:{}\">",
            attribute(face)
        ));
    }

    fn close_tag(&self, _: &str, _: &str, out: &mut String) {
        out.push_str("</span>")
    }
}

/// `[url]href[/url]` or `[url=href]text[/url]`. Anything that is not a plain http(s)/file URL becomes `#`.
#[derive(Copy, Clone, Debug, Default)]
pub struct UrlTag;

impl HtmlTagWriter for UrlTag {
    fn open_tag(&self, params: &str, content: &str, out: &mut String) {
        let url = if params.is_empty() {
            strip_html(content)
        } else {
            Cow::Borrowed(tag_argument(params))
        };
        let href = if is_safe_url(&url) { &*url } else { "#" };
        out.push_str(&format!("<a href=\"{}\">", attribute(href)));
    }

    fn close_tag(&self, _: &str, _: &str, out: &mut String) {
        out.push_str("</a>")
    }
}

/// `[email]address[/email]` or `[email=address]text[/email]`. Invalid addresses give a bare `<a>`.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmailTag;

impl HtmlTagWriter for EmailTag {
    fn open_tag(&self, params: &str, content: &str, out: &mut String) {
        let email = if params.is_empty() {
            strip_html(content)
        } else {
            Cow::Borrowed(tag_argument(params))
        };

        if EMAIL.is_match(&email) {
            out.push_str(&format!("<a href=\"mailto:{}\">", attribute(&email)));
        } else {
            out.push_str("<a>");
        }
    }

    fn close_tag(&self, _: &str, _: &str, out: &mut String) {
        out.push_str("</a>")
    }
}

/// `[img]src[/img]`. The content is the image source and is not displayed; invalid sources are emptied.
#[derive(Copy, Clone, Debug, Default)]
pub struct ImageTag;

impl HtmlTagWriter for ImageTag {
    fn open_tag(&self, _: &str, content: &str, out: &mut String) {
        let src = if is_safe_url(content) { content } else { "" };
        out.push_str(&format!("<img src=\"{}\" />", attribute(src)));
    }

    fn close_tag(&self, _: &str, _: &str, _: &mut String) {}
}

const LISTS: [&str; 3] = ["list", "ul", "ol"];
const TABLE_SECTIONS: [&str; 3] = ["tbody", "thead", "tfoot"];

/// Returns every built-in tag, with its structural restrictions.
/// # Included tags
/// `*`, `b`, `bbcode`, `center`, `code`, `color`, `email`, `face`, `font`, `i`, `img`, `justify`,
/// `large`, `left`, `li`, `list`, `noparse`, `ol`, `php`, `quote`, `right`, `s`, `size`, `small`,
/// `sub`, `sup`, `table`, `tbody`, `td`, `tfoot`, `th`, `thead`, `tr`, `u`, `ul`, `url`.
///
/// `code`, `noparse` and `php` are opaque.
pub fn all_tags() -> Vec<TagDefinition> {
    vec![
        TagDefinition::new(LIST_ITEM, ListItemTag).allow_parents(LISTS),
        TagDefinition::new("b", BoldTag),
        TagDefinition::new("bbcode", PassthroughTag),
        TagDefinition::new("center", CenterTag),
        TagDefinition::new("code", CodeTag).opaque(),
        TagDefinition::new("color", ColorTag),
        TagDefinition::new("email", EmailTag),
        TagDefinition::new("face", FontFaceTag),
        TagDefinition::new("font", FontFaceTag),
        TagDefinition::new("i", ItalicTag),
        TagDefinition::new("img", ImageTag).hide_content(),
        TagDefinition::new("justify", JustifyTag),
        TagDefinition::new("large", SizedColorTag::LARGE),
        TagDefinition::new("left", LeftTag),
        TagDefinition::new("li", ListItemTag).allow_parents(LISTS),
        TagDefinition::new("list", UnorderedListTag).allow_children([LIST_ITEM, "li"]),
        TagDefinition::new("noparse", PassthroughTag).opaque(),
        TagDefinition::new("ol", OrderedListTag).allow_children([LIST_ITEM, "li"]),
        TagDefinition::new("php", CodeTag).opaque(),
        TagDefinition::new("quote", BlockQuoteTag),
        TagDefinition::new("right", RightTag),
        TagDefinition::new("s", StrikeTag),
        TagDefinition::new("size", SizeTag),
        TagDefinition::new("small", SizedColorTag::SMALL),
        TagDefinition::new("sub", SubscriptTag),
        TagDefinition::new("sup", SuperscriptTag),
        TagDefinition::new("table", TableTag).allow_children(TABLE_SECTIONS).allow_children(["tr"]),
        TagDefinition::new("tbody", TableBodyTag)
            .allow_children(["tr"])
            .allow_parents(["table"]),
        TagDefinition::new("td", TableCellTag).allow_parents(["tr"]),
        TagDefinition::new("tfoot", TableFootTag)
            .allow_children(["tr"])
            .allow_parents(["table"]),
        TagDefinition::new("th", TableHeaderCellTag).allow_parents(["tr"]),
        TagDefinition::new("thead", TableHeadTag)
            .allow_children(["tr"])
            .allow_parents(["table"]),
        TagDefinition::new("tr", TableRowTag)
            .allow_children(["td", "th"])
            .allow_parents(["table"])
            .allow_parents(TABLE_SECTIONS),
        TagDefinition::new("u", UnderlineTag),
        TagDefinition::new("ul", UnorderedListTag).allow_children([LIST_ITEM, "li"]),
        TagDefinition::new("url", UrlTag),
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn open(writer: &dyn HtmlTagWriter, params: &str, content: &str) -> String {
        let mut out = String::new();
        writer.open_tag(params, content, &mut out);
        out
    }

    #[test]
    fn colors_are_sorted() {
        assert!(CSS_COLORS.windows(2).all(|x| x[0] < x[1]));
    }

    #[rstest]
    #[case("=red", "<span style=\"color:red\">")]
    #[case("=RED", "<span style=\"color:red\">")]
    #[case("=ff0000", "<span style=\"color:#ff0000\">")]
    #[case("=#00FF00", "<span style=\"color:#00ff00\">")]
    #[case("=notacolor", "<span style=\"color:black\">")]
    #[case("=red;background:url(x)", "<span style=\"color:black\">")]
    #[case("", "<span style=\"color:black\">")]
    fn color(#[case] params: &str, #[case] expected: &str) {
        assert_eq!(open(&ColorTag, params, ""), expected);
    }

    #[rstest]
    #[case("=blue", "<span class=\"xbbcode-size-36\" style=\"color:blue\">")]
    #[case("=Blue", "<span class=\"xbbcode-size-36\" style=\"color:inherit\">")]
    #[case("", "<span class=\"xbbcode-size-36\" style=\"color:inherit\">")]
    fn large(#[case] params: &str, #[case] expected: &str) {
        assert_eq!(open(&SizedColorTag::LARGE, params, ""), expected);
    }

    #[rstest]
    #[case("=12", 12)]
    #[case("=12px", 12)]
    #[case("=4", 4)]
    #[case("=40", 40)]
    #[case("=3", 14)]
    #[case("=41", 14)]
    #[case("=-5", 14)]
    #[case("=huge", 14)]
    #[case("", 14)]
    fn size(#[case] params: &str, #[case] expected: i64) {
        assert_eq!(
            open(&SizeTag, params, ""),
            format!("<span class=\"xbbcode-size-{expected}\">")
        );
    }

    #[rstest]
    #[case("=arial", "arial")]
    #[case("=\"times new roman\"", "&quot;times new roman&quot;")]
    #[case("=a", "inherit")]
    #[case("=x;color:red", "inherit")]
    fn font_face(#[case] params: &str, #[case] family: &str) {
        assert_eq!(
            open(&FontFaceTag, params, ""),
            format!("<span style=\"font-family:{family}\">")
        );
    }

    #[rstest]
    #[case("", "http://example.com/a?b=c", "<a href=\"http://example.com/a?b=c\">")]
    #[case("=https://example.com", "text", "<a href=\"https://example.com\">")]
    #[case("", "<span class='xbbcode-b'>http://x.io</span>", "<a href=\"http://x.io\">")]
    #[case("", "javascript:alert(1)", "<a href=\"#\">")]
    #[case("=javascript:alert(1)", "x", "<a href=\"#\">")]
    #[case("=http://x.io\" onclick=\"y", "x", "<a href=\"#\">")]
    fn url(#[case] params: &str, #[case] content: &str, #[case] expected: &str) {
        assert_eq!(open(&UrlTag, params, content), expected);
    }

    #[test]
    fn email() {
        assert_eq!(
            open(&EmailTag, "", "me@example.com"),
            "<a href=\"mailto:me@example.com\">"
        );
        assert_eq!(open(&EmailTag, "=nobody", "x"), "<a>");
        assert_eq!(
            open(&EmailTag, "=a\"b@c.d", "x"),
            "<a href=\"mailto:a&quot;b@c.d\">"
        );
    }

    #[test]
    fn image() {
        assert_eq!(
            open(&ImageTag, "", "http://x.io/a.png"),
            "<img src=\"http://x.io/a.png\" />"
        );
        assert_eq!(open(&ImageTag, "", "data:image/png"), "<img src=\"\" />");
    }
}
