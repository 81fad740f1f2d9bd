use pretty_assertions::assert_eq;
use rstest::rstest;
use vaultsync_content::html::html_to_markdown;
use vaultsync_content::plain::markdown_to_plain_text;
use vaultsync_content::{DocsMarkdownConverter, FormatConverter};

#[test]
fn strips_head_style_and_script() {
    let html = r#"<html><head><meta charset="utf-8"><title>Doc</title></head>
<body><style>.c1{color:red}</style><script>alert(1)</script><p>Body</p></body></html>"#;
    assert_eq!(html_to_markdown(html), "Body");
}

#[test]
fn converts_headings_and_paragraphs() {
    let html = "<h1>Title</h1><p>First paragraph.</p><h2 id=\"x\">Section</h2><p>Second.</p>";
    assert_eq!(
        html_to_markdown(html),
        "# Title\n\nFirst paragraph.\n\n## Section\n\nSecond."
    );
}

#[test]
fn converts_class_based_bold_and_italic() {
    let html = concat!(
        "<style>.c4{font-weight:700}.c5{font-style:italic}</style>",
        "<p><span class=\"c0\">plain </span><span class=\"c4\">bold</span>",
        "<span class=\"c0\"> and </span><span class=\"c5\">italic</span></p>"
    );
    assert_eq!(html_to_markdown(html), "plain **bold** and *italic*");
}

#[test]
fn converts_inline_tags_and_links() {
    let html = concat!(
        "<p><b>B</b> <em>E</em> ",
        "<a href=\"https://www.google.com/url?q=https://example.com&amp;sa=D\">site</a>",
        "<a href=\"https://example.com/empty\"></a></p>"
    );
    assert_eq!(html_to_markdown(html), "**B** *E* [site](https://example.com)");
}

#[test]
fn rebuilds_nested_lists_from_margins() {
    let html = concat!(
        "<p>Intro</p>",
        "<ul class=\"lst-kix_a-0\"><li style=\"margin-left:36pt\"><span>one</span></li>",
        "<li style=\"margin-left:36pt\"><span>two</span></li></ul>",
        "<ul class=\"lst-kix_a-1\"><li style=\"margin-left:72pt\"><span>two.a</span></li></ul>",
        "<ul class=\"lst-kix_a-0\"><li style=\"margin-left:36pt\"><span>three</span></li></ul>",
        "<p>Outro</p>"
    );
    assert_eq!(
        html_to_markdown(html),
        "Intro\n\n- one\n- two\n    - two.a\n- three\n\nOutro"
    );
}

#[test]
fn ordered_lists_use_one_dot() {
    let html = "<ol><li>first</li><li>second</li></ol>";
    assert_eq!(html_to_markdown(html), "1. first\n1. second");
}

#[test]
fn decodes_entities_and_drops_invisible_characters() {
    let html = "<p>Fish &amp; chips&nbsp;&lt;3\u{200b}\u{feff}</p>";
    assert_eq!(html_to_markdown(html), "Fish & chips <3");
}

#[test]
fn collapses_blank_runs() {
    let html = "<p>a</p><p></p><p></p><p>b</p>";
    assert_eq!(html_to_markdown(html), "a\n\nb");
}

#[rstest]
#[case("# Title\n\nBody", "Title\n\nBody")]
#[case("**bold** and __strong__", "bold and strong")]
#[case("*it* and _also_ but snake_case_name", "it and also but snake_case_name")]
#[case("see [site](https://example.com)", "see site")]
#[case("see [[Note]] and [[Other|alias]]", "see Note and alias")]
#[case("- a\n    - b\n1. c", "a\n    b\nc")]
#[case("\tindented", "indented")]
#[case("use `code` here", "use code here")]
#[case("before\n```\nlet x = 1;\n```\nafter", "before\n\nafter")]
#[case("---\ntags: [a]\n---\nBody", "Body")]
fn markdown_to_plain_text_cases(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(markdown_to_plain_text(input), expected);
}

#[test]
fn converter_round_trip_is_lossy_but_stable() {
    let conv = DocsMarkdownConverter::new();
    let plain = conv.to_source_format("# Title\n\n- **item**").unwrap();
    assert_eq!(plain, "Title\n\nitem");

    let raw = b"<p>Title</p><p>item</p>";
    let first = conv.to_plain_text(raw).unwrap();
    let second = conv.to_plain_text(raw).unwrap();
    assert_eq!(first, second);
}
