//! HTML export to Markdown
//!
//! Word-processor HTML exports are flat: formatting lives in inline `style`
//! attributes and every nesting level of a list is its own `<ul>` with a
//! `margin-left`. The conversion is a sequence of regex passes, inline
//! formatting first, then block structure, then tag stripping and cleanup.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static NON_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<head[^>]*>.*?</head>|<style[^>]*>.*?</style>|<script[^>]*>.*?</script>")
        .unwrap()
});
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>(.*?)</style>").unwrap());
static CSS_CLASS_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.([A-Za-z0-9_-]+)\s*\{([^}]*)\}").unwrap());
static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="([^"]*)""#).unwrap());
static SOURCE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n\t]+").unwrap());
static SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<span([^>]*)>(.*?)</span>").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:b|strong)(?:\s[^>]*)?>(.*?)</(?:b|strong)>").unwrap()
});
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(?:i|em)(?:\s[^>]*)?>(.*?)</(?:i|em)>").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(ul|ol)(?:\s[^>]*)?>(.*?)</(?:ul|ol)>").unwrap());
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li([^>]*)>(.*?)</li>").unwrap());
static MARGIN_LEFT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"margin-left:\s*(\d+(?:\.\d+)?)pt").unwrap());
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])(?:\s[^>]*)?>(.*?)</h[1-6]>").unwrap());
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p>").unwrap());
static DIV: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</?div[^>]*>").unwrap());
static RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<hr[^>]*>").unwrap());
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static INNER_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static EMPTY_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\]\([^)]*\)").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Points of `margin-left` per list nesting level in exports.
const LIST_INDENT_PT: f64 = 36.0;
/// Obsidian expects four spaces per nested list level.
const MARKDOWN_INDENT: &str = "    ";
const GOOGLE_REDIRECT: &str = "https://www.google.com/url?q=";

/// Convert an HTML export into Markdown.
pub fn html_to_markdown(html: &str) -> String {
    let classes = ClassStyles::from_stylesheets(html);
    let html = NON_CONTENT.replace_all(html, "");
    let html = SOURCE_WHITESPACE.replace_all(&html, " ");

    let html = SPAN.replace_all(&html, |caps: &Captures| {
        let attrs = &caps[1];
        let style = attrs.to_ascii_lowercase().replace(' ', "");
        let mut inner = caps[2].to_string();
        if is_italic(&style) || classes.any_italic(attrs) {
            inner = wrap(&inner, "*");
        }
        if is_bold(&style) || classes.any_bold(attrs) {
            inner = wrap(&inner, "**");
        }
        inner
    });
    let html = BOLD.replace_all(&html, |caps: &Captures| wrap(&caps[1], "**"));
    let html = ITALIC.replace_all(&html, |caps: &Captures| wrap(&caps[1], "*"));
    let html = LINK.replace_all(&html, |caps: &Captures| {
        let text = inline_text(&caps[2]);
        if text.is_empty() {
            String::new()
        } else {
            format!("[{}]({})", text, unwrap_redirect(&caps[1]))
        }
    });
    let html = LINE_BREAK.replace_all(&html, "\n");

    let html = LIST.replace_all(&html, |caps: &Captures| {
        let bullet = if caps[1].eq_ignore_ascii_case("ol") { "1." } else { "-" };
        // Items are newline-prefixed so consecutive per-level blocks join
        // into one list.
        let mut out = String::new();
        for item in LIST_ITEM.captures_iter(&caps[2]) {
            let level = list_level(&item[1]);
            let text = inline_text(&item[2]);
            out.push('\n');
            out.push_str(&MARKDOWN_INDENT.repeat(level));
            out.push_str(bullet);
            out.push(' ');
            out.push_str(&text);
        }
        out
    });
    let html = HEADING.replace_all(&html, |caps: &Captures| {
        let text = inline_text(&caps[2]);
        if text.is_empty() {
            return String::new();
        }
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), text)
    });
    let html = PARAGRAPH.replace_all(&html, "\n\n$1\n\n");
    let html = RULE.replace_all(&html, "\n\n---\n\n");
    let html = DIV.replace_all(&html, "\n");
    let text = ANY_TAG.replace_all(&html, "");

    let text = html_escape::decode_html_entities(&text)
        .replace(['\u{200b}', '\u{feff}'], "")
        .replace('\u{a0}', " ");

    let text = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let text = EMPTY_LINK.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Class names the export's stylesheets declare as bold or italic.
#[derive(Debug, Default)]
struct ClassStyles {
    bold: Vec<String>,
    italic: Vec<String>,
}

impl ClassStyles {
    fn from_stylesheets(html: &str) -> Self {
        let mut styles = Self::default();
        for block in STYLE_BLOCK.captures_iter(html) {
            for rule in CSS_CLASS_RULE.captures_iter(&block[1]) {
                let body = rule[2].to_ascii_lowercase().replace(' ', "");
                if is_bold(&body) {
                    styles.bold.push(rule[1].to_string());
                }
                if is_italic(&body) {
                    styles.italic.push(rule[1].to_string());
                }
            }
        }
        styles
    }

    fn any_bold(&self, attrs: &str) -> bool {
        Self::has_any(&self.bold, attrs)
    }

    fn any_italic(&self, attrs: &str) -> bool {
        Self::has_any(&self.italic, attrs)
    }

    fn has_any(names: &[String], attrs: &str) -> bool {
        if names.is_empty() {
            return false;
        }
        CLASS_ATTR
            .captures(attrs)
            .map(|c| c[1].split_whitespace().any(|cls| names.iter().any(|n| n == cls)))
            .unwrap_or(false)
    }
}

fn is_bold(declarations: &str) -> bool {
    declarations.contains("font-weight:700") || declarations.contains("font-weight:bold")
}

fn is_italic(declarations: &str) -> bool {
    declarations.contains("font-style:italic")
}

/// Nesting level of a list item from its inline style, 0 for top level.
fn list_level(attrs: &str) -> usize {
    MARGIN_LEFT
        .captures(attrs)
        .and_then(|c| c[1].parse::<f64>().ok())
        .map(|pt| ((pt / LIST_INDENT_PT).floor() as usize).saturating_sub(1))
        .unwrap_or(0)
}

/// Text of an inline fragment with tags removed and whitespace collapsed.
fn inline_text(fragment: &str) -> String {
    let stripped = ANY_TAG.replace_all(fragment, "");
    INNER_WHITESPACE
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// Surround the trimmed fragment with `marker`, keeping outer whitespace
/// outside the markers so the emphasis stays valid Markdown.
fn wrap(fragment: &str, marker: &str) -> String {
    let trimmed = fragment.trim();
    if trimmed.is_empty() {
        return fragment.to_string();
    }
    let lead = &fragment[..fragment.len() - fragment.trim_start().len()];
    let trail = &fragment[fragment.trim_end().len()..];
    format!("{lead}{marker}{trimmed}{marker}{trail}")
}

fn unwrap_redirect(href: &str) -> String {
    let href = html_escape::decode_html_entities(href);
    match href.strip_prefix(GOOGLE_REDIRECT) {
        Some(rest) => rest.split('&').next().unwrap_or(rest).to_string(),
        None => href.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_level_from_margin() {
        assert_eq!(list_level(""), 0);
        assert_eq!(list_level(r#" style="margin-left:36pt""#), 0);
        assert_eq!(list_level(r#" style="margin-left: 72pt;padding:0""#), 1);
        assert_eq!(list_level(r#" style="margin-left:108.5pt""#), 2);
    }

    #[test]
    fn stylesheet_classes_are_detected() {
        let html = "<style>.c1{font-weight:700}.c2{font-style:italic;color:#000}.c3{color:red}</style>";
        let styles = ClassStyles::from_stylesheets(html);
        assert!(styles.any_bold(r#" class="c3 c1""#));
        assert!(styles.any_italic(r#" class="c2""#));
        assert!(!styles.any_bold(r#" class="c3""#));
    }

    #[test]
    fn wrap_keeps_outer_whitespace() {
        assert_eq!(wrap(" bold ", "**"), " **bold** ");
        assert_eq!(wrap("   ", "**"), "   ");
    }

    #[test]
    fn redirect_links_are_unwrapped() {
        assert_eq!(
            unwrap_redirect("https://www.google.com/url?q=https://example.com/a&amp;sa=D"),
            "https://example.com/a"
        );
        assert_eq!(unwrap_redirect("https://example.com"), "https://example.com");
    }
}
