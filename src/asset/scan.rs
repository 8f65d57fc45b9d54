//! Fragment scanner: extract `style`/`link`/`script` elements from markup.
//!
//! The scanner is deliberately lenient. It understands just enough HTML to
//! find start tags, end tags, comments and raw-text bodies, and keeps a
//! single "current element" slot rather than a stack:
//!
//! - a start tag of interest takes the slot, so the innermost open element
//!   claims all intervening text (same-named nesting is not supported)
//! - a closing tag only clears the slot when it matches the current element;
//!   unmatched closing tags are ignored
//! - `script`/`style` bodies are raw text and are never scanned for tags,
//!   even when the element itself is not of interest
//!
//! Content is opaque: nothing inside a body is interpreted.

use crate::utils::html::{is_raw_text_element, is_void_element, parse_attributes};

/// Element kinds the asset pipeline cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Style,
    Link,
    Script,
}

impl FragmentKind {
    /// Stylesheet-related elements.
    pub const CSS: &'static [Self] = &[Self::Style, Self::Link];
    /// Script elements.
    pub const JS: &'static [Self] = &[Self::Script];

    /// Parse a lowercase tag name.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "style" => Some(Self::Style),
            "link" => Some(Self::Link),
            "script" => Some(Self::Script),
            _ => None,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Link => "link",
            Self::Script => "script",
        }
    }
}

/// Order-preserving attribute map.
///
/// A repeated attribute overwrites the earlier value but keeps the position
/// of its first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn insert(&mut self, name: String, value: String) {
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

}

impl FromIterator<(String, String)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut attrs = Self::default();
        for (name, value) in iter {
            attrs.insert(name, value);
        }
        attrs
    }
}

/// One scanned element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub attributes: Attributes,
    /// Body text, if the element had a non-empty one.
    pub inline_text: Option<String>,
    /// Position among the scanned fragments.
    pub index: usize,
}

impl Fragment {
    #[inline]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }
}

/// Scan `markup` for elements of the given kinds, in document order.
pub fn scan_fragments(markup: &str, kinds: &[FragmentKind]) -> Vec<Fragment> {
    let mut scanner = Scanner {
        src: markup,
        pos: 0,
        kinds,
        fragments: Vec::new(),
        current: None,
    };
    scanner.run();
    scanner.fragments
}

// ============================================================================
// Scanner
// ============================================================================

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    kinds: &'a [FragmentKind],
    fragments: Vec<Fragment>,
    /// Single-slot cursor: fragment index and tag of the open element.
    current: Option<(usize, &'static str)>,
}

/// A parsed start tag.
struct StartTag<'a> {
    name: String,
    attrs: &'a str,
    self_closing: bool,
    /// Byte length of the whole tag, `<` through `>`.
    len: usize,
}

impl<'a> Scanner<'a> {
    fn run(&mut self) {
        let src = self.src;
        while let Some(offset) = src[self.pos..].find('<') {
            let lt = self.pos + offset;
            self.push_text(lt);
            let rest = &src[lt..];

            if rest.starts_with("<!--") {
                self.pos = find_end(src, lt + 4, "-->");
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.pos = find_end(src, lt + 2, ">");
            } else if let Some(name) = rest.strip_prefix("</") {
                let tag = tag_name(name).to_ascii_lowercase();
                self.pos = find_end(src, lt + 2, ">");
                self.close(&tag);
            } else if let Some(tag) = parse_start_tag(rest) {
                self.pos = lt + tag.len;
                self.open(tag);
            } else {
                // Stray `<` is text
                self.pos = lt + 1;
                self.push_text_range(lt, lt + 1);
            }
        }
        self.push_text(src.len());
    }

    fn open(&mut self, tag: StartTag<'a>) {
        let kind = FragmentKind::from_tag(&tag.name).filter(|k| self.kinds.contains(k));

        if let Some(kind) = kind {
            let index = self.fragments.len();
            self.fragments.push(Fragment {
                kind,
                attributes: parse_attributes(tag.attrs).into_iter().collect(),
                inline_text: None,
                index,
            });
            if !tag.self_closing && !is_void_element(&tag.name) {
                self.current = Some((index, kind.tag()));
            }
        }

        // Raw text bodies run to their closing tag without tag recognition
        if !tag.self_closing && is_raw_text_element(&tag.name) {
            let end = find_close_tag(self.src, self.pos, &tag.name);
            if kind.is_some() {
                self.push_text(end);
            }
            self.pos = end;
        }
    }

    fn close(&mut self, tag: &str) {
        if self.current.is_some_and(|(_, open)| open == tag) {
            self.current = None;
        }
    }

    /// Append text from `self.pos` to `end` to the current element.
    fn push_text(&mut self, end: usize) {
        self.push_text_range(self.pos, end);
    }

    fn push_text_range(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        if let Some((index, _)) = self.current {
            let text = &self.src[start..end];
            self.fragments[index]
                .inline_text
                .get_or_insert_with(String::new)
                .push_str(text);
        }
    }
}

/// Parse a start tag at the beginning of `s` (which starts with `<`).
fn parse_start_tag(s: &str) -> Option<StartTag<'_>> {
    let body = &s[1..];
    if !body.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let name = tag_name(body);
    let after_name = 1 + name.len();
    let close = find_tag_end(s, after_name)?;

    let inner = &s[after_name..close];
    let self_closing = inner.trim_end().ends_with('/');
    let attrs = inner.trim_end().trim_end_matches('/');

    Some(StartTag {
        name: name.to_ascii_lowercase(),
        attrs,
        self_closing,
        len: close + 1,
    })
}

/// Leading tag-name characters of `s`.
fn tag_name(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(s.len());
    &s[..end]
}

/// Index of the `>` closing a tag, skipping quoted attribute values.
fn find_tag_end(s: &str, from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, b) in s.bytes().enumerate().skip(from) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

/// Position just past `marker` at or after `from`, or end of input.
fn find_end(s: &str, from: usize, marker: &str) -> usize {
    s.get(from..)
        .and_then(|rest| rest.find(marker))
        .map_or(s.len(), |i| from + i + marker.len())
}

/// Start of `</name` (case-insensitive) at or after `from`, or end of input.
fn find_close_tag(s: &str, from: usize, name: &str) -> usize {
    let bytes = s.as_bytes();
    let needle_len = 2 + name.len();
    let mut i = from;
    while let Some(offset) = s[i..].find("</") {
        let start = i + offset;
        let candidate = &bytes[start + 2..(start + needle_len).min(bytes.len())];
        if candidate.eq_ignore_ascii_case(name.as_bytes()) {
            let next = bytes.get(start + needle_len).copied();
            if next.is_none_or(|b| b == b'>' || b == b'/' || b.is_ascii_whitespace()) {
                return start;
            }
        }
        i = start + 2;
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_css_in_document_order() {
        let markup = r#"
            <link rel="stylesheet" href="/a.css">
            <style>body { color: red; }</style>
            <link rel="stylesheet" href="/b.css" media="print" />
        "#;
        let frags = scan_fragments(markup, FragmentKind::CSS);

        assert_eq!(frags.len(), 3);
        assert_eq!(frags[0].kind, FragmentKind::Link);
        assert_eq!(frags[0].attr("href"), Some("/a.css"));
        assert_eq!(frags[0].inline_text, None);
        assert_eq!(frags[1].kind, FragmentKind::Style);
        assert_eq!(frags[1].inline_text.as_deref(), Some("body { color: red; }"));
        assert_eq!(frags[2].attr("media"), Some("print"));
        assert_eq!(
            frags.iter().map(|f| f.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_scan_filters_kinds() {
        let markup = r#"<script src="/a.js"></script><style>a{}</style>"#;
        let js = scan_fragments(markup, FragmentKind::JS);
        assert_eq!(js.len(), 1);
        assert_eq!(js[0].attr("src"), Some("/a.js"));
        assert_eq!(js[0].inline_text, None);

        let css = scan_fragments(markup, FragmentKind::CSS);
        assert_eq!(css.len(), 1);
        assert_eq!(css[0].index, 0);
    }

    #[test]
    fn test_scan_script_body_is_raw_text() {
        let markup = r#"<script>if (a < b) { document.write("<link rel='x'></div>"); }</script>"#;
        let frags = scan_fragments(markup, FragmentKind::JS);
        assert_eq!(frags.len(), 1);
        assert_eq!(
            frags[0].inline_text.as_deref(),
            Some(r#"if (a < b) { document.write("<link rel='x'></div>"); }"#)
        );

        // Tags inside a script body are invisible to the CSS scan too
        assert!(scan_fragments(markup, FragmentKind::CSS).is_empty());
    }

    #[test]
    fn test_scan_case_insensitive_tags() {
        let markup = "<STYLE MEDIA=screen>a{}</Style><LINK REL=stylesheet HREF=/x.css>";
        let frags = scan_fragments(markup, FragmentKind::CSS);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].attr("media"), Some("screen"));
        assert_eq!(frags[0].inline_text.as_deref(), Some("a{}"));
        assert_eq!(frags[1].attr("href"), Some("/x.css"));
    }

    #[test]
    fn test_scan_duplicate_attributes_overwrite() {
        let frags = scan_fragments(r#"<link href="/a.css" rel="stylesheet" href="/b.css">"#, FragmentKind::CSS);
        let names: Vec<_> = frags[0].attributes.0.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["href", "rel"]);
        assert_eq!(frags[0].attr("href"), Some("/b.css"));
    }

    #[test]
    fn test_scan_quoted_gt_in_attribute() {
        let frags = scan_fragments(r#"<link rel="stylesheet" media="(min-width>600px)" href="/a.css">"#, FragmentKind::CSS);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].attr("media"), Some("(min-width>600px)"));
        assert_eq!(frags[0].attr("href"), Some("/a.css"));
    }

    #[test]
    fn test_scan_skips_comments() {
        let markup = "<!-- <style>hidden{}</style> --><style>shown{}</style>";
        let frags = scan_fragments(markup, FragmentKind::CSS);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].inline_text.as_deref(), Some("shown{}"));
    }

    #[test]
    fn test_scan_lenient_malformed_input() {
        // Unmatched closing tag is ignored, stray `<` is text
        let markup = "</style></script> a < b <script>x()</script>";
        let frags = scan_fragments(markup, FragmentKind::JS);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].inline_text.as_deref(), Some("x()"));

        // Unterminated raw text claims the rest of the input
        let frags = scan_fragments("<script>tail()", FragmentKind::JS);
        assert_eq!(frags[0].inline_text.as_deref(), Some("tail()"));
    }

    #[test]
    fn test_scan_empty_and_self_closing_bodies() {
        let frags = scan_fragments("<style></style><script src='/a.js'/>", &[FragmentKind::Style, FragmentKind::Script]);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].inline_text, None);
        assert_eq!(frags[1].inline_text, None);
    }

    #[test]
    fn test_scan_close_tag_prefix_is_not_a_match() {
        let frags = scan_fragments("<script>var s = '</scripts>';</script>", FragmentKind::JS);
        assert_eq!(frags[0].inline_text.as_deref(), Some("var s = '</scripts>';"));
    }

    #[test]
    fn test_attributes_from_iter() {
        let attrs: Attributes = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "3".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(attrs.0.len(), 2);
        assert_eq!(attrs.get("a"), Some("3"));
        assert_eq!(attrs.get("b"), Some("2"));
    }
}
