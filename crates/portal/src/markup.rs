//! Tolerant HTML reader: just enough tree to select rows and cells.
//!
//! Handles the shapes the portal actually serves: unquoted / single-quoted
//! attributes, omitted `</td>` and `</tr>`, void elements, comments,
//! doctype, and raw-text elements (`script`, `style`).  Unknown closing
//! tags are ignored; unclosed elements are closed at end of input.

use std::sync::OnceLock;

use regex::Regex;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tree
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug)]
enum NodeKind {
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    children: Vec<usize>,
}

/// A parsed markup document.  Node 0 is the synthetic root.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

/// Borrowed handle to an element (or the root) of a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    id: usize,
}

impl Document {
    pub fn parse(input: &str) -> Self {
        let mut builder = TreeBuilder::new();
        builder.feed(input);
        builder.doc
    }

    pub fn root(&self) -> Element<'_> {
        Element { doc: self, id: 0 }
    }

    /// All elements matching `pred`, in document order.
    pub fn select<F>(&self, pred: F) -> Vec<Element<'_>>
    where
        F: Fn(&Element<'_>) -> bool,
    {
        self.root().descendants().filter(|e| pred(e)).collect()
    }
}

impl<'a> Element<'a> {
    fn node(&self) -> &'a Node {
        &self.doc.nodes[self.id]
    }

    /// Lowercased tag name; empty for the root.
    pub fn name(&self) -> &'a str {
        match &self.node().kind {
            NodeKind::Element { name, .. } => name,
            _ => "",
        }
    }

    pub fn attr(&self, key: &str) -> Option<&'a str> {
        match &self.node().kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Substring test on the raw `class` attribute.
    pub fn class_contains(&self, fragment: &str) -> bool {
        self.attr("class").is_some_and(|c| c.contains(fragment))
    }

    pub fn is(&self, tag: &str) -> bool {
        self.name() == tag
    }

    /// Descendant elements in pre-order, excluding `self`.
    pub fn descendants(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        let doc = self.doc;
        let mut pending: Vec<usize> = self.node().children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            while let Some(id) = pending.pop() {
                let node = &doc.nodes[id];
                pending.extend(node.children.iter().rev().copied());
                if matches!(node.kind, NodeKind::Element { .. }) {
                    return Some(Element { doc, id });
                }
            }
            None
        })
    }

    /// Direct text children, in order.  Whitespace-only nodes are kept.
    pub fn own_texts(&self) -> impl Iterator<Item = &'a str> + 'a {
        let doc = self.doc;
        self.node()
            .children
            .iter()
            .filter_map(move |&id| match &doc.nodes[id].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
    }

    /// Text nodes of the subtree in document order, each paired with the
    /// element that directly contains it.
    pub fn texts(&self) -> impl Iterator<Item = (Element<'a>, &'a str)> + 'a {
        let doc = self.doc;
        let top = self.id;
        let mut pending: Vec<(usize, usize)> =
            self.node().children.iter().rev().map(|&c| (top, c)).collect();
        std::iter::from_fn(move || {
            while let Some((parent, id)) = pending.pop() {
                let node = &doc.nodes[id];
                if let NodeKind::Text(t) = &node.kind {
                    return Some((Element { doc, id: parent }, t.as_str()));
                }
                pending.extend(node.children.iter().rev().map(|&c| (id, c)));
            }
            None
        })
    }

    /// Concatenated text of the whole subtree.
    pub fn text(&self) -> String {
        let mut out = String::new();
        let mut pending = vec![self.id];
        while let Some(id) = pending.pop() {
            let node = &self.doc.nodes[id];
            if let NodeKind::Text(t) = &node.kind {
                out.push_str(t);
            }
            pending.extend(node.children.iter().rev().copied());
        }
        out
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tree builder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct TreeBuilder {
    doc: Document,
    /// Open elements; index 0 is always the root.
    open: Vec<usize>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            doc: Document {
                nodes: vec![Node {
                    kind: NodeKind::Root,
                    children: Vec::new(),
                }],
            },
            open: vec![0],
        }
    }

    fn current(&self) -> usize {
        *self.open.last().unwrap_or(&0)
    }

    fn append(&mut self, kind: NodeKind) -> usize {
        let id = self.doc.nodes.len();
        self.doc.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        let parent = self.current();
        self.doc.nodes[parent].children.push(id);
        id
    }

    fn text(&mut self, raw: &str) {
        if !raw.is_empty() {
            self.append(NodeKind::Text(decode_entities(raw)));
        }
    }

    fn open_name(&self, idx: usize) -> &str {
        match &self.doc.nodes[self.open[idx]].kind {
            NodeKind::Element { name, .. } => name,
            _ => "",
        }
    }

    /// Pop back to (and including) the innermost open `name`, unless a
    /// `boundary` element is hit first.
    fn close_within(&mut self, names: &[&str], boundary: &[&str]) {
        for idx in (1..self.open.len()).rev() {
            let open = self.open_name(idx);
            if names.contains(&open) {
                self.open.truncate(idx);
                return;
            }
            if boundary.contains(&open) {
                return;
            }
        }
    }

    fn start_tag(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        match name.as_str() {
            "td" | "th" => self.close_within(&["td", "th"], &["tr", "table"]),
            "tr" => self.close_within(&["tr"], &["table", "tbody", "thead", "tfoot"]),
            "tbody" | "thead" | "tfoot" => {
                self.close_within(&["tbody", "thead", "tfoot"], &["table"])
            }
            _ => {}
        }
        let void = VOID_ELEMENTS.contains(&name.as_str());
        let id = self.append(NodeKind::Element { name, attrs });
        if !void && !self_closing {
            self.open.push(id);
        }
    }

    fn end_tag(&mut self, name: &str) {
        if let Some(idx) = (1..self.open.len()).rev().find(|&i| self.open_name(i) == name) {
            self.open.truncate(idx);
        }
    }

    fn feed(&mut self, input: &str) {
        let mut pos = 0;
        while pos < input.len() {
            let Some(rel) = input[pos..].find('<') else {
                self.text(&input[pos..]);
                break;
            };
            let lt = pos + rel;
            self.text(&input[pos..lt]);
            let rest = &input[lt..];

            if rest.starts_with("<!--") {
                pos = rest.find("-->").map_or(input.len(), |end| lt + end + 3);
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                pos = rest.find('>').map_or(input.len(), |end| lt + end + 1);
                continue;
            }
            if let Some(after) = rest.strip_prefix("</") {
                let end = after.find('>').unwrap_or(after.len());
                let name = after[..end]
                    .trim()
                    .split(|c: char| c.is_whitespace())
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                self.end_tag(&name);
                pos = (lt + 2 + end + 1).min(input.len());
                continue;
            }
            if !rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.text("<");
                pos = lt + 1;
                continue;
            }

            let Some(end) = find_tag_end(rest) else {
                self.text(rest);
                break;
            };
            let (name, attrs, self_closing) = parse_tag(&rest[1..end]);
            pos = lt + end + 1;

            if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                let body_end = find_ci(&input[pos..], &format!("</{name}"))
                    .map_or(input.len(), |i| pos + i);
                let body = &input[pos..body_end];
                self.start_tag(name.clone(), attrs, false);
                self.text(body);
                self.end_tag(&name);
                pos = input[body_end..]
                    .find('>')
                    .map_or(input.len(), |i| body_end + i + 1);
                continue;
            }

            self.start_tag(name, attrs, self_closing);
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lexing helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Byte offset of the `>` closing the tag that starts at `s[0] == '<'`,
/// skipping over quoted attribute values.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'=<>/]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("attribute pattern is valid")
    })
}

/// Split the inside of a start tag into (name, attributes, self-closing).
fn parse_tag(inner: &str) -> (String, Vec<(String, String)>, bool) {
    let trimmed = inner.trim_end();
    let self_closing = trimmed.ends_with('/');
    let trimmed = trimmed.trim_end_matches('/');

    let name_end = trimmed
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(trimmed.len());
    let name = trimmed[..name_end].to_ascii_lowercase();

    let mut attrs: Vec<(String, String)> = Vec::new();
    for cap in attr_regex().captures_iter(&trimmed[name_end..]) {
        let key = cap[1].to_ascii_lowercase();
        if attrs.iter().any(|(k, _)| *k == key) {
            continue;
        }
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .or_else(|| cap.get(4))
            .map_or(String::new(), |m| decode_entities(m.as_str()));
        attrs.push((key, value));
    }
    (name, attrs, self_closing)
}

/// ASCII case-insensitive substring search.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Named references: markup escapes, Latin-1 symbols and general
/// punctuation.
fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" | "AMP" => '&',
        "lt" | "LT" => '<',
        "gt" | "GT" => '>',
        "quot" | "QUOT" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ensp" => '\u{2002}',
        "emsp" => '\u{2003}',
        "thinsp" => '\u{2009}',
        "shy" => '\u{ad}',
        "iexcl" => '¡',
        "cent" => '¢',
        "pound" => '£',
        "curren" => '¤',
        "yen" => '¥',
        "brvbar" => '¦',
        "sect" => '§',
        "uml" => '¨',
        "copy" | "COPY" => '©',
        "ordf" => 'ª',
        "laquo" => '«',
        "not" => '¬',
        "reg" | "REG" => '®',
        "macr" => '¯',
        "deg" => '°',
        "plusmn" => '±',
        "sup1" => '¹',
        "sup2" => '²',
        "sup3" => '³',
        "acute" => '´',
        "micro" => 'µ',
        "para" => '¶',
        "middot" => '·',
        "cedil" => '¸',
        "ordm" => 'º',
        "raquo" => '»',
        "frac14" => '¼',
        "frac12" => '½',
        "frac34" => '¾',
        "iquest" => '¿',
        "times" => '×',
        "divide" => '÷',
        "ndash" => '–',
        "mdash" => '—',
        "horbar" => '―',
        "lsquo" => '‘',
        "rsquo" => '’',
        "sbquo" => '‚',
        "ldquo" => '“',
        "rdquo" => '”',
        "bdquo" => '„',
        "dagger" => '†',
        "Dagger" => '‡',
        "bull" => '•',
        "hellip" => '…',
        "permil" => '‰',
        "prime" => '′',
        "Prime" => '″',
        "lsaquo" => '‹',
        "rsaquo" => '›',
        "oline" => '‾',
        "euro" => '€',
        "trade" | "TRADE" => '™',
        "larr" => '←',
        "uarr" => '↑',
        "rarr" => '→',
        "darr" => '↓',
        "harr" => '↔',
        "minus" => '−',
        "le" => '≤',
        "ge" => '≥',
        "ne" => '≠',
        "infin" => '∞',
        "loz" => '◊',
        "spades" => '♠',
        "clubs" => '♣',
        "hearts" => '♥',
        "diams" => '♦',
        "star" => '☆',
        "starf" => '★',
        "check" => '✓',
        _ => return None,
    };
    Some(c)
}

/// Decode the character references that show up in listing pages.
/// Unknown named references are left as-is.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 12).and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = named_entity(entity).or_else(|| {
                entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32)
            });
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attributes_in_all_quote_styles() {
        let doc = Document::parse(r#"<tr data-name="post_list" class='a b' id=row1 hidden>"#);
        let rows = doc.select(|e| e.is("tr"));
        assert_eq!(rows.len(), 1);
        let tr = rows[0];
        assert_eq!(tr.attr("data-name"), Some("post_list"));
        assert_eq!(tr.attr("class"), Some("a b"));
        assert_eq!(tr.attr("id"), Some("row1"));
        assert_eq!(tr.attr("hidden"), Some(""));
        assert!(tr.class_contains("b"));
    }

    #[test]
    fn tag_and_attribute_names_are_case_insensitive() {
        let doc = Document::parse(r#"<TABLE><TR DATA-NAME="x"><TD>1</TD></TR></TABLE>"#);
        let tds = doc.select(|e| e.is("td"));
        assert_eq!(tds.len(), 1);
        assert_eq!(tds[0].own_texts().collect::<Vec<_>>(), vec!["1"]);
        assert_eq!(doc.select(|e| e.attr("data-name") == Some("x")).len(), 1);
    }

    #[test]
    fn omitted_cell_and_row_end_tags_are_implied() {
        let doc = Document::parse("<table><tr><td>a<td>b<tr><td>c</table>");
        let rows = doc.select(|e| e.is("tr"));
        assert_eq!(rows.len(), 2);
        let first: Vec<String> = rows[0].descendants().map(|e| e.text()).collect();
        assert_eq!(first, vec!["a", "b"]);
        let second: Vec<String> = rows[1].descendants().map(|e| e.text()).collect();
        assert_eq!(second, vec!["c"]);
    }

    #[test]
    fn comments_doctype_and_scripts_are_not_elements() {
        let html = "<!DOCTYPE html><!-- <tr> --><script>if (a < b) { x = '<td>'; }</script><p>ok</p>";
        let doc = Document::parse(html);
        assert!(doc.select(|e| e.is("tr") || e.is("td")).is_empty());
        assert_eq!(doc.select(|e| e.is("p"))[0].text(), "ok");
    }

    #[test]
    fn quoted_gt_does_not_end_tag() {
        let doc = Document::parse(r#"<a title="x > y" href="/p">link</a>"#);
        let a = doc.select(|e| e.is("a"))[0];
        assert_eq!(a.attr("title"), Some("x > y"));
        assert_eq!(a.text(), "link");
    }

    #[test]
    fn void_elements_do_not_swallow_siblings() {
        let doc = Document::parse("<td><img src=x><br>text<span>s</span></td>");
        let td = doc.select(|e| e.is("td"))[0];
        let names: Vec<&str> = td.descendants().map(|e| e.name()).collect();
        assert_eq!(names, vec!["img", "br", "span"]);
        assert_eq!(td.own_texts().collect::<Vec<_>>(), vec!["text"]);
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let doc = Document::parse("<div></span><p>x</p></div>");
        let div = doc.select(|e| e.is("div"))[0];
        assert_eq!(div.descendants().count(), 1);
    }

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(decode_entities("a &amp; b"), "a & b");
        assert_eq!(decode_entities("&lt;&#65;&#x42;&gt;"), "<AB>");
        assert_eq!(decode_entities("&nbsp;x"), "\u{a0}x");
        assert_eq!(decode_entities("AT&T &unknown; &"), "AT&T &unknown; &");
        assert_eq!(decode_entities("알바&middot;근로&hellip;"), "알바·근로…");
        assert_eq!(
            decode_entities("&lsquo;a&rsquo; &ldquo;b&rdquo; &laquo;c&raquo;"),
            "‘a’ “b” «c»"
        );
        assert_eq!(decode_entities("1&ndash;2&mdash;3"), "1–2—3");
        assert_eq!(decode_entities("&copy;&reg;&trade;"), "©®™");
    }

    #[test]
    fn texts_walk_in_document_order_with_parent() {
        let doc = Document::parse("<td>a<span class=o><span>b</span>c</span>d</td>");
        let td = doc.select(|e| e.is("td"))[0];
        let seen: Vec<(&str, &str)> = td
            .texts()
            .map(|(parent, t)| (parent.attr("class").unwrap_or(parent.name()), t))
            .collect();
        assert_eq!(seen, vec![("td", "a"), ("span", "b"), ("o", "c"), ("td", "d")]);
    }

    #[test]
    fn whitespace_text_nodes_are_kept() {
        let doc = Document::parse("<td>\n  <span>t</span> tail</td>");
        let td = doc.select(|e| e.is("td"))[0];
        assert_eq!(td.own_texts().collect::<Vec<_>>(), vec!["\n  ", " tail"]);
    }
}
