//! Just enough HTML handling for peakbagger.com pages: locate tags and
//! balanced elements, walk table rows and cells at one nesting level, and
//! flatten fragments into visible text.

use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)\b([^>]*)>").unwrap());
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>").unwrap()
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:p|div|blockquote|ul|ol|h[1-6])\b[^>]*>").unwrap());
static LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:tr|li|table)\b[^>]*>").unwrap());
static WORD_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</?(?:p|div|blockquote|ul|ol|li|tr|table|h[1-6])\b[^>]*>|</t[dh]\s*>").unwrap()
});
static ANY_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").unwrap());

/// A located element: the opening tag and the markup between it and its
/// matching close tag. Offsets are byte positions in the searched document.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub open: &'a str,
    pub inner: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Element<'_> {
    pub fn attr(&self, name: &str) -> Option<String> {
        attr(self.open, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c.eq_ignore_ascii_case(class)))
    }

    pub fn text(&self) -> String {
        text(self.inner)
    }
}

/// One `<td>`/`<th>` of a row.
#[derive(Debug, Clone, Copy)]
pub struct Cell<'a> {
    pub open: &'a str,
    pub inner: &'a str,
    pub header: bool,
}

impl Cell<'_> {
    pub fn text(&self) -> String {
        text(self.inner)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        attr(self.open, name)
    }

    pub fn links(&self) -> Vec<Link> {
        links(self.inner)
    }

    pub fn has_image(&self) -> bool {
        TAG_RE
            .captures_iter(self.inner)
            .any(|c| c[1].is_empty() && c[2].eq_ignore_ascii_case("img"))
    }
}

#[derive(Debug, Clone)]
pub struct Row<'a> {
    pub inner: &'a str,
    pub cells: Vec<Cell<'a>>,
}

impl Row<'_> {
    pub fn is_header(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| c.header)
    }

    pub fn texts(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.text()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// Value of attribute `name` inside an opening tag, entity-decoded.
pub fn attr(open_tag: &str, name: &str) -> Option<String> {
    let attrs = open_tag
        .trim_start_matches('<')
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    ATTR_RE.captures_iter(attrs).find_map(|c| {
        if !c[1].eq_ignore_ascii_case(name) {
            return None;
        }
        let raw = c.get(2).or_else(|| c.get(3)).or_else(|| c.get(4))?;
        Some(decode_entities(raw.as_str()))
    })
}

/// Find the first `<tag>` element at or after `from` whose opening tag
/// satisfies `accept`, matched against its balanced closing tag. An element
/// that is never closed runs to the end of the document.
pub fn find_element<'a, F>(html: &'a str, tag: &str, from: usize, accept: F) -> Option<Element<'a>>
where
    F: Fn(&str) -> bool,
{
    let from = from.min(html.len());
    let mut open = None;
    for caps in TAG_RE.captures_iter(&html[from..]) {
        let m = caps.get(0)?;
        if caps[1].is_empty() && caps[2].eq_ignore_ascii_case(tag) && accept(m.as_str()) {
            open = Some((from + m.start(), from + m.end()));
            break;
        }
    }
    let (start, open_end) = open?;

    let mut depth = 1usize;
    for caps in TAG_RE.captures_iter(&html[open_end..]) {
        let m = caps.get(0)?;
        if !caps[2].eq_ignore_ascii_case(tag) || m.as_str().ends_with("/>") {
            continue;
        }
        if caps[1].is_empty() {
            depth += 1;
            continue;
        }
        depth -= 1;
        if depth == 0 {
            return Some(Element {
                open: &html[start..open_end],
                inner: &html[open_end..open_end + m.start()],
                start,
                end: open_end + m.end(),
            });
        }
    }

    Some(Element {
        open: &html[start..open_end],
        inner: &html[open_end..],
        start,
        end: html.len(),
    })
}

/// All tables in document order, outermost first. Nested tables are
/// reported too, after their parent.
pub fn tables(html: &str) -> Vec<Element<'_>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(table) = find_element(html, "table", pos, |_| true) {
        // Step just past the opening tag so nested tables are visited as well.
        pos = table.start + table.open.len();
        out.push(table);
    }
    out
}

/// Top-level rows of a table's inner markup. Rows and cells that belong to
/// tables nested inside a cell are not split out; they stay part of the
/// enclosing cell. Missing `</tr>`/`</td>` close tags are tolerated.
pub fn rows(table_inner: &str) -> Vec<Row<'_>> {
    children(table_inner, &["tr"])
        .into_iter()
        .map(|(_, _, inner)| Row {
            inner,
            cells: cells(inner),
        })
        .collect()
}

/// Top-level `<td>`/`<th>` cells of a row's inner markup.
pub fn cells(row_inner: &str) -> Vec<Cell<'_>> {
    children(row_inner, &["td", "th"])
        .into_iter()
        .map(|(name, open, inner)| Cell {
            open,
            inner,
            header: name.eq_ignore_ascii_case("th"),
        })
        .collect()
}

fn children<'a>(inner: &'a str, names: &[&str]) -> Vec<(String, &'a str, &'a str)> {
    let mut out = Vec::new();
    // (tag name, opening tag, content start)
    let mut current: Option<(String, &'a str, usize)> = None;
    let mut nested = 0usize;

    for caps in TAG_RE.captures_iter(inner) {
        let Some(m) = caps.get(0) else { continue };
        let closing = !caps[1].is_empty();
        let name = &caps[2];

        if name.eq_ignore_ascii_case("table") {
            if closing {
                nested = nested.saturating_sub(1);
            } else {
                nested += 1;
            }
            continue;
        }
        if nested > 0 || !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            continue;
        }

        if let Some((n, open, content_start)) = current.take() {
            out.push((n, open, &inner[content_start..m.start()]));
        }
        if !closing {
            current = Some((name.to_string(), m.as_str(), m.end()));
        }
    }

    if let Some((n, open, content_start)) = current {
        out.push((n, open, &inner[content_start..]));
    }
    out
}

pub fn headings(html: &str) -> Vec<Heading> {
    HEADING_RE
        .captures_iter(html)
        .filter_map(|c| {
            let m = c.get(0)?;
            Some(Heading {
                level: c[1].parse().ok()?,
                text: text(&c[2]),
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

/// First `<hN>` of the given level.
pub fn first_heading(html: &str, level: u8) -> Option<Heading> {
    headings(html).into_iter().find(|h| h.level == level)
}

pub fn links(html: &str) -> Vec<Link> {
    LINK_RE
        .captures_iter(html)
        .filter_map(|c| {
            let href = attr(&c[1], "href")?;
            Some(Link {
                href,
                text: text(&c[2]),
            })
        })
        .collect()
}

/// Visible text of a fragment on a single line. Line breaks, block tags and
/// cell ends become spaces; inline tags vanish without one.
pub fn text(html: &str) -> String {
    let cleaned = NOISE_RE.replace_all(html, " ");
    let spaced = WORD_BREAK_RE.replace_all(&cleaned, " ");
    let stripped = ANY_TAG_RE.replace_all(&spaced, "");
    collapse_ws(&decode_entities(&stripped))
}

/// Visible text of a fragment split into paragraphs. Paragraph and block
/// tags and blank lines separate paragraphs; `<br>` keeps a line break
/// inside one. Empty paragraphs are dropped.
pub fn paragraphs(html: &str) -> Vec<String> {
    let cleaned = NOISE_RE.replace_all(html, " ");
    let with_breaks = BREAK_RE.replace_all(&cleaned, "\n");
    let with_blocks = PARAGRAPH_RE.replace_all(&with_breaks, "\n\n");
    let with_lines = LINE_RE.replace_all(&with_blocks, "\n");
    let stripped = ANY_TAG_RE.replace_all(&with_lines, " ");
    let decoded = decode_entities(&stripped).replace("\r\n", "\n");

    BLANK_LINES_RE
        .split(&decoded)
        .map(|para| {
            para.lines()
                .map(collapse_ws)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Decodes named and numeric character references. `&nbsp;` reads as a plain
/// space.
pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).replace('\u{a0}', " ")
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_quoting_styles() {
        let tag = r#"<table class="gray" width='49%' align=left>"#;
        assert_eq!(attr(tag, "class").as_deref(), Some("gray"));
        assert_eq!(attr(tag, "WIDTH").as_deref(), Some("49%"));
        assert_eq!(attr(tag, "align").as_deref(), Some("left"));
        assert_eq!(attr(tag, "id"), None);
    }

    #[test]
    fn balanced_table_match() {
        let html = "<table id=a><tr><td><table id=b><tr><td>x</td></tr></table></td></tr></table><p>after</p>";
        let outer = find_element(html, "table", 0, |_| true).unwrap();
        assert_eq!(outer.attr("id").as_deref(), Some("a"));
        assert!(outer.inner.contains("id=b"));
        assert_eq!(&html[outer.end..], "<p>after</p>");
    }

    #[test]
    fn tables_include_nested() {
        let html = "<table id=a><tr><td><table id=b></table></td></tr></table><table id=c></table>";
        let ids: Vec<_> = tables(html).iter().filter_map(|t| t.attr("id")).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn rows_skip_nested_table_cells() {
        let html = "<tr><td>Route</td><td><table><tr><td><img src=i.gif></td><td>West Ridge</td></tr></table></td><td>last</td></tr>";
        let rows = rows(html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells.len(), 3);
        assert_eq!(rows[0].cells[1].text(), "West Ridge");
        assert!(rows[0].cells[1].has_image());
        assert_eq!(rows[0].cells[2].text(), "last");
    }

    #[test]
    fn rows_without_close_tags() {
        let html = "<tr><th>A<th>B<tr><td>1<td>2";
        let rows = rows(html);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].is_header());
        assert_eq!(rows[1].texts(), vec!["1", "2"]);
    }

    #[test]
    fn text_flattens_and_decodes() {
        assert_eq!(text("<b>Rock&nbsp;&amp; Ice</b>\n  <i>route</i>"), "Rock & Ice route");
        assert_eq!(text("<td>a</td><td>b</td>"), "a b");
        assert_eq!(text("caf&#233; &#x41;"), "café A");
        assert_eq!(text("&bogus; stays"), "&bogus; stays");
        assert_eq!(text("M&ouml;nch &uuml; &aacute;"), "Mönch ü á");
        assert_eq!(text("Pic&nbsp;du&#160;Midi"), "Pic du Midi");
    }

    #[test]
    fn text_separates_blocks() {
        assert_eq!(text("West Ridge<br>via Camp Muir"), "West Ridge via Camp Muir");
        assert_eq!(text("<div>USA</div><div>Washington</div>"), "USA Washington");
        assert_eq!(text("<ul><li>one</li><li>two</li></ul><p>three</p>"), "one two three");
        assert_eq!(text("Mt. <b>Rain</b>ier"), "Mt. Rainier");
    }

    #[test]
    fn paragraphs_keep_boundaries() {
        let html = "<p>First  line<br>second line</p><p>Next</p>\n\nPlain tail";
        assert_eq!(
            paragraphs(html),
            vec!["First line\nsecond line", "Next", "Plain tail"]
        );
    }

    #[test]
    fn headings_and_links() {
        let html = r#"<h1>Mount Si, Washington</h1><h2>Climber: <a href="climber.aspx?cid=4">Jo</a></h2>"#;
        let hs = headings(html);
        assert_eq!(hs.len(), 2);
        assert_eq!(hs[1].text, "Climber: Jo");
        assert_eq!(first_heading(html, 1).unwrap().text, "Mount Si, Washington");
        assert_eq!(
            links(html),
            vec![Link {
                href: "climber.aspx?cid=4".into(),
                text: "Jo".into()
            }]
        );
    }
}
