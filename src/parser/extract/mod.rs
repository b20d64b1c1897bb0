pub mod ascent;
pub mod ascents;
pub mod peak;
pub mod search;

use std::fmt;

use super::markup::{self, Element, Row};

/// Required fields that a page did not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Missing(pub Vec<&'static str>);

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing required fields: {}", self.0.join(", "))
    }
}

/// Lowercased header texts of a table row, used to map columns by name so
/// layouts with extra or missing columns parse the same way.
#[derive(Debug, Clone, Default)]
pub struct Columns {
    headers: Vec<String>,
}

/// Header cells longer than this are flattened nested tables, not labels.
const MAX_HEADER_LEN: usize = 40;

impl Columns {
    pub fn from_row(row: &Row) -> Self {
        Columns {
            headers: row
                .cells
                .iter()
                .map(|c| markup::collapse_ws(&c.text()).to_lowercase())
                .collect(),
        }
    }

    pub fn find<F>(&self, pred: F) -> Option<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.headers
            .iter()
            .position(|h| h.len() <= MAX_HEADER_LEN && pred(h))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }
}

/// A table located by its header row.
pub struct HeaderedTable<'a> {
    pub rows: Vec<Row<'a>>,
    pub header_idx: usize,
    pub columns: Columns,
}

impl<'a> HeaderedTable<'a> {
    pub fn body(&self) -> &[Row<'a>] {
        &self.rows[self.header_idx + 1..]
    }
}

/// Header rows sit near the top; some pages put a spacer row first.
const HEADER_SCAN_ROWS: usize = 4;

/// First table (outer tables before nested ones) that has a header row
/// among its first few rows accepted by `accept`.
pub fn find_table_by_headers<'a, F>(html: &'a str, accept: F) -> Option<HeaderedTable<'a>>
where
    F: Fn(&Columns) -> bool,
{
    markup::tables(html).into_iter().find_map(|table| {
        let rows = markup::rows(table.inner);
        let header_idx = rows
            .iter()
            .take(HEADER_SCAN_ROWS)
            .position(|r| r.cells.len() >= 2 && accept(&Columns::from_row(r)))?;
        let columns = Columns::from_row(&rows[header_idx]);
        Some(HeaderedTable {
            rows,
            header_idx,
            columns,
        })
    })
}

/// The content table after `from`: the first one whose opening tag passes
/// `primary`, otherwise simply the first table after `from`.
pub fn locate_table<'a, F>(html: &'a str, from: usize, primary: F) -> Option<Element<'a>>
where
    F: Fn(&Element) -> bool,
{
    let candidates: Vec<Element<'a>> = markup::tables(html)
        .into_iter()
        .filter(|t| t.start >= from)
        .collect();
    candidates
        .iter()
        .find(|t| primary(t))
        .or_else(|| candidates.first())
        .copied()
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
