//! Structural extraction of tables and links from HTML.
//!
//! Extraction never fails: empty tables, header-less tables and unusable
//! anchors are skipped rather than reported.

use std::sync::LazyLock;

use datamart_core::models::{ComponentKind, Row, ScrapeResult, ScrapedComponent};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const LINK_TEXT_HEADER: &str = "Link Text";
pub const LINK_URL_HEADER: &str = "URL";
pub const LINKS_TITLE: &str = "All Links";

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector is valid CSS")
}

static TABLE: LazyLock<Selector> = LazyLock::new(|| selector("table"));
static TABLE_ROW: LazyLock<Selector> = LazyLock::new(|| selector("tr"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"meta[name="description"]"#));

/// Parses a page and pulls out its tables and links.
///
/// Tables come first, in document order, each titled `Table {n}` by its
/// position among all tables on the page. One aggregated link component
/// follows if the page has any usable anchors.
///
/// # Examples
///
/// ```
/// use datamart_client::extract::extract;
///
/// let html = "<table><tr><th>Name</th><th>Age</th></tr>\
///             <tr><td>Ann</td><td>30</td></tr>\
///             <tr><td></td><td></td></tr></table>";
/// let result = extract(html);
/// assert_eq!(result.components.len(), 1);
/// assert_eq!(result.components[0].headers, vec!["Name", "Age"]);
/// assert_eq!(result.components[0].count, 1);
/// ```
pub fn extract(html: &str) -> ScrapeResult {
    let document = Html::parse_document(html);

    let mut components: Vec<ScrapedComponent> = document
        .select(&TABLE)
        .enumerate()
        .filter_map(|(index, table)| extract_table(table, index))
        .collect();

    if let Some(links) = extract_links(&document) {
        components.push(links);
    }

    ScrapeResult {
        page_title: page_title(&document),
        meta_description: meta_description(&document),
        components,
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The nearest `<table>` ancestor of a row.
fn owning_table<'a>(row: ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "table")
}

/// Direct `<td>` or `<th>` children of a row.
fn cells<'a>(row: ElementRef<'a>, tag: &'static str) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| cell.value().name() == tag)
        .collect()
}

/// Column labels by position, plus the de-duplicated header list.
#[derive(Default)]
struct Columns {
    labels: Vec<String>,
    headers: Vec<String>,
}

impl Columns {
    fn push(&mut self, label: String) {
        if !self.headers.contains(&label) {
            self.headers.push(label.clone());
        }
        self.labels.push(label);
    }

    /// Label for column `index`, synthesising `Col {index+1}` for overflow
    /// cells so row keys stay within the headers.
    fn label(&mut self, index: usize) -> String {
        while self.labels.len() <= index {
            let synthetic = format!("Col {}", self.labels.len() + 1);
            self.push(synthetic);
        }
        self.labels[index].clone()
    }
}

fn extract_table(table: ElementRef<'_>, index: usize) -> Option<ScrapedComponent> {
    let table_node = (*table).id();
    let rows: Vec<ElementRef<'_>> = table
        .select(&TABLE_ROW)
        .filter(|tr| owning_table(*tr).map(|t| (*t).id()) == Some(table_node))
        .collect();

    let mut columns = Columns::default();
    if let Some(header_cells) = rows
        .iter()
        .map(|tr| cells(*tr, "th"))
        .find(|ths| !ths.is_empty())
    {
        for th in header_cells {
            let text = element_text(th);
            let label = if text.is_empty() {
                format!("Col {}", columns.labels.len() + 1)
            } else {
                text
            };
            columns.push(label);
        }
    } else if let Some(first) = rows.iter().map(|tr| cells(*tr, "td")).find(|tds| !tds.is_empty()) {
        for position in 1..=first.len() {
            columns.push(format!("Col {}", position));
        }
    }

    let mut records = Vec::new();
    for tr in &rows {
        let mut record = Row::new();
        let mut has_data = false;
        for (position, td) in cells(*tr, "td").into_iter().enumerate() {
            let value = element_text(td);
            has_data |= !value.is_empty();
            // Duplicate labels overwrite the earlier cell.
            record.insert(columns.label(position), value);
        }
        if has_data {
            records.push(record);
        }
    }

    if records.is_empty() {
        debug!("Skipping table {}: no rows with data", index + 1);
        return None;
    }

    debug!(
        "Table {}: {} columns, {} rows",
        index + 1,
        columns.headers.len(),
        records.len()
    );
    Some(ScrapedComponent::new(
        ComponentKind::Table,
        Some(format!("Table {}", index + 1)),
        columns.headers,
        records,
    ))
}

fn is_importable_href(href: &str) -> bool {
    !href.is_empty()
        && !href.starts_with('#')
        && !href
            .get(..11)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}

fn extract_links(document: &Html) -> Option<ScrapedComponent> {
    let links: Vec<Row> = document
        .select(&ANCHOR)
        .filter_map(|anchor| {
            let text = element_text(anchor);
            let href = anchor.value().attr("href")?.trim();
            if text.is_empty() || !is_importable_href(href) {
                return None;
            }
            Some(Row::from([
                (LINK_TEXT_HEADER.to_string(), text),
                (LINK_URL_HEADER.to_string(), href.to_string()),
            ]))
        })
        .collect();

    if links.is_empty() {
        return None;
    }

    Some(ScrapedComponent::new(
        ComponentKind::Links,
        Some(LINKS_TITLE.to_string()),
        vec![LINK_TEXT_HEADER.to_string(), LINK_URL_HEADER.to_string()],
        links,
    ))
}

fn page_title(document: &Html) -> String {
    document
        .select(&TITLE)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn meta_description(document: &Html) -> String {
    document
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|content| content.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_table_with_headers_drops_empty_rows() {
        let html = "<table><tr><th>Name</th><th>Age</th></tr>\
                    <tr><td>Ann</td><td>30</td></tr>\
                    <tr><td></td><td></td></tr></table>";
        let result = extract(html);

        assert_eq!(result.components.len(), 1);
        let table = &result.components[0];
        assert_eq!(table.kind, ComponentKind::Table);
        assert_eq!(table.title.as_deref(), Some("Table 1"));
        assert_eq!(table.headers, vec!["Name", "Age"]);
        assert_eq!(table.rows, vec![row(&[("Name", "Ann"), ("Age", "30")])]);
        assert_eq!(table.count, 1);
    }

    #[test]
    fn test_headerless_table_gets_positional_labels() {
        let html = "<table><tr><td> a </td><td>b</td></tr><tr><td>c</td><td></td></tr></table>";
        let table = &extract(html).components[0];

        assert_eq!(table.headers, vec!["Col 1", "Col 2"]);
        assert_eq!(table.rows[0], row(&[("Col 1", "a"), ("Col 2", "b")]));
        assert_eq!(table.rows[1], row(&[("Col 1", "c"), ("Col 2", "")]));
    }

    #[test]
    fn test_overflow_cells_extend_headers() {
        let html = "<table><tr><th>A</th></tr><tr><td>1</td><td>2</td></tr></table>";
        let table = &extract(html).components[0];

        assert_eq!(table.headers, vec!["A", "Col 2"]);
        for record in &table.rows {
            assert!(record.keys().all(|k| table.headers.contains(k)));
        }
    }

    #[test]
    fn test_blank_header_cell_is_labelled() {
        let html = "<table><tr><th></th><th>Score</th></tr><tr><td>x</td><td>9</td></tr></table>";
        let table = &extract(html).components[0];
        assert_eq!(table.headers, vec!["Col 1", "Score"]);
    }

    #[test]
    fn test_duplicate_headers_overwrite() {
        let html = "<table><tr><th>V</th><th>V</th></tr><tr><td>first</td><td>second</td></tr></table>";
        let table = &extract(html).components[0];

        assert_eq!(table.headers, vec!["V"]);
        assert_eq!(table.rows[0], row(&[("V", "second")]));
    }

    #[test]
    fn test_empty_tables_omitted_and_numbering_is_positional() {
        let html = "<table><tr><td></td></tr></table>\
                    <table><tr><td>kept</td></tr></table>";
        let result = extract(html);

        assert_eq!(result.components.len(), 1);
        assert_eq!(result.components[0].title.as_deref(), Some("Table 2"));
    }

    #[test]
    fn test_nested_table_rows_stay_with_nested_table() {
        let html = "<table><tr><th>Outer</th></tr>\
                    <tr><td>o1<table><tr><th>Inner</th></tr><tr><td>i1</td></tr></table></td></tr>\
                    </table>";
        let result = extract(html);

        assert_eq!(result.components.len(), 2);
        let outer = &result.components[0];
        let inner = &result.components[1];
        assert_eq!(outer.headers, vec!["Outer"]);
        assert_eq!(outer.count, 1);
        assert_eq!(inner.headers, vec!["Inner"]);
        assert_eq!(inner.rows, vec![row(&[("Inner", "i1")])]);
    }

    #[test]
    fn test_links_filtered_and_aggregated() {
        let html = r##"<body>
            <a href="/about">About us</a>
            <a href="#top">Top</a>
            <a href="JavaScript:void(0)">Click</a>
            <a href="https://example.com/x">  Example  </a>
            <a href="/empty"> </a>
            <a>No href</a>
        </body>"##;
        let result = extract(html);

        assert_eq!(result.components.len(), 1);
        let links = &result.components[0];
        assert_eq!(links.kind, ComponentKind::Links);
        assert_eq!(links.title.as_deref(), Some("All Links"));
        assert_eq!(links.headers, vec!["Link Text", "URL"]);
        assert_eq!(
            links.rows,
            vec![
                row(&[("Link Text", "About us"), ("URL", "/about")]),
                row(&[("Link Text", "Example"), ("URL", "https://example.com/x")]),
            ]
        );
        assert_eq!(links.count, 2);
    }

    #[test]
    fn test_links_follow_tables() {
        let html = r#"<a href="/a">A</a><table><tr><td>1</td></tr></table>"#;
        let kinds: Vec<_> = extract(html).components.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ComponentKind::Table, ComponentKind::Links]);
    }

    #[test]
    fn test_page_metadata() {
        let html = r#"<html><head><title> Stats page </title>
            <meta name="description" content="Quarterly numbers"></head><body></body></html>"#;
        let result = extract(html);

        assert_eq!(result.page_title, "Stats page");
        assert_eq!(result.meta_description, "Quarterly numbers");
        assert!(result.is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = "<table><tr><th>K</th></tr><tr><td>v</td></tr></table><a href='/x'>x</a>";
        assert_eq!(extract(html), extract(html));
    }

    #[test]
    fn test_is_importable_href() {
        assert!(is_importable_href("/path"));
        assert!(!is_importable_href(""));
        assert!(!is_importable_href("#section"));
        assert!(!is_importable_href("javascript:alert(1)"));
        assert!(!is_importable_href("JAVASCRIPT:alert(1)"));
        assert!(is_importable_href("java"));
    }
}
