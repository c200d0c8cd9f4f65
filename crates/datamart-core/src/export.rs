//! Plain-text renderings of tabular data: CSV for buyers, Markdown for posts.

use crate::models::Row;

/// Escape a string for CSV output.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Renders rows as CSV with a header line. Missing cells are empty.
pub fn to_csv(columns: &[String], rows: &[Row]) -> String {
    let mut out = String::new();
    push_csv_line(&mut out, columns.iter().map(String::as_str));
    for row in rows {
        push_csv_line(
            &mut out,
            columns
                .iter()
                .map(|c| row.get(c).map(String::as_str).unwrap_or("")),
        );
    }
    out
}

fn push_csv_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let line: Vec<String> = cells.map(escape_csv).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Renders a Markdown pipe table. Pipes inside cells are escaped.
pub fn markdown_table(headers: &[String], rows: &[Row]) -> String {
    let cell = |s: &str| s.replace('|', "\\|").replace('\n', " ");

    let mut md = format!(
        "| {} |\n",
        headers.iter().map(|h| cell(h.as_str())).collect::<Vec<_>>().join(" | ")
    );
    md.push_str(&format!(
        "| {} |\n",
        headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    ));
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| cell(row.get(h).map(String::as_str).unwrap_or("")))
            .collect();
        md.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    md
}
