//! Text rendering and component selection for the CLI.

use anyhow::bail;
use datamart_core::export::to_csv;
use datamart_core::{ComponentKind, DatasetSummary, Row, ScrapeResult, ScrapedComponent, TableState};

use crate::ExportFormat;

/// Rows shown per table in a scrape summary.
const SUMMARY_PREVIEW_ROWS: usize = 3;

/// Human-readable summary of a scrape: metadata, numbered components and
/// a short Markdown preview of each table.
pub fn render_summary(url: &str, result: &ScrapeResult) -> String {
    let mut out = format!("\n{}\n", url);
    if !result.page_title.is_empty() {
        out.push_str(&format!("  Title:       {}\n", result.page_title));
    }
    if !result.meta_description.is_empty() {
        out.push_str(&format!("  Description: {}\n", result.meta_description));
    }

    if result.is_empty() {
        out.push_str("  No tables, lists or links found.\n");
        return out;
    }

    for (i, component) in result.components.iter().enumerate() {
        out.push_str(&format!(
            "\n  [{}] {} ({} rows)\n",
            i + 1,
            component_label(component),
            component.count
        ));
        if component.kind == ComponentKind::Table {
            let rows = component
                .rows
                .iter()
                .take(SUMMARY_PREVIEW_ROWS)
                .cloned()
                .collect();
            let preview = TableState::new(component.headers.clone(), rows).to_markdown();
            for line in preview.lines() {
                out.push_str(&format!("      {}\n", line));
            }
        }
    }
    out
}

fn component_label(component: &ScrapedComponent) -> String {
    let kind = match component.kind {
        ComponentKind::Table => "table",
        ComponentKind::Links => "links",
        ComponentKind::List => "list",
    };
    match &component.title {
        Some(title) => format!("{}: {}", kind, title),
        None => kind.to_string(),
    }
}

/// Picks components by their 1-based numbers. No numbers means all.
pub fn select_components<'a>(
    result: &'a ScrapeResult,
    numbers: &[usize],
) -> anyhow::Result<Vec<&'a ScrapedComponent>> {
    if numbers.is_empty() {
        return Ok(result.components.iter().collect());
    }
    numbers
        .iter()
        .map(|&n| match n.checked_sub(1).and_then(|i| result.components.get(i)) {
            Some(component) => Ok(component),
            None => bail!(
                "Component {} does not exist (page has {})",
                n,
                result.components.len()
            ),
        })
        .collect()
}

/// Renders dataset rows in the requested export format.
pub fn render_rows(
    format: ExportFormat,
    columns: &[String],
    rows: &[Row],
) -> anyhow::Result<String> {
    Ok(match format {
        ExportFormat::Csv => to_csv(columns, rows),
        ExportFormat::Json => {
            let mut json = serde_json::to_string_pretty(rows)?;
            json.push('\n');
            json
        }
        ExportFormat::Jsonl => {
            let mut out = String::new();
            for row in rows {
                out.push_str(&serde_json::to_string(row)?);
                out.push('\n');
            }
            out
        }
    })
}

/// One line per dataset.
pub fn render_listing(summaries: &[DatasetSummary]) -> String {
    let mut out = String::new();
    for summary in summaries {
        let dataset = &summary.dataset;
        out.push_str(&format!(
            "{}  {:>6} rows  {:>5}  {:<9}  {}\n",
            dataset.id,
            summary.row_count,
            dataset.price,
            if dataset.is_published {
                "published"
            } else {
                "draft"
            },
            dataset.name
        ));
    }
    out
}
