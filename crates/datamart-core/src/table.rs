//! Editable table model with linear undo/redo.
//!
//! A [`TableEditor`] owns one [`TableState`] for the length of an editing
//! session. Every mutating operation snapshots the pre-mutation state onto
//! the undo stack and clears the redo stack; no-op requests (a duplicate
//! column, an out-of-range row) leave both stacks untouched.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{derive_columns, Row, ScrapedComponent};

/// Ordered headers plus rows keyed by header.
///
/// Rows need not carry every header: a missing cell reads as empty, and
/// adding a column does not back-fill existing rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl TableState {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Rebuilds a state from a stored dataset.
    ///
    /// Falls back to the rows' keys in first-seen order when no column order
    /// was stored.
    pub fn from_saved(columns: &[String], rows: Vec<Row>) -> Self {
        let headers = if columns.is_empty() {
            derive_columns(&rows)
        } else {
            columns.to_vec()
        };
        Self { headers, rows }
    }

    /// Cell text, or `""` when the row lacks the key or does not exist.
    pub fn cell(&self, row: usize, header: &str) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(header))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Renders the table as a Markdown pipe table, one line per row.
    pub fn to_markdown(&self) -> String {
        crate::export::markdown_table(&self.headers, &self.rows)
    }
}

/// How an imported component combines with the current table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Discard the current table and adopt the component's.
    Replace,
    /// Union the headers and concatenate the rows.
    Append,
}

/// A [`TableState`] with undo and redo stacks.
///
/// Both import modes are undo-tracked.
#[derive(Debug, Clone, Default)]
pub struct TableEditor {
    state: TableState,
    undo_stack: Vec<TableState>,
    redo_stack: Vec<TableState>,
}

impl TableEditor {
    pub fn new(state: TableState) -> Self {
        Self {
            state,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn into_state(self) -> TableState {
        self.state
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn push_undo(&mut self) {
        self.undo_stack.push(self.state.clone());
        self.redo_stack.clear();
    }

    fn check_row(&self, index: usize) -> Result<(), AppError> {
        let len = self.state.rows.len();
        if index >= len {
            return Err(AppError::RowOutOfRange { index, len });
        }
        Ok(())
    }

    /// Writes a cell, adding the key to the row if it was absent.
    pub fn set_cell(
        &mut self,
        row: usize,
        header: &str,
        value: impl Into<String>,
    ) -> Result<(), AppError> {
        self.check_row(row)?;
        self.push_undo();
        self.state.rows[row].insert(header.to_string(), value.into());
        Ok(())
    }

    /// Appends a row with an empty value under every current header.
    pub fn add_row(&mut self) {
        self.push_undo();
        let empty: Row = self
            .state
            .headers
            .iter()
            .map(|h| (h.clone(), String::new()))
            .collect();
        self.state.rows.push(empty);
    }

    /// Appends a column. Returns `false` (and records nothing) for blank or
    /// duplicate names.
    pub fn add_column(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.state.headers.iter().any(|h| h == name) {
            return false;
        }
        self.push_undo();
        self.state.headers.push(name.to_string());
        true
    }

    pub fn delete_row(&mut self, index: usize) -> Result<(), AppError> {
        self.check_row(index)?;
        self.push_undo();
        self.state.rows.remove(index);
        Ok(())
    }

    pub fn import_component(&mut self, component: &ScrapedComponent, mode: ImportMode) {
        self.push_undo();
        match mode {
            ImportMode::Replace => {
                self.state.headers = component.headers.clone();
                self.state.rows = component.rows.clone();
            }
            ImportMode::Append => {
                for header in &component.headers {
                    if !self.state.headers.contains(header) {
                        self.state.headers.push(header.clone());
                    }
                }
                self.state.rows.extend(component.rows.iter().cloned());
            }
        }
    }

    /// Restores the state before the last mutation. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.state, previous);
        self.redo_stack.push(current);
        true
    }

    /// Re-applies the last undone mutation. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.state, next);
        self.undo_stack.push(current);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComponentKind;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn people() -> TableState {
        TableState::new(
            headers(&["Name", "Age"]),
            vec![row(&[("Name", "Ann"), ("Age", "30")])],
        )
    }

    fn component(hs: &[&str], rows: Vec<Row>) -> ScrapedComponent {
        ScrapedComponent::new(
            ComponentKind::Table,
            Some("Table 1".to_string()),
            headers(hs),
            rows,
        )
    }

    #[test]
    fn test_set_cell_adds_missing_key() {
        let mut editor = TableEditor::new(people());
        editor.set_cell(0, "City", "Oslo").unwrap();
        assert_eq!(editor.state().cell(0, "City"), "Oslo");
        assert!(editor.can_undo());
    }

    #[test]
    fn test_set_cell_out_of_range_records_nothing() {
        let mut editor = TableEditor::new(people());
        let err = editor.set_cell(5, "Name", "x").unwrap_err();
        assert!(matches!(err, AppError::RowOutOfRange { index: 5, len: 1 }));
        assert!(!editor.can_undo());
        assert_eq!(editor.state(), &people());
    }

    #[test]
    fn test_add_row_fills_every_header() {
        let mut editor = TableEditor::new(people());
        editor.add_row();
        assert_eq!(editor.state().rows[1], row(&[("Name", ""), ("Age", "")]));
    }

    #[test]
    fn test_add_column_does_not_backfill() {
        let mut editor = TableEditor::new(people());
        assert!(editor.add_column(" City "));
        assert_eq!(editor.state().headers, headers(&["Name", "Age", "City"]));
        assert!(!editor.state().rows[0].contains_key("City"));
        assert_eq!(editor.state().cell(0, "City"), "");
    }

    #[test]
    fn test_add_duplicate_column_is_not_recorded() {
        let mut editor = TableEditor::new(people());
        editor.add_row();
        assert!(!editor.add_column("Name"));
        assert!(!editor.add_column("   "));

        // The only snapshot is the one from add_row.
        assert!(editor.undo());
        assert_eq!(editor.state(), &people());
        assert!(!editor.undo());
    }

    #[test]
    fn test_delete_row() {
        let mut editor = TableEditor::new(people());
        editor.delete_row(0).unwrap();
        assert!(editor.state().rows.is_empty());
        assert!(editor.delete_row(0).is_err());
    }

    #[test]
    fn test_import_append_unions_headers() {
        let mut editor = TableEditor::new(people());
        editor.import_component(
            &component(&["Age", "City"], vec![row(&[("Age", "41"), ("City", "Rome")])]),
            ImportMode::Append,
        );
        assert_eq!(editor.state().headers, headers(&["Name", "Age", "City"]));
        assert_eq!(editor.state().rows.len(), 2);
        assert_eq!(editor.state().cell(1, "City"), "Rome");
        assert_eq!(editor.state().cell(1, "Name"), "");
    }

    #[test]
    fn test_import_replace_is_undo_tracked() {
        let mut editor = TableEditor::new(people());
        editor.import_component(
            &component(&["X"], vec![row(&[("X", "1")])]),
            ImportMode::Replace,
        );
        assert_eq!(editor.state().headers, headers(&["X"]));
        assert!(editor.undo());
        assert_eq!(editor.state(), &people());
    }

    #[test]
    fn test_undo_redo_on_empty_stacks() {
        let mut editor = TableEditor::default();
        assert!(!editor.undo());
        assert!(!editor.redo());
        assert!(editor.state().is_empty());
    }

    #[test]
    fn test_n_undos_restore_initial_and_n_redos_restore_final() {
        let initial = people();
        let mut editor = TableEditor::new(initial.clone());

        editor.set_cell(0, "Age", "31").unwrap();
        editor.add_row();
        editor.add_column("City");
        editor.set_cell(1, "City", "Lima").unwrap();
        editor.import_component(
            &component(&["Name", "Zip"], vec![row(&[("Name", "Bo"), ("Zip", "0150")])]),
            ImportMode::Append,
        );
        editor.delete_row(0).unwrap();
        let n = 6;
        let final_state = editor.state().clone();

        for _ in 0..n {
            assert!(editor.undo());
        }
        assert_eq!(editor.state(), &initial);
        assert!(!editor.can_undo());

        for _ in 0..n {
            assert!(editor.redo());
        }
        assert_eq!(editor.state(), &final_state);
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_mutation_clears_redo() {
        let mut editor = TableEditor::new(people());
        editor.add_row();
        editor.undo();
        assert!(editor.can_redo());
        editor.add_column("City");
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_from_saved_prefers_stored_columns() {
        let rows = vec![row(&[("Age", "30"), ("Name", "Ann")])];
        let state = TableState::from_saved(&headers(&["Name", "Age"]), rows.clone());
        assert_eq!(state.headers, headers(&["Name", "Age"]));

        let state = TableState::from_saved(&[], rows);
        assert_eq!(state.headers, headers(&["Age", "Name"]));
    }

    #[test]
    fn test_from_saved_derives_columns_across_rows() {
        let rows = vec![
            row(&[("Name", "Ann"), ("Age", "30")]),
            row(&[("Name", "Bo"), ("City", "Oslo")]),
        ];
        let state = TableState::from_saved(&[], rows);
        assert_eq!(state.headers, headers(&["Name", "Age", "City"]));
    }

    #[test]
    fn test_to_markdown() {
        let md = people().to_markdown();
        assert_eq!(md, "| Name | Age |\n| --- | --- |\n| Ann | 30 |\n");
    }
}
