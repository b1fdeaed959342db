// 📊 Presenter - result tables and row highlighting
// Styling is a pure function of the row; rendering is left to the front-end

use serde::Serialize;

pub const COLUMNS: [&str; 4] = ["IPO Name", "Registrar", "Result", "Status"];

/// The only keyword that leaves a row unhighlighted.
const NOT_ALLOTTED_KEYWORD: &str = "sorry";

/// One line of an identifier's result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllotmentResult {
    pub ipo_name: String,
    pub registrar: String,
    pub result_title: String,
    pub result_text: String,
}

impl AllotmentResult {
    pub fn cells(&self) -> [&str; 4] {
        [
            self.ipo_name.as_str(),
            self.registrar.as_str(),
            self.result_title.as_str(),
            self.result_text.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStyle {
    Allotted,
    Plain,
}

/// Highlight every row whose Result is not "sorry" (any casing).
pub fn row_style(row: &AllotmentResult) -> RowStyle {
    if row.result_title.to_lowercase() != NOT_ALLOTTED_KEYWORD {
        RowStyle::Allotted
    } else {
        RowStyle::Plain
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// Position in the table, starting at 1.
    pub index: usize,
    pub style: RowStyle,
    #[serde(flatten)]
    pub result: AllotmentResult,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub rows: Vec<TableRow>,
}

impl ResultTable {
    pub fn from_results(results: Vec<AllotmentResult>) -> Self {
        let rows = results
            .into_iter()
            .enumerate()
            .map(|(i, result)| TableRow {
                index: i + 1,
                style: row_style(&result),
                result,
            })
            .collect();
        ResultTable { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fixed-width text rendering; highlighted rows are marked with `*`.
    pub fn to_text(&self) -> String {
        let mut widths = [1usize; 5];
        widths[0] = self.rows.len().to_string().len();
        for (w, header) in widths[1..].iter_mut().zip(COLUMNS) {
            *w = header.chars().count();
        }
        for row in &self.rows {
            for (w, cell) in widths[1..].iter_mut().zip(row.result.cells()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&format_line(" ", "", &COLUMNS, &widths));
        for row in &self.rows {
            let marker = match row.style {
                RowStyle::Allotted => "*",
                RowStyle::Plain => " ",
            };
            out.push_str(&format_line(marker, &row.index.to_string(), &row.result.cells(), &widths));
        }
        out
    }
}

fn format_line(marker: &str, index: &str, cells: &[&str; 4], widths: &[usize; 5]) -> String {
    let mut line = format!("{} {:>width$}", marker, index, width = widths[0]);
    for (cell, width) in cells.iter().zip(&widths[1..]) {
        line.push_str(" | ");
        line.push_str(&format!("{:<width$}", cell, width = *width));
    }
    line.trim_end().to_string() + "\n"
}

/// What gets shown for one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportOutcome {
    Table(ResultTable),
    NoData { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierReport {
    pub identifier: String,
    pub outcome: ReportOutcome,
}

impl IdentifierReport {
    pub fn build(identifier: &str, results: Vec<AllotmentResult>) -> Self {
        let outcome = if results.is_empty() {
            ReportOutcome::NoData {
                message: format!("No allotment data found for PAN: {}.", identifier),
            }
        } else {
            ReportOutcome::Table(ResultTable::from_results(results))
        };

        IdentifierReport {
            identifier: identifier.to_string(),
            outcome,
        }
    }

    pub fn table(&self) -> Option<&ResultTable> {
        match &self.outcome {
            ReportOutcome::Table(table) => Some(table),
            ReportOutcome::NoData { .. } => None,
        }
    }
}
