use bytes::Bytes;
use csv::Writer;

use super::{BudgetSnapshot, DocumentRenderer, ExportFormat, RenderError};

/// One CSV row per expense line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRenderer;

impl DocumentRenderer for CsvRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn render(&self, snapshot: &BudgetSnapshot) -> Result<Bytes, RenderError> {
        let mut wtr = Writer::from_writer(vec![]);

        wtr.write_record([
            "Expense ID",
            "Date",
            "Category",
            "Description",
            "Amount",
            "Status",
            "Paid By",
            "Receipt",
            "Reviewed By",
            "Reviewed At",
            "Notes",
        ])
        .map_err(encoding)?;

        for line in &snapshot.expenses {
            let entry = &line.entry;
            wtr.write_record([
                entry.id.to_string(),
                entry.date.to_rfc3339(),
                entry.category.to_string(),
                text_cell(&entry.description),
                entry.amount.to_string(),
                entry.status.to_string(),
                line.paid_by_name
                    .as_deref()
                    .map_or_else(|| entry.paid_by.to_string(), text_cell),
                text_cell(&entry.receipt),
                line.reviewed_by_name
                    .as_deref()
                    .map(text_cell)
                    .or_else(|| entry.reviewed_by.map(|id| id.to_string()))
                    .unwrap_or_default(),
                entry
                    .reviewed_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default(),
                entry.notes.as_deref().map(text_cell).unwrap_or_default(),
            ])
            .map_err(encoding)?;
        }

        let data = wtr
            .into_inner()
            .map_err(|e| RenderError::Encoding(format!("CSV writer error: {e}")))?;
        Ok(Bytes::from(data))
    }
}

/// Free text that a spreadsheet would read as a formula gets a leading `'`.
fn text_cell(value: &str) -> String {
    if value.starts_with(['=', '+', '-', '@', '\t', '\r']) {
        format!("'{value}")
    } else {
        value.to_string()
    }
}

fn encoding(e: csv::Error) -> RenderError {
    RenderError::Encoding(format!("CSV writer error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_snapshot;

    #[test]
    fn test_csv_has_header_and_one_row_per_expense() {
        let snapshot = sample_snapshot();
        let bytes = CsvRenderer.render(&snapshot).unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Expense ID,Date,Category"));
        assert!(lines[1].contains("Dana Payer"));
        assert!(lines[1].contains("venue"));
        assert!(lines[1].contains("300"));
    }

    #[test]
    fn test_csv_quotes_commas() {
        let mut snapshot = sample_snapshot();
        snapshot.expenses[0].entry.description = "Hall, chairs".to_string();
        let bytes = CsvRenderer.render(&snapshot).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_ref());
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[3], "Hall, chairs");
    }

    #[test]
    fn test_csv_escapes_formula_cells() {
        let mut snapshot = sample_snapshot();
        snapshot.expenses[0].entry.description = "=HYPERLINK(\"http://x\")".to_string();
        snapshot.expenses[0].entry.receipt = "@SUM(A1)".to_string();
        snapshot.expenses[0].entry.notes = Some("-2+3".to_string());
        snapshot.expenses[0].paid_by_name = Some("+Dana".to_string());
        let bytes = CsvRenderer.render(&snapshot).unwrap();

        let mut reader = csv::Reader::from_reader(bytes.as_ref());
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(&first[3], "'=HYPERLINK(\"http://x\")");
        assert_eq!(&first[6], "'+Dana");
        assert_eq!(&first[7], "'@SUM(A1)");
        assert_eq!(&first[10], "'-2+3");
        // Amounts are numbers, not text.
        assert!(!first[4].starts_with('\''));
    }

    #[test]
    fn test_csv_empty_budget_is_header_only() {
        let mut snapshot = sample_snapshot();
        snapshot.expenses.clear();
        let bytes = CsvRenderer.render(&snapshot).unwrap();
        assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().lines().count(), 1);
    }
}
