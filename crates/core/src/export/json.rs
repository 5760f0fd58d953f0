use bytes::Bytes;

use super::{BudgetSnapshot, DocumentRenderer, ExportFormat, RenderError};

/// Pretty-printed JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl DocumentRenderer for JsonRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn render(&self, snapshot: &BudgetSnapshot) -> Result<Bytes, RenderError> {
        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| RenderError::Encoding(format!("JSON serialization error: {e}")))?;
        Ok(Bytes::from(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_snapshot;

    #[test]
    fn test_json_contains_names_and_totals() {
        let snapshot = sample_snapshot();
        let bytes = JsonRenderer.render(&snapshot).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["event_title"], "Spring Hackathon");
        assert_eq!(value["total_amount"], "1000");
        assert_eq!(value["spent_amount"], "300");
        assert_eq!(value["remaining_amount"], "700");
        assert_eq!(value["expenses"][0]["paid_by_name"], "Dana Payer");
        assert_eq!(value["expenses"][0]["category"], "venue");
        assert_eq!(value["expenses"][1]["status"], "pending");
    }
}
