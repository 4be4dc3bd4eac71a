use crate::error::Result;
use crate::schema::JobPosting;
use crate::types::DataConverter;

/// Serializes the record list to pretty-printed JSON for publishing.
pub struct JsonConverter;

impl DataConverter for JsonConverter {
    fn convert(&self, records: &[JobPosting]) -> Result<String> {
        Ok(serde_json::to_string_pretty(records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_converts_to_empty_array() {
        let out = JsonConverter.convert(&[]).unwrap();
        assert_eq!(out, "[]");
    }
}
