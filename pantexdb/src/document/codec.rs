use super::Document;
use crate::error::{PantexError, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

/// File extension of document files, without the dot.
pub const EXTENSION: &str = "json";

const INDENT: &[u8] = b"    ";

/// Serialize a document as 4-space indented JSON.
pub fn encode(doc: &Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser)?;
    Ok(buf)
}

/// Parse a document. Anything other than a JSON object is malformed.
pub fn decode(bytes: &[u8]) -> Result<Document> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| PantexError::MalformedDocument(e.to_string()))?;
    Document::try_from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_encode_is_indented() {
        let doc = Document::try_from(json!({ "name": "Tim" })).unwrap();
        let text = String::from_utf8(encode(&doc).unwrap()).unwrap();
        assert_eq!(text, "{\n    \"name\": \"Tim\"\n}");
    }

    #[test]
    fn test_round_trip_nested_values() {
        let doc = Document::try_from(json!({
            "_id": "abc",
            "name": "Elmar",
            "age": 57,
            "score": 1.5,
            "active": true,
            "tags": ["a", "b"],
            "address": { "city": "Bonn", "geo": [50.5, 7.25] },
            "nothing": null
        }))
        .unwrap();

        let decoded = decode(&encode(&doc).unwrap()).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_decode_invalid_json() {
        let err = decode(b"{ \"name\": ").unwrap_err();
        assert!(matches!(err, PantexError::MalformedDocument(_)));
    }

    #[test]
    fn test_decode_non_object() {
        let err = decode(b"[1, 2]").unwrap_err();
        assert!(matches!(err, PantexError::MalformedDocument(_)));
    }
}
