//! Mapping between local entities and the provider's JSON:API-style
//! `{data: {type, attributes}}` envelope. Pure functions: no I/O, no logging.

use serde_json::{json, Value};
use signet_core::{AutoSignatureTerm, Document};

pub fn term_request(term: &AutoSignatureTerm) -> Value {
    json!({
        "data": {
            "type": "auto_signature_terms",
            "attributes": {
                "signer": {
                    "documentation": term.signer.documentation,
                    "birthday": term.signer.birthday,
                    "email": term.signer.email,
                    "name": term.signer.name,
                },
                "admin_email": term.admin_email,
                "api_email": term.api_email,
            }
        }
    })
}

pub fn document_request(document: &Document) -> Value {
    json!({
        "data": {
            "type": "documents",
            "attributes": {
                "name": document.name,
                "content_type": document.mime_type,
                "byte_size": document.file_size,
                "description": document.description,
            }
        }
    })
}

/// Extracts the provider-issued key from a response body. Requires a
/// non-empty `data.id`; there is no fallback to synthesized identifiers.
pub fn extract_provider_key(body: &[u8]) -> Result<String, String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| format!("response body is not valid JSON: {e}"))?;
    match value.pointer("/data/id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        Some(_) => Err("response data.id is empty".to_string()),
        None => Err("response is missing data.id".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use signet_core::Signer;

    fn term() -> AutoSignatureTerm {
        AutoSignatureTerm::new(
            Signer {
                documentation: "863.456.209-10".to_string(),
                birthday: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
                email: "a@b.c".to_string(),
                name: "Ana Souza".to_string(),
            },
            "adm@x.y".to_string(),
            "api@x.y".to_string(),
        )
    }

    #[test]
    fn term_envelope_has_type_and_signer_block() {
        let envelope = term_request(&term());
        assert_eq!(envelope["data"]["type"], "auto_signature_terms");
        assert_eq!(envelope["data"]["attributes"]["signer"]["email"], "a@b.c");
        assert_eq!(envelope["data"]["attributes"]["admin_email"], "adm@x.y");
    }

    #[test]
    fn provider_key_extraction_requires_non_empty_id() {
        assert_eq!(
            extract_provider_key(br#"{"data":{"id":"pk-1"}}"#).unwrap(),
            "pk-1"
        );
        assert!(extract_provider_key(br#"{"data":{"id":""}}"#).is_err());
        assert!(extract_provider_key(br#"{"data":{}}"#).is_err());
        assert!(extract_provider_key(b"not json").is_err());
    }
}
