//! Extended JSON <-> BSON for command-line payloads

use anyhow::{bail, Context, Result};
use bson::{Bson, Document};

/// Parse a JSON value (extended JSON allowed, e.g. `{"$oid": "..."}`)
pub fn parse_value(label: &str, text: &str) -> Result<Bson> {
    let value: serde_json::Value = serde_json::from_str(text)
        .with_context(|| format!("{} is not valid JSON: {}", label, text))?;
    Bson::try_from(value).with_context(|| format!("{} is not valid extended JSON", label))
}

/// Parse a JSON object into a document
pub fn parse_document(label: &str, text: &str) -> Result<Document> {
    match parse_value(label, text)? {
        Bson::Document(doc) => Ok(doc),
        other => bail!("{} must be a JSON object, got {}", label, type_name(&other)),
    }
}

/// Parse a JSON array of objects (insert payloads, pipelines)
pub fn parse_documents(label: &str, text: &str) -> Result<Vec<Document>> {
    match parse_value(label, text)? {
        Bson::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Bson::Document(doc) => Ok(doc),
                other => bail!("{}[{}] must be a JSON object, got {}", label, i, type_name(&other)),
            })
            .collect(),
        Bson::Document(doc) => Ok(vec![doc]),
        other => bail!("{} must be a JSON array, got {}", label, type_name(&other)),
    }
}

/// Render as relaxed extended JSON on one line
pub fn render(value: Bson) -> String {
    value.into_relaxed_extjson().to_string()
}

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Array(_) => "array",
        Bson::Document(_) => "object",
        Bson::String(_) => "string",
        Bson::Boolean(_) => "boolean",
        Bson::Null => "null",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        _ => "special value",
    }
}
