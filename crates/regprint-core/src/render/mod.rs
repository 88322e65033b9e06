//! Template rendering
//!
//! A render pass takes the DOCX template and a flat context map and produces
//! a merged document. The context is rebuilt from the request for every pass,
//! never mutated in place.

pub mod context;
mod docx;

pub use docx::DocxRenderer;

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// A single context value.
///
/// `Rich` is kept apart from `Str` because rich text carries embedded line
/// breaks that become `<w:br/>` runs in the document but plain text at the
/// logging boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    Rich(String),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn rich(s: impl Into<String>) -> Self {
        Value::Rich(s.into())
    }
}

/// Flat mapping from template field name to value. Ordered so that debug
/// output is stable.
pub type RenderContext = BTreeMap<String, Value>;

/// Merges a context into a template file, writing the result to `output`.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &Path, context: &RenderContext, output: &Path) -> Result<()>;
}

/// Flatten a context into JSON for debug logging. Rich text loses its
/// document semantics here and is logged as plain text.
pub fn loggable(context: &RenderContext) -> serde_json::Value {
    fn convert(value: &Value) -> serde_json::Value {
        match value {
            Value::Str(s) | Value::Rich(s) => serde_json::Value::String(s.clone()),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Seq(items) => serde_json::Value::Array(items.iter().map(convert).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), convert(v))).collect(),
            ),
        }
    }

    serde_json::Value::Object(
        context
            .iter()
            .map(|(k, v)| (k.clone(), convert(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loggable_flattens_rich_to_plain_text() {
        let mut context = RenderContext::new();
        context.insert("plain".into(), Value::str("a"));
        context.insert("rich".into(), Value::rich("line1\nline2"));
        context.insert("flag".into(), Value::Bool(true));

        let json = loggable(&context);
        assert_eq!(json["plain"], "a");
        assert_eq!(json["rich"], "line1\nline2");
        assert_eq!(json["flag"], true);
    }

    #[test]
    fn loggable_descends_into_sequences() {
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Value::rich("r1"));
        let mut context = RenderContext::new();
        context.insert("table_rows".into(), Value::Seq(vec![Value::Map(row)]));

        let json = loggable(&context);
        assert_eq!(json["table_rows"][0]["id"], "r1");
    }
}
