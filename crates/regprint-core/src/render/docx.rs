//! DOCX template merging
//!
//! A DOCX file is a zip archive; the renderer copies every entry verbatim
//! except the `word/*.xml` parts, which get `{{field}}` placeholders replaced
//! and table rows expanded. The template is opened fresh on every call so a
//! second pass can never observe state from the first.

use super::context::ROW_BATCH_SIZE;
use super::{RenderContext, TemplateRenderer, Value};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const ROW_MARKER: &str = "{{table_rows.";
const ROW_OPEN: &str = "<w:tr";
const ROW_CLOSE: &str = "</w:tr>";

#[derive(Debug, Clone, Default)]
pub struct DocxRenderer;

impl DocxRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateRenderer for DocxRenderer {
    fn render(&self, template: &Path, context: &RenderContext, output: &Path) -> Result<()> {
        let file = File::open(template).map_err(|e| {
            Error::Render(format!("cannot open template {}: {}", template.display(), e))
        })?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| Error::Render(format!("template is not a valid document: {e}")))?;

        let out = File::create(output).map_err(|e| {
            Error::Render(format!("cannot create document {}: {}", output.display(), e))
        })?;
        let mut writer = ZipWriter::new(out);

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| Error::Render(format!("cannot read template entry: {e}")))?;
            let name = entry.name().to_string();

            if name.starts_with("word/") && name.ends_with(".xml") {
                let mut xml = String::with_capacity(entry.size() as usize);
                entry.read_to_string(&mut xml).map_err(|e| {
                    Error::Render(format!("cannot read template part {name}: {e}"))
                })?;
                let merged = merge(&xml, context)?;
                writer
                    .start_file(name.as_str(), FileOptions::default())
                    .map_err(|e| Error::Render(format!("cannot write document part: {e}")))?;
                writer
                    .write_all(merged.as_bytes())
                    .map_err(|e| Error::Render(format!("cannot write document part: {e}")))?;
            } else {
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| Error::Render(format!("cannot copy template entry: {e}")))?;
            }
        }

        writer
            .finish()
            .map_err(|e| Error::Render(format!("cannot finalise document: {e}")))?;
        Ok(())
    }
}

fn merge(xml: &str, context: &RenderContext) -> Result<String> {
    let expanded = expand_table_rows(xml, context)?;
    substitute(&expanded, context)
}

/// Expand each table row template once per entry of `table_rows`, batching so
/// a huge registry never builds one giant intermediate string.
fn expand_table_rows(xml: &str, context: &RenderContext) -> Result<String> {
    if !xml.contains(ROW_MARKER) {
        return Ok(xml.to_string());
    }

    let rows: &[Value] = match context.get("table_rows") {
        Some(Value::Seq(rows)) => rows,
        _ => &[],
    };

    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(marker) = rest.find(ROW_MARKER) {
        let row_start = find_row_open(&rest[..marker]).ok_or_else(|| {
            Error::Render("table_rows placeholder is not inside a table row".to_string())
        })?;
        let close = rest[marker..].find(ROW_CLOSE).ok_or_else(|| {
            Error::Render("table row containing table_rows is not terminated".to_string())
        })?;
        let row_end = marker + close + ROW_CLOSE.len();

        out.push_str(&rest[..row_start]);
        let row_template = &rest[row_start..row_end];
        for batch in rows.chunks(ROW_BATCH_SIZE) {
            let mut expanded = String::with_capacity(row_template.len() * batch.len());
            for row in batch {
                expanded.push_str(&expand_row(row_template, row)?);
            }
            out.push_str(&expanded);
        }
        rest = &rest[row_end..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Position of the last `<w:tr>` element start in `xml`. A bare prefix match
/// is not enough: `<w:trPr>` and `<w:trHeight>` sit inside the row, so the
/// tag name must end at `>`, `/` or an attribute separator.
fn find_row_open(xml: &str) -> Option<usize> {
    let mut search = xml;
    loop {
        let pos = search.rfind(ROW_OPEN)?;
        let after = search[pos + ROW_OPEN.len()..].chars().next();
        match after {
            Some('>') | Some('/') => return Some(pos),
            Some(c) if c.is_whitespace() => return Some(pos),
            _ => search = &search[..pos],
        }
    }
}

fn expand_row(template: &str, row: &Value) -> Result<String> {
    let fields: &BTreeMap<String, Value> = match row {
        Value::Map(map) => map,
        other => {
            return Err(Error::Render(format!(
                "table_rows entries must be maps, got {other:?}"
            )))
        }
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(ROW_MARKER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + ROW_MARKER.len()..];
        let end = after
            .find("}}")
            .ok_or_else(|| Error::Render("unterminated placeholder in template".to_string()))?;
        let field = after[..end].trim();
        let value = fields.get(field).ok_or_else(|| {
            Error::Render(format!("table row field '{field}' is not provided"))
        })?;
        out.push_str(&scalar_text(field, value)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Replace every remaining `{{field}}` placeholder. Dotted paths descend into
/// map values, e.g. `{{createdBy.fullName}}`.
fn substitute(xml: &str, context: &RenderContext) -> Result<String> {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| Error::Render("unterminated placeholder in template".to_string()))?;
        let field = after[..end].trim();
        let value = lookup(context, field).ok_or_else(|| {
            Error::Render(format!("template field '{field}' is not provided"))
        })?;
        out.push_str(&scalar_text(field, value)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(context: &'a RenderContext, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = context.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Map(map) => map.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

fn scalar_text(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::Str(s) => Ok(xml_escape(s)),
        Value::Bool(b) => Ok(b.to_string()),
        // Line breaks in rich text become explicit break runs.
        Value::Rich(s) => Ok(xml_escape(s).replace('\n', "<w:br/>")),
        Value::Seq(_) | Value::Map(_) => Err(Error::Render(format!(
            "template field '{field}' is not a scalar value"
        ))),
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
