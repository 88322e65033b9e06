//! Render context construction
//!
//! Turns a parsed request into the flat field map the template is merged
//! with. Built from scratch for each pass; the only difference between the
//! two passes is the `registry_pages` field.

use super::{RenderContext, Value};
use regprint_types::{ApplicantType, DictionaryEntry, GenerationRequest, RegistryItem, UserInfo};
use std::collections::BTreeMap;

/// Registry rows are materialised in chunks of this size so one huge request
/// never builds a single oversized intermediate buffer.
pub(crate) const ROW_BATCH_SIZE: usize = 100;

/// Build the context for one render pass.
///
/// `registry_pages` is `None` on the first pass and carries the corrected
/// page count on the second.
pub fn build(request: &GenerationRequest, registry_pages: Option<u32>) -> RenderContext {
    let mut context = RenderContext::new();

    insert_opt(&mut context, "operation", request.operation.as_deref());
    insert_opt(&mut context, "id", request.id.as_deref());
    insert_opt(&mut context, "email", request.email.as_deref());
    insert_opt(&mut context, "phone", request.phone.as_deref());
    insert_opt(
        &mut context,
        "purposeOfGeoInfoAccess",
        request.purpose_of_geo_info_access.as_deref(),
    );
    insert_opt(&mut context, "type", request.request_type.as_deref());
    insert_opt(&mut context, "tfgiEmail", request.tfgi_email.as_deref());

    build_applicant(&mut context, request);

    if let Some(date) = &request.creation_date {
        context.insert(
            "creationDate".to_string(),
            Value::str(date.format("%d.%m.%Y").to_string()),
        );
    }

    if let Some(user) = &request.created_by {
        context.insert("createdBy".to_string(), user_value(user));
    }
    if let Some(user) = &request.verified_by {
        context.insert("verifedBy".to_string(), user_value(user));
    }
    if let Some(entry) = &request.geo_info_storage_organization {
        context.insert(
            "geoInfoStorageOrganization".to_string(),
            dictionary_value(entry),
        );
    }
    if let Some(entry) = &request.purpose_of_geo_info_access_dictionary {
        context.insert(
            "purposeOfGeoInfoAccessDictionary".to_string(),
            dictionary_value(entry),
        );
    }

    context.insert(
        "table_rows".to_string(),
        Value::Seq(build_table_rows(&request.registry_items)),
    );

    if let Some(pages) = registry_pages {
        context.insert("registry_pages".to_string(), Value::str(pages.to_string()));
    }

    context
}

fn insert_opt(context: &mut RenderContext, key: &str, value: Option<&str>) {
    context.insert(key.to_string(), Value::str(value.unwrap_or_default()));
}

/// Derived applicant fields. Anything other than an explicit ORGANIZATION is
/// treated as a private person.
fn build_applicant(context: &mut RenderContext, request: &GenerationRequest) {
    let (info, name, agent, is_organization) = match request.applicant_type {
        Some(ApplicantType::Organization) => match &request.organization_info {
            Some(org) => (
                format!("{}, {}, {}", org.name, org.address, org.agent),
                org.name.clone(),
                org.agent.clone(),
                true,
            ),
            None => (String::new(), String::new(), String::new(), true),
        },
        _ => match &request.individual_info {
            Some(person) => {
                let name = person.name.clone().unwrap_or_default();
                let esia_suffix = match person.esia.as_deref() {
                    Some(esia) if !esia.is_empty() => format!(" (ЕСИА {esia})"),
                    _ => String::new(),
                };
                (
                    format!("{name}{esia_suffix}"),
                    format!("физическое лицо {name}"),
                    String::new(),
                    false,
                )
            }
            None => (String::new(), String::new(), String::new(), false),
        },
    };

    context.insert("applicant_info".to_string(), Value::str(info));
    context.insert("applicant_name".to_string(), Value::str(name));
    context.insert("applicant_agent".to_string(), Value::str(agent));
    context.insert("is_organization".to_string(), Value::Bool(is_organization));
}

/// Table rows carry rich text so cell values keep their line breaks. Row
/// indices are 1-based positions in the input order.
fn build_table_rows(items: &[RegistryItem]) -> Vec<Value> {
    let mut rows = Vec::with_capacity(items.len());
    for chunk in items.chunks(ROW_BATCH_SIZE) {
        let mut batch = Vec::with_capacity(chunk.len());
        for item in chunk {
            let mut row = BTreeMap::new();
            row.insert("index".to_string(), Value::str((rows.len() + batch.len() + 1).to_string()));
            row.insert(
                "invNumber".to_string(),
                Value::rich(item.inv_number.clone().unwrap_or_default()),
            );
            row.insert(
                "name".to_string(),
                Value::rich(item.name.clone().unwrap_or_default()),
            );
            row.insert(
                "informationDate".to_string(),
                Value::rich(item.information_date.clone().unwrap_or_default()),
            );
            row.insert("id".to_string(), Value::rich(item.id.clone()));
            row.insert(
                "note".to_string(),
                Value::rich(item.note.clone().unwrap_or_default()),
            );
            batch.push(Value::Map(row));
        }
        rows.extend(batch);
    }
    rows
}

fn user_value(user: &UserInfo) -> Value {
    let mut map = BTreeMap::new();
    map.insert(
        "userType".to_string(),
        Value::str(user.user_type.clone().unwrap_or_default()),
    );
    map.insert(
        "oid".to_string(),
        Value::str(user.oid.clone().unwrap_or_default()),
    );
    map.insert(
        "userName".to_string(),
        Value::str(user.user_name.clone().unwrap_or_default()),
    );
    map.insert(
        "fullName".to_string(),
        Value::str(user.full_name.clone().unwrap_or_default()),
    );
    Value::Map(map)
}

fn dictionary_value(entry: &DictionaryEntry) -> Value {
    let mut map = BTreeMap::new();
    map.insert("code".to_string(), Value::str(entry.code.clone()));
    map.insert("value".to_string(), Value::str(entry.value.clone()));
    map.insert(
        "links".to_string(),
        Value::Seq(entry.links.iter().map(Value::str).collect()),
    );
    Value::Map(map)
}
