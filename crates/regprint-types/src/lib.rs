//! Shared request types for the registry print service
//!
//! These mirror the JSON payload accepted by `POST /generate-pdf`. The
//! payload is lenient: apart from the registry item `id`, every field the
//! template might use is optional and missing values render as empty
//! strings downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who the extract is being generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicantType {
    #[serde(rename = "ORGANIZATION")]
    Organization,
    #[serde(rename = "INDIVIDUAL")]
    Individual,
}

/// Identity of the user who created or verified the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_type: Option<String>,
    pub oid: Option<String>,
    pub user_name: Option<String>,
    pub full_name: Option<String>,
}

/// Applicant details when the applicant is an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub address: String,
}

/// Applicant details when the applicant is a private person.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndividualInfo {
    pub name: Option<String>,
    /// Unified identification (ЕСИА) account number, if the person has one.
    pub esia: Option<String>,
}

/// One row of the registry table embedded in the generated document.
///
/// Row identity is positional: duplicate `id` values are valid and rows are
/// rendered in input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryItem {
    pub id: String,
    pub inv_number: Option<String>,
    pub name: Option<String>,
    pub information_date: Option<String>,
    pub note: Option<String>,
}

/// A code/value pair from one of the reference dictionaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub links: Vec<String>,
}

/// Parsed `POST /generate-pdf` payload. Immutable once deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub operation: Option<String>,
    pub id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub applicant_type: Option<ApplicantType>,
    pub organization_info: Option<OrganizationInfo>,
    pub individual_info: Option<IndividualInfo>,
    pub purpose_of_geo_info_access: Option<String>,
    #[serde(default)]
    pub registry_items: Vec<RegistryItem>,
    pub created_by: Option<UserInfo>,
    // Field name carries the upstream system's spelling.
    #[serde(rename = "verifedBy")]
    pub verified_by: Option<UserInfo>,
    pub creation_date: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    pub request_type: Option<String>,
    pub geo_info_storage_organization: Option<DictionaryEntry>,
    pub purpose_of_geo_info_access_dictionary: Option<DictionaryEntry>,
    pub tfgi_email: Option<String>,
}

impl GenerationRequest {
    /// Parse a request from raw JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
