use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Contact point attached to a job posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContactPoint {
    pub contact_type: String,
    pub name: String,
    pub email: String,
    pub telephone: String,
}

/// Postal address for an employment unit. Fields are only present when the
/// source carried a non-empty value; empty strings never appear here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_country: Option<String>,
}

impl PostalAddress {
    /// Builds an address from raw source values, keeping only non-empty
    /// fields. Returns `None` when neither region nor locality is set.
    pub fn from_source(region: &str, locality: &str, country: &str) -> Option<Self> {
        if region.is_empty() && locality.is_empty() {
            return None;
        }
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Some(Self {
            address_region: non_empty(region),
            address_locality: non_empty(locality),
            address_country: non_empty(country),
        })
    }
}

/// Hiring organization or employment unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,
}

/// Canonical job posting record.
///
/// Field declaration order is the serialization order and must stay fixed:
/// the content fingerprint is computed over the serialized record, so
/// reordering fields would change every `@version` value downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub identifier: String,
    pub total_job_openings: String,
    pub title: String,
    pub description: String,
    pub job_start_date: String,
    pub responsibilities: String,
    pub date_posted: String,
    pub experience_requirements: String,
    pub employment_type: String,
    pub work_hours: String,
    pub valid_through: String,
    pub url: String,
    pub direct_apply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hiring_organization: Option<Organization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_unit: Option<Organization>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub application_contact: Vec<ContactPoint>,
    #[serde(rename = "@version", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl JobPosting {
    /// Computes and stores the content fingerprint.
    ///
    /// The hash covers the record as serialized with `version` unset, so
    /// byte-identical enriched data always yields the same fingerprint and
    /// the fingerprint never depends on itself.
    pub fn fingerprint(&mut self) -> crate::error::Result<()> {
        self.version = None;
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        self.version = Some(hex::encode(hasher.finalize()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_posting() -> JobPosting {
        JobPosting {
            identifier: "2024/101".to_string(),
            total_job_openings: "2".to_string(),
            title: "Nurse".to_string(),
            description: "<p>Care work</p>".to_string(),
            job_start_date: "As agreed".to_string(),
            responsibilities: "Care".to_string(),
            date_posted: "2024-05-01".to_string(),
            experience_requirements: "Experience required".to_string(),
            employment_type: "Full time".to_string(),
            work_hours: "Permanent".to_string(),
            valid_through: "2024-06-01".to_string(),
            url: "https://example.com/apply".to_string(),
            direct_apply: "https://example.com/apply".to_string(),
            hiring_organization: None,
            employment_unit: None,
            application_contact: Vec::new(),
            version: None,
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let mut a = sample_posting();
        let mut b = sample_posting();
        a.fingerprint().unwrap();
        b.fingerprint().unwrap();
        assert_eq!(a.version, b.version);
        assert!(a.version.is_some());
    }

    #[test]
    fn fingerprint_excludes_itself() {
        let mut a = sample_posting();
        a.fingerprint().unwrap();
        let first = a.version.clone();
        // Re-fingerprinting a record that already carries a version must not
        // feed the old version back into the hash.
        a.fingerprint().unwrap();
        assert_eq!(first, a.version);
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let mut a = sample_posting();
        let mut b = sample_posting();
        b.title = "Doctor".to_string();
        a.fingerprint().unwrap();
        b.fingerprint().unwrap();
        assert_ne!(a.version, b.version);
    }

    #[test]
    fn address_drops_empty_fields() {
        let addr = PostalAddress::from_source("Skåne", "", "").unwrap();
        assert_eq!(addr.address_region.as_deref(), Some("Skåne"));
        assert!(addr.address_locality.is_none());
        assert!(addr.address_country.is_none());
    }

    #[test]
    fn address_requires_region_or_locality() {
        assert!(PostalAddress::from_source("", "", "Sverige").is_none());
    }

    #[test]
    fn serialization_uses_schema_org_names() {
        let mut posting = sample_posting();
        posting.fingerprint().unwrap();
        let json = serde_json::to_value(&posting).unwrap();
        assert!(json.get("totalJobOpenings").is_some());
        assert!(json.get("directApply").is_some());
        assert!(json.get("@version").is_some());
        assert!(json.get("hiringOrganization").is_none());
    }
}
