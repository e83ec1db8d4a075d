//! Certificate subject (distinguished name) values.

use serde::{Deserialize, Deserializer, Serialize};
use x509_parser::x509::{AttributeTypeAndValue, X509Name};

/// The subject or issuer distinguished name of a certificate.
///
/// Multi-valued components accept either a single string or a list of
/// strings when deserialized. Unknown components are rejected. Empty
/// components are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Subject {
    /// Common name (CN).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub common_name: String,
    /// Country (C).
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "multi_string")]
    pub country: Vec<String>,
    /// Organization (O).
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "multi_string")]
    pub organization: Vec<String>,
    /// Organizational unit (OU).
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "multi_string")]
    pub organizational_unit: Vec<String>,
    /// Locality (L).
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "multi_string")]
    pub locality: Vec<String>,
    /// State or province (ST).
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "multi_string")]
    pub province: Vec<String>,
    /// Street address.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "multi_string")]
    pub street_address: Vec<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "multi_string")]
    pub postal_code: Vec<String>,
    /// Subject serial number.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub serial_number: String,
}

impl Subject {
    /// Projects a parsed X.509 name into a subject.
    ///
    /// Reads CN, C, O, OU, L and ST. Attributes that are not valid strings
    /// are skipped; the first common name wins.
    #[must_use]
    pub fn from_x509_name(name: &X509Name<'_>) -> Self {
        Self {
            common_name: strings(name.iter_common_name())
                .into_iter()
                .next()
                .unwrap_or_default(),
            country: strings(name.iter_country()),
            organization: strings(name.iter_organization()),
            organizational_unit: strings(name.iter_organizational_unit()),
            locality: strings(name.iter_locality()),
            province: strings(name.iter_state_or_province()),
            ..Self::default()
        }
    }

    /// Returns true if no component is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Creates a subject with only the common name set.
#[must_use]
pub fn create_subject(common_name: impl Into<String>) -> Subject {
    Subject {
        common_name: common_name.into(),
        ..Subject::default()
    }
}

fn strings<'a, 'b: 'a>(attrs: impl Iterator<Item = &'a AttributeTypeAndValue<'b>>) -> Vec<String> {
    attrs
        .filter_map(|attr| attr.as_str().ok())
        .map(String::from)
        .collect()
}

fn multi_string<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if !s.is_empty() => vec![s],
        Some(OneOrMany::Many(v)) => v,
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_subject_sets_only_common_name() {
        let subject = create_subject("example.com");
        assert_eq!(subject.common_name, "example.com");
        assert_eq!(
            subject,
            Subject {
                common_name: "example.com".into(),
                ..Subject::default()
            }
        );
    }

    #[test]
    fn create_subject_with_empty_name() {
        let subject = create_subject("");
        assert!(subject.is_empty());
        assert_eq!(subject, Subject::default());
    }

    #[test]
    fn subject_serialization_omits_empty_fields() {
        let json = serde_json::to_value(create_subject("node-1")).unwrap();
        assert_eq!(json, serde_json::json!({"commonName": "node-1"}));
    }

    #[test]
    fn subject_serialization_uses_camel_case() {
        let subject = Subject {
            common_name: "gateway".into(),
            organizational_unit: vec!["edge".into()],
            street_address: vec!["1 Main St".into()],
            ..Subject::default()
        };
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json["organizationalUnit"], serde_json::json!(["edge"]));
        assert_eq!(json["streetAddress"], serde_json::json!(["1 Main St"]));
    }

    #[test]
    fn subject_deserializes_single_string_or_list() {
        let subject: Subject = serde_json::from_str(
            r#"{"commonName": "ca", "organization": "Clawbernetes", "locality": ["A", "B"]}"#,
        )
        .unwrap();
        assert_eq!(subject.organization, vec!["Clawbernetes".to_string()]);
        assert_eq!(subject.locality, vec!["A".to_string(), "B".to_string()]);
        assert!(subject.country.is_empty());
    }

    #[test]
    fn subject_deserializes_null_and_empty_as_absent() {
        let subject: Subject =
            serde_json::from_str(r#"{"country": null, "province": ""}"#).unwrap();
        assert!(subject.is_empty());
    }

    #[test]
    fn subject_rejects_unknown_components() {
        let result = serde_json::from_str::<Subject>(r#"{"common_name": "admin"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn subject_roundtrip_preserves_value() {
        let subject = Subject {
            common_name: "Root CA".into(),
            country: vec!["US".into()],
            organization: vec!["Clawbernetes".into()],
            serial_number: "42".into(),
            ..Subject::default()
        };
        let json = serde_json::to_string(&subject).unwrap();
        let back: Subject = serde_json::from_str(&json).unwrap();
        assert_eq!(subject, back);
    }
}
