//! Per-request template data container.
//!
//! [`TemplateData`] collects the values a certificate template can see. The
//! well-known keys (`User`, `Subject`, `SANs`, `Token`, `CR`) live in typed
//! slots so they always hold their documented shape; any other key is
//! stored as an opaque JSON value.
//!
//! A container belongs to exactly one issuance request. Build a new one per
//! request, or call [`TemplateData::clear`] before reusing an instance.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, warn};
use x509_parser::certification_request::X509CertificationRequest;

use crate::error::{Error, Result};
use crate::request::CertificateRequestView;
use crate::san::{create_sans, SubjectAltName};
use crate::subject::{create_subject, Subject};

/// Key for the authenticated user's identity.
pub const USER_KEY: &str = "User";
/// Key for the certificate subject.
pub const SUBJECT_KEY: &str = "Subject";
/// Key for the subject alternative names.
pub const SANS_KEY: &str = "SANs";
/// Key for the authentication token.
pub const TOKEN_KEY: &str = "Token";
/// Key for the certificate request view.
pub const CERTIFICATE_REQUEST_KEY: &str = "CR";

/// The well-known template keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKey {
    /// `User`: a [`Subject`] describing the requester.
    User,
    /// `Subject`: the [`Subject`] of the certificate.
    Subject,
    /// `SANs`: a list of [`SubjectAltName`].
    Sans,
    /// `Token`: an opaque authentication value.
    Token,
    /// `CR`: a [`CertificateRequestView`].
    CertificateRequest,
}

impl TemplateKey {
    /// All well-known keys.
    pub const ALL: [Self; 5] = [
        Self::User,
        Self::Subject,
        Self::Sans,
        Self::Token,
        Self::CertificateRequest,
    ];

    /// Returns the name templates use for this key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => USER_KEY,
            Self::Subject => SUBJECT_KEY,
            Self::Sans => SANS_KEY,
            Self::Token => TOKEN_KEY,
            Self::CertificateRequest => CERTIFICATE_REQUEST_KEY,
        }
    }

    /// Looks up a well-known key by its exact (case-sensitive) name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value held by [`TemplateData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TemplateValue {
    /// Stored under `User` or `Subject`.
    Subject(Subject),
    /// Stored under `SANs`.
    Sans(Vec<SubjectAltName>),
    /// Stored under `Token`.
    Token(Value),
    /// Stored under `CR`.
    Request(CertificateRequestView),
    /// Stored under a caller-defined key.
    Opaque(Value),
}

/// Values exposed to a certificate template, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateData {
    user: Option<Subject>,
    subject: Option<Subject>,
    sans: Option<Vec<SubjectAltName>>,
    token: Option<Value>,
    certificate_request: Option<CertificateRequestView>,
    extra: BTreeMap<String, Value>,
}

/// Creates template data holding `Subject` (common name only) and `SANs`.
#[must_use]
pub fn create_template_data<S: AsRef<str>>(common_name: &str, sans: &[S]) -> TemplateData {
    let mut data = TemplateData::new();
    data.set_subject(create_subject(common_name));
    data.set_sans(sans);
    data
}

impl TemplateData {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, overwriting any previous value.
    ///
    /// Caller-defined keys accept any value. A well-known key only accepts a
    /// value with that key's shape; on mismatch the container is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `key` is well-known and `value`
    /// does not have its shape.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();

        let Some(well_known) = TemplateKey::from_name(&key) else {
            self.extra.insert(key, value);
            return Ok(());
        };

        match well_known {
            TemplateKey::User => self.user = Some(shaped_object(well_known, value)?),
            TemplateKey::Subject => self.subject = Some(shaped_object(well_known, value)?),
            TemplateKey::Sans => self.sans = Some(shaped(well_known, value)?),
            TemplateKey::Token => self.token = Some(value),
            TemplateKey::CertificateRequest => {
                self.certificate_request = Some(shaped_object(well_known, value)?);
            }
        }
        Ok(())
    }

    /// Sets `User`.
    pub fn set_user_data(&mut self, user: Subject) {
        self.user = Some(user);
    }

    /// Sets `Subject`.
    pub fn set_subject(&mut self, subject: Subject) {
        self.subject = Some(subject);
    }

    /// Sets the common name of `Subject`, keeping its other components.
    pub fn set_common_name(&mut self, common_name: impl Into<String>) {
        self.subject.get_or_insert_with(Subject::default).common_name = common_name.into();
    }

    /// Classifies `sans` and sets `SANs`.
    pub fn set_sans<S: AsRef<str>>(&mut self, sans: &[S]) {
        self.sans = Some(create_sans(sans));
    }

    /// Sets `Token`. The value is neither validated nor interpreted.
    pub fn set_token(&mut self, token: impl Into<Value>) {
        self.token = Some(token.into());
    }

    /// Projects `cr` and sets `CR`.
    pub fn set_certificate_request(&mut self, cr: &X509CertificationRequest<'_>) {
        self.set_certificate_request_view(CertificateRequestView::new(cr));
    }

    /// Sets `CR` from an already projected request.
    pub fn set_certificate_request_view(&mut self, view: CertificateRequestView) {
        self.certificate_request = Some(view);
    }

    /// Returns `User`, if set.
    #[must_use]
    pub const fn user(&self) -> Option<&Subject> {
        self.user.as_ref()
    }

    /// Returns `Subject`, if set.
    #[must_use]
    pub const fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    /// Returns `SANs`, if set.
    #[must_use]
    pub fn sans(&self) -> Option<&[SubjectAltName]> {
        self.sans.as_deref()
    }

    /// Returns `Token`, if set.
    #[must_use]
    pub const fn token(&self) -> Option<&Value> {
        self.token.as_ref()
    }

    /// Returns `CR`, if set.
    #[must_use]
    pub const fn certificate_request(&self) -> Option<&CertificateRequestView> {
        self.certificate_request.as_ref()
    }

    /// Returns a caller-defined value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Returns a copy of the value under any key.
    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<TemplateValue> {
        match TemplateKey::from_name(key) {
            Some(TemplateKey::User) => self.user.clone().map(TemplateValue::Subject),
            Some(TemplateKey::Subject) => self.subject.clone().map(TemplateValue::Subject),
            Some(TemplateKey::Sans) => self.sans.clone().map(TemplateValue::Sans),
            Some(TemplateKey::Token) => self.token.clone().map(TemplateValue::Token),
            Some(TemplateKey::CertificateRequest) => {
                self.certificate_request.clone().map(TemplateValue::Request)
            }
            None => self.extra.get(key).cloned().map(TemplateValue::Opaque),
        }
    }

    /// Returns true if a value is set under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        match TemplateKey::from_name(key) {
            Some(TemplateKey::User) => self.user.is_some(),
            Some(TemplateKey::Subject) => self.subject.is_some(),
            Some(TemplateKey::Sans) => self.sans.is_some(),
            Some(TemplateKey::Token) => self.token.is_some(),
            Some(TemplateKey::CertificateRequest) => self.certificate_request.is_some(),
            None => self.extra.contains_key(key),
        }
    }

    /// Returns the number of keys set.
    #[must_use]
    pub fn len(&self) -> usize {
        TemplateKey::ALL
            .iter()
            .filter(|key| self.contains(key.as_str()))
            .count()
            + self.extra.len()
    }

    /// Returns true if nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        debug!(keys = self.len(), "clearing template data");
        *self = Self::default();
    }
}

fn shaped<T: DeserializeOwned>(key: TemplateKey, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        warn!(key = %key, error = %e, "rejected value for well-known template key");
        Error::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Like [`shaped`], but only JSON objects are accepted.
fn shaped_object<T: DeserializeOwned>(key: TemplateKey, value: Value) -> Result<T> {
    if !value.is_object() {
        warn!(key = %key, "rejected non-object value for well-known template key");
        return Err(Error::InvalidValue {
            key: key.to_string(),
            reason: "expected a JSON object".into(),
        });
    }
    shaped(key, value)
}

impl Serialize for TemplateData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        if let Some(user) = &self.user {
            map.serialize_entry(USER_KEY, user)?;
        }
        if let Some(subject) = &self.subject {
            map.serialize_entry(SUBJECT_KEY, subject)?;
        }
        if let Some(sans) = &self.sans {
            map.serialize_entry(SANS_KEY, sans)?;
        }
        if let Some(token) = &self.token {
            map.serialize_entry(TOKEN_KEY, token)?;
        }
        if let Some(cr) = &self.certificate_request {
            map.serialize_entry(CERTIFICATE_REQUEST_KEY, cr)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
