//! Subject Alternative Name values and classification.

use std::net::IpAddr;

use rcgen::Ia5String;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Subject Alternative Name types.
///
/// Serialized as `{"type": "dns", "value": "example.com"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SubjectAltName {
    /// DNS name.
    Dns(String),
    /// IP address.
    Ip(IpAddr),
    /// Email address.
    Email(String),
    /// URI.
    Uri(String),
}

/// The kind of a [`SubjectAltName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SanType {
    /// DNS name (the fallback for anything unrecognised).
    Dns,
    /// IPv4 or IPv6 literal.
    Ip,
    /// `local-part@domain` address.
    Email,
    /// Absolute URI with a scheme.
    Uri,
}

impl SanType {
    /// Returns the serialized name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dns => "dns",
            Self::Ip => "ip",
            Self::Email => "email",
            Self::Uri => "uri",
        }
    }
}

impl std::fmt::Display for SanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SubjectAltName {
    /// Returns the type of this name.
    #[must_use]
    pub const fn san_type(&self) -> SanType {
        match self {
            Self::Dns(_) => SanType::Dns,
            Self::Ip(_) => SanType::Ip,
            Self::Email(_) => SanType::Email,
            Self::Uri(_) => SanType::Uri,
        }
    }

    /// Returns the value as a string.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Dns(v) | Self::Email(v) | Self::Uri(v) => v.clone(),
            Self::Ip(ip) => ip.to_string(),
        }
    }
}

impl From<&str> for SubjectAltName {
    /// Classifies `name` by its lexical form.
    ///
    /// Checked in order: IP literal, email, URI with a scheme, and DNS name
    /// for everything else.
    fn from(name: &str) -> Self {
        if let Ok(ip) = name.parse::<IpAddr>() {
            Self::Ip(ip)
        } else if is_email(name) {
            Self::Email(name.to_string())
        } else if url::Url::parse(name).is_ok() {
            Self::Uri(name.to_string())
        } else {
            Self::Dns(name.to_string())
        }
    }
}

impl TryFrom<&SubjectAltName> for rcgen::SanType {
    type Error = Error;

    /// Fails if a DNS name, email or URI is not IA5 (ASCII) text.
    fn try_from(san: &SubjectAltName) -> Result<Self> {
        let ia5 = |kind: &str, value: &str| {
            Ia5String::try_from(value)
                .map_err(|e| Error::San(format!("invalid {kind} '{value}': {e}")))
        };
        Ok(match san {
            SubjectAltName::Dns(dns) => Self::DnsName(ia5("DNS name", dns)?),
            SubjectAltName::Ip(ip) => Self::IpAddress(*ip),
            SubjectAltName::Email(email) => Self::Rfc822Name(ia5("email", email)?),
            SubjectAltName::Uri(uri) => Self::URI(ia5("URI", uri)?),
        })
    }
}

/// Returns the SAN type `name` would be classified as.
#[must_use]
pub fn classify_san(name: &str) -> SanType {
    SubjectAltName::from(name).san_type()
}

/// Creates typed SANs from plain strings, preserving order.
///
/// An empty input yields an empty vector.
#[must_use]
pub fn create_sans<S: AsRef<str>>(names: &[S]) -> Vec<SubjectAltName> {
    names
        .iter()
        .map(|name| SubjectAltName::from(name.as_ref()))
        .collect()
}

/// `local-part@domain`, exactly one `@`, no whitespace, `:` or `/` in either half.
fn is_email(name: &str) -> bool {
    let Some((local, domain)) = name.split_once('@') else {
        return false;
    };
    let valid_part = |part: &str| {
        !part.is_empty() && !part.chars().any(|c| c.is_whitespace() || matches!(c, '@' | ':' | '/'))
    };
    valid_part(local) && valid_part(domain)
}
