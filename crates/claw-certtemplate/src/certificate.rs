//! Rendered certificate descriptors.
//!
//! A rendered template is a JSON document describing the subject, names,
//! key usages and basic constraints of the certificate to issue.
//! [`CertificateTemplate`] parses that document and writes it onto
//! [`rcgen::CertificateParams`]; signing is left to the caller.

use std::str::FromStr;

use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa,
    KeyUsagePurpose, SanType,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::TemplateData;
use crate::error::{Error, Result};
use crate::san::SubjectAltName;
use crate::subject::Subject;
use crate::templates::TemplateRenderer;

/// X.509 key usage bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "String")]
pub enum KeyUsage {
    /// digitalSignature
    DigitalSignature,
    /// contentCommitment (formerly nonRepudiation)
    ContentCommitment,
    /// keyEncipherment
    KeyEncipherment,
    /// dataEncipherment
    DataEncipherment,
    /// keyAgreement
    KeyAgreement,
    /// keyCertSign
    CertSign,
    /// cRLSign
    CrlSign,
    /// encipherOnly
    EncipherOnly,
    /// decipherOnly
    DecipherOnly,
}

impl KeyUsage {
    const NAMES: [(&'static str, Self); 9] = [
        ("digitalsignature", Self::DigitalSignature),
        ("contentcommitment", Self::ContentCommitment),
        ("keyencipherment", Self::KeyEncipherment),
        ("dataencipherment", Self::DataEncipherment),
        ("keyagreement", Self::KeyAgreement),
        ("certsign", Self::CertSign),
        ("crlsign", Self::CrlSign),
        ("encipheronly", Self::EncipherOnly),
        ("decipheronly", Self::DecipherOnly),
    ];

    const fn purpose(self) -> KeyUsagePurpose {
        match self {
            Self::DigitalSignature => KeyUsagePurpose::DigitalSignature,
            Self::ContentCommitment => KeyUsagePurpose::ContentCommitment,
            Self::KeyEncipherment => KeyUsagePurpose::KeyEncipherment,
            Self::DataEncipherment => KeyUsagePurpose::DataEncipherment,
            Self::KeyAgreement => KeyUsagePurpose::KeyAgreement,
            Self::CertSign => KeyUsagePurpose::KeyCertSign,
            Self::CrlSign => KeyUsagePurpose::CrlSign,
            Self::EncipherOnly => KeyUsagePurpose::EncipherOnly,
            Self::DecipherOnly => KeyUsagePurpose::DecipherOnly,
        }
    }
}

impl FromStr for KeyUsage {
    type Err = Error;

    /// Case-insensitive: `certSign`, `CertSign` and `certsign` are equal.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, usage)| *usage)
            .ok_or_else(|| Error::InvalidKeyUsage(s.to_string()))
    }
}

impl TryFrom<String> for KeyUsage {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Extended key usage purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "String")]
pub enum ExtKeyUsage {
    /// Any purpose.
    Any,
    /// TLS server authentication.
    ServerAuth,
    /// TLS client authentication.
    ClientAuth,
    /// Code signing.
    CodeSigning,
    /// Email protection.
    EmailProtection,
    /// Time stamping.
    TimeStamping,
    /// OCSP response signing.
    OcspSigning,
}

impl ExtKeyUsage {
    const NAMES: [(&'static str, Self); 7] = [
        ("any", Self::Any),
        ("serverauth", Self::ServerAuth),
        ("clientauth", Self::ClientAuth),
        ("codesigning", Self::CodeSigning),
        ("emailprotection", Self::EmailProtection),
        ("timestamping", Self::TimeStamping),
        ("ocspsigning", Self::OcspSigning),
    ];

    /// Returns the OID string for this usage.
    #[must_use]
    pub const fn oid(&self) -> &'static str {
        match self {
            Self::Any => "2.5.29.37.0",
            Self::ServerAuth => "1.3.6.1.5.5.7.3.1",
            Self::ClientAuth => "1.3.6.1.5.5.7.3.2",
            Self::CodeSigning => "1.3.6.1.5.5.7.3.3",
            Self::EmailProtection => "1.3.6.1.5.5.7.3.4",
            Self::TimeStamping => "1.3.6.1.5.5.7.3.8",
            Self::OcspSigning => "1.3.6.1.5.5.7.3.9",
        }
    }

    const fn purpose(self) -> ExtendedKeyUsagePurpose {
        match self {
            Self::Any => ExtendedKeyUsagePurpose::Any,
            Self::ServerAuth => ExtendedKeyUsagePurpose::ServerAuth,
            Self::ClientAuth => ExtendedKeyUsagePurpose::ClientAuth,
            Self::CodeSigning => ExtendedKeyUsagePurpose::CodeSigning,
            Self::EmailProtection => ExtendedKeyUsagePurpose::EmailProtection,
            Self::TimeStamping => ExtendedKeyUsagePurpose::TimeStamping,
            Self::OcspSigning => ExtendedKeyUsagePurpose::OcspSigning,
        }
    }
}

impl FromStr for ExtKeyUsage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::NAMES
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, usage)| *usage)
            .ok_or_else(|| Error::InvalidKeyUsage(s.to_string()))
    }
}

impl TryFrom<String> for ExtKeyUsage {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// The basic constraints extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicConstraints {
    /// Whether the certificate is a CA.
    #[serde(rename = "isCA", default)]
    pub is_ca: bool,
    /// Maximum number of intermediate CAs below this one; negative means
    /// unconstrained.
    #[serde(rename = "maxPathLen", default)]
    pub max_path_len: i32,
}

impl BasicConstraints {
    fn to_is_ca(self) -> Result<IsCa> {
        if !self.is_ca {
            return Ok(IsCa::ExplicitNoCa);
        }
        if self.max_path_len < 0 {
            return Ok(IsCa::Ca(rcgen::BasicConstraints::Unconstrained));
        }
        let len = u8::try_from(self.max_path_len).map_err(|_| Error::InvalidValue {
            key: "basicConstraints.maxPathLen".into(),
            reason: format!("{} is out of range", self.max_path_len),
        })?;
        Ok(IsCa::Ca(rcgen::BasicConstraints::Constrained(len)))
    }
}

/// A parsed, rendered certificate template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CertificateTemplate {
    /// Certificate subject.
    pub subject: Subject,
    /// Issuer; present for self-signed templates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Subject>,
    /// Subject alternative names.
    pub sans: Vec<SubjectAltName>,
    /// Key usages.
    pub key_usage: Vec<KeyUsage>,
    /// Extended key usages.
    pub ext_key_usage: Vec<ExtKeyUsage>,
    /// Basic constraints, if the template sets them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_constraints: Option<BasicConstraints>,
}

impl CertificateTemplate {
    /// Parses a rendered template.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if `json` is not a valid descriptor.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("invalid certificate template: {e}")))
    }

    /// Returns true if the issuer equals the subject.
    #[must_use]
    pub fn is_self_signed(&self) -> bool {
        self.issuer.as_ref() == Some(&self.subject)
    }

    /// Returns true if basic constraints mark this as a CA.
    #[must_use]
    pub fn is_ca(&self) -> bool {
        self.basic_constraints.is_some_and(|bc| bc.is_ca)
    }

    /// Writes the descriptor onto certificate parameters.
    ///
    /// Replaces the distinguished name, SANs, key usages and extended key
    /// usages; sets `is_ca` only when basic constraints are present.
    ///
    /// # Errors
    ///
    /// Returns an error if a SAN is not representable or `maxPathLen` is out
    /// of range. `params` is unchanged on error.
    pub fn apply_to(&self, params: &mut CertificateParams) -> Result<()> {
        let subject_alt_names = self
            .sans
            .iter()
            .map(SanType::try_from)
            .collect::<Result<Vec<_>>>()?;
        let is_ca = self
            .basic_constraints
            .map(BasicConstraints::to_is_ca)
            .transpose()?;

        params.distinguished_name = distinguished_name(&self.subject);
        params.subject_alt_names = subject_alt_names;
        params.key_usages = self.key_usage.iter().map(|u| u.purpose()).collect();
        params.extended_key_usages = self.ext_key_usage.iter().map(|u| u.purpose()).collect();
        if let Some(is_ca) = is_ca {
            params.is_ca = is_ca;
        }

        debug!(
            subject = %self.subject.common_name,
            sans = self.sans.len(),
            ca = self.is_ca(),
            "applied certificate template"
        );
        Ok(())
    }
}

/// Renders `source` with `data` and parses the result.
///
/// Any failure aborts: there is no partially applied descriptor.
///
/// # Errors
///
/// Returns [`Error::Render`] or [`Error::Parse`].
pub fn render_certificate_template(
    renderer: &TemplateRenderer,
    source: &str,
    data: &TemplateData,
) -> Result<CertificateTemplate> {
    let rendered = renderer.render(source, data)?;
    let template = CertificateTemplate::from_json(&rendered)?;
    info!(
        subject = %template.subject.common_name,
        ca = template.is_ca(),
        "certificate template rendered"
    );
    Ok(template)
}

/// Builds an rcgen distinguished name. rcgen keeps one value per attribute
/// type, so only the first value of multi-valued components is used.
fn distinguished_name(subject: &Subject) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    if !subject.common_name.is_empty() {
        dn.push(DnType::CommonName, subject.common_name.as_str());
    }
    let multi = [
        (DnType::CountryName, &subject.country),
        (DnType::OrganizationName, &subject.organization),
        (DnType::OrganizationalUnitName, &subject.organizational_unit),
        (DnType::LocalityName, &subject.locality),
        (DnType::StateOrProvinceName, &subject.province),
        (DnType::CustomDnType(vec![2, 5, 4, 9]), &subject.street_address),
        (DnType::CustomDnType(vec![2, 5, 4, 17]), &subject.postal_code),
    ];
    for (ty, values) in multi {
        if let Some(first) = values.first() {
            dn.push(ty, first.as_str());
        }
    }
    if !subject.serial_number.is_empty() {
        dn.push(
            DnType::CustomDnType(vec![2, 5, 4, 5]),
            subject.serial_number.as_str(),
        );
    }
    dn
}
