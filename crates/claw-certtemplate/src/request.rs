//! Template-visible projection of a parsed certificate signing request.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::cri_attributes::ParsedCriAttribute;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::oid_registry::{
    Oid, OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION, OID_PKCS1_SHA256WITHRSA,
    OID_PKCS1_SHA384WITHRSA, OID_SIG_ECDSA_WITH_SHA256, OID_SIG_ECDSA_WITH_SHA384,
    OID_SIG_ED25519,
};
use x509_parser::prelude::FromDer;

use crate::error::{Error, Result};
use crate::san::SubjectAltName;
use crate::subject::Subject;

/// Read-only view of a PKCS#10 request, safe to expose to templates.
///
/// Holds copies of the subject, requested names and algorithm metadata.
/// Never carries the raw request or key material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CertificateRequestView {
    /// PKCS#10 version field.
    pub version: u32,
    /// Requested subject.
    pub subject: Subject,
    /// Requested SANs in request order.
    pub sans: Vec<SubjectAltName>,
    /// Requested DNS names.
    pub dns_names: Vec<String>,
    /// Requested email addresses.
    pub email_addresses: Vec<String>,
    /// Requested IP addresses.
    pub ip_addresses: Vec<IpAddr>,
    /// Requested URIs.
    pub uris: Vec<String>,
    /// Public key algorithm name (`RSA`, `ECDSA`, `Ed25519` or a dotted OID).
    pub public_key_algorithm: String,
    /// Signature algorithm name.
    pub signature_algorithm: String,
    /// Whether the request signature verifies against its own public key.
    pub signature_valid: bool,
}

impl CertificateRequestView {
    /// Projects a parsed request. The request is only borrowed.
    #[must_use]
    pub fn new(cr: &X509CertificationRequest<'_>) -> Self {
        let info = &cr.certification_request_info;

        let mut view = Self {
            version: info.version.0,
            subject: Subject::from_x509_name(&info.subject),
            public_key_algorithm: public_key_algorithm_name(&info.subject_pki.algorithm.algorithm),
            signature_algorithm: signature_algorithm_name(&cr.signature_algorithm.algorithm),
            signature_valid: cr.verify_signature().is_ok(),
            ..Self::default()
        };

        let requested = info.iter_attributes().filter_map(|attr| {
            if let ParsedCriAttribute::ExtensionRequest(req) = attr.parsed_attribute() {
                Some(&req.extensions)
            } else {
                None
            }
        });
        for ext in requested.flatten() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for name in &san.general_names {
                    view.push_general_name(name);
                }
            }
        }

        if !view.signature_valid {
            warn!(
                subject = %view.subject.common_name,
                "certificate request signature does not verify"
            );
        }
        debug!(
            subject = %view.subject.common_name,
            sans = view.sans.len(),
            algorithm = %view.public_key_algorithm,
            "projected certificate request"
        );

        view
    }

    /// Parses a DER-encoded request and projects it.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid PKCS#10 request.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cr) = X509CertificationRequest::from_der(der)
            .map_err(|e| Error::Parse(format!("failed to parse certificate request: {e}")))?;
        Ok(Self::new(&cr))
    }

    fn push_general_name(&mut self, name: &GeneralName<'_>) {
        match name {
            GeneralName::DNSName(dns) => {
                self.dns_names.push((*dns).to_string());
                self.sans.push(SubjectAltName::Dns((*dns).to_string()));
            }
            GeneralName::RFC822Name(email) => {
                self.email_addresses.push((*email).to_string());
                self.sans.push(SubjectAltName::Email((*email).to_string()));
            }
            GeneralName::URI(uri) => {
                self.uris.push((*uri).to_string());
                self.sans.push(SubjectAltName::Uri((*uri).to_string()));
            }
            GeneralName::IPAddress(bytes) => {
                if let Some(ip) = parse_ip_bytes(bytes) {
                    self.ip_addresses.push(ip);
                    self.sans.push(SubjectAltName::Ip(ip));
                }
            }
            _ => {}
        }
    }
}

fn public_key_algorithm_name(oid: &Oid<'_>) -> String {
    if *oid == OID_PKCS1_RSAENCRYPTION {
        "RSA".into()
    } else if *oid == OID_KEY_TYPE_EC_PUBLIC_KEY {
        "ECDSA".into()
    } else if *oid == OID_SIG_ED25519 {
        "Ed25519".into()
    } else {
        oid.to_id_string()
    }
}

fn signature_algorithm_name(oid: &Oid<'_>) -> String {
    if *oid == OID_SIG_ECDSA_WITH_SHA256 {
        "ECDSA-SHA256".into()
    } else if *oid == OID_SIG_ECDSA_WITH_SHA384 {
        "ECDSA-SHA384".into()
    } else if *oid == OID_PKCS1_SHA256WITHRSA {
        "SHA256-RSA".into()
    } else if *oid == OID_PKCS1_SHA384WITHRSA {
        "SHA384-RSA".into()
    } else if *oid == OID_SIG_ED25519 {
        "Ed25519".into()
    } else {
        oid.to_id_string()
    }
}

/// Parses IP address bytes into an `IpAddr`.
fn parse_ip_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        _ => None,
    }
}
