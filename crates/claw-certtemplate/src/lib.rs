//! Certificate template data binding for Clawbernetes.
#![forbid(unsafe_code)]
//!
//! This crate collects per-request identity values (subject, SANs, the
//! requester, an authentication token and the parsed certificate request)
//! and renders them through a template into a JSON descriptor of the
//! certificate to issue.
//!
//! # Overview
//!
//! The `claw-certtemplate` crate provides:
//! - Subject and SAN value types with deterministic SAN classification
//! - A template-safe view of a parsed PKCS#10 request
//! - [`TemplateData`], the per-request container with typed well-known keys
//! - Default leaf, intermediate and root templates
//! - Parsing of the rendered descriptor and application to `rcgen` parameters
//!
//! # Example
//!
//! ```
//! use claw_certtemplate::{
//!     create_template_data, CertificateRole, CertificateTemplate, TemplateRenderer,
//! };
//!
//! let data = create_template_data("node-1.clawbernetes.local", &["node-1.clawbernetes.local", "10.0.0.1"]);
//!
//! let renderer = TemplateRenderer::new();
//! let json = renderer.render_role(CertificateRole::Leaf, &data).unwrap();
//!
//! let template = CertificateTemplate::from_json(&json).unwrap();
//! assert_eq!(template.subject.common_name, "node-1.clawbernetes.local");
//! assert_eq!(template.sans.len(), 2);
//! ```
//!
//! # Modules
//!
//! - [`subject`] - Distinguished name values
//! - [`san`] - Subject alternative names and classification
//! - [`request`] - Certificate request view
//! - [`data`] - Template data container
//! - [`templates`] - Default templates and rendering
//! - [`certificate`] - Rendered descriptor parsing and application
//! - [`options`] - Template source configuration
//! - [`error`] - Error types

pub mod certificate;
pub mod data;
pub mod error;
pub mod options;
pub mod request;
pub mod san;
pub mod subject;
pub mod templates;


// Re-export commonly used types at crate root
pub use certificate::{
    render_certificate_template, BasicConstraints, CertificateTemplate, ExtKeyUsage, KeyUsage,
};
pub use data::{
    create_template_data, TemplateData, TemplateKey, TemplateValue, CERTIFICATE_REQUEST_KEY,
    SANS_KEY, SUBJECT_KEY, TOKEN_KEY, USER_KEY,
};
pub use error::{Error, Result};
pub use options::{TemplateOptions, TemplateSource};
pub use request::CertificateRequestView;
pub use san::{classify_san, create_sans, SanType, SubjectAltName};
pub use subject::{create_subject, Subject};
pub use templates::{
    CertificateRole, TemplateRenderer, DEFAULT_INTERMEDIATE_TEMPLATE, DEFAULT_LEAF_TEMPLATE,
    DEFAULT_ROOT_TEMPLATE,
};
