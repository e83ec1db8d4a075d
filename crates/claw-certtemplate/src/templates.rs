//! Default certificate templates and the template renderer.
//!
//! Templates are [minijinja] documents that render to JSON. Data is exposed
//! under the well-known names, so a template reads `{{ Subject | tojson }}`.

use minijinja::value::Value;
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::TemplateData;
use crate::error::Result;

/// Default template for leaf (end-entity) certificates.
pub const DEFAULT_LEAF_TEMPLATE: &str = r#"{
	"subject": {{ Subject | tojson }},
	"sans": {{ SANs | tojson }},
	"keyUsage": ["keyEncipherment", "digitalSignature"],
	"extKeyUsage": ["serverAuth", "clientAuth"]
}"#;

/// Default template for intermediate CA certificates.
pub const DEFAULT_INTERMEDIATE_TEMPLATE: &str = r#"{
	"subject": {{ Subject | tojson }},
	"keyUsage": ["certSign", "crlSign"],
	"basicConstraints": {
		"isCA": true,
		"maxPathLen": 0
	}
}"#;

/// Default template for self-signed root CA certificates.
pub const DEFAULT_ROOT_TEMPLATE: &str = r#"{
	"subject": {{ Subject | tojson }},
	"issuer": {{ Subject | tojson }},
	"keyUsage": ["certSign", "crlSign"],
	"basicConstraints": {
		"isCA": true,
		"maxPathLen": 1
	}
}"#;

/// Role of the certificate being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateRole {
    /// End-entity certificate.
    #[default]
    Leaf,
    /// Intermediate CA certificate.
    Intermediate,
    /// Root CA certificate.
    Root,
}

impl CertificateRole {
    /// Returns the default template for this role.
    #[must_use]
    pub const fn default_template(&self) -> &'static str {
        match self {
            Self::Leaf => DEFAULT_LEAF_TEMPLATE,
            Self::Intermediate => DEFAULT_INTERMEDIATE_TEMPLATE,
            Self::Root => DEFAULT_ROOT_TEMPLATE,
        }
    }
}

impl std::fmt::Display for CertificateRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Leaf => f.write_str("leaf"),
            Self::Intermediate => f.write_str("intermediate"),
            Self::Root => f.write_str("root"),
        }
    }
}

/// Renders certificate templates against [`TemplateData`].
///
/// Undefined values are errors: a template that reads a key the data does
/// not hold fails instead of producing a partial document.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Creates a renderer with strict undefined handling and a `tojson`
    /// filter.
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("tojson", tojson);
        Self { env }
    }

    /// Renders `source` with `data`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Render`] on template syntax errors or when the
    /// template references a value that is not set.
    pub fn render(&self, source: &str, data: &TemplateData) -> Result<String> {
        let rendered = self.env.render_str(source, data).map_err(|e| {
            warn!(error = %e, "certificate template rendering failed");
            e
        })?;
        debug!(bytes = rendered.len(), keys = data.len(), "rendered certificate template");
        Ok(rendered)
    }

    /// Renders the default template for `role`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Render`] if the data lacks a key the default
    /// template reads.
    pub fn render_role(&self, role: CertificateRole, data: &TemplateData) -> Result<String> {
        debug!(%role, "rendering default certificate template");
        self.render(role.default_template(), data)
    }
}

/// Serializes a value as JSON. Undefined values are errors, never `null`.
fn tojson(value: Value) -> std::result::Result<Value, minijinja::Error> {
    if value.is_undefined() {
        return Err(minijinja::Error::new(
            ErrorKind::UndefinedError,
            "cannot serialize an undefined value to JSON",
        ));
    }
    serde_json::to_string(&value)
        .map(Value::from_safe_string)
        .map_err(|e| {
            minijinja::Error::new(ErrorKind::InvalidOperation, "cannot serialize to JSON")
                .with_source(e)
        })
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::create_template_data;
    use crate::error::Error;
    use crate::subject::create_subject;
    use serde_json::{json, Value};

    fn render_json(role: CertificateRole, data: &TemplateData) -> Value {
        let rendered = TemplateRenderer::new().render_role(role, data).unwrap();
        serde_json::from_str(&rendered).unwrap()
    }

    #[test]
    fn leaf_template_end_to_end() {
        let data = create_template_data(
            "example.com",
            &["example.com", "10.0.0.1", "user@example.com"],
        );
        let doc = render_json(CertificateRole::Leaf, &data);

        assert_eq!(doc["subject"]["commonName"], "example.com");
        assert_eq!(
            doc["sans"],
            json!([
                {"type": "dns", "value": "example.com"},
                {"type": "ip", "value": "10.0.0.1"},
                {"type": "email", "value": "user@example.com"}
            ])
        );
        assert_eq!(doc["keyUsage"], json!(["keyEncipherment", "digitalSignature"]));
        assert_eq!(doc["extKeyUsage"], json!(["serverAuth", "clientAuth"]));
        assert!(doc.get("basicConstraints").is_none());
    }

    #[test]
    fn leaf_template_with_empty_sans() {
        let data = create_template_data::<&str>("example.com", &[]);
        let doc = render_json(CertificateRole::Leaf, &data);
        assert_eq!(doc["sans"], json!([]));
    }

    #[test]
    fn intermediate_template() {
        let mut data = TemplateData::new();
        data.set_subject(create_subject("Clawbernetes Intermediate CA"));
        let doc = render_json(CertificateRole::Intermediate, &data);

        assert_eq!(doc["subject"], json!({"commonName": "Clawbernetes Intermediate CA"}));
        assert_eq!(doc["keyUsage"], json!(["certSign", "crlSign"]));
        assert_eq!(doc["basicConstraints"], json!({"isCA": true, "maxPathLen": 0}));
        assert!(doc.get("issuer").is_none());
        assert!(doc.get("sans").is_none());
    }

    #[test]
    fn root_template() {
        let mut data = TemplateData::new();
        data.set_subject(create_subject("Root CA"));
        let doc = render_json(CertificateRole::Root, &data);

        assert_eq!(doc["subject"], json!({"commonName": "Root CA"}));
        assert_eq!(doc["subject"], doc["issuer"]);
        assert_eq!(doc["keyUsage"], json!(["certSign", "crlSign"]));
        assert_eq!(doc["basicConstraints"], json!({"isCA": true, "maxPathLen": 1}));
    }

    #[test]
    fn missing_key_is_a_render_error() {
        let mut data = TemplateData::new();
        data.set_subject(create_subject("example.com"));

        let result = TemplateRenderer::new().render_role(CertificateRole::Leaf, &data);
        assert!(matches!(result, Err(Error::Render(_))));
    }

    #[test]
    fn syntax_error_is_a_render_error() {
        let data = create_template_data("example.com", &["example.com"]);
        let result = TemplateRenderer::new().render(r#"{"subject": {{ Subject | tojson }"#, &data);
        assert!(matches!(result, Err(Error::Render(_))));
    }

    #[test]
    fn custom_template_reads_token_and_caller_keys() {
        let mut data = create_template_data("node-1", &["node-1.local"]);
        data.set_token(json!({"sub": "node-1", "groups": ["workers"]}));
        data.set("Cluster", "prod-eu").unwrap();

        let source = r#"{
	"subject": {"commonName": {{ Token.sub | tojson }}, "organizationalUnit": {{ Cluster | tojson }}},
	"sans": {{ SANs | tojson }}
}"#;
        let rendered = TemplateRenderer::new().render(source, &data).unwrap();
        let doc: Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(doc["subject"]["commonName"], "node-1");
        assert_eq!(doc["subject"]["organizationalUnit"], "prod-eu");
    }

    #[test]
    fn special_characters_stay_valid_json() {
        let data = create_template_data(r#"evil", "isCA": true, "x": "<b>&'"#, &["a.example.com"]);
        let doc = render_json(CertificateRole::Leaf, &data);

        assert_eq!(doc["subject"]["commonName"], r#"evil", "isCA": true, "x": "<b>&'"#);
        assert!(doc.get("isCA").is_none());
    }

    #[test]
    fn role_defaults_and_display() {
        assert_eq!(CertificateRole::default(), CertificateRole::Leaf);
        assert_eq!(CertificateRole::Root.default_template(), DEFAULT_ROOT_TEMPLATE);
        assert_eq!(CertificateRole::Intermediate.to_string(), "intermediate");
        let role: CertificateRole = serde_json::from_str(r#""root""#).unwrap();
        assert_eq!(role, CertificateRole::Root);
    }
}
