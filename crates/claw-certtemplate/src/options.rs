//! Template selection options.
//!
//! [`TemplateOptions`] decides which template body an issuance renders. It
//! deserializes from configuration, for example:
//!
//! ```json
//! { "source": { "file": "/etc/claw/templates/leaf.json.j2" } }
//! ```

use std::path::PathBuf;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::certificate::{render_certificate_template, CertificateTemplate};
use crate::data::TemplateData;
use crate::error::{Error, Result};
use crate::templates::{CertificateRole, TemplateRenderer};

/// Where a template body comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSource {
    /// The built-in template for a role.
    Default(CertificateRole),
    /// A template given inline.
    Inline(String),
    /// A template read from a file.
    File(PathBuf),
    /// A base64-encoded template.
    Base64(String),
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::Default(CertificateRole::Leaf)
    }
}

/// Options controlling certificate template selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOptions {
    /// Template source.
    #[serde(default)]
    pub source: TemplateSource,
}

impl TemplateOptions {
    /// Uses the built-in template for `role`.
    #[must_use]
    pub const fn new(role: CertificateRole) -> Self {
        Self {
            source: TemplateSource::Default(role),
        }
    }

    /// Uses an inline template.
    #[must_use]
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            source: TemplateSource::Inline(template.into()),
        }
    }

    /// Uses a template read from `path` at load time.
    #[must_use]
    pub fn with_template_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: TemplateSource::File(path.into()),
        }
    }

    /// Uses a base64-encoded template.
    #[must_use]
    pub fn with_template_base64(encoded: impl Into<String>) -> Self {
        Self {
            source: TemplateSource::Base64(encoded.into()),
        }
    }

    /// Resolves the template body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a template file cannot be read, or
    /// [`Error::Parse`] if a base64 template does not decode to UTF-8 text.
    pub fn load(&self) -> Result<String> {
        match &self.source {
            TemplateSource::Default(role) => Ok(role.default_template().to_string()),
            TemplateSource::Inline(template) => Ok(template.clone()),
            TemplateSource::File(path) => {
                debug!(path = %path.display(), "loading certificate template file");
                Ok(std::fs::read_to_string(path)?)
            }
            TemplateSource::Base64(encoded) => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| Error::Parse(format!("invalid base64 template: {e}")))?;
                String::from_utf8(bytes)
                    .map_err(|e| Error::Parse(format!("template is not UTF-8: {e}")))
            }
        }
    }

    /// Loads the template, renders it with `data` and parses the result.
    ///
    /// # Errors
    ///
    /// Returns the first load, render or parse error.
    pub fn render(
        &self,
        renderer: &TemplateRenderer,
        data: &TemplateData,
    ) -> Result<CertificateTemplate> {
        let source = self.load()?;
        render_certificate_template(renderer, &source, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::create_template_data;
    use crate::templates::{DEFAULT_INTERMEDIATE_TEMPLATE, DEFAULT_LEAF_TEMPLATE};
    use std::io::Write;

    #[test]
    fn default_options_use_leaf_template() {
        let options = TemplateOptions::default();
        assert_eq!(options.load().unwrap(), DEFAULT_LEAF_TEMPLATE);
        assert_eq!(
            TemplateOptions::new(CertificateRole::Intermediate).load().unwrap(),
            DEFAULT_INTERMEDIATE_TEMPLATE
        );
    }

    #[test]
    fn inline_template() {
        let options = TemplateOptions::with_template(r#"{"subject": {{ Subject | tojson }}}"#);
        let data = create_template_data("inline.example.com", &["inline.example.com"]);

        let template = options.render(&TemplateRenderer::new(), &data).unwrap();
        assert_eq!(template.subject.common_name, "inline.example.com");
        assert!(template.key_usage.is_empty());
    }

    #[test]
    fn file_template() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEFAULT_LEAF_TEMPLATE.as_bytes()).unwrap();

        let options = TemplateOptions::with_template_file(file.path());
        assert_eq!(options.load().unwrap(), DEFAULT_LEAF_TEMPLATE);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = TemplateOptions::with_template_file(dir.path().join("missing.tpl"));
        assert!(matches!(options.load(), Err(Error::Io(_))));
    }

    #[test]
    fn base64_template() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(DEFAULT_LEAF_TEMPLATE);
        let options = TemplateOptions::with_template_base64(encoded);
        assert_eq!(options.load().unwrap(), DEFAULT_LEAF_TEMPLATE);

        let bad = TemplateOptions::with_template_base64("!!not base64!!");
        assert!(matches!(bad.load(), Err(Error::Parse(_))));

        let not_utf8 = base64::engine::general_purpose::STANDARD.encode([0xff, 0xfe]);
        assert!(matches!(
            TemplateOptions::with_template_base64(not_utf8).load(),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn options_deserialize_from_config() {
        let options: TemplateOptions =
            serde_json::from_str(r#"{"source": {"default": "root"}}"#).unwrap();
        assert_eq!(options, TemplateOptions::new(CertificateRole::Root));

        let options: TemplateOptions =
            serde_json::from_str(r#"{"source": {"file": "/etc/claw/leaf.tpl"}}"#).unwrap();
        assert_eq!(options, TemplateOptions::with_template_file("/etc/claw/leaf.tpl"));

        let options: TemplateOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, TemplateOptions::default());
    }
}
