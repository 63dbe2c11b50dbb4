//! Template rendering
//!
//! Thin wrapper around Tera used for every bootstrap payload runnerflow
//! produces (runner `.env`, cloud-init userdata, systemd drop-ins). Templates
//! are compiled into the binaries and registered by name.

use crate::error::TemplateError;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};
use tracing::{debug, warn};

/// Variable context
pub type Variables = HashMap<String, serde_json::Value>;

/// Named template set
pub struct TemplateProcessor {
    tera: Tera,
}

impl TemplateProcessor {
    /// Create an empty processor
    pub fn new() -> Self {
        let mut tera = Tera::default();
        // Payloads are shell and unit files, never HTML.
        tera.autoescape_on(vec![]);
        Self { tera }
    }

    /// Create a processor with the given `(name, source)` templates registered
    pub fn with_templates(templates: &[(&str, &str)]) -> Result<Self, TemplateError> {
        let mut processor = Self::new();
        for (name, source) in templates {
            processor.add_template(name, source)?;
        }
        Ok(processor)
    }

    /// Register a template under `name`
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.tera
            .add_raw_template(name, source)
            .map_err(|e| TemplateError::Parse {
                name: name.to_string(),
                message: extract_tera_error_detail(&e),
            })
    }

    /// Render a registered template
    ///
    /// Only the template name is logged; rendered payloads carry secrets.
    #[tracing::instrument(skip(self, context))]
    pub fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        match self.tera.render(name, context) {
            Ok(rendered) => {
                debug!(bytes = rendered.len(), "Rendered template");
                Ok(rendered)
            }
            Err(e) => {
                let message = extract_tera_error_detail(&e);
                warn!(error = %message, "Template rendering failed");
                Err(TemplateError::Render {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }

    /// Render a registered template from a flat variable map
    pub fn render_with(&self, name: &str, variables: &Variables) -> Result<String, TemplateError> {
        let mut context = Context::new();
        for (key, value) in variables {
            context.insert(key.as_str(), value);
        }
        self.render(name, &context)
    }

    /// Render an ad-hoc template string
    pub fn render_str<T: Serialize>(template: &str, value: &T) -> Result<String, TemplateError> {
        let context = Context::from_serialize(value).map_err(|e| TemplateError::Render {
            name: "<inline>".to_string(),
            message: extract_tera_error_detail(&e),
        })?;
        Tera::one_off(template, &context, false).map_err(|e| TemplateError::Render {
            name: "<inline>".to_string(),
            message: extract_tera_error_detail(&e),
        })
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a readable message from a Tera error chain
///
/// Tera wraps the interesting part (missing variable, bad filter) in its
/// `source()` chain; the top-level message only names the template.
fn extract_tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }

    let full_error = details.join(" | ");

    if full_error.contains("not found in context")
        && let Some(start) = full_error.find("Variable `")
        && let Some(end) = full_error[start..].find("` not found")
    {
        let var_name = &full_error[start + 10..start + end];
        return format!("undefined variable: `{}`", var_name);
    }

    full_error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_registered_template() {
        let processor =
            TemplateProcessor::with_templates(&[("greeting.j2", "hello {{ name }}")]).unwrap();

        let mut variables = Variables::new();
        variables.insert("name".to_string(), serde_json::json!("runner"));

        assert_eq!(
            processor.render_with("greeting.j2", &variables).unwrap(),
            "hello runner"
        );
    }

    #[test]
    fn test_undefined_variable_is_reported() {
        let processor =
            TemplateProcessor::with_templates(&[("greeting.j2", "hello {{ name }}")]).unwrap();

        let err = processor.render("greeting.j2", &Context::new()).unwrap_err();
        match err {
            TemplateError::Render { name, message } => {
                assert_eq!(name, "greeting.j2");
                assert!(message.contains("name"), "unexpected message: {message}");
            }
            other => panic!("Expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_no_html_escaping() {
        let processor =
            TemplateProcessor::with_templates(&[("payload.html", "{{ value }}")]).unwrap();

        let mut context = Context::new();
        context.insert("value", "a&b<c>");
        assert_eq!(processor.render("payload.html", &context).unwrap(), "a&b<c>");
    }

    #[test]
    fn test_parse_error() {
        let result = TemplateProcessor::with_templates(&[("broken.j2", "{% if %}")]);
        assert!(matches!(result, Err(TemplateError::Parse { .. })));
    }

    #[test]
    fn test_render_str() {
        #[derive(Serialize)]
        struct Vars {
            image: &'static str,
        }

        let rendered = TemplateProcessor::render_str("image={{ image }}", &Vars { image: "jammy" })
            .unwrap();
        assert_eq!(rendered, "image=jammy");
    }
}
