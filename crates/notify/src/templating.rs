//! Minijinja templates for notification titles and bodies.
//!
//! Each threshold has its own title/body pair. Built-in defaults can be
//! overridden per threshold from a TOML file:
//!
//! ```toml
//! [one_hour]
//! title = "Last call"
//! body = "Order {{ order_label }} locks at {{ deadline }}."
//! ```

use std::path::Path;

use duewatch_core::Threshold;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template rendering failed: {0}")]
    Render(String),

    #[error("Failed to load templates from {path}: {reason}")]
    Load { path: String, reason: String },
}

/// Values available to every template.
#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub order_label: String,
    pub order_code: String,
    /// Deadline formatted in the sweep's local time zone.
    pub deadline: String,
    /// Signed hours until the deadline (negative once passed).
    pub hours_remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub title: String,
    pub body: String,
}

impl MessageTemplate {
    fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

/// Title/body templates for each threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub three_hours: MessageTemplate,
    pub one_hour: MessageTemplate,
    pub passed: MessageTemplate,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            three_hours: MessageTemplate::new(
                "⏰ Change deadline in 3 hours",
                "Order {{ order_label }}: 3 hours left until the change deadline.",
            ),
            one_hour: MessageTemplate::new(
                "⏰ Change deadline in 1 hour",
                "Order {{ order_label }}: 1 hour left until the change deadline!",
            ),
            passed: MessageTemplate::new(
                "🚨 Change deadline passed",
                "Order {{ order_label }}: the change deadline has passed.",
            ),
        }
    }
}

impl MessageTemplates {
    /// Load overrides from a TOML file; thresholds not mentioned keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, TemplateError> {
        let load_err = |reason: String| TemplateError::Load {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let templates: Self = toml::from_str(&raw).map_err(|e| load_err(e.to_string()))?;
        templates.validate()?;
        Ok(templates)
    }

    pub fn get(&self, threshold: Threshold) -> &MessageTemplate {
        match threshold {
            Threshold::ThreeHours => &self.three_hours,
            Threshold::OneHour => &self.one_hour,
            Threshold::Passed => &self.passed,
        }
    }

    /// Check that every template parses.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let env = build_env();
        for threshold in Threshold::ALL {
            let tpl = self.get(threshold);
            for source in [tpl.title.as_str(), tpl.body.as_str()] {
                env.template_from_str(source)
                    .map_err(|e| TemplateError::Render(format!("{threshold}: {e}")))?;
            }
        }
        Ok(())
    }

    pub fn render(
        &self,
        threshold: Threshold,
        ctx: &MessageContext,
    ) -> Result<RenderedMessage, TemplateError> {
        let env = build_env();
        let tpl = self.get(threshold);
        let render = |source: &str| {
            env.render_str(source, ctx)
                .map_err(|e| TemplateError::Render(e.to_string()))
        };
        Ok(RenderedMessage {
            title: render(tpl.title.as_str())?,
            body: render(tpl.body.as_str())?,
        })
    }
}

fn build_env<'source>() -> minijinja::Environment<'source> {
    let mut env = minijinja::Environment::new();
    env.add_filter("round", round_filter);
    env
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ctx() -> MessageContext {
        MessageContext {
            order_label: "00XY".to_string(),
            order_code: "2024031500XY".to_string(),
            deadline: "2024-03-17 06:00".to_string(),
            hours_remaining: 2.74,
        }
    }

    #[test]
    fn defaults_render_label() {
        let templates = MessageTemplates::default();
        let msg = templates.render(Threshold::ThreeHours, &ctx()).unwrap();
        assert!(msg.title.contains("3 hours"));
        assert_eq!(msg.body, "Order 00XY: 3 hours left until the change deadline.");

        let passed = templates.render(Threshold::Passed, &ctx()).unwrap();
        assert!(passed.body.contains("has passed"));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(MessageTemplates::default().validate().is_ok());
    }

    #[test]
    fn custom_template_uses_context() {
        let mut templates = MessageTemplates::default();
        templates.one_hour.body = "{{ order_code }} locks at {{ deadline }} \
            ({{ hours_remaining | round(1) }}h)"
            .to_string();
        let msg = templates.render(Threshold::OneHour, &ctx()).unwrap();
        assert_eq!(msg.body, "2024031500XY locks at 2024-03-17 06:00 (2.7h)");
    }

    #[test]
    fn invalid_template_is_rejected() {
        let mut templates = MessageTemplates::default();
        templates.passed.title = "{{ unclosed".to_string();
        assert!(templates.validate().is_err());
        assert!(matches!(
            templates.render(Threshold::Passed, &ctx()),
            Err(TemplateError::Render(_))
        ));
    }

    #[test]
    fn toml_overrides_are_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[one_hour]\ntitle = \"Last call\"\nbody = \"{{{{ order_label }}}} closes soon\""
        )
        .unwrap();

        let templates = MessageTemplates::from_toml_file(file.path()).unwrap();
        assert_eq!(templates.one_hour.title, "Last call");
        assert_eq!(templates.three_hours, MessageTemplates::default().three_hours);

        let msg = templates.render(Threshold::OneHour, &ctx()).unwrap();
        assert_eq!(msg.body, "00XY closes soon");
    }

    #[test]
    fn missing_file_is_load_error() {
        let result = MessageTemplates::from_toml_file(Path::new("/nonexistent/templates.toml"));
        assert!(matches!(result, Err(TemplateError::Load { .. })));
    }
}
