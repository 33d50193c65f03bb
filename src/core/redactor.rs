//! Sensitive data masking
//!
//! Two rules are applied to every message:
//! - key-value pairs whose key is a sensitive field name (`password: x`,
//!   `"email"="x"`, case-insensitive, quoted or bare) get their value
//!   replaced by the mask token, keeping the surrounding quotes. A bare
//!   value runs up to the next delimiter (a quote, `,` `;` `&` `}` `]` or a
//!   line break), so multi-word secrets are covered. A quoted value that is
//!   never closed is masked up to the next `,` or the end of the text;
//! - any email address found in free text is masked on its own.
//!
//! Structured payloads are masked key-by-key first, then serialized and
//! passed through the same text rules.

use super::error::{LoggerError, Result};
use super::log_context::{FieldValue, LogContext};
use super::log_record::Message;
use regex::{Captures, NoExpand, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::io;
use std::sync::LazyLock;

/// Replacement for masked values
pub const DEFAULT_MASK: &str = "*****";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)*\.\w+").expect("email pattern is a valid regex")
});

/// Redaction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactionConfig {
    /// Field names whose values are masked (matched case-insensitively)
    pub fields: Vec<String>,
    /// Token written in place of masked values
    pub mask: String,
    /// Mask email addresses appearing anywhere in the text
    pub mask_emails: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            fields: vec!["password".to_string(), "email".to_string()],
            mask: DEFAULT_MASK.to_string(),
            mask_emails: true,
        }
    }
}

/// Masks sensitive values in log messages
///
/// Stateless after construction; share it freely across threads.
///
/// # Example
///
/// ```
/// use masked_logger::Redactor;
///
/// let redactor = Redactor::default();
/// let masked = redactor.redact_text(r#"login failed: "password": "hunter2" for bob@example.com"#);
/// assert_eq!(masked, r#"login failed: "password": "*****" for *****"#);
/// ```
#[derive(Debug, Clone)]
pub struct Redactor {
    fields: HashSet<String>,
    field_pattern: Option<Regex>,
    mask_emails: bool,
    mask: String,
}

impl Redactor {
    /// Compile a redactor from configuration
    pub fn new(config: RedactionConfig) -> Result<Self> {
        if config.mask.is_empty() {
            return Err(LoggerError::config("redaction", "mask token must not be empty"));
        }

        let fields: HashSet<String> = config
            .fields
            .iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();

        let field_pattern = if fields.is_empty() {
            None
        } else {
            let mut names: Vec<&str> = fields.iter().map(String::as_str).collect();
            // Longest first so `password_hash` wins over `password`
            names.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
            let alternation = names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(
                r#"(?i)(?P<key>["']?(?:{alternation})["']?\s*[:=]\s*)(?:"(?P<dq>(?:[^"\\]|\\.)*)"|'(?P<sq>[^']*)'|"(?P<dq_open>(?:[^"\\,]|\\.)*)|'(?P<sq_open>[^',]*)|(?P<bare>[^\s"',;&}}\]](?:[^"',;&}}\]\r\n]*[^\s"',;&}}\]])?))"#
            );
            Some(
                Regex::new(&pattern)
                    .map_err(|e| LoggerError::config("redaction", e.to_string()))?,
            )
        };

        Ok(Self {
            fields,
            field_pattern,
            mask_emails: config.mask_emails,
            mask: config.mask,
        })
    }

    /// The mask token
    pub fn mask(&self) -> &str {
        &self.mask
    }

    /// Check if a field name is sensitive
    pub fn is_sensitive(&self, field: &str) -> bool {
        self.fields.contains(&field.to_lowercase())
    }

    /// Redact a message of either kind into its final text
    pub fn redact(&self, message: &Message) -> String {
        match message {
            Message::Text(text) => self.redact_text(text),
            Message::Structured(value) => {
                let mut value = value.clone();
                self.redact_value(&mut value);
                let text = canonical_json(&value).unwrap_or_else(|_| value.to_string());
                self.redact_text(&text)
            }
        }
    }

    /// Apply the text rules
    pub fn redact_text(&self, text: &str) -> String {
        let mut result = match &self.field_pattern {
            Some(pattern) => pattern
                .replace_all(text, |caps: &Captures<'_>| self.mask_pair(caps))
                .into_owned(),
            None => text.to_string(),
        };

        if self.mask_emails {
            result = EMAIL_PATTERN
                .replace_all(&result, NoExpand(&self.mask))
                .into_owned();
        }

        result
    }

    fn mask_pair(&self, caps: &Captures<'_>) -> String {
        let key = caps.name("key").map_or("", |m| m.as_str());
        if caps.name("dq").is_some() {
            format!("{}\"{}\"", key, self.mask)
        } else if caps.name("sq").is_some() {
            format!("{}'{}'", key, self.mask)
        } else if caps.name("dq_open").is_some() {
            format!("{}\"{}", key, self.mask)
        } else if caps.name("sq_open").is_some() {
            format!("{}'{}", key, self.mask)
        } else {
            format!("{}{}", key, self.mask)
        }
    }

    /// Redact a JSON value recursively
    pub fn redact_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *val = Value::String(self.mask.clone());
                    } else {
                        self.redact_value(val);
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.redact_value(item);
                }
            }
            Value::String(s) => {
                *s = self.redact_text(s);
            }
            _ => {}
        }
    }

    /// Redact extra fields in place
    pub fn redact_context(&self, context: &mut LogContext) {
        for (key, value) in context.fields_mut().iter_mut() {
            if self.is_sensitive(key) {
                *value = FieldValue::String(self.mask.clone());
            } else if let FieldValue::String(s) = value {
                *s = self.redact_text(s);
            }
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default()).expect("default redaction config compiles")
    }
}

/// JSON with `", "` and `": "` separators, so key-value rules see the same
/// spacing as hand-written JSON
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn canonical_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    serde::Serialize::serialize(value, &mut serializer)?;
    String::from_utf8(buf).map_err(|e| LoggerError::other(e.to_string()))
}
