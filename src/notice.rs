//! Notice banner documents.
//!
//! A notice is a small JSON document fetched by the host application and
//! handed over as text. Publishers have used several field names over time,
//! so each field is looked up through an ordered list of aliases.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::NoticeConfig;

const ID_KEYS: &[&str] = &["id", "noticeId", "version"];
const TITLE_KEYS: &[&str] = &["title", "headline", "subject"];
const MESSAGE_KEYS: &[&str] = &["message", "body", "text", "content", "notice"];
const LINK_KEYS: &[&str] = &["url", "link", "href"];
const LEVEL_KEYS: &[&str] = &["level", "severity", "type"];
const ENABLED_KEYS: &[&str] = &["enabled", "show", "active"];
const NESTED_KEYS: &[&str] = &["notice", "data"];

/// How prominently a banner should be shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    #[default]
    Info,
    Warning,
    Critical,
}

impl NoticeLevel {
    fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "warning" | "warn" => Self::Warning,
            "critical" | "error" | "alert" | "urgent" => Self::Critical,
            _ => Self::Info,
        }
    }
}

/// A banner to display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub id: Option<String>,
    pub title: Option<String>,
    /// Never empty.
    pub message: String,
    pub link: Option<String>,
    pub level: NoticeLevel,
}

/// Result of parsing a notice document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    None,
    Banner(Banner),
}

impl Notice {
    pub fn banner(&self) -> Option<&Banner> {
        match self {
            Self::Banner(b) => Some(b),
            Self::None => None,
        }
    }
}

/// Parse a notice document.
///
/// Returns [`Notice::None`] when notices are disabled, the text is blank,
/// the document switches itself off (`enabled`/`show`/`active` set to
/// `false`), or no message can be found. Text that is not JSON is shown
/// as-is.
///
/// # Example
///
/// ```rust
/// use exif_remover::config::NoticeConfig;
/// use exif_remover::notice::{Notice, NoticeLevel, parse_notice};
///
/// let doc = r#"{"headline": "Update", "body": "Version 2 is out", "severity": "warning"}"#;
/// let notice = parse_notice(doc, &NoticeConfig::default());
/// let banner = notice.banner().unwrap();
/// assert_eq!(banner.title.as_deref(), Some("Update"));
/// assert_eq!(banner.message, "Version 2 is out");
/// assert_eq!(banner.level, NoticeLevel::Warning);
///
/// let off = NoticeConfig { disabled: true };
/// assert_eq!(parse_notice(doc, &off), Notice::None);
/// ```
pub fn parse_notice(text: &str, config: &NoticeConfig) -> Notice {
    if config.disabled {
        log::debug!("Notices disabled, ignoring document");
        return Notice::None;
    }

    let text = text.trim();
    if text.is_empty() {
        return Notice::None;
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            log::debug!("Notice is not JSON, showing it as plain text");
            return Notice::Banner(Banner {
                message: text.to_string(),
                ..Default::default()
            });
        }
    };

    let Some(top) = value.as_object() else {
        return match value.as_str().map(str::trim) {
            Some(s) if !s.is_empty() => Notice::Banner(Banner {
                message: s.to_string(),
                ..Default::default()
            }),
            _ => Notice::None,
        };
    };

    let scopes = scopes(top);

    if find(&scopes, ENABLED_KEYS).and_then(Value::as_bool) == Some(false) {
        log::debug!("Notice switched off by its document");
        return Notice::None;
    }

    let Some(message) = find_string(&scopes, MESSAGE_KEYS) else {
        log::debug!("Notice has no message");
        return Notice::None;
    };

    Notice::Banner(Banner {
        id: find_string(&scopes, ID_KEYS),
        title: find_string(&scopes, TITLE_KEYS),
        message,
        link: find_string(&scopes, LINK_KEYS),
        level: find_string(&scopes, LEVEL_KEYS)
            .map(|s| NoticeLevel::parse(&s))
            .unwrap_or_default(),
    })
}

/// The top-level object followed by any nested `notice`/`data` objects.
fn scopes(top: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    let mut scopes = vec![top];
    scopes.extend(
        NESTED_KEYS
            .iter()
            .filter_map(|key| top.get(*key).and_then(Value::as_object)),
    );
    scopes
}

fn find<'a>(scopes: &[&'a Map<String, Value>], keys: &[&str]) -> Option<&'a Value> {
    scopes
        .iter()
        .copied()
        .flat_map(|scope| keys.iter().filter_map(move |key| scope.get(*key)))
        .find(|v| !v.is_null())
}

/// First non-blank string (or number) under any of `keys`.
fn find_string(scopes: &[&Map<String, Value>], keys: &[&str]) -> Option<String> {
    scopes
        .iter()
        .copied()
        .flat_map(|scope| keys.iter().filter_map(move |key| scope.get(*key)))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
