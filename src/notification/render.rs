//! Pure rendering of timeout notifications.
//!
//! Nothing here touches watchdog state; `render` is called once per fire
//! after the watchdog lock has been released.

use super::types::{Level, Notification};
use chrono::Utc;
use std::collections::BTreeMap;

/// Parses a newline-delimited `key=value` blob into ordered pairs.
///
/// Empty lines and lines that do not split into exactly two parts on `=`
/// are skipped. Keys and values are kept verbatim.
pub fn parse_properties(text: &str) -> Vec<(String, String)> {
    text.split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Some((key.to_string(), value.to_string())),
                _ => {
                    tracing::trace!(line, "Skipping malformed property line");
                    None
                }
            }
        })
        .collect()
}

/// Replaces the template's placeholder with `subject`.
///
/// The placeholder is the first `{name}` token; every occurrence of that
/// name is substituted. `{{` and `}}` render as literal braces and any other
/// token is left as written.
pub fn render_message(template: &str, subject: &str) -> String {
    let placeholder = first_placeholder(template);
    let mut out = String::with_capacity(template.len() + subject.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }

        match token_name(tail) {
            Some(name) if Some(name) == placeholder => {
                out.push_str(subject);
                rest = &tail[name.len() + 2..];
            }
            _ => {
                out.push_str(&tail[..1]);
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Builds the notification for one fire.
///
/// Later duplicate keys in `properties` overwrite earlier ones.
pub fn render(
    template: &str,
    subject: &str,
    level: Level,
    properties: &[(String, String)],
) -> Notification {
    let fields: BTreeMap<String, String> = properties.iter().cloned().collect();

    Notification {
        timestamp: Utc::now(),
        level,
        message_template: template.to_string(),
        subject: subject.to_string(),
        message: render_message(template, subject),
        fields,
    }
}

fn first_placeholder(template: &str) -> Option<&str> {
    let mut rest = template;
    while let Some(pos) = rest.find('{') {
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            rest = &tail[2..];
            continue;
        }
        if let Some(name) = token_name(tail) {
            return Some(name);
        }
        rest = &tail[1..];
    }
    None
}

/// Name of a `{name}` token at the start of `s`.
fn token_name(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}
