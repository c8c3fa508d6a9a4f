//! Field-level input checks shared by the request contracts.

use thiserror::Error;
use url::Url;

pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MAX_URL_LEN: usize = 2000;
pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_TAG_NAME_LEN: usize = 50;

/// A request field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct InvalidInput {
    pub field: &'static str,
    pub reason: String,
}

impl InvalidInput {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<String, InvalidInput> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InvalidInput::new(field, "must not be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(InvalidInput::new(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn username(value: &str) -> Result<String, InvalidInput> {
    bounded_text("username", value, MAX_USERNAME_LEN)
}

pub fn email(value: &str) -> Result<String, InvalidInput> {
    let email = bounded_text("email", value, MAX_EMAIL_LEN)?;
    let Some((local, domain)) = email.split_once('@') else {
        return Err(InvalidInput::new("email", "must contain '@'"));
    };
    let domain_ok = domain
        .split('.')
        .all(|label| !label.is_empty())
        && domain.contains('.');
    if local.is_empty() || domain.contains('@') || !domain_ok || email.contains(char::is_whitespace)
    {
        return Err(InvalidInput::new("email", "is not a valid email address"));
    }
    Ok(email)
}

pub fn url(value: &str) -> Result<String, InvalidInput> {
    let raw = bounded_text("url", value, MAX_URL_LEN)?;
    let parsed = Url::parse(&raw).map_err(|e| InvalidInput::new("url", e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(InvalidInput::new("url", "must be an http or https URL"));
    }
    // Percent-encoding can lengthen the stored form past the raw input.
    let canonical = parsed.to_string();
    if canonical.chars().count() > MAX_URL_LEN {
        return Err(InvalidInput::new(
            "url",
            format!("must be at most {} characters", MAX_URL_LEN),
        ));
    }
    Ok(canonical)
}

pub fn title(value: &str) -> Result<String, InvalidInput> {
    bounded_text("title", value, MAX_TITLE_LEN)
}

pub fn tag_name(value: &str) -> Result<String, InvalidInput> {
    bounded_text("name", value, MAX_TAG_NAME_LEN)
}

/// Trim and de-duplicate tag names, keeping first-seen order. Matching stays case-sensitive.
pub fn tag_names(values: &[String]) -> Result<Vec<String>, InvalidInput> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let name = bounded_text("tags", value, MAX_TAG_NAME_LEN)?;
        if !out.contains(&name) {
            out.push(name);
        }
    }
    Ok(out)
}

/// `#RRGGBB`.
pub fn color(value: &str) -> Result<String, InvalidInput> {
    let valid = value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(InvalidInput::new("color", "must be a hex color like #3B82F6"));
    }
    Ok(value.to_string())
}
