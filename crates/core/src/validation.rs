//! Contact form validation and sanitization.
//!
//! Each field reports at most one message, checked in order: presence,
//! minimum length, maximum length, then the injection blocklists. All
//! field errors are collected before returning; there is no partial success.
//!
//! A lead needs a way back to the sender: an email address, a WhatsApp
//! number, or both. Company is optional.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use validator::ValidateEmail;

use crate::limits::{
    CHALLENGE_LABEL_MAX_LEN, CHALLENGE_MAX_LEN, COMPANY_MAX_LEN, COMPANY_MIN_LEN,
    COUNTRY_MAX_LEN, EMAIL_MAX_LEN, MESSAGE_MAX_LEN, MESSAGE_MIN_LEN, NAME_MAX_LEN, NAME_MIN_LEN,
    PHONE_PATTERN,
};
use crate::submission::{ContactForm, ContactRequest};

/// Field name -> message.
pub type FieldErrors = BTreeMap<String, String>;

static XSS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)<script[\s\S]*?>[\s\S]*?</script>",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)<iframe",
        r"(?i)eval\(",
        r"(?i)expression\(",
    ])
});

static SQL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)\b(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC)\b",
        r"(--|\*|;|/\*|\*/)",
        r"(?i)\b(OR|AND)\b\s+\d+\s*=\s*\d+",
        r"(?i)\b(UNION|JOIN)\b",
    ])
});

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PHONE_PATTERN).expect("invalid phone pattern"));

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid blocklist pattern"))
        .collect()
}

/// Outcome of validating a contact form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: FieldErrors,
    /// Present only when `is_valid` is true.
    pub sanitized: Option<ContactForm>,
}

impl ValidationResult {
    fn rejected(errors: FieldErrors) -> Self {
        Self {
            is_valid: false,
            errors,
            sanitized: None,
        }
    }

    /// Converts into a `Result`, mapping failures to `Error::InvalidFields`.
    pub fn into_result(self) -> crate::Result<ContactForm> {
        match self.sanitized {
            Some(form) if self.is_valid => Ok(form),
            _ => Err(crate::Error::invalid_fields(self.errors)),
        }
    }
}

/// Returns true if the input looks like markup or script injection.
pub fn detect_xss(input: &str) -> bool {
    XSS_PATTERNS.iter().any(|re| re.is_match(input))
}

/// Returns true if the input contains SQL keywords or operators.
pub fn detect_sql_injection(input: &str) -> bool {
    SQL_PATTERNS.iter().any(|re| re.is_match(input))
}

fn is_suspicious(input: &str) -> bool {
    detect_xss(input) || detect_sql_injection(input)
}

/// Message when neither contact channel is present, reported under `email`.
pub const CONTACT_REQUIRED_MESSAGE: &str = "Email or WhatsApp is required";

/// Escapes HTML-unsafe characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_html`], for sanitized values used outside HTML
/// (subjects, recipients).
pub fn unescape_html(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

struct TextRule {
    label: &'static str,
    min: usize,
    max: usize,
}

const NAME_RULE: TextRule = TextRule {
    label: "Name",
    min: NAME_MIN_LEN,
    max: NAME_MAX_LEN,
};

const COMPANY_RULE: TextRule = TextRule {
    label: "Company",
    min: COMPANY_MIN_LEN,
    max: COMPANY_MAX_LEN,
};

const MESSAGE_RULE: TextRule = TextRule {
    label: "Message",
    min: MESSAGE_MIN_LEN,
    max: MESSAGE_MAX_LEN,
};

fn check_text<'a>(value: Option<&'a str>, rule: &TextRule) -> Result<&'a str, String> {
    let Some(raw) = value.filter(|v| !v.is_empty()) else {
        return Err(format!("{} is required", rule.label));
    };

    let trimmed = raw.trim();
    let len = trimmed.chars().count();

    if len < rule.min {
        return Err(format!(
            "{} must be at least {} characters",
            rule.label, rule.min
        ));
    }
    if len > rule.max {
        return Err(format!(
            "{} must not exceed {} characters",
            rule.label, rule.max
        ));
    }
    if is_suspicious(raw) {
        return Err(format!("{} contains invalid characters", rule.label));
    }

    Ok(trimmed)
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn check_email(raw: &str) -> Result<&str, String> {
    let trimmed = raw.trim();
    let candidate = trimmed.to_string();

    if !candidate.validate_email() {
        return Err("Invalid email format".to_string());
    }
    if trimmed.chars().count() > EMAIL_MAX_LEN {
        return Err(format!("Email must not exceed {} characters", EMAIL_MAX_LEN));
    }
    if is_suspicious(raw) {
        return Err("Email contains invalid characters".to_string());
    }

    Ok(trimmed)
}

fn check_phone(raw: &str) -> Result<&str, String> {
    let phone = raw.trim();
    if PHONE_REGEX.is_match(phone) {
        Ok(phone)
    } else {
        Err("Invalid phone number format".to_string())
    }
}

/// Free-text context from the landing form: bounded and free of markup.
/// SQL keywords are allowed here since labels are ordinary phrases.
fn check_context(value: Option<&str>, label: &str, max: usize) -> Result<Option<String>, String> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.chars().count() > max {
        return Err(format!("{} must not exceed {} characters", label, max));
    }
    if detect_xss(raw) {
        return Err(format!("{} contains invalid characters", label));
    }

    Ok(Some(escape_html(trimmed)))
}

/// Validates and sanitizes a contact form.
pub fn validate_contact_form(req: &ContactRequest) -> ValidationResult {
    let mut errors = FieldErrors::new();

    let name = check_text(req.name.as_deref(), &NAME_RULE)
        .map_err(|e| errors.insert("name".into(), e))
        .ok();
    let message = check_text(req.message.as_deref(), &MESSAGE_RULE)
        .map_err(|e| errors.insert("message".into(), e))
        .ok();

    let company = match present(req.company.as_deref()) {
        None => Some(""),
        Some(raw) => check_text(Some(raw), &COMPANY_RULE)
            .map_err(|e| errors.insert("company".into(), e))
            .ok(),
    };

    let raw_email = present(req.email.as_deref());
    let raw_whatsapp = present(req.whatsapp.as_deref());
    if raw_email.is_none() && raw_whatsapp.is_none() {
        errors.insert("email".into(), CONTACT_REQUIRED_MESSAGE.to_string());
    }
    let email = raw_email.and_then(|raw| {
        check_email(raw)
            .map_err(|e| errors.insert("email".into(), e))
            .ok()
    });
    let whatsapp = raw_whatsapp.and_then(|raw| {
        check_phone(raw)
            .map_err(|e| errors.insert("whatsapp".into(), e))
            .ok()
    });

    let mut context = |value: &Option<String>, field: &str, label: &str, max: usize| {
        check_context(value.as_deref(), label, max)
            .map_err(|e| errors.insert(field.into(), e))
            .ok()
            .flatten()
    };
    let country = context(&req.country, "country", "Country", COUNTRY_MAX_LEN);
    let challenge = context(&req.challenge, "challenge", "Challenge", CHALLENGE_MAX_LEN);
    let challenge_label = context(
        &req.challenge_label,
        "challenge_label",
        "Challenge",
        CHALLENGE_LABEL_MAX_LEN,
    );

    match (name, company, message) {
        (Some(name), Some(company), Some(message)) if errors.is_empty() => ValidationResult {
            is_valid: true,
            errors,
            sanitized: Some(ContactForm {
                name: escape_html(name),
                email: email.map(|e| escape_html(&e.to_lowercase())),
                company: escape_html(company),
                message: escape_html(message),
                whatsapp: whatsapp.map(String::from),
                country,
                challenge,
                challenge_label,
            }),
        },
        _ => ValidationResult::rejected(errors),
    }
}
