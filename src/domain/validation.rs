use super::payment::CardDetails;
use crate::error::CheckoutError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));
static PERSON_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\s'-]+$").expect("name pattern is valid"));
static EXPIRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$").expect("expiry pattern is valid"));

pub const MIN_PASSWORD_LEN: usize = 8;

/// Whether client-side validation may stop a submission.
///
/// Several forms deliberately submit even when checks fail and leave the
/// verdict to the server; that is `Advisory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Advisory,
    Blocking,
}

impl FromStr for ValidationMode {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "blocking" => Ok(Self::Blocking),
            other => Err(CheckoutError::Config(format!(
                "unknown validation mode {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Joins issues into one banner line.
pub fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &str, value: &str) -> Option<ValidationIssue> {
    value
        .trim()
        .is_empty()
        .then(|| ValidationIssue::new(field, &format!("{} is required", capitalize(field))))
}

pub fn validate_email(field: &str, value: &str) -> Option<ValidationIssue> {
    let value = value.trim();
    if value.is_empty() {
        Some(ValidationIssue::new(field, "Email is required"))
    } else if !EMAIL.is_match(value) {
        Some(ValidationIssue::new(field, "Please enter a valid email address"))
    } else {
        None
    }
}

pub fn validate_password(field: &str, value: &str) -> Option<ValidationIssue> {
    if value.is_empty() {
        Some(ValidationIssue::new(field, "Password is required"))
    } else if value.chars().count() < MIN_PASSWORD_LEN {
        Some(ValidationIssue::new(
            field,
            "Password must be at least 8 characters",
        ))
    } else {
        None
    }
}

pub fn validate_person_name(field: &str, value: &str) -> Option<ValidationIssue> {
    let value = value.trim();
    if value.is_empty() {
        validate_required(field, value)
    } else if value.chars().count() < 2 {
        Some(ValidationIssue::new(field, "Must be at least 2 characters"))
    } else if !PERSON_NAME.is_match(value) {
        Some(ValidationIssue::new(
            field,
            "Only letters, spaces, hyphens and apostrophes allowed",
        ))
    } else {
        None
    }
}

pub fn validate_min_len(field: &str, value: &str, min: usize) -> Option<ValidationIssue> {
    (value.trim().chars().count() < min).then(|| {
        ValidationIssue::new(
            field,
            &format!("{} must be at least {min} characters", capitalize(field)),
        )
    })
}

/// Shape checks only; the card processor remains the authority.
pub fn validate_card(card: &CardDetails) -> Vec<ValidationIssue> {
    let card = card.normalized();
    let mut issues = Vec::new();

    let digits_only = card.number.chars().all(|c| c.is_ascii_digit());
    if !digits_only || !(13..=19).contains(&card.number.len()) {
        issues.push(ValidationIssue::new(
            "card_number",
            "Please enter a valid card number.",
        ));
    }
    if !EXPIRY.is_match(&card.expiry) {
        issues.push(ValidationIssue::new(
            "card_expiry",
            "Please enter a valid expiry date (MM/YY).",
        ));
    }
    if !(3..=4).contains(&card.cvc.len()) || !card.cvc.chars().all(|c| c.is_ascii_digit()) {
        issues.push(ValidationIssue::new("card_cvc", "Please enter a valid CVC."));
    }
    if card.holder_name.is_empty() {
        issues.push(ValidationIssue::new(
            "card_holder_name",
            "Please enter the card holder name.",
        ));
    }
    issues
}

fn capitalize(field: &str) -> String {
    let label = field.replace('_', " ");
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
