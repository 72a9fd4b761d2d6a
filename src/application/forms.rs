use crate::config::CheckoutConfig;
use crate::domain::csrf::CsrfResolver;
use crate::domain::ports::{DocumentRef, TransportRef};
use crate::domain::validation::{
    ValidationIssue, ValidationMode, summarize, validate_email, validate_min_len,
    validate_password, validate_person_name,
};
use crate::error::Result;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Field the backend reads the anti-forgery token from on form posts.
pub const CSRF_FORM_FIELD: &str = "csrfmiddlewaretoken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Login,
    Signup,
    Contact,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Login => "login",
            FormKind::Signup => "signup",
            FormKind::Contact => "contact",
        }
    }
}

/// Field values as typed, keyed by input name.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub kind: FormKind,
    pub fields: BTreeMap<String, String>,
}

impl FormSubmission {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn value(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Runs the client-side checks for `form`. An empty result means clean.
pub fn validate_form(form: &FormSubmission) -> Vec<ValidationIssue> {
    let issues: Vec<Option<ValidationIssue>> = match form.kind {
        FormKind::Login => vec![
            validate_email("email", form.value("email")),
            form.value("password")
                .is_empty()
                .then(|| ValidationIssue::new("password", "Password is required")),
        ],
        FormKind::Signup => {
            let confirm = form.value("password2");
            vec![
                validate_email("email", form.value("email")),
                validate_password("password1", form.value("password1")),
                if confirm.is_empty() {
                    Some(ValidationIssue::new("password2", "Please confirm your password"))
                } else if confirm != form.value("password1") {
                    Some(ValidationIssue::new("password2", "Passwords do not match"))
                } else {
                    None
                },
                validate_person_name("first_name", form.value("first_name")),
                validate_person_name("last_name", form.value("last_name")),
            ]
        }
        FormKind::Contact => vec![
            validate_min_len("name", form.value("name"), 2),
            validate_email("email", form.value("email")),
            validate_min_len("subject", form.value("subject"), 3),
            validate_min_len("message", form.value("message"), 10),
        ],
    };
    issues.into_iter().flatten().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitDecision {
    /// Send `fields`, which already carry the anti-forgery token.
    Proceed {
        token: String,
        fields: BTreeMap<String, String>,
        issues: Vec<ValidationIssue>,
    },
    /// Blocking validation stopped the submission.
    Rejected { issues: Vec<ValidationIssue> },
}

/// Last stop before a form leaves the page.
pub struct FormGate {
    document: DocumentRef,
    transport: TransportRef,
    mode: ValidationMode,
}

impl FormGate {
    pub fn new(document: DocumentRef, transport: TransportRef, mode: ValidationMode) -> Self {
        Self {
            document,
            transport,
            mode,
        }
    }

    pub fn from_config(config: &CheckoutConfig, document: DocumentRef, transport: TransportRef) -> Self {
        Self::new(document, transport, config.form_validation)
    }

    /// Validates `form` and attaches the anti-forgery token.
    ///
    /// Fails with `TokenMissing` when no token can be found even after one
    /// refresh; nothing is sent in that case.
    #[instrument(skip_all, fields(form = form.kind.as_str()))]
    pub async fn submit(&self, form: FormSubmission) -> Result<SubmitDecision> {
        let issues = validate_form(&form);
        if !issues.is_empty() {
            match self.mode {
                ValidationMode::Blocking => {
                    warn!(issues = %summarize(&issues), "form rejected");
                    return Ok(SubmitDecision::Rejected { issues });
                }
                ValidationMode::Advisory => {
                    warn!(issues = issues.len(), "form has issues, leaving the verdict to the server");
                }
            }
        }

        let token =
            CsrfResolver::ensure(self.document.as_ref(), self.transport.as_ref()).await?;
        let mut fields = form.fields;
        fields.insert(CSRF_FORM_FIELD.to_string(), token.clone());
        info!("form ready to submit");
        Ok(SubmitDecision::Proceed {
            token,
            fields,
            issues,
        })
    }
}
