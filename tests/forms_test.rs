mod common;

use common::MockTransport;
use std::sync::Arc;
use tourcheckout::application::forms::{CSRF_FORM_FIELD, FormGate, FormKind, FormSubmission, SubmitDecision};
use tourcheckout::config::{CheckoutConfig, ENV_FORM_VALIDATION};
use tourcheckout::domain::csrf::CsrfResolver;
use tourcheckout::domain::ports::Document;
use tourcheckout::domain::validation::ValidationMode;
use tourcheckout::error::CheckoutError;
use tourcheckout::infrastructure::in_memory::InMemoryDocument;

fn contact_form(message: &str) -> FormSubmission {
    FormSubmission::new(FormKind::Contact)
        .field("name", "Ada")
        .field("email", "ada@example.com")
        .field("subject", "Group booking")
        .field("message", message)
}

#[tokio::test]
async fn test_advisory_mode_submits_with_issues() {
    let doc = Arc::new(InMemoryDocument::new().with_cookie("csrftoken", "tok-1"));
    let gate = FormGate::new(doc, Arc::new(MockTransport::new()), ValidationMode::Advisory);

    let decision = gate.submit(contact_form("short")).await.unwrap();

    let SubmitDecision::Proceed { token, fields, issues } = decision else {
        panic!("advisory mode must not reject");
    };
    assert_eq!(token, "tok-1");
    assert_eq!(fields.get(CSRF_FORM_FIELD).map(String::as_str), Some("tok-1"));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].field, "message");
}

#[tokio::test]
async fn test_blocking_mode_rejects_without_token_lookup() {
    let transport = Arc::new(MockTransport::new().issuing_csrf_cookie("fresh"));
    let gate = FormGate::new(
        Arc::new(InMemoryDocument::new()),
        transport.clone(),
        ValidationMode::Blocking,
    );

    let decision = gate.submit(contact_form("short")).await.unwrap();

    assert!(matches!(decision, SubmitDecision::Rejected { ref issues } if issues.len() == 1));
    assert_eq!(transport.csrf_fetches(), 0);
}

#[tokio::test]
async fn test_configured_form_validation_mode_applies() {
    let doc = Arc::new(InMemoryDocument::new().with_cookie("csrftoken", "tok-1"));

    let gate = FormGate::from_config(&CheckoutConfig::default(), doc.clone(), Arc::new(MockTransport::new()));
    assert!(matches!(
        gate.submit(contact_form("short")).await.unwrap(),
        SubmitDecision::Proceed { .. }
    ));

    let config = CheckoutConfig::from_lookup(|key| (key == ENV_FORM_VALIDATION).then(|| "blocking".to_string())).unwrap();
    let gate = FormGate::from_config(&config, doc, Arc::new(MockTransport::new()));
    assert!(matches!(
        gate.submit(contact_form("short")).await.unwrap(),
        SubmitDecision::Rejected { .. }
    ));
}

#[tokio::test]
async fn test_missing_token_is_refreshed_once() {
    let doc = Arc::new(InMemoryDocument::new());
    let transport = Arc::new(MockTransport::new().issuing_csrf_cookie("fresh-token"));
    let gate = FormGate::new(doc.clone(), transport.clone(), ValidationMode::Advisory);

    let decision = gate
        .submit(contact_form("I would like to book for twelve people."))
        .await
        .unwrap();

    assert!(matches!(decision, SubmitDecision::Proceed { ref token, ref issues, .. } if token == "fresh-token" && issues.is_empty()));
    assert_eq!(transport.csrf_fetches(), 1);
    assert!(doc.cookie_string().contains("csrftoken=fresh-token"));
    // The cookie now on the page is found without another round trip.
    assert_eq!(CsrfResolver::resolve(doc.as_ref()).unwrap(), "fresh-token");
}

#[tokio::test]
async fn test_token_still_missing_after_refresh() {
    let transport = Arc::new(MockTransport::new());
    let gate = FormGate::new(
        Arc::new(InMemoryDocument::new()),
        transport.clone(),
        ValidationMode::Advisory,
    );

    let err = gate
        .submit(
            FormSubmission::new(FormKind::Login)
                .field("email", "a@b.co")
                .field("password", "secret"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::TokenMissing));
    assert_eq!(transport.csrf_fetches(), 1);
    assert!(transport.calls().is_empty());
}
