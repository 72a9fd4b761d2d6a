use crate::domain::csrf::{LANGUAGE_COOKIE_MAX_AGE_SECS, language_cookie};
use crate::domain::ports::{DocumentRef, Selector, StorageRef};
use crate::error::Result;
use tracing::{debug, info, instrument};

pub const FLAG_AUTHENTICATED: &str = "userAuthenticated";
pub const FLAG_LOGIN_ATTEMPTED: &str = "loginAttempted";
pub const FLAG_LOGOUT_ATTEMPTED: &str = "logoutAttempted";
pub const FLAG_LANGUAGE_CHANGE: &str = "languageChangeWithAuth";

pub const AUTH_BODY_CLASS: &str = "user-authenticated";
const FLAG_SET: &str = "true";

/// Links only signed-in users should see in the navigation.
const ACCOUNT_PATHS: [&str; 4] = ["/dashboard", "/profile", "/bookings", "/wishlist"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLoadOutcome {
    pub authenticated: bool,
    /// The server-rendered markup disagrees with the session and the page
    /// should be fetched again.
    pub reload: bool,
    pub event: Option<AuthEvent>,
}

/// Keeps signed-in chrome consistent across full page loads.
///
/// Login and logout happen through plain form posts, so the only memory of an
/// attempt is a flag in session storage read back on the next page.
pub struct AuthStateSync {
    document: DocumentRef,
    session: StorageRef,
}

impl AuthStateSync {
    pub fn new(document: DocumentRef, session: StorageRef) -> Self {
        Self { document, session }
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        self.flag(FLAG_AUTHENTICATED)
    }

    #[instrument(skip_all, fields(location = %self.document.location()))]
    pub fn on_page_load(&self) -> Result<PageLoadOutcome> {
        let marked = self.page_marks_authenticated();
        if marked {
            self.set_flag(FLAG_AUTHENTICATED)?;
        }
        if self.flag(FLAG_AUTHENTICATED)? {
            self.show_authenticated(true);
        }

        let location = self.document.location();
        let mut outcome = PageLoadOutcome {
            authenticated: false,
            reload: false,
            event: None,
        };

        if self.flag(FLAG_LOGIN_ATTEMPTED)? && !location.contains("/login") {
            info!("login attempt landed off the login page, treating it as successful");
            self.session.remove_item(FLAG_LOGIN_ATTEMPTED)?;
            self.on_logged_in()?;
            outcome.event = Some(AuthEvent::LoggedIn);
            outcome.reload |= !marked;
        }

        if self.flag(FLAG_LOGOUT_ATTEMPTED)? && !location.contains("/logout") {
            info!("logout attempt completed");
            self.session.remove_item(FLAG_LOGOUT_ATTEMPTED)?;
            self.on_logged_out()?;
            outcome.event = Some(AuthEvent::LoggedOut);
            outcome.reload |= marked;
        }

        if self.flag(FLAG_LANGUAGE_CHANGE)? {
            debug!("restoring authenticated state after language change");
            self.session.remove_item(FLAG_LANGUAGE_CHANGE)?;
            self.set_flag(FLAG_AUTHENTICATED)?;
            self.show_authenticated(true);
        }

        outcome.authenticated = self.flag(FLAG_AUTHENTICATED)?;
        Ok(outcome)
    }

    pub fn on_login_submitted(&self) -> Result<()> {
        self.set_flag(FLAG_LOGIN_ATTEMPTED)
    }

    pub fn on_logout_submitted(&self) -> Result<()> {
        self.session.remove_item(FLAG_AUTHENTICATED)?;
        self.set_flag(FLAG_LOGOUT_ATTEMPTED)
    }

    /// Remembers the signed-in state across the reload the language switch
    /// triggers and writes the locale cookie the backend reads.
    pub fn on_language_change(&self, language: &str) -> Result<()> {
        if self.flag(FLAG_AUTHENTICATED)? {
            self.set_flag(FLAG_LANGUAGE_CHANGE)?;
        }
        self.document
            .set_cookie(&language_cookie(language, LANGUAGE_COOKIE_MAX_AGE_SECS));
        info!(language, "language changed");
        Ok(())
    }

    pub fn on_logged_in(&self) -> Result<()> {
        self.set_flag(FLAG_AUTHENTICATED)?;
        self.show_authenticated(true);
        Ok(())
    }

    pub fn on_logged_out(&self) -> Result<()> {
        self.session.remove_item(FLAG_AUTHENTICATED)?;
        self.show_authenticated(false);
        Ok(())
    }

    /// Shows or hides the auth-dependent parts of the page.
    pub fn apply_visibility(&self, authenticated: bool) {
        let (auth_display, guest_display) = if authenticated { ("", "none") } else { ("none", "") };
        let doc = self.document.as_ref();

        for (selector, display) in [
            (Selector::attr("data-auth-only"), auth_display),
            (Selector::attr("data-logout-btn"), auth_display),
            (Selector::attr("data-guest-only"), guest_display),
            (Selector::attr("data-login-btn"), guest_display),
        ] {
            for node in doc.query_all(&selector) {
                doc.set_style(node, "display", display);
            }
        }

        for node in doc.query_all(&Selector::class("nav-link")) {
            let href = doc.attribute(node, "href").unwrap_or_default();
            if ACCOUNT_PATHS.iter().any(|path| href.contains(path)) {
                doc.set_style(node, "display", auth_display);
            }
        }
    }

    fn show_authenticated(&self, authenticated: bool) {
        self.apply_visibility(authenticated);
        for body in self.document.query_all(&Selector::tag("body")) {
            if authenticated {
                self.document.add_class(body, AUTH_BODY_CLASS);
            } else {
                self.document.remove_class(body, AUTH_BODY_CLASS);
            }
        }
    }

    fn page_marks_authenticated(&self) -> bool {
        self.body_has_auth_class()
            || self
                .document
                .query(&Selector::attr_eq("data-user-authenticated", "true"))
                .is_some()
    }

    fn body_has_auth_class(&self) -> bool {
        self.document
            .query(&Selector::tag("body"))
            .is_some_and(|body| self.document.has_class(body, AUTH_BODY_CLASS))
    }

    fn flag(&self, name: &str) -> Result<bool> {
        Ok(self.session.get_item(name)?.as_deref() == Some(FLAG_SET))
    }

    fn set_flag(&self, name: &str) -> Result<()> {
        self.session.set_item(name, FLAG_SET)
    }
}
