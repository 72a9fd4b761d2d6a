//! Application layer orchestrating the booking checkout.
//!
//! Every controller shares one [`session_store::SessionStore`] instead of
//! reading state off the page. [`steps::StepController`] moves the wizard,
//! [`checkout::CheckoutFlow`] drives the payment gateways, and
//! [`price_sync::PriceSyncService`] keeps the displayed totals in line with the
//! session. [`page::BookingPage`] wires them together for one page.

pub mod auth_state;
pub mod checkout;
pub mod forms;
pub mod fragment_cache;
pub mod page;
pub mod price_sync;
pub mod session_store;
pub mod steps;
