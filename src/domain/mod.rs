//! Value objects of the booking checkout and the ports through which the
//! application layer reaches the page, browser storage and the backend.

pub mod csrf;
pub mod money;
pub mod payment;
pub mod ports;
pub mod session;
pub mod validation;
