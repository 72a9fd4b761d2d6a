//! Port implementations: the in-memory page and storage, the system clock,
//! the `reqwest` backend transport, the payment gateways and, behind the
//! `storage-rocksdb` feature, persistent storage.

pub mod clock;
pub mod gateways;
pub mod http;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
