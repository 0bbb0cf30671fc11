//! Dynamic-update listener: UDP and TCP DNS endpoints that accept
//! TSIG-signed RFC2136 updates and queries, and hand the decoded
//! operations to the core update engine.

pub mod listener;
pub mod tsig;

pub use listener::Listener;
pub use tsig::TsigAuth;
