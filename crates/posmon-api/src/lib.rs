//! Async client for the SmartPOS USB agent's local HTTP API.
//!
//! The agent listens on loopback (`http://127.0.0.1:8765` by default) and
//! exposes a status snapshot, a handful of corrective actions, and a
//! diagnostic ZIP export. This crate only speaks the wire protocol; the
//! health model and polling live in `posmon-core`.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::AgentClient;
pub use error::Error;
pub use models::ActionAck;
pub use transport::TransportConfig;
