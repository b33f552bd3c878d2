//! Deployment event bridge: wire protocol and connection state machine

pub mod connection;
pub mod protocol;
