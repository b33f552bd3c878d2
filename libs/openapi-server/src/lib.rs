//! Response models of the hosty-agent local HTTP API.

pub mod models;
