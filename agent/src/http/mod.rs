//! Backend HTTP clients

pub mod auth;
pub mod backend;
pub mod canisters;
pub mod client;
pub mod deployments;
