//! Internet Computer actor access

pub mod assets;
pub mod client;
pub mod ledger;
pub mod management;
pub mod status_proxy;
pub mod types;
