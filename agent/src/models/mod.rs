pub mod canister;
pub mod deployment;
pub mod status;
