//! Client-side caches

pub mod deployments;
pub mod status;
pub mod versioned;
