//! Wire models for the hosty.live backend.

pub mod models;
