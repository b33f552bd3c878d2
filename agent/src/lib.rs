//! hosty agent library
//!
//! Core modules for the hosty.live local agent.

pub mod app;
pub mod authn;
pub mod bridge;
pub mod cache;
pub mod diagnostic;
pub mod dns;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod ic;
pub mod logs;
pub mod models;
pub mod scanner;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
