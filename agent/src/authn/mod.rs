pub mod session_mngr;
pub mod session_token;
