pub mod bridge;
pub mod scanner;
pub mod session_refresh;
