//! API Lambda handler and request parsing

pub mod handler;
pub mod helpers;
pub mod parsing;

pub use handler::handler;
