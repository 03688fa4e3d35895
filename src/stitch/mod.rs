//! Request orchestration: validation, fetch, synthesis, assembly, write.

pub mod cache;
pub mod guard;
pub mod handler;
pub mod response;

pub use cache::{ResultCache, normalize_message};
pub use guard::JobScope;
pub use handler::Stitcher;
