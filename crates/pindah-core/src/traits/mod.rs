//! Core traits for source and destination behavior.

mod platform;
mod source;

pub use platform::Platform;
pub use source::PageSource;
