pub mod blip;
pub mod error;
pub mod ops;
pub mod refs;

// Re-export key types for easier usage
pub use blip::*;
pub use error::{BlipError, RefsError};
pub use ops::*;
pub use refs::*;
