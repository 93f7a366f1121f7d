pub mod document;
pub mod obligation;

pub use document::*;
pub use obligation::*;
