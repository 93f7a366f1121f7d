pub mod documents;
pub mod registry;
