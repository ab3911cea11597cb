pub mod manifest;
pub mod range;
