pub mod error;
pub mod vehicle;
