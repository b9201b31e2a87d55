pub mod strategy;
pub mod errors;

pub use strategy::*;
pub use errors::*;
