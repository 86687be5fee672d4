// Re-export storage-related modules
pub mod accumulator;
pub mod typology_repository;

pub use accumulator::*;
pub use typology_repository::*;
