//! Application services layer scaffolding.

pub mod error;
pub mod repos;
pub mod stories;
