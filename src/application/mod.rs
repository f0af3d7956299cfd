//! Entity stores, repository seams and listing use cases.

pub mod assets;
pub mod documents;
pub mod error;
pub mod listing;
pub mod projects;
pub mod repos;
pub mod tags;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;
