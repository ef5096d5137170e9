//! Core data types for the Solclean pricing engine

pub mod catalog;
pub mod grid;
pub mod pricing;
pub mod scope;
pub mod special;
