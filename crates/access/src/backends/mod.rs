//! Store backend implementations.

pub mod elasticsearch;
