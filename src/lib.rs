//! Artifact API with depth-bounded reference materialization.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
