//! Application services layer.

pub mod artifacts;
pub mod error;
pub mod history;
pub mod paging;
pub mod repos;
pub mod resolver;
