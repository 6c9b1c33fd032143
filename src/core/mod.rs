//! Core library components.
//!
//! Classification, fetching, caching and the resolver that ties them
//! together. Every collaborator with side effects sits behind a trait.

pub mod backend;
pub mod cache;
pub mod config;
pub mod constants;
pub mod dotenv;
pub mod env;
pub mod fetch;
pub mod reference;
pub mod report;
pub mod resolver;
pub mod store;
