//! Configuration for pixelwalk runs
//!
//! Provides types and parsing for `pxw.toml` configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
