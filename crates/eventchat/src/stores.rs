//! Read-only access to the data the tools retrieve from.
//!
//! Both stores are traits so the tools can be exercised against in-memory fakes.
pub mod chroma;
pub mod events;
pub mod vector;
