//! Model provider abstraction.

pub mod provider;
