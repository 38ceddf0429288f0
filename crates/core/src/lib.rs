//! Domain model and pure algorithms for vocabulary spaced repetition.
//!
//! Nothing in this crate performs I/O. Time is always passed in explicitly,
//! usually through a [`Clock`].

#![forbid(unsafe_code)]

pub mod due;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod stats;
pub mod time;

pub use error::Error;
pub use time::Clock;
