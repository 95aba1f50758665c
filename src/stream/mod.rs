//! Stream utilities for status updates

mod sample;

pub use sample::{SampleExt, Sampled};
