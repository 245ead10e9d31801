//! Signal conditioning

pub mod normalizer;

pub use normalizer::{Normalizer, STD_EPSILON};
