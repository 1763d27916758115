//! Type definitions for Rebound settings

mod settings;

pub use settings::*;
