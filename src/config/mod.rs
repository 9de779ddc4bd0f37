//! Configuration and constants
//!
//! - [`defaults`] - Default values for image generation
//! - [`urls`] - Package feed locations

pub mod defaults;
pub mod urls;
