//! Reply generation service sitting behind the clinic API's remote AI hop.

pub mod handler;
pub mod settings;

pub use settings::{Provider, Settings};
