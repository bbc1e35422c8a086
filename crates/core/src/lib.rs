pub mod annotate;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod sample;
pub mod scan;
pub mod tools;
pub mod video;

pub use crate::error::{Error, Result};
pub use crate::models::*;
