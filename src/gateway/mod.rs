//! Router entry point

mod builder;
mod engine;

pub use builder::{HuginnBuilder, RouterConfig};
pub use engine::{Huginn, WarmReport, confidence};
