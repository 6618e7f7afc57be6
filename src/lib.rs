#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

pub mod board;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod ids;
mod input;
pub mod integrity;
pub mod logging;
pub mod output;
pub mod project;
pub mod store;
pub mod task;

pub use board::{Board, HealthReport};
pub use error::BoardError;
