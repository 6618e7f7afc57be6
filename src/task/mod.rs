#![forbid(unsafe_code)]

pub mod columns;
pub mod filter;
pub mod model;
pub mod repository;
pub mod status;
