//! Input source and display transport

pub mod handler;
pub mod protocol;

pub use handler::run_stdio;
