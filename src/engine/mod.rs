// Capture engine - independent of the CLI

pub mod audio;
pub mod core;
pub mod geometry;
pub mod plan;
pub mod region;
pub mod session;
pub mod signals;

pub use core::*;
