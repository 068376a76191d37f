//! Byte source implementations

pub mod replay;
pub mod serial;

pub use replay::ReplaySource;
pub use serial::SerialSource;
