//! Graphics backend implementations
//!
//! GPU backends live with the application that owns the device. The
//! headless backend in this crate runs the full pipeline in memory, which
//! serves offscreen tooling and the test suite alike.

pub mod headless;

pub use headless::{DeviceCall, HeadlessDevice};
