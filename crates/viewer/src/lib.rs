//! Scroll-driven camera control for the product showcase page.
//!
//! The rendering engine, the page and the device check are collaborators
//! behind the traits in [`engine`]; this crate owns the camera pose, the
//! scroll timeline and the preview state machine that drive them.

pub mod camera;
pub mod config;
pub mod device;
pub mod engine;
pub mod error;
pub mod session;
pub mod timeline;

pub use camera::*;
pub use config::*;
pub use device::*;
pub use engine::*;
pub use error::*;
pub use session::*;
pub use timeline::*;
