pub mod dirty;
pub mod ease;
pub mod frame;
pub mod scroll;
pub mod tween;

pub use dirty::*;
pub use ease::*;
pub use frame::*;
pub use scroll::*;
pub use tween::*;
