pub mod error;
pub mod frame;
pub mod item;

pub use error::HostError;
pub use frame::{FrameError, PixelFormat, RawFrame};
pub use item::{MediaItem, NextItem, NextItemSource};
