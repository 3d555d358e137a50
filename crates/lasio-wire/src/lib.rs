#![warn(clippy::pedantic)]

mod le;

pub mod error;
pub mod format;
pub mod header;
pub mod point;

pub use error::WireError;
pub use format::{FormatInfo, Version};
pub use header::Header;
pub use point::{PointDecoder, PointFormat, PointRecord};
