#![warn(clippy::pedantic)]

pub mod channel;
pub mod config;
pub mod error;
pub mod file;
pub mod loader;
pub mod proxy;
pub mod uncompressed;

pub use channel::{Command, DecoderChannel, ModuleEndpoint, Payload, Request, Responder, Response};
pub use config::LoaderConfig;
pub use error::{ChannelError, LasError};
pub use file::LasFile;
pub use lasio_wire::{FormatInfo, Header, PointDecoder, PointFormat, PointRecord, Version};
pub use loader::{Loader, PointLoader, ReadChunk};
pub use proxy::CompressedProxy;
pub use uncompressed::UncompressedLoader;
