//! Shared helpers for the lasio integration tests and benchmarks.
//!
//! - [`fixture`] builds synthetic LAS buffers byte by byte, so tests do
//!   not need binary files checked in.
//! - [`module`] plays the external decoder on the far end of a
//!   [`DecoderChannel`](lasio_loader::DecoderChannel).

pub mod fixture;
pub mod module;
