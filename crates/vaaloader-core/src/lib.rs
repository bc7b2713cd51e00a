//! # vaaloader-core
//!
//! Core types shared across all VAALoader crates: the VAA wire format, the
//! `MessageDecoder` seam the ingestion workers decode through, and the
//! `VaaRepository` contract every storage backend implements.

pub mod decoder;
pub mod error;
pub mod repository;
pub mod vaa;

pub use decoder::{MessageDecoder, VaaDecoder};
pub use error::{DecodeError, StorageError};
pub use repository::{VaaDocument, VaaRepository};
pub use vaa::{GuardianSignature, Vaa};
