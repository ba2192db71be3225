//! Wire types for the two backend channels.
//!
//! This module defines:
//! - The upload request (multipart, one `files` part per accepted file) and
//!   the decoding of its reply into a `FeatureCollection`
//! - The command request (query plus a snapshot of the layer list)
//! - Normalization of both command reply shapes into one `CommandReply`
//!
//! Nothing here performs I/O. Transports hand over `(status, body)` pairs and
//! get domain values back.

pub mod command;
pub mod error;
pub mod upload;

pub use command::*;
pub use error::*;
pub use upload::*;
