//! Map session state: the single owner of every piece of viewer state.
//!
//! All mutation goes through [`MapSession`] handler methods, one at a time,
//! in the order events arrive. Transports (HTTP, timers) live outside and
//! only hand results back in.

pub mod config;
pub mod error;
pub mod ingest;
pub mod render;
pub mod session;

pub use config::*;
pub use error::*;
pub use ingest::*;
pub use render::*;
pub use session::*;
