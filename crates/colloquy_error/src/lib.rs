//! Error types for the Colloquy batch dispatch engine.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Provider failures ([`ProviderError`]) are raw material for retry
//! classification; they only reach callers wrapped in a failed outcome.
//!
//! # Examples
//!
//! ```
//! use colloquy_error::{ColloquyResult, ConfigError};
//!
//! fn load() -> ColloquyResult<()> {
//!     Err(ConfigError::new("timeout_secs must be positive"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod dispatch;
mod error;
mod io;
mod json;
mod provider;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use dispatch::{DispatchError, DispatchErrorKind};
pub use error::{ColloquyError, ColloquyErrorKind, ColloquyResult};
pub use io::IoError;
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind};
