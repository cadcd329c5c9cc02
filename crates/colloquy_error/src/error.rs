//! Top-level error wrapper types.

use crate::{BuilderError, ConfigError, DispatchError, IoError, JsonError, ProviderError};

/// Every error condition a Colloquy crate can surface.
///
/// # Examples
///
/// ```
/// use colloquy_error::{ColloquyError, ConfigError};
///
/// let err: ColloquyError = ConfigError::new("missing [defaults]").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ColloquyErrorKind {
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// File I/O error
    #[from(IoError)]
    Io(IoError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
    /// Provider call error
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Batch dispatch error
    #[from(DispatchError)]
    Dispatch(DispatchError),
}

/// Colloquy error with kind discrimination.
///
/// # Examples
///
/// ```
/// use colloquy_error::{ColloquyErrorKind, ColloquyResult, DispatchError, DispatchErrorKind};
///
/// fn submit() -> ColloquyResult<()> {
///     Err(DispatchError::new(DispatchErrorKind::UnknownModel("llama".into())))?
/// }
///
/// let err = submit().unwrap_err();
/// assert!(matches!(err.kind(), ColloquyErrorKind::Dispatch(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Colloquy Error: {}", _0)]
pub struct ColloquyError(Box<ColloquyErrorKind>);

impl ColloquyError {
    /// Create a new error from a kind.
    pub fn new(kind: ColloquyErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ColloquyErrorKind {
        &self.0
    }
}

impl<T> From<T> for ColloquyError
where
    T: Into<ColloquyErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Colloquy operations.
pub type ColloquyResult<T> = std::result::Result<T, ColloquyError>;
