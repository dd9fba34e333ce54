//! Error types for nabud.

use std::io;

use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nabud.
///
/// Protocol mismatches are deliberately not represented here: an unexpected
/// ack byte resets the dispatcher and the NABU retries on its own, so those
/// paths never produce an `Err`. Errors that do surface are confined to
/// startup (serial open, configuration) and to container I/O that is not
/// plain absence.
#[derive(Error, Debug)]
pub enum Error {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if the error means a container file simply does not exist.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_is_not_found_only() {
        let missing = Error::from(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(missing.is_absence());

        let denied = Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(!denied.is_absence());

        assert!(!Error::Config("bad".into()).is_absence());
    }
}
