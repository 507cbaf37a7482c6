/// Result alias that carries the custom [`IldaError`] type.
pub type Result<T> = std::result::Result<T, IldaError>;

/// Common error type for the core crate.
///
/// Every variant is fatal: nothing in the player retries, so callers report
/// the error once and exit.
#[derive(Debug, thiserror::Error)]
pub enum IldaError {
    /// A header block did not start with the `ILDA` marker.
    #[error("bad magic at byte {offset}: expected \"ILDA\", found {found:?}")]
    BadSignature { offset: u64, found: [u8; 4] },
    /// The stream ended in the middle of a header or point record.
    #[error("truncated {context} at byte {offset}: needed {expected} bytes")]
    Truncated {
        offset: u64,
        expected: usize,
        context: &'static str,
    },
    /// Free-form failure raised outside the decoder.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl IldaError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
