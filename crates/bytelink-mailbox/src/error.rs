/// Errors that can occur on a message link endpoint.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] bytelink_transport::TransportError),

    /// Failed to spawn the receive thread.
    #[error("failed to spawn receive thread: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, LinkError>;
