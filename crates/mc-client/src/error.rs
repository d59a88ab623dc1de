//! Errors raised by the connection state machine and player actions. Wraps
//! the lower layers (`mc-chunk`, transitively `mc-protocol`) and adds the
//! taxonomy that is specific to running the handshake/login/configuration/
//! play phases.

use mc_chunk::ChunkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Protocol(#[from] mc_protocol::ProtocolError),
    #[error("disconnected by server: {0}")]
    Disconnected(String),
    #[error("username {0:?} is longer than 16 characters")]
    UsernameTooLong(String),
    /// Logged and swallowed by the dispatch loop, never returned to `main`:
    /// an out-of-phase or unknown packet id is not a fatal condition.
    #[error("unexpected packet 0x{id:02x} in {phase} phase")]
    UnexpectedPacketInPhase { phase: &'static str, id: i32 },
}

pub type Result<T> = std::result::Result<T, ClientError>;
