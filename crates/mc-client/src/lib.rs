//! Connection state machine, player state, and the packet-level actions a
//! connected bot can take. See [`connection::Connection`] for the entry
//! point and [`player::Player`] for the state it drives.

pub mod connection;
pub mod error;
pub mod player;

pub use connection::{Connection, SharedPlayer};
pub use error::{ClientError, Result};
pub use player::{Player, PlayerSnapshot};
