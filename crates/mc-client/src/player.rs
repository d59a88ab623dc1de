//! In-memory player state and the packet-level actions that mutate the
//! server's view of it. Every method that touches the socket writes exactly
//! one C->S frame and holds the shared write-half lock for the duration of
//! that write, so frames from concurrent actions never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use byteorder::{BigEndian, WriteBytesExt};
use mc_chunk::Chunk;
use mc_protocol::{write_varint, Encode};
use serde::Serialize;
use tokio::io::AsyncWrite;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use mc_protocol::FramedStream;

use crate::error::Result;

/// Packet ids this module writes on the Play serverbound side, resolved
/// from `mc-data`'s packet-name report and cached here as plain constants.
pub mod packet_id {
    pub const TELEPORT_CONFIRM: i32 = 0x00;
    pub const CHAT: i32 = 0x07;
    pub const CHUNK_BATCH_RECEIVED: i32 = 0x09;
    pub const CLIENT_COMMAND: i32 = 0x0a;
    pub const INTERACT: i32 = 0x11;
    pub const KEEP_ALIVE: i32 = 0x1a;
    pub const MOVE_PLAYER_POS: i32 = 0x1d;
    pub const SWING_ARM: i32 = 0x36;
}

/// The shared, lock-guarded write half every concurrent writer serializes
/// through. Generic over the underlying stream so tests can swap in a
/// [`tokio::io::DuplexStream`] half in place of a real `TcpStream`'s.
pub type SharedWriter<W = OwnedWriteHalf> = Arc<Mutex<FramedStream<W>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

/// A cheap, `Clone`-able view of the publicly interesting fields, for the
/// HTTP control panel and swarm launcher to report status without taking
/// the write-half lock.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub entity_id: i32,
    pub position: (f64, f64, f64),
    pub health: f32,
    pub is_flying: bool,
    pub loaded_chunks: usize,
}

/// Mutable client-side state for one connected player, plus the C->S
/// actions that advance it. Mutated by the reader task directly (chunk
/// map, position, health, entity id) and read/acted on by the writer task.
pub struct Player<W = OwnedWriteHalf> {
    pub name: String,
    writer: SharedWriter<W>,
    pub entity_id: i32,
    pub position: Position,
    pub velocity: Velocity,
    pub health: f32,
    pub is_flying: bool,
    pub on_ground: bool,
    pub chunks: HashMap<(i32, i32), Chunk>,
}

impl<W: AsyncWrite + Unpin + Send> Player<W> {
    #[must_use]
    pub fn new(name: String, writer: SharedWriter<W>) -> Self {
        Player {
            name,
            writer,
            entity_id: 0,
            position: Position::default(),
            velocity: Velocity::default(),
            health: 20.0,
            is_flying: false,
            on_ground: true,
            chunks: HashMap::new(),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            name: self.name.clone(),
            entity_id: self.entity_id,
            position: (self.position.x, self.position.y, self.position.z),
            health: self.health,
            is_flying: self.is_flying,
            loaded_chunks: self.chunks.len(),
        }
    }

    /// Writes one raw C->S frame under the writer lock. `pub(crate)` so the
    /// connection state machine can use the same exclusive writer for
    /// handshake/login/configuration plumbing that isn't a player "action".
    pub(crate) async fn send(&self, id: i32, body: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_frame(id, body).await?;
        Ok(())
    }

    /// Sends a chat message (`minecraft:chat`, 0x07).
    pub async fn chat(&self, message: &str) -> Result<()> {
        let mut body = Vec::new();
        message.encode(&mut body)?;
        body.write_i64::<BigEndian>(0)?; // timestamp
        body.write_i64::<BigEndian>(0)?; // salt
        body.push(0); // has_signature = false
        write_varint(&mut body, 0)?; // message_count
        body.extend_from_slice(&[0, 0, 0]); // acknowledged bitset, 20 bits packed into 3 bytes
        self.send(packet_id::CHAT, &body).await
    }

    /// Requests a respawn (`minecraft:client_command`, action 0).
    pub async fn respawn(&self) -> Result<()> {
        let mut body = Vec::new();
        write_varint(&mut body, 0)?;
        self.send(packet_id::CLIENT_COMMAND, &body).await
    }

    /// Swings the main hand (`minecraft:swing_arm`, hand 0 = main hand).
    pub async fn swing(&self) -> Result<()> {
        let mut body = Vec::new();
        write_varint(&mut body, 0)?;
        self.send(packet_id::SWING_ARM, &body).await
    }

    /// Attacks `entity_id` (`minecraft:interact`, interaction type 1 = attack).
    pub async fn attack(&self, entity_id: i32) -> Result<()> {
        const INTERACT_ATTACK: i32 = 1;
        let mut body = Vec::new();
        write_varint(&mut body, entity_id)?;
        write_varint(&mut body, INTERACT_ATTACK)?;
        body.push(0); // sneaking = false
        self.send(packet_id::INTERACT, &body).await
    }

    /// Sends one Move Player Pos update at the player's current position.
    /// This is the only position update the client ever emits: there is no
    /// gravity/friction simulation (see the physics Non-goal).
    pub async fn move_position(&self) -> Result<()> {
        let mut body = Vec::new();
        body.write_f64::<BigEndian>(self.position.x)?;
        body.write_f64::<BigEndian>(self.position.y)?;
        body.write_f64::<BigEndian>(self.position.z)?;
        body.push(u8::from(self.on_ground));
        self.send(packet_id::MOVE_PLAYER_POS, &body).await
    }

    /// A discrete, single-frame jump: nudges `y` up by one block and
    /// immediately reports the new position. Deliberately not a physics
    /// simulation (gravity/friction are out of scope).
    pub async fn jump(&mut self) -> Result<()> {
        self.position.y += 1.0;
        self.on_ground = false;
        self.move_position().await
    }

    /// Confirms a teleport (`minecraft:accept_teleportation`, 0x00).
    pub async fn teleport_confirm(&self, teleport_id: i32) -> Result<()> {
        let mut body = Vec::new();
        write_varint(&mut body, teleport_id)?;
        self.send(packet_id::TELEPORT_CONFIRM, &body).await
    }

    /// Echoes a keep-alive id (`minecraft:keep_alive`, 0x1a).
    pub async fn keep_alive_reply(&self, id: i64) -> Result<()> {
        let mut body = Vec::new();
        body.write_i64::<BigEndian>(id)?;
        self.send(packet_id::KEEP_ALIVE, &body).await
    }

    /// Acknowledges a finished chunk batch (`minecraft:chunk_batch_received`,
    /// 0x09).
    pub async fn chunk_batch_ack(&self, chunks_per_tick: f32) -> Result<()> {
        let mut body = Vec::new();
        body.write_f32::<BigEndian>(chunks_per_tick)?;
        self.send(packet_id::CHUNK_BATCH_RECEIVED, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A writer backed by one half of an in-memory duplex pipe, and the
    /// other half wrapped as a [`FramedStream`] for the test to read
    /// outbound frames back out of.
    fn test_writer() -> (
        SharedWriter<tokio::io::DuplexStream>,
        FramedStream<tokio::io::DuplexStream>,
    ) {
        let (client, server) = tokio::io::duplex(4096);
        let writer = Arc::new(Mutex::new(FramedStream::new(client)));
        (writer, FramedStream::new(server))
    }

    #[tokio::test]
    async fn chat_writes_the_expected_frame_shape() {
        let (writer, mut server) = test_writer();
        let player = Player::new("operator".to_string(), writer);
        player.chat("hello!").await.unwrap();

        let mut frame = server.read_frame().await.unwrap();
        assert_eq!(frame.read_varint().unwrap(), packet_id::CHAT);
        assert_eq!(frame.read_utf().unwrap(), "hello!");
    }

    #[tokio::test]
    async fn keep_alive_reply_echoes_the_same_id() {
        let (writer, mut server) = test_writer();
        let player = Player::new("operator".to_string(), writer);
        player.keep_alive_reply(0x1122_3344_5566_7788).await.unwrap();

        let mut frame = server.read_frame().await.unwrap();
        assert_eq!(frame.read_varint().unwrap(), packet_id::KEEP_ALIVE);
        assert_eq!(frame.read::<i64>().unwrap(), 0x1122_3344_5566_7788);
    }

    #[tokio::test]
    async fn jump_nudges_y_and_sends_a_move_packet() {
        let (writer, mut server) = test_writer();
        let mut player = Player::new("operator".to_string(), writer);
        player.position.y = 64.0;
        player.jump().await.unwrap();

        assert_eq!(player.position.y, 65.0);
        assert!(!player.on_ground);

        let mut frame = server.read_frame().await.unwrap();
        assert_eq!(frame.read_varint().unwrap(), packet_id::MOVE_PLAYER_POS);
    }

    #[tokio::test]
    async fn snapshot_reflects_current_state() {
        let (writer, _server) = test_writer();
        let mut player = Player::new("operator".to_string(), writer);
        player.entity_id = 7;
        player.position = Position {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        };
        player.health = 14.5;

        let snapshot = player.snapshot();
        assert_eq!(snapshot.entity_id, 7);
        assert_eq!(snapshot.position, (1.0, 2.0, 3.0));
        assert_eq!(snapshot.health, 14.5);
        assert_eq!(snapshot.loaded_chunks, 0);
    }
}
