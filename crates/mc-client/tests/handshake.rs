//! Drives the full login/configuration/play handshake over an in-memory
//! duplex pipe instead of a real socket, replaying the recorded byte shapes
//! the protocol documentation calls out: the handshake/login round trip and
//! the keep-alive echo.

use std::sync::Arc;

use byteorder::{BigEndian, WriteBytesExt};
use mc_client::Connection;
use mc_data::{BlockRegistry, PacketNameRegistry};
use mc_protocol::FramedStream;

fn registries() -> (Arc<BlockRegistry>, Arc<PacketNameRegistry>) {
    (
        Arc::new(BlockRegistry::default()),
        Arc::new(PacketNameRegistry::default()),
    )
}

/// Builds a connection wired to one end of a duplex pipe and returns the
/// other end, framed, for the test to act as the server.
fn connect_over_duplex(
    name: &str,
) -> (
    Connection<tokio::io::ReadHalf<tokio::io::DuplexStream>, tokio::io::WriteHalf<tokio::io::DuplexStream>>,
    FramedStream<tokio::io::DuplexStream>,
) {
    let (client_side, server_side) = tokio::io::duplex(8192);
    let (client_read, client_write) = tokio::io::split(client_side);
    let (registry, packet_names) = registries();

    let connection = Connection::from_parts(
        "127.0.0.1",
        25565,
        name,
        FramedStream::new(client_read),
        client_write,
        registry,
        packet_names,
    )
    .unwrap();

    (connection, FramedStream::new(server_side))
}

/// A network NBT compound with a single `TAG_String` child holding `reason`,
/// matching the wire shape `Connection`'s Play-phase disconnect handler
/// expects.
fn disconnect_nbt(reason: &str) -> Vec<u8> {
    let mut buf = vec![0x0a]; // TAG_Compound root
    buf.push(0x08); // TAG_String
    buf.push(0); // discarded header byte
    mc_protocol::write_utf(&mut buf, reason).unwrap();
    buf.push(0x00); // TAG_End
    buf.push(0); // discarded header byte
    buf
}

#[tokio::test]
async fn handshake_and_login_round_trip_matches_recorded_trace() {
    let (connection, mut server) = connect_over_duplex("Tester");
    let run_handle = tokio::spawn(connection.run());

    let mut handshake = server.read_frame().await.unwrap();
    assert_eq!(handshake.read_varint().unwrap(), 0x00);
    assert_eq!(handshake.read_varint().unwrap(), 769);
    assert_eq!(handshake.read_utf().unwrap(), "127.0.0.1");
    assert_eq!(handshake.read::<u16>().unwrap(), 25565);
    assert_eq!(handshake.read_varint().unwrap(), 2);

    let mut login_start = server.read_frame().await.unwrap();
    assert_eq!(login_start.read_varint().unwrap(), 0x00);
    assert_eq!(login_start.read_utf().unwrap(), "Tester");

    // Login Success: any nonzero id in this phase's dispatch table.
    server.write_frame(0x02, &[]).await.unwrap();

    let mut login_ack = server.read_frame().await.unwrap();
    assert_eq!(login_ack.read_varint().unwrap(), 0x03);
    assert_eq!(login_ack.remaining(), 0);

    // Configuration Disconnect (0x02) ends the run loop gracefully.
    let mut body = Vec::new();
    mc_protocol::write_utf(&mut body, "bye").unwrap();
    server.write_frame(0x02, &body).await.unwrap();

    let result = run_handle.await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn keep_alive_echoes_with_the_same_eight_bytes() {
    let (connection, mut server) = connect_over_duplex("Tester");
    let run_handle = tokio::spawn(connection.run());

    // Drain the handshake and login start frames.
    server.read_frame().await.unwrap();
    server.read_frame().await.unwrap();
    server.write_frame(0x02, &[]).await.unwrap(); // Login Success
    server.read_frame().await.unwrap(); // Login Acknowledged

    // Move straight to Play via Finish Configuration (0x03).
    server.write_frame(0x03, &[]).await.unwrap();
    let mut ack = server.read_frame().await.unwrap();
    assert_eq!(ack.read_varint().unwrap(), 0x03);
    assert_eq!(ack.remaining(), 0);

    let keep_alive_id: i64 = 0x1122_3344_5566_7788_u64 as i64;
    let mut body = Vec::new();
    body.write_i64::<BigEndian>(keep_alive_id).unwrap();
    server.write_frame(0x27, &body).await.unwrap();

    let mut echoed = server.read_frame().await.unwrap();
    assert_eq!(echoed.read_varint().unwrap(), 0x1a);
    assert_eq!(echoed.read::<i64>().unwrap(), keep_alive_id);

    server.write_frame(0x1d, &disconnect_nbt("done")).await.unwrap();

    let result = run_handle.await.unwrap();
    assert!(result.is_ok());
}
