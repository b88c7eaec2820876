//! Tests for Client
//!
//! These tests run the client against an in-process fake server that speaks
//! the EchoRS framing. They verify:
//! - The exact payload each operation sends
//! - Decoding of every response kind the server produces
//! - Transport failures (closed connection, timeout, oversized response)
//! - Serialized access through SharedClient

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use echors::protocol::{Opcode, Status, Value, ValueType};
use echors::{Client, ClientConfig, Command, EchoError, ProtocolError, SharedClient};

// =============================================================================
// Helper Functions
// =============================================================================

/// Start a server for one connection. `handler` maps each request payload to
/// the raw response bytes; `None` closes the connection without replying.
/// The join handle yields every payload received.
fn spawn_server<F>(handler: F) -> (String, JoinHandle<Vec<Vec<u8>>>)
where
    F: Fn(&[u8]) -> Option<Vec<u8>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut seen = Vec::new();
        loop {
            let mut len = [0u8; 4];
            if stream.read_exact(&mut len).is_err() {
                break;
            }
            let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
            if stream.read_exact(&mut payload).is_err() {
                break;
            }
            let reply = handler(&payload);
            seen.push(payload);
            match reply {
                Some(bytes) => {
                    if stream.write_all(&bytes).is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
        seen
    });

    (addr, handle)
}

fn connect(addr: &str) -> Client {
    Client::connect_addr(addr).unwrap()
}

fn ok_string(s: &str) -> Vec<u8> {
    let mut out = vec![Status::Ok as u8, ValueType::String as u8];
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    out
}

fn err_string(s: &str) -> Vec<u8> {
    let mut out = ok_string(s);
    out[0] = Status::Error as u8;
    out
}

fn ok_int(n: u32) -> Vec<u8> {
    let mut out = vec![Status::Ok as u8, ValueType::Int as u8];
    out.extend_from_slice(&n.to_le_bytes());
    out
}

fn string_element(s: &str) -> Vec<u8> {
    let mut out = vec![ValueType::String as u8];
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    out
}

fn opcode_of(payload: &[u8]) -> Opcode {
    Opcode::from_le_bytes([payload[0], payload[1]])
}

// =============================================================================
// Scalar Operation Tests
// =============================================================================

#[test]
fn test_set_string_then_get() {
    let (addr, server) = spawn_server(|payload| match opcode_of(payload) {
        Opcode::SetString => Some(ok_string("OK")),
        Opcode::Get => Some(ok_string("echo")),
        _ => Some(err_string("Unknown command")),
    });

    let mut client = connect(&addr);
    let set = client.set_string("name", "echo").unwrap();
    assert_eq!(set.status, Status::Ok);
    assert_eq!(set.value.as_str(), Some("OK"));

    let get = client.get("name").unwrap();
    assert_eq!(get.value.as_str(), Some("echo"));

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(seen[0], b"\x02\x00\x04\x00\x00\x00name\x04\x00\x00\x00echo".to_vec());
    assert_eq!(seen[1], b"\x05\x00\x04\x00\x00\x00name".to_vec());
}

#[test]
fn test_get_missing_key_is_not_an_err() {
    let (addr, server) = spawn_server(|_| Some(err_string("Key not found")));

    let mut client = connect(&addr);
    let resp = client.get("missing").unwrap();
    assert_eq!(resp.status, Status::Error);

    match resp.into_result() {
        Err(EchoError::Application(msg)) => assert_eq!(msg, "Key not found"),
        other => panic!("Expected application error, got {:?}", other),
    }

    drop(client);
    server.join().unwrap();
}

#[test]
fn test_set_int_and_float() {
    let (addr, server) = spawn_server(|_| Some(ok_string("OK")));

    let mut client = connect(&addr);
    assert!(client.set_int("i", 10).unwrap().is_ok());
    assert!(client.set_float("f", 0.5).unwrap().is_ok());

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(opcode_of(&seen[0]), Opcode::SetInt);
    assert_eq!(&seen[0][7..], &[4, 0, 0, 0, 10, 0, 0, 0]);
    assert_eq!(opcode_of(&seen[1]), Opcode::SetFloat);
    assert_eq!(&seen[1][11..], &0.5f32.to_le_bytes());
}

#[test]
fn test_delete_sends_every_key() {
    let (addr, server) = spawn_server(|_| Some(ok_string("OK")));

    let mut client = connect(&addr);
    client.delete(["a", "b"]).unwrap();

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(
        seen[0],
        b"\x06\x00\x01\x00\x00\x00a\x01\x00\x00\x00b".to_vec()
    );
}

// =============================================================================
// Counter Tests
// =============================================================================

#[test]
fn test_increment_int_default_and_explicit() {
    let (addr, server) = spawn_server(|payload| {
        // 9 bytes: no amount field, server adds 1
        if payload.len() == 9 {
            Some(ok_int(1))
        } else {
            Some(ok_int(6))
        }
    });

    let mut client = connect(&addr);
    assert_eq!(client.increment_int("ctr", None).unwrap().value, Value::Int(1));
    assert_eq!(client.increment_int("ctr", Some(5)).unwrap().value, Value::Int(6));

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(seen[0], b"\x07\x00\x03\x00\x00\x00ctr".to_vec());
    assert_eq!(seen[1].len(), 17);
    assert_eq!(&seen[1][13..], &5u32.to_le_bytes());
}

#[test]
fn test_increment_float() {
    let (addr, server) = spawn_server(|_| {
        let mut out = vec![Status::Ok as u8, ValueType::Float as u8];
        out.extend_from_slice(&3.5f32.to_le_bytes());
        Some(out)
    });

    let mut client = connect(&addr);
    let resp = client.increment_float("f", Some(2.5)).unwrap();
    assert_eq!(resp.value.as_float(), Some(3.5));

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(opcode_of(&seen[0]), Opcode::IncrementFloat);
    assert_eq!(&seen[0][11..], &2.5f32.to_le_bytes());
}

// =============================================================================
// List Tests
// =============================================================================

#[test]
fn test_list_push_and_range() {
    let (addr, server) = spawn_server(|payload| match opcode_of(payload) {
        Opcode::ListPush => Some(ok_string("OK")),
        Opcode::ListRange => {
            let mut out = vec![Status::Ok as u8, ValueType::List as u8];
            out.extend(string_element("1"));
            out.extend(string_element("two"));
            Some(out)
        }
        Opcode::ListLength => Some(ok_int(2)),
        _ => Some(err_string("Unknown command")),
    });

    let mut client = connect(&addr);
    client.list_push("l", [1]).unwrap();
    client.list_push("l", ["two"]).unwrap();

    let range = client.list_range("l", 0, 10).unwrap();
    assert_eq!(
        range.value,
        Value::List(vec![Bytes::from_static(b"1"), Bytes::from_static(b"two")])
    );
    assert_eq!(client.list_length("l").unwrap().value.as_int(), Some(2));

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(seen[0], b"\x09\x00\x01\x00\x00\x00l\x01\x00\x00\x001".to_vec());
    assert_eq!(
        &seen[2][7..],
        &[4, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 10, 0, 0, 0]
    );
}

#[test]
fn test_list_extract_empty() {
    let (addr, server) = spawn_server(|_| Some(vec![Status::Ok as u8, ValueType::List as u8]));

    let mut client = connect(&addr);
    let resp = client.list_extract("l", 5, 2).unwrap();
    assert_eq!(resp.value, Value::List(vec![]));

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(opcode_of(&seen[0]), Opcode::ListExtract);
}

#[test]
fn test_list_pop_collects_all_values() {
    let (addr, server) = spawn_server(|_| {
        let mut out = vec![Status::Ok as u8];
        out.extend(string_element("c"));
        out.extend(string_element("b"));
        Some(out)
    });

    let mut client = connect(&addr);
    let resp = client.list_pop("l", Some(2)).unwrap();
    assert_eq!(
        resp.value,
        Value::List(vec![Bytes::from_static(b"c"), Bytes::from_static(b"b")])
    );

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(&seen[0][7..], &[4, 0, 0, 0, 2, 0, 0, 0]);
}

#[test]
fn test_list_pop_error() {
    let (addr, server) = spawn_server(|_| Some(err_string("Key not found")));

    let mut client = connect(&addr);
    let resp = client.list_pop("missing", None).unwrap();
    assert_eq!(resp.status, Status::Error);
    assert_eq!(resp.error_message().as_deref(), Some("Key not found"));

    drop(client);
    server.join().unwrap();
}

// =============================================================================
// HyperLogLog Tests
// =============================================================================

#[test]
fn test_hll_add_count_reset() {
    let (addr, server) = spawn_server(|payload| match opcode_of(payload) {
        Opcode::HllCount => {
            let mut out = vec![Status::Ok as u8, ValueType::Long as u8];
            out.extend_from_slice(&5_000_000_000u64.to_le_bytes());
            Some(out)
        }
        _ => Some(ok_string("OK")),
    });

    let mut client = connect(&addr);
    client.hll_add("visitors", ["alice", "bob"]).unwrap();
    let count = client.hll_count("visitors").unwrap();
    assert_eq!(count.value.as_count(), Some(5_000_000_000));
    assert_eq!(count.value.as_long(), Some(5_000_000_000));
    client.hll_reset("visitors").unwrap();

    drop(client);
    let seen = server.join().unwrap();
    let ops: Vec<Opcode> = seen.iter().map(|p| opcode_of(p)).collect();
    assert_eq!(ops, vec![Opcode::HllAdd, Opcode::HllCount, Opcode::HllReset]);
}

// =============================================================================
// Server Command Tests
// =============================================================================

#[test]
fn test_info_is_untagged_text() {
    let (addr, server) = spawn_server(|_| {
        let mut out = vec![Status::Ok as u8];
        out.extend_from_slice(b"current connections: 1\nversion: 0.4.0");
        Some(out)
    });

    let mut client = connect(&addr);
    let info = client.info().unwrap();
    assert!(info.value.as_str().unwrap().contains("version: 0.4.0"));

    drop(client);
    let seen = server.join().unwrap();
    assert_eq!(seen[0], vec![0x00, 0x00]);
}

#[test]
fn test_map_response_is_protocol_error() {
    let (addr, server) = spawn_server(|_| Some(vec![Status::Ok as u8, ValueType::Map as u8]));

    let mut client = connect(&addr);
    let result = client.get("m");
    assert!(matches!(
        result,
        Err(EchoError::Protocol(ProtocolError::UnsupportedValueType(ValueType::Map)))
    ));
    assert!(client.is_poisoned());

    drop(client);
    server.join().unwrap();
}

// =============================================================================
// Transport Tests
// =============================================================================

#[test]
fn test_connection_closed_before_reply() {
    let (addr, server) = spawn_server(|_| None);

    let mut client = connect(&addr);
    let err = client.test().unwrap_err();
    assert!(err.is_transport(), "unexpected error: {:?}", err);

    drop(client);
    server.join().unwrap();
}

#[test]
fn test_read_timeout() {
    let (addr, server) = spawn_server(|_| {
        thread::sleep(Duration::from_millis(300));
        Some(ok_string("late"))
    });

    let config = ClientConfig::builder()
        .server_addr(&addr)
        .read_timeout_ms(50)
        .build();
    let mut client = Client::connect(config).unwrap();
    assert!(!client.is_poisoned());

    match client.test() {
        Err(EchoError::Transport(e)) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
        other => panic!("Expected timeout, got {:?}", other),
    }
    assert!(client.is_poisoned());
    // The late reply must never be read as the answer to a new command
    assert!(matches!(client.test(), Err(EchoError::Poisoned)));

    drop(client);
    server.join().unwrap();
}

#[test]
fn test_reply_split_across_segments_poisons_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut len = [0u8; 4];
        stream.read_exact(&mut len).unwrap();
        let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
        stream.read_exact(&mut payload).unwrap();

        // STRING header announcing 6 bytes, then the body arrives late
        let mut head = vec![Status::Ok as u8, ValueType::String as u8];
        head.extend_from_slice(&6u32.to_le_bytes());
        stream.write_all(&head).unwrap();
        thread::sleep(Duration::from_millis(200));

        // Bytes that would decode as (OK, Int(7)) if taken as a fresh reply
        let _ = stream.write_all(&ok_int(7));

        // Hold the socket open until the client hangs up
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest);
    });

    let mut client = connect(&addr);

    assert!(matches!(
        client.get("s"),
        Err(EchoError::Protocol(ProtocolError::Truncated { needed: 6, remaining: 0, .. }))
    ));
    assert!(client.is_poisoned());

    thread::sleep(Duration::from_millis(300));
    assert!(matches!(client.increment_int("ctr", None), Err(EchoError::Poisoned)));

    drop(client);
    server.join().unwrap();
}

#[test]
fn test_oversized_response() {
    let (addr, server) = spawn_server(|_| Some(ok_string(&"x".repeat(64))));

    let config = ClientConfig::builder()
        .server_addr(&addr)
        .max_response_size(32)
        .build();
    let mut client = Client::connect(config).unwrap();

    assert!(matches!(
        client.get("big"),
        Err(EchoError::Protocol(ProtocolError::ResponseOverflow { limit: 32 }))
    ));
    assert!(matches!(client.get("next"), Err(EchoError::Poisoned)));

    drop(client);
    server.join().unwrap();
}

#[test]
fn test_connect_refused() {
    // Bind then drop to get a port nobody listens on
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };

    match Client::connect_addr(addr) {
        Err(e) => assert!(e.is_transport(), "unexpected error: {:?}", e),
        Ok(_) => panic!("Expected connect to fail"),
    }
}

#[test]
fn test_invalid_config_rejected() {
    let config = ClientConfig::builder().max_response_size(0).build();
    assert!(matches!(Client::connect(config), Err(EchoError::Config(_))));
}

// =============================================================================
// Shared Client Tests
// =============================================================================

#[test]
fn test_raw_unknown_opcode_through_shared_client() {
    let (addr, server) = spawn_server(|payload| match opcode_of(payload) {
        Opcode::Unknown => Some(err_string("unknown command")),
        _ => Some(ok_string("OK")),
    });

    let shared = SharedClient::from(connect(&addr));
    let command = Command::Raw {
        opcode: Opcode::Unknown,
        args: vec![b"k".to_vec()],
    };

    let resp = shared.execute(&command).unwrap();
    assert_eq!(resp.status, Status::Error);
    assert_eq!(resp.error_message().as_deref(), Some("unknown command"));
    // A server-side error leaves the connection usable
    assert!(!shared.with(|c| c.is_poisoned()));
    assert!(shared.execute(&Command::Test).unwrap().is_ok());

    drop(shared);
    let seen = server.join().unwrap();
    assert_eq!(seen[0], vec![0x11, 0x00, 1, 0, 0, 0, b'k']);
}

#[test]
fn test_shared_client_serializes_callers() {
    let (addr, server) = spawn_server(|payload| {
        let key_len = u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]) as usize;
        let key = std::str::from_utf8(&payload[6..6 + key_len]).unwrap().to_string();
        Some(ok_string(&key))
    });

    let shared = SharedClient::new(connect(&addr));

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let shared = shared.clone();
            thread::spawn(move || {
                for j in 0..10 {
                    let key = format!("k{}-{}", i, j);
                    let resp = shared.with(|c| c.get(&key)).unwrap();
                    // Each caller sees the reply to its own request
                    assert_eq!(resp.value.as_str(), Some(key.as_str()));
                }
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }

    drop(shared);
    let seen = server.join().unwrap();
    assert_eq!(seen.len(), 40);
}
