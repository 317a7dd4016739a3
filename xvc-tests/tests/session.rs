use std::{
    io::{ErrorKind, Read, Write},
    net::TcpStream,
    thread,
    time::Duration,
};

use xvc_client::XvcClient;
use xvc_protocol::{CAPACITY_BYTES, Version};
use xvc_server::server::Config;
use xvc_server_bitbang::pins::Lines;
use xvc_tests::spawn_server;

fn connect(server: &xvc_tests::TestServer) -> TcpStream {
    let tcp = TcpStream::connect(server.addr).expect("Server should accept");
    tcp.set_nodelay(true).unwrap();
    tcp.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    tcp
}

/// The server must close the connection without sending anything.
fn assert_closed(tcp: &mut TcpStream) {
    let mut rest = Vec::new();
    match tcp.read_to_end(&mut rest) {
        Ok(_) => assert!(rest.is_empty(), "unexpected response {rest:02x?}"),
        Err(err) => assert_eq!(err.kind(), ErrorKind::ConnectionReset),
    }
}

#[test]
fn getinfo_returns_version_string() {
    let server = spawn_server(Config::default());
    let mut tcp = connect(&server);
    tcp.write_all(b"getinfo:").unwrap();

    let expected = b"xvcServer_v1.0:2048\n";
    let mut response = [0u8; 20];
    tcp.read_exact(&mut response).unwrap();
    assert_eq!(&response, expected);
}

#[test]
fn getinfo_advertises_configured_capacity() {
    let server = spawn_server(Config {
        max_vector_size: 64,
        ..Config::default()
    });
    let mut client = XvcClient::new(server.addr).unwrap();
    let info = client.get_info().unwrap();
    assert_eq!(info.version(), Version::V1_0);
    assert_eq!(info.max_vector_len(), 64);
}

#[test]
fn settck_echoes_period_bytes() {
    let server = spawn_server(Config::default());
    let mut tcp = connect(&server);
    tcp.write_all(b"settck:\x10\x00\x00\x00").unwrap();

    let mut response = [0u8; 4];
    tcp.read_exact(&mut response).unwrap();
    assert_eq!(response, [0x10, 0x00, 0x00, 0x00]);
}

#[test]
fn shift_byte_loops_back() {
    let server = spawn_server(Config::default());
    let mut tcp = connect(&server);
    tcp.write_all(b"shift:\x08\x00\x00\x00\x00\xAA").unwrap();

    let mut response = [0u8; 1];
    tcp.read_exact(&mut response).unwrap();
    assert_eq!(response, [0xAA]);
}

#[test]
fn shift_partial_byte_loops_back() {
    let server = spawn_server(Config::default());
    let mut client = XvcClient::new(server.addr).unwrap();
    let tdo = client.shift(13, &[0x1F, 0x00], &[0x5A, 0x15]).unwrap();
    assert_eq!(&*tdo, &[0x5A, 0x15]);
}

#[test]
fn shift_full_capacity() {
    let server = spawn_server(Config::default());
    let mut client = XvcClient::new(server.addr).unwrap();
    let tms = vec![0u8; CAPACITY_BYTES];
    let tdi: Vec<u8> = (0..CAPACITY_BYTES).map(|i| (i * 7) as u8).collect();
    let tdo = client
        .shift((CAPACITY_BYTES * 8) as u32, &tms, &tdi)
        .unwrap();
    assert_eq!(&*tdo, &tdi[..]);
}

#[test]
fn bus_is_idle_after_shift() {
    let server = spawn_server(Config::default());
    assert_eq!(server.pins.levels(), Lines::TMS);

    let mut client = XvcClient::new(server.addr).unwrap();
    client.shift(16, &[0xFF, 0xFF], &[0xFF, 0xFF]).unwrap();
    // the response is only sent after the engine went back to idle
    assert_eq!(server.pins.levels(), Lines::TMS);
}

#[test]
fn commands_on_one_connection() {
    let server = spawn_server(Config::default());
    let mut client = XvcClient::new(server.addr).unwrap();
    assert_eq!(client.get_info().unwrap().max_vector_len(), 2048);
    assert_eq!(client.set_tck(1000).unwrap(), 1000);
    assert_eq!(&*client.shift(4, &[0x01], &[0x09]).unwrap(), &[0x09]);
    assert_eq!(&*client.shift(0, &[], &[]).unwrap(), &[] as &[u8]);
    assert_eq!(client.set_tck(20).unwrap(), 20);
}

#[test]
fn request_split_across_segments() {
    let server = spawn_server(Config::default());
    let mut tcp = connect(&server);
    for chunk in [&b"sh"[..], b"if", b"t:\x0c", b"\x00\x00", b"\x00\x00", b"\x00\x34", b"\x02"] {
        tcp.write_all(chunk).unwrap();
        thread::sleep(Duration::from_millis(10));
    }

    let mut response = [0u8; 2];
    tcp.read_exact(&mut response).unwrap();
    assert_eq!(response, [0x34, 0x02]);
}

#[test]
fn oversized_shift_closes_connection() {
    let server = spawn_server(Config::default());
    let mut tcp = connect(&server);
    let num_bits = ((CAPACITY_BYTES + 1) * 8) as u32;
    tcp.write_all(b"shift:").unwrap();
    tcp.write_all(&num_bits.to_le_bytes()).unwrap();
    assert_closed(&mut tcp);
}

#[test]
fn unknown_command_closes_connection() {
    let server = spawn_server(Config::default());
    let mut tcp = connect(&server);
    tcp.write_all(b"xx").unwrap();
    assert_closed(&mut tcp);
}

#[test]
fn server_accepts_next_client_after_failure() {
    let server = spawn_server(Config::default());
    let mut tcp = connect(&server);
    tcp.write_all(b"xx").unwrap();
    assert_closed(&mut tcp);

    let mut client = XvcClient::new(server.addr).unwrap();
    assert_eq!(client.set_tck(42).unwrap(), 42);
}

#[test]
fn clients_are_served_one_at_a_time() {
    let server = spawn_server(Config::default());
    let mut first = XvcClient::new(server.addr).unwrap();
    assert_eq!(first.set_tck(1).unwrap(), 1);

    let mut second = connect(&server);
    second
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    second.write_all(b"settck:\x02\x00\x00\x00").unwrap();
    let mut response = [0u8; 4];
    let err = second.read_exact(&mut response).unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut
    ));

    drop(first);
    second
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    second.read_exact(&mut response).unwrap();
    assert_eq!(response, [0x02, 0x00, 0x00, 0x00]);
}

#[test]
fn silent_client_times_out() {
    let server = spawn_server(Config {
        read_write_timeout: Some(Duration::from_millis(100)),
        ..Config::default()
    });
    let mut idle = connect(&server);
    assert_closed(&mut idle);

    let mut client = XvcClient::new(server.addr).unwrap();
    assert_eq!(client.set_tck(7).unwrap(), 7);
}
