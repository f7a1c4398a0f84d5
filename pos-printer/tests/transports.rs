//! LAN transport against a loopback listener

use pos_printer::{
    ConnectionGuard, CutMode, EscPosJob, JobSettings, LanTransport, PrintError, Transport,
};
use shared::{ConnectionParams, PrinterProfile, TransportType};
use std::io::Read;
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn lan_profile(port: u16) -> PrinterProfile {
    PrinterProfile::new(TransportType::Lan, "loopback")
        .with_params(
            ConnectionParams::new()
                .with("ip", "127.0.0.1")
                .with("port", u64::from(port)),
        )
        .with_timeout_ms(2000)
}

#[test]
fn lan_job_reaches_the_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).unwrap();
        received
    });

    let profile = lan_profile(port);
    let settings = JobSettings::from_profile(&profile, CutMode::Partial, None);
    let job = EscPosJob::text(&["Latte        3.50"], &settings);

    let conn = LanTransport::new().connect(&profile).unwrap();
    let mut guard = ConnectionGuard::new(conn, profile.id.clone());
    guard.send_job(&job).unwrap();
    drop(guard);

    let received = server.join().unwrap();
    assert_eq!(received, job.to_bytes());
}

#[test]
fn lan_refused_is_connection_error() {
    // Bind then drop to get a port nobody listens on
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = LanTransport::new().connect(&lan_profile(port)).err().unwrap();
    assert!(matches!(err, PrintError::Connection(_)));
}

#[test]
fn lan_stalled_peer_times_out_and_shuts_down() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (release, released) = mpsc::channel::<()>();
    let server = thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        // Never read until the client gave up
        released.recv().unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        let mut drained = Vec::new();
        socket.read_to_end(&mut drained).map(|_| drained.len())
    });

    let profile = lan_profile(port).with_timeout_ms(200);
    let conn = LanTransport::new().connect(&profile).unwrap();
    let mut guard = ConnectionGuard::new(conn, profile.id.clone());

    let chunk = vec![b'x'; 1 << 20];
    let err = (0..1024)
        .find_map(|_| guard.write_all(&chunk).err())
        .expect("peer buffers never filled");
    assert!(
        matches!(err, PrintError::Connection(_) | PrintError::Io(_)),
        "{err:?}"
    );
    assert!(!guard.is_open());

    release.send(()).unwrap();
    // EOF (not a read timeout) proves the socket was shut down
    let drained = server.join().unwrap();
    assert!(drained.is_ok(), "{drained:?}");
}
