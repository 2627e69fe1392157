#![allow(clippy::unwrap_used)]
// Integration tests for `Session` against local UDP sockets.

use std::collections::BTreeMap;
use std::io;
use std::net::{Ipv4Addr, UdpSocket};
use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use snmp::SnmpPdu;

use assocmap_snmp::{Error, Oid, Session, SessionOptions, Value, WalkClient};

// ── Helpers ─────────────────────────────────────────────────────────

fn quick_options(retries: u32) -> SessionOptions {
    SessionOptions {
        timeout: Duration::from_millis(100),
        retries,
        ..SessionOptions::default()
    }
}

/// A bound socket that swallows every request without answering.
fn silent_agent() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").unwrap()
}

fn scripted_options(retries: u32, max_repetitions: u32) -> SessionOptions {
    SessionOptions {
        timeout: Duration::from_millis(200),
        retries,
        max_repetitions,
        ..SessionOptions::default()
    }
}

const CLIENT_IP: [u32; 12] = [1, 3, 6, 1, 4, 1, 14179, 2, 1, 4, 1, 2];

fn under(root: &[u32], suffix: &[u32]) -> Vec<u32> {
    [root, suffix].concat()
}

// ── BER encoding for agent replies ──────────────────────────────────

fn tlv(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    if body.len() < 0x80 {
        out.push(u8::try_from(body.len()).unwrap());
    } else {
        let len: Vec<u8> = body.len().to_be_bytes().into_iter().skip_while(|b| *b == 0).collect();
        out.push(0x80 | u8::try_from(len.len()).unwrap());
        out.extend(len);
    }
    out.extend_from_slice(body);
    out
}

/// Minimal two's complement, never empty.
fn integer_body(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let (head, next) = (bytes[start], bytes[start + 1]);
        let redundant = (head == 0x00 && next & 0x80 == 0) || (head == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn integer(value: i64) -> Vec<u8> {
    tlv(0x02, &integer_body(value))
}

fn object_id(arcs: &[u32]) -> Vec<u8> {
    let mut body = vec![u8::try_from(arcs[0] * 40 + arcs[1]).unwrap()];
    for &arc in &arcs[2..] {
        let mut chunk = vec![u8::try_from(arc & 0x7f).unwrap()];
        let mut rest = arc >> 7;
        while rest > 0 {
            chunk.push(0x80 | u8::try_from(rest & 0x7f).unwrap());
            rest >>= 7;
        }
        chunk.reverse();
        body.extend(chunk);
    }
    tlv(0x06, &body)
}

fn octets(bytes: &[u8]) -> Vec<u8> {
    tlv(0x04, bytes)
}

fn ip_address(ip: Ipv4Addr) -> Vec<u8> {
    tlv(0x40, &ip.octets())
}

fn counter32(value: u32) -> Vec<u8> {
    tlv(0x41, &integer_body(i64::from(value)))
}

fn timeticks(value: u32) -> Vec<u8> {
    tlv(0x43, &integer_body(i64::from(value)))
}

fn end_of_mib_view() -> Vec<u8> {
    tlv(0x82, &[])
}

fn response(req_id: i32, error_status: i64, varbinds: &[(Vec<u32>, Vec<u8>)]) -> Vec<u8> {
    let list: Vec<u8> = varbinds
        .iter()
        .flat_map(|(name, value)| tlv(0x30, &[object_id(name), value.clone()].concat()))
        .collect();
    let pdu = [
        integer(i64::from(req_id)),
        integer(error_status),
        integer(0),
        tlv(0x30, &list),
    ]
    .concat();
    tlv(0x30, &[integer(1), octets(b"public"), tlv(0xa2, &pdu)].concat())
}

// ── Scripted agent ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Script {
    /// Serve the table in order and report end of view when it runs out.
    Table,
    /// Hold the first reply back for this long.
    LateFirst(Duration),
    /// Answer every request with the first row of the table.
    Stuck,
    /// Answer every request with this error status and no rows.
    Failing(i64),
}

/// A GETBULK responder on a background thread.
struct ScriptedAgent {
    target: String,
    requests: Arc<AtomicUsize>,
}

impl ScriptedAgent {
    fn start(rows: Vec<(Vec<u32>, Vec<u8>)>, script: Script) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let target = socket.local_addr().unwrap().to_string();
        let requests = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&requests);
        let table: BTreeMap<Vec<u32>, Vec<u8>> = rows.into_iter().collect();

        thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                let (len, peer) = match socket.recv_from(&mut buf) {
                    Ok(received) => received,
                    Err(e) if matches!(e.kind(), io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused) => {
                        continue;
                    }
                    Err(_) => break,
                };
                let count = seen.fetch_add(1, Ordering::SeqCst);
                let Some(reply) = answer(&table, script, &buf[..len]) else {
                    continue;
                };
                if let Script::LateFirst(delay) = script {
                    if count == 0 {
                        thread::sleep(delay);
                    }
                }
                let _ = socket.send_to(&reply, peer);
            }
        });

        Self { target, requests }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

fn answer(table: &BTreeMap<Vec<u32>, Vec<u8>>, script: Script, request: &[u8]) -> Option<Vec<u8>> {
    let pdu = SnmpPdu::from_bytes(request).ok()?;
    let req_id = pdu.req_id;
    let max_repetitions = usize::try_from(pdu.error_index).ok()?;
    let mut varbinds = pdu.varbinds;
    let (name, _) = varbinds.next()?;
    let mut name_buf = [0u32; 128];
    let start = name.read_name(&mut name_buf).ok()?.to_vec();

    let rows: Vec<(Vec<u32>, Vec<u8>)> = match script {
        Script::Failing(status) => return Some(response(req_id, status, &[])),
        Script::Stuck => table.iter().take(1).map(|(k, v)| (k.clone(), v.clone())).collect(),
        Script::Table | Script::LateFirst(_) => {
            let mut rows: Vec<_> = table
                .range::<Vec<u32>, _>((Bound::Excluded(&start), Bound::Unbounded))
                .take(max_repetitions)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if rows.len() < max_repetitions {
                let last = rows.last().map_or(start, |(k, _)| k.clone());
                rows.push((last, end_of_mib_view()));
            }
            rows
        }
    };
    Some(response(req_id, 0, &rows))
}

fn client_rows(count: u8) -> Vec<(Vec<u32>, Vec<u8>)> {
    (1..=count)
        .map(|n| {
            let mac = [0, 27, 34, 68, 1, u32::from(n)];
            (under(&CLIENT_IP, &mac), ip_address(Ipv4Addr::new(10, 0, 0, n)))
        })
        .collect()
}

// ── Walks against an answering agent ────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_walk_pages_until_subtree_ends() {
    let mut rows = client_rows(25);
    // Next column of the same table, outside the walked subtree.
    rows.push((under(&[1, 3, 6, 1, 4, 1, 14179, 2, 1, 4, 1, 3], &[0, 27, 34, 68, 1, 1]), integer(1)));
    let agent = ScriptedAgent::start(rows, Script::Table);

    let session = Session::connect(agent.target.clone(), scripted_options(0, 10)).await.unwrap();
    let walked = session.walk(&Oid::from(&CLIENT_IP[..])).await.unwrap();

    assert_eq!(walked.len(), 25);
    assert!(walked.iter().all(|row| row.oid.starts_with(&Oid::from(&CLIENT_IP[..]))));
    assert_eq!(walked[0].oid, Oid::new(under(&CLIENT_IP, &[0, 27, 34, 68, 1, 1])));
    assert_eq!(walked[24].value, Value::IpAddress(Ipv4Addr::new(10, 0, 0, 25)));
    assert!(walked.windows(2).all(|pair| pair[0].oid < pair[1].oid));
    assert_eq!(agent.requests(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_walk_stops_at_end_of_view() {
    let agent = ScriptedAgent::start(client_rows(10), Script::Table);

    let session = Session::connect(agent.target.clone(), scripted_options(0, 4)).await.unwrap();
    let walked = session.walk(&Oid::from(&CLIENT_IP[..])).await.unwrap();

    assert_eq!(walked.len(), 10);
    assert_eq!(walked[9].value, Value::IpAddress(Ipv4Addr::new(10, 0, 0, 10)));
    // Three pages of rows, then one that is only the end-of-view marker.
    assert_eq!(agent.requests(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_subtree_walks_to_nothing() {
    let agent = ScriptedAgent::start(Vec::new(), Script::Table);

    let session = Session::connect(agent.target.clone(), scripted_options(0, 10)).await.unwrap();
    let walked = session.walk(&Oid::from(&CLIENT_IP[..])).await.unwrap();

    assert!(walked.is_empty());
    assert_eq!(agent.requests(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_walk_ends_when_agent_stops_advancing() {
    let agent = ScriptedAgent::start(client_rows(3), Script::Stuck);

    let session = Session::connect(agent.target.clone(), scripted_options(0, 10)).await.unwrap();
    let walked = session.walk(&Oid::from(&CLIENT_IP[..])).await.unwrap();

    assert_eq!(walked.len(), 1);
    assert_eq!(agent.requests(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_walk_decodes_value_types() {
    let rows = vec![
        (under(&CLIENT_IP, &[1]), octets(b"lobby")),
        (under(&CLIENT_IP, &[2]), integer(-5)),
        (under(&CLIENT_IP, &[3]), counter32(4_000_000_000)),
        (under(&CLIENT_IP, &[4]), timeticks(12_345)),
        (under(&CLIENT_IP, &[5]), octets(&[0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22])),
    ];
    let agent = ScriptedAgent::start(rows, Script::Table);

    let session = Session::connect(agent.target.clone(), scripted_options(0, 10)).await.unwrap();
    let walked = session.walk(&Oid::from(&CLIENT_IP[..])).await.unwrap();
    let values: Vec<Value> = walked.into_iter().map(|row| row.value).collect();

    assert_eq!(
        values,
        vec![
            Value::OctetString(b"lobby".to_vec()),
            Value::Integer(-5),
            Value::Unsigned(4_000_000_000),
            Value::Unsigned(12_345),
            Value::OctetString(vec![0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_late_reply_does_not_break_later_walks() {
    let agent = ScriptedAgent::start(client_rows(12), Script::LateFirst(Duration::from_millis(300)));
    let session = Session::connect(agent.target.clone(), scripted_options(2, 5)).await.unwrap();
    let root = Oid::from(&CLIENT_IP[..]);

    for _ in 0..3 {
        let walked = session.walk(&root).await.unwrap();
        assert_eq!(walked.len(), 12);
    }
}

// ── Walk failures ───────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_walk_times_out_after_retries() {
    let agent = silent_agent();
    let target = agent.local_addr().unwrap().to_string();

    let session = Session::connect(target.clone(), quick_options(2)).await.unwrap();
    let root: Oid = "1.3.6.1.4.1.14179.2.1.4.1.2".parse().unwrap();
    let result = session.walk(&root).await;

    match result {
        Err(Error::Timeout { target: t, attempts }) => {
            assert_eq!(t, target);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected Timeout, got: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timeout_is_transient() {
    let agent = silent_agent();
    let target = agent.local_addr().unwrap().to_string();

    let session = Session::connect(target, quick_options(0)).await.unwrap();
    let root: Oid = "1.3.6.1".parse().unwrap();
    let err = session.walk(&root).await.unwrap_err();

    assert!(err.is_transient(), "expected transient error, got: {err:?}");
}

#[tokio::test]
async fn test_target_is_reported_verbatim() {
    let session = Session::connect("127.0.0.1:1161", SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(session.target(), "127.0.0.1:1161");
    session.close().await;
}

#[tokio::test]
async fn test_unresolvable_host_fails_to_connect() {
    let result = Session::connect("no-such-controller.invalid", SessionOptions::default()).await;
    assert!(result.is_err(), "expected resolution failure");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_agent_error_status_is_not_retried() {
    let agent = ScriptedAgent::start(client_rows(1), Script::Failing(5));
    let session = Session::connect(agent.target.clone(), scripted_options(3, 10)).await.unwrap();

    match session.walk(&Oid::from(&CLIENT_IP[..])).await {
        Err(Error::Agent { target, status }) => {
            assert_eq!(target, agent.target);
            assert_eq!(status, 5);
        }
        other => panic!("expected Agent, got: {other:?}"),
    }
    assert_eq!(agent.requests(), 1);
}
