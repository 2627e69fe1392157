// ── SNMP v2c session ──
//
// One long-lived UDP session per controller. The `snmp` crate is
// synchronous, so every request runs on tokio's blocking pool while
// holding the session mutex; concurrent walks against the same
// controller are serialized, walks against different controllers
// proceed in parallel.

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use snmp::{SnmpError, SyncSession};
use tracing::{debug, trace};

use crate::error::Error;
use crate::oid::{Oid, Value, Varbind};
use crate::WalkClient;

/// Default agent port when the controller address carries none.
pub const DEFAULT_PORT: u16 = 161;
/// Read community shared by all controllers.
pub const DEFAULT_COMMUNITY: &str = "public";
/// Per-request receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Retries after the first attempt when a request gets no answer.
pub const DEFAULT_RETRIES: u32 = 3;
/// Rows requested per GETBULK.
pub const DEFAULT_MAX_REPETITIONS: u32 = 10;

/// Connection tuning for a [`Session`].
///
/// The daemon always uses [`SessionOptions::default`]; these values are
/// fixed and not read from the configuration file.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub community: String,
    pub timeout: Duration,
    pub retries: u32,
    pub max_repetitions: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            community: DEFAULT_COMMUNITY.into(),
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            max_repetitions: DEFAULT_MAX_REPETITIONS,
        }
    }
}

/// A v2c session bound to a single controller.
///
/// The socket is opened eagerly by [`Session::connect`] or lazily on the
/// first walk for sessions built with [`Session::new`], so a controller
/// that cannot be resolved at startup is retried on every poll.
pub struct Session {
    target: String,
    options: SessionOptions,
    state: Arc<Mutex<SessionState>>,
}

#[derive(Default)]
struct SessionState {
    socket: Option<SyncSession>,
    closed: bool,
}

impl Session {
    /// Build a session without touching the network.
    pub fn new(target: impl Into<String>, options: SessionOptions) -> Self {
        Self {
            target: target.into(),
            options,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Resolve `target` and open the UDP socket.
    ///
    /// `target` is either `host` (port 161 implied) or `host:port`.
    /// No packet is sent until the first walk.
    pub async fn connect(target: impl Into<String>, options: SessionOptions) -> Result<Self, Error> {
        let session = Self::new(target, options);
        let state = Arc::clone(&session.state);
        let name = session.target.clone();
        let opts = session.options.clone();

        tokio::task::spawn_blocking(move || {
            let socket = open_blocking(&name, &opts)?;
            if let Ok(mut guard) = state.lock() {
                guard.socket = Some(socket);
            }
            Ok::<_, Error>(())
        })
        .await??;

        debug!(target = %session.target, "snmp session opened");
        Ok(session)
    }
}

impl WalkClient for Session {
    fn target(&self) -> &str {
        &self.target
    }

    async fn walk(&self, root: &Oid) -> Result<Vec<Varbind>, Error> {
        let state = Arc::clone(&self.state);
        let target = self.target.clone();
        let options = self.options.clone();
        let root = root.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = state.lock().map_err(|_| Error::Closed(target.clone()))?;
            if guard.closed {
                return Err(Error::Closed(target));
            }
            walk_blocking(&mut guard.socket, &target, &root, &options)
        })
        .await?
    }

    async fn close(&self) {
        let state = Arc::clone(&self.state);
        // Waits for an in-flight walk to release the socket before dropping it.
        let _ = tokio::task::spawn_blocking(move || {
            if let Ok(mut guard) = state.lock() {
                guard.closed = true;
                guard.socket = None;
            }
        })
        .await;
        debug!(target = %self.target, "snmp session closed");
    }
}

// ── Blocking helpers ────────────────────────────────────────────────

fn resolve(target: &str) -> Result<SocketAddr, Error> {
    let io_err = |source| Error::Io {
        target: target.to_owned(),
        source,
    };

    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let mut addrs = match target.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() && !host.contains(':') => {
            target.to_socket_addrs().map_err(io_err)?
        }
        _ => (target, DEFAULT_PORT).to_socket_addrs().map_err(io_err)?,
    };
    addrs.next().ok_or_else(|| Error::Unresolvable(target.to_owned()))
}

fn open_blocking(target: &str, options: &SessionOptions) -> Result<SyncSession, Error> {
    let addr = resolve(target)?;
    SyncSession::new(addr, options.community.as_bytes(), Some(options.timeout), 0).map_err(
        |source| Error::Io {
            target: target.to_owned(),
            source,
        },
    )
}

/// Walk the subtree under `root` with repeated GETBULK requests.
///
/// Stops on leaving the subtree, an empty page, or an OID that fails to
/// advance (broken agents loop). `snmp` stops decoding a page at the
/// first varbind it has no type for, so an endOfMibView marker ends the
/// page early and the following request comes back empty.
///
/// Any failed request drops the socket: a reply that arrives after its
/// timeout must never be read as the answer to a later request. The
/// socket is reopened for the retry, or lazily by the next walk.
fn walk_blocking(
    slot: &mut Option<SyncSession>,
    target: &str,
    root: &Oid,
    options: &SessionOptions,
) -> Result<Vec<Varbind>, Error> {
    let mut rows = Vec::new();
    let mut cursor = root.clone();
    let mut attempt = 0;

    loop {
        if slot.is_none() {
            *slot = Some(open_blocking(target, options)?);
            debug!(%target, "snmp socket opened");
        }
        let Some(socket) = slot.as_mut() else {
            return Err(Error::Closed(target.to_owned()));
        };

        let page = match request_page(socket, target, &cursor, options.max_repetitions) {
            Ok(page) => page,
            Err(e) => {
                *slot = None;
                if e.is_transient() && attempt < options.retries {
                    attempt += 1;
                    trace!(%target, attempt, error = %e, "request failed, retrying on a fresh socket");
                    continue;
                }
                return Err(match e {
                    Error::Timeout { .. } => Error::Timeout {
                        target: target.to_owned(),
                        attempts: attempt + 1,
                    },
                    other => other,
                });
            }
        };
        attempt = 0;

        let mut advanced = false;
        let mut finished = false;
        for row in page {
            if !row.oid.starts_with(root) || row.oid <= cursor {
                finished = true;
                break;
            }
            cursor = row.oid.clone();
            advanced = true;
            rows.push(row);
        }

        if finished || !advanced {
            break;
        }
    }

    trace!(%target, root = %root, rows = rows.len(), "walk complete");
    Ok(rows)
}

/// One GETBULK round trip, copied out of the receive buffer.
fn request_page(
    session: &mut SyncSession,
    target: &str,
    cursor: &Oid,
    max_repetitions: u32,
) -> Result<Vec<Varbind>, Error> {
    let pdu = session
        .getbulk(&[cursor.arcs()], 0, max_repetitions)
        .map_err(|e| match e {
            SnmpError::ReceiveError => Error::Timeout {
                target: target.to_owned(),
                attempts: 1,
            },
            SnmpError::SendError => Error::Io {
                target: target.to_owned(),
                source: std::io::Error::other("request could not be sent"),
            },
            other => Error::Protocol {
                target: target.to_owned(),
                message: format!("{other:?}"),
            },
        })?;

    if pdu.error_status != 0 {
        return Err(Error::Agent {
            target: target.to_owned(),
            status: pdu.error_status,
        });
    }

    let mut page = Vec::new();
    for (name, value) in pdu.varbinds {
        let mut buf = [0u32; 128];
        let arcs = name.read_name(&mut buf).map_err(|_| Error::Protocol {
            target: target.to_owned(),
            message: "undecodable object identifier in response".into(),
        })?;
        page.push(Varbind::new(Oid::from(arcs), Value::from(value)));
    }
    Ok(page)
}
