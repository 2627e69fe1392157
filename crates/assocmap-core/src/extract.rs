// ── Record extraction ──
//
// Turns one controller's walk of one subtree into a normalized
// link-address → value mapping. Each queried kind maps to exactly one
// subtree and one row decoder; rows that fail to decode are skipped,
// and a failed walk becomes a failed (empty) extract.

use assocmap_snmp::{Oid, Value, Varbind, WalkClient};
use tracing::{debug, warn};

use crate::model::{Extract, LinkAddress, NULL_IP, RecordKind, RecordMap};

/// Station table, IP address column (keyed by device link-address).
const DEVICE_IP_ROOT: &[u32] = &[1, 3, 6, 1, 4, 1, 14179, 2, 1, 4, 1, 2];
/// Access-point table, name column (keyed by access-point link-address).
const AP_NAME_ROOT: &[u32] = &[1, 3, 6, 1, 4, 1, 9, 9, 513, 1, 1, 1, 1, 5];
/// Station table, owning access-point column (keyed by device link-address).
const DEVICE_AP_ROOT: &[u32] = &[1, 3, 6, 1, 4, 1, 14179, 2, 1, 4, 1, 4];

/// Decodes one row: (row index arcs, payload) → (key, value).
type DecodeFn = fn(&[u32], &Value) -> Option<(String, String)>;

/// Where a kind lives in the controller's object tree and how to read it.
#[derive(Clone, Copy)]
pub struct RecordSource {
    root: &'static [u32],
    decode: DecodeFn,
}

impl RecordSource {
    pub fn root(&self) -> Oid {
        Oid::from(self.root)
    }

    /// Decode every row under the root, returning the mapping and the
    /// number of rows skipped.
    pub fn decode_rows(&self, rows: &[Varbind]) -> (RecordMap, usize) {
        let root = self.root();
        let mut entries = RecordMap::new();
        let mut skipped = 0;

        for row in rows {
            let decoded = row
                .oid
                .suffix_after(&root)
                .and_then(|suffix| (self.decode)(suffix, &row.value));
            match decoded {
                Some((key, value)) => {
                    entries.insert(key, value);
                }
                None => skipped += 1,
            }
        }
        (entries, skipped)
    }
}

impl RecordKind {
    /// The subtree and decoder for this kind, or `None` for derived kinds.
    pub fn source(self) -> Option<RecordSource> {
        match self {
            Self::DeviceAssoc => Some(RecordSource {
                root: DEVICE_IP_ROOT,
                decode: decode_device_ip,
            }),
            Self::ApAssoc => Some(RecordSource {
                root: AP_NAME_ROOT,
                decode: decode_ap_name,
            }),
            Self::Join => Some(RecordSource {
                root: DEVICE_AP_ROOT,
                decode: decode_device_ap,
            }),
            Self::ControllerOf => None,
        }
    }
}

// ── Row decoders ────────────────────────────────────────────────────

/// Device link-address → IP. Unassociated devices (null IP) are dropped.
fn decode_device_ip(suffix: &[u32], value: &Value) -> Option<(String, String)> {
    let link = LinkAddress::from_oid_suffix(suffix)?;
    let ip = value.as_text()?;
    if ip == NULL_IP || ip.is_empty() {
        return None;
    }
    Some((link.into_string(), ip))
}

/// Access-point link-address → name, taken verbatim from the octet payload.
fn decode_ap_name(suffix: &[u32], value: &Value) -> Option<(String, String)> {
    let link = LinkAddress::from_oid_suffix(suffix)?;
    let name = String::from_utf8_lossy(value.as_bytes()?).into_owned();
    Some((link.into_string(), name))
}

/// Device link-address → owning access-point link-address.
fn decode_device_ap(suffix: &[u32], value: &Value) -> Option<(String, String)> {
    let device = LinkAddress::from_oid_suffix(suffix)?;
    let ap = LinkAddress::from_bytes(value.as_bytes()?)?;
    if ap.is_zero() {
        return None;
    }
    Some((device.into_string(), ap.into_string()))
}

// ── Extraction ──────────────────────────────────────────────────────

/// Walk `kind`'s subtree on one controller and decode the result.
///
/// Never fails: transport errors yield a failed extract that still
/// counts toward the round.
pub async fn extract<C: WalkClient>(client: &C, kind: RecordKind, round: u64) -> Extract {
    let controller = client.target();
    let Some(source) = kind.source() else {
        return Extract::failed(controller, kind, round, format!("{kind} is not queryable"));
    };

    match client.walk(&source.root()).await {
        Ok(rows) => {
            let (entries, skipped) = source.decode_rows(&rows);
            debug!(
                %controller,
                %kind,
                round,
                rows = rows.len(),
                entries = entries.len(),
                skipped,
                "extracted records"
            );
            Extract::ok(controller, kind, round, entries)
        }
        Err(e) => {
            warn!(%controller, %kind, round, error = %e, "poll failed, counting as empty");
            Extract::failed(controller, kind, round, e.to_string())
        }
    }
}
