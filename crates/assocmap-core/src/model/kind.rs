// ── Record kinds ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The four mappings the snapshot holds.
///
/// `DeviceAssoc`, `ApAssoc` and `Join` are collected from controllers;
/// `ControllerOf` is derived while `ApAssoc` accumulates and is never
/// requested on its own.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    /// Device link-address → device IP address.
    DeviceAssoc,
    /// Access-point link-address → access-point name.
    ApAssoc,
    /// Access-point name → space-separated device IP addresses.
    Join,
    /// Access-point name → address of the controller that reported it.
    ControllerOf,
}

impl RecordKind {
    /// Kinds the periodic driver requests every interval. `Join` follows
    /// automatically once `DeviceAssoc` completes.
    pub const SCHEDULED: [Self; 2] = [Self::ApAssoc, Self::DeviceAssoc];

    /// `true` for kinds only ever produced as a side effect of another.
    pub fn is_derived(self) -> bool {
        matches!(self, Self::ControllerOf)
    }
}
