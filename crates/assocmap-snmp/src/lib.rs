// assocmap-snmp: async SNMP v2c walk client for wireless LAN controllers

use std::future::Future;

pub mod error;
pub mod oid;
pub mod session;

pub use error::Error;
pub use oid::{Oid, Value, Varbind};
pub use session::{Session, SessionOptions};

/// A management-protocol client able to walk a subtree on one controller.
///
/// Implemented by [`Session`] for real controllers; the collection
/// pipeline is generic over it so tests can substitute scripted agents.
pub trait WalkClient: Send + Sync + 'static {
    /// The controller address this client talks to.
    fn target(&self) -> &str;

    /// Return every row below `root`, in agent order.
    fn walk(&self, root: &Oid) -> impl Future<Output = Result<Vec<Varbind>, Error>> + Send;

    /// Release the underlying connection. Later walks fail with
    /// [`Error::Closed`].
    fn close(&self) -> impl Future<Output = ()> + Send;
}
