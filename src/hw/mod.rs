//! Hardware adapter seam.
//!
//! The supervisor talks to power-supply boards exclusively through the
//! [`HardwareAdapter`] trait. The real bus-level adapter lives outside this
//! crate; [`sim::SimAdapter`] provides a simulated implementation for
//! development and tests.

pub mod sim;

use crate::core::error::HvResult;
use std::collections::{BTreeMap, HashMap};

/// Opaque live-session identifier returned by a successful initialization.
pub type Handle = i64;

/// Raw get/set access to one physical or simulated board.
pub trait HardwareAdapter: Send + Sync {
    /// Open a session to the board at the given bus path.
    fn initialize(&self, address: &str, conet: i64, link: i64) -> HvResult<Handle>;

    /// Close a session. Closing an unknown handle is a no-op.
    fn deinitialize(&self, handle: Handle) -> HvResult<()>;

    /// Read named parameters for the given channels.
    fn get_parameters(
        &self,
        handle: Handle,
        channels: &[u16],
        names: &[&str],
    ) -> HvResult<HashMap<u16, BTreeMap<String, f64>>>;

    /// Write name/value pairs to the given channels.
    fn set_parameters(
        &self,
        handle: Handle,
        channels: &[u16],
        pairs: &[(&str, f64)],
    ) -> HvResult<()>;
}
