//! Simulated board adapter.
//!
//! The simulator keeps its board state in an explicit, shared
//! [`SimState`] object that tests inject and inspect; there is no
//! process-global state, so simulated fleets in different tests cannot
//! interfere with each other.
//!
//! Readback is deterministic: `VMon` mirrors the last written `VSet`, and
//! every other unwritten parameter reads as zero.

use crate::core::error::{HvError, HvResult};
use crate::hw::{Handle, HardwareAdapter};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Mutable state of a simulated fleet.
#[derive(Debug, Default)]
pub struct SimState {
    next_handle: Handle,
    boards: HashMap<Handle, HashMap<u16, BTreeMap<String, f64>>>,
    /// Addresses whose initialization should fail.
    pub fail_init: HashSet<String>,
    /// Fail every parameter read.
    pub fail_reads: bool,
    /// Fail every parameter write.
    pub fail_writes: bool,
    read_calls: u64,
    write_calls: u64,
}

impl SimState {
    /// Number of `get_parameters` calls that reached the hardware.
    pub fn read_calls(&self) -> u64 {
        self.read_calls
    }

    /// Number of `set_parameters` calls that reached the hardware.
    pub fn write_calls(&self) -> u64 {
        self.write_calls
    }

    /// Last written value of a parameter, if any.
    pub fn stored(&self, handle: Handle, channel: u16, name: &str) -> Option<f64> {
        self.boards
            .get(&handle)?
            .get(&channel)?
            .get(name)
            .copied()
    }

    /// Whether a session is currently open for the handle.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.boards.contains_key(&handle)
    }
}

/// Simulated hardware adapter.
#[derive(Clone)]
pub struct SimAdapter {
    state: Arc<Mutex<SimState>>,
}

impl SimAdapter {
    /// Create an adapter with a fresh, private state object.
    pub fn new() -> Self {
        Self::with_state(Arc::new(Mutex::new(SimState::default())))
    }

    /// Create an adapter over an injected state object.
    pub fn with_state(state: Arc<Mutex<SimState>>) -> Self {
        Self { state }
    }

    /// Handle to the shared state, for inspection and failure injection.
    pub fn state(&self) -> Arc<Mutex<SimState>> {
        Arc::clone(&self.state)
    }

    /// Make initialization of the given address fail.
    pub fn fail_init_for(&self, address: &str) {
        self.state.lock().fail_init.insert(address.to_string());
    }

    /// Toggle read failures.
    pub fn set_fail_reads(&self, on: bool) {
        self.state.lock().fail_reads = on;
    }

    /// Toggle write failures.
    pub fn set_fail_writes(&self, on: bool) {
        self.state.lock().fail_writes = on;
    }

    /// Number of hardware reads issued so far.
    pub fn read_calls(&self) -> u64 {
        self.state.lock().read_calls
    }

    /// Number of hardware writes issued so far.
    pub fn write_calls(&self) -> u64 {
        self.state.lock().write_calls
    }
}

impl Default for SimAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareAdapter for SimAdapter {
    fn initialize(&self, address: &str, _conet: i64, _link: i64) -> HvResult<Handle> {
        let mut state = self.state.lock();
        if state.fail_init.contains(address) {
            return Err(HvError::adapter(format!(
                "simulated init failure for board {address}"
            )));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.boards.insert(handle, HashMap::new());
        Ok(handle)
    }

    fn deinitialize(&self, handle: Handle) -> HvResult<()> {
        self.state.lock().boards.remove(&handle);
        Ok(())
    }

    fn get_parameters(
        &self,
        handle: Handle,
        channels: &[u16],
        names: &[&str],
    ) -> HvResult<HashMap<u16, BTreeMap<String, f64>>> {
        let mut state = self.state.lock();
        if state.fail_reads {
            return Err(HvError::adapter("simulated read failure"));
        }
        if !state.boards.contains_key(&handle) {
            return Err(HvError::adapter(format!("unknown handle {handle}")));
        }
        state.read_calls += 1;

        let board = &state.boards[&handle];
        let mut out = HashMap::new();
        for &channel in channels {
            let stored = board.get(&channel);
            let mut values = BTreeMap::new();
            for &name in names {
                let value = match name {
                    "VMon" => stored.and_then(|s| s.get("VSet")).copied().unwrap_or(0.0),
                    _ => stored.and_then(|s| s.get(name)).copied().unwrap_or(0.0),
                };
                values.insert(name.to_string(), value);
            }
            out.insert(channel, values);
        }
        Ok(out)
    }

    fn set_parameters(
        &self,
        handle: Handle,
        channels: &[u16],
        pairs: &[(&str, f64)],
    ) -> HvResult<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(HvError::adapter("simulated write failure"));
        }
        if !state.boards.contains_key(&handle) {
            return Err(HvError::adapter(format!("unknown handle {handle}")));
        }
        state.write_calls += 1;
        let board = state
            .boards
            .get_mut(&handle)
            .ok_or_else(|| HvError::adapter(format!("unknown handle {handle}")))?;
        for &channel in channels {
            let slot = board.entry(channel).or_default();
            for (name, value) in pairs {
                slot.insert(name.to_string(), *value);
            }
        }
        Ok(())
    }
}
