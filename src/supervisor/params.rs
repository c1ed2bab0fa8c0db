//! Canonical channel parameter names.
//!
//! The cache and refresh policy treat parameters as an open name-to-value
//! mapping; only the names used by the ramp controller are referenced
//! individually. `RDWn` is the canonical ramp-down spelling accepted by the
//! board firmware.

/// Voltage setpoint.
pub const VSET: &str = "VSet";
/// Current setpoint.
pub const ISET: &str = "ISet";
/// Power state (0 = off, 1 = on).
pub const PW: &str = "Pw";
/// Trip current.
pub const TRIP: &str = "Trip";
/// Ramp-up rate, V/s.
pub const RUP: &str = "RUp";
/// Ramp-down rate, V/s.
pub const RDWN: &str = "RDWn";
/// Power-down mode flag.
pub const PDWN: &str = "PDwn";
/// Current monitor range selector (0 = high, 1 = low).
pub const IMON_RANGE: &str = "ImonRange";

/// Synthetic parameter reported by fleet queries: the channel's layer
/// default voltage. Never written to hardware or cached.
pub const VDEF: &str = "VDef";

/// The fixed parameter set read from and cached for every channel.
pub const PAR_NAMES: [&str; 15] = [
    "VSet",
    "ISet",
    "VMon",
    "IMonH",
    "Pw",
    "ChStatus",
    "Trip",
    "SVMax",
    "RDWn",
    "RUp",
    "PDwn",
    "Polarity",
    "Temp",
    "ImonRange",
    "IMonL",
];

/// Check whether a name belongs to the fixed parameter set.
pub fn is_known(name: &str) -> bool {
    PAR_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_names_are_in_the_fixed_set() {
        for name in [VSET, ISET, PW, TRIP, RUP, RDWN, PDWN, IMON_RANGE] {
            assert!(is_known(name), "{name} missing from PAR_NAMES");
        }
        assert!(!is_known(VDEF));
        assert!(!is_known("RDown"));
    }
}
