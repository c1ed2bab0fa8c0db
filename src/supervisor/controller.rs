//! Voltage/ramp controller.
//!
//! Translates fleet- or layer-scoped intent into per-channel parameter
//! writes. The target voltage is the layer default scaled by the caller's
//! multiplier; ramp rates are scaled by the layer's default voltage
//! relative to the fleet maximum, which keeps time-to-target roughly
//! uniform across layers with very different nominal voltages.

use crate::core::error::{HvError, HvResult};
use crate::supervisor::{params, Supervisor};
use tracing::info;

/// Fast-discharge ramp-down rate used on power-down, V/s.
const FAST_DISCHARGE_RATE: f64 = 100.0;

/// Lowest accepted voltage multiplier.
pub const MULTIPLIER_MIN: f64 = 0.0;
/// Highest accepted voltage multiplier; above 1.0 for overvoltage tests.
pub const MULTIPLIER_MAX: f64 = 1.2;

impl Supervisor {
    /// Set every selected channel to `multiplier` times its layer default
    /// voltage, scale its ramp rates, then power the selection up.
    ///
    /// `layer = None` selects the whole fleet. Multipliers outside
    /// [0, 1.2] are rejected before any parameter is written.
    pub fn set_voltage(&self, layer: Option<i64>, multiplier: f64) -> HvResult<()> {
        if !multiplier.is_finite() || !(MULTIPLIER_MIN..=MULTIPLIER_MAX).contains(&multiplier) {
            return Err(HvError::MultiplierOutOfRange { value: multiplier });
        }

        for (board, channel) in self.selected_channels(layer)? {
            let v_def = self.profile.default_voltage(channel.layer);
            let target = v_def * multiplier;
            let speed_mod = self.profile.layer_speed_mod(channel.layer);
            let ramp_up = (self.base_ramp_up * speed_mod).round();
            let ramp_down = (self.base_ramp_down * speed_mod).round();
            self.write_parameters(
                &board.address,
                channel.channel,
                &[
                    (params::VSET, target),
                    (params::RUP, ramp_up),
                    (params::RDWN, ramp_down),
                ],
            )?;
        }
        info!(?layer, multiplier, "voltage targets written");

        self.power_up(layer)
    }

    /// Power the selected channels down: zero the setpoint, switch power
    /// off, and discharge fast. The write-through read-back leaves the
    /// cache reflecting the off state immediately.
    pub fn power_down(&self, layer: Option<i64>) -> HvResult<()> {
        for (board, channel) in self.selected_channels(layer)? {
            self.write_parameters(
                &board.address,
                channel.channel,
                &[
                    (params::VSET, 0.0),
                    (params::PW, 0.0),
                    (params::RDWN, FAST_DISCHARGE_RATE),
                ],
            )?;
        }
        info!(?layer, "powered down");
        Ok(())
    }

    /// Power the selected channels up.
    pub fn power_up(&self, layer: Option<i64>) -> HvResult<()> {
        for (board, channel) in self.selected_channels(layer)? {
            self.write_parameters(&board.address, channel.channel, &[(params::PW, 1.0)])?;
        }
        info!(?layer, "powered up");
        Ok(())
    }
}
