//! Runtime configuration for the supervision core.
//!
//! These are cold-path knobs; they are read at construction and never on the
//! event path. Defaults reproduce the exchange conventions the core was
//! written against (4-digit volume rounding, +/-2% pending-order band).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Expiration (seconds) applied to each primitive a composory intent
    /// sends. Resends keep using the same window.
    pub composory_expire_secs: i64,

    /// Digits every volume sum/difference is rounded to. Keeps repeated
    /// subtraction from drifting below zero.
    pub volume_ndigits: u32,

    /// A pending close above `current * pending_band_up` cannot rest on the
    /// book for a long-direction close; the take-profit manager holds it
    /// back until price moves into range.
    pub pending_band_up: Decimal,

    /// Lower bound factor for short-direction pending closes.
    pub pending_band_down: Decimal,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            composory_expire_secs: 5,
            volume_ndigits: 4,
            pending_band_up: dec!(1.02),
            pending_band_down: dec!(0.98),
        }
    }
}

impl SupervisorConfig {
    /// Reject configurations that would make supervision loop or stall.
    pub fn validate(&self) -> Result<(), String> {
        if self.composory_expire_secs <= 0 {
            return Err(format!(
                "composory_expire_secs must be positive, got {}",
                self.composory_expire_secs
            ));
        }
        if self.volume_ndigits > 12 {
            return Err(format!(
                "volume_ndigits {} exceeds Decimal precision headroom",
                self.volume_ndigits
            ));
        }
        if self.pending_band_up < Decimal::ONE {
            return Err(format!(
                "pending_band_up must be >= 1, got {}",
                self.pending_band_up
            ));
        }
        if self.pending_band_down > Decimal::ONE || self.pending_band_down <= Decimal::ZERO {
            return Err(format!(
                "pending_band_down must be in (0, 1], got {}",
                self.pending_band_down
            ));
        }
        Ok(())
    }

    /// Round a volume to the configured digits.
    pub fn round_volume(&self, volume: Decimal) -> Decimal {
        volume.round_dp(self.volume_ndigits)
    }
}
