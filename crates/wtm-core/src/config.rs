//! Run parameters for a transient simulation.
//!
//! Defaults reproduce the reference run: 30 arc-second cells
//! (120 per degree), 500 000 iterations, a checkpoint every 10 000.

use serde::{Deserialize, Serialize};

use crate::error::WtmError;

/// Parameter bundle consumed by the solver. Opaque identifiers (`region`,
/// `time_start`) only locate input fields; they never enter the numerics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientParams {
    /// Grid resolution in cells per degree of latitude/longitude.
    pub cells_per_degree: f64,
    /// Latitude of the southern edge of the domain, degrees.
    pub southern_edge_deg: f64,
    /// Timestep length in seconds.
    pub deltat_seconds: f64,
    /// Total iteration count for the outer loop.
    pub iterations: u64,
    /// Checkpoint the wtd field every this many iterations.
    pub checkpoint_interval: u64,
    /// Region identifier used in input field keys.
    pub region: String,
    /// Time-slice identifier used in input field keys.
    pub time_start: String,
    /// Divisor converting recharge input to per-timestep units.
    /// The reference run assumes monthly steps (12 per year).
    pub rech_divisor: f64,
    /// Scale factor applied to the raw evaporation field before the
    /// recharge subtraction (unit conversion).
    pub evap_scale: f64,
    /// When set, stop early once |total change| per iteration drops below
    /// this threshold. `None` runs the full fixed iteration count.
    pub convergence_threshold: Option<f64>,
}

impl Default for TransientParams {
    fn default() -> Self {
        Self {
            cells_per_degree: 120.0,
            southern_edge_deg: 0.0,
            deltat_seconds: 2_629_746.0, // one month
            iterations: 500_000,
            checkpoint_interval: 10_000,
            region: "region".to_string(),
            time_start: "start".to_string(),
            rech_divisor: 12.0,
            evap_scale: 0.01,
            convergence_threshold: None,
        }
    }
}

impl TransientParams {
    /// Check the bundle before any field is loaded.
    pub fn validate(&self) -> Result<(), WtmError> {
        if !(self.cells_per_degree > 0.0) {
            return Err(WtmError::Config(format!(
                "cells_per_degree must be positive, got {}",
                self.cells_per_degree
            )));
        }
        if !(self.deltat_seconds > 0.0) {
            return Err(WtmError::Config(format!(
                "deltat_seconds must be positive, got {}",
                self.deltat_seconds
            )));
        }
        if self.checkpoint_interval == 0 {
            return Err(WtmError::Config(
                "checkpoint_interval must be at least 1".to_string(),
            ));
        }
        if !(self.rech_divisor > 0.0) {
            return Err(WtmError::Config(format!(
                "rech_divisor must be positive, got {}",
                self.rech_divisor
            )));
        }
        Ok(())
    }

    // ── Source/destination keys ──────────────────────────────────────────

    pub fn ksat_key(&self) -> String {
        format!("{}_ksat", self.region)
    }

    pub fn mask_key(&self) -> String {
        format!("{}_mask", self.region)
    }

    pub fn evap_key(&self) -> String {
        format!("{}_evap", self.region)
    }

    pub fn fdepth_key(&self) -> String {
        format!("{}_fslope", self.time_start)
    }

    pub fn precip_key(&self) -> String {
        format!("{}_rech", self.time_start)
    }

    pub fn topo_key(&self) -> String {
        format!("{}_topo", self.time_start)
    }

    /// Destination key for wtd snapshots (periodic and final).
    pub fn output_key(&self) -> String {
        format!("{}_wtd_transient", self.region)
    }
}
