//! Transient water-table model: explicit lateral groundwater flow on a
//! latitude/longitude grid.
//!
//! Pipeline per run: load fields into a [`FieldArena`] → derive
//! [`CellGeometry`] once → iterate [`TransientModel::step`] (flux pass,
//! barrier, update pass) to the configured count, checkpointing `wtd`
//! through a [`FieldSink`] at a fixed cadence.
//!
//! Conductivity follows the depth-dependent law of Fan et al. (2013);
//! see [`conductivity`].

pub mod arena;
pub mod conductivity;
pub mod config;
pub mod error;
pub mod field;
pub mod flux;
pub mod geometry;
pub mod integrator;
pub mod io;

pub use arena::{FieldArena, NODATA};
pub use config::TransientParams;
pub use error::WtmError;
pub use field::Field2D;
pub use flux::{compute_fluxes, FluxSummary};
pub use geometry::{CellGeometry, EARTH_RADIUS_M};
pub use integrator::{RunSummary, StepDiagnostics, TransientModel};
pub use io::{FieldSink, FieldSource, MemoryStore};
