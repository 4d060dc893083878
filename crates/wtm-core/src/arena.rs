//! The arena of simulation fields.
//!
//! All fields share one W×H shape, fixed by the first loaded field (ksat).
//! `wtd` is the only field whose state persists across iterations; `qtotal`
//! is scratch, fully rewritten by every flux pass.

use tracing::debug;

use crate::config::TransientParams;
use crate::error::WtmError;
use crate::field::Field2D;
use crate::io::FieldSource;

/// No-data sentinel for topography inputs. Values at or below this are
/// coerced to 0 during initialisation.
pub const NODATA: f32 = -1.0e7;

/// Flat arena of fixed-size fields indexed by (x, y).
#[derive(Debug, Clone)]
pub struct FieldArena {
    /// Land-surface elevation, metres.
    pub topo: Field2D,
    /// Water-table depth relative to the surface, metres; negative = below.
    pub wtd: Field2D,
    /// Saturated hydraulic conductivity at the surface.
    pub ksat: Field2D,
    /// E-folding depth of the conductivity decay; ≤ 0 means impermeable.
    pub fdepth: Field2D,
    /// Raw precipitation input.
    pub precip: Field2D,
    /// Raw evaporation input.
    pub evap: Field2D,
    /// Recharge per cell per timestep, derived from precip and evap.
    pub rech: Field2D,
    /// 0 marks cells excluded from flow (ocean / no-data).
    pub land_mask: Field2D,
    /// Net normalized flux per cell, rewritten every iteration.
    pub qtotal: Field2D,
}

impl FieldArena {
    /// All-zero arena of the given shape. Used by tests and by callers that
    /// fill fields programmatically.
    pub fn new(width: usize, height: usize) -> Self {
        let z = || Field2D::zeros(width, height);
        Self {
            topo: z(),
            wtd: z(),
            ksat: z(),
            fdepth: z(),
            precip: z(),
            evap: z(),
            rech: z(),
            land_mask: z(),
            qtotal: z(),
        }
    }

    /// Load and initialise every input field from `source`.
    ///
    /// The ksat field is loaded first and fixes the grid shape; any later
    /// field with a different shape aborts setup. After loading, topography
    /// is sanitised and recharge is derived, so the arena is ready for the
    /// iteration loop.
    pub fn load(source: &dyn FieldSource, params: &TransientParams) -> Result<Self, WtmError> {
        let ksat = source.load_field(&params.ksat_key())?;
        let shape = ksat.shape();
        debug!(width = shape.0, height = shape.1, "grid shape fixed by ksat");

        let load_checked = |key: String| -> Result<Field2D, WtmError> {
            let field = source.load_field(&key)?;
            if field.shape() != shape {
                return Err(WtmError::ShapeMismatch {
                    key,
                    expected: shape,
                    found: field.shape(),
                });
            }
            Ok(field)
        };

        let land_mask = load_checked(params.mask_key())?;
        let fdepth = load_checked(params.fdepth_key())?;
        let precip = load_checked(params.precip_key())?;
        let topo = load_checked(params.topo_key())?;
        let evap = load_checked(params.evap_key())?;

        let mut arena = Self {
            wtd: Field2D::like(&topo, 0.0),
            rech: Field2D::like(&topo, 0.0),
            qtotal: Field2D::like(&topo, 0.0),
            topo,
            ksat,
            fdepth,
            precip,
            evap,
            land_mask,
        };
        arena.sanitize_topography();
        arena.derive_recharge(params.evap_scale, params.rech_divisor);
        Ok(arena)
    }

    pub fn width(&self) -> usize {
        self.topo.width
    }

    pub fn height(&self) -> usize {
        self.topo.height
    }

    /// Coerce no-data topography values to 0.
    pub fn sanitize_topography(&mut self) {
        for v in &mut self.topo.data {
            if *v <= NODATA {
                *v = 0.0;
            }
        }
    }

    /// Derive per-timestep recharge: scale evaporation, subtract it from
    /// precipitation, clamp at zero, then convert to timestep units.
    pub fn derive_recharge(&mut self, evap_scale: f64, rech_divisor: f64) {
        for i in 0..self.rech.data.len() {
            let p = self.precip.data[i] as f64;
            let e = self.evap.data[i] as f64 * evap_scale;
            self.rech.data[i] = ((p - e).max(0.0) / rech_divisor) as f32;
        }
    }
}
