//! Per-iteration lateral flux pass.
//!
//! For every interior cell carrying land, exchange with the four orthogonal
//! neighbours is driven by head differences (head = topo + wtd + rech) and
//! the mean of the two cells' conductivities, then normalized by timestep,
//! travel distance, and receiving-cell area into a water-table depth change.
//!
//! The pass only reads previous-iteration state and writes disjoint `qtotal`
//! rows, so rows run in parallel under the `threading` feature. Border cells
//! and masked cells are never written; masked cells keep their prior
//! `qtotal`, which is 0 for a freshly allocated arena.

use crate::arena::FieldArena;
use crate::conductivity::kcell;
use crate::geometry::CellGeometry;

/// Water-table depth extrema observed across the cells processed by one
/// flux pass. Diagnostics only; never used for control flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct FluxSummary {
    pub max_wtd: f32,
    pub min_wtd: f32,
}

impl FluxSummary {
    fn merge(self, other: FluxSummary) -> FluxSummary {
        FluxSummary {
            max_wtd: self.max_wtd.max(other.max_wtd),
            min_wtd: self.min_wtd.min(other.min_wtd),
        }
    }
}

/// Compute net normalized flux into `arena.qtotal` for every interior,
/// land-masked cell. Grids narrower than 3 cells have no interior and are a
/// no-op.
pub fn compute_fluxes(
    arena: &mut FieldArena,
    geom: &CellGeometry,
    deltat_seconds: f64,
) -> FluxSummary {
    let width = arena.width();
    let height = arena.height();
    debug_assert_eq!(geom.height(), height, "geometry rows must match the grid");

    if width < 3 || height < 3 {
        return FluxSummary::default();
    }

    let mut qtotal = std::mem::take(&mut arena.qtotal);
    let summary;
    {
        let fields = &*arena;
        // Rows 1..height−1; each chunk is one full row of qtotal.
        let interior = &mut qtotal.data[width..width * (height - 1)];

        #[cfg(feature = "threading")]
        {
            use rayon::prelude::*;
            summary = interior
                .par_chunks_mut(width)
                .enumerate()
                .map(|(i, row)| flux_row(fields, geom, deltat_seconds, i + 1, row))
                .reduce(FluxSummary::default, FluxSummary::merge);
        }
        #[cfg(not(feature = "threading"))]
        {
            summary = interior
                .chunks_mut(width)
                .enumerate()
                .map(|(i, row)| flux_row(fields, geom, deltat_seconds, i + 1, row))
                .fold(FluxSummary::default(), FluxSummary::merge);
        }
    }
    arena.qtotal = qtotal;
    summary
}

/// Flux computation for one interior row y; `row` is that row of `qtotal`.
fn flux_row(
    fields: &FieldArena,
    geom: &CellGeometry,
    deltat_seconds: f64,
    y: usize,
    row: &mut [f32],
) -> FluxSummary {
    let width = fields.width();
    let mut summary = FluxSummary::default();

    let head = |x: usize, y: usize| {
        fields.topo.get(x, y) as f64 + fields.wtd.get(x, y) as f64 + fields.rech.get(x, y) as f64
    };

    for x in 1..width - 1 {
        if fields.land_mask.get(x, y) == 0.0 {
            continue;
        }

        let my_head = head(x, y);
        let head_n = head(x, y + 1);
        let head_s = head(x, y - 1);
        let head_e = head(x + 1, y);
        let head_w = head(x - 1, y);

        let my_kcell = kcell(fields, x, y);
        let kcell_n = kcell(fields, x, y + 1);
        let kcell_s = kcell(fields, x, y - 1);
        let kcell_e = kcell(fields, x + 1, y);
        let kcell_w = kcell(fields, x - 1, y);

        // Discharge per unit area in each direction; positive = inflow.
        let mut q_n = 0.5 * (kcell_n + my_kcell) * (head_n - my_head);
        let mut q_s = 0.5 * (kcell_s + my_kcell) * (head_s - my_head);
        let mut q_e = 0.5 * (kcell_e + my_kcell) * (head_e - my_head);
        let mut q_w = 0.5 * (kcell_w + my_kcell) * (head_w - my_head);

        // Multiply by the seconds water moves, divide by the distance it
        // travels, divide by the area of the cell it flows into. Meridional
        // spacing is constant; zonal distance and areas vary by row.
        q_n = q_n * deltat_seconds / geom.cellsize_n_s_metres / geom.cell_area[y + 1];
        q_s = q_s * deltat_seconds / geom.cellsize_n_s_metres / geom.cell_area[y - 1];
        q_e = q_e * deltat_seconds / geom.cellsize_e_w_metres[y] / geom.cell_area[y];
        q_w = q_w * deltat_seconds / geom.cellsize_e_w_metres[y] / geom.cell_area[y];

        row[x] = (q_n + q_s + q_e + q_w) as f32;

        let wtd = fields.wtd.get(x, y);
        if wtd > summary.max_wtd {
            summary.max_wtd = wtd;
        } else if wtd < summary.min_wtd {
            summary.min_wtd = wtd;
        }
    }
    summary
}
