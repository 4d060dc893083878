//! The transient iteration loop.
//!
//! Each step is an explicit two-phase update: the flux pass fills `qtotal`
//! from previous-iteration state; only after the whole pass has finished
//! does the update pass fold `qtotal` into `wtd`. The outer driver
//! repeats the step to the configured iteration count, snapshotting `wtd`
//! through the external sink at a fixed cadence and once after the loop.

use tracing::{debug, info, warn};

use crate::arena::FieldArena;
use crate::config::TransientParams;
use crate::error::WtmError;
use crate::flux::compute_fluxes;
use crate::geometry::CellGeometry;
use crate::io::FieldSink;

/// Aggregate diagnostics of one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepDiagnostics {
    /// Sum of the applied depth changes over all updated cells.
    /// Reported every iteration; drives termination only when a
    /// convergence threshold is configured.
    pub total_changes: f64,
    pub max_wtd: f32,
    pub min_wtd: f32,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    pub iterations_run: u64,
    pub checkpoints_written: u64,
    /// True when the optional convergence threshold stopped the loop early.
    pub converged: bool,
    pub last: StepDiagnostics,
}

/// The transient water-table model: arena, per-row geometry, parameters.
pub struct TransientModel {
    pub params: TransientParams,
    pub geometry: CellGeometry,
    pub arena: FieldArena,
}

impl TransientModel {
    /// Validate `params` and derive the per-row geometry for the arena's
    /// grid. The arena must already be loaded and sanitised.
    pub fn new(params: TransientParams, arena: FieldArena) -> Result<Self, WtmError> {
        params.validate()?;
        let geometry = CellGeometry::derive(
            params.cells_per_degree,
            params.southern_edge_deg,
            arena.height(),
        );
        Ok(Self {
            params,
            geometry,
            arena,
        })
    }

    /// Advance the model by one timestep: flux pass, barrier, update pass.
    pub fn step(&mut self) -> StepDiagnostics {
        let flux = compute_fluxes(&mut self.arena, &self.geometry, self.params.deltat_seconds);
        let total_changes = apply_updates(&mut self.arena);
        StepDiagnostics {
            total_changes,
            max_wtd: flux.max_wtd,
            min_wtd: flux.min_wtd,
        }
    }

    /// Run the outer loop: `iterations` steps with a wtd snapshot every
    /// `checkpoint_interval` iterations (including iteration 0) and a final
    /// snapshot after the loop.
    ///
    /// A failed periodic checkpoint is logged and skipped; the in-memory
    /// state stays valid. Only the final save's failure is returned.
    pub fn run(&mut self, sink: &mut dyn FieldSink) -> Result<RunSummary, WtmError> {
        let key = self.params.output_key();
        let mut last = StepDiagnostics::default();
        let mut checkpoints_written = 0u64;
        let mut iterations_run = 0u64;
        let mut converged = false;

        for iter in 0..self.params.iterations {
            if iter % self.params.checkpoint_interval == 0 {
                match sink.save_field(&self.arena.wtd, &key) {
                    Ok(()) => {
                        checkpoints_written += 1;
                        info!(iteration = iter, key = %key, "wrote wtd checkpoint");
                    }
                    Err(err) => {
                        warn!(iteration = iter, %err, "checkpoint write failed, continuing");
                    }
                }
            }

            last = self.step();
            iterations_run = iter + 1;
            debug!(
                iteration = iter,
                total_changes = last.total_changes,
                max_wtd = last.max_wtd,
                min_wtd = last.min_wtd,
                "step complete"
            );

            if let Some(threshold) = self.params.convergence_threshold {
                if last.total_changes.abs() < threshold {
                    info!(
                        iteration = iter,
                        total_changes = last.total_changes,
                        threshold,
                        "total change below threshold, stopping early"
                    );
                    converged = true;
                    break;
                }
            }
        }

        sink.save_field(&self.arena.wtd, &key)?;
        checkpoints_written += 1;
        info!(
            iterations_run,
            checkpoints_written, converged, "transient run finished"
        );

        Ok(RunSummary {
            iterations_run,
            checkpoints_written,
            converged,
            last,
        })
    }
}

/// Fold `qtotal` into `wtd` for every interior cell with nonzero ksat.
/// Returns the summed change. Writes are per-cell disjoint, so rows run in
/// parallel under the `threading` feature.
fn apply_updates(arena: &mut FieldArena) -> f64 {
    let width = arena.width();
    let height = arena.height();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let mut wtd = std::mem::take(&mut arena.wtd);
    let total_changes;
    {
        let fields = &*arena;
        let interior = &mut wtd.data[width..width * (height - 1)];

        #[cfg(feature = "threading")]
        {
            use rayon::prelude::*;
            total_changes = interior
                .par_chunks_mut(width)
                .enumerate()
                .map(|(i, row)| update_row(fields, i + 1, row))
                .sum();
        }
        #[cfg(not(feature = "threading"))]
        {
            total_changes = interior
                .chunks_mut(width)
                .enumerate()
                .map(|(i, row)| update_row(fields, i + 1, row))
                .sum();
        }
    }
    arena.wtd = wtd;
    total_changes
}

/// Apply one row of updates; `row` is that row of `wtd`.
fn update_row(fields: &FieldArena, y: usize, row: &mut [f32]) -> f64 {
    let mut changed = 0.0f64;
    for x in 1..fields.width() - 1 {
        if fields.ksat.get(x, y) == 0.0 {
            continue;
        }
        let q = fields.qtotal.get(x, y);
        row[x] += q;
        changed += q as f64;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field2D;
    use crate::io::MemoryStore;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const DELTAT: f64 = 2_629_746.0;

    fn flat_params(iterations: u64) -> TransientParams {
        TransientParams {
            // Mid-latitude domain: row areas differ enough that paired
            // fluxes do not cancel to below f32 resolution.
            southern_edge_deg: 45.0,
            deltat_seconds: DELTAT,
            iterations,
            checkpoint_interval: 10,
            ..TransientParams::default()
        }
    }

    fn flat_arena(w: usize, h: usize) -> FieldArena {
        let mut arena = FieldArena::new(w, h);
        arena.ksat = Field2D::filled(w, h, 1e-5);
        arena.fdepth = Field2D::filled(w, h, 10.0);
        arena.land_mask = Field2D::filled(w, h, 1.0);
        arena
    }

    /// Sink that fails its first `fail_first` saves, then counts the rest.
    #[derive(Default)]
    struct FlakySink {
        fail_first: usize,
        calls: usize,
        saved: Vec<Field2D>,
    }

    impl FieldSink for FlakySink {
        fn save_field(&mut self, field: &Field2D, _key: &str) -> Result<(), WtmError> {
            self.calls += 1;
            if self.calls <= self.fail_first {
                return Err(WtmError::Io(std::io::Error::other("disk full")));
            }
            self.saved.push(field.clone());
            Ok(())
        }
    }

    #[test]
    fn flat_grid_stays_at_rest() {
        let mut model = TransientModel::new(flat_params(1), flat_arena(5, 5)).unwrap();
        let diag = model.step();
        assert_eq!(diag.total_changes, 0.0);
        assert!(model.arena.wtd.data.iter().all(|&v| v == 0.0));
        assert!(model.arena.qtotal.data.iter().all(|&q| q == 0.0));
    }

    #[test]
    fn raised_centre_loses_exactly_its_flux() {
        let mut arena = flat_arena(5, 5);
        arena.topo.set(2, 2, 10.0);
        let mut model = TransientModel::new(flat_params(1), arena).unwrap();
        let diag = model.step();

        let q_centre = model.arena.qtotal.get(2, 2);
        assert!(q_centre < 0.0, "centre must drain, qtotal = {q_centre}");
        assert_eq!(
            model.arena.wtd.get(2, 2),
            q_centre,
            "single-step update must equal the normalized flux"
        );
        assert!(model.arena.wtd.get(2, 1) > 0.0, "neighbour must receive inflow");
        // Outflow shows up in the diagnostics extrema on the next pass.
        let diag2 = model.step();
        assert!(diag2.min_wtd < 0.0);
        assert!(diag.total_changes.abs() > 0.0);
    }

    #[test]
    fn total_changes_matches_qtotal_sum() {
        let mut arena = flat_arena(8, 6);
        let mut rng = StdRng::seed_from_u64(7);
        for y in 0..6 {
            for x in 0..8 {
                arena.topo.set(x, y, rng.gen_range(0.0..30.0));
                arena.wtd.set(x, y, rng.gen_range(-5.0..0.0));
            }
        }
        arena.ksat.set(3, 2, 0.0); // one inert cell
        let mut model = TransientModel::new(flat_params(1), arena).unwrap();
        let diag = model.step();

        let mut expected = 0.0f64;
        for y in 1..5 {
            for x in 1..7 {
                if model.arena.ksat.get(x, y) != 0.0 {
                    expected += model.arena.qtotal.get(x, y) as f64;
                }
            }
        }
        assert!(
            (diag.total_changes - expected).abs() < 1e-12,
            "total_changes {} != qtotal sum {}",
            diag.total_changes,
            expected
        );
    }

    #[test]
    fn zero_ksat_cells_are_never_updated() {
        let mut arena = flat_arena(5, 5);
        arena.topo.set(2, 2, 10.0);
        arena.ksat.set(2, 1, 0.0);
        let mut model = TransientModel::new(flat_params(1), arena).unwrap();
        model.step();
        // Flux into the cell was computed (neighbouring conductivity is
        // nonzero) but the update must skip it.
        assert!(model.arena.qtotal.get(2, 1) != 0.0);
        assert_eq!(model.arena.wtd.get(2, 1), 0.0);
    }

    #[test]
    fn border_survives_many_random_steps() {
        let mut arena = flat_arena(9, 7);
        let mut rng = StdRng::seed_from_u64(99);
        for y in 0..7 {
            for x in 0..9 {
                arena.topo.set(x, y, rng.gen_range(0.0..100.0));
                arena.fdepth.set(x, y, rng.gen_range(-2.0..40.0));
                arena.ksat.set(x, y, rng.gen_range(0.0..1e-4));
            }
        }
        let mut model = TransientModel::new(flat_params(1), arena).unwrap();
        for _ in 0..25 {
            model.step();
        }
        let wtd = &model.arena.wtd;
        for x in 0..9 {
            assert_eq!(wtd.get(x, 0), 0.0, "south border touched at x={x}");
            assert_eq!(wtd.get(x, 6), 0.0, "north border touched at x={x}");
        }
        for y in 0..7 {
            assert_eq!(wtd.get(0, y), 0.0, "west border touched at y={y}");
            assert_eq!(wtd.get(8, y), 0.0, "east border touched at y={y}");
        }
    }

    #[test]
    fn checkpoints_follow_the_configured_cadence() {
        let mut arena = flat_arena(5, 5);
        arena.topo.set(2, 2, 10.0);
        let mut model = TransientModel::new(flat_params(25), arena).unwrap();
        let mut sink = MemoryStore::new();
        let summary = model.run(&mut sink).unwrap();
        // Saves at iterations 0, 10, 20, plus the final one.
        assert_eq!(summary.checkpoints_written, 4);
        assert_eq!(summary.iterations_run, 25);
        assert!(!summary.converged);
        assert!(sink.get(&model.params.output_key()).is_some());
    }

    #[test]
    fn convergence_threshold_stops_early() {
        let params = TransientParams {
            convergence_threshold: Some(1e-9),
            ..flat_params(1000)
        };
        // Flat grid: total change is exactly 0 from the first step.
        let mut model = TransientModel::new(params, flat_arena(5, 5)).unwrap();
        let mut sink = MemoryStore::new();
        let summary = model.run(&mut sink).unwrap();
        assert!(summary.converged);
        assert_eq!(summary.iterations_run, 1);
    }

    #[test]
    fn failed_periodic_checkpoint_is_not_fatal() {
        let mut arena = flat_arena(5, 5);
        arena.topo.set(2, 2, 10.0);
        let mut model = TransientModel::new(flat_params(5), arena).unwrap();
        // First save (iteration 0) fails; the final save succeeds.
        let mut sink = FlakySink {
            fail_first: 1,
            ..FlakySink::default()
        };
        let summary = model.run(&mut sink).unwrap();
        assert_eq!(summary.iterations_run, 5);
        assert_eq!(summary.checkpoints_written, 1);
        assert_eq!(sink.saved.len(), 1);
    }

    #[test]
    fn final_save_failure_is_returned() {
        let mut model = TransientModel::new(flat_params(1), flat_arena(5, 5)).unwrap();
        let mut sink = FlakySink {
            fail_first: 99,
            ..FlakySink::default()
        };
        assert!(model.run(&mut sink).is_err());
    }

    #[test]
    fn invalid_params_rejected_at_construction() {
        let params = TransientParams {
            cells_per_degree: -1.0,
            ..TransientParams::default()
        };
        assert!(TransientModel::new(params, flat_arena(5, 5)).is_err());
    }
}
