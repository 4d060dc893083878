//! Depth-dependent hydraulic conductivity, after Fan et al. (2013).
//!
//! Below 1.5 m depth the conductivity decays exponentially with an e-folding
//! depth `fdepth` (eq. S6); between 1.5 m and the surface it varies linearly
//! (eq. S4); above the surface it saturates at the wtd = 0 value. Must be
//! re-evaluated every iteration, since it tracks the evolving wtd.

use crate::arena::FieldArena;

/// Effective hydraulic conductivity for the given water-table depth and
/// soil parameters. `fdepth ≤ 0` marks an impermeable cell.
pub fn depth_conductivity(wtd: f64, ksat: f64, fdepth: f64) -> f64 {
    if fdepth <= 0.0 {
        return 0.0;
    }
    if wtd < -1.5 {
        fdepth * ksat * ((wtd + 1.5) / fdepth).exp()
    } else if wtd > 0.0 {
        ksat * (1.5 + fdepth)
    } else {
        ksat * (wtd + 1.5 + fdepth)
    }
}

/// Conductivity of cell (x, y) at its current water-table depth.
#[inline]
pub fn kcell(arena: &FieldArena, x: usize, y: usize) -> f64 {
    depth_conductivity(
        arena.wtd.get(x, y) as f64,
        arena.ksat.get(x, y) as f64,
        arena.fdepth.get(x, y) as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const KSAT: f64 = 1e-5;
    const FDEPTH: f64 = 10.0;

    #[test]
    fn impermeable_when_fdepth_not_positive() {
        assert_eq!(depth_conductivity(-3.0, KSAT, 0.0), 0.0);
        assert_eq!(depth_conductivity(-3.0, KSAT, -2.5), 0.0);
        assert_eq!(depth_conductivity(5.0, KSAT, 0.0), 0.0);
    }

    #[test]
    fn deep_regime_decays_exponentially() {
        let k = depth_conductivity(-11.5, KSAT, FDEPTH);
        // (wtd + 1.5)/fdepth = −1 → one e-folding below the reference value.
        assert_relative_eq!(k, FDEPTH * KSAT * (-1.0f64).exp(), max_relative = 1e-12);
    }

    #[test]
    fn above_surface_is_capped() {
        let at_surface = depth_conductivity(0.0, KSAT, FDEPTH);
        for wtd in [0.1, 1.0, 10.0, 1000.0] {
            let k = depth_conductivity(wtd, KSAT, FDEPTH);
            assert_relative_eq!(k, KSAT * (1.5 + FDEPTH), max_relative = 1e-12);
            assert_relative_eq!(k, at_surface, max_relative = 1e-12);
        }
    }

    #[test]
    fn regimes_join_continuously() {
        let eps = 1e-9;
        let deep = depth_conductivity(-1.5 - eps, KSAT, FDEPTH);
        let shallow = depth_conductivity(-1.5 + eps, KSAT, FDEPTH);
        assert!((deep - shallow).abs() < 1e-12);
        let below = depth_conductivity(-eps, KSAT, FDEPTH);
        let above = depth_conductivity(eps, KSAT, FDEPTH);
        assert!((below - above).abs() < 1e-12);
    }

    #[test]
    fn non_decreasing_as_water_table_rises() {
        let mut prev = 0.0;
        let mut wtd = -50.0;
        while wtd <= 5.0 {
            let k = depth_conductivity(wtd, KSAT, FDEPTH);
            assert!(
                k >= prev - 1e-15,
                "kcell must be non-decreasing: k({wtd}) = {k} < {prev}"
            );
            prev = k;
            wtd += 0.01;
        }
    }
}
