//! Per-row cell dimensions and areas on the spherical Earth.
//!
//! East-west distances shrink with cos(latitude); the north-south spacing is
//! latitude-independent. Cell areas use a trapezoid of the two east-west edge
//! lengths, which keeps areas correct as meridians converge toward the poles.
//! Everything here is computed once in f64 and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Per-row geometry for a latitude/longitude grid, indexed by row y.
/// Row 0 is the southern edge of the domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellGeometry {
    /// Latitude at the vertical centre of each row, radians.
    pub latitude_radians: Vec<f64>,
    /// East-west distance at the centre of each row's cells, metres.
    pub cellsize_e_w_metres: Vec<f64>,
    /// East-west distance at the northern edge of each row's cells, metres.
    pub cellsize_e_w_metres_n: Vec<f64>,
    /// East-west distance at the southern edge of each row's cells, metres.
    pub cellsize_e_w_metres_s: Vec<f64>,
    /// Cell area per row, m².
    pub cell_area: Vec<f64>,
    /// North-south spacing, metres. Constant across rows.
    pub cellsize_n_s_metres: f64,
}

impl CellGeometry {
    /// Derive the geometry for `height` rows at `cells_per_degree`
    /// resolution, starting from `southern_edge_deg`.
    pub fn derive(cells_per_degree: f64, southern_edge_deg: f64, height: usize) -> Self {
        Self::derive_with_radius(cells_per_degree, southern_edge_deg, height, EARTH_RADIUS_M)
    }

    /// Same as [`derive`](Self::derive) with an explicit sphere radius.
    pub fn derive_with_radius(
        cells_per_degree: f64,
        southern_edge_deg: f64,
        height: usize,
        radius_m: f64,
    ) -> Self {
        let cellsize_n_s_metres = radius_m * DEG_TO_RAD / cells_per_degree;

        let mut latitude_radians = Vec::with_capacity(height);
        let mut cellsize_e_w_metres = Vec::with_capacity(height);
        let mut cellsize_e_w_metres_n = Vec::with_capacity(height);
        let mut cellsize_e_w_metres_s = Vec::with_capacity(height);
        let mut cell_area = Vec::with_capacity(height);

        let e_w_at = |lat_rad: f64| radius_m * lat_rad.cos() * DEG_TO_RAD / cells_per_degree;

        for y in 0..height {
            // Latitude at the cell centre; edges sit half a cell away.
            let lat_c = (y as f64 / cells_per_degree + southern_edge_deg) * DEG_TO_RAD;
            let lat_s = ((y as f64 - 0.5) / cells_per_degree + southern_edge_deg) * DEG_TO_RAD;
            let lat_n = ((y as f64 + 0.5) / cells_per_degree + southern_edge_deg) * DEG_TO_RAD;

            let ew_c = e_w_at(lat_c);
            let ew_n = e_w_at(lat_n);
            let ew_s = e_w_at(lat_s);

            latitude_radians.push(lat_c);
            cellsize_e_w_metres.push(ew_c);
            cellsize_e_w_metres_n.push(ew_n);
            cellsize_e_w_metres_s.push(ew_s);
            cell_area.push(cellsize_n_s_metres * (ew_n + ew_s) / 2.0);
        }

        Self {
            latitude_radians,
            cellsize_e_w_metres,
            cellsize_e_w_metres_n,
            cellsize_e_w_metres_s,
            cell_area,
            cellsize_n_s_metres,
        }
    }

    pub fn height(&self) -> usize {
        self.latitude_radians.len()
    }
}
