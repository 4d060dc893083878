use serde::{Deserialize, Serialize};

/// A 2D simulation field storing f32 values in row-major order.
/// Indexing is (x, y): x is the column in [0, width), y the row in [0, height).
/// Stored values are f32; solver arithmetic promotes to f64.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Field2D {
    /// Row-major values; `data[y * width + x]`.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl Field2D {
    /// Create a new field filled with the given value.
    pub fn filled(width: usize, height: usize, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }

    /// Create a zero-filled field.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Create a field with the same shape as `other`, filled with `fill`.
    pub fn like(other: &Field2D, fill: f32) -> Self {
        Self::filled(other.width, other.height, fill)
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, val: f32) {
        self.data[y * self.width + x] = val;
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Reset every value to `val`.
    pub fn fill(&mut self, val: f32) {
        self.data.iter_mut().for_each(|v| *v = val);
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }
}
