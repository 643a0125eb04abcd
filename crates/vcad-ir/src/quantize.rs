//! Fixed-point quantization for hash-stable IR payloads.
//!
//! Doubles aren't `Hash`/`Eq` in Rust, and two geometrically-identical
//! shapes built from slightly different floating-point paths should still
//! hash equal. Every `f64` that participates in a [`crate::Node`]'s
//! identity is rounded to the nearest 1e-9 and stored as a fixed-point
//! `i64`, with `f64` accessors for everything downstream of the IR.

use serde::{Deserialize, Serialize};

const RESOLUTION: f64 = 1e-9;

/// A single quantized scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quantized(i64);

impl Quantized {
    /// Quantize `v` to the nearest 1e-9.
    pub fn new(v: f64) -> Self {
        Self((v / RESOLUTION).round() as i64)
    }

    /// The dequantized value.
    pub fn value(&self) -> f64 {
        self.0 as f64 * RESOLUTION
    }
}

/// A quantized 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QVec2 {
    /// X component.
    pub x: Quantized,
    /// Y component.
    pub y: Quantized,
}

impl QVec2 {
    /// Quantize a raw `(x, y)` pair.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x: Quantized::new(x), y: Quantized::new(y) }
    }

    /// The dequantized `(x, y)` pair.
    pub fn xy(&self) -> (f64, f64) {
        (self.x.value(), self.y.value())
    }
}

/// A quantized 3D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QVec3 {
    /// X component.
    pub x: Quantized,
    /// Y component.
    pub y: Quantized,
    /// Z component.
    pub z: Quantized,
}

impl QVec3 {
    /// Quantize a raw `(x, y, z)` triple.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x: Quantized::new(x), y: Quantized::new(y), z: Quantized::new(z) }
    }

    /// The dequantized `(x, y, z)` triple.
    pub fn xyz(&self) -> (f64, f64, f64) {
        (self.x.value(), self.y.value(), self.z.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_within_half_resolution_quantize_equal() {
        let a = Quantized::new(1.000_000_000_1);
        let b = Quantized::new(1.000_000_000_2);
        assert_eq!(a, b);
    }

    #[test]
    fn dequantize_round_trips_within_resolution() {
        let q = Quantized::new(3.14159);
        assert!((q.value() - 3.14159).abs() < RESOLUTION);
    }
}
