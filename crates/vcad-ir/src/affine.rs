//! Quantized affine transforms for 2D and 3D IR nodes.
//!
//! These are stored as flattened homogeneous matrices, quantized the same
//! way as every other hash-participating scalar in the IR. The IR only
//! needs to fold consecutive transforms into one (the "nested `Transform`
//! folds into a composition" canonicalization invariant) — actually
//! executing a transform against mesh data is `vcad-kernel-math`'s job.

use crate::Quantized;
use serde::{Deserialize, Serialize};

/// Composable transform, implemented by [`Affine2`] and [`Affine3`].
pub trait Compose: Clone + PartialEq + Eq + std::hash::Hash + std::fmt::Debug {
    /// The identity transform.
    fn identity() -> Self;
    /// Compose `self` followed by `other`.
    fn compose(&self, other: &Self) -> Self;
}

/// A quantized 3x3 affine matrix (2D linear part + translation), row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Affine2 {
    m: [Quantized; 9],
}

impl Affine2 {
    /// Build from nine row-major values.
    pub fn from_values(v: [f64; 9]) -> Self {
        Self { m: v.map(Quantized::new) }
    }

    /// The nine row-major values.
    pub fn values(&self) -> [f64; 9] {
        self.m.map(|q| q.value())
    }

    /// A pure translation.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::from_values([1.0, 0.0, dx, 0.0, 1.0, dy, 0.0, 0.0, 1.0])
    }

    /// A pure non-uniform scale.
    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::from_values([sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0])
    }

    /// A pure rotation by `angle_radians`.
    pub fn rotation(angle_radians: f64) -> Self {
        let (s, c) = angle_radians.sin_cos();
        Self::from_values([c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0])
    }
}

impl Compose for Affine2 {
    fn identity() -> Self {
        Self::from_values([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    fn compose(&self, other: &Self) -> Self {
        let a = self.values();
        let b = other.values();
        let mut r = [0.0; 9];
        for i in 0..3 {
            for j in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    sum += b[i * 3 + k] * a[k * 3 + j];
                }
                r[i * 3 + j] = sum;
            }
        }
        Self::from_values(r)
    }
}

/// A quantized 4x4 affine matrix, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Affine3 {
    m: [Quantized; 16],
}

impl Affine3 {
    /// Build from sixteen row-major values.
    pub fn from_values(v: [f64; 16]) -> Self {
        Self { m: v.map(Quantized::new) }
    }

    /// The sixteen row-major values.
    pub fn values(&self) -> [f64; 16] {
        self.m.map(|q| q.value())
    }

    /// A pure translation.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        #[rustfmt::skip]
        let v = [
            1.0, 0.0, 0.0, dx,
            0.0, 1.0, 0.0, dy,
            0.0, 0.0, 1.0, dz,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self::from_values(v)
    }

    /// A pure non-uniform scale.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        #[rustfmt::skip]
        let v = [
            sx, 0.0, 0.0, 0.0,
            0.0, sy, 0.0, 0.0,
            0.0, 0.0, sz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self::from_values(v)
    }
}

impl Compose for Affine3 {
    fn identity() -> Self {
        #[rustfmt::skip]
        let v = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self::from_values(v)
    }

    fn compose(&self, other: &Self) -> Self {
        let a = self.values();
        let b = other.values();
        let mut r = [0.0; 16];
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += b[i * 4 + k] * a[k * 4 + j];
                }
                r[i * 4 + j] = sum;
            }
        }
        Self::from_values(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composing_two_translations_sums_them() {
        let a = Affine3::translation(1.0, 0.0, 0.0);
        let b = Affine3::translation(0.0, 2.0, 0.0);
        let composed = a.compose(&b);
        let v = composed.values();
        assert!((v[3] - 1.0).abs() < 1e-6);
        assert!((v[7] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn identity_composed_with_self_is_identity() {
        let id = Affine2::identity();
        assert_eq!(id.compose(&id), Affine2::identity());
    }
}
