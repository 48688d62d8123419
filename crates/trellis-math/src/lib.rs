#![warn(missing_docs)]

//! Math types for the trellis surface-tracking kernel.
//!
//! Thin wrappers around nalgebra providing domain-specific types for the
//! patch-lattice geometry kernel: points, vectors, directions, and the
//! tolerance constants shared by the iterative search routines.

use nalgebra::{Vector2, Vector3};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A vector in 2D parameter/proportion space.
pub type Vec2 = Vector2<f64>;

/// Tolerance constants for the kernel's iterative searches.
///
/// Parametric (xi) comparisons use an absolute tolerance; coordinate
/// comparisons use a relative tolerance scaled by the surface extent, so
/// convergence behaves the same for millimetre- and metre-sized lattices.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Absolute tolerance on element xi / proportion increments.
    pub xi: f64,
    /// Relative coordinate tolerance, scaled by surface extent.
    pub x_relative: f64,
}

impl Tolerance {
    /// Default kernel tolerances (1e-7 xi, 1e-6 relative coordinate).
    pub const DEFAULT: Self = Self {
        xi: 1.0e-7,
        x_relative: 1.0e-6,
    };

    /// Absolute coordinate tolerance for a surface of the given extent.
    pub fn x_absolute(&self, extent: f64) -> f64 {
        self.x_relative * extent
    }

    /// Check if a parametric increment magnitude is effectively zero.
    pub fn xi_converged(&self, mag_dxi: f64) -> bool {
        mag_dxi.abs() < self.xi
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}
