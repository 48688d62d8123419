#![warn(missing_docs)]

//! Bicubic Hermite patch-lattice surface with tracking queries.
//!
//! A [`PatchSurface`] is an immutable lattice of square bicubic Hermite
//! elements defined by node coordinates and two tangential derivative
//! fields (plus optional cross derivatives). On top of exact tensor-product
//! evaluation it provides the iterative geometric queries used to locate
//! features on smooth curved surfaces:
//!
//! - [`PatchSurface::find_nearest_position`] — project a 3-D point onto the
//!   surface
//! - [`PatchSurface::track_vector`] — follow a 3-D direction along the
//!   surface for an arc-length distance
//! - [`PatchSurface::find_intersection_point`] /
//!   [`PatchSurface::find_intersection_curve`] — intersect two surfaces
//! - [`PatchSurface::find_nearest_position_on_curve`] — intersect or come
//!   nearest to a 3-D Hermite curve
//! - [`PatchSurface::create_hermite_curve_points`] — sample an on-surface
//!   curve between two surface locations
//!
//! All queries take `&self`, are side-effect free and iteration-bounded;
//! a surface is safe to share across threads. Non-convergence of a search
//! is reported through [`Convergence`] or an empty result, never a panic —
//! only out-of-range input proportions are contract violations.
//!
//! # Example
//!
//! ```
//! use trellis_math::{Point3, Vec3};
//! use trellis_surface::PatchSurface;
//!
//! // a unit square patch in the z = 0 plane
//! let nx = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//! ];
//! let nd1 = vec![Vec3::x(); 4];
//! let nd2 = vec![Vec3::y(); 4];
//! let surface = PatchSurface::new(1, 1, nx, nd1, nd2, None, false).unwrap();
//! let position = surface.position_from_proportion(0.5, 0.5);
//! let point = surface.evaluate(position);
//! assert!((point - Point3::new(0.5, 0.5, 0.0)).norm() < 1.0e-12);
//! ```

mod curve;
mod intersect;
mod position;
mod project;
mod surface;
#[cfg(test)]
mod test_util;
mod track;

pub use curve::{CurveProjection, HermiteCurveMode, SurfaceCurvePoints};
pub use intersect::{IntersectionCurve, IntersectionPoint};
pub use position::{Boundary, Convergence, SurfacePosition};
pub use surface::{surface_axes, surface_delta_xi, PatchSurface};
pub use trellis_hermite::CurveLocation;

use thiserror::Error;

/// Errors from lattice surface construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// Element count is zero in one of the parametric directions.
    #[error("element counts must be nonzero")]
    ZeroElementCount,

    /// The node coordinate array does not match the element counts.
    #[error("expected {expected} lattice nodes, got {actual}")]
    NodeCountMismatch {
        /// Node count implied by the element counts and loop flag.
        expected: usize,
        /// Node count actually supplied.
        actual: usize,
    },

    /// A derivative array length does not match the node count.
    #[error("derivative array length {actual} does not match node count {expected}")]
    DerivativeCountMismatch {
        /// Expected length (the node count).
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
}
