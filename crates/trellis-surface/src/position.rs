//! Value types locating points on a lattice surface.

/// A position on a [`PatchSurface`](crate::PatchSurface): element indices
/// and local element coordinates.
///
/// Created by `PatchSurface::position_from_proportion` or returned from
/// the tracking queries; freely copied and passed by value. Local
/// coordinates normally lie in [0, 1] but may leave that range transiently
/// during predictor steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePosition {
    /// Element index in direction 1, starting at 0.
    pub e1: usize,
    /// Element index in direction 2, starting at 0.
    pub e2: usize,
    /// Local element coordinate in direction 1.
    pub xi1: f64,
    /// Local element coordinate in direction 2.
    pub xi2: f64,
}

impl SurfacePosition {
    /// Create a position from element indices and local coordinates.
    pub fn new(e1: usize, e2: usize, xi1: f64, xi2: f64) -> Self {
        Self { e1, e2, xi1, xi2 }
    }
}

/// Which surface boundary a position lies on or an advance was clamped at.
///
/// Direction 2 takes precedence when a position sits on a corner; a
/// periodic direction 1 never reports a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Not on a boundary.
    None,
    /// On a direction-1 (xi1) boundary edge.
    Xi1,
    /// On a direction-2 (xi2) boundary edge.
    Xi2,
}

impl Boundary {
    /// True if this is any boundary edge.
    pub fn is_boundary(self) -> bool {
        self != Boundary::None
    }
}

/// Outcome of a bounded iterative search.
///
/// Searches always return their best position; this reports whether the
/// convergence tolerance was met within the iteration budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The increment fell below the parametric tolerance.
    Converged,
    /// The iteration budget was exhausted; result is best-effort.
    MaxIterations,
}
