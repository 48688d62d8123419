//! Nearest-point projection onto the surface.

use trellis_math::{Point3, Tolerance};

use crate::surface::surface_delta_xi;
use crate::{Convergence, PatchSurface, SurfacePosition};

impl PatchSurface {
    /// Find the position on the surface nearest to a 3-D target point.
    ///
    /// Newton-like fixed-point iteration from `start_position` (surface
    /// parametric midpoint if omitted). Only reliable on simply shaped
    /// lattices from the default start; supply a close start position
    /// otherwise. Always returns the best position reached; the
    /// [`Convergence`] value reports whether the parametric tolerance was
    /// met within the iteration budget.
    pub fn find_nearest_position(
        &self,
        target: &Point3,
        start_position: Option<SurfacePosition>,
    ) -> (SurfacePosition, Convergence) {
        let mut position =
            start_position.unwrap_or_else(|| self.position_from_proportion(0.5, 0.5));
        const MAX_MAG_DXI: f64 = 0.5;
        let tolerance = Tolerance::DEFAULT;
        let mut old_dxi: Option<(f64, f64)> = None;
        let mut mag_old_dxi = 0.0;
        let mut mag_adxi = f64::INFINITY;
        for _ in 0..100 {
            let (x, d1, d2) = self.evaluate_derivatives(position);
            let delta_x = target - x;
            let (mut dxi1, mut dxi2) = surface_delta_xi(&d1, &d2, &delta_x);
            let mut mag_dxi = dxi1.hypot(dxi2);
            // control oscillations near boundaries and sharp features
            if let Some((old1, old2)) = old_dxi {
                if dxi1 * old1 + dxi2 * old2 < -0.5 * (mag_old_dxi * mag_old_dxi) {
                    let factor = mag_dxi / (mag_dxi + mag_old_dxi);
                    dxi1 *= factor;
                    dxi2 *= factor;
                    mag_dxi *= factor;
                }
            }
            let (new_position, _, adxi1, adxi2) = self.advance(position, dxi1, dxi2, MAX_MAG_DXI);
            position = new_position;
            old_dxi = Some((dxi1, dxi2));
            mag_old_dxi = mag_dxi;
            mag_adxi = adxi1.hypot(adxi2);
            if tolerance.xi_converged(mag_adxi) {
                return (position, Convergence::Converged);
            }
        }
        log::warn!(
            "find_nearest_position: max iterations reached, closeness in xi {}",
            mag_adxi
        );
        (position, Convergence::MaxIterations)
    }
}
