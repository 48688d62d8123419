//! Arc-length tracking of a 3-D direction along the surface.

use trellis_hermite::cubic_hermite_arc_length;
use trellis_math::Vec3;

use crate::surface::surface_delta_xi;
use crate::{Boundary, PatchSurface, SurfacePosition};

// Backstop on predictor-corrector substeps; each substep advances up to
// 0.02 in xi so any realistic track finishes far below this.
const MAX_TRACK_STEPS: usize = 10_000;

/// Which face of the unit square element an increment crossed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementFace {
    Xi1Low,
    Xi1High,
    Xi2Low,
    Xi2High,
}

/// Increment element coordinates limited to the unit square.
///
/// Works out the face crossed first and clips the increment to it, scaling
/// the other coordinate in proportion. Returns the new xi pair, the
/// fraction of the increment applied (1.0 when it stays inside), and the
/// face crossed, if any.
fn increment_xi_on_square(
    xi1: f64,
    xi2: f64,
    dxi1: f64,
    dxi2: f64,
) -> (f64, f64, f64, Option<ElementFace>) {
    let onxi1 = xi1 + dxi1;
    let onxi2 = xi2 + dxi2;
    let mut nxi1 = onxi1;
    let mut nxi2 = onxi2;
    let mut fraction = 1.0;
    let mut face = None;
    if !(0.0..=1.0).contains(&nxi1) || !(0.0..=1.0).contains(&nxi2) {
        // come back in the increment direction to the first face crossed
        if onxi1 < 0.0 && dxi1 < 0.0 {
            let this_fraction = -xi1 / dxi1;
            if this_fraction < fraction {
                fraction = this_fraction;
                face = Some(ElementFace::Xi1Low);
                nxi1 = 0.0;
                nxi2 = xi2 + fraction * dxi2;
            }
        } else if onxi1 > 1.0 && dxi1 > 0.0 {
            let this_fraction = (1.0 - xi1) / dxi1;
            if this_fraction < fraction {
                fraction = this_fraction;
                face = Some(ElementFace::Xi1High);
                nxi1 = 1.0;
                nxi2 = xi2 + fraction * dxi2;
            }
        }
        if onxi2 < 0.0 && dxi2 < 0.0 {
            let this_fraction = -xi2 / dxi2;
            if this_fraction < fraction {
                fraction = this_fraction;
                face = Some(ElementFace::Xi2Low);
                nxi1 = xi1 + fraction * dxi1;
                nxi2 = 0.0;
            }
        } else if onxi2 > 1.0 && dxi2 > 0.0 {
            let this_fraction = (1.0 - xi2) / dxi2;
            if this_fraction < fraction {
                fraction = this_fraction;
                face = Some(ElementFace::Xi2High);
                nxi1 = xi1 + fraction * dxi1;
                nxi2 = 1.0;
            }
        }
    }
    (nxi1, nxi2, fraction, face)
}

impl PatchSurface {
    /// Move a position across an element face to the neighbouring element,
    /// wrapping a looped direction 1, else clamping at the surface boundary.
    fn advance_across_face(
        &self,
        position: SurfacePosition,
        face: ElementFace,
    ) -> (SurfacePosition, Boundary) {
        let mut position = position;
        let mut boundary = Boundary::None;
        match face {
            ElementFace::Xi1Low => {
                if position.e1 > 0 {
                    position.e1 -= 1;
                    position.xi1 = 1.0;
                } else if self.is_loop1() {
                    position.e1 = self.elements_count1() - 1;
                    position.xi1 = 1.0;
                } else {
                    position.xi1 = 0.0;
                    boundary = Boundary::Xi1;
                }
            }
            ElementFace::Xi1High => {
                if position.e1 + 1 < self.elements_count1() {
                    position.e1 += 1;
                    position.xi1 = 0.0;
                } else if self.is_loop1() {
                    position.e1 = 0;
                    position.xi1 = 0.0;
                } else {
                    position.xi1 = 1.0;
                    boundary = Boundary::Xi1;
                }
            }
            ElementFace::Xi2Low => {
                if position.e2 > 0 {
                    position.e2 -= 1;
                    position.xi2 = 1.0;
                } else {
                    position.xi2 = 0.0;
                    boundary = Boundary::Xi2;
                }
            }
            ElementFace::Xi2High => {
                if position.e2 + 1 < self.elements_count2() {
                    position.e2 += 1;
                    position.xi2 = 0.0;
                } else {
                    position.xi2 = 1.0;
                    boundary = Boundary::Xi2;
                }
            }
        }
        (position, boundary)
    }

    /// Track from a start position the given arc-length distance along a
    /// 3-D direction projected onto the surface.
    ///
    /// Approximate: improved Euler (Heun) predictor-corrector with maximum
    /// parametric substep 0.02, measuring each substep with the cubic
    /// Hermite arc-length formula. A negative distance tracks the negated
    /// direction. Tracking stops early at a non-periodic surface boundary,
    /// reported in the returned [`Boundary`].
    pub fn track_vector(
        &self,
        start_position: SurfacePosition,
        direction: &Vec3,
        track_distance: f64,
    ) -> (SurfacePosition, Boundary) {
        let (use_direction, use_distance) = if track_distance < 0.0 {
            (-direction, -track_distance)
        } else {
            (*direction, track_distance)
        };
        let mut position = start_position;
        let mut distance = 0.0;
        let distance_limit = 0.9999 * use_distance;
        const MAX_MAG_DXI: f64 = 0.02;

        let mut steps = 0;
        while distance < use_distance {
            steps += 1;
            if steps > MAX_TRACK_STEPS {
                log::warn!("track_vector: step limit reached at distance {distance}");
                break;
            }
            let xi1 = position.xi1;
            let xi2 = position.xi2;
            let (ax, ad1, ad2) = self.evaluate_derivatives(position);
            let (adelta_xi1, adelta_xi2) = surface_delta_xi(&ad1, &ad2, &use_direction);
            let amag = adelta_xi1.hypot(adelta_xi2);
            if amag == 0.0 {
                log::debug!("track_vector: no tangential component at {position:?}");
                break;
            }
            let scale = MAX_MAG_DXI / amag;
            let adxi1 = scale * adelta_xi1;
            let adxi2 = scale * adelta_xi2;
            // predictor step may leave the element slightly; corrected step
            // uses the mean of start and trial parametric directions
            let mut dxi1 = adxi1;
            let mut dxi2 = adxi2;
            {
                let trial = SurfacePosition::new(position.e1, position.e2, xi1 + dxi1, xi2 + dxi2);
                let (_, bd1, bd2) = self.evaluate_derivatives(trial);
                let (bdelta_xi1, bdelta_xi2) = surface_delta_xi(&bd1, &bd2, &use_direction);
                let delta_xi1 = 0.5 * (adelta_xi1 + bdelta_xi1);
                let delta_xi2 = 0.5 * (adelta_xi2 + bdelta_xi2);
                let mag = delta_xi1.hypot(delta_xi2);
                if mag > 0.0 {
                    let scale = MAX_MAG_DXI / mag;
                    dxi1 = scale * delta_xi1;
                    dxi2 = scale * delta_xi2;
                }
            }
            let (bxi1, bxi2, fraction, face) = increment_xi_on_square(xi1, xi2, dxi1, dxi2);
            position.xi1 = bxi1;
            position.xi2 = bxi2;
            let (bx, bd1, bd2) = self.evaluate_derivatives(position);
            let (bdelta_xi1, bdelta_xi2) = surface_delta_xi(&bd1, &bd2, &use_direction);
            let bmag = bdelta_xi1.hypot(bdelta_xi2);
            if bmag == 0.0 {
                log::debug!("track_vector: no tangential component at {position:?}");
                break;
            }
            let bscale = MAX_MAG_DXI / bmag;
            let bdxi1 = bscale * bdelta_xi1;
            let bdxi2 = bscale * bdelta_xi2;
            // substep arc length from the Hermite segment between the clipped
            // endpoints with proportionally scaled tangents
            let ad = fraction * (adxi1 * ad1 + adxi2 * ad2);
            let bd = fraction * (bdxi1 * bd1 + bdxi2 * bd2);
            let arc_length = cubic_hermite_arc_length(&ax.coords, &ad, &bx.coords, &bd);
            if distance + arc_length >= distance_limit {
                // scale the final partial substep to land on the distance
                let r = fraction * (use_distance - distance) / arc_length;
                position.xi1 = xi1 + r * dxi1;
                position.xi2 = xi2 + r * dxi2;
                break;
            }
            if arc_length == 0.0 && face.is_none() {
                log::debug!(
                    "track_vector: no increment at {position:?}, distance {distance} of {use_distance}"
                );
                break;
            }
            distance += arc_length;
            if let Some(face) = face {
                let (new_position, boundary) = self.advance_across_face(position, face);
                position = new_position;
                if boundary.is_boundary() {
                    log::debug!("track_vector: ended on boundary at {position:?}");
                    return (position, boundary);
                }
            }
        }
        (position, Boundary::None)
    }
}
