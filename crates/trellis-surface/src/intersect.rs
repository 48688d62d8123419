//! Surface-surface intersection: single-point search and curve tracing.

use trellis_hermite::{
    compute_cubic_hermite_arc_length, interpolate_cubic_hermite, sample_cubic_hermite_curves,
    set_magnitude, smooth_cubic_hermite_derivatives_line, smooth_cubic_hermite_derivatives_loop,
};
use trellis_math::{Point3, Tolerance, Vec3};

use crate::surface::surface_delta_xi;
use crate::{Boundary, PatchSurface, SurfacePosition};

// Magnitude of the xi perturbation used to escape a stagnated iteration.
const MAG_JOLT_DXI: f64 = 0.1;

// Backstop on traced points per curve; advance steps are bounded below by
// the jolt/stagnation handling so real traces finish far earlier.
const MAX_CURVE_POINTS: usize = 1000;

/// A point found on the intersection of two surfaces.
#[derive(Debug, Clone, Copy)]
pub struct IntersectionPoint {
    /// Position on the surface the query ran on.
    pub position: SurfacePosition,
    /// Position on the other surface.
    pub other_position: SurfacePosition,
    /// Coordinates of the intersection point.
    pub point: Point3,
    /// Unit tangent along the intersection curve.
    pub tangent: Vec3,
    /// Boundary of the primary surface the point lies on, if any.
    pub boundary: Boundary,
}

/// A sampled curve along the intersection of two surfaces.
#[derive(Debug, Clone)]
pub struct IntersectionCurve {
    /// Sampled points on the intersection.
    pub points: Vec<Point3>,
    /// Smoothed tangent derivatives along the curve.
    pub tangents: Vec<Vec3>,
    /// Proportions of each point on the primary surface.
    pub proportions: Vec<(f64, f64)>,
    /// True if the curve closes into a loop.
    pub closed: bool,
}

// Per-query mutable iteration state, kept local so queries stay reentrant.
struct IterationState {
    old_dxi: Option<(f64, f64)>,
    mag_old_dxi: f64,
    jolt_index: usize,
    last_jolt_iteration: Option<usize>,
}

impl IterationState {
    fn new() -> Self {
        Self {
            old_dxi: None,
            mag_old_dxi: 0.0,
            jolt_index: 0,
            last_jolt_iteration: None,
        }
    }
}

impl PatchSurface {
    /// Find a point lying on both this surface and `other` from an initial
    /// guess on each.
    ///
    /// The start positions need to be good guesses if either surface has
    /// complex curvature; seed with [`find_nearest_node`]
    /// (Self::find_nearest_node) when nothing better is known. Returns
    /// `None` when no intersection is found near the guesses — an expected
    /// outcome, not an error.
    pub fn find_intersection_point(
        &self,
        other: &PatchSurface,
        start_position: SurfacePosition,
        other_start_position: SurfacePosition,
    ) -> Option<IntersectionPoint> {
        let mut position = start_position;
        let mut other_position = other_start_position;
        const MAX_MAG_DXI: f64 = 0.5;
        let xi_tol = Tolerance::DEFAULT.xi;
        let x_tol = self.x_tolerance();
        let mut state = IterationState::new();
        let mut mag_dxi = 0.0;
        for iteration in 0..100 {
            let on_boundary = self.on_boundary(position);
            let (x, d1, d2) = self.evaluate_derivatives(position);
            other_position = other.find_nearest_position(&x, Some(other_position)).0;
            let on_other_boundary = other.on_boundary(other_position);
            let (ox, od1, od2) = other.evaluate_derivatives(other_position);
            let r = ox - x;
            let mag_r = r.norm();
            let n1 = d1.cross(&d2);
            if mag_r < x_tol {
                // found: tangent along the cross of the two surface normals,
                // falling back to a surface tangent when they are parallel
                // or both points run along matching boundary edges
                let n2 = od1.cross(&od2);
                let mut tangent = n1.cross(&n2);
                if tangent.norm() < 1.0e-6 * x_tol
                    || (on_boundary == Boundary::Xi2
                        && on_other_boundary == Boundary::Xi2
                        && set_magnitude(&d1, 1.0).dot(&set_magnitude(&od1, 1.0)) > 0.9999)
                {
                    tangent = if on_boundary == Boundary::Xi2 { d1 } else { d2 };
                }
                return Some(IntersectionPoint {
                    position,
                    other_position,
                    point: x,
                    tangent: set_magnitude(&tangent, 1.0),
                    boundary: on_boundary,
                });
            }
            // decompose the residual about the local surface normal, flipped
            // towards the other surface
            let mut n = set_magnitude(&n1, 1.0);
            let mut r_dot_n = r.dot(&n);
            if r_dot_n < 0.0 {
                n = -n;
                r_dot_n = -r_dot_n;
            }
            let r_out_of_plane = r_dot_n * n;
            let r_in_plane = r - r_out_of_plane;
            let u = if on_other_boundary.is_boundary() && on_boundary.is_boundary() {
                r_in_plane
            } else {
                let mag_ri = r_in_plane.norm();
                if mag_ri == 0.0 {
                    Vec3::zeros()
                } else {
                    // out-of-plane slope correction accelerates convergence
                    // when the surfaces are nearly tangent
                    let slope_factor = (mag_r * mag_r) / (mag_ri * mag_ri);
                    let mut u = slope_factor * r_in_plane;
                    if on_other_boundary.is_boundary() && !on_boundary.is_boundary() {
                        // the true intersection tracks along the other
                        // surface's edge: constrain the move to it
                        let alignment = set_magnitude(&u, 1.0).dot(&set_magnitude(&od2, 1.0));
                        let jolted_last_iteration = state
                            .last_jolt_iteration
                            .is_some_and(|jolt| iteration == jolt + 1);
                        if jolted_last_iteration || alignment > 0.99 {
                            u = (u.dot(&od2) / od2.dot(&od2)) * od2;
                        }
                    }
                    u
                }
            };
            let (mut dxi1, mut dxi2) = surface_delta_xi(&d1, &d2, &u);
            mag_dxi = dxi1.hypot(dxi2);
            if mag_dxi < 100.0 * xi_tol {
                // slow progress: likely a local minimum; jolt along a
                // boundary edge or cardinal direction, cycling cases
                state.last_jolt_iteration = Some(iteration);
                let (jolt_position, jolt_dxi1, jolt_dxi2) = self.jolt(
                    other,
                    position,
                    other_position,
                    on_boundary,
                    on_other_boundary,
                    state.jolt_index,
                );
                if jolt_dxi1 != 0.0 || jolt_dxi2 != 0.0 {
                    let (jolt_x, jolt_d1, jolt_d2) = self.evaluate_derivatives(jolt_position);
                    let jolt_other_position =
                        other.find_nearest_position(&jolt_x, Some(other_position)).0;
                    let jolt_ox = other.evaluate(jolt_other_position);
                    let jolt_r = jolt_ox - jolt_x;
                    let jolt_n1 = set_magnitude(&jolt_d1.cross(&jolt_d2), 1.0);
                    let r_dot_n_signed = r.dot(&set_magnitude(&n1, 1.0));
                    let jolt_r_dot_n_signed = jolt_r.dot(&jolt_n1);
                    if r_dot_n_signed * jolt_r_dot_n_signed <= 0.0 {
                        // residual changed sign: interpolate to the crossing
                        let jolt_factor = r_dot_n_signed.abs()
                            / (r_dot_n_signed.abs() + jolt_r_dot_n_signed.abs());
                        dxi1 = jolt_dxi1 * jolt_factor;
                        dxi2 = jolt_dxi2 * jolt_factor;
                        mag_dxi = dxi1.hypot(dxi2);
                    } else if jolt_r_dot_n_signed.abs() < r_dot_n_signed.abs() {
                        // jolt reduced the residual: keep it outright
                        dxi1 = jolt_dxi1;
                        dxi2 = jolt_dxi2;
                        mag_dxi = dxi1.hypot(dxi2);
                    }
                    state.jolt_index += 1;
                }
            } else if let Some((old1, old2)) = state.old_dxi {
                // control oscillations
                if dxi1 * old1 + dxi2 * old2 < -0.5 * (state.mag_old_dxi * state.mag_old_dxi) {
                    let factor = mag_dxi / (mag_dxi + state.mag_old_dxi);
                    dxi1 *= factor;
                    dxi2 *= factor;
                    mag_dxi *= factor;
                }
            }
            let (new_position, _, adxi1, adxi2) = self.advance(position, dxi1, dxi2, MAX_MAG_DXI);
            position = new_position;
            state.old_dxi = Some((dxi1, dxi2));
            state.mag_old_dxi = mag_dxi;
            let mag_adxi = adxi1.hypot(adxi2);
            if mag_adxi < xi_tol {
                log::debug!("find_intersection_point: insufficient increment, no intersection");
                return None;
            }
        }
        log::debug!("find_intersection_point: max iterations reached, last increment {mag_dxi}");
        None
    }

    // Compute a perturbed position and the applied xi increment for one
    // stagnation event, cycling through jolt cases.
    fn jolt(
        &self,
        other: &PatchSurface,
        position: SurfacePosition,
        other_position: SurfacePosition,
        on_boundary: Boundary,
        on_other_boundary: Boundary,
        jolt_index: usize,
    ) -> (SurfacePosition, f64, f64) {
        const MAX_MAG_DXI: f64 = 0.5;
        if on_boundary.is_boundary() && (!on_other_boundary.is_boundary() || jolt_index % 4 < 2) {
            // jolt along this surface's boundary edge
            let sign = if jolt_index % 2 == 0 {
                -MAG_JOLT_DXI
            } else {
                MAG_JOLT_DXI
            };
            let jolt_dxi1 = if on_boundary == Boundary::Xi1 { 0.0 } else { sign };
            let jolt_dxi2 = if on_boundary == Boundary::Xi2 { 0.0 } else { sign };
            let (jolt_position, _, adxi1, adxi2) =
                self.advance(position, jolt_dxi1, jolt_dxi2, MAX_MAG_DXI);
            (jolt_position, adxi1, adxi2)
        } else if on_other_boundary.is_boundary() {
            // jolt along the other surface's boundary edge and pull this
            // position after it
            let sign = if jolt_index % 2 == 0 {
                -MAG_JOLT_DXI
            } else {
                MAG_JOLT_DXI
            };
            let jolt_other_dxi1 = if on_other_boundary == Boundary::Xi1 { 0.0 } else { sign };
            let jolt_other_dxi2 = if on_other_boundary == Boundary::Xi2 { 0.0 } else { sign };
            let (jolt_other_position, _, adxi1, adxi2) =
                other.advance(other_position, jolt_other_dxi1, jolt_other_dxi2, MAX_MAG_DXI);
            if adxi1 != 0.0 || adxi2 != 0.0 {
                let jolt_other_x = other.evaluate(jolt_other_position);
                let jolt_position = self.find_nearest_position(&jolt_other_x, Some(position)).0;
                let (p1, p2) = self.proportion(position);
                let (q1, q2) = self.proportion(jolt_position);
                (
                    jolt_position,
                    (q1 - p1) * self.elements_count1() as f64,
                    (q2 - p2) * self.elements_count2() as f64,
                )
            } else {
                (position, 0.0, 0.0)
            }
        } else {
            // cardinal directions, round-robin
            let jolt_case = jolt_index % 4;
            let jolt_dxi1 = match jolt_case {
                0 => -MAG_JOLT_DXI,
                2 => MAG_JOLT_DXI,
                _ => 0.0,
            };
            let jolt_dxi2 = match jolt_case {
                1 => -MAG_JOLT_DXI,
                3 => MAG_JOLT_DXI,
                _ => 0.0,
            };
            let (jolt_position, _, adxi1, adxi2) =
                self.advance(position, jolt_dxi1, jolt_dxi2, MAX_MAG_DXI);
            (jolt_position, adxi1, adxi2)
        }
    }

    /// Trace the intersection curve of this surface and `other` nearest a
    /// start position, resampled to `element_count` equal-arc-length
    /// elements.
    ///
    /// Without a start position the seed is found by scanning every lattice
    /// node of this surface against the other surface's nodes. The trace
    /// runs both ways from the seed until either a loop closes or both
    /// directions terminate on a surface boundary; the resampled points are
    /// re-projected through [`find_intersection_point`]
    /// (Self::find_intersection_point) and tangents smoothed. Returns `None`
    /// when the surfaces do not intersect near the seed.
    pub fn find_intersection_curve(
        &self,
        other: &PatchSurface,
        start_position: Option<SurfacePosition>,
        element_count: usize,
    ) -> Option<IntersectionCurve> {
        let (start_position, other_start_position) = match start_position {
            Some(position) => {
                let x = self.evaluate(position);
                (position, other.find_nearest_node(&x).0)
            }
            None => self.nearest_node_pair(other),
        };
        let x_tol = self.x_tolerance();
        let xi_loop_samples = [0.25, 0.5, 0.75, 1.0];
        let mut px: Vec<Point3> = Vec::new();
        let mut pd1: Vec<Vec3> = Vec::new();
        let mut boundary_count = 0;
        let mut closed = false;
        let mut next_position = start_position;
        let mut other_position = other_start_position;
        let mut cross_boundary = Boundary::None;
        let mut position = start_position;
        loop {
            let Some(found) =
                self.find_intersection_point(other, next_position, other_position)
            else {
                if px.is_empty() {
                    log::debug!("find_intersection_curve: no intersection");
                    return None;
                }
                // best effort: keep the partial trace
                log::warn!("find_intersection_curve: intersection lost mid-trace");
                break;
            };
            position = found.position;
            other_position = found.other_position;
            let x = found.point;
            let mut t = found.tangent;
            let on_boundary = found.boundary;
            let on_other_boundary = other.on_boundary(other_position);
            if boundary_count == 0 {
                px.push(x);
                pd1.push(t);
            } else {
                px.insert(0, x);
                pd1.insert(0, t);
            }
            if px.len() > MAX_CURVE_POINTS {
                log::warn!("find_intersection_curve: point limit reached");
                break;
            }
            if px.len() > 1
                && (on_boundary.is_boundary() || on_other_boundary.is_boundary())
                && (cross_boundary.is_boundary()
                    || !(on_boundary.is_boundary() && on_other_boundary.is_boundary()))
            {
                // drop the new point if it duplicates its chain neighbour
                if boundary_count == 0 {
                    let len = px.len();
                    if (px[len - 1] - px[len - 2]).norm() < x_tol {
                        px.pop();
                        pd1.pop();
                    }
                } else if (px[0] - px[1]).norm() < x_tol {
                    px.remove(0);
                    pd1.remove(0);
                }
                boundary_count += 1;
                if boundary_count == 2 {
                    break;
                }
                // go in reverse from the seed
                position = start_position;
                other_position = other_start_position;
                t = pd1[0];
            }
            // loop closure test; cannot happen once a boundary was reached
            if boundary_count == 0 && px.len() > 2 {
                let len = px.len();
                let x1 = px[len - 2].coords;
                let x2 = px[len - 1].coords;
                let dscale =
                    compute_cubic_hermite_arc_length(&x1, &pd1[len - 2], &x2, &pd1[len - 1], true);
                let d1s = dscale * pd1[len - 2];
                let d2s = dscale * pd1[len - 1];
                for &xi in &xi_loop_samples {
                    let tx = interpolate_cubic_hermite(&x1, &d1s, &x2, &d2s, xi);
                    if (tx - px[0].coords).norm() < 0.2 * dscale {
                        closed = true;
                        break;
                    }
                }
                if closed {
                    // the last point is at or past the start
                    px.pop();
                    pd1.pop();
                    break;
                }
            }
            let (_, d1, d2) = self.evaluate_derivatives(position);
            let direction = if boundary_count == 1 { -t } else { t };
            let (dxi1, dxi2) = surface_delta_xi(&d1, &d2, &direction);
            let (advanced, crossed, _, _) = self.advance(position, dxi1, dxi2, 0.5);
            next_position = advanced;
            cross_boundary = crossed;
        }
        if px.len() < 2 {
            log::debug!("find_intersection_curve: degenerate single-point intersection");
            return None;
        }

        // resample to equal arc lengths, then restore on-intersection
        // accuracy point by point
        if closed {
            px.push(px[0]);
            pd1.push(pd1[0]);
        }
        let pxv: Vec<Vec3> = px.iter().map(|p| p.coords).collect();
        let (mut nx, mut nd1) =
            sample_cubic_hermite_curves(&pxv, &pd1, element_count, 0.0, 0.0, 1.0, 1.0);
        if closed {
            nx.pop();
            nd1.pop();
        }
        let mut cx = Vec::with_capacity(nx.len());
        let mut cd1 = Vec::with_capacity(nx.len());
        let mut c_proportions = Vec::with_capacity(nx.len());
        for (x, d) in nx.iter().zip(&nd1) {
            let target = Point3::from(*x);
            position = self.find_nearest_position(&target, Some(position)).0;
            match self.find_intersection_point(other, position, other_position) {
                Some(found) => {
                    position = found.position;
                    other_position = found.other_position;
                    cx.push(found.point);
                    cd1.push(found.tangent);
                    c_proportions.push(self.proportion(found.position));
                }
                None => {
                    // keep the resampled estimate
                    cx.push(target);
                    cd1.push(set_magnitude(d, 1.0));
                    c_proportions.push(self.proportion(position));
                }
            }
        }
        let cxv: Vec<Vec3> = cx.iter().map(|p| p.coords).collect();
        let tangents = if closed {
            smooth_cubic_hermite_derivatives_loop(&cxv, &cd1)
        } else {
            smooth_cubic_hermite_derivatives_line(&cxv, &cd1)
        };
        Some(IntersectionCurve {
            points: cx,
            tangents,
            proportions: c_proportions,
            closed,
        })
    }

    // Global seed search: nearest pair between this surface's lattice nodes
    // and the other surface's nodes. O(N*M) but runs once per query on
    // small lattices.
    fn nearest_node_pair(&self, other: &PatchSurface) -> (SurfacePosition, SurfacePosition) {
        let nodes_count1 = self.nodes_count1();
        let mut nearest_distance = f64::INFINITY;
        let mut nearest_n1 = 0;
        let mut nearest_n2 = 0;
        let mut nearest_other_position =
            other.position_from_proportion(0.0, 0.0);
        let mut p = 0;
        for n2 in 0..=self.elements_count2() {
            for n1 in 0..nodes_count1 {
                let target = self.node_coordinates()[p];
                let (other_position, distance) = other.find_nearest_node(&target);
                if distance < nearest_distance {
                    nearest_distance = distance;
                    nearest_n1 = n1;
                    nearest_n2 = n2;
                    nearest_other_position = other_position;
                }
                p += 1;
            }
        }
        (
            self.position_from_proportion(
                nearest_n1 as f64 / self.elements_count1() as f64,
                nearest_n2 as f64 / self.elements_count2() as f64,
            ),
            nearest_other_position,
        )
    }
}
