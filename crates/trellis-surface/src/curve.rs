//! Projection of 3-D Hermite curves onto the surface and sampling of
//! on-surface Hermite curves.

use trellis_hermite::{
    advance_curve_location, evaluate_curve_point, evaluate_curve_point_and_derivative,
    increment_xi_on_line, interpolate_hermite_lagrange_derivative,
    interpolate_lagrange_hermite_derivative, sample_cubic_hermite_curves,
    sample_cubic_hermite_curves_smooth, set_magnitude, CurveLocation,
};
use trellis_math::{Point3, Tolerance, Vec2, Vec3};

use crate::surface::{surface_axes, surface_delta_xi};
use crate::{Boundary, PatchSurface, SurfacePosition};

/// Result of projecting a 3-D curve onto the surface.
#[derive(Debug, Clone, Copy)]
pub struct CurveProjection {
    /// Nearest position on the surface.
    pub surface_position: SurfacePosition,
    /// Nearest or intersecting location on the curve.
    pub curve_location: CurveLocation,
    /// True if the curve meets the surface at the location (within the
    /// surface's coordinate tolerance), false for a nearest approach.
    pub intersection: bool,
}

/// How element sizes transition along an on-surface Hermite curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HermiteCurveMode {
    /// Smooth variation of element size between the end derivatives.
    Smooth,
    /// Transition from the start derivative, then even sizes.
    TransitionStart,
    /// Even sizes, then transition to the end derivative.
    TransitionEnd,
    /// Transition at both ends with even sizes in between.
    TransitionStartAndEnd,
}

/// Points sampled along a Hermite curve lying on a surface.
///
/// `d1` runs along the curve, `d3` is the unit surface normal and `d2`
/// completes the right-handed triple in the surface plane with magnitude
/// matching `d1`.
#[derive(Debug, Clone)]
pub struct SurfaceCurvePoints {
    /// Point coordinates.
    pub points: Vec<Point3>,
    /// Derivatives along the curve.
    pub d1: Vec<Vec3>,
    /// In-surface derivatives normal to the curve.
    pub d2: Vec<Vec3>,
    /// Unit surface normals.
    pub d3: Vec<Vec3>,
    /// Surface proportions of each point.
    pub proportions: Vec<(f64, f64)>,
}

impl PatchSurface {
    /// Find the nearest or intersection point of a piecewise-Hermite 3-D
    /// curve with this surface.
    ///
    /// `cx`/`cd1` are the curve nodes and derivatives; a `closed` curve
    /// wraps its final element back to the first node. Without a start
    /// location the curve is seeded by sampling `curve_samples` locations
    /// per element against the nearest lattice nodes.
    pub fn find_nearest_position_on_curve(
        &self,
        cx: &[Point3],
        cd1: &[Vec3],
        closed: bool,
        start_curve_location: Option<CurveLocation>,
        curve_samples: usize,
    ) -> CurveProjection {
        let node_count = cx.len();
        assert!(node_count > 1, "find_nearest_position_on_curve: curve needs at least 2 points");
        let element_count = if closed { node_count } else { node_count - 1 };
        let cxv: Vec<Vec3> = cx.iter().map(|p| p.coords).collect();
        let (mut curve_location, mut surface_position) = match start_curve_location {
            Some(location) => {
                let target = evaluate_curve_point(&cxv, cd1, location, closed);
                (location, self.find_nearest_node(&Point3::from(target)).0)
            }
            None => {
                // coarse scan of the curve against the lattice nodes
                let mut nearest: Option<(f64, CurveLocation, SurfacePosition)> = None;
                let sample_count = element_count * curve_samples;
                let sample_limit = if closed { sample_count } else { sample_count + 1 };
                for s in 0..sample_limit {
                    let location = if !closed && s == sample_count {
                        CurveLocation::new(element_count - 1, 1.0)
                    } else {
                        CurveLocation::new(
                            s / curve_samples,
                            (s % curve_samples) as f64 / curve_samples as f64,
                        )
                    };
                    let target = evaluate_curve_point(&cxv, cd1, location, closed);
                    let (position, distance) = self.find_nearest_node(&Point3::from(target));
                    if nearest.map_or(true, |(best, _, _)| distance < best) {
                        nearest = Some((distance, location, position));
                    }
                }
                let (_, location, position) = nearest.expect("curve has sample locations");
                (location, position)
            }
        };
        const MAX_MAG_DXI: f64 = 0.5;
        let xi_tol = Tolerance::DEFAULT.xi;
        let x_tol = self.x_tolerance();
        let mut last_on_boundary = false;
        let mut last_dxi: Option<f64> = None;
        let mut mag_dxi = f64::INFINITY;
        let mut converged = false;
        for _ in 0..100 {
            let (x, d) = evaluate_curve_point_and_derivative(&cxv, cd1, curve_location, closed);
            surface_position = self
                .find_nearest_position(&Point3::from(x), Some(surface_position))
                .0;
            let on_surface_boundary = self.on_boundary(surface_position);
            let other_x = self.evaluate(surface_position);
            let r = other_x.coords - x;
            let mag_r = r.norm();
            if mag_r < x_tol {
                return CurveProjection {
                    surface_position,
                    curve_location,
                    intersection: true,
                };
            }
            // residual component normal to the curve tangent, flipped
            // towards the surface point
            let mut n = set_magnitude(&d.cross(&r).cross(&d), 1.0);
            let mut r_dot_n = r.dot(&n);
            if r_dot_n < 0.0 {
                n = -n;
                r_dot_n = -r_dot_n;
            }
            let r_out_of_plane = r_dot_n * n;
            let r_in_plane = r - r_out_of_plane;
            let u = if on_surface_boundary != Boundary::None {
                r_in_plane
            } else {
                (1.0 + r_dot_n / mag_r) * r_in_plane
            };
            mag_dxi = u.norm() / d.norm();
            let mut dxi = if mag_dxi < MAX_MAG_DXI { mag_dxi } else { MAX_MAG_DXI };
            if u.dot(&d) < 0.0 {
                dxi = -dxi;
            }
            // control oscillations
            if let Some(last) = last_dxi {
                if dxi * last < -0.5 * (last * last) {
                    let factor = mag_dxi / (mag_dxi + last.abs());
                    dxi *= factor;
                    mag_dxi *= factor;
                }
            }
            last_dxi = Some(dxi);
            let (bxi, face) = increment_xi_on_line(curve_location.xi, dxi);
            curve_location = CurveLocation::new(curve_location.element, bxi);
            if let Some(face) = face {
                let (location, on_boundary) =
                    advance_curve_location(curve_location, face, element_count, closed);
                curve_location = location;
                if on_boundary && last_on_boundary {
                    // nearest is on the curve end
                    converged = true;
                    break;
                }
                last_on_boundary = on_boundary;
            } else {
                last_on_boundary = false;
            }
            if mag_dxi < xi_tol {
                converged = true;
                break;
            }
        }
        if !converged {
            log::warn!(
                "find_nearest_position_on_curve: max iterations reached, closeness in xi {mag_dxi}"
            );
        }
        CurveProjection {
            surface_position,
            curve_location,
            intersection: false,
        }
    }

    /// Sample a Hermite curve lying on the surface between two proportion
    /// pairs.
    ///
    /// Optional 3-D end derivatives are matched by converting them into
    /// proportion space; a missing end derivative falls back to quadratic
    /// interpolation against the other end, or a straight proportion-space
    /// line when neither is given. Returns `element_count + 1` points with
    /// curve derivative `d1`, in-surface normal `d2`, unit surface normal
    /// `d3` and surface proportions.
    #[allow(clippy::too_many_arguments)]
    pub fn create_hermite_curve_points(
        &self,
        a_proportion: (f64, f64),
        b_proportion: (f64, f64),
        element_count: usize,
        derivative_start: Option<&Vec3>,
        derivative_end: Option<&Vec3>,
        mode: HermiteCurveMode,
    ) -> SurfaceCurvePoints {
        assert!(element_count > 0);
        let count = element_count as f64;
        let ec1 = self.elements_count1() as f64;
        let ec2 = self.elements_count2() as f64;
        // end derivatives in proportion space, with per-element magnitudes
        let mut dp_start: Option<(Vec2, f64)> = derivative_start.map(|direction| {
            let position = self.position_from_proportion(a_proportion.0, a_proportion.1);
            let (_, sd1, sd2) = self.evaluate_derivatives(position);
            let (dxi1, dxi2) = surface_delta_xi(&sd1, &sd2, direction);
            let dp = Vec2::new(dxi1 / ec1, dxi2 / ec2);
            (count * dp, dp.norm())
        });
        let mut dp_end: Option<(Vec2, f64)> = derivative_end.map(|direction| {
            let position = self.position_from_proportion(b_proportion.0, b_proportion.1);
            let (_, sd1, sd2) = self.evaluate_derivatives(position);
            let (dxi1, dxi2) = surface_delta_xi(&sd1, &sd2, direction);
            let dp = Vec2::new(dxi1 / ec1, dxi2 / ec2);
            (count * dp, dp.norm())
        });
        let a = Vec2::new(a_proportion.0, a_proportion.1);
        let b = Vec2::new(b_proportion.0, b_proportion.1);
        if dp_start.is_none() {
            let dp = match &dp_end {
                Some((de, _)) => interpolate_lagrange_hermite_derivative(&a, &b, de, 0.0),
                None => b - a,
            };
            dp_start = Some((dp, dp.norm() / count));
        }
        if dp_end.is_none() {
            let dp = if derivative_start.is_some() {
                let (ds, _) = dp_start.as_ref().expect("start derivative set above");
                interpolate_hermite_lagrange_derivative(&a, ds, &b, 1.0)
            } else {
                b - a
            };
            dp_end = Some((dp, dp.norm() / count));
        }
        let (dp_start, magnitude_start) = dp_start.expect("set above");
        let (dp_end, magnitude_end) = dp_end.expect("set above");
        let (mut proportions, mut dproportions) = sample_cubic_hermite_curves_smooth(
            &[a, b],
            &[dp_start, dp_end],
            element_count,
            Some(magnitude_start),
            Some(magnitude_end),
        );
        if mode != HermiteCurveMode::Smooth {
            let transition_start = derivative_start.is_some()
                && matches!(
                    mode,
                    HermiteCurveMode::TransitionStart | HermiteCurveMode::TransitionStartAndEnd
                );
            let transition_end = derivative_end.is_some()
                && matches!(
                    mode,
                    HermiteCurveMode::TransitionEnd | HermiteCurveMode::TransitionStartAndEnd
                );
            let (add_start, fraction_start) = if transition_start {
                (0.5 * magnitude_start, 0.5)
            } else {
                (0.0, 1.0)
            };
            let (add_end, fraction_end) = if transition_end {
                (0.5 * magnitude_end, 0.5)
            } else {
                (0.0, 1.0)
            };
            let resampled = sample_cubic_hermite_curves(
                &proportions,
                &dproportions,
                element_count,
                add_start,
                add_end,
                fraction_start,
                fraction_end,
            );
            proportions = resampled.0;
            dproportions = resampled.1;
        }
        let mut points = Vec::with_capacity(element_count + 1);
        let mut d1 = Vec::with_capacity(element_count + 1);
        let mut d2 = Vec::with_capacity(element_count + 1);
        let mut d3 = Vec::with_capacity(element_count + 1);
        let mut out_proportions = Vec::with_capacity(element_count + 1);
        for (proportion, dproportion) in proportions.iter().zip(&dproportions) {
            let position = self.position_from_proportion(proportion.x, proportion.y);
            let (x, sd1, sd2) = self.evaluate_derivatives(position);
            let f1 = dproportion.x * ec1;
            let f2 = dproportion.y * ec2;
            let cd1 = f1 * sd1 + f2 * sd2;
            let mut cd3 = sd1.cross(&sd2);
            let mag3 = cd3.norm();
            if mag3 > 0.0 {
                cd3 /= mag3;
            }
            let cd2 = cd3.cross(&cd1);
            points.push(x);
            d1.push(cd1);
            d2.push(cd2);
            d3.push(cd3);
            out_proportions.push((proportion.x, proportion.y));
        }
        SurfaceCurvePoints {
            points,
            d1,
            d2,
            d3,
            proportions: out_proportions,
        }
    }

    /// Re-space on-surface curve points with optional end derivative
    /// magnitudes, re-projecting interior points onto the surface and
    /// rebuilding the in-surface axes.
    pub fn resample_hermite_curve_points_smooth(
        &self,
        curve: &SurfaceCurvePoints,
        derivative_magnitude_start: Option<f64>,
        derivative_magnitude_end: Option<f64>,
    ) -> SurfaceCurvePoints {
        let element_count = curve.points.len() - 1;
        assert!(element_count > 0);
        let cxv: Vec<Vec3> = curve.points.iter().map(|p| p.coords).collect();
        let (nx, nd1) = sample_cubic_hermite_curves_smooth(
            &cxv,
            &curve.d1,
            element_count,
            derivative_magnitude_start,
            derivative_magnitude_end,
        );
        let points: Vec<Point3> = nx.iter().map(|x| Point3::from(*x)).collect();
        let mut d2 = curve.d2.clone();
        let mut d3 = curve.d3.clone();
        let mut proportions = curve.proportions.clone();
        if d2[0].norm() > 0.0 {
            d2[0] = set_magnitude(&d2[0], nd1[0].norm());
        }
        for n in 1..element_count {
            let start = self.position_from_proportion(proportions[n].0, proportions[n].1);
            let position = self.find_nearest_position(&points[n], Some(start)).0;
            proportions[n] = self.proportion(position);
            let (_, sd1, sd2) = self.evaluate_derivatives(position);
            let direction = set_magnitude(&nd1[n], 1.0);
            let (_, ax2, ax3) = surface_axes(&sd1, &sd2, &direction);
            d2[n] = set_magnitude(&ax2, nd1[n].norm());
            d3[n] = ax3;
        }
        if d2[element_count].norm() > 0.0 {
            d2[element_count] = set_magnitude(&d2[element_count], nd1[element_count].norm());
        }
        SurfaceCurvePoints {
            points,
            d1: nd1,
            d2,
            d3,
            proportions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::flat_surface;

    #[test]
    fn test_curve_intersects_surface() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        // vertical segment piercing the patch at (0.5, 1.0, 0.0)
        let cx = vec![Point3::new(0.5, 1.0, -1.0), Point3::new(0.5, 1.0, 1.0)];
        let cd1 = vec![Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 0.0, 2.0)];
        let projection = surface.find_nearest_position_on_curve(&cx, &cd1, false, None, 4);
        assert!(projection.intersection);
        assert!((projection.curve_location.xi - 0.5).abs() < 1.0e-4);
        let x = surface.evaluate(projection.surface_position);
        assert!((x - Point3::new(0.5, 1.0, 0.0)).norm() < 1.0e-4);
    }

    #[test]
    fn test_curve_nearest_at_curve_end() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        // slanted segment rising away from the patch; nearest is its start
        let cx = vec![Point3::new(0.5, 0.5, 0.5), Point3::new(2.5, 0.5, 1.5)];
        let cd1 = vec![Vec3::new(2.0, 0.0, 1.0), Vec3::new(2.0, 0.0, 1.0)];
        let projection = surface.find_nearest_position_on_curve(&cx, &cd1, false, None, 4);
        assert!(!projection.intersection);
        assert_eq!(projection.curve_location.element, 0);
        assert!(projection.curve_location.xi < 1.0e-6);
        let x = surface.evaluate(projection.surface_position);
        assert!((x - Point3::new(0.5, 0.5, 0.0)).norm() < 1.0e-3, "x {x:?}");
    }

    #[test]
    fn test_create_hermite_curve_points_straight() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        let curve = surface.create_hermite_curve_points(
            (0.25, 0.25),
            (0.75, 0.25),
            4,
            None,
            None,
            HermiteCurveMode::Smooth,
        );
        assert_eq!(curve.points.len(), 5);
        for (n, point) in curve.points.iter().enumerate() {
            let expected = Point3::new(0.5 + 0.25 * n as f64, 0.5, 0.0);
            assert!((point - expected).norm() < 1.0e-6, "point {point:?}");
        }
        for n in 0..5 {
            assert!((curve.d1[n] - Vec3::new(0.25, 0.0, 0.0)).norm() < 1.0e-6);
            assert!((curve.d3[n] - Vec3::z()).norm() < 1.0e-9);
            assert!((curve.d2[n] - Vec3::new(0.0, 0.25, 0.0)).norm() < 1.0e-6);
        }
    }

    #[test]
    fn test_create_hermite_curve_points_matches_start_derivative() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        let start_derivative = Vec3::new(0.1, 0.0, 0.0);
        let curve = surface.create_hermite_curve_points(
            (0.25, 0.25),
            (0.75, 0.25),
            4,
            Some(&start_derivative),
            None,
            HermiteCurveMode::Smooth,
        );
        // first element shorter than the last, matching the small start
        // derivative
        let first = (curve.points[1] - curve.points[0]).norm();
        let last = (curve.points[4] - curve.points[3]).norm();
        assert!(first < last, "first {first}, last {last}");
        assert!((curve.d1[0].norm() - 0.1).abs() < 0.02, "d1[0] {:?}", curve.d1[0]);
    }

    #[test]
    fn test_resample_hermite_curve_points() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        let curve = surface.create_hermite_curve_points(
            (0.25, 0.25),
            (0.75, 0.25),
            4,
            None,
            None,
            HermiteCurveMode::Smooth,
        );
        let resampled = surface.resample_hermite_curve_points_smooth(&curve, Some(0.1), None);
        assert_eq!(resampled.points.len(), 5);
        // same span, graded spacing
        assert!((resampled.points[0] - curve.points[0]).norm() < 1.0e-9);
        assert!((resampled.points[4] - curve.points[4]).norm() < 1.0e-6);
        assert!((resampled.d1[0].norm() - 0.1).abs() < 1.0e-6);
        let first = (resampled.points[1] - resampled.points[0]).norm();
        let last = (resampled.points[4] - resampled.points[3]).norm();
        assert!(first < last);
        for n in 0..5 {
            assert!((resampled.d3[n] - Vec3::z()).norm() < 1.0e-9, "d3 {:?}", resampled.d3[n]);
        }
    }
}
