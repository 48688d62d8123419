#![warn(missing_docs)]

//! Cubic Hermite interpolation primitives for the trellis kernel.
//!
//! Provides the 1-D building blocks the surface kernel composes into
//! tensor-product patch evaluation and curve queries: basis functions,
//! interpolation, arc length by Gauss quadrature, stepping of locations
//! along Hermite polyline curves, arc-length resampling, and derivative
//! smoothing for open and closed chains.
//!
//! Functions are generic over the vector dimension: the kernel samples both
//! 3-D world-coordinate curves and 2-D surface-proportion curves with the
//! same routines.
//!
//! # Algorithms
//!
//! - **4-point Gauss–Legendre quadrature** for element arc length
//! - **Fixed-point rescaling** for arc length with unit end directions
//! - **Arc-length linearized resampling** for equal-sized elements
//! - **Iterative magnitude smoothing** (arithmetic mean of adjacent
//!   element arc lengths) for derivative chains

use nalgebra::SVector;

// =============================================================================
// Basis functions
// =============================================================================

/// Cubic Hermite basis function values at `xi`.
///
/// Returns `[f1, f2, f3, f4]` weighting start value, start derivative,
/// end value and end derivative. Valid for `xi` outside [0, 1] as well
/// (polynomial extrapolation).
pub fn cubic_hermite_basis(xi: f64) -> [f64; 4] {
    let xi2 = xi * xi;
    let xi3 = xi2 * xi;
    [
        1.0 - 3.0 * xi2 + 2.0 * xi3,
        xi - 2.0 * xi2 + xi3,
        3.0 * xi2 - 2.0 * xi3,
        -xi2 + xi3,
    ]
}

/// Derivatives of the cubic Hermite basis functions with respect to `xi`.
pub fn cubic_hermite_basis_derivatives(xi: f64) -> [f64; 4] {
    let xi2 = xi * xi;
    [
        -6.0 * xi + 6.0 * xi2,
        1.0 - 4.0 * xi + 3.0 * xi2,
        6.0 * xi - 6.0 * xi2,
        -2.0 * xi + 3.0 * xi2,
    ]
}

/// Interpolate a cubic Hermite curve segment at `xi`.
pub fn interpolate_cubic_hermite<const D: usize>(
    v1: &SVector<f64, D>,
    d1: &SVector<f64, D>,
    v2: &SVector<f64, D>,
    d2: &SVector<f64, D>,
    xi: f64,
) -> SVector<f64, D> {
    let [f1, f2, f3, f4] = cubic_hermite_basis(xi);
    f1 * v1 + f2 * d1 + f3 * v2 + f4 * d2
}

/// Derivative of a cubic Hermite curve segment with respect to `xi`.
pub fn interpolate_cubic_hermite_derivative<const D: usize>(
    v1: &SVector<f64, D>,
    d1: &SVector<f64, D>,
    v2: &SVector<f64, D>,
    d2: &SVector<f64, D>,
    xi: f64,
) -> SVector<f64, D> {
    let [f1, f2, f3, f4] = cubic_hermite_basis_derivatives(xi);
    f1 * v1 + f2 * d1 + f3 * v2 + f4 * d2
}

/// Derivative of the quadratic interpolating start value + derivative and
/// end value (Hermite–Lagrange), evaluated at `xi`.
pub fn interpolate_hermite_lagrange_derivative<const D: usize>(
    v1: &SVector<f64, D>,
    d1: &SVector<f64, D>,
    v2: &SVector<f64, D>,
    xi: f64,
) -> SVector<f64, D> {
    (-2.0 * xi) * v1 + (1.0 - 2.0 * xi) * d1 + (2.0 * xi) * v2
}

/// Derivative of the quadratic interpolating start value and end value +
/// derivative (Lagrange–Hermite), evaluated at `xi`.
pub fn interpolate_lagrange_hermite_derivative<const D: usize>(
    v1: &SVector<f64, D>,
    v2: &SVector<f64, D>,
    d2: &SVector<f64, D>,
    xi: f64,
) -> SVector<f64, D> {
    (2.0 * xi - 2.0) * v1 + (2.0 - 2.0 * xi) * v2 + (2.0 * xi - 1.0) * d2
}

/// Return `v` rescaled to the given magnitude, or zero if `v` is zero.
pub fn set_magnitude<const D: usize>(v: &SVector<f64, D>, magnitude: f64) -> SVector<f64, D> {
    let norm = v.norm();
    if norm > 0.0 {
        (magnitude / norm) * v
    } else {
        SVector::zeros()
    }
}

// =============================================================================
// Arc length
// =============================================================================

// 4-point Gauss-Legendre abscissae and weights mapped onto [0, 1].
const GAUSS_XI: [f64; 4] = [
    0.069_431_844_202_973_71,
    0.330_009_478_207_571_9,
    0.669_990_521_792_428_1,
    0.930_568_155_797_026_3,
];
const GAUSS_WT: [f64; 4] = [
    0.173_927_422_568_727,
    0.326_072_577_431_273,
    0.326_072_577_431_273,
    0.173_927_422_568_727,
];

/// Arc length of a cubic Hermite segment by 4-point Gauss quadrature.
///
/// Approximate but smooth in the inputs; adequate for the element-sized
/// steps the kernel takes.
pub fn cubic_hermite_arc_length<const D: usize>(
    v1: &SVector<f64, D>,
    d1: &SVector<f64, D>,
    v2: &SVector<f64, D>,
    d2: &SVector<f64, D>,
) -> f64 {
    let mut arc_length = 0.0;
    for i in 0..4 {
        let dm = interpolate_cubic_hermite_derivative(v1, d1, v2, d2, GAUSS_XI[i]);
        arc_length += GAUSS_WT[i] * dm.norm();
    }
    arc_length
}

/// Arc length of a cubic Hermite segment whose end derivatives are rescaled
/// to the arc length itself, found by fixed-point iteration.
///
/// If `rescale_derivatives` is set the iteration starts from the chord
/// length and only the directions of `d1`/`d2` are used; otherwise it starts
/// from the arc length of the segment as given.
pub fn compute_cubic_hermite_arc_length<const D: usize>(
    v1: &SVector<f64, D>,
    d1: &SVector<f64, D>,
    v2: &SVector<f64, D>,
    d2: &SVector<f64, D>,
    rescale_derivatives: bool,
) -> f64 {
    let mut last_arc_length = if rescale_derivatives {
        (v2 - v1).norm()
    } else {
        cubic_hermite_arc_length(v1, d1, v2, d2)
    };
    let u1 = set_magnitude(d1, 1.0);
    let u2 = set_magnitude(d2, 1.0);
    let tol = 1.0e-6;
    let mut arc_length = last_arc_length;
    for _ in 0..100 {
        let d1s = last_arc_length * u1;
        let d2s = last_arc_length * u2;
        arc_length = cubic_hermite_arc_length(v1, &d1s, v2, &d2s);
        if (arc_length - last_arc_length).abs() < tol * arc_length {
            return arc_length;
        }
        last_arc_length = arc_length;
    }
    log::warn!(
        "compute_cubic_hermite_arc_length: max iterations reached, length {}",
        arc_length
    );
    arc_length
}

// =============================================================================
// Curve locations
// =============================================================================

/// A location on a piecewise-Hermite curve: element index and local xi.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveLocation {
    /// Element (segment) index, starting at 0.
    pub element: usize,
    /// Local coordinate in the element, 0.0 <= xi <= 1.0.
    pub xi: f64,
}

impl CurveLocation {
    /// Create a curve location.
    pub fn new(element: usize, xi: f64) -> Self {
        Self { element, xi }
    }
}

/// Which end face of a unit line element an increment crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFace {
    /// Crossed xi = 0.
    Low,
    /// Crossed xi = 1.
    High,
}

/// Increment `xi` by `dxi` limited to [0, 1].
///
/// Returns the new xi and the face crossed, if the increment left the
/// element.
pub fn increment_xi_on_line(xi: f64, dxi: f64) -> (f64, Option<LineFace>) {
    let nxi = xi + dxi;
    if nxi < 0.0 {
        (0.0, Some(LineFace::Low))
    } else if nxi > 1.0 {
        (1.0, Some(LineFace::High))
    } else {
        (nxi, None)
    }
}

/// Move a curve location across the given face to the neighbouring element,
/// wrapping if the curve is closed, else clamping at the curve end.
///
/// Returns the updated location and whether it is clamped on a curve
/// boundary.
pub fn advance_curve_location(
    location: CurveLocation,
    face: LineFace,
    element_count: usize,
    closed: bool,
) -> (CurveLocation, bool) {
    let mut element = location.element;
    let mut xi = location.xi;
    let mut on_boundary = false;
    match face {
        LineFace::Low => {
            if element > 0 {
                element -= 1;
                xi = 1.0;
            } else if closed {
                element = element_count - 1;
                xi = 1.0;
            } else {
                xi = 0.0;
                on_boundary = true;
            }
        }
        LineFace::High => {
            if element + 1 < element_count {
                element += 1;
                xi = 0.0;
            } else if closed {
                element = 0;
                xi = 0.0;
            } else {
                xi = 1.0;
                on_boundary = true;
            }
        }
    }
    (CurveLocation::new(element, xi), on_boundary)
}

/// Evaluate coordinates on a piecewise-Hermite curve at a location.
///
/// `closed` curves wrap the final element back to the first node.
pub fn evaluate_curve_point<const D: usize>(
    cx: &[SVector<f64, D>],
    cd1: &[SVector<f64, D>],
    location: CurveLocation,
    closed: bool,
) -> SVector<f64, D> {
    let (n1, n2) = curve_element_nodes(cx.len(), location.element, closed);
    interpolate_cubic_hermite(&cx[n1], &cd1[n1], &cx[n2], &cd1[n2], location.xi)
}

/// Evaluate coordinates and xi-derivative on a piecewise-Hermite curve.
pub fn evaluate_curve_point_and_derivative<const D: usize>(
    cx: &[SVector<f64, D>],
    cd1: &[SVector<f64, D>],
    location: CurveLocation,
    closed: bool,
) -> (SVector<f64, D>, SVector<f64, D>) {
    let (n1, n2) = curve_element_nodes(cx.len(), location.element, closed);
    (
        interpolate_cubic_hermite(&cx[n1], &cd1[n1], &cx[n2], &cd1[n2], location.xi),
        interpolate_cubic_hermite_derivative(&cx[n1], &cd1[n1], &cx[n2], &cd1[n2], location.xi),
    )
}

fn curve_element_nodes(node_count: usize, element: usize, closed: bool) -> (usize, usize) {
    let n1 = element;
    let n2 = if closed { (element + 1) % node_count } else { element + 1 };
    (n1, n2)
}

// =============================================================================
// Resampling
// =============================================================================

/// Resample a piecewise-Hermite curve into `count_out` elements.
///
/// Element lengths are uniform apart from optional start/end adjustments:
/// `add_length_start`/`add_length_end` add fixed extra length to the first
/// and last elements, and `length_fraction_start`/`length_fraction_end`
/// scale them as fractions of the mid-element length (0.5 gives half-length
/// transition elements). Derivatives in the input chain are first rescaled
/// per element to its arc length, and locations along each element are found
/// by arc-length linearization. Output derivative magnitudes are the mean
/// of adjacent output element lengths.
///
/// Returns the resampled points and derivatives (`count_out + 1` of each).
pub fn sample_cubic_hermite_curves<const D: usize>(
    nx: &[SVector<f64, D>],
    nd1: &[SVector<f64, D>],
    count_out: usize,
    add_length_start: f64,
    add_length_end: f64,
    length_fraction_start: f64,
    length_fraction_end: f64,
) -> (Vec<SVector<f64, D>>, Vec<SVector<f64, D>>) {
    let elements_in = nx.len() - 1;
    assert!(
        elements_in > 0 && nd1.len() == nx.len() && count_out > 0,
        "sample_cubic_hermite_curves: invalid arguments"
    );
    // rescale derivatives per input element to its arc length
    let mut lengths = Vec::with_capacity(elements_in + 1);
    lengths.push(0.0);
    let mut nd1a = Vec::with_capacity(elements_in);
    let mut nd1b = Vec::with_capacity(elements_in);
    let mut length = 0.0;
    for e in 0..elements_in {
        let arc_length =
            compute_cubic_hermite_arc_length(&nx[e], &nd1[e], &nx[e + 1], &nd1[e + 1], true);
        nd1a.push(set_magnitude(&nd1[e], arc_length));
        nd1b.push(set_magnitude(&nd1[e + 1], arc_length));
        length += arc_length;
        lengths.push(length);
    }
    // output element lengths: mid length chosen so the total is exact
    let proportion_end = 2.0 * length_fraction_end / (length_fraction_start + length_fraction_end);
    let proportion_start = 2.0 - proportion_end;
    let element_length_mid = if count_out == 1 {
        length
    } else {
        (length - add_length_start - add_length_end)
            / (count_out as f64 - 2.0
                + proportion_start * length_fraction_start
                + proportion_end * length_fraction_end)
    };
    let mut element_lengths = vec![element_length_mid; count_out];
    if count_out > 1 {
        element_lengths[0] =
            add_length_start + length_fraction_start * proportion_start * element_length_mid;
        element_lengths[count_out - 1] =
            add_length_end + length_fraction_end * proportion_end * element_length_mid;
    }

    let mut px = Vec::with_capacity(count_out + 1);
    let mut pd1 = Vec::with_capacity(count_out + 1);
    let mut distance = 0.0;
    for n in 0..=count_out {
        let (x, d) = point_at_arc_distance(nx, &nd1a, &nd1b, &lengths, distance);
        let mag = if n == 0 {
            element_lengths[0]
        } else if n == count_out {
            element_lengths[count_out - 1]
        } else {
            0.5 * (element_lengths[n - 1] + element_lengths[n])
        };
        px.push(x);
        pd1.push(set_magnitude(&d, mag));
        if n < count_out {
            distance += element_lengths[n];
        }
    }
    (px, pd1)
}

/// Resample a piecewise-Hermite curve into `count_out` elements whose sizes
/// vary linearly between optional start and end derivative magnitudes.
///
/// If only one end magnitude is supplied the other is chosen so the sizes
/// still sum to the curve length; if neither is supplied the result is
/// uniform.
pub fn sample_cubic_hermite_curves_smooth<const D: usize>(
    nx: &[SVector<f64, D>],
    nd1: &[SVector<f64, D>],
    count_out: usize,
    derivative_magnitude_start: Option<f64>,
    derivative_magnitude_end: Option<f64>,
) -> (Vec<SVector<f64, D>>, Vec<SVector<f64, D>>) {
    let elements_in = nx.len() - 1;
    assert!(
        elements_in > 0 && nd1.len() == nx.len() && count_out > 0,
        "sample_cubic_hermite_curves_smooth: invalid arguments"
    );
    let mut lengths = Vec::with_capacity(elements_in + 1);
    lengths.push(0.0);
    let mut nd1a = Vec::with_capacity(elements_in);
    let mut nd1b = Vec::with_capacity(elements_in);
    let mut length = 0.0;
    for e in 0..elements_in {
        let arc_length =
            compute_cubic_hermite_arc_length(&nx[e], &nd1[e], &nx[e + 1], &nd1[e + 1], true);
        nd1a.push(set_magnitude(&nd1[e], arc_length));
        nd1b.push(set_magnitude(&nd1[e + 1], arc_length));
        length += arc_length;
        lengths.push(length);
    }
    let count = count_out as f64;
    let (mag_start, mag_end) = match (derivative_magnitude_start, derivative_magnitude_end) {
        (Some(s), Some(e)) => (s, e),
        (Some(s), None) => (s, (2.0 * length - count * s) / count),
        (None, Some(e)) => ((2.0 * length - count * e) / count, e),
        (None, None) => (length / count, length / count),
    };
    // distance along the curve for linearly varying element size; normalized
    // so the final node lands exactly on the curve end
    let distance_at = |u: f64| count * (mag_start * u + 0.5 * (mag_end - mag_start) * u * u);
    let scale = if distance_at(1.0) > 0.0 {
        length / distance_at(1.0)
    } else {
        1.0
    };
    let mut px = Vec::with_capacity(count_out + 1);
    let mut pd1 = Vec::with_capacity(count_out + 1);
    for n in 0..=count_out {
        let u = n as f64 / count;
        let (x, d) = point_at_arc_distance(nx, &nd1a, &nd1b, &lengths, scale * distance_at(u));
        let mag = scale * (mag_start + (mag_end - mag_start) * u);
        px.push(x);
        pd1.push(set_magnitude(&d, mag));
    }
    (px, pd1)
}

/// Point and (unscaled) derivative at an arc distance along a chain whose
/// derivatives have been rescaled per element to the element arc length.
fn point_at_arc_distance<const D: usize>(
    nx: &[SVector<f64, D>],
    nd1a: &[SVector<f64, D>],
    nd1b: &[SVector<f64, D>],
    lengths: &[f64],
    distance: f64,
) -> (SVector<f64, D>, SVector<f64, D>) {
    let elements_in = nd1a.len();
    let mut e = 0;
    while (e + 1 < elements_in) && (distance >= lengths[e + 1]) {
        e += 1;
    }
    let element_length = lengths[e + 1] - lengths[e];
    let xi = if element_length > 0.0 {
        ((distance - lengths[e]) / element_length).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (
        interpolate_cubic_hermite(&nx[e], &nd1a[e], &nx[e + 1], &nd1b[e], xi),
        interpolate_cubic_hermite_derivative(&nx[e], &nd1a[e], &nx[e + 1], &nd1b[e], xi),
    )
}

// =============================================================================
// Derivative smoothing
// =============================================================================

/// Smooth derivative magnitudes along an open Hermite chain, keeping
/// directions fixed.
///
/// Interior nodes take the arithmetic mean of adjacent element arc lengths;
/// end nodes take twice the end element arc length less the neighbour's
/// magnitude. Iterates until element arc lengths settle.
pub fn smooth_cubic_hermite_derivatives_line<const D: usize>(
    nx: &[SVector<f64, D>],
    nd1: &[SVector<f64, D>],
) -> Vec<SVector<f64, D>> {
    let node_count = nx.len();
    let element_count = node_count - 1;
    assert!(element_count > 0 && nd1.len() == node_count);
    let mut md1: Vec<SVector<f64, D>> = nd1.to_vec();
    let tol = 1.0e-6;
    let mut last_arc_lengths: Option<Vec<f64>> = None;
    for _ in 0..100 {
        let arc_lengths: Vec<f64> = (0..element_count)
            .map(|e| cubic_hermite_arc_length(&nx[e], &md1[e], &nx[e + 1], &md1[e + 1]))
            .collect();
        if let Some(last) = &last_arc_lengths {
            let converged = (0..element_count)
                .all(|e| (arc_lengths[e] - last[e]).abs() <= tol * arc_lengths[e]);
            if converged {
                return md1;
            }
        }
        for n in 0..node_count {
            if n == 0 {
                let mag = 2.0 * arc_lengths[0] - md1[1].norm();
                md1[0] = if mag > 0.0 {
                    set_magnitude(&nd1[0], mag)
                } else {
                    SVector::zeros()
                };
            } else if n < element_count {
                let mag = 0.5 * (arc_lengths[n - 1] + arc_lengths[n]);
                md1[n] = set_magnitude(&nd1[n], mag);
            } else {
                let mag = 2.0 * arc_lengths[element_count - 1] - md1[element_count - 1].norm();
                md1[n] = if mag > 0.0 {
                    set_magnitude(&nd1[n], mag)
                } else {
                    SVector::zeros()
                };
            }
        }
        last_arc_lengths = Some(arc_lengths);
    }
    log::warn!("smooth_cubic_hermite_derivatives_line: max iterations reached");
    md1
}

/// Smooth derivative magnitudes around a closed Hermite chain, keeping
/// directions fixed.
///
/// Every node takes the arithmetic mean of its two adjacent element arc
/// lengths, with wraparound.
pub fn smooth_cubic_hermite_derivatives_loop<const D: usize>(
    nx: &[SVector<f64, D>],
    nd1: &[SVector<f64, D>],
) -> Vec<SVector<f64, D>> {
    let node_count = nx.len();
    assert!(node_count > 1 && nd1.len() == node_count);
    let mut md1: Vec<SVector<f64, D>> = nd1.to_vec();
    let tol = 1.0e-6;
    let mut last_arc_lengths: Option<Vec<f64>> = None;
    for _ in 0..100 {
        let arc_lengths: Vec<f64> = (0..node_count)
            .map(|e| {
                let f = (e + 1) % node_count;
                cubic_hermite_arc_length(&nx[e], &md1[e], &nx[f], &md1[f])
            })
            .collect();
        if let Some(last) = &last_arc_lengths {
            let converged = (0..node_count)
                .all(|e| (arc_lengths[e] - last[e]).abs() <= tol * arc_lengths[e]);
            if converged {
                return md1;
            }
        }
        for n in 0..node_count {
            let prev = (n + node_count - 1) % node_count;
            let mag = 0.5 * (arc_lengths[prev] + arc_lengths[n]);
            md1[n] = set_magnitude(&nd1[n], mag);
        }
        last_arc_lengths = Some(arc_lengths);
    }
    log::warn!("smooth_cubic_hermite_derivatives_loop: max iterations reached");
    md1
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    type V3 = Vector3<f64>;

    #[test]
    fn test_basis_corner_values() {
        let f0 = cubic_hermite_basis(0.0);
        assert_eq!(f0, [1.0, 0.0, 0.0, 0.0]);
        let f1 = cubic_hermite_basis(1.0);
        assert_eq!(f1, [0.0, 0.0, 1.0, 0.0]);
        let d0 = cubic_hermite_basis_derivatives(0.0);
        assert_eq!(d0, [0.0, 1.0, 0.0, 0.0]);
        let d1 = cubic_hermite_basis_derivatives(1.0);
        assert_eq!(d1, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_basis_partition_of_unity() {
        for i in 0..=10 {
            let xi = i as f64 / 10.0;
            let f = cubic_hermite_basis(xi);
            assert_relative_eq!(f[0] + f[2], 1.0, epsilon = 1.0e-12);
            let df = cubic_hermite_basis_derivatives(xi);
            assert_relative_eq!(df[0] + df[2], 0.0, epsilon = 1.0e-12);
        }
    }

    #[test]
    fn test_interpolate_endpoints() {
        let v1 = V3::new(0.0, 0.0, 0.0);
        let d1 = V3::new(1.0, 0.0, 0.0);
        let v2 = V3::new(1.0, 1.0, 0.0);
        let d2 = V3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(interpolate_cubic_hermite(&v1, &d1, &v2, &d2, 0.0), v1);
        assert_relative_eq!(interpolate_cubic_hermite(&v1, &d1, &v2, &d2, 1.0), v2);
        assert_relative_eq!(
            interpolate_cubic_hermite_derivative(&v1, &d1, &v2, &d2, 0.0),
            d1
        );
        assert_relative_eq!(
            interpolate_cubic_hermite_derivative(&v1, &d1, &v2, &d2, 1.0),
            d2
        );
    }

    #[test]
    fn test_arc_length_straight_line() {
        let v1 = V3::new(0.0, 0.0, 0.0);
        let v2 = V3::new(3.0, 0.0, 0.0);
        let d = V3::new(3.0, 0.0, 0.0);
        assert_relative_eq!(cubic_hermite_arc_length(&v1, &d, &v2, &d), 3.0, epsilon = 1.0e-9);
    }

    #[test]
    fn test_arc_length_quarter_circle() {
        // quarter unit circle: derivative magnitude pi/2 at both ends
        let h = std::f64::consts::FRAC_PI_2;
        let v1 = V3::new(1.0, 0.0, 0.0);
        let d1 = V3::new(0.0, h, 0.0);
        let v2 = V3::new(0.0, 1.0, 0.0);
        let d2 = V3::new(-h, 0.0, 0.0);
        let length = cubic_hermite_arc_length(&v1, &d1, &v2, &d2);
        assert!((length - h).abs() < 0.01 * h);
    }

    #[test]
    fn test_compute_arc_length_rescaled() {
        // chord start, unit directions: converges to near quarter-circle length
        let v1 = V3::new(1.0, 0.0, 0.0);
        let d1 = V3::new(0.0, 1.0, 0.0);
        let v2 = V3::new(0.0, 1.0, 0.0);
        let d2 = V3::new(-1.0, 0.0, 0.0);
        let length = compute_cubic_hermite_arc_length(&v1, &d1, &v2, &d2, true);
        assert!((length - std::f64::consts::FRAC_PI_2).abs() < 0.02);
    }

    #[test]
    fn test_hermite_lagrange_derivatives() {
        // quadratic with p(0)=v1, p'(0)=d1, p(1)=v2
        let v1 = V3::new(0.0, 0.0, 0.0);
        let d1 = V3::new(1.0, 0.0, 0.0);
        let v2 = V3::new(2.0, 1.0, 0.0);
        let d_start = interpolate_hermite_lagrange_derivative(&v1, &d1, &v2, 0.0);
        assert_relative_eq!(d_start, d1);
        // end derivative is 2(v2 - v1) - d1
        let d_end = interpolate_hermite_lagrange_derivative(&v1, &d1, &v2, 1.0);
        assert_relative_eq!(d_end, V3::new(3.0, 2.0, 0.0));
        // Lagrange-Hermite mirror: p(0)=v1, p(1)=v2, p'(1)=d2
        let d2 = V3::new(1.0, 0.0, 0.0);
        let e_end = interpolate_lagrange_hermite_derivative(&v1, &v2, &d2, 1.0);
        assert_relative_eq!(e_end, d2);
        let e_start = interpolate_lagrange_hermite_derivative(&v1, &v2, &d2, 0.0);
        assert_relative_eq!(e_start, V3::new(3.0, 2.0, 0.0));
    }

    #[test]
    fn test_increment_xi_on_line() {
        assert_eq!(increment_xi_on_line(0.5, 0.2), (0.7, None));
        let (xi, face) = increment_xi_on_line(0.5, 0.8);
        assert_eq!(xi, 1.0);
        assert_eq!(face, Some(LineFace::High));
        let (xi, face) = increment_xi_on_line(0.1, -0.5);
        assert_eq!(xi, 0.0);
        assert_eq!(face, Some(LineFace::Low));
    }

    #[test]
    fn test_advance_curve_location() {
        // interior crossing
        let (loc, on_boundary) =
            advance_curve_location(CurveLocation::new(1, 1.0), LineFace::High, 3, false);
        assert_eq!(loc, CurveLocation::new(2, 0.0));
        assert!(!on_boundary);
        // open curve end clamps
        let (loc, on_boundary) =
            advance_curve_location(CurveLocation::new(2, 1.0), LineFace::High, 3, false);
        assert_eq!(loc, CurveLocation::new(2, 1.0));
        assert!(on_boundary);
        // closed curve wraps
        let (loc, on_boundary) =
            advance_curve_location(CurveLocation::new(2, 1.0), LineFace::High, 3, true);
        assert_eq!(loc, CurveLocation::new(0, 0.0));
        assert!(!on_boundary);
        let (loc, on_boundary) =
            advance_curve_location(CurveLocation::new(0, 0.0), LineFace::Low, 3, true);
        assert_eq!(loc, CurveLocation::new(2, 1.0));
        assert!(!on_boundary);
    }

    #[test]
    fn test_evaluate_curve_closed_wraps() {
        // triangle loop
        let cx = vec![
            V3::new(0.0, 0.0, 0.0),
            V3::new(1.0, 0.0, 0.0),
            V3::new(0.5, 1.0, 0.0),
        ];
        let cd1 = vec![
            V3::new(1.0, 0.0, 0.0),
            V3::new(-0.5, 1.0, 0.0),
            V3::new(-0.5, -1.0, 0.0),
        ];
        // final element ends back at the first node
        let p = evaluate_curve_point(&cx, &cd1, CurveLocation::new(2, 1.0), true);
        assert_relative_eq!(p, cx[0]);
    }

    #[test]
    fn test_sample_uniform_straight_line() {
        let nx = vec![V3::new(0.0, 0.0, 0.0), V3::new(4.0, 0.0, 0.0)];
        let nd1 = vec![V3::new(4.0, 0.0, 0.0), V3::new(4.0, 0.0, 0.0)];
        let (px, pd1) = sample_cubic_hermite_curves(&nx, &nd1, 4, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(px.len(), 5);
        for (n, p) in px.iter().enumerate() {
            assert_relative_eq!(p.x, n as f64, epsilon = 1.0e-6);
        }
        for d in &pd1 {
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1.0e-6);
        }
    }

    #[test]
    fn test_sample_transition_start() {
        // half-length first element plus added start length keeps totals exact
        let nx = vec![V3::new(0.0, 0.0, 0.0), V3::new(6.0, 0.0, 0.0)];
        let nd1 = vec![V3::new(6.0, 0.0, 0.0), V3::new(6.0, 0.0, 0.0)];
        let (px, pd1) = sample_cubic_hermite_curves(&nx, &nd1, 3, 0.0, 0.0, 0.5, 1.0);
        assert_eq!(px.len(), 4);
        assert_relative_eq!(px[0].x, 0.0, epsilon = 1.0e-9);
        assert_relative_eq!(px[3].x, 6.0, epsilon = 1.0e-6);
        // first element shorter than the rest
        let len0 = px[1].x - px[0].x;
        let len1 = px[2].x - px[1].x;
        assert!(len0 < len1);
        assert!(pd1[0].norm() < pd1[2].norm());
    }

    #[test]
    fn test_sample_smooth_end_magnitudes() {
        let nx = vec![V3::new(0.0, 0.0, 0.0), V3::new(8.0, 0.0, 0.0)];
        let nd1 = vec![V3::new(8.0, 0.0, 0.0), V3::new(8.0, 0.0, 0.0)];
        let (px, pd1) = sample_cubic_hermite_curves_smooth(&nx, &nd1, 4, Some(1.0), None);
        assert_eq!(px.len(), 5);
        assert_relative_eq!(px[0].x, 0.0, epsilon = 1.0e-9);
        assert_relative_eq!(px[4].x, 8.0, epsilon = 1.0e-6);
        assert_relative_eq!(pd1[0].norm(), 1.0, epsilon = 1.0e-6);
        // sizes grow monotonically from the small start derivative
        assert!(px[1].x - px[0].x < px[2].x - px[1].x);
        assert!(px[2].x - px[1].x < px[3].x - px[2].x);
    }

    #[test]
    fn test_smooth_line_magnitudes() {
        // straight chain: element arc lengths stay 1, so interior nodes get
        // the mean (1) and ends get 2*arc - neighbour magnitude
        let nx = vec![
            V3::new(0.0, 0.0, 0.0),
            V3::new(1.0, 0.0, 0.0),
            V3::new(2.0, 0.0, 0.0),
        ];
        let nd1 = vec![
            V3::new(0.8, 0.0, 0.0),
            V3::new(1.5, 0.0, 0.0),
            V3::new(0.9, 0.0, 0.0),
        ];
        let md1 = smooth_cubic_hermite_derivatives_line(&nx, &nd1);
        assert!((md1[1].norm() - 1.0).abs() < 1.0e-6, "mid {}", md1[1].norm());
        assert!((md1[0].norm() - 0.5).abs() < 1.0e-6, "start {}", md1[0].norm());
        assert!((md1[2].norm() - 1.0).abs() < 1.0e-6, "end {}", md1[2].norm());
    }

    #[test]
    fn test_smooth_loop_even_spacing() {
        // square loop, perimeter 4
        let nx = vec![
            V3::new(0.0, 0.0, 0.0),
            V3::new(1.0, 0.0, 0.0),
            V3::new(1.0, 1.0, 0.0),
            V3::new(0.0, 1.0, 0.0),
        ];
        let nd1 = vec![
            V3::new(2.0, 0.0, 0.0),
            V3::new(0.0, 0.5, 0.0),
            V3::new(-1.0, 0.0, 0.0),
            V3::new(0.0, -1.5, 0.0),
        ];
        let md1 = smooth_cubic_hermite_derivatives_loop(&nx, &nd1);
        let mean: f64 = md1.iter().map(|d| d.norm()).sum::<f64>() / 4.0;
        for d in &md1 {
            assert!((d.norm() - mean).abs() < 0.2 * mean);
        }
    }
}
