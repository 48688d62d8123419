//! The lattice surface: construction, evaluation, proportions, boundary
//! logic and the shared tangent-plane primitives.

use trellis_hermite::{cubic_hermite_basis, cubic_hermite_basis_derivatives};
use trellis_math::{Point3, Tolerance, Vec3};

use crate::{Boundary, SurfaceError, SurfacePosition};

// Proportions closer than this to a surface edge count as on the boundary.
const BOUNDARY_PROPORTION_LIMIT: f64 = 1.0e-7;

/// A surface described by a lattice of square bicubic Hermite elements.
///
/// Nodes are stored flat in row-major order with direction 1 varying
/// fastest. Each node carries a coordinate, derivatives in the two
/// parametric directions, and optionally a cross derivative. Direction 1
/// may loop (periodic), in which case one fewer node column is stored and
/// proportions in that direction run over [0, 2].
///
/// Immutable after construction; all queries take `&self`.
#[derive(Debug, Clone)]
pub struct PatchSurface {
    elements_count1: usize,
    elements_count2: usize,
    nx: Vec<Point3>,
    nd1: Vec<Vec3>,
    nd2: Vec<Vec3>,
    nd12: Option<Vec<Vec3>>,
    loop1: bool,
    x_range: Vec3,
}

impl PatchSurface {
    /// Create a surface from lattice data.
    ///
    /// `nx` holds `(elements_count2 + 1) * columns` node coordinates where
    /// `columns` is `elements_count1` when `loop1` is set and
    /// `elements_count1 + 1` otherwise; `nd1`/`nd2` (and `nd12` when
    /// supplied) must have the same length.
    pub fn new(
        elements_count1: usize,
        elements_count2: usize,
        nx: Vec<Point3>,
        nd1: Vec<Vec3>,
        nd2: Vec<Vec3>,
        nd12: Option<Vec<Vec3>>,
        loop1: bool,
    ) -> Result<Self, SurfaceError> {
        if elements_count1 == 0 || elements_count2 == 0 {
            return Err(SurfaceError::ZeroElementCount);
        }
        let columns = if loop1 {
            elements_count1
        } else {
            elements_count1 + 1
        };
        let expected = columns * (elements_count2 + 1);
        if nx.len() != expected {
            return Err(SurfaceError::NodeCountMismatch {
                expected,
                actual: nx.len(),
            });
        }
        for len in [nd1.len(), nd2.len()] {
            if len != expected {
                return Err(SurfaceError::DerivativeCountMismatch {
                    expected,
                    actual: len,
                });
            }
        }
        if let Some(nd12) = &nd12 {
            if nd12.len() != expected {
                return Err(SurfaceError::DerivativeCountMismatch {
                    expected,
                    actual: nd12.len(),
                });
            }
        }
        // coordinate range, used to derive distance tolerances
        let mut x_min = nx[0];
        let mut x_max = nx[0];
        for x in &nx {
            for c in 0..3 {
                x_min[c] = x_min[c].min(x[c]);
                x_max[c] = x_max[c].max(x[c]);
            }
        }
        Ok(Self {
            elements_count1,
            elements_count2,
            nx,
            nd1,
            nd2,
            nd12,
            loop1,
            x_range: x_max - x_min,
        })
    }

    /// Number of elements in direction 1.
    pub fn elements_count1(&self) -> usize {
        self.elements_count1
    }

    /// Number of elements in direction 2.
    pub fn elements_count2(&self) -> usize {
        self.elements_count2
    }

    /// Whether direction 1 loops back to its start.
    pub fn is_loop1(&self) -> bool {
        self.loop1
    }

    /// Node coordinates, row-major with direction 1 fastest.
    pub fn node_coordinates(&self) -> &[Point3] {
        &self.nx
    }

    /// Absolute coordinate tolerance for this surface, scaled by its extent.
    pub fn x_tolerance(&self) -> f64 {
        Tolerance::DEFAULT.x_absolute(self.x_range.max())
    }

    pub(crate) fn nodes_count1(&self) -> usize {
        if self.loop1 {
            self.elements_count1
        } else {
            self.elements_count1 + 1
        }
    }

    /// Create a new surface mirrored about the x = 0 plane.
    ///
    /// Negates x coordinates and rewinds direction 1 by flipping node order
    /// and derivative signs, so the mirrored surface keeps a right-handed
    /// parameterization.
    pub fn create_mirror_x(&self) -> PatchSurface {
        let nodes_count1 = self.nodes_count1();
        let nodes_count2 = self.elements_count2 + 1;
        let count = nodes_count1 * nodes_count2;
        let mut nx = Vec::with_capacity(count);
        let mut nd1 = Vec::with_capacity(count);
        let mut nd2 = Vec::with_capacity(count);
        let mut nd12 = self.nd12.as_ref().map(|_| Vec::with_capacity(count));
        for n2 in 0..nodes_count2 {
            for n1 in 0..nodes_count1 {
                let oi = n2 * nodes_count1 + (self.elements_count1 - n1) % nodes_count1;
                let ox = self.nx[oi];
                let od1 = self.nd1[oi];
                let od2 = self.nd2[oi];
                nx.push(Point3::new(-ox.x, ox.y, ox.z));
                nd1.push(Vec3::new(od1.x, -od1.y, -od1.z));
                nd2.push(Vec3::new(-od2.x, od2.y, od2.z));
                if let (Some(nd12), Some(ond12)) = (&mut nd12, &self.nd12) {
                    let od12 = ond12[oi];
                    nd12.push(Vec3::new(od12.x, -od12.y, -od12.z));
                }
            }
        }
        PatchSurface::new(
            self.elements_count1,
            self.elements_count2,
            nx,
            nd1,
            nd2,
            nd12,
            self.loop1,
        )
        .expect("mirrored lattice preserves counts")
    }

    // =========================================================================
    // Proportions
    // =========================================================================

    /// Convert proportions across the surface to a position.
    ///
    /// Proportions vary over [0, 1] in each direction ([0, 2] in direction 1
    /// when looping) with equal-sized elements; the top of the range maps to
    /// the last element with xi 1.0. Out-of-range input is a contract
    /// violation.
    pub fn position_from_proportion(&self, proportion1: f64, proportion2: f64) -> SurfacePosition {
        let max_proportion1 = if self.loop1 { 2.0 } else { 1.0 };
        assert!(
            (0.0..=max_proportion1).contains(&proportion1),
            "position_from_proportion: proportion 1 ({proportion1}) out of range"
        );
        assert!(
            (0.0..=1.0).contains(&proportion2),
            "position_from_proportion: proportion 2 ({proportion2}) out of range"
        );
        let max_e1 = if self.loop1 {
            2 * self.elements_count1
        } else {
            self.elements_count1
        };
        let pe1 = proportion1 * self.elements_count1 as f64;
        let (e1, xi1) = if pe1 < max_e1 as f64 {
            let e1 = pe1.floor() as usize;
            (e1, pe1 - e1 as f64)
        } else {
            (max_e1 - 1, 1.0)
        };
        let pe2 = proportion2 * self.elements_count2 as f64;
        let (e2, xi2) = if pe2 < self.elements_count2 as f64 {
            let e2 = pe2.floor() as usize;
            (e2, pe2 - e2 as f64)
        } else {
            (self.elements_count2 - 1, 1.0)
        };
        SurfacePosition::new(e1, e2, xi1, xi2)
    }

    /// Proportions across directions 1 and 2 for a position.
    pub fn proportion(&self, position: SurfacePosition) -> (f64, f64) {
        (
            (position.e1 as f64 + position.xi1) / self.elements_count1 as f64,
            (position.e2 as f64 + position.xi2) / self.elements_count2 as f64,
        )
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    fn element_node_ids(&self, e1: usize, e2: usize) -> [usize; 4] {
        let nodes_count1 = self.nodes_count1();
        let e1 = e1 % self.elements_count1; // handle looped second lap
        let nid0 = e2 * nodes_count1;
        let n1 = nid0 + e1;
        let n2 = if self.loop1 && (e1 + 1 == self.elements_count1) {
            nid0
        } else {
            n1 + 1
        };
        [n1, n2, n1 + nodes_count1, n2 + nodes_count1]
    }

    /// Evaluate coordinates on the surface at a position.
    pub fn evaluate(&self, position: SurfacePosition) -> Point3 {
        let nid = self.element_node_ids(position.e1, position.e2);
        let f1 = cubic_hermite_basis(position.xi1);
        let f2 = cubic_hermite_basis(position.xi2);
        let fx = tensor(f1[0], f1[2], f2[0], f2[2]);
        let fd1 = tensor(f1[1], f1[3], f2[0], f2[2]);
        let fd2 = tensor(f1[0], f1[2], f2[1], f2[3]);
        let mut x = Vec3::zeros();
        for ln in 0..4 {
            let gn = nid[ln];
            x += fx[ln] * self.nx[gn].coords + fd1[ln] * self.nd1[gn] + fd2[ln] * self.nd2[gn];
        }
        if let Some(nd12) = &self.nd12 {
            let fd12 = tensor(f1[1], f1[3], f2[1], f2[3]);
            for ln in 0..4 {
                x += fd12[ln] * nd12[nid[ln]];
            }
        }
        Point3::from(x)
    }

    /// Evaluate coordinates and both xi-derivatives at a position.
    pub fn evaluate_derivatives(&self, position: SurfacePosition) -> (Point3, Vec3, Vec3) {
        let nid = self.element_node_ids(position.e1, position.e2);
        let f1 = cubic_hermite_basis(position.xi1);
        let f2 = cubic_hermite_basis(position.xi2);
        let df1 = cubic_hermite_basis_derivatives(position.xi1);
        let df2 = cubic_hermite_basis_derivatives(position.xi2);
        let fx = tensor(f1[0], f1[2], f2[0], f2[2]);
        let fd1 = tensor(f1[1], f1[3], f2[0], f2[2]);
        let fd2 = tensor(f1[0], f1[2], f2[1], f2[3]);
        let d1fx = tensor(df1[0], df1[2], f2[0], f2[2]);
        let d1fd1 = tensor(df1[1], df1[3], f2[0], f2[2]);
        let d1fd2 = tensor(df1[0], df1[2], f2[1], f2[3]);
        let d2fx = tensor(f1[0], f1[2], df2[0], df2[2]);
        let d2fd1 = tensor(f1[1], f1[3], df2[0], df2[2]);
        let d2fd2 = tensor(f1[0], f1[2], df2[1], df2[3]);
        let mut x = Vec3::zeros();
        let mut d1 = Vec3::zeros();
        let mut d2 = Vec3::zeros();
        for ln in 0..4 {
            let gn = nid[ln];
            let (nx, nd1, nd2) = (self.nx[gn].coords, self.nd1[gn], self.nd2[gn]);
            x += fx[ln] * nx + fd1[ln] * nd1 + fd2[ln] * nd2;
            d1 += d1fx[ln] * nx + d1fd1[ln] * nd1 + d1fd2[ln] * nd2;
            d2 += d2fx[ln] * nx + d2fd1[ln] * nd1 + d2fd2[ln] * nd2;
        }
        if let Some(nd12) = &self.nd12 {
            let fd12 = tensor(f1[1], f1[3], f2[1], f2[3]);
            let d1fd12 = tensor(df1[1], df1[3], f2[1], f2[3]);
            let d2fd12 = tensor(f1[1], f1[3], df2[1], df2[3]);
            for ln in 0..4 {
                let nd12 = nd12[nid[ln]];
                x += fd12[ln] * nd12;
                d1 += d1fd12[ln] * nd12;
                d2 += d2fd12[ln] * nd12;
            }
        }
        (Point3::from(x), d1, d2)
    }

    // =========================================================================
    // Boundary logic
    // =========================================================================

    /// Classify whether a position lies on a surface boundary edge.
    pub fn on_boundary(&self, position: SurfacePosition) -> Boundary {
        let (proportion1, proportion2) = self.proportion(position);
        let upper = 1.0 - BOUNDARY_PROPORTION_LIMIT;
        if proportion2 < BOUNDARY_PROPORTION_LIMIT || proportion2 > upper {
            return Boundary::Xi2;
        }
        if !self.loop1 && (proportion1 < BOUNDARY_PROPORTION_LIMIT || proportion1 > upper) {
            return Boundary::Xi1;
        }
        Boundary::None
    }

    /// Advance a position by an element xi increment, clamped to `max_step`
    /// and to the surface boundary.
    ///
    /// Direction 1 wraps when looping, otherwise clamps like direction 2,
    /// reporting the clamped edge. Returns the new position, the boundary
    /// clamped at (if any), and the actually applied increments so callers
    /// know how much of the intended step was taken.
    pub fn advance(
        &self,
        start: SurfacePosition,
        dxi1: f64,
        dxi2: f64,
        max_step: f64,
    ) -> (SurfacePosition, Boundary, f64, f64) {
        let (start_proportion1, start_proportion2) = self.proportion(start);
        let mut dxi1 = dxi1;
        let mut dxi2 = dxi2;
        let mag_dxi = dxi1.hypot(dxi2);
        if mag_dxi > max_step {
            let factor = max_step / mag_dxi;
            dxi1 *= factor;
            dxi2 *= factor;
        }
        let mut proportion1 = start_proportion1 + dxi1 / self.elements_count1 as f64;
        let mut proportion2 = start_proportion2 + dxi2 / self.elements_count2 as f64;
        let mut boundary = Boundary::None;
        if self.loop1 {
            if proportion1 < 0.0 {
                proportion1 += 1.0;
            } else if proportion1 > 2.0 {
                proportion1 -= 2.0;
            }
        } else if proportion1 < 0.0 {
            proportion1 = 0.0;
            boundary = Boundary::Xi1;
        } else if proportion1 > 1.0 {
            proportion1 = 1.0;
            boundary = Boundary::Xi1;
        }
        if proportion2 < 0.0 {
            proportion2 = 0.0;
            boundary = Boundary::Xi2;
        } else if proportion2 > 1.0 {
            proportion2 = 1.0;
            boundary = Boundary::Xi2;
        }
        if boundary.is_boundary() {
            if !self.loop1 {
                dxi1 = (proportion1 - start_proportion1) * self.elements_count1 as f64;
            }
            dxi2 = (proportion2 - start_proportion2) * self.elements_count2 as f64;
        }
        (
            self.position_from_proportion(proportion1, proportion2),
            boundary,
            dxi1,
            dxi2,
        )
    }

    // =========================================================================
    // Nearest node seeding
    // =========================================================================

    /// Position and distance of the lattice node nearest to `target`.
    ///
    /// Brute-force scan; use to seed [`find_nearest_position`]
    /// (Self::find_nearest_position) and the intersection queries.
    pub fn find_nearest_node(&self, target: &Point3) -> (SurfacePosition, f64) {
        let nodes_count1 = self.nodes_count1();
        let mut nearest_distance = f64::INFINITY;
        let mut nearest_n1 = 0;
        let mut nearest_n2 = 0;
        let mut p = 0;
        for n2 in 0..=self.elements_count2 {
            for n1 in 0..nodes_count1 {
                let distance = (self.nx[p] - target).norm();
                if distance < nearest_distance {
                    nearest_distance = distance;
                    nearest_n1 = n1;
                    nearest_n2 = n2;
                }
                p += 1;
            }
        }
        (
            self.position_from_proportion(
                nearest_n1 as f64 / self.elements_count1 as f64,
                nearest_n2 as f64 / self.elements_count2 as f64,
            ),
            nearest_distance,
        )
    }
}

// basis product over the 4 local nodes, direction-1 pair then direction-2 pair
fn tensor(a1: f64, a2: f64, b1: f64, b2: f64) -> [f64; 4] {
    [a1 * b1, a2 * b1, a1 * b2, a2 * b2]
}

// =============================================================================
// Tangent-plane primitives
// =============================================================================

/// Least-squares xi increment reproducing a 3-D direction in the tangent
/// plane spanned by `d1`, `d2`.
///
/// Solves the 2x2 normal equations of the overdetermined system
/// `dxi1*d1 + dxi2*d2 = direction`. When the system is singular (tangents
/// parallel or vanishing, e.g. at a coordinate pole) the direction is
/// projected onto whichever single tangent is nonzero.
pub fn surface_delta_xi(d1: &Vec3, d2: &Vec3, direction: &Vec3) -> (f64, f64) {
    let a00 = d1.dot(d1);
    let a01 = d1.dot(d2);
    let a11 = d2.dot(d2);
    let b0 = d1.dot(direction);
    let b1 = d2.dot(direction);
    let det = a00 * a11 - a01 * a01;
    if det > 0.0 {
        ((a11 * b0 - a01 * b1) / det, (a00 * b1 - a01 * b0) / det)
    } else {
        // at a pole: assume direction is inline with d1 or d2 and the other
        // component is zero
        let along2 = d2.dot(direction);
        if along2.abs() > 0.0 {
            (0.0, along2.signum() * direction.norm() / d2.norm())
        } else {
            let along1 = d1.dot(direction);
            if along1.abs() > 0.0 {
                (along1.signum() * direction.norm() / d1.norm(), 0.0)
            } else {
                (0.0, 0.0)
            }
        }
    }
}

/// Unit surface axes for a 3-D direction: in-plane direction, in-plane
/// normal to it, and the surface normal.
///
/// The in-plane normal and surface normal are zero when the tangents are
/// degenerate.
pub fn surface_axes(d1: &Vec3, d2: &Vec3, direction: &Vec3) -> (Vec3, Vec3, Vec3) {
    let (dxi1, dxi2) = surface_delta_xi(d1, d2, direction);
    let ax1 = trellis_hermite::set_magnitude(&(dxi1 * d1 + dxi2 * d2), 1.0);
    let ax3 = d1.cross(d2);
    let mag3 = ax3.norm();
    if mag3 > 0.0 {
        let ax3 = ax3 / mag3;
        let ax2 = trellis_hermite::set_magnitude(&ax3.cross(&ax1), 1.0);
        (ax1, ax2, ax3)
    } else {
        (ax1, Vec3::zeros(), Vec3::zeros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{cylinder_surface, flat_surface};

    #[test]
    fn test_new_validates_counts() {
        let nx = vec![Point3::origin(); 4];
        let nd1 = vec![Vec3::x(); 4];
        let nd2 = vec![Vec3::y(); 4];
        assert!(PatchSurface::new(1, 1, nx.clone(), nd1.clone(), nd2.clone(), None, false).is_ok());
        assert_eq!(
            PatchSurface::new(2, 1, nx.clone(), nd1.clone(), nd2.clone(), None, false).unwrap_err(),
            SurfaceError::NodeCountMismatch {
                expected: 6,
                actual: 4
            }
        );
        assert_eq!(
            PatchSurface::new(0, 1, nx.clone(), nd1.clone(), nd2.clone(), None, false).unwrap_err(),
            SurfaceError::ZeroElementCount
        );
        let short_nd1 = vec![Vec3::x(); 3];
        assert_eq!(
            PatchSurface::new(1, 1, nx, short_nd1, nd2, None, false).unwrap_err(),
            SurfaceError::DerivativeCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_evaluate_reproduces_nodes_at_corners() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        // element (1, 0), xi (0, 1) is lattice node (1, 1) at (1, 1, 0)
        let position = SurfacePosition::new(1, 0, 0.0, 1.0);
        let (x, d1, d2) = surface.evaluate_derivatives(position);
        assert!((x - Point3::new(1.0, 1.0, 0.0)).norm() < 1.0e-12);
        assert!((d1 - Vec3::new(1.0, 0.0, 0.0)).norm() < 1.0e-12);
        assert!((d2 - Vec3::new(0.0, 1.0, 0.0)).norm() < 1.0e-12);
    }

    #[test]
    fn test_evaluate_loop_wraps_to_first_column() {
        let surface = cylinder_surface(8, 2, 2.0, -1.0, 1.0, (0.0, 0.0));
        // last element at xi1 = 1 closes onto the first node column
        let end = surface.evaluate(SurfacePosition::new(7, 0, 1.0, 0.0));
        let start = surface.evaluate(SurfacePosition::new(0, 0, 0.0, 0.0));
        assert!((end - start).norm() < 1.0e-12);
    }

    #[test]
    fn test_proportion_round_trip() {
        let surface = flat_surface(3, 2, 3.0, 2.0);
        let position = SurfacePosition::new(2, 1, 0.375, 0.25);
        let (p1, p2) = surface.proportion(position);
        let back = surface.position_from_proportion(p1, p2);
        assert_eq!(back.e1, position.e1);
        assert_eq!(back.e2, position.e2);
        assert!((back.xi1 - position.xi1).abs() < 1.0e-9);
        assert!((back.xi2 - position.xi2).abs() < 1.0e-9);
    }

    #[test]
    fn test_top_proportion_maps_to_last_element() {
        let surface = flat_surface(3, 2, 3.0, 2.0);
        let position = surface.position_from_proportion(1.0, 1.0);
        assert_eq!(position.e1, 2);
        assert_eq!(position.e2, 1);
        assert_eq!(position.xi1, 1.0);
        assert_eq!(position.xi2, 1.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_proportion_out_of_range_panics() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        surface.position_from_proportion(1.5, 0.5);
    }

    #[test]
    fn test_on_boundary_classification() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        assert_eq!(
            surface.on_boundary(surface.position_from_proportion(0.5, 0.5)),
            Boundary::None
        );
        assert_eq!(
            surface.on_boundary(surface.position_from_proportion(1.0, 0.5)),
            Boundary::Xi1
        );
        assert_eq!(
            surface.on_boundary(surface.position_from_proportion(0.5, 0.0)),
            Boundary::Xi2
        );
        // direction 2 wins at a corner
        assert_eq!(
            surface.on_boundary(surface.position_from_proportion(1.0, 1.0)),
            Boundary::Xi2
        );
        // a looped direction 1 never reports a boundary
        let cylinder = cylinder_surface(8, 2, 1.0, 0.0, 1.0, (0.0, 0.0));
        assert_eq!(
            cylinder.on_boundary(cylinder.position_from_proportion(0.0, 0.5)),
            Boundary::None
        );
    }

    #[test]
    fn test_advance_clamps_and_reports() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        let start = surface.position_from_proportion(0.5, 0.5);
        // large step clamps at the xi1 = 1 edge; applied increment reported
        let (position, boundary, adxi1, adxi2) = surface.advance(start, 10.0, 0.0, 20.0);
        assert_eq!(boundary, Boundary::Xi1);
        let (p1, p2) = surface.proportion(position);
        assert!((p1 - 1.0).abs() < 1.0e-12);
        assert!((p2 - 0.5).abs() < 1.0e-12);
        assert!((adxi1 - 1.0).abs() < 1.0e-12);
        assert!(adxi2.abs() < 1.0e-12);
    }

    #[test]
    fn test_advance_scales_to_max_step() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        let start = surface.position_from_proportion(0.25, 0.25);
        let (position, boundary, adxi1, adxi2) = surface.advance(start, 0.3, 0.4, 0.25);
        assert_eq!(boundary, Boundary::None);
        // increment scaled to magnitude 0.25 keeping direction
        assert!((adxi1 - 0.15).abs() < 1.0e-12);
        assert!((adxi2 - 0.2).abs() < 1.0e-12);
        let (p1, p2) = surface.proportion(position);
        assert!((p1 - 0.325).abs() < 1.0e-12);
        assert!((p2 - 0.35).abs() < 1.0e-12);
    }

    #[test]
    fn test_advance_wraps_looped_direction() {
        let surface = cylinder_surface(8, 2, 1.0, 0.0, 1.0, (0.0, 0.0));
        let start = surface.position_from_proportion(1.95, 0.5);
        let (position, boundary, _, _) = surface.advance(start, 0.8, 0.0, 0.5);
        assert_eq!(boundary, Boundary::None);
        let (p1, _) = surface.proportion(position);
        assert!((p1 - 0.05).abs() < 1.0e-9, "p1 {p1}");
    }

    #[test]
    fn test_surface_delta_xi_orthogonal() {
        let d1 = Vec3::new(2.0, 0.0, 0.0);
        let d2 = Vec3::new(0.0, 1.0, 0.0);
        let (dxi1, dxi2) = surface_delta_xi(&d1, &d2, &Vec3::new(1.0, 3.0, 7.0));
        assert!((dxi1 - 0.5).abs() < 1.0e-12);
        assert!((dxi2 - 3.0).abs() < 1.0e-12);
    }

    #[test]
    fn test_surface_delta_xi_degenerate_pole() {
        let d1 = Vec3::zeros();
        let d2 = Vec3::new(0.0, 2.0, 0.0);
        let direction = Vec3::new(0.0, -4.0, 1.0);
        let (dxi1, dxi2) = surface_delta_xi(&d1, &d2, &direction);
        assert_eq!(dxi1, 0.0);
        assert!((dxi2 + direction.norm() / 2.0).abs() < 1.0e-12);
    }

    #[test]
    fn test_surface_axes_flat() {
        let d1 = Vec3::new(2.0, 0.0, 0.0);
        let d2 = Vec3::new(0.0, 3.0, 0.0);
        let (ax1, ax2, ax3) = surface_axes(&d1, &d2, &Vec3::new(1.0, 0.0, 0.0));
        assert!((ax1 - Vec3::x()).norm() < 1.0e-12);
        assert!((ax2 - Vec3::y()).norm() < 1.0e-12);
        assert!((ax3 - Vec3::z()).norm() < 1.0e-12);
    }

    #[test]
    fn test_find_nearest_node() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        let (position, distance) = surface.find_nearest_node(&Point3::new(1.1, 1.9, 0.3));
        let x = surface.evaluate(position);
        assert!((x - Point3::new(1.0, 2.0, 0.0)).norm() < 1.0e-12);
        let expected = (Point3::new(1.1, 1.9, 0.3) - Point3::new(1.0, 2.0, 0.0)).norm();
        assert!((distance - expected).abs() < 1.0e-12);
    }

    #[test]
    fn test_mirror_x() {
        let surface = flat_surface(2, 2, 2.0, 2.0);
        let mirror = surface.create_mirror_x();
        // proportion (0.25, 0.5) on the mirror matches proportion (0.75, 0.5)
        // on the original with x negated
        let xm = mirror.evaluate(mirror.position_from_proportion(0.25, 0.5));
        let xo = surface.evaluate(surface.position_from_proportion(0.75, 0.5));
        assert!((xm - Point3::new(-xo.x, xo.y, xo.z)).norm() < 1.0e-12);
    }

    #[test]
    fn test_mirror_x_loop() {
        let surface = cylinder_surface(8, 2, 1.5, -1.0, 1.0, (0.5, 0.0));
        let mirror = surface.create_mirror_x();
        let xm = mirror.evaluate(mirror.position_from_proportion(0.25, 0.5));
        let xo = surface.evaluate(surface.position_from_proportion(0.75, 0.5));
        assert!((xm - Point3::new(-xo.x, xo.y, xo.z)).norm() < 1.0e-9);
    }
}
