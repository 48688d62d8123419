//! Lattice builders shared by the unit tests.

use std::f64::consts::TAU;

use trellis_math::{Point3, Vec3};

use crate::PatchSurface;

/// Flat patch in the z = 0 plane spanning `[0, width] x [0, height]`.
pub fn flat_surface(n1: usize, n2: usize, width: f64, height: f64) -> PatchSurface {
    let dx = width / n1 as f64;
    let dy = height / n2 as f64;
    let mut nx = Vec::new();
    let mut nd1 = Vec::new();
    let mut nd2 = Vec::new();
    for j in 0..=n2 {
        for i in 0..=n1 {
            nx.push(Point3::new(i as f64 * dx, j as f64 * dy, 0.0));
            nd1.push(Vec3::new(dx, 0.0, 0.0));
            nd2.push(Vec3::new(0.0, dy, 0.0));
        }
    }
    PatchSurface::new(n1, n2, nx, nd1, nd2, None, false).unwrap()
}

/// Vertical patch in the plane y = `y`, spanning `[0, width]` in x and
/// `[-1, 1]` in z.
pub fn vertical_surface(n1: usize, n2: usize, width: f64, y: f64) -> PatchSurface {
    let dx = width / n1 as f64;
    let dz = 2.0 / n2 as f64;
    let mut nx = Vec::new();
    let mut nd1 = Vec::new();
    let mut nd2 = Vec::new();
    for j in 0..=n2 {
        for i in 0..=n1 {
            nx.push(Point3::new(i as f64 * dx, y, -1.0 + j as f64 * dz));
            nd1.push(Vec3::new(dx, 0.0, 0.0));
            nd2.push(Vec3::new(0.0, 0.0, dz));
        }
    }
    PatchSurface::new(n1, n2, nx, nd1, nd2, None, false).unwrap()
}

/// Cylinder wall of the given radius about the z axis through
/// `(center.0, center.1)`, looped in direction 1, spanning `[z0, z1]`.
pub fn cylinder_surface(
    n1: usize,
    n2: usize,
    radius: f64,
    z0: f64,
    z1: f64,
    center: (f64, f64),
) -> PatchSurface {
    let dz = (z1 - z0) / n2 as f64;
    let dtheta = TAU / n1 as f64;
    let mut nx = Vec::new();
    let mut nd1 = Vec::new();
    let mut nd2 = Vec::new();
    for j in 0..=n2 {
        for i in 0..n1 {
            let theta = i as f64 * dtheta;
            nx.push(Point3::new(
                center.0 + radius * theta.cos(),
                center.1 + radius * theta.sin(),
                z0 + j as f64 * dz,
            ));
            nd1.push(Vec3::new(
                -radius * theta.sin() * dtheta,
                radius * theta.cos() * dtheta,
                0.0,
            ));
            nd2.push(Vec3::new(0.0, 0.0, dz));
        }
    }
    PatchSurface::new(n1, n2, nx, nd1, nd2, None, true).unwrap()
}

/// Thin tube of the given radius about the x axis, looped in direction 1,
/// spanning `[x0, x1]` along the axis.
pub fn tube_surface(n1: usize, n2: usize, radius: f64, x0: f64, x1: f64) -> PatchSurface {
    let dx = (x1 - x0) / n2 as f64;
    let dphi = TAU / n1 as f64;
    let mut nx = Vec::new();
    let mut nd1 = Vec::new();
    let mut nd2 = Vec::new();
    for j in 0..=n2 {
        for i in 0..n1 {
            let phi = i as f64 * dphi;
            nx.push(Point3::new(
                x0 + j as f64 * dx,
                radius * phi.cos(),
                radius * phi.sin(),
            ));
            nd1.push(Vec3::new(
                0.0,
                -radius * phi.sin() * dphi,
                radius * phi.cos() * dphi,
            ));
            nd2.push(Vec3::new(dx, 0.0, 0.0));
        }
    }
    PatchSurface::new(n1, n2, nx, nd1, nd2, None, true).unwrap()
}
