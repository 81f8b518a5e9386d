//! Target shapes and their triangle meshes.
//!
//! Every shape is built around the origin and fits inside a sphere of
//! radius [`BOUNDING_RADIUS`], so switching between them reads as a change
//! of form rather than of scale.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Radius of the sphere every shape fits inside before scaling.
pub const BOUNDING_RADIUS: f32 = 1.0;

/// Subdivision level of the round shape.
const SPHERE_DETAIL: u32 = 2;

/// Capsule cap radius and straight section length.
const CAPSULE_RADIUS: f32 = 0.5;
const CAPSULE_LENGTH: f32 = 1.0;
const CAPSULE_CAP_SEGMENTS: u32 = 8;
const CAPSULE_RADIAL_SEGMENTS: u32 = 24;

/// The shapes particles can be pulled toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Finely subdivided icosphere.
    Sphere,
    /// Faceted regular dodecahedron.
    Dodecahedron,
    /// Cylinder with hemispherical caps.
    Capsule,
    /// Axis-aligned cube.
    Cube,
}

impl Shape {
    /// All shapes, in id order.
    pub const ALL: [Shape; 4] = [Shape::Sphere, Shape::Dodecahedron, Shape::Capsule, Shape::Cube];

    /// Look a shape up by numeric id. Unknown ids fall back to [`Shape::Cube`].
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => Shape::Sphere,
            2 => Shape::Dodecahedron,
            3 => Shape::Capsule,
            _ => Shape::Cube,
        }
    }

    /// Numeric id of this shape.
    pub fn id(self) -> u32 {
        match self {
            Shape::Sphere => 1,
            Shape::Dodecahedron => 2,
            Shape::Capsule => 3,
            Shape::Cube => 4,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Shape::Sphere => "sphere",
            Shape::Dodecahedron => "dodecahedron",
            Shape::Capsule => "capsule",
            Shape::Cube => "cube",
        }
    }

    /// Build the triangle mesh for this shape.
    pub fn mesh(self) -> TriangleMesh {
        match self {
            Shape::Sphere => icosphere(BOUNDING_RADIUS, SPHERE_DETAIL),
            Shape::Dodecahedron => dodecahedron(BOUNDING_RADIUS),
            Shape::Capsule => capsule(
                CAPSULE_RADIUS,
                CAPSULE_LENGTH,
                CAPSULE_CAP_SEGMENTS,
                CAPSULE_RADIAL_SEGMENTS,
            ),
            Shape::Cube => cube(BOUNDING_RADIUS / 3.0_f32.sqrt()),
        }
    }
}

/// A triangle soup.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub triangles: Vec<[Vec3; 3]>,
}

impl TriangleMesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        self.triangles.push([a, b, c]);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Sum of all triangle areas.
    pub fn area(&self) -> f32 {
        self.triangles.iter().map(triangle_area).sum()
    }
}

/// Area of one triangle.
pub fn triangle_area(tri: &[Vec3; 3]) -> f32 {
    0.5 * (tri[1] - tri[0]).cross(tri[2] - tri[0]).length()
}

fn icosahedron_vertices() -> [Vec3; 12] {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

const ICOSAHEDRON_FACES: [[usize; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

/// Icosahedron with every face split into `(detail + 1)²` triangles and all
/// vertices pushed onto the sphere.
pub fn icosphere(radius: f32, detail: u32) -> TriangleMesh {
    let vertices = icosahedron_vertices();
    let n = detail + 1;
    let mut mesh = TriangleMesh::new();

    for face in ICOSAHEDRON_FACES.iter() {
        let (a, b, c) = (vertices[face[0]], vertices[face[1]], vertices[face[2]]);
        // Grid point (i, j) with i + j <= n, projected to the sphere
        let point = |i: u32, j: u32| {
            let p = a + (b - a) * (i as f32 / n as f32) + (c - a) * (j as f32 / n as f32);
            p.normalize() * radius
        };

        for i in 0..n {
            for j in 0..(n - i) {
                mesh.push(point(i, j), point(i + 1, j), point(i, j + 1));
                if i + j + 1 < n {
                    mesh.push(point(i + 1, j), point(i + 1, j + 1), point(i, j + 1));
                }
            }
        }
    }

    mesh
}

/// Regular dodecahedron with circumradius `radius`.
///
/// Built as the dual of the icosahedron: each icosahedron vertex becomes a
/// pentagonal face whose corners are the (projected) centroids of the five
/// faces around it. Pentagons are fanned from their centre.
pub fn dodecahedron(radius: f32) -> TriangleMesh {
    let vertices = icosahedron_vertices();
    let mut mesh = TriangleMesh::new();

    for (vi, v) in vertices.iter().enumerate() {
        let axis = v.normalize();
        let mut corners: Vec<Vec3> = ICOSAHEDRON_FACES
            .iter()
            .filter(|f| f.contains(&vi))
            .map(|f| ((vertices[f[0]] + vertices[f[1]] + vertices[f[2]]) / 3.0).normalize() * radius)
            .collect();

        // Order the corners around the face normal
        let u = axis.any_orthonormal_vector();
        let w = axis.cross(u);
        corners.sort_by(|p, q| {
            let ap = p.dot(w).atan2(p.dot(u));
            let aq = q.dot(w).atan2(q.dot(u));
            ap.total_cmp(&aq)
        });

        let centre = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;
        for k in 0..corners.len() {
            let next = corners[(k + 1) % corners.len()];
            mesh.push(centre, corners[k], next);
        }
    }

    mesh
}

/// Capsule along the Y axis: a cylinder of `radius` and `length` closed by
/// two hemispheres. Total height is `length + 2 * radius`.
pub fn capsule(radius: f32, length: f32, cap_segments: u32, radial_segments: u32) -> TriangleMesh {
    let half = length / 2.0;
    let cap_segments = cap_segments.max(1);
    let radial_segments = radial_segments.max(3);

    // Profile from the bottom pole to the top pole as (ring radius, height)
    let mut profile: Vec<(f32, f32)> = Vec::new();
    for s in 0..=cap_segments {
        let phi = -PI / 2.0 + (s as f32 / cap_segments as f32) * (PI / 2.0);
        profile.push((radius * phi.cos(), -half + radius * phi.sin()));
    }
    for s in 0..=cap_segments {
        let phi = (s as f32 / cap_segments as f32) * (PI / 2.0);
        profile.push((radius * phi.cos(), half + radius * phi.sin()));
    }

    let ring = |r: f32, y: f32, k: u32| {
        let theta = (k % radial_segments) as f32 / radial_segments as f32 * TAU;
        Vec3::new(r * theta.cos(), y, r * theta.sin())
    };

    let mut mesh = TriangleMesh::new();
    for pair in profile.windows(2) {
        let (r0, y0) = pair[0];
        let (r1, y1) = pair[1];
        for k in 0..radial_segments {
            let a = ring(r0, y0, k);
            let b = ring(r0, y0, k + 1);
            let c = ring(r1, y1, k);
            let d = ring(r1, y1, k + 1);
            mesh.push(a, c, b);
            mesh.push(b, c, d);
        }
    }

    // Pole rings collapse to a point and leave zero-area slivers behind
    mesh.triangles.retain(|t| triangle_area(t) > f32::EPSILON);
    mesh
}

/// Axis-aligned cube with the given half-extent, two triangles per face.
pub fn cube(half_extent: f32) -> TriangleMesh {
    let h = half_extent;
    let mut mesh = TriangleMesh::new();

    for axis in 0..3 {
        for sign in [-1.0_f32, 1.0] {
            let normal = Vec3::AXES[axis] * sign;
            let u = Vec3::AXES[(axis + 1) % 3];
            let v = Vec3::AXES[(axis + 2) % 3];
            let centre = normal * h;
            let corner = |su: f32, sv: f32| centre + u * (su * h) + v * (sv * h);
            mesh.push(corner(-1.0, -1.0), corner(1.0, -1.0), corner(1.0, 1.0));
            mesh.push(corner(-1.0, -1.0), corner(1.0, 1.0), corner(-1.0, 1.0));
        }
    }

    mesh
}
