//! Area-uniform surface sampling into target textures.
//!
//! Triangles are picked with probability proportional to their area, then a
//! point is drawn uniformly inside the picked triangle. Sampling vertices or
//! the shape's parameterisation instead would crowd particles onto small
//! faces and the poles.

use glam::Vec3;
use rand::Rng;

use crate::field::FieldTexture;
use crate::shapes::{triangle_area, Shape, TriangleMesh};

/// Draws uniformly distributed points from the surface of a triangle mesh.
#[derive(Debug, Clone)]
pub struct SurfaceSampler {
    triangles: Vec<[Vec3; 3]>,
    /// Running sum of triangle weights; `cumulative[i]` covers triangles `0..=i`.
    cumulative: Vec<f32>,
    total: f32,
}

impl SurfaceSampler {
    /// Build the cumulative-area table for `mesh`.
    ///
    /// A mesh whose triangles all have zero area is sampled by triangle
    /// count instead of area.
    pub fn new(mesh: &TriangleMesh) -> Self {
        let areas: Vec<f32> = mesh.triangles.iter().map(triangle_area).collect();
        let area_total: f32 = areas.iter().sum();
        let weights: Vec<f32> = if area_total > 0.0 {
            areas
        } else {
            vec![1.0; mesh.triangles.len()]
        };

        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for w in weights {
            total += w;
            cumulative.push(total);
        }

        Self {
            triangles: mesh.triangles.clone(),
            cumulative,
            total,
        }
    }

    /// Total weight (surface area for non-degenerate meshes).
    pub fn total_weight(&self) -> f32 {
        self.total
    }

    /// Draw one surface point. An empty mesh yields the origin.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        if self.triangles.is_empty() {
            return Vec3::ZERO;
        }

        let pick = rng.gen::<f32>() * self.total;
        let index = self
            .cumulative
            .partition_point(|&c| c <= pick)
            .min(self.triangles.len() - 1);
        let [a, b, c] = self.triangles[index];

        // Square-root barycentric sampling
        let r1 = rng.gen::<f32>().sqrt();
        let r2 = rng.gen::<f32>();
        a * (1.0 - r1) + b * (r1 * (1.0 - r2)) + c * (r1 * r2)
    }
}

/// Fill a `side × side` target texture with surface samples of `shape`.
///
/// Every texel holds `(x, y, z, 1.0)`; the point is scaled by `scale`.
pub fn sample_shape<R: Rng + ?Sized>(shape: Shape, side: u32, scale: f32, rng: &mut R) -> FieldTexture {
    let sampler = SurfaceSampler::new(&shape.mesh());
    sample_into(&sampler, side, scale, rng)
}

/// Fill a texture from an existing sampler.
pub fn sample_into<R: Rng + ?Sized>(
    sampler: &SurfaceSampler,
    side: u32,
    scale: f32,
    rng: &mut R,
) -> FieldTexture {
    FieldTexture::from_fn(side, |_| {
        let p = sampler.sample(rng) * scale;
        [p.x, p.y, p.z, 1.0]
    })
}
