//! Square floating-point field textures.
//!
//! A [`FieldTexture`] holds one `[f32; 4]` texel per particle. Particles have
//! no identity of their own: particle `i` is simply texel `i`, at column
//! `i % side` and row `i / side`. Every per-particle attribute (position,
//! velocity, target sample) lives in a texture of this shape.
//!
//! ```ignore
//! use shapeswarm::field::FieldTexture;
//!
//! let mut field = FieldTexture::new(4);
//! field.set(5, [1.0, 2.0, 3.0, 1.0]);
//! assert_eq!(field.texel_at(1, 1), [1.0, 2.0, 3.0, 1.0]);
//! ```

use glam::Vec4;
use rand::Rng;

/// Number of channels per texel.
pub const CHANNELS: usize = 4;

/// Bytes per texel in the GPU representation (`Rgba32Float`).
pub const BYTES_PER_TEXEL: u32 = (CHANNELS * std::mem::size_of::<f32>()) as u32;

/// An `side × side` grid of RGBA float texels stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTexture {
    side: u32,
    texels: Vec<[f32; 4]>,
}

impl FieldTexture {
    /// Create a zero-filled texture.
    pub fn new(side: u32) -> Self {
        let count = (side as usize) * (side as usize);
        Self {
            side,
            texels: vec![[0.0; 4]; count],
        }
    }

    /// Create a texture by evaluating `f` for every texel index.
    pub fn from_fn(side: u32, mut f: impl FnMut(usize) -> [f32; 4]) -> Self {
        let count = (side as usize) * (side as usize);
        Self {
            side,
            texels: (0..count).map(&mut f).collect(),
        }
    }

    /// Side length in texels.
    #[inline]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Total texel count (`side²`), i.e. the particle count.
    #[inline]
    pub fn len(&self) -> usize {
        self.texels.len()
    }

    /// True for a zero-sized texture.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Texel by flat index.
    #[inline]
    pub fn texel(&self, index: usize) -> [f32; 4] {
        self.texels[index]
    }

    /// Texel by column and row.
    #[inline]
    pub fn texel_at(&self, column: u32, row: u32) -> [f32; 4] {
        self.texels[self.index_of(column, row)]
    }

    /// Texel as a vector.
    #[inline]
    pub fn vec4(&self, index: usize) -> Vec4 {
        Vec4::from_array(self.texels[index])
    }

    /// Overwrite one texel.
    #[inline]
    pub fn set(&mut self, index: usize, value: [f32; 4]) {
        self.texels[index] = value;
    }

    /// Flat index for a column/row pair.
    #[inline]
    pub fn index_of(&self, column: u32, row: u32) -> usize {
        row as usize * self.side as usize + column as usize
    }

    /// All texels, row-major.
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Mutable access to the raw texels, e.g. to fill before upload.
    pub fn texels_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.texels
    }

    /// Raw bytes for `queue.write_texture`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Bytes per texture row.
    pub fn bytes_per_row(&self) -> u32 {
        self.side * BYTES_PER_TEXEL
    }

    /// Largest absolute value over the first three channels.
    pub fn max_abs_xyz(&self) -> f32 {
        self.texels
            .iter()
            .flat_map(|t| t[..3].iter())
            .fold(0.0_f32, |m, v| m.max(v.abs()))
    }
}

/// Lookup coordinates for every particle, in draw order.
///
/// Entry `i` is `((i mod side) / side, floor(i / side) / side)`, the
/// normalized texture-space coordinate of texel `i`. Computed once at
/// startup and uploaded as a per-instance vertex attribute.
pub fn reference_coords(side: u32) -> Vec<[f32; 2]> {
    let count = side as usize * side as usize;
    let s = side as f32;
    (0..count)
        .map(|i| {
            let column = (i % side as usize) as f32;
            let row = (i / side as usize) as f32;
            [column / s, row / s]
        })
        .collect()
}

/// Random initial positions: `xyz = (rand - 0.5) * spread`, `w = 1`.
///
/// Every coordinate lands in `[-spread / 2, spread / 2]`.
pub fn seed_positions<R: Rng + ?Sized>(side: u32, spread: f32, rng: &mut R) -> FieldTexture {
    FieldTexture::from_fn(side, |_| {
        [
            (rng.gen::<f32>() - 0.5) * spread,
            (rng.gen::<f32>() - 0.5) * spread,
            (rng.gen::<f32>() - 0.5) * spread,
            1.0,
        ]
    })
}

/// Random initial velocities: `xyz = (rand - 0.5) * jitter`, `w = 0`.
///
/// Only jitter; every component lands in `[-jitter / 2, jitter / 2]`.
pub fn seed_velocities<R: Rng + ?Sized>(side: u32, jitter: f32, rng: &mut R) -> FieldTexture {
    FieldTexture::from_fn(side, |_| {
        [
            (rng.gen::<f32>() - 0.5) * jitter,
            (rng.gen::<f32>() - 0.5) * jitter,
            (rng.gen::<f32>() - 0.5) * jitter,
            0.0,
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_is_zeroed_square() {
        let field = FieldTexture::new(8);
        assert_eq!(field.side(), 8);
        assert_eq!(field.len(), 64);
        assert!(field.texels().iter().all(|t| *t == [0.0; 4]));
    }

    #[test]
    fn test_index_mapping_is_row_major() {
        let field = FieldTexture::from_fn(4, |i| [i as f32, 0.0, 0.0, 0.0]);
        assert_eq!(field.texel_at(0, 0)[0], 0.0);
        assert_eq!(field.texel_at(3, 0)[0], 3.0);
        assert_eq!(field.texel_at(0, 1)[0], 4.0);
        assert_eq!(field.texel_at(2, 3)[0], 14.0);
    }

    #[test]
    fn test_bytes_layout() {
        let field = FieldTexture::new(16);
        assert_eq!(field.as_bytes().len(), 16 * 16 * 16);
        assert_eq!(field.bytes_per_row(), 256);
    }

    #[test]
    fn test_reference_coords() {
        let refs = reference_coords(4);
        assert_eq!(refs.len(), 16);
        assert_eq!(refs[0], [0.0, 0.0]);
        assert_eq!(refs[1], [0.25, 0.0]);
        assert_eq!(refs[4], [0.0, 0.25]);
        assert_eq!(refs[15], [0.75, 0.75]);
    }

    #[test]
    fn test_seed_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let positions = seed_positions(16, 5.0, &mut rng);
        let velocities = seed_velocities(16, 0.01, &mut rng);

        assert!(positions.max_abs_xyz() <= 2.5);
        assert!(positions.texels().iter().all(|t| t[3] == 1.0));
        assert!(velocities.texels().iter().all(|t| t.iter().all(|c| c.abs() <= 0.005)));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = seed_positions(8, 5.0, &mut StdRng::seed_from_u64(42));
        let b = seed_positions(8, 5.0, &mut StdRng::seed_from_u64(42));
        let c = seed_positions(8, 5.0, &mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
