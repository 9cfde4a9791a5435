use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::Rng;

use crate::error::GeometryError;

/// Number of vertices every triangle contributes to the GPU.
pub const VERTICES_PER_TRIANGLE: usize = 3;

/// Floats per vertex, fixed for a session.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Stride {
    /// `pos.xyz`
    #[default]
    Position,
    /// `pos.xyz, color.rgb`
    PositionColor,
}

impl Stride {
    #[inline]
    pub const fn floats(self) -> usize {
        match self {
            Stride::Position => 3,
            Stride::PositionColor => 6,
        }
    }

    #[inline]
    pub const fn has_color(self) -> bool {
        matches!(self, Stride::PositionColor)
    }

    /// Returns true if `len` values split into whole vertices of this stride.
    #[inline]
    pub const fn accepts(self, len: usize) -> bool {
        len > 0 && len % self.floats() == 0
    }
}

/// An immutable flat sequence of vertex attributes describing one primitive.
///
/// Equality is bit-exact on the values: two triangles that differ only in the
/// last representable fraction of a coordinate are distinct, and `0.0` is not
/// equal to `-0.0`. The stride is not part of identity.
///
/// Cloning is cheap (shared backing storage).
#[derive(Clone)]
pub struct Triangle {
    values: Arc<[f32]>,
}

impl Triangle {
    /// Validates `values` against `stride`.
    ///
    /// Non-finite values are rejected because they cannot cross the wire.
    pub fn new(values: impl Into<Vec<f32>>, stride: Stride) -> Result<Self, GeometryError> {
        let values = values.into();

        if values.is_empty() {
            return Err(GeometryError::Empty);
        }
        if !stride.accepts(values.len()) {
            return Err(GeometryError::Misaligned { len: values.len(), stride });
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(GeometryError::NonFinite { index, value });
        }

        Ok(Self { values: values.into() })
    }

    /// Generates a random triangle in normalized device space.
    ///
    /// Each vertex is `(±x, ±y, 0)` with `x, y` in `[0, 1)`. Under
    /// `Stride::PositionColor` every vertex also gets a random RGB color.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, stride: Stride) -> Self {
        let mut values = Vec::with_capacity(VERTICES_PER_TRIANGLE * stride.floats());

        for _ in 0..VERTICES_PER_TRIANGLE {
            values.push(signed_unit(rng));
            values.push(signed_unit(rng));
            values.push(0.0);

            if stride.has_color() {
                values.push(rng.r#gen::<f32>());
                values.push(rng.r#gen::<f32>());
                values.push(rng.r#gen::<f32>());
            }
        }

        Self { values: values.into() }
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn signed_unit<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let v = rng.r#gen::<f32>();
    if rng.gen_bool(0.5) { v } else { -v }
}

impl AsRef<[f32]> for Triangle {
    #[inline]
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl PartialEq for Triangle {
    fn eq(&self, other: &Self) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(other.values.iter())
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for Triangle {}

impl Hash for Triangle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.values.len());
        for v in self.values.iter() {
            state.write_u32(v.to_bits());
        }
    }
}

impl fmt::Debug for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Triangle").field(&&*self.values).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn tri(values: &[f32], stride: Stride) -> Triangle {
        Triangle::new(values.to_vec(), stride).unwrap()
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn new_accepts_whole_vertices() {
        let t = tri(&[0.0, 0.5, 0.0, -0.5, -0.5, 0.0, 0.5, -0.5, 0.0], Stride::Position);
        assert_eq!(t.len(), 9);
    }

    #[test]
    fn new_rejects_empty() {
        assert_eq!(Triangle::new(Vec::new(), Stride::Position), Err(GeometryError::Empty));
    }

    #[test]
    fn new_rejects_partial_vertex() {
        let err = Triangle::new(vec![0.0; 7], Stride::PositionColor).unwrap_err();
        assert_eq!(err, GeometryError::Misaligned { len: 7, stride: Stride::PositionColor });
    }

    #[test]
    fn new_rejects_nan() {
        let err = Triangle::new(vec![0.0, f32::NAN, 0.0], Stride::Position).unwrap_err();
        assert!(matches!(err, GeometryError::NonFinite { index: 1, .. }));
    }

    // ── equality ──────────────────────────────────────────────────────────

    #[test]
    fn equal_values_are_equal() {
        let a = tri(&[0.1, 0.2, 0.3], Stride::Position);
        let b = tri(&[0.1, 0.2, 0.3], Stride::Position);
        assert_eq!(a, b);
    }

    #[test]
    fn last_ulp_difference_is_distinct() {
        let x = 0.25f32;
        let next = f32::from_bits(x.to_bits() + 1);
        let a = tri(&[x, 0.0, 0.0], Stride::Position);
        let b = tri(&[next, 0.0, 0.0], Stride::Position);
        assert_ne!(a, b);
    }

    #[test]
    fn length_mismatch_is_distinct() {
        let a = tri(&[0.0, 0.0, 0.0], Stride::Position);
        let b = tri(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0], Stride::Position);
        assert_ne!(a, b);
    }

    // ── random ────────────────────────────────────────────────────────────

    #[test]
    fn random_position_triangle_is_flat_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let t = Triangle::random(&mut rng, Stride::Position);
        assert_eq!(t.len(), 9);
        for v in t.values().chunks(3) {
            assert!(v[0].abs() < 1.0 && v[1].abs() < 1.0);
            assert_eq!(v[2], 0.0);
        }
    }

    #[test]
    fn random_color_triangle_has_unit_colors() {
        let mut rng = StdRng::seed_from_u64(11);
        let t = Triangle::random(&mut rng, Stride::PositionColor);
        assert_eq!(t.len(), 18);
        for v in t.values().chunks(6) {
            assert!(v[3..].iter().all(|c| (0.0..1.0).contains(c)));
        }
    }
}
