use crate::error::DecodeError;
use crate::triangle::{Stride, Triangle};

/// Wire codec for triangles.
///
/// A message is a JSON array holding the triangle's flat float sequence, e.g.
/// `[0.1,-0.5,0.0,...]`. Floats are written in shortest round-trip form, so
/// `decode(encode(t)) == t` bit for bit.
#[derive(Debug, Copy, Clone)]
pub struct GeometryCodec {
    stride: Stride,
}

impl GeometryCodec {
    #[inline]
    pub const fn new(stride: Stride) -> Self {
        Self { stride }
    }

    #[inline]
    pub const fn stride(&self) -> Stride {
        self.stride
    }

    pub fn encode(&self, triangle: &Triangle) -> Result<String, serde_json::Error> {
        serde_json::to_string(triangle.values())
    }

    /// Decodes one message body (text or binary frame payload).
    ///
    /// Rejects malformed JSON, empty arrays, non-finite values and float counts
    /// that do not divide into whole vertices of the session stride.
    pub fn decode(&self, payload: &[u8]) -> Result<Triangle, DecodeError> {
        let values: Vec<f32> = serde_json::from_slice(payload)?;
        Ok(Triangle::new(values, self.stride)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn encodes_as_json_array() {
        let codec = GeometryCodec::new(Stride::Position);
        let t = Triangle::new(vec![0.5, -0.25, 0.0], Stride::Position).unwrap();
        assert_eq!(codec.encode(&t).unwrap(), "[0.5,-0.25,0.0]");
    }

    #[test]
    fn round_trips_random_triangles_exactly() {
        let mut rng = StdRng::seed_from_u64(42);
        for stride in [Stride::Position, Stride::PositionColor] {
            let codec = GeometryCodec::new(stride);
            for _ in 0..64 {
                let t = Triangle::random(&mut rng, stride);
                let wire = codec.encode(&t).unwrap();
                assert_eq!(codec.decode(wire.as_bytes()).unwrap(), t);
            }
        }
    }

    #[test]
    fn round_trips_extreme_values() {
        let codec = GeometryCodec::new(Stride::Position);
        let t = Triangle::new(
            vec![f32::MIN_POSITIVE, -0.0, f32::MAX, f32::EPSILON, 1.0e-38, -1.0],
            Stride::Position,
        )
        .unwrap();
        let wire = codec.encode(&t).unwrap();
        assert_eq!(codec.decode(wire.as_bytes()).unwrap(), t);
    }

    #[test]
    fn accepts_integers_from_other_clients() {
        let codec = GeometryCodec::new(Stride::Position);
        let t = codec.decode(b"[0, 1, 0, -1, -1, 0, 1, -1, 0]").unwrap();
        assert_eq!(t.values()[1], 1.0);
    }

    #[test]
    fn rejects_count_not_divisible_by_stride() {
        let codec = GeometryCodec::new(Stride::PositionColor);
        let err = codec.decode(b"[1,2,3,4,5,6,7]").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Geometry(GeometryError::Misaligned { len: 7, .. })
        ));
    }

    #[test]
    fn rejects_empty_array() {
        let codec = GeometryCodec::new(Stride::Position);
        assert!(matches!(
            codec.decode(b"[]").unwrap_err(),
            DecodeError::Geometry(GeometryError::Empty)
        ));
    }

    #[test]
    fn rejects_non_array_payloads() {
        let codec = GeometryCodec::new(Stride::Position);
        for payload in [&b"hello"[..], b"{\"x\":1}", b"[\"a\",\"b\",\"c\"]", b""] {
            assert!(matches!(codec.decode(payload), Err(DecodeError::Json(_))));
        }
    }

    #[test]
    fn rejects_values_overflowing_f32() {
        let codec = GeometryCodec::new(Stride::Position);
        assert!(codec.decode(b"[1e39, 0, 0]").is_err());
    }
}
