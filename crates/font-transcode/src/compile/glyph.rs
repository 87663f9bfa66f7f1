//! `Glyph` and related types.

use super::outline::Contour;

/// Bounding box of a glyph in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoundingBox {
    pub(crate) x_min: i16,
    pub(crate) y_min: i16,
    pub(crate) x_max: i16,
    pub(crate) y_max: i16,
}

impl BoundingBox {
    pub(crate) fn union(self, other: Self) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub(crate) fn width(&self) -> i32 {
        i32::from(self.x_max) - i32::from(self.x_min)
    }
}

/// Encoded simple glyph from the `glyf` table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Glyph {
    /// `None` for empty glyphs.
    pub(crate) bbox: Option<BoundingBox>,
    pub(crate) contour_count: u16,
    pub(crate) point_count: u16,
    pub(crate) data: Vec<u8>,
}

impl Glyph {
    const ON_CURVE_POINT: u8 = 0x01;
    const X_SHORT_VECTOR: u8 = 0x02;
    const Y_SHORT_VECTOR: u8 = 0x04;
    const X_IS_SAME_OR_POSITIVE: u8 = 0x10;
    const Y_IS_SAME_OR_POSITIVE: u8 = 0x20;

    /// Encodes contours as a simple glyph. Returns an empty glyph if there are no contours, or if
    /// the number of contours / points exceeds `u16::MAX`.
    pub(crate) fn new(contours: &[Contour]) -> Self {
        let point_count: usize = contours.iter().map(|contour| contour.points.len()).sum();
        let (Ok(contour_count), Ok(point_count_u16)) =
            (u16::try_from(contours.len()), u16::try_from(point_count))
        else {
            return Self::default();
        };
        let mut points = contours.iter().flat_map(|contour| &contour.points);
        let Some(first) = points.next() else {
            return Self::default();
        };

        let bbox = points.fold(
            BoundingBox {
                x_min: first.x,
                y_min: first.y,
                x_max: first.x,
                y_max: first.y,
            },
            |bbox, point| BoundingBox {
                x_min: bbox.x_min.min(point.x),
                y_min: bbox.y_min.min(point.y),
                x_max: bbox.x_max.max(point.x),
                y_max: bbox.y_max.max(point.y),
            },
        );

        let mut data = Vec::with_capacity(12 + 2 * contours.len() + 5 * point_count);
        // `contour_count` <= `point_count` <= u16::MAX, but `numberOfContours` is signed.
        write_i16(&mut data, i16::try_from(contour_count).unwrap_or(i16::MAX));
        write_i16(&mut data, bbox.x_min);
        write_i16(&mut data, bbox.y_min);
        write_i16(&mut data, bbox.x_max);
        write_i16(&mut data, bbox.y_max);

        let mut end_point = 0_u16;
        for contour in contours {
            // `unwrap_or` never triggers: the total point count fits into u16
            let len = u16::try_from(contour.points.len()).unwrap_or(u16::MAX);
            end_point = end_point.wrapping_add(len);
            data.extend_from_slice(&end_point.wrapping_sub(1).to_be_bytes());
        }
        data.extend_from_slice(&0_u16.to_be_bytes()); // instructionLength

        let mut flags = Vec::with_capacity(point_count);
        let mut x_coords = Vec::with_capacity(2 * point_count);
        let mut y_coords = Vec::with_capacity(2 * point_count);
        let (mut prev_x, mut prev_y) = (0_i16, 0_i16);
        for point in contours.iter().flat_map(|contour| &contour.points) {
            let mut flag = if point.on_curve {
                Self::ON_CURVE_POINT
            } else {
                0
            };
            flag |= encode_delta(
                i32::from(point.x) - i32::from(prev_x),
                [Self::X_SHORT_VECTOR, Self::X_IS_SAME_OR_POSITIVE],
                &mut x_coords,
            );
            flag |= encode_delta(
                i32::from(point.y) - i32::from(prev_y),
                [Self::Y_SHORT_VECTOR, Self::Y_IS_SAME_OR_POSITIVE],
                &mut y_coords,
            );
            flags.push(flag);
            (prev_x, prev_y) = (point.x, point.y);
        }
        data.extend_from_slice(&flags);
        data.extend_from_slice(&x_coords);
        data.extend_from_slice(&y_coords);
        // Keep glyph offsets even, so that the short `loca` format can be used.
        if data.len() % 2 == 1 {
            data.push(0);
        }

        Self {
            bbox: Some(bbox),
            contour_count,
            point_count: point_count_u16,
            data,
        }
    }
}

/// Writes a coordinate delta and returns the flags describing its encoding.
fn encode_delta(delta: i32, [short_flag, same_or_positive_flag]: [u8; 2], buffer: &mut Vec<u8>) -> u8 {
    if delta == 0 {
        return same_or_positive_flag;
    }
    if let Ok(abs) = u8::try_from(delta.unsigned_abs()) {
        buffer.push(abs);
        return if delta > 0 {
            short_flag | same_or_positive_flag
        } else {
            short_flag
        };
    }
    // Coordinates are clamped to +-16383, so the delta always fits.
    let delta = i16::try_from(delta).unwrap_or(if delta > 0 { i16::MAX } else { i16::MIN });
    write_i16(buffer, delta);
    0
}

fn write_i16(buffer: &mut Vec<u8>, value: i16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// [`Glyph`] together with its horizontal metrics.
#[derive(Debug, Clone)]
pub(crate) struct GlyphWithMetrics {
    pub(crate) inner: Glyph,
    pub(crate) advance: u16,
    pub(crate) lsb: i16,
}

impl GlyphWithMetrics {
    pub(crate) fn new(inner: Glyph, advance: u16) -> Self {
        let lsb = inner.bbox.map_or(0, |bbox| bbox.x_min);
        Self {
            inner,
            advance,
            lsb,
        }
    }

    /// Right side bearing, or `None` for empty glyphs.
    pub(crate) fn rsb(&self) -> Option<i32> {
        let bbox = self.inner.bbox?;
        Some(i32::from(self.advance) - i32::from(self.lsb) - bbox.width())
    }
}
