//! Conversion of SVG paths to TrueType contours.

use kurbo::{BezPath, CubicBez, PathEl, Point};

/// Maximum deviation of the quadratic approximation of a cubic segment, in font units.
const CUBIC_ACCURACY: f64 = 0.3;
/// Coordinates are clamped so that the difference between any two of them fits into `i16`.
const MAX_COORDINATE: f64 = 16_383.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OutlinePoint {
    pub(crate) x: i16,
    pub(crate) y: i16,
    pub(crate) on_curve: bool,
}

impl OutlinePoint {
    #[allow(clippy::cast_possible_truncation)] // coordinates are clamped
    fn new(point: Point, on_curve: bool) -> Self {
        let round = |coord: f64| {
            if coord.is_finite() {
                coord.round().clamp(-MAX_COORDINATE, MAX_COORDINATE) as i16
            } else {
                0
            }
        };
        Self {
            x: round(point.x),
            y: round(point.y),
            on_curve,
        }
    }
}

/// Closed contour consisting of on-curve and off-curve (quadratic control) points.
#[derive(Debug, Clone, Default)]
pub(crate) struct Contour {
    pub(crate) points: Vec<OutlinePoint>,
}

impl Contour {
    fn push(&mut self, point: OutlinePoint) {
        if point.on_curve && self.points.last() == Some(&point) {
            return;
        }
        self.points.push(point);
    }

    fn finish(mut self, output: &mut Vec<Self>) {
        if self.points.len() > 1 && self.points.first() == self.points.last() {
            self.points.pop();
        }
        if self.points.len() >= 3 {
            output.push(self);
        }
    }
}

/// Converts an SVG path to TrueType contours. Cubic segments are approximated by quadratic
/// splines; open subpaths are closed implicitly; contours with less than 3 points are dropped.
pub(crate) fn contours(path: &BezPath) -> Vec<Contour> {
    let mut output = vec![];
    let mut current = Contour::default();
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;

    for element in path.elements() {
        match *element {
            PathEl::MoveTo(point) => {
                std::mem::take(&mut current).finish(&mut output);
                current.push(OutlinePoint::new(point, true));
                (start, last) = (point, point);
            }
            PathEl::LineTo(point) => {
                current.push(OutlinePoint::new(point, true));
                last = point;
            }
            PathEl::QuadTo(control, point) => {
                current.push(OutlinePoint::new(control, false));
                current.push(OutlinePoint::new(point, true));
                last = point;
            }
            PathEl::CurveTo(control1, control2, point) => {
                let cubic = CubicBez::new(last, control1, control2, point);
                for (_, _, quad) in cubic.to_quads(CUBIC_ACCURACY) {
                    current.push(OutlinePoint::new(quad.p1, false));
                    current.push(OutlinePoint::new(quad.p2, true));
                }
                last = point;
            }
            PathEl::ClosePath => {
                std::mem::take(&mut current).finish(&mut output);
                // A following segment without `MoveTo` starts at the subpath start.
                current.push(OutlinePoint::new(start, true));
                last = start;
            }
        }
    }
    current.finish(&mut output);
    output
}
