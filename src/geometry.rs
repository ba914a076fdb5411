use crate::pose::Point;

/// Unsigned angle ABC in degrees, with `b` as the vertex.
///
/// Returns `None` when either arm has zero length or its length is not
/// representable as an `f64`. The result is always in `[0, 180]`.
pub(crate) fn angle_at_vertex(a: Point, b: Point, c: Point) -> Option<f64> {
    let ba = rescale(a - b)?;
    let bc = rescale(c - b)?;

    let cosine = ba.dot(bc) / (ba.norm() * bc.norm());
    if !cosine.is_finite() {
        return None;
    }

    Some(degrees_from_cosine(cosine))
}

/// Scale `v` so its largest component is 1, keeping `norm` and `dot` clear of
/// overflow and underflow. Only the direction matters for the angle.
fn rescale(v: Point) -> Option<Point> {
    let max = v.max_abs();
    if max == 0.0 || !max.is_finite() {
        return None;
    }
    Some(v / max)
}

/// Floating point error can push the cosine just outside `[-1, 1]`, where
/// `acos` returns NaN.
fn degrees_from_cosine(cosine: f64) -> f64 {
    cosine.max(-1.0).min(1.0).acos().to_degrees()
}
