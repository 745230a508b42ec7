//! Rectangle math used to decide which text belongs to which highlight
//!
//! Coordinates are PDF user space. Orientation does not matter here: a
//! rectangle is just `x0 <= x1`, `y0 <= y1` bounds, and anything else is empty.

/// A 2D point on the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle `(x0, y0, x1, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Bounding rectangle of a set of points, `None` for an empty set
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            rect.x0 = rect.x0.min(p.x);
            rect.y0 = rect.y0.min(p.y);
            rect.x1 = rect.x1.max(p.x);
            rect.y1 = rect.y1.max(p.y);
        }
        Some(rect)
    }

    /// Rectangle with its corners reordered so that `x0 <= x1` and `y0 <= y1`
    pub fn normalized(&self) -> Self {
        Rect::new(
            self.x0.min(self.x1),
            self.y0.min(self.y1),
            self.x0.max(self.x1),
            self.y0.max(self.y1),
        )
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Zero-area (or inverted) rectangles are empty
    pub fn is_empty(&self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    pub fn area(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Overlapping part of two rectangles; may come back empty
    pub fn intersection(&self, other: &Rect) -> Rect {
        Rect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        )
    }

    /// Smallest rectangle containing both. Empty operands are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        intersects(self, other)
    }
}

/// True iff both rectangles are non-empty and overlap with positive area
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    !a.intersection(b).is_empty()
}

/// Fraction of `inner`'s area that lies inside `outer`, in `[0, 1]`
///
/// Empty operands, disjoint rectangles and a zero-area `inner` all give 0.
pub fn coverage_fraction(inner: &Rect, outer: &Rect) -> f32 {
    if inner.is_empty() || outer.is_empty() {
        return 0.0;
    }

    let overlap = inner.intersection(outer);
    if overlap.is_empty() {
        return 0.0;
    }

    let inner_area = inner.area();
    if inner_area <= 0.0 {
        return 0.0;
    }

    (overlap.area() / inner_area).clamp(0.0, 1.0)
}

/// Whether at least `threshold` of `inner` is covered by `outer`
pub fn mostly_within(inner: &Rect, outer: &Rect, threshold: f32) -> bool {
    coverage_fraction(inner, outer) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 15.0, 15.0);
        let c = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert!(intersects(&a, &b));
        assert!(!intersects(&a, &c));

        // Touching edges share no area
        let d = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert!(!intersects(&a, &d));
    }

    #[test]
    fn test_empty_never_intersects() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let flat = Rect::new(2.0, 5.0, 8.0, 5.0);
        assert!(flat.is_empty());
        assert!(!intersects(&a, &flat));
        assert!(!intersects(&flat, &a));
    }

    #[test]
    fn test_coverage_fraction() {
        let inner = Rect::new(0.0, 0.0, 10.0, 10.0);
        let outer = Rect::new(5.0, 0.0, 100.0, 100.0);
        assert!((coverage_fraction(&inner, &outer) - 0.5).abs() < 1e-6);
        assert!((coverage_fraction(&inner, &inner) - 1.0).abs() < 1e-6);

        let far = Rect::new(50.0, 50.0, 60.0, 60.0);
        assert_eq!(coverage_fraction(&inner, &far), 0.0);

        let empty = Rect::new(3.0, 3.0, 3.0, 9.0);
        assert_eq!(coverage_fraction(&empty, &outer), 0.0);
        assert_eq!(coverage_fraction(&inner, &empty), 0.0);
    }

    #[test]
    fn test_mostly_within() {
        let span = Rect::new(0.0, 0.0, 10.0, 10.0);
        let half = Rect::new(5.0, -5.0, 50.0, 50.0);
        let third = Rect::new(7.0, -5.0, 50.0, 50.0);
        assert!(mostly_within(&span, &half, 0.5));
        assert!(!mostly_within(&span, &third, 0.5));
    }

    #[test]
    fn test_from_points() {
        let points = [
            Point::new(10.0, 20.0),
            Point::new(40.0, 20.0),
            Point::new(10.0, 5.0),
            Point::new(40.0, 5.0),
        ];
        let rect = Rect::from_points(&points).unwrap();
        assert_eq!(rect, Rect::new(10.0, 5.0, 40.0, 20.0));
        assert!(Rect::from_points(&[]).is_none());
    }

    #[test]
    fn test_union_ignores_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 30.0, 15.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 30.0, 15.0));
        assert_eq!(Rect::default().union(&b), b);
    }
}
