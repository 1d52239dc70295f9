//! Axis-aligned pixel bounding boxes.

mod common;
use crate::common::*;

/// Bounding box in xmin/ymin/xmax/ymax pixel coordinates.
///
/// The coordinate ordering invariants `xmin <= xmax` and `ymin <= ymax` are
/// checked at construction time and hold for the lifetime of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bbox<T> {
    xmin: T,
    ymin: T,
    xmax: T,
    ymax: T,
}

impl<T> Bbox<T> {
    pub fn try_cast<V>(self) -> Option<Bbox<V>>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        Some(Bbox {
            xmin: V::from(self.xmin)?,
            ymin: V::from(self.ymin)?,
            xmax: V::from(self.xmax)?,
            ymax: V::from(self.ymax)?,
        })
    }

    pub fn cast<V>(self) -> Bbox<V>
    where
        T: ToPrimitive,
        V: NumCast,
    {
        self.try_cast().unwrap()
    }
}

impl<T> Bbox<T>
where
    T: Copy + Num + PartialOrd,
{
    pub fn try_from_xyxy(xyxy: [T; 4]) -> Result<Self> {
        let [xmin, ymin, xmax, ymax] = xyxy;
        ensure!(
            xmax >= xmin && ymax >= ymin,
            "xmax >= xmin and ymax >= ymin must hold"
        );
        Ok(Self {
            xmin,
            ymin,
            xmax,
            ymax,
        })
    }

    pub fn from_xyxy(xyxy: [T; 4]) -> Self {
        Self::try_from_xyxy(xyxy).unwrap()
    }

    pub fn try_from_xywh(xywh: [T; 4]) -> Result<Self> {
        let [x, y, w, h] = xywh;
        Self::try_from_xyxy([x, y, x + w, y + h])
    }

    pub fn from_xywh(xywh: [T; 4]) -> Self {
        Self::try_from_xywh(xywh).unwrap()
    }

    pub fn xmin(&self) -> T {
        self.xmin
    }

    pub fn ymin(&self) -> T {
        self.ymin
    }

    pub fn xmax(&self) -> T {
        self.xmax
    }

    pub fn ymax(&self) -> T {
        self.ymax
    }

    pub fn xyxy(&self) -> [T; 4] {
        [self.xmin, self.ymin, self.xmax, self.ymax]
    }

    pub fn w(&self) -> T {
        self.xmax - self.xmin
    }

    pub fn h(&self) -> T {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> T {
        self.w() * self.h()
    }

    pub fn perimeter(&self) -> T {
        let two = T::one() + T::one();
        two * (self.w() + self.h())
    }

    /// Whether the box has zero extent on either axis.
    pub fn is_empty(&self) -> bool {
        self.w() == T::zero() || self.h() == T::zero()
    }

    /// The smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            xmin: pmin(self.xmin, other.xmin),
            ymin: pmin(self.ymin, other.ymin),
            xmax: pmax(self.xmax, other.xmax),
            ymax: pmax(self.ymax, other.ymax),
        }
    }

    /// The smallest box enclosing every input box, or `None` on an empty
    /// iterator.
    pub fn enclosing(boxes: impl IntoIterator<Item = Self>) -> Option<Self> {
        boxes.into_iter().reduce(|lhs, rhs| lhs.union(&rhs))
    }

    /// Signed separation of the two boxes' x-axis projections. Negative when
    /// the projections overlap. Requires a signed scalar type.
    ///
    /// Equal to the distance between the projection midpoints minus half the
    /// sum of their extents, but division-free so it stays exact for integer
    /// coordinates.
    pub fn gap_x(&self, other: &Self) -> T {
        pmax(self.xmin - other.xmax, other.xmin - self.xmax)
    }

    /// Signed separation of the two boxes' y-axis projections.
    pub fn gap_y(&self, other: &Self) -> T {
        pmax(self.ymin - other.ymax, other.ymin - self.ymax)
    }

    /// Whether the boxes are overlapping or within `gap` of each other on
    /// both axes.
    pub fn is_within_gap(&self, other: &Self, gap: T) -> bool {
        self.gap_x(other) <= gap && self.gap_y(other) <= gap
    }
}

fn pmin<T>(lhs: T, rhs: T) -> T
where
    T: PartialOrd,
{
    if rhs < lhs {
        rhs
    } else {
        lhs
    }
}

fn pmax<T>(lhs: T, rhs: T) -> T
where
    T: PartialOrd,
{
    if rhs > lhs {
        rhs
    } else {
        lhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn extents_and_area() {
        let bbox = Bbox::from_xyxy([2, 3, 12, 8]);
        assert_eq!(bbox.w(), 10);
        assert_eq!(bbox.h(), 5);
        assert_eq!(bbox.area(), 50);
        assert_eq!(bbox.perimeter(), 30);
        assert!(!bbox.is_empty());
        assert!(Bbox::from_xyxy([2, 3, 2, 8]).is_empty());
    }

    #[test]
    fn invalid_ordering_rejected() {
        assert!(Bbox::try_from_xyxy([10, 0, 0, 10]).is_err());
        assert!(Bbox::try_from_xyxy([0, 10, 10, 0]).is_err());
    }

    #[test]
    fn from_xywh() {
        let bbox = Bbox::from_xywh([1.0, 2.0, 4.0, 8.0]);
        assert_abs_diff_eq!(bbox.xmax(), 5.0);
        assert_abs_diff_eq!(bbox.ymax(), 10.0);
    }

    #[test]
    fn union_encloses_both() {
        let lhs = Bbox::from_xyxy([0, 0, 10, 10]);
        let rhs = Bbox::from_xyxy([5, -2, 20, 8]);
        assert_eq!(lhs.union(&rhs), Bbox::from_xyxy([0, -2, 20, 10]));
        assert_eq!(
            Bbox::enclosing([lhs, rhs]),
            Some(Bbox::from_xyxy([0, -2, 20, 10]))
        );
        assert_eq!(Bbox::<i64>::enclosing([]), None);
    }

    #[test]
    fn axis_gaps() {
        let lhs = Bbox::from_xyxy([0, 0, 10, 10]);
        let rhs = Bbox::from_xyxy([12, 0, 20, 10]);
        assert_eq!(lhs.gap_x(&rhs), 2);
        assert_eq!(lhs.gap_y(&rhs), -10);
        assert!(lhs.is_within_gap(&rhs, 5));
        assert!(!lhs.is_within_gap(&rhs, 0));
        // symmetric
        assert_eq!(rhs.gap_x(&lhs), 2);
    }

    #[test]
    fn gap_matches_midpoint_formulation() {
        // |mid1 - mid2| - (extent1 + extent2) / 2, on boxes where the
        // division is exact
        let lhs = Bbox::from_xyxy([0.0, 0.0, 10.0, 4.0]);
        let rhs = Bbox::from_xyxy([16.0, 1.0, 22.0, 3.0]);
        let mid_gap_x = ((0.0 + 10.0) / 2.0f64 - (16.0 + 22.0) / 2.0).abs() - (10.0 + 6.0) / 2.0;
        assert_abs_diff_eq!(lhs.gap_x(&rhs), mid_gap_x);
    }

    #[test]
    fn contained_box_gap_is_negative() {
        let outer = Bbox::from_xyxy([0, 0, 100, 100]);
        let inner = Bbox::from_xyxy([40, 40, 60, 60]);
        assert!(outer.gap_x(&inner) < 0);
        assert!(outer.gap_y(&inner) < 0);
        assert!(outer.is_within_gap(&inner, 0));
    }

    #[test]
    fn cast_between_scalars() {
        let bbox = Bbox::from_xyxy([1i64, 2, 3, 4]).cast::<f32>();
        assert_abs_diff_eq!(bbox.xmin(), 1.0);
        assert_abs_diff_eq!(bbox.ymax(), 4.0);
    }
}
