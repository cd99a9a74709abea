//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

use cgmath::num_traits::Float;

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq)]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval overlaps with the other.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.max > other.min && other.max > self.min
    }

    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

impl<T: std::ops::Sub<T, Output = T> + Copy> Interval<T> {
    /// Gets the magnitude of the interval.
    pub fn length(&self) -> T {
        self.max - self.min
    }
}

impl<T: Float> Interval<T> {
    /// Creates an interval with the given centre and radius.
    pub fn disc(centre: T, radius: T) -> Self {
        Self {
            min: centre - radius,
            max: centre + radius,
        }
    }

    /// Returns the centre/mid-point of the interval.
    pub fn midpoint(&self) -> T {
        T::from(0.5).unwrap() * (self.min + self.max)
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

/// An RGB colour with components in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Creates a colour from hue, saturation and brightness, all in `[0, 1]`.
    pub fn from_hsb(h: f32, s: f32, b: f32) -> Self {
        let h = (h.fract() + 1.0).fract() * 6.0;
        let i = h.floor();
        let f = h - i;
        let p = b * (1.0 - s);
        let q = b * (1.0 - s * f);
        let t = b * (1.0 - s * (1.0 - f));
        let (r, g, bl) = match i as u32 {
            0 => (b, t, p),
            1 => (q, b, p),
            2 => (p, b, t),
            3 => (p, q, b),
            4 => (t, p, b),
            _ => (b, p, q),
        };
        Self { r, g, b: bl }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hsb_primaries() {
        assert_eq!(Color::from_hsb(0.0, 1.0, 1.0), Color { r: 1.0, g: 0.0, b: 0.0 });
        let g = Color::from_hsb(1.0 / 3.0, 1.0, 1.0);
        assert!(g.g > 0.99 && g.r < 0.01 && g.b < 0.01);
    }

    #[test]
    fn interval_basics() {
        let i = Interval::new(2.0, 6.0);
        assert!(i.contains(2.0) && i.contains(6.0) && !i.contains(6.1));
        assert_eq!(i.length(), 4.0);
        assert_eq!(i.midpoint(), 4.0);
        assert!(i.overlaps(&Interval::new(5.0, 9.0)));
        assert!(!i.overlaps(&Interval::new(6.0, 9.0)));
    }
}
