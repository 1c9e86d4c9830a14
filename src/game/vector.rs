//! 2D vector math
//!
//! Positions, velocities and forces all share this type. Screen convention:
//! +x right, +y down, so a positive gravity y pulls entities toward the
//! bottom of the view.

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use serde::{Serialize, Deserialize};

/// Coordinate axis selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// 2D vector / point
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Same value on both axes
    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v }
    }

    pub fn component(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    pub fn set_component(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
        }
    }

    pub fn dot(self, other: Vector) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product (signed parallelogram area)
    pub fn cross(self, other: Vector) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction. A zero vector stays zero.
    pub fn normalize(self) -> Vector {
        let l = self.length();
        if l == 0.0 {
            return Vector::ZERO;
        }
        Vector {
            x: self.x / l,
            y: self.y / l,
        }
    }

    /// In-place `normalize`
    pub fn normalize_mut(&mut self) {
        *self = self.normalize();
    }

    pub fn scale(self, s: f64) -> Vector {
        Vector {
            x: self.x * s,
            y: self.y * s,
        }
    }

    pub fn distance(self, other: Vector) -> f64 {
        (self - other).length()
    }

    pub fn distance_squared(self, other: Vector) -> f64 {
        (self - other).length_squared()
    }

    /// Rotate counter-clockwise (in +y-up terms) by `radians`
    pub fn rotate(self, radians: f64) -> Vector {
        let (sin, cos) = radians.sin_cos();
        Vector {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    /// Linear interpolation, `t = 0` gives `self`, `t = 1` gives `other`
    pub fn lerp(self, other: Vector, t: f64) -> Vector {
        self + (other - self) * t
    }

    /// Shorten to `max` if longer, otherwise unchanged
    pub fn clamp_length(self, max: f64) -> Vector {
        let len_sq = self.length_squared();
        if len_sq > max * max && len_sq > 0.0 {
            self * (max / len_sq.sqrt())
        } else {
            self
        }
    }

    /// Rotated 90 degrees
    pub fn perpendicular(self) -> Vector {
        Vector { x: -self.y, y: self.x }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn approx_eq(self, other: Vector, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps && (self.y - other.y).abs() <= eps
    }
}

impl Add for Vector {
    type Output = Vector;
    fn add(self, other: Vector) -> Vector {
        Vector {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, other: Vector) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vector {
    type Output = Vector;
    fn sub(self, other: Vector) -> Vector {
        Vector {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl SubAssign for Vector {
    fn sub_assign(&mut self, other: Vector) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;
    fn mul(self, s: f64) -> Vector {
        self.scale(s)
    }
}

impl MulAssign<f64> for Vector {
    fn mul_assign(&mut self, s: f64) {
        self.x *= s;
        self.y *= s;
    }
}

impl Neg for Vector {
    type Output = Vector;
    fn neg(self) -> Vector {
        Vector {
            x: -self.x,
            y: -self.y,
        }
    }
}

impl From<(f64, f64)> for Vector {
    fn from((x, y): (f64, f64)) -> Self {
        Vector { x, y }
    }
}
