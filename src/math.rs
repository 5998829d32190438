//! Small 3D vector type and the numeric helpers shared by the layout algorithms.
//!
//! Everything here is `f32` so node buffers can be handed to a GPU or a
//! `Float32Array` without conversion.

use std::f32::consts::PI;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Golden angle in radians, `π (3 − √5)`.
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;

/// A point or direction in 3D graph space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn from_array(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    #[inline]
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    pub fn normalized(self) -> Option<Vec3> {
        let len = self.length();
        if len > 0.0 && len.is_finite() {
            Some(self / len)
        } else {
            None
        }
    }

    /// Scale the vector down so its length is at most `max`.
    pub fn clamp_length(self, max: f32) -> Vec3 {
        let len_sq = self.length_squared();
        if len_sq > max * max {
            self * (max / len_sq.sqrt())
        } else {
            self
        }
    }

    /// Clamp every component into `[-bound, bound]`.
    pub fn clamp_components(self, bound: f32) -> Vec3 {
        Vec3::new(
            self.x.clamp(-bound, bound),
            self.y.clamp(-bound, bound),
            self.z.clamp(-bound, bound),
        )
    }

    /// Rotate around the vertical (y) axis by `angle` radians.
    pub fn rotate_y(self, angle: f32) -> Vec3 {
        let (sin, cos) = angle.sin_cos();
        Vec3::new(self.x * cos + self.z * sin, self.y, -self.x * sin + self.z * cos)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    #[inline]
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    #[inline]
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec3) {
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl MulAssign<f32> for Vec3 {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

impl Div<f32> for Vec3 {
    type Output = Vec3;
    #[inline]
    fn div(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    #[inline]
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

// =============================================================================
// Random scatter
// =============================================================================

/// Uniform random point in the cube `[-half_extent, half_extent]³`.
pub fn random_in_cube<R: Rng + ?Sized>(rng: &mut R, half_extent: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-half_extent..=half_extent),
        rng.gen_range(-half_extent..=half_extent),
        rng.gen_range(-half_extent..=half_extent),
    )
}

/// Uniform random direction.
pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    // z uniform in [-1, 1] plus a uniform azimuth is uniform on the sphere.
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let theta: f32 = rng.gen_range(0.0..(2.0 * PI));
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// Uniform random point inside a ball of the given radius.
pub fn random_in_sphere<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> Vec3 {
    let u: f32 = rng.gen_range(0.0..=1.0);
    random_unit(rng) * (radius * u.cbrt())
}

// =============================================================================
// Distributions
// =============================================================================

/// Point `index` of `count` on a Fibonacci sphere of the given radius.
///
/// Heights are spaced evenly in `(-1, 1)` and successive points advance by the
/// golden angle, which keeps spacing visually uniform for any `count`.
pub fn fibonacci_sphere(index: usize, count: usize, radius: f32) -> Vec3 {
    if count == 0 {
        return Vec3::ZERO;
    }
    let y = 1.0 - 2.0 * (index as f32 + 0.5) / count as f32;
    let ring = (1.0 - y * y).max(0.0).sqrt();
    let theta = GOLDEN_ANGLE * index as f32;
    Vec3::new(ring * theta.cos(), y, ring * theta.sin()) * radius
}

/// Circular mean of a set of angles, or `None` when undefined
/// (empty input or directions that cancel out).
pub fn circular_mean(angles: impl IntoIterator<Item = f32>) -> Option<f32> {
    let (mut sin_sum, mut cos_sum, mut n) = (0.0_f32, 0.0_f32, 0usize);
    for a in angles {
        sin_sum += a.sin();
        cos_sum += a.cos();
        n += 1;
    }
    if n == 0 || (sin_sum.abs() < 1e-6 && cos_sum.abs() < 1e-6) {
        return None;
    }
    Some(sin_sum.atan2(cos_sum))
}

/// Normalize an angle into `[0, 2π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    angle.rem_euclid(2.0 * PI)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_clamp_length() {
        let v = Vec3::new(30.0, 40.0, 0.0);
        let c = v.clamp_length(10.0);
        assert!((c.length() - 10.0).abs() < 1e-4);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0).clamp_length(10.0), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_clamp_components() {
        let v = Vec3::new(5000.0, -5000.0, 3.0).clamp_components(1000.0);
        assert_eq!(v, Vec3::new(1000.0, -1000.0, 3.0));
    }

    #[test]
    fn test_normalized_zero() {
        assert!(Vec3::ZERO.normalized().is_none());
        let n = Vec3::new(0.0, 3.0, 4.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_y_preserves_length_and_height() {
        let v = Vec3::new(3.0, 7.0, 4.0);
        let r = v.rotate_y(1.234);
        assert!((r.length() - v.length()).abs() < 1e-4);
        assert_eq!(r.y, 7.0);
    }

    #[test]
    fn test_random_helpers_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let c = random_in_cube(&mut rng, 50.0);
            assert!(c.x.abs() <= 50.0 && c.y.abs() <= 50.0 && c.z.abs() <= 50.0);
            assert!(random_in_sphere(&mut rng, 20.0).length() <= 20.0 + 1e-3);
            assert!((random_unit(&mut rng).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_fibonacci_sphere_on_surface() {
        for count in [1, 2, 7, 100] {
            for i in 0..count {
                let p = fibonacci_sphere(i, count, 25.0);
                assert!((p.length() - 25.0).abs() < 1e-3, "point {i}/{count} off surface");
            }
        }
    }

    #[test]
    fn test_circular_mean() {
        let m = circular_mean([0.1, -0.1]).unwrap();
        assert!(m.abs() < 1e-6);
        // Mean across the 0/2π seam stays near 0, not near π.
        let m = circular_mean([0.2, 2.0 * PI - 0.2]).unwrap();
        assert!(m.abs() < 1e-4);
        assert!(circular_mean([0.0, PI]).is_none());
        assert!(circular_mean(std::iter::empty()).is_none());
    }
}
