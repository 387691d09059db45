use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Pitch, yaw and roll in degrees.
///
/// Pitch rotates about +X, yaw about +Y and roll about +Z. Composition
/// applies roll first, then pitch, then yaw.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotator {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Same value on every axis.
    pub const fn splat(angle: f32) -> Self {
        Self::new(angle, angle, angle)
    }

    /// Reinterpret the components as degrees and convert them to radians.
    pub fn to_radians(self) -> Self {
        Self::new(
            self.pitch.to_radians(),
            self.yaw.to_radians(),
            self.roll.to_radians(),
        )
    }

    /// Reinterpret the components as radians and convert them to degrees.
    pub fn to_degrees(self) -> Self {
        Self::new(
            self.pitch.to_degrees(),
            self.yaw.to_degrees(),
            self.roll.to_degrees(),
        )
    }

    /// Wrap an angle into `[0, 360)`.
    pub fn clamp_axis(angle: f32) -> f32 {
        let wrapped = angle.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if wrapped >= 360.0 { 0.0 } else { wrapped }
    }

    /// Wrap an angle into `[-180, 180)`.
    pub fn normalize_axis(angle: f32) -> f32 {
        let wrapped = Self::clamp_axis(angle);
        if wrapped >= 180.0 {
            wrapped - 360.0
        } else {
            wrapped
        }
    }

    /// Copy with every axis wrapped into `[0, 360)`.
    pub fn clamped(self) -> Self {
        Self::new(
            Self::clamp_axis(self.pitch),
            Self::clamp_axis(self.yaw),
            Self::clamp_axis(self.roll),
        )
    }

    /// Copy with every axis wrapped into `[-180, 180)`.
    pub fn normalized(self) -> Self {
        Self::new(
            Self::normalize_axis(self.pitch),
            Self::normalize_axis(self.yaw),
            Self::normalize_axis(self.roll),
        )
    }

    /// Compare two rotators axis by axis after normalization.
    pub fn equals(self, other: Self, tolerance: f32) -> bool {
        let diff = (self - other).normalized();
        diff.pitch.abs() <= tolerance && diff.yaw.abs() <= tolerance && diff.roll.abs() <= tolerance
    }

    pub fn is_zero(self) -> bool {
        self == Self::ZERO
    }

    pub fn is_nearly_zero(self, tolerance: f32) -> bool {
        self.equals(Self::ZERO, tolerance)
    }

    pub fn contains_nan(self) -> bool {
        !(self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite())
    }

    /// Quaternion for this rotation.
    pub fn to_quat(self) -> Quat {
        let r = self.to_radians();
        Quat::from_euler(EulerRot::YXZ, r.yaw, r.pitch, r.roll)
    }

    pub fn rotate_vector(self, v: Vec3) -> Vec3 {
        self.to_quat() * v
    }

    /// Apply the inverse rotation.
    pub fn unrotate_vector(self, v: Vec3) -> Vec3 {
        self.to_quat().inverse() * v
    }
}

impl Add for Rotator {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.pitch + rhs.pitch, self.yaw + rhs.yaw, self.roll + rhs.roll)
    }
}

impl AddAssign for Rotator {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Rotator {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.pitch - rhs.pitch, self.yaw - rhs.yaw, self.roll - rhs.roll)
    }
}

impl SubAssign for Rotator {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Rotator {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.pitch, -self.yaw, -self.roll)
    }
}

impl Mul<f32> for Rotator {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.pitch * rhs, self.yaw * rhs, self.roll * rhs)
    }
}

impl fmt::Display for Rotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P={:.2} Y={:.2} R={:.2}",
            self.pitch, self.yaw, self.roll
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn radians_round_trip_matches_normalized_input() {
        let original = Rotator::new(30.0, -200.0, 370.0);
        let round_trip = original.to_radians().to_degrees();
        assert!(round_trip.equals(original, 1e-3));
        let n = round_trip.normalized();
        assert!((n.pitch - 30.0).abs() < 1e-3);
        assert!((n.yaw - 160.0).abs() < 1e-3);
        assert!((n.roll - 10.0).abs() < 1e-3);
    }

    #[test]
    fn normalize_axis_range() {
        assert_eq!(Rotator::normalize_axis(180.0), -180.0);
        assert_eq!(Rotator::normalize_axis(-180.0), -180.0);
        assert_eq!(Rotator::normalize_axis(540.0), -180.0);
        assert!((Rotator::normalize_axis(359.0) + 1.0).abs() < 1e-4);
        assert_eq!(Rotator::normalize_axis(0.0), 0.0);
    }

    #[test]
    fn clamp_axis_range() {
        assert_eq!(Rotator::clamp_axis(-90.0), 270.0);
        assert_eq!(Rotator::clamp_axis(720.0), 0.0);
        assert_eq!(Rotator::clamp_axis(45.0), 45.0);
    }

    #[test]
    fn yaw_turns_right() {
        let yaw = Rotator::new(0.0, 90.0, 0.0);
        assert!(close(yaw.rotate_vector(Vec3::Z), Vec3::X));
        assert!(close(yaw.rotate_vector(Vec3::new(5.0, 0.0, 0.0)), Vec3::new(0.0, 0.0, -5.0)));
    }

    #[test]
    fn positive_pitch_looks_down() {
        let pitch = Rotator::new(90.0, 0.0, 0.0);
        assert!(close(pitch.rotate_vector(Vec3::Z), Vec3::NEG_Y));
    }

    #[test]
    fn unrotate_inverts_rotate() {
        let r = Rotator::new(12.0, -47.0, 81.0);
        let v = Vec3::new(1.0, -2.0, 3.5);
        assert!(close(r.unrotate_vector(r.rotate_vector(v)), v));
    }

    #[test]
    fn roll_applies_before_yaw() {
        // Roll 90 takes +X to +Y; yaw then leaves +Y untouched.
        let r = Rotator::new(0.0, 90.0, 90.0);
        assert!(close(r.rotate_vector(Vec3::X), Vec3::Y));
    }

    #[test]
    fn arithmetic_and_nan() {
        let a = Rotator::new(1.0, 2.0, 3.0);
        assert_eq!(a + a, a * 2.0);
        assert!((a - a).is_zero());
        assert_eq!(-a, Rotator::new(-1.0, -2.0, -3.0));
        assert!(Rotator::new(f32::NAN, 0.0, 0.0).contains_nan());
        assert!(!a.contains_nan());
    }

    #[test]
    fn display_format() {
        let s = format!("{}", Rotator::new(1.0, 2.0, 3.0));
        assert_eq!(s, "P=1.00 Y=2.00 R=3.00");
    }
}
