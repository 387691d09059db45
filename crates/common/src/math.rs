//! Scalar and vector helpers.

use glam::Vec3;

pub const KINDA_SMALL_NUMBER: f32 = 1e-4;

pub fn lerp(a: f32, b: f32, alpha: f32) -> f32 {
    a + (b - a) * alpha
}

/// Move `current` towards `target` at `speed` per second, never overshooting.
///
/// A non-positive speed snaps straight to the target.
pub fn interp_to(current: f32, target: f32, delta_time: f32, speed: f32) -> f32 {
    if speed <= 0.0 {
        return target;
    }
    let distance = target - current;
    if distance * distance < KINDA_SMALL_NUMBER * KINDA_SMALL_NUMBER {
        return target;
    }
    let step = distance * (delta_time * speed).clamp(0.0, 1.0);
    current + step
}

pub fn interp_vec_to(current: Vec3, target: Vec3, delta_time: f32, speed: f32) -> Vec3 {
    Vec3::new(
        interp_to(current.x, target.x, delta_time, speed),
        interp_to(current.y, target.y, delta_time, speed),
        interp_to(current.z, target.z, delta_time, speed),
    )
}

/// Width over height. A zero height yields 1.0.
pub fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}

pub fn nearly_equal(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }

    #[test]
    fn interp_to_does_not_overshoot() {
        assert_eq!(interp_to(0.0, 10.0, 1.0, 5.0), 10.0);
        let v = interp_to(0.0, 10.0, 0.1, 1.0);
        assert!(v > 0.0 && v < 10.0);
        assert_eq!(interp_to(3.0, 10.0, 0.1, 0.0), 10.0);
    }

    #[test]
    fn interp_vec_moves_each_axis() {
        let v = interp_vec_to(Vec3::ZERO, Vec3::new(1.0, -1.0, 0.0), 0.5, 1.0);
        assert!(v.x > 0.0 && v.y < 0.0 && v.z == 0.0);
    }

    #[test]
    fn aspect_ratio_handles_zero_height() {
        assert_eq!(aspect_ratio(1280, 0), 1.0);
        assert!(nearly_equal(aspect_ratio(1280, 720), 16.0 / 9.0, 1e-6));
    }
}
