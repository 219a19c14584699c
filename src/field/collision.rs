//! Shared collision-response math for the particle fields

use glam::Vec2;

/// Reflect a velocity about a surface normal: v' = v - 2(v·n)n
#[inline]
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Reflect and damp by a restitution factor
#[inline]
pub fn reflect_damped(velocity: Vec2, normal: Vec2, restitution: f32) -> Vec2 {
    reflect(velocity, normal) * restitution
}

/// Overlap test for two circles separated by `delta` with combined radius
/// `min_dist`. Returns the contact normal (pointing along `delta`) and the
/// penetration depth, or `None` when the circles are apart or concentric.
#[inline]
pub fn penetration_normal(delta: Vec2, min_dist: f32) -> Option<(Vec2, f32)> {
    let dist_sq = delta.length_squared();
    if dist_sq <= 0.0 || dist_sq >= min_dist * min_dist {
        return None;
    }
    let dist = dist_sq.sqrt();
    Some((delta / dist, min_dist - dist))
}

/// Clamp a velocity into a speed band.
///
/// Keeps the draw visually active: too-fast balls are slowed to `max`,
/// near-stationary balls are kicked back toward `min` (with the divisor
/// floored so a dead-stop ball still moves).
#[inline]
pub fn clamp_speed(velocity: Vec2, min: f32, max: f32) -> Vec2 {
    let speed = velocity.length();
    if speed > max {
        return velocity * (max / speed);
    }
    if speed < min {
        return velocity * (min / speed.max(0.1));
    }
    velocity
}
