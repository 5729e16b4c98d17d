//! Collision detection and response primitives
//!
//! Stateless geometry shared by the physics and combat passes: circle and
//! segment tests against axis-aligned cells, closest approach along a path,
//! mass-proportional impulse resolution and look-ahead obstacle steering.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Axis-aligned rectangle in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center_half(center: Vec2, half: Vec2) -> Self {
        Self::new(center - half, center + half)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Grow the rectangle by `amount` on every side
    pub fn expanded(&self, amount: f32) -> Rect {
        Rect::new(self.min - Vec2::splat(amount), self.max + Vec2::splat(amount))
    }

    #[inline]
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

/// A circular rigid body as seen by the physics kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Non-finite or non-positive mass is immovable
    pub mass: f32,
}

impl Body {
    pub fn new(pos: Vec2, vel: Vec2, radius: f32, mass: f32) -> Self {
        Self {
            pos,
            vel,
            radius,
            mass,
        }
    }

    #[inline]
    fn inverse_mass(&self) -> f32 {
        if self.mass.is_finite() && self.mass > GEOMETRY_EPSILON {
            1.0 / self.mass
        } else {
            0.0
        }
    }
}

/// A circle that free-flying entities try not to fly into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub center: Vec2,
    pub radius: f32,
}

/// Closest point on a segment to some circle centre
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentApproach {
    /// Parametric position along the segment, in [0, 1]
    pub t: f32,
    pub point: Vec2,
    pub distance_sq: f32,
}

/// Does a circle overlap a rectangle?
#[inline]
pub fn circle_vs_rect(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let closest = rect.closest_point(center);
    (center - closest).length_squared() <= radius * radius
}

/// Does the segment `a -> b` touch the rectangle anywhere?
#[inline]
pub fn segment_vs_rect(a: Vec2, b: Vec2, rect: &Rect) -> bool {
    segment_rect_entry_time(a, b, rect).is_some()
}

/// Parametric time in [0, 1] at which `a -> b` first enters the rectangle
///
/// Returns `Some(0.0)` when `a` already lies inside. Slab method; an axis
/// with (near) zero extent is treated as parallel to that slab.
pub fn segment_rect_entry_time(a: Vec2, b: Vec2, rect: &Rect) -> Option<f32> {
    let d = b - a;
    let mut t_enter = 0.0_f32;
    let mut t_exit = 1.0_f32;

    for (origin, dir, lo, hi) in [
        (a.x, d.x, rect.min.x, rect.max.x),
        (a.y, d.y, rect.min.y, rect.max.y),
    ] {
        if dir.abs() < GEOMETRY_EPSILON {
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / dir;
        let mut t1 = (lo - origin) * inv;
        let mut t2 = (hi - origin) * inv;
        if t1 > t2 {
            std::mem::swap(&mut t1, &mut t2);
        }
        t_enter = t_enter.max(t1);
        t_exit = t_exit.min(t2);
        if t_enter > t_exit {
            return None;
        }
    }

    Some(t_enter)
}

/// Closest point on segment `a -> b` to `center`
pub fn segment_closest_approach_to_circle(a: Vec2, b: Vec2, center: Vec2) -> SegmentApproach {
    let seg = b - a;
    let len_sq = seg.length_squared();
    let t = if len_sq < GEOMETRY_EPSILON {
        0.0 // Degenerate segment
    } else {
        ((center - a).dot(seg) / len_sq).clamp(0.0, 1.0)
    };
    let point = a + seg * t;
    SegmentApproach {
        t,
        point,
        distance_sq: (center - point).length_squared(),
    }
}

/// Parametric time in [0, 1] at which `a -> b` first comes within `radius`
/// of `center`; `Some(0.0)` when `a` already does
pub fn segment_circle_entry_time(a: Vec2, b: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let from_center = a - center;
    let c = from_center.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let d = b - a;
    let qa = d.length_squared();
    if qa < GEOMETRY_EPSILON {
        return None;
    }
    let qb = from_center.dot(d);
    let disc = qb * qb - qa * c;
    if qb >= 0.0 || disc < 0.0 {
        return None;
    }
    let t = (-qb - disc.sqrt()) / qa;
    (t <= 1.0).then_some(t)
}

/// Resolve an overlap between two circular bodies
///
/// Pushes the bodies apart along the contact normal, split by inverse mass,
/// then applies a restitution impulse. Returns `false` (and changes nothing)
/// when the bodies do not overlap, are already separating, or their centres
/// coincide.
pub fn resolve_circle_collision(a: &mut Body, b: &mut Body) -> bool {
    let delta = b.pos - a.pos;
    let radii = a.radius + b.radius;
    let dist_sq = delta.length_squared();
    if dist_sq >= radii * radii {
        return false;
    }

    let dist = dist_sq.sqrt();
    if dist < GEOMETRY_EPSILON {
        return false; // No usable normal
    }
    let normal = delta / dist;
    if (b.vel - a.vel).dot(normal) > 0.0 {
        return false; // Already separating
    }
    separate_along(a, b, normal, radii - dist)
}

/// Push `a` and `b` apart by `penetration` along the unit `normal` (pointing
/// from `a` toward `b`), split by inverse mass
///
/// A restitution impulse cancels any closing velocity along the normal.
/// Returns `false` when both bodies are immovable.
pub fn separate_along(a: &mut Body, b: &mut Body, normal: Vec2, penetration: f32) -> bool {
    let inv_a = a.inverse_mass();
    let inv_b = b.inverse_mass();
    let inv_sum = inv_a + inv_b;
    if inv_sum <= 0.0 {
        return false;
    }

    a.pos -= normal * penetration * (inv_a / inv_sum);
    b.pos += normal * penetration * (inv_b / inv_sum);

    let closing = (b.vel - a.vel).dot(normal);
    if closing < 0.0 {
        let j = -(1.0 + RESTITUTION) * closing / inv_sum;
        a.vel -= normal * j * inv_a;
        b.vel += normal * j * inv_b;
    }
    true
}

/// Bend `vel` away from obstacles that lie on the look-ahead path
///
/// Speed is preserved; only direction changes. Obstacles whose swept
/// clearance is not penetrated are ignored.
pub fn steer_around_obstacles(
    pos: Vec2,
    vel: Vec2,
    radius: f32,
    obstacles: &[Obstacle],
    dt: f32,
) -> Vec2 {
    let speed_sq = vel.length_squared();
    if speed_sq < GEOMETRY_EPSILON {
        return vel;
    }
    let speed = speed_sq.sqrt();
    let dir = vel / speed;
    let tangent = dir.perp();
    let ahead = pos + vel * STEER_LOOKAHEAD;

    let mut avoidance = Vec2::ZERO;
    let mut deepest = 0.0_f32;
    for obstacle in obstacles {
        let clearance = obstacle.radius + radius + STEER_MARGIN;
        let approach = segment_closest_approach_to_circle(pos, ahead, obstacle.center);
        if approach.distance_sq >= clearance * clearance {
            continue;
        }
        let depth = (clearance - approach.distance_sq.sqrt()) / clearance;
        // Turn toward whichever side the obstacle is not on
        let side = (obstacle.center - pos).dot(tangent);
        let away = if side > 0.0 { -tangent } else { tangent };
        avoidance += away * depth;
        deepest = deepest.max(depth);
    }

    if avoidance.length_squared() < GEOMETRY_EPSILON {
        return vel;
    }

    let blend = (deepest * STEER_BLEND_RATE * dt).clamp(0.0, 1.0);
    let steered = dir.lerp(avoidance.normalize(), blend).normalize_or_zero();
    if steered == Vec2::ZERO {
        vel
    } else {
        steered * speed
    }
}
