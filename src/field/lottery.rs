//! Circular-container draw variant
//!
//! Balls tumble inside a round glass container under randomized turbulence.
//! The simulation is purely cosmetic: when the orchestrator asks for an
//! extraction, one ball is picked uniformly from the active set, which makes
//! this variant equivalent in distribution to drawing winners one at a time
//! with `select_winners`.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use smallvec::SmallVec;

use crate::field::collision::{clamp_speed, penetration_normal, reflect_damped};
use crate::field::{Departures, Entity, ParticleField};
use crate::random::{pick_index, random_offset, random_velocity};
use crate::roster::Student;

/// Random velocity perturbation added per axis per frame
const TURBULENCE: f32 = 4.0;
/// Fraction of speed kept after bouncing off the container wall
const WALL_RESTITUTION: f32 = 0.8;
/// Speed band keeping the tumble visually alive
const MIN_SPEED: f32 = 2.0;
const MAX_SPEED: f32 = 12.0;
/// Gap between the wall and the reachable ball-center circle
const WALL_MARGIN: f32 = 5.0;
/// Initial speed bound for freshly spawned balls
const SPAWN_SPEED: f32 = 4.0;

/// Container geometry, supplied by the presentation layer
#[derive(Debug, Clone, Copy)]
pub struct LotteryLayout {
    pub container_size: f32,
    pub ball_radius: f32,
}

impl Default for LotteryLayout {
    fn default() -> Self {
        Self {
            container_size: 400.0,
            ball_radius: 30.0,
        }
    }
}

impl LotteryLayout {
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::splat(self.container_size / 2.0)
    }

    /// Radius of the circle ball centers may reach
    #[inline]
    pub fn wall_radius(&self) -> f32 {
        self.container_size / 2.0 - self.ball_radius - WALL_MARGIN
    }

    /// Half-extent of the square spawn region around the center
    #[inline]
    fn spawn_half_extent(&self) -> f32 {
        self.container_size * 0.1875
    }
}

/// Balls in a circular container
pub struct LotteryField {
    layout: LotteryLayout,
    active: Vec<Entity>,
    departed: Vec<Entity>,
}

impl LotteryField {
    /// One ball per candidate, scattered around the container center
    pub fn new(candidates: &[Student], layout: LotteryLayout, rng: &mut Pcg32) -> Self {
        let center = layout.center();
        let active = candidates
            .iter()
            .map(|student| {
                let pos = center + random_offset(layout.spawn_half_extent(), rng);
                let vel = random_velocity(SPAWN_SPEED, rng);
                Entity::new(student, pos, vel)
            })
            .collect();

        Self {
            layout,
            active,
            departed: Vec::new(),
        }
    }

    pub fn layout(&self) -> &LotteryLayout {
        &self.layout
    }
}

impl ParticleField for LotteryField {
    fn step(&mut self, rng: &mut Pcg32) -> Departures {
        let center = self.layout.center();
        let wall_radius = self.layout.wall_radius();

        // Turbulence, then integrate
        for entity in &mut self.active {
            entity.vel += Vec2::new(
                (rng.gen::<f32>() - 0.5) * TURBULENCE,
                (rng.gen::<f32>() - 0.5) * TURBULENCE,
            );
            entity.pos += entity.vel;
        }

        // Pairwise overlap correction, half the overlap each, no velocity
        // exchange
        let count = self.active.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let delta = self.active[j].pos - self.active[i].pos;
                if let Some((normal, depth)) =
                    penetration_normal(delta, self.layout.ball_radius * 2.0)
                {
                    let push = normal * (depth * 0.5);
                    self.active[i].pos -= push;
                    self.active[j].pos += push;
                }
            }
        }

        // Circular boundary last, so a step always ends with every ball
        // inside the wall
        for entity in &mut self.active {
            let offset = entity.pos - center;
            let dist = offset.length();
            if dist > wall_radius {
                let normal = offset / dist;
                entity.pos = center + normal * wall_radius;
                entity.vel = reflect_damped(entity.vel, normal, WALL_RESTITUTION);
            }

            entity.vel = clamp_speed(entity.vel, MIN_SPEED, MAX_SPEED);
        }

        SmallVec::new()
    }

    fn active(&self) -> &[Entity] {
        &self.active
    }

    fn extract_one(&mut self, rng: &mut Pcg32) -> Option<Entity> {
        let index = pick_index(self.active.len(), rng)?;
        let entity = self.active.remove(index);
        self.departed.push(entity.clone());
        Some(entity)
    }

    fn departed(&self) -> &[Entity] {
        &self.departed
    }
}

// ============================================================================
// Exit path
// ============================================================================

/// Phase of the exit animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStage {
    /// Gliding from the pick position toward the tube mouth
    Moving,
    /// Rising through the exit tube
    Rising,
    /// Scaled-up winner display above the container
    Showing,
}

/// A point on the exit path
#[derive(Debug, Clone, Copy)]
pub struct ExitPoint {
    pub pos: Vec2,
    pub scale: f32,
    pub stage: ExitStage,
}

/// Vertical position of the tube mouth
const TUBE_Y: f32 = 30.0;
/// Drop below the tube mouth where the ball enters it
const TUBE_ENTRY_DROP: f32 = 80.0;
/// Length of the rise through the tube
const TUBE_RISE: f32 = 120.0;
/// Offsets of the showing position above the tube
const SHOW_OFFSET: f32 = 40.0;
const SHOW_RISE: f32 = 60.0;

/// Interpolate the exit path for a ball picked at `start`.
///
/// Three sequential phases over progress in [0, 1]: move to the tube entry
/// below the mouth (< 0.3), rise through the tube (< 0.6), then scale up
/// into the winner display. Piecewise linear and continuous at both seams.
pub fn exit_point(start: Vec2, progress: f32, layout: &LotteryLayout) -> ExitPoint {
    let progress = progress.clamp(0.0, 1.0);
    let tube_x = layout.container_size / 2.0;
    let entry = Vec2::new(tube_x, TUBE_Y + TUBE_ENTRY_DROP);

    if progress < 0.3 {
        let t = progress / 0.3;
        ExitPoint {
            pos: start + (entry - start) * t,
            scale: 1.0,
            stage: ExitStage::Moving,
        }
    } else if progress < 0.6 {
        let t = (progress - 0.3) / 0.3;
        ExitPoint {
            pos: Vec2::new(tube_x, entry.y - t * TUBE_RISE),
            scale: 1.0 + t * 0.4,
            stage: ExitStage::Rising,
        }
    } else {
        let t = (progress - 0.6) / 0.4;
        ExitPoint {
            pos: Vec2::new(tube_x, TUBE_Y - SHOW_OFFSET - t * SHOW_RISE),
            scale: 1.4 + t * 0.6,
            stage: ExitStage::Showing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn students(count: usize) -> Vec<Student> {
        (0..count)
            .map(|i| Student {
                id: format!("student-{}", i + 1),
                name: format!("S{}", i + 1),
                class_id: "class-1".to_string(),
                points: 10,
            })
            .collect()
    }

    #[test]
    fn test_one_entity_per_candidate() {
        let mut rng = Pcg32::seed_from_u64(1);
        let field = LotteryField::new(&students(8), LotteryLayout::default(), &mut rng);
        assert_eq!(field.active().len(), 8);
    }

    #[test]
    fn test_step_keeps_entities_inside_wall() {
        let mut rng = Pcg32::seed_from_u64(2);
        let layout = LotteryLayout::default();
        let mut field = LotteryField::new(&students(10), layout, &mut rng);

        for _ in 0..500 {
            field.step(&mut rng);
        }

        let wall = layout.wall_radius() + 1e-3;
        for entity in field.active() {
            let dist = (entity.pos - layout.center()).length();
            assert!(dist <= wall, "ball escaped the container: {}", dist);
        }
    }

    #[test]
    fn test_step_keeps_speed_in_band() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut field = LotteryField::new(&students(6), LotteryLayout::default(), &mut rng);

        for _ in 0..200 {
            field.step(&mut rng);
        }
        for entity in field.active() {
            let speed = entity.vel.length();
            assert!(speed <= MAX_SPEED + 1e-3, "too fast: {}", speed);
        }
    }

    #[test]
    fn test_extract_one_removes_exactly_one() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut field = LotteryField::new(&students(5), LotteryLayout::default(), &mut rng);

        let extracted = field.extract_one(&mut rng).unwrap();
        assert_eq!(field.active().len(), 4);
        assert_eq!(field.departed().len(), 1);
        assert!(field.active().iter().all(|e| e.id != extracted.id));
    }

    #[test]
    fn test_extract_from_empty_is_none() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut field = LotteryField::new(&[], LotteryLayout::default(), &mut rng);
        assert!(field.extract_one(&mut rng).is_none());
    }

    #[test]
    fn test_exit_point_continuous_at_seams() {
        let layout = LotteryLayout::default();
        let start = Vec2::new(120.0, 300.0);

        let before = exit_point(start, 0.2999, &layout);
        let after = exit_point(start, 0.3001, &layout);
        assert!((before.pos - after.pos).length() < 1.0);

        let before = exit_point(start, 0.5999, &layout);
        let after = exit_point(start, 0.6001, &layout);
        assert!((before.pos - after.pos).length() < 1.0);
        assert!((before.scale - after.scale).abs() < 0.01);
    }

    #[test]
    fn test_exit_point_stages() {
        let layout = LotteryLayout::default();
        let start = Vec2::new(120.0, 300.0);

        assert_eq!(exit_point(start, 0.0, &layout).stage, ExitStage::Moving);
        assert_eq!(exit_point(start, 0.45, &layout).stage, ExitStage::Rising);
        assert_eq!(exit_point(start, 0.9, &layout).stage, ExitStage::Showing);
        // Progress past 1.0 clamps instead of extrapolating
        let end = exit_point(start, 2.0, &layout);
        assert!((end.scale - 2.0).abs() < 0.001);
    }
}
