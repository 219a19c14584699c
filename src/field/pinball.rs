//! Funnel/peg-board draw variant
//!
//! Balls drop through a tapering funnel studded with pegs and race for the
//! exit gate at the bottom. Finish order is the selection mechanism: the
//! winners are the last balls to arrive. Chaotic sensitivity to the peg
//! field is what randomizes the outcome here, which is a weaker fairness
//! guarantee than the circular container's explicit uniform pick; the
//! asymmetry is preserved deliberately.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use smallvec::SmallVec;

use crate::field::collision::{penetration_normal, reflect_damped};
use crate::field::{Departures, Entity, ParticleField};
use crate::random::shuffle;
use crate::roster::Student;

/// Downward acceleration per frame
const GRAVITY: f32 = 0.25;
/// Horizontal velocity decay per frame
const FRICTION: f32 = 0.995;
/// Fraction of speed kept after a wall, peg or floor bounce
const RESTITUTION: f32 = 0.65;
/// Random horizontal kick on each peg contact, per axis half-range
const PEG_KICK: f32 = 1.5;
/// Fraction of the separating velocity cancelled on ball contact
const BALL_CONTACT_DAMP: f32 = 0.5;
/// Top boundary of the board
const TOP_WALL: f32 = 20.0;
/// Frames between turbulence bursts
const BURST_INTERVAL: u32 = 90;
/// Burst reach, impulse and upward bias
const BURST_RADIUS: f32 = 120.0;
const BURST_FORCE: f32 = 8.0;
const BURST_LIFT: f32 = 2.0;
/// Peg grid geometry
const PEG_START_Y: f32 = 80.0;
const PEG_ROW_SPACING: f32 = 32.0;
const PEG_SPACING: f32 = 28.0;

/// Board geometry, supplied by the presentation layer
#[derive(Debug, Clone, Copy)]
pub struct PinballLayout {
    pub width: f32,
    pub height: f32,
    pub ball_radius: f32,
    pub peg_radius: f32,
    pub exit_width: f32,
}

impl Default for PinballLayout {
    fn default() -> Self {
        Self {
            width: 380.0,
            height: 1800.0,
            ball_radius: 10.0,
            peg_radius: 5.0,
            exit_width: 40.0,
        }
    }
}

impl PinballLayout {
    /// Vertical finish threshold
    #[inline]
    pub fn exit_y(&self) -> f32 {
        self.height - 40.0
    }

    /// Horizontal bounds of the exit gate
    #[inline]
    pub fn gate(&self) -> (f32, f32) {
        (
            (self.width - self.exit_width) / 2.0,
            (self.width + self.exit_width) / 2.0,
        )
    }

    /// Funnel wall x-positions at a given depth. The funnel tapers from
    /// nearly the full board width down toward the exit gate.
    #[inline]
    pub fn walls_at(&self, y: f32) -> (f32, f32) {
        let progress = (y / self.height).min(1.0);
        let max_width = self.width - 40.0;
        let min_width = self.exit_width;
        let current = max_width - (max_width - min_width) * progress * 0.9;
        ((self.width - current) / 2.0, (self.width + current) / 2.0)
    }
}

/// Balls racing down a pegged funnel
pub struct PinballField {
    layout: PinballLayout,
    /// Pegs in row order, top to bottom
    pegs: Vec<Vec2>,
    /// Start index of each peg row in `pegs`, plus a trailing end index
    row_offsets: Vec<usize>,
    active: Vec<Entity>,
    departed: Vec<Entity>,
    frames: u32,
}

impl PinballField {
    /// One ball per candidate, dropped in shuffled order from the funnel top
    pub fn new(candidates: &[Student], layout: PinballLayout, rng: &mut Pcg32) -> Self {
        let mut shuffled = candidates.to_vec();
        shuffle(&mut shuffled, rng);

        let active = shuffled
            .iter()
            .map(|student| {
                let pos = Vec2::new(
                    layout.width / 2.0 + (rng.gen::<f32>() - 0.5) * 80.0,
                    TOP_WALL + rng.gen::<f32>() * 20.0,
                );
                let vel = Vec2::new((rng.gen::<f32>() - 0.5) * 2.0, rng.gen::<f32>() * 2.0);
                Entity::new(student, pos, vel)
            })
            .collect();

        let (pegs, row_offsets) = generate_pegs(&layout);
        Self {
            pegs,
            row_offsets,
            layout,
            active,
            departed: Vec::new(),
            frames: 0,
        }
    }

    pub fn layout(&self) -> &PinballLayout {
        &self.layout
    }

    pub fn pegs(&self) -> &[Vec2] {
        &self.pegs
    }

    /// Index range of the pegs whose rows overlap `y` within `reach`. The
    /// grid is row-regular, so contact checks only touch nearby rows.
    fn peg_range(&self, y: f32, reach: f32) -> std::ops::Range<usize> {
        let rows = self.row_offsets.len().saturating_sub(1);
        if rows == 0 {
            return 0..0;
        }
        let lo = ((y - reach - PEG_START_Y) / PEG_ROW_SPACING).floor();
        let hi = ((y + reach - PEG_START_Y) / PEG_ROW_SPACING).ceil();
        if hi < 0.0 {
            return 0..0;
        }
        let first = (lo.max(0.0) as usize).min(rows - 1);
        let last = (hi as usize).min(rows - 1);
        self.row_offsets[first]..self.row_offsets[last + 1]
    }

    /// Radial impulse around a random point in the upper board, keeping the
    /// field lively and breaking up stuck clusters
    fn turbulence_burst(&mut self, rng: &mut Pcg32) {
        let center = Vec2::new(
            self.layout.width / 2.0 + (rng.gen::<f32>() - 0.5) * 150.0,
            200.0 + rng.gen::<f32>() * 300.0,
        );

        for entity in &mut self.active {
            let delta = entity.pos - center;
            let dist = delta.length();
            if dist < BURST_RADIUS && dist > 0.0 {
                let force = (BURST_RADIUS - dist) / BURST_RADIUS * BURST_FORCE;
                entity.vel += delta / dist * force;
                entity.vel.y -= BURST_LIFT;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn active_mut(&mut self) -> &mut Vec<Entity> {
        &mut self.active
    }
}

impl ParticleField for PinballField {
    fn step(&mut self, rng: &mut Pcg32) -> Departures {
        self.frames += 1;
        if self.frames % BURST_INTERVAL == 0 {
            self.turbulence_burst(rng);
        }

        let layout = self.layout;
        let radius = layout.ball_radius;
        let (gate_left, gate_right) = layout.gate();
        let exit_y = layout.exit_y();
        let contact_reach = radius + layout.peg_radius;

        let mut finished: SmallVec<[usize; 2]> = SmallVec::new();

        for i in 0..self.active.len() {
            let mut pos = self.active[i].pos;
            let mut vel = self.active[i].vel;

            vel.y += GRAVITY;
            pos += vel;

            // Funnel walls
            let (left_wall, right_wall) = layout.walls_at(pos.y);
            if pos.x - radius < left_wall {
                pos.x = left_wall + radius;
                vel.x = vel.x.abs() * RESTITUTION;
            }
            if pos.x + radius > right_wall {
                pos.x = right_wall - radius;
                vel.x = -vel.x.abs() * RESTITUTION;
            }

            // Top and bottom boundaries
            if pos.y - radius < TOP_WALL {
                pos.y = TOP_WALL + radius;
                vel.y = vel.y.abs() * RESTITUTION;
            }
            if pos.y + radius > layout.height {
                pos.y = layout.height - radius;
                vel.y = -vel.y.abs() * RESTITUTION;
            }

            // Pegs: positional correction, damped reflection, random kick
            for peg_index in self.peg_range(pos.y, contact_reach) {
                let peg = self.pegs[peg_index];
                if let Some((normal, depth)) = penetration_normal(pos - peg, contact_reach) {
                    pos += normal * depth;
                    vel = reflect_damped(vel, normal, RESTITUTION);
                    vel.x += (rng.gen::<f32>() - 0.5) * PEG_KICK;
                }
            }

            // Ball contacts: separate, partially cancel velocity on the
            // contact normal
            for j in 0..self.active.len() {
                if j == i {
                    continue;
                }
                let delta = pos - self.active[j].pos;
                if let Some((normal, depth)) = penetration_normal(delta, radius * 2.0) {
                    pos += normal * (depth * 0.5);
                    let relative = vel - self.active[j].vel;
                    let along = relative.dot(normal);
                    if along > 0.0 {
                        vel -= normal * along * BALL_CONTACT_DAMP;
                    }
                }
            }

            vel.x *= FRICTION;

            self.active[i].pos = pos;
            self.active[i].vel = vel;

            if pos.y > exit_y && pos.x > gate_left && pos.x < gate_right {
                finished.push(i);
            }
        }

        // Move finishers to the departed list, preserving in-frame order
        let mut departures: Departures = SmallVec::new();
        for &index in finished.iter().rev() {
            let entity = self.active.remove(index);
            departures.insert(0, entity);
        }
        for entity in &departures {
            self.departed.push(entity.clone());
        }
        departures
    }

    fn active(&self) -> &[Entity] {
        &self.active
    }

    /// Force-finish the deepest active ball. Used as the termination guard
    /// when a round hits its frame cap.
    fn extract_one(&mut self, _rng: &mut Pcg32) -> Option<Entity> {
        if self.active.is_empty() {
            return None;
        }
        let index = self
            .active
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.pos.y.total_cmp(&b.pos.y))
            .map(|(i, _)| i)?;
        let entity = self.active.remove(index);
        self.departed.push(entity.clone());
        Some(entity)
    }

    fn departed(&self) -> &[Entity] {
        &self.departed
    }
}

/// Staggered peg grid following the funnel taper. Pegs sit only inside the
/// funnel walls, and the grid stops above the exit region. Returns the pegs
/// in row order plus the start index of each row.
fn generate_pegs(layout: &PinballLayout) -> (Vec<Vec2>, Vec<usize>) {
    let mut pegs = Vec::new();
    let mut row_offsets = vec![0];
    let max_width = layout.width - 80.0;
    let min_width = layout.exit_width + 20.0;

    let mut row = 0u32;
    loop {
        let y = PEG_START_Y + row as f32 * PEG_ROW_SPACING;
        if y >= layout.height - 120.0 {
            break;
        }

        let progress = y / layout.height;
        let funnel_width = max_width - (max_width - min_width) * progress * 0.95;
        let left_wall = (layout.width - funnel_width) / 2.0 + 15.0;
        let right_wall = (layout.width + funnel_width) / 2.0 - 15.0;
        let available = right_wall - left_wall;

        let pegs_in_row = ((available / PEG_SPACING) as usize).max(2);
        let row_width = (pegs_in_row - 1) as f32 * PEG_SPACING;
        let start_x = left_wall + (available - row_width) / 2.0;
        let offset = if row % 2 == 0 { 0.0 } else { PEG_SPACING / 2.0 };

        for col in 0..pegs_in_row {
            let x = start_x + col as f32 * PEG_SPACING + offset;
            if x > left_wall && x < right_wall {
                pegs.push(Vec2::new(x, y));
            }
        }

        row_offsets.push(pegs.len());
        row += 1;
    }

    (pegs, row_offsets)
}
