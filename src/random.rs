//! Random selection utilities for the draw

use glam::Vec2;
use rand::Rng;

use crate::roster::Student;

/// Shuffle a slice in place using the Fisher-Yates algorithm.
///
/// Iterates from the last index down to the first, swapping each element
/// with a uniformly chosen index in [0, i]. Every permutation is equally
/// likely given a uniform source.
#[inline]
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    if items.len() < 2 {
        return;
    }
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Select `count` random winners from a candidate list.
///
/// Returns an empty list for no candidates, all candidates when there are
/// no more than `count`, and otherwise the first `count` elements of a
/// shuffled copy. This is the authoritative selection contract; any
/// animation must match it in distribution.
pub fn select_winners<R: Rng>(candidates: &[Student], count: usize, rng: &mut R) -> Vec<Student> {
    if candidates.is_empty() {
        return Vec::new();
    }
    if candidates.len() <= count {
        return candidates.to_vec();
    }

    let mut shuffled = candidates.to_vec();
    shuffle(&mut shuffled, rng);
    shuffled.truncate(count);
    shuffled
}

/// Pick one index uniformly from `0..len`. Returns `None` for an empty set.
#[inline]
pub fn pick_index<R: Rng>(len: usize, rng: &mut R) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(rng.gen_range(0..len))
}

/// Random position inside a centered square of the given half-extent.
#[inline]
pub fn random_offset<R: Rng>(half_extent: f32, rng: &mut R) -> Vec2 {
    Vec2::new(
        (rng.gen::<f32>() - 0.5) * 2.0 * half_extent,
        (rng.gen::<f32>() - 0.5) * 2.0 * half_extent,
    )
}

/// Random velocity: uniform direction, speed in [1, max_speed + 1).
#[inline]
pub fn random_velocity<R: Rng>(max_speed: f32, rng: &mut R) -> Vec2 {
    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
    let speed = rng.gen::<f32>() * max_speed + 1.0;
    Vec2::new(angle.cos(), angle.sin()) * speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Student;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn students(points: &[i32]) -> Vec<Student> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| Student {
                id: format!("student-{}", i + 1),
                name: format!("Student {}", i + 1),
                class_id: "class-1".to_string(),
                points: *p,
            })
            .collect()
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut items: Vec<i32> = (0..20).collect();
        shuffle(&mut items, &mut rng);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_empty_and_single() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut empty: Vec<i32> = vec![];
        shuffle(&mut empty, &mut rng);
        assert!(empty.is_empty());

        let mut single = vec![42];
        shuffle(&mut single, &mut rng);
        assert_eq!(single, vec![42]);
    }

    #[test]
    fn test_select_winners_empty() {
        let mut rng = Pcg32::seed_from_u64(1);
        let winners = select_winners(&[], 3, &mut rng);
        assert!(winners.is_empty());
    }

    #[test]
    fn test_select_winners_fewer_candidates_than_count() {
        let mut rng = Pcg32::seed_from_u64(1);
        let candidates = students(&[5, 10]);
        let winners = select_winners(&candidates, 5, &mut rng);
        assert_eq!(winners.len(), 2);
    }

    #[test]
    fn test_select_winners_distinct_subset() {
        let mut rng = Pcg32::seed_from_u64(3);
        let candidates = students(&[1, 2, 3, 4, 5, 6]);
        let winners = select_winners(&candidates, 3, &mut rng);

        assert_eq!(winners.len(), 3);
        let mut ids: Vec<&str> = winners.iter().map(|w| w.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        for w in &winners {
            assert!(candidates.iter().any(|c| c.id == w.id));
        }
    }

    #[test]
    fn test_pick_index_distribution() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut counts = [0usize; 4];

        for _ in 0..4000 {
            let idx = pick_index(4, &mut rng).unwrap();
            counts[idx] += 1;
        }

        // Each index should land roughly 1000 times (within 25% tolerance)
        for count in counts {
            assert!(count > 750 && count < 1250, "skewed count: {}", count);
        }
    }

    #[test]
    fn test_pick_index_empty() {
        let mut rng = Pcg32::seed_from_u64(11);
        assert_eq!(pick_index(0, &mut rng), None);
    }

    #[test]
    fn test_random_velocity_speed_band() {
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..100 {
            let v = random_velocity(5.0, &mut rng);
            let speed = v.length();
            assert!(speed >= 1.0 && speed < 6.0 + 1e-3, "speed out of band: {}", speed);
        }
    }
}
