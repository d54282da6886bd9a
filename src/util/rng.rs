//! Randomness and identity helpers

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::game::PlayerId;

/// Uniform integer in the inclusive range `[from, to]`.
///
/// Bounds may be given in either order.
pub fn generate_integer<R: Rng>(rng: &mut R, from: i64, to: i64) -> i64 {
    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
    rng.gen_range(lo..=hi)
}

/// Fresh opaque player id, unique for the lifetime of the process
pub fn generate_player_id() -> PlayerId {
    PlayerId::new(Uuid::new_v4().simple().to_string())
}

/// Pick one id uniformly at random, `None` if the slice is empty
pub fn pick_random_player<'a, R: Rng>(
    rng: &mut R,
    ids: &'a [PlayerId],
) -> Option<&'a PlayerId> {
    ids.choose(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generated_integers_stay_within_inclusive_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen_lo = false;
        let mut seen_hi = false;
        for _ in 0..2_000 {
            let n = generate_integer(&mut rng, 0, 3);
            assert!((0..=3).contains(&n));
            seen_lo |= n == 0;
            seen_hi |= n == 3;
        }
        assert!(seen_lo && seen_hi, "both bounds should be reachable");
    }

    #[test]
    fn reversed_bounds_are_accepted() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            let n = generate_integer(&mut rng, 10, 5);
            assert!((5..=10).contains(&n));
        }
    }

    #[test]
    fn player_ids_are_distinct() {
        let a = generate_player_id();
        let b = generate_player_id();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn random_pick_returns_a_member() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let ids = vec![PlayerId::new("a"), PlayerId::new("b")];
        for _ in 0..50 {
            let picked = pick_random_player(&mut rng, &ids).cloned();
            assert!(picked.as_ref().is_some_and(|id| ids.contains(id)));
        }
        assert!(pick_random_player(&mut rng, &[]).is_none());
    }
}
