//! Round-robin pairing generation (§4.2 `makeRoundRobinDistribution`): the standard
//! "circle method" — fix one seed, rotate the rest — producing `n - 1` rounds of
//! `n / 2` matches for `n` (already BYE-padded to even) participants.

/// `seeds[i]` is the slot occupying position `i`; a `None` entry is a BYE. Generic over
/// whatever the caller is pairing (seed indices while permuting, or participant ids once
/// the permutation has already been applied — `topology::creator` uses the latter).
/// Returns one `Vec<(slot_a, slot_b)>` per round; a pairing with either side `None` is a
/// BYE match that completes automatically.
pub fn round_robin_pairings<T: Clone>(seeds: &[Option<T>]) -> Vec<Vec<(Option<T>, Option<T>)>> {
    let n = seeds.len();
    if n < 2 {
        return Vec::new();
    }
    debug_assert!(n % 2 == 0, "round robin requires an even (BYE-padded) count");

    let mut wheel: Vec<Option<T>> = seeds.to_vec();
    let fixed = wheel.remove(0);
    let rounds_needed = n - 1;
    let mut rounds = Vec::with_capacity(rounds_needed);

    for _ in 0..rounds_needed {
        let mut round = Vec::with_capacity(n / 2);
        round.push((fixed.clone(), wheel[0].clone()));
        for i in 1..n / 2 {
            round.push((wheel[i].clone(), wheel[wheel.len() - i].clone()));
        }
        rounds.push(round);
        wheel.rotate_right(1);
    }
    rounds
}

/// A stage run in `RoundRobinMode::Double` plays every pairing twice, with sides
/// swapped on the second leg (§4.2).
pub fn double_round_robin<T: Clone>(
    rounds: Vec<Vec<(Option<T>, Option<T>)>>,
) -> Vec<Vec<(Option<T>, Option<T>)>> {
    let mut all = rounds.clone();
    all.extend(rounds.into_iter().map(|round| {
        round.into_iter().map(|(a, b)| (b, a)).collect()
    }));
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_participants_play_three_rounds() {
        let seeds: Vec<Option<usize>> = (0..4).map(Some).collect();
        let rounds = round_robin_pairings(&seeds);
        assert_eq!(rounds.len(), 3);
        for round in &rounds {
            assert_eq!(round.len(), 2);
        }
    }

    #[test]
    fn every_pair_meets_exactly_once() {
        let seeds: Vec<Option<usize>> = (0..6).map(Some).collect();
        let rounds = round_robin_pairings(&seeds);
        assert_eq!(rounds.len(), 5);
        let mut seen = std::collections::HashSet::new();
        for round in &rounds {
            for (a, b) in round {
                let (a, b) = (a.unwrap(), b.unwrap());
                let key = if a < b { (a, b) } else { (b, a) };
                assert!(seen.insert(key), "pair {key:?} repeated");
            }
        }
        assert_eq!(seen.len(), 6 * 5 / 2);
    }

    #[test]
    fn double_round_robin_doubles_round_count_and_swaps_sides() {
        let seeds: Vec<Option<usize>> = (0..4).map(Some).collect();
        let single = round_robin_pairings(&seeds);
        let doubled = double_round_robin(single.clone());
        assert_eq!(doubled.len(), single.len() * 2);
        assert_eq!(doubled[single.len()][0], (single[0][0].1, single[0][0].0));
    }
}
