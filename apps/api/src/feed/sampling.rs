//! Seeded source sampling and shuffling. Pure: the same seed gives the same output.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Discussion-heavy subreddits the feed samples from.
pub const SOURCE_POOL: [&str; 22] = [
    "technology",
    "science",
    "worldnews",
    "philosophy",
    "books",
    "history",
    "space",
    "futurology",
    "economics",
    "psychology",
    "dataisbeautiful",
    "explainlikeimfive",
    "todayilearned",
    "askscience",
    "Documentaries",
    "TrueReddit",
    "DepthHub",
    "foodforthought",
    "changemyview",
    "NeutralPolitics",
    "AskHistorians",
    "geopolitics",
];

/// Picks `count` distinct sources from `pool`, excluding any in `excluded`
/// (case-insensitive).
pub fn sample_sources<'a>(
    pool: &[&'a str],
    count: usize,
    excluded: &[String],
    seed: u64,
) -> Vec<&'a str> {
    let candidates: Vec<&'a str> = pool
        .iter()
        .copied()
        .filter(|s| !excluded.iter().any(|e| e.eq_ignore_ascii_case(s)))
        .collect();
    let mut rng = StdRng::seed_from_u64(seed);
    candidates.choose_multiple(&mut rng, count).copied().collect()
}

pub fn shuffle_seeded<T>(items: &mut [T], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}
