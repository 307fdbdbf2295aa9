//! Mode-aware sampling of locations and payloads.
//!
//! Selection is seeded so that the same seed, mode and inputs always produce
//! the same probe set.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

use crate::models::{ScanMode, TestCategory};

/// How many locations and payloads a module exercises in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub locations: Option<usize>,
    pub payloads: Option<usize>,
}

impl Budget {
    pub fn for_mode(mode: ScanMode) -> Self {
        match mode {
            ScanMode::Quick => Budget {
                locations: Some(3),
                payloads: Some(2),
            },
            ScanMode::Standard => Budget {
                locations: Some(10),
                payloads: Some(5),
            },
            ScanMode::Thorough => Budget {
                locations: None,
                payloads: None,
            },
        }
    }
}

/// Deterministic generator for one category within a session
pub fn rng_for(seed: u64, category: TestCategory) -> StdRng {
    let salt = match category {
        TestCategory::Xss => 0x9e37_79b9_7f4a_7c15,
        TestCategory::Sqli => 0xc2b2_ae3d_27d4_eb4f,
        TestCategory::Csrf => 0x1656_67b1_9e37_79f9,
        TestCategory::Headers => 0x85eb_ca77_c2b2_ae63,
        TestCategory::Upload => 0x27d4_eb2f_1656_67c5,
    };
    StdRng::seed_from_u64(seed ^ salt)
}

/// Pick up to `limit` items, keeping their original relative order.
///
/// With no limit, or a limit at least the input length, everything is kept.
pub fn pick<T: Clone>(items: &[T], limit: Option<usize>, rng: &mut StdRng) -> Vec<T> {
    let n = match limit {
        Some(n) if n < items.len() => n,
        _ => return items.to_vec(),
    };

    let mut chosen = index::sample(rng, items.len(), n).into_vec();
    chosen.sort_unstable();
    chosen.into_iter().map(|i| items[i].clone()).collect()
}

/// Apply the mode budget to a module's inputs
pub fn sample(
    locations: &[String],
    payloads: &[String],
    mode: ScanMode,
    seed: u64,
    category: TestCategory,
) -> (Vec<String>, Vec<String>) {
    let budget = Budget::for_mode(mode);
    let mut rng = rng_for(seed, category);
    let locations = pick(locations, budget.locations, &mut rng);
    let payloads = pick(payloads, budget.payloads, &mut rng);
    (locations, payloads)
}
