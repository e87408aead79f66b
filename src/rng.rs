// 🎲 Random Source - explicit, seeded, keyed sub-streams
//
// No component touches a global RNG. Each draw site asks the run's
// RandomSource for a sub-stream keyed by what it is drawing for:
//
//   stream seed = first 8 bytes (LE) of
//                 SHA-256( seed_le || tag || 0x1f || key1 || 0x1f || key2 ... )
//
// so the value drawn for (site, category, month) never depends on how many
// draws happened before it or in which order pairs were visited.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Key separator, never valid inside an id
const KEY_SEPARATOR: u8 = 0x1f;

// ============================================================================
// STREAMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Site attributes, keyed by site index
    Sites,
    /// Probabilistic integration scores, keyed by (site, vendor)
    Integration,
    /// Initial vendor assignment, keyed by (site, category)
    Initial,
    /// Monthly switch draw + replacement pick, keyed by (site, category, month)
    Switch,
    /// Per-vendor KPI effect noise, keyed by vendor
    VendorEffect,
    /// Per-site KPI baseline, keyed by site
    SiteBaseline,
    /// Monthly KPI noise, keyed by (site, month)
    KpiNoise,
}

impl Stream {
    pub fn tag(&self) -> &'static str {
        match self {
            Stream::Sites => "sites",
            Stream::Integration => "integration",
            Stream::Initial => "initial",
            Stream::Switch => "switch",
            Stream::VendorEffect => "vendor-effect",
            Stream::SiteBaseline => "site-baseline",
            Stream::KpiNoise => "kpi-noise",
        }
    }
}

// ============================================================================
// RANDOM SOURCE
// ============================================================================

/// Per-run random source. Cheap to copy; holds only the run seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSource {
    seed: u64,
}

impl RandomSource {
    pub fn new(seed: u64) -> Self {
        RandomSource { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Deterministic seed for one keyed sub-stream
    pub fn stream_seed(&self, stream: Stream, keys: &[&str]) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(stream.tag().as_bytes());
        for key in keys {
            hasher.update([KEY_SEPARATOR]);
            hasher.update(key.as_bytes());
        }
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Fresh generator for one keyed sub-stream
    pub fn substream(&self, stream: Stream, keys: &[&str]) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.stream_seed(stream, keys))
    }
}

// ============================================================================
// WEIGHTED PICK
// ============================================================================

/// Index chosen by `u ∈ [0, 1)` against unnormalised weights.
///
/// Walks the cumulative distribution and returns the first index whose
/// upper bound exceeds `u`; rounding slack at the top lands on the last
/// positive weight. `None` when there is nothing to pick from.
pub fn pick_weighted(weights: &[f64], u: f64) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let target = u * total;
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = Some(i);
        if target < cumulative {
            return Some(i);
        }
    }
    last_positive
}

// ============================================================================
// TESTS
// ============================================================================
