//! Per-round server ordering
//!
//! Servers are tried by descending priority. Inside a priority level the
//! order is shuffled and reshuffled every round, so equal servers share the
//! load instead of the first one listed always winning.

use crate::registry::ServerRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Round-dependent seed spacing
const ROUND_STRIDE: u64 = 0xF00;

/// Supplies the tie-break seed for a round
pub trait SeedSource: Send + Sync {
    fn seed_for_round(&self, round: u32) -> u64;
}

/// Wall-clock seeding for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSeed;

impl SeedSource for ClockSeed {
    fn seed_for_round(&self, round: u32) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        now.wrapping_add(ROUND_STRIDE.wrapping_mul(round as u64))
    }
}

/// Reproducible seeding for tests
#[derive(Debug, Clone, Copy)]
pub struct FixedSeed(pub u64);

impl SeedSource for FixedSeed {
    fn seed_for_round(&self, round: u32) -> u64 {
        self.0.wrapping_add(ROUND_STRIDE.wrapping_mul(round as u64))
    }
}

/// The servers of one round, in the order they will be tried
#[derive(Debug, Clone)]
pub struct AttemptOrder<'a> {
    pub round: u32,
    servers: Vec<&'a ServerRecord>,
}

impl<'a> AttemptOrder<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a ServerRecord> + '_ {
        self.servers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn names(&self) -> Vec<&'a str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }
}

pub struct FailoverScheduler {
    seeds: Box<dyn SeedSource>,
}

impl FailoverScheduler {
    pub fn new(seeds: impl SeedSource + 'static) -> Self {
        FailoverScheduler {
            seeds: Box::new(seeds),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(FixedSeed(seed))
    }

    /// Order `servers` for `round`: priority descending, random within a priority.
    pub fn order<'a>(&self, servers: &'a [ServerRecord], round: u32) -> AttemptOrder<'a> {
        let mut rng = StdRng::seed_from_u64(self.seeds.seed_for_round(round));

        let mut keyed: Vec<(u64, &ServerRecord)> =
            servers.iter().map(|s| (rng.random::<u64>(), s)).collect();
        keyed.sort_by(|(ka, a), (kb, b)| b.priority.cmp(&a.priority).then(ka.cmp(kb)));

        let order = AttemptOrder {
            round,
            servers: keyed.into_iter().map(|(_, s)| s).collect(),
        };
        for server in order.iter() {
            debug!(
                round,
                priority = server.priority,
                server = %server.name,
                host = %server.host,
                port = server.port,
                "attempt order"
            );
        }
        order
    }
}

impl Default for FailoverScheduler {
    fn default() -> Self {
        Self::new(ClockSeed)
    }
}
