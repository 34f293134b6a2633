use super::error::OnionError;
use super::types::{Circuit, RelayDescriptor};
use onionmsg_common::{routing, DestinationId, RelayId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

/// Criteria for selecting relays for a circuit
#[derive(Debug, Clone)]
pub struct SelectionCriteria {
    /// Relays to leave out of the pool (e.g. ones that just failed)
    pub excluded_relays: HashSet<RelayId>,

    /// Desired circuit length
    pub circuit_length: usize,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            excluded_relays: HashSet::new(),
            circuit_length: routing::DEFAULT_CIRCUIT_LENGTH,
        }
    }
}

impl SelectionCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_circuit_length(mut self, length: usize) -> Self {
        self.circuit_length = length
            .max(routing::MIN_CIRCUIT_LENGTH)
            .min(routing::MAX_CIRCUIT_LENGTH);
        self
    }

    pub fn exclude_relay(mut self, relay: RelayId) -> Self {
        self.excluded_relays.insert(relay);
        self
    }

    pub fn exclude_relays(mut self, relays: &[RelayId]) -> Self {
        self.excluded_relays.extend(relays);
        self
    }
}

/// Chooses circuits from a pool of known relays
pub struct CircuitSelector;

impl CircuitSelector {
    /// Pick `k` distinct relays in random order (entry first)
    pub fn select_circuit<R: Rng + ?Sized>(
        pool: &[RelayDescriptor],
        k: usize,
        destination: DestinationId,
        rng: &mut R,
    ) -> Result<Circuit, OnionError> {
        let hops = Self::sample_distinct(pool, k, &HashSet::new(), rng)?;
        Circuit::new(hops, destination)
    }

    /// Like [`CircuitSelector::select_circuit`], honouring exclusions
    pub fn select_with_criteria<R: Rng + ?Sized>(
        pool: &[RelayDescriptor],
        criteria: &SelectionCriteria,
        destination: DestinationId,
        rng: &mut R,
    ) -> Result<Circuit, OnionError> {
        let hops = Self::sample_distinct(
            pool,
            criteria.circuit_length,
            &criteria.excluded_relays,
            rng,
        )?;
        Circuit::new(hops, destination)
    }

    /// Shuffle-then-take over the de-duplicated, filtered pool.
    ///
    /// Candidate order follows `pool`, so a seeded `rng` reproduces the path.
    pub fn sample_distinct<R: Rng + ?Sized>(
        pool: &[RelayDescriptor],
        k: usize,
        excluded: &HashSet<RelayId>,
        rng: &mut R,
    ) -> Result<Vec<RelayDescriptor>, OnionError> {
        if k == 0 {
            return Err(OnionError::EmptyCircuit);
        }

        let mut seen = HashSet::with_capacity(pool.len());
        let mut candidates: Vec<&RelayDescriptor> = pool
            .iter()
            .filter(|relay| !excluded.contains(&relay.id))
            .filter(|relay| seen.insert(relay.id))
            .collect();

        if candidates.len() < k {
            return Err(OnionError::InsufficientRelays {
                available: candidates.len(),
                required: k,
            });
        }

        let (chosen, _) = candidates.partial_shuffle(rng, k);
        let hops: Vec<RelayDescriptor> = chosen.iter().map(|relay| (*relay).clone()).collect();

        debug!(
            "Selected circuit {:?} from {} candidate relays",
            hops.iter().map(|relay| relay.id).collect::<Vec<_>>(),
            pool.len()
        );

        Ok(hops)
    }
}
