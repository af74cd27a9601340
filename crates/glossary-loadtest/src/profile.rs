//! Simulated user behaviour.
//!
//! A [`UserProfile`] is a weighted set of [`Action`]s plus a think-time window.
//! Each simulated user repeatedly picks an action in proportion to its weight,
//! performs it, reports a [`RequestEvent`] and sleeps for a random wait.

use crate::client::GlossaryClient;
use crate::stats::{Outcome, RequestEvent};
use glossary_tonic_core::proto::Term;
use portable_atomic::{AtomicU64, Ordering};
use rand::Rng;
use rand::distr::{Distribution, weighted::WeightedIndex};
use rand::seq::IndexedRandom;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tonic::Code;

const REQUEST_TYPE: &str = "grpc";

/// Keywords looked up by the `GetTerm` actions. `protobuf` is not part of the
/// seed set.
pub const KNOWN_KEYWORDS: &[&str] = &["ast", "gof", "observer", "grpc", "protobuf"];

/// Shared across all users so generated keywords never collide within a run.
static TERM_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `GetTerm` on one of [`KNOWN_KEYWORDS`].
    GetKnownTerm,
    /// `ListTerms` with a limit and offset drawn from the given choices.
    ListTerms {
        limits: &'static [i32],
        offsets: &'static [i32],
    },
    /// `AddTerm` with a fresh `test_term_<n>_<unix secs>` keyword.
    AddTerm,
    /// `GetTerm` on a keyword that is never stored; `NOT_FOUND` is expected.
    GetMissingTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightedAction {
    /// Name the call is reported under.
    pub name: &'static str,
    pub weight: u32,
    pub action: Action,
}

#[derive(Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub name: &'static str,
    pub wait_min: Duration,
    pub wait_max: Duration,
    pub actions: &'static [WeightedAction],
}

/// Reads, pages, writes, and probes for missing terms.
pub static GLOSSARY_USER: UserProfile = UserProfile {
    name: "GlossaryUser",
    wait_min: Duration::from_secs(1),
    wait_max: Duration::from_secs(3),
    actions: &[
        WeightedAction {
            name: "GetTerm",
            weight: 5,
            action: Action::GetKnownTerm,
        },
        WeightedAction {
            name: "ListTerms",
            weight: 3,
            action: Action::ListTerms {
                limits: &[5, 10, 20],
                offsets: &[0, 5, 10],
            },
        },
        WeightedAction {
            name: "AddTerm",
            weight: 1,
            action: Action::AddTerm,
        },
        WeightedAction {
            name: "GetTerm (Not Found)",
            weight: 2,
            action: Action::GetMissingTerm,
        },
    ],
};

/// Never writes.
pub static READ_ONLY_USER: UserProfile = UserProfile {
    name: "ReadOnlyUser",
    wait_min: Duration::from_millis(500),
    wait_max: Duration::from_secs(2),
    actions: &[
        WeightedAction {
            name: "[RO] GetTerm",
            weight: 7,
            action: Action::GetKnownTerm,
        },
        WeightedAction {
            name: "[RO] ListTerms",
            weight: 3,
            action: Action::ListTerms {
                limits: &[10, 20, 50],
                offsets: &[0],
            },
        },
    ],
};

/// Picks actions from a profile in proportion to their weights.
#[derive(Debug, Clone)]
pub struct ActionPicker {
    profile: &'static UserProfile,
    index: WeightedIndex<u32>,
}

impl ActionPicker {
    pub fn new(profile: &'static UserProfile) -> Result<Self, rand::distr::weighted::Error> {
        let index = WeightedIndex::new(profile.actions.iter().map(|a| a.weight))?;
        Ok(Self { profile, index })
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &'static WeightedAction {
        &self.profile.actions[self.index.sample(rng)]
    }

    pub fn wait_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        rng.random_range(self.profile.wait_min..=self.profile.wait_max)
    }
}

/// Assigns profiles to `users` slots so that the mix follows the weights as
/// closely as possible at every prefix (smooth weighted round robin).
pub fn assign_profiles(
    users: usize,
    weighted: &[(&'static UserProfile, u32)],
) -> Vec<&'static UserProfile> {
    let total: i64 = weighted.iter().map(|(_, w)| i64::from(*w)).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut current = vec![0i64; weighted.len()];
    let mut assigned = Vec::with_capacity(users);
    for _ in 0..users {
        for (slot, (_, weight)) in current.iter_mut().zip(weighted) {
            *slot += i64::from(*weight);
        }
        let (best, _) = current
            .iter()
            .enumerate()
            .max_by_key(|(i, v)| (**v, core::cmp::Reverse(*i)))
            .unwrap_or((0, &0));
        current[best] -= total;
        assigned.push(weighted[best].0);
    }
    assigned
}

/// Performs `action` once and describes the result.
pub async fn perform<R: Rng + ?Sized>(
    client: &mut GlossaryClient,
    action: &WeightedAction,
    rng: &mut R,
) -> RequestEvent {
    let (outcome, response_length, response_time) = match action.action {
        Action::GetKnownTerm => {
            let keyword = KNOWN_KEYWORDS.choose(rng).copied().unwrap_or("gof");
            let start = Instant::now();
            let result = client.get_term(keyword).await;
            let elapsed = start.elapsed();
            match result {
                Ok(resp) => (
                    Outcome::Success,
                    resp.term.map_or(0, |t| t.description.len()),
                    elapsed,
                ),
                Err(status) => (Outcome::Failure(status.code()), 0, elapsed),
            }
        }
        Action::ListTerms { limits, offsets } => {
            let limit = limits.choose(rng).copied().unwrap_or(10);
            let offset = offsets.choose(rng).copied().unwrap_or(0);
            let start = Instant::now();
            let result = client.list_terms(limit, offset).await;
            let elapsed = start.elapsed();
            match result {
                Ok(resp) => (Outcome::Success, resp.terms.len(), elapsed),
                Err(status) => (Outcome::Failure(status.code()), 0, elapsed),
            }
        }
        Action::AddTerm => {
            let term = next_test_term();
            let start = Instant::now();
            let result = client.add_term(term).await;
            let elapsed = start.elapsed();
            match result {
                Ok(resp) => (Outcome::Success, usize::from(resp.success), elapsed),
                Err(status) => (Outcome::Failure(status.code()), 0, elapsed),
            }
        }
        Action::GetMissingTerm => {
            let keyword = format!("nonexistent_{}", rng.random_range(1..=10_000));
            let start = Instant::now();
            let result = client.get_term(keyword).await;
            let elapsed = start.elapsed();
            match result {
                Ok(_) => (Outcome::Success, 0, elapsed),
                Err(status) => (classify_missing(status.code()), 0, elapsed),
            }
        }
    };

    RequestEvent {
        request_type: REQUEST_TYPE,
        name: action.name,
        response_time,
        response_length,
        outcome,
    }
}

fn classify_missing(code: Code) -> Outcome {
    if code == Code::NotFound {
        Outcome::ExpectedFailure
    } else {
        Outcome::Failure(code)
    }
}

fn next_test_term() -> Term {
    let n = TERM_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    Term {
        keyword: format!("test_term_{n}_{secs}"),
        title: format!("Test Term {n}"),
        description: format!("Description for test term {n}"),
    }
}
