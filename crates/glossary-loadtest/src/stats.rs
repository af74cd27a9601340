//! Request event collection and reporting.
//!
//! Simulated users fire one [`RequestEvent`] per call into an [`EventSink`].
//! A single collector task owns the [`Stats`] and returns them once every sink
//! has been dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tonic::Code;

/// How a call ended, from the load test's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The server answered with the error the scenario asked for.
    ExpectedFailure,
    Failure(Code),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEvent {
    pub request_type: &'static str,
    pub name: &'static str,
    pub response_time: Duration,
    /// Scenario-specific size of the answer (description length, number of
    /// terms, or the success flag).
    pub response_length: usize,
    pub outcome: Outcome,
}

/// Sending half of the event channel. Clone one per simulated user.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<RequestEvent>,
}

impl EventSink {
    pub async fn fire(&self, event: RequestEvent) {
        // The collector only stops after every sink is gone.
        let _ = self.tx.send(event).await;
    }
}

/// Starts the collector task.
pub fn spawn_collector(buffer: usize) -> (EventSink, JoinHandle<Stats>) {
    let (tx, mut rx) = mpsc::channel(buffer);
    let handle = tokio::spawn(async move {
        let mut stats = Stats::default();
        while let Some(event) = rx.recv().await {
            stats.record(event);
        }
        stats
    });
    (EventSink { tx }, handle)
}

#[derive(Debug, Clone, Default)]
pub struct EndpointStats {
    pub request_type: &'static str,
    pub requests: u64,
    pub failures: u64,
    pub expected_failures: u64,
    pub total_length: u64,
    response_times: Vec<Duration>,
}

impl EndpointStats {
    fn record(&mut self, event: &RequestEvent) {
        self.request_type = event.request_type;
        self.requests += 1;
        self.total_length += event.response_length as u64;
        self.response_times.push(event.response_time);
        match event.outcome {
            Outcome::Success => {}
            Outcome::ExpectedFailure => self.expected_failures += 1,
            Outcome::Failure(_) => self.failures += 1,
        }
    }

    pub fn min(&self) -> Duration {
        self.response_times.iter().min().copied().unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.response_times.iter().max().copied().unwrap_or_default()
    }

    pub fn mean(&self) -> Duration {
        if self.response_times.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.response_times.iter().sum();
        total / self.response_times.len() as u32
    }

    /// Nearest-rank percentile, `pct` in `0.0..=100.0`.
    pub fn percentile(&self, pct: f64) -> Duration {
        if self.response_times.is_empty() {
            return Duration::ZERO;
        }
        let mut sorted = self.response_times.clone();
        sorted.sort_unstable();
        let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    }
}

/// Aggregated results keyed by request name.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    endpoints: BTreeMap<&'static str, EndpointStats>,
    failures: BTreeMap<(&'static str, String), u64>,
}

impl Stats {
    pub fn record(&mut self, event: RequestEvent) {
        if let Outcome::Failure(code) = event.outcome {
            *self
                .failures
                .entry((event.name, format!("{code:?}")))
                .or_default() += 1;
        }
        self.endpoints.entry(event.name).or_default().record(&event);
    }

    #[cfg(test)]
    pub fn endpoint(&self, name: &str) -> Option<&EndpointStats> {
        self.endpoints.get(name)
    }

    pub fn total_requests(&self) -> u64 {
        self.endpoints.values().map(|e| e.requests).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.endpoints.values().map(|e| e.failures).sum()
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<6} {:<22} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8}",
            "Type", "Name", "# reqs", "# fails", "# expct", "Avg ms", "Min ms", "Max ms", "p50 ms",
            "p95 ms"
        )?;
        writeln!(f, "{}", "-".repeat(121))?;
        for (name, e) in &self.endpoints {
            writeln!(
                f,
                "{:<6} {:<22} | {:>8} | {:>8} | {:>8} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2}",
                e.request_type,
                name,
                e.requests,
                e.failures,
                e.expected_failures,
                ms(e.mean()),
                ms(e.min()),
                ms(e.max()),
                ms(e.percentile(50.0)),
                ms(e.percentile(95.0)),
            )?;
        }
        writeln!(f, "{}", "-".repeat(121))?;
        writeln!(
            f,
            "{:<29} | {:>8} | {:>8}",
            "Aggregated",
            self.total_requests(),
            self.total_failures()
        )?;

        if !self.failures.is_empty() {
            writeln!(f, "\nFailures:")?;
            for ((name, code), count) in &self.failures {
                writeln!(f, "{:>8}  {:<22} {}", count, name, code)?;
            }
        }
        Ok(())
    }
}
