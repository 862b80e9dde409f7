use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

/// How the retained values of a [`SafetyWindow`] are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregate {
    /// Lowest recent value: any recently quoted fee still clears the floor.
    #[default]
    Min,
    /// Highest recent value.
    Max,
    /// Most recent value only.
    Latest,
}

impl FromStr for Aggregate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Aggregate::Min),
            "max" => Ok(Aggregate::Max),
            "latest" | "current" => Ok(Aggregate::Latest),
            other => Err(format!("unknown aggregate {:?} (expected min, max or latest)", other)),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Latest => "latest",
        })
    }
}

/// Time-bounded history of computed values.
///
/// Entries older than `retention` are pruned on every insertion, except that
/// the window never becomes empty: if pruning would remove everything, the
/// most recently evicted entry is kept as a guard.
#[derive(Debug)]
pub struct SafetyWindow {
    entries: VecDeque<(Instant, u128)>,
    retention: Duration,
    aggregate: Aggregate,
}

impl SafetyWindow {
    pub fn new(retention: Duration, aggregate: Aggregate) -> Self {
        Self {
            entries: VecDeque::new(),
            retention,
            aggregate,
        }
    }

    /// Record `value` at `now` and return the new aggregate.
    pub fn push(&mut self, now: Instant, value: u128) -> u128 {
        // Keep timestamps monotonic even if the caller's clock steps back.
        let now = match self.entries.back() {
            Some(&(last, _)) if last > now => last,
            _ => now,
        };
        self.entries.push_back((now, value));
        self.prune(now);
        self.current().unwrap_or(value)
    }

    fn prune(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.retention) else {
            return;
        };
        let mut evicted = None;
        while let Some(&(at, _)) = self.entries.front() {
            if at > cutoff {
                break;
            }
            evicted = self.entries.pop_front();
        }
        if self.entries.is_empty() {
            if let Some(guard) = evicted {
                self.entries.push_back(guard);
            }
        }
    }

    /// Aggregate over retained entries, `None` before the first push.
    pub fn current(&self) -> Option<u128> {
        let values = self.entries.iter().map(|&(_, v)| v);
        match self.aggregate {
            Aggregate::Min => values.min(),
            Aggregate::Max => values.max(),
            Aggregate::Latest => values.last(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
