use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};

/// Remembers which leads already triggered an initial-capture email.
///
/// Lives in `AppState`, so it is per process: a restart or a second instance
/// starts with an empty map. Entries expire after `ttl` and are replaced
/// when the same lead is claimed again and dropped by `purge_expired`.
pub struct LeadDedup {
    seen: DashMap<String, Instant>, // normalized email -> first notification time
    ttl: Duration,
}

impl LeadDedup {
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    /// Claims `email` for an initial-capture send.
    ///
    /// Returns `true` when the caller should send: the address was unseen or
    /// its previous claim has expired. The check and the insert happen under
    /// the same shard lock so concurrent requests cannot both win.
    pub fn try_claim(&self, email: &str) -> bool {
        self.try_claim_at(email, Instant::now())
    }

    fn try_claim_at(&self, email: &str, now: Instant) -> bool {
        match self.seen.entry(normalize(email)) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) >= self.ttl {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.seen.len();
        let ttl = self.ttl;
        self.seen.retain(|_, claimed_at| claimed_at.elapsed() < ttl);
        before.saturating_sub(self.seen.len())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
