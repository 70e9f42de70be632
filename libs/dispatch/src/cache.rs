//! Per-behavior match cache.
//!
//! A tiny ring buffer mapping a message's type token to the bitmask of
//! cases that are type-compatible with that shape. Bounded capacity with
//! insertion-order eviction; a miss just recomputes, so a stale eviction is
//! never incorrect. Not synchronized: a behavior is owned by one
//! message-processing context.

use types::TypeToken;

pub(crate) const CACHE_CAPACITY: usize = 10;

/// Bitmask of candidate case indices, one bit per case.
pub(crate) type CaseMask = u64;

#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    entries: [Option<(TypeToken, CaseMask)>; CACHE_CAPACITY],
    next: usize,
}

impl TokenCache {
    pub(crate) fn new() -> TokenCache {
        TokenCache::default()
    }

    pub(crate) fn get(&self, token: TypeToken) -> Option<CaseMask> {
        self.entries
            .iter()
            .flatten()
            .find(|(seen, _)| *seen == token)
            .map(|(_, mask)| *mask)
    }

    pub(crate) fn insert(&mut self, token: TypeToken, mask: CaseMask) {
        // Refresh in place if the token is already cached.
        if let Some(entry) = self
            .entries
            .iter_mut()
            .flatten()
            .find(|(seen, _)| *seen == token)
        {
            entry.1 = mask;
            return;
        }
        self.entries[self.next] = Some((token, mask));
        self.next = (self.next + 1) % CACHE_CAPACITY;
    }
}
