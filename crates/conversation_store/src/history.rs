use std::collections::VecDeque;

use tracing::debug;

use crate::error::ConversationStoreError;
use crate::exchange::Exchange;
use crate::replay::replay_exchange;
use assist_provider::RunMessage;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_TOKEN_BUDGET: usize = 4096;
/// Rough characters-per-token ratio; an estimate, not a tokenizer.
pub const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationLimits {
    max_exchanges: usize,
    token_budget: usize,
}

impl Default for ConversationLimits {
    fn default() -> Self {
        Self {
            max_exchanges: DEFAULT_HISTORY_LIMIT,
            token_budget: DEFAULT_TOKEN_BUDGET,
        }
    }
}

impl ConversationLimits {
    pub fn new(max_exchanges: usize, token_budget: usize) -> Result<Self, ConversationStoreError> {
        if max_exchanges == 0 {
            return Err(ConversationStoreError::ZeroHistoryLimit);
        }
        if token_budget == 0 {
            return Err(ConversationStoreError::ZeroTokenBudget);
        }
        Ok(Self {
            max_exchanges,
            token_budget,
        })
    }

    #[must_use]
    pub fn max_exchanges(&self) -> usize {
        self.max_exchanges
    }

    #[must_use]
    pub fn token_budget(&self) -> usize {
        self.token_budget
    }
}

/// Bounded, oldest-first-evicting exchange log.
///
/// After every append the log holds at most `max_exchanges` entries and its
/// estimated tokens fit the budget, unless the newest exchange alone exceeds
/// the budget, in which case it is kept by itself.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    exchanges: VecDeque<Exchange>,
    limits: ConversationLimits,
}

impl ConversationHistory {
    #[must_use]
    pub fn new(limits: ConversationLimits) -> Self {
        Self {
            exchanges: VecDeque::new(),
            limits,
        }
    }

    #[must_use]
    pub fn limits(&self) -> ConversationLimits {
        self.limits
    }

    /// New limits apply from the next append.
    pub fn set_limits(&mut self, limits: ConversationLimits) {
        self.limits = limits;
    }

    pub fn append(&mut self, exchange: Exchange) {
        self.prune_for(exchange.char_len());
        self.exchanges.push_back(exchange);
    }

    /// Flags the newest exchange as run by the user.
    pub fn mark_last_executed(&mut self) -> bool {
        match self.exchanges.back_mut() {
            Some(last) => {
                last.executed = true;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.back()
    }

    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        self.stored_chars() / CHARS_PER_TOKEN
    }

    /// Every stored exchange as query, tool call and acknowledgement, oldest first.
    #[must_use]
    pub fn replay(&self) -> Vec<RunMessage> {
        self.exchanges.iter().flat_map(replay_exchange).collect()
    }

    fn stored_chars(&self) -> usize {
        self.exchanges.iter().map(Exchange::char_len).sum()
    }

    fn prune_for(&mut self, incoming_chars: usize) {
        let mut evicted = 0usize;
        while self.exchanges.len() >= self.limits.max_exchanges {
            self.exchanges.pop_front();
            evicted += 1;
        }
        while !self.exchanges.is_empty()
            && (self.stored_chars() + incoming_chars) / CHARS_PER_TOKEN > self.limits.token_budget
        {
            self.exchanges.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            debug!(evicted, remaining = self.exchanges.len(), "pruned conversation history");
        }
    }
}
