//! In-memory candle sequence and market ticker board.

use std::collections::BTreeMap;

use tracing::warn;

use crate::models::{Candle, MarketTicker};

/// How an incremental update was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The update opened a new bucket.
    Appended,
    /// The update refreshed the still-forming last bucket.
    Replaced,
    /// The update was older than the last bucket and was dropped.
    Rejected,
}

/// Ordered OHLC candles for the active topic.
///
/// `start` values are strictly increasing. Only the most recent candle is
/// ever modified in place.
#[derive(Debug, Default)]
pub struct CandleStore {
    candles: Vec<Candle>,
    ready: bool,
    revision: u64,
}

impl CandleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sequence wholesale, dropping any candle whose `start`
    /// does not exceed the previously accepted one.
    ///
    /// Returns the number of candles dropped.
    pub fn apply_snapshot(&mut self, candles: Vec<Candle>) -> usize {
        let received = candles.len();
        let mut accepted: Vec<Candle> = Vec::with_capacity(received);

        for candle in candles {
            if let Some(prev) = accepted.last() {
                if candle.start <= prev.start {
                    warn!(
                        start = candle.start,
                        previous = prev.start,
                        "Dropping out-of-order candle from snapshot"
                    );
                    continue;
                }
            }
            accepted.push(candle);
        }

        let dropped = received - accepted.len();
        self.candles = accepted;
        self.ready = true;
        self.revision += 1;
        dropped
    }

    /// Merges the latest candle into the sequence.
    pub fn apply_update(&mut self, candle: Candle) -> UpdateOutcome {
        let latest = self.candles.last().map(|last| last.start);
        let outcome = match latest {
            Some(latest) if candle.start < latest => {
                warn!(
                    start = candle.start,
                    latest,
                    "Dropping out-of-order candle update"
                );
                return UpdateOutcome::Rejected;
            }
            Some(latest) if candle.start == latest => {
                let last = self.candles.len() - 1;
                self.candles[last] = candle;
                UpdateOutcome::Replaced
            }
            _ => {
                self.candles.push(candle);
                UpdateOutcome::Appended
            }
        };

        self.ready = true;
        self.revision += 1;
        outcome
    }

    /// Clears the sequence ahead of a new subscription.
    pub fn reset(&mut self) {
        if !self.candles.is_empty() || self.ready {
            self.revision += 1;
        }
        self.candles.clear();
        self.ready = false;
    }

    /// Marks the data as needing a fresh snapshot while keeping it visible.
    pub fn mark_stale(&mut self) {
        self.ready = false;
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// `true` once a snapshot or update has been accepted since the last
    /// [`reset`](Self::reset) or [`mark_stale`](Self::mark_stale).
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Increments whenever the visible sequence changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Latest ticker summary per symbol from the `markets` topic.
#[derive(Debug, Default)]
pub struct MarketBoard {
    tickers: BTreeMap<String, MarketTicker>,
}

impl MarketBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts every ticker by symbol.
    pub fn apply(&mut self, tickers: Vec<MarketTicker>) {
        for ticker in tickers {
            self.tickers.insert(ticker.symbol.clone(), ticker);
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&MarketTicker> {
        self.tickers.get(symbol)
    }

    /// All tickers ordered by symbol.
    pub fn tickers(&self) -> impl Iterator<Item = &MarketTicker> {
        self.tickers.values()
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn clear(&mut self) {
        self.tickers.clear();
    }
}
