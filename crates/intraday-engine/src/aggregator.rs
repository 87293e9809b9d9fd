//! Fixed-interval candle aggregation.

use std::collections::VecDeque;

use chrono::Timelike;
use tracing::debug;

use intraday_core::Candle;

/// Aggregates base-interval candles (e.g. 1 minute) into fixed-span
/// merged candles (e.g. 5 minutes).
///
/// Historical backfill and live ingestion share one merge rule so a
/// candle aggregated offline is identical to one aggregated live. The
/// live window is a bounded sliding buffer; duplicate timestamps are
/// rejected rather than double counted.
pub struct CandleAggregator {
    span: usize,
    window: VecDeque<Candle>,
    completed: Vec<Candle>,
}

impl CandleAggregator {
    /// Create an aggregator producing `span`-length candles. The span is
    /// a minute count and must evenly tile the hour for the live
    /// interval-close check.
    pub fn new(span: usize) -> Self {
        assert!(span > 0 && 60 % span == 0, "span must divide the hour");
        Self {
            span,
            window: VecDeque::with_capacity(span),
            completed: Vec::new(),
        }
    }

    /// The configured span.
    pub fn span(&self) -> usize {
        self.span
    }

    /// All completed merged candles, oldest first.
    pub fn completed(&self) -> &[Candle] {
        &self.completed
    }

    /// Current live-window length.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Convert a historical batch into merged candles.
    ///
    /// Input is sorted by timestamp, grouped into consecutive chunks of
    /// exactly `span` and merged; any remainder (< span) carries over
    /// into the live window for subsequent `ingest` calls.
    pub fn backfill(&mut self, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.timestamp);

        let mut buffer = Vec::with_capacity(self.span);
        for candle in candles {
            buffer.push(candle);
            if buffer.len() == self.span {
                if let Some(merged) = Self::merge(&buffer) {
                    self.completed.push(merged);
                }
                buffer.clear();
            }
        }

        for candle in buffer {
            self.push_window(candle);
        }
    }

    /// Feed one live base candle; returns the merged candle when this
    /// one closes a span window.
    ///
    /// "No candle yet" is the common case, not an error. A candle whose
    /// timestamp equals the newest buffered one is a replay and is
    /// dropped. A genuinely out-of-order (earlier) candle is appended
    /// as-is; reordering is not corrected.
    pub fn ingest(&mut self, candle: Candle) -> Option<Candle> {
        if let Some(last) = self.window.back() {
            if last.timestamp == candle.timestamp {
                debug!(timestamp = %candle.timestamp, "duplicate base candle dropped");
                return None;
            }
        }
        self.push_window(candle);

        let closes_window = candle.timestamp.minute() as usize % self.span == self.span - 1;
        if closes_window && self.window.len() == self.span {
            let buffered: Vec<Candle> = self.window.iter().copied().collect();
            if let Some(merged) = Self::merge(&buffered) {
                self.completed.push(merged);
                return Some(merged);
            }
        }
        None
    }

    /// Deterministic merge rule: open of the first, close of the last,
    /// max high, min low, summed volume, first candle's timestamp
    /// (bucket-open convention). Empty input yields no candle.
    pub fn merge(candles: &[Candle]) -> Option<Candle> {
        let first = candles.first()?;
        let last = candles.last()?;

        Some(Candle::new(
            first.timestamp,
            first.open,
            candles.iter().map(|c| c.high).fold(f64::MIN, f64::max),
            candles.iter().map(|c| c.low).fold(f64::MAX, f64::min),
            last.close,
            candles.iter().map(|c| c.volume).sum(),
        ))
    }

    fn push_window(&mut self, candle: Candle) {
        if self.window.len() == self.span {
            self.window.pop_front();
        }
        self.window.push_back(candle);
    }
}
