//! Streaming metrics derived from token arrival times

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Timing and throughput of one streamed call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub elapsed_ms: u64,
    pub thinking_ms: u64,
    pub answer_ms: u64,
    pub tokens: u64,
    pub thinking_tokens: u64,
    pub tokens_per_second: f64,
}

/// Approximate token count of a streamed delta: whitespace-separated words,
/// never less than one per delta.
pub fn count_tokens(delta: &str) -> u64 {
    delta.split_whitespace().count().max(1) as u64
}

/// Records token arrivals for one member and turns them into [`StageMetrics`]
#[derive(Debug, Clone)]
pub struct TokenClock {
    started: Instant,
    thinking_done: Option<Instant>,
    tokens: u64,
    thinking_tokens: u64,
}

impl TokenClock {
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(started: Instant) -> Self {
        Self {
            started,
            thinking_done: None,
            tokens: 0,
            thinking_tokens: 0,
        }
    }

    pub fn record_thinking(&mut self, delta: &str) {
        self.thinking_tokens += count_tokens(delta);
    }

    pub fn record_answer(&mut self, delta: &str) {
        self.record_answer_at(delta, Instant::now());
    }

    /// The first answer token marks the end of the thinking phase
    pub fn record_answer_at(&mut self, delta: &str, now: Instant) {
        if self.thinking_done.is_none() {
            self.thinking_done = Some(now);
        }
        self.tokens += count_tokens(delta);
    }

    pub fn finish(&self) -> StageMetrics {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(&self, now: Instant) -> StageMetrics {
        let elapsed = now.saturating_duration_since(self.started);
        let thinking = match self.thinking_done {
            Some(done) if self.thinking_tokens > 0 => done.saturating_duration_since(self.started),
            _ => Duration::ZERO,
        };
        let seconds = elapsed.as_secs_f64();
        let tokens_per_second = if seconds > 0.0 {
            ((self.tokens + self.thinking_tokens) as f64 / seconds * 10.0).round() / 10.0
        } else {
            0.0
        };
        StageMetrics {
            elapsed_ms: elapsed.as_millis() as u64,
            thinking_ms: thinking.as_millis() as u64,
            answer_ms: elapsed.saturating_sub(thinking).as_millis() as u64,
            tokens: self.tokens,
            thinking_tokens: self.thinking_tokens,
            tokens_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_count_is_word_based_with_floor_of_one() {
        assert_eq!(count_tokens("hello there world"), 3);
        assert_eq!(count_tokens(""), 1);
        assert_eq!(count_tokens("   "), 1);
    }

    #[test]
    fn metrics_split_thinking_and_answer() {
        let t0 = Instant::now();
        let mut clock = TokenClock::starting_at(t0);
        clock.record_thinking("let me think");
        clock.record_answer_at("The answer", t0 + Duration::from_millis(400));
        clock.record_answer_at("is 4", t0 + Duration::from_millis(600));
        let metrics = clock.finish_at(t0 + Duration::from_secs(1));

        assert_eq!(metrics.elapsed_ms, 1000);
        assert_eq!(metrics.thinking_ms, 400);
        assert_eq!(metrics.answer_ms, 600);
        assert_eq!(metrics.tokens, 4);
        assert_eq!(metrics.thinking_tokens, 3);
        assert!((metrics.tokens_per_second - 7.0).abs() < 1e-9);
    }

    #[test]
    fn no_thinking_means_zero_thinking_time() {
        let t0 = Instant::now();
        let mut clock = TokenClock::starting_at(t0);
        clock.record_answer_at("hi", t0 + Duration::from_millis(200));
        let metrics = clock.finish_at(t0 + Duration::from_millis(500));
        assert_eq!(metrics.thinking_ms, 0);
        assert_eq!(metrics.answer_ms, 500);
    }
}
