//! pfc-signal
//!
//! SMA-crossover trade bias helper (5/20 moving averages).
//!
//! Diagnostic only — this feeds the same data path as the evaluation engine
//! but carries no correctness requirement on account state. Pure function,
//! deterministic, restartable on any subsequence of the price series.

use serde::{Deserialize, Serialize};

/// Samples required before any directional call is made.
const SLOW_WINDOW: usize = 20;
/// Fast moving-average window.
const FAST_WINDOW: usize = 5;
/// Neutral band around the slow average: the fast average must clear the slow
/// one by 5 bps either way before a BUY/SELL bias is emitted.
const NEUTRAL_BAND: f64 = 0.0005;

/// Directional bias derived from recent prices.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// A bias plus the rule that produced it. Serialize-only: advice flows out
/// to clients, never back in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignalAdvice {
    #[serde(rename = "type")]
    pub signal: Signal,
    pub reason: &'static str,
}

/// Derive a BUY/SELL/HOLD bias from a chronological price series
/// (most-recent sample last).
///
/// Fewer than 20 samples is always HOLD regardless of values.
pub fn calculate_signal(prices: &[f64]) -> SignalAdvice {
    if prices.len() < SLOW_WINDOW {
        return SignalAdvice {
            signal: Signal::Hold,
            reason: "insufficient history",
        };
    }

    let sma_fast = mean(&prices[prices.len() - FAST_WINDOW..]);
    let sma_slow = mean(&prices[prices.len() - SLOW_WINDOW..]);

    if sma_fast > sma_slow * (1.0 + NEUTRAL_BAND) {
        SignalAdvice {
            signal: Signal::Buy,
            reason: "bullish crossover",
        }
    } else if sma_fast < sma_slow * (1.0 - NEUTRAL_BAND) {
        SignalAdvice {
            signal: Signal::Sell,
            reason: "bearish crossover",
        }
    } else {
        SignalAdvice {
            signal: Signal::Hold,
            reason: "neutral market",
        }
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nineteen_samples_is_always_hold() {
        let prices: Vec<f64> = (1..=19).map(|i| i as f64 * 1_000.0).collect();
        let advice = calculate_signal(&prices);
        assert_eq!(advice.signal, Signal::Hold);
        assert_eq!(advice.reason, "insufficient history");
    }

    #[test]
    fn rising_tail_emits_buy() {
        // Flat at 100 for 15 samples, then a sharp rise: sma5 well above sma20.
        let mut prices = vec![100.0; 15];
        prices.extend([104.0, 106.0, 108.0, 110.0, 112.0]);
        let advice = calculate_signal(&prices);
        assert_eq!(advice.signal, Signal::Buy);
        assert_eq!(advice.reason, "bullish crossover");
    }

    #[test]
    fn falling_tail_emits_sell() {
        let mut prices = vec![100.0; 15];
        prices.extend([96.0, 94.0, 92.0, 90.0, 88.0]);
        let advice = calculate_signal(&prices);
        assert_eq!(advice.signal, Signal::Sell);
        assert_eq!(advice.reason, "bearish crossover");
    }

    #[test]
    fn flat_series_stays_inside_the_neutral_band() {
        let prices = vec![250.0; 20];
        let advice = calculate_signal(&prices);
        assert_eq!(advice.signal, Signal::Hold);
        assert_eq!(advice.reason, "neutral market");
    }

    #[test]
    fn small_drift_inside_band_is_hold() {
        // sma5 ends ~2 bps above sma20 — inside the 5 bps band.
        let mut prices = vec![100.0; 19];
        prices.push(100.08);
        let advice = calculate_signal(&prices);
        assert_eq!(advice.signal, Signal::Hold);
    }

    #[test]
    fn only_the_last_twenty_samples_matter() {
        // Garbage ancient history must not affect the verdict.
        let mut prices = vec![1e9; 40];
        prices.truncate(20);
        prices.extend(vec![100.0; 20]);
        let tail_only = calculate_signal(&prices[prices.len() - 20..]);
        let full = calculate_signal(&prices);
        assert_eq!(tail_only, full);
    }

    #[test]
    fn advice_serializes_with_contract_literals() {
        let advice = calculate_signal(&[100.0; 5]);
        let v = serde_json::to_value(&advice).unwrap();
        assert_eq!(v["type"], "HOLD");
        assert_eq!(v["reason"], "insufficient history");
    }
}
