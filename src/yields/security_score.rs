//! Heuristic safety score for a yield pool.
//!
//! The score starts at 100 and is adjusted by audit status, TVL, protocol
//! age, trading volume, APY volatility and the underlying tokens, then
//! clamped to `0..=100`.

use chrono::{DateTime, Utc};
use serde::Serialize;

const STABLECOINS: &[&str] = &[
    "USDC", "DAI", "USDT", "TUSD", "PAX", "BUSD", "FRAXBP", "CRVUSD", "PYUSD", "MKUSD", "USDE",
];

/// Minimum number of APY samples before volatility is scored.
const MIN_APY_SAMPLES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityInput {
    /// Free-form audit description, e.g. `"2 audits"` or `"No audit"`.
    pub audits: String,
    pub rugged: bool,
    pub tvl: f64,
    /// Protocol listing time, unix seconds.
    pub listed_at: Option<i64>,
    pub volume_24h: f64,
    pub apy_history: Vec<f64>,
    pub underlying_symbols: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgeRating {
    Established,
    Moderate,
    New,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VolatilityRating {
    Stable,
    Moderate,
    Volatile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl Rating {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => Rating::VeryHigh,
            65..=79 => Rating::High,
            50..=64 => Rating::Medium,
            35..=49 => Rating::Low,
            _ => Rating::VeryLow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::VeryHigh => "Very High",
            Rating::High => "High",
            Rating::Medium => "Medium",
            Rating::Low => "Low",
            Rating::VeryLow => "Very Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenScore {
    pub symbol: String,
    pub score: f64,
    pub is_stablecoin: bool,
    pub market_cap_rating: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityMetrics {
    pub has_audits: bool,
    pub audit_score: f64,
    pub audit_details: String,
    pub tvl: f64,
    pub tvl_score: f64,
    pub tvl_rating: Level,
    pub protocol_age_days: i64,
    pub age_score: f64,
    pub age_rating: AgeRating,
    pub volume_24h: f64,
    pub volume_score: f64,
    pub volume_rating: Level,
    pub apy_volatility: f64,
    pub volatility_score: f64,
    pub volatility_rating: VolatilityRating,
    pub token_scores: Vec<TokenScore>,
    pub avg_token_score: f64,
    pub total_score: u8,
    pub rating: Rating,
}

pub fn is_stablecoin(symbol: &str) -> bool {
    let upper = symbol.to_ascii_uppercase();
    STABLECOINS.contains(&upper.as_str())
}

fn score_token(symbol: &str) -> TokenScore {
    let stable = is_stablecoin(symbol);
    TokenScore {
        symbol: symbol.to_string(),
        score: if stable { 10.0 } else { 0.0 },
        is_stablecoin: stable,
        market_cap_rating: if stable { "High (Stablecoin)" } else { "Unknown" },
    }
}

fn audit_score(audits: &str, rugged: bool) -> (f64, bool) {
    if rugged {
        return (-40.0, false);
    }
    let lower = audits.to_lowercase();
    if lower.contains("no") {
        return (-50.0, false);
    }
    if lower.contains("audit") {
        // A leading digit is the audit count; anything else counts as one.
        let count = audits
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .filter(|n| *n > 0)
            .unwrap_or(1);
        return (if count >= 2 { 20.0 } else { 10.0 }, true);
    }
    (-25.0, false)
}

fn tvl_score(tvl: f64) -> (f64, Level) {
    if tvl < 1_000_000.0 {
        (-10.0, Level::Low)
    } else if tvl > 100_000_000.0 {
        (15.0, Level::High)
    } else if tvl > 10_000_000.0 {
        (10.0, Level::Medium)
    } else {
        (0.0, Level::Low)
    }
}

fn age_score(listed_at: Option<i64>, now: DateTime<Utc>) -> (f64, i64, AgeRating) {
    let Some(listed_at) = listed_at.filter(|ts| *ts > 0) else {
        return (0.0, 0, AgeRating::New);
    };
    let days = (now.timestamp() - listed_at).div_euclid(24 * 3600);
    let (score, rating) = if days > 730 {
        (10.0, AgeRating::Established)
    } else if days > 365 {
        (7.0, AgeRating::Established)
    } else if days > 90 {
        (3.0, AgeRating::Moderate)
    } else {
        (-5.0, AgeRating::New)
    };
    (score, days, rating)
}

fn volume_score(volume: f64) -> (f64, Level) {
    if volume > 50_000_000.0 {
        (10.0, Level::High)
    } else if volume > 10_000_000.0 {
        (5.0, Level::Medium)
    } else if volume > 0.0 {
        (-5.0, Level::Low)
    } else {
        (0.0, Level::Low)
    }
}

fn volatility_score(apys: &[f64]) -> (f64, f64, VolatilityRating) {
    if apys.len() < MIN_APY_SAMPLES {
        return (0.0, 0.0, VolatilityRating::Moderate);
    }
    let n = apys.len() as f64;
    let mean = apys.iter().sum::<f64>() / n;
    let variance = apys.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let volatility = if mean > 0.0 { std_dev / mean } else { 0.0 };

    if std_dev > mean * 0.5 {
        (-5.0, volatility, VolatilityRating::Volatile)
    } else if std_dev < mean * 0.1 {
        (5.0, volatility, VolatilityRating::Stable)
    } else {
        (0.0, volatility, VolatilityRating::Moderate)
    }
}

pub fn calc_security_score_with_metrics(input: &SecurityInput, now: DateTime<Utc>) -> SecurityMetrics {
    let (audit_score, has_audits) = audit_score(&input.audits, input.rugged);
    let (tvl_score, tvl_rating) = tvl_score(input.tvl);
    let (age_score, protocol_age_days, age_rating) = age_score(input.listed_at, now);
    let (volume_score, volume_rating) = volume_score(input.volume_24h);
    let (volatility_score, apy_volatility, volatility_rating) =
        volatility_score(&input.apy_history);

    let token_scores: Vec<TokenScore> = input
        .underlying_symbols
        .iter()
        .map(|s| score_token(s))
        .collect();
    let avg_token_score = if token_scores.is_empty() {
        -10.0
    } else {
        token_scores.iter().map(|t| t.score).sum::<f64>() / token_scores.len() as f64
    };

    let total = 100.0
        + audit_score
        + tvl_score
        + age_score
        + volume_score
        + volatility_score
        + avg_token_score;
    let total_score = total.round().clamp(0.0, 100.0) as u8;

    SecurityMetrics {
        has_audits,
        audit_score,
        audit_details: input.audits.clone(),
        tvl: input.tvl,
        tvl_score,
        tvl_rating,
        protocol_age_days,
        age_score,
        age_rating,
        volume_24h: input.volume_24h,
        volume_score,
        volume_rating,
        apy_volatility,
        volatility_score,
        volatility_rating,
        token_scores,
        avg_token_score,
        total_score,
        rating: Rating::from_score(total_score),
    }
}

pub fn calc_security_score(input: &SecurityInput, now: DateTime<Utc>) -> u8 {
    calc_security_score_with_metrics(input, now).total_score
}
