//! API quota tracking from GitHub rate-limit headers

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;

/// Quota as last reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitStatus {
    pub fn new(limit: u32, remaining: u32) -> Self {
        Self {
            limit,
            remaining,
            reset_at: None,
        }
    }

    /// Read `x-ratelimit-limit`, `x-ratelimit-remaining` and
    /// `x-ratelimit-reset` (epoch seconds). `None` if the first two are
    /// missing.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = header_number(headers, "x-ratelimit-limit")?;
        let remaining = header_number(headers, "x-ratelimit-remaining")?;
        let reset_at = header_number::<i64>(headers, "x-ratelimit-reset")
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Some(Self {
            limit,
            remaining,
            reset_at,
        })
    }

    pub fn used(&self) -> u32 {
        self.limit.saturating_sub(self.remaining)
    }

    /// Get usage percentage
    pub fn usage_percentage(&self) -> f32 {
        if self.limit == 0 {
            return 0.0;
        }
        (self.used() as f32 / self.limit as f32) * 100.0
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Get the current warning level
    pub fn warning_level(&self) -> RateLimitWarning {
        if self.is_exhausted() {
            return RateLimitWarning::Exhausted;
        }
        match self.usage_percentage() {
            p if p < 50.0 => RateLimitWarning::Healthy,
            p if p < 75.0 => RateLimitWarning::Warning,
            p if p < 90.0 => RateLimitWarning::Critical,
            _ => RateLimitWarning::Exhausted,
        }
    }
}

/// Quota warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitWarning {
    /// Less than half used
    Healthy,
    /// 50-75% used
    Warning,
    /// 75-90% used
    Critical,
    /// Over 90% used, or nothing left
    Exhausted,
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(RateLimitStatus::from_headers(&headers).is_none());

        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        let status = RateLimitStatus::from_headers(&headers).unwrap();
        assert_eq!(status.limit, 60);
        assert_eq!(status.remaining, 12);
        assert_eq!(status.used(), 48);
        assert_eq!(status.reset_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_warning_levels() {
        assert_eq!(RateLimitStatus::new(100, 80).warning_level(), RateLimitWarning::Healthy);
        assert_eq!(RateLimitStatus::new(100, 40).warning_level(), RateLimitWarning::Warning);
        assert_eq!(RateLimitStatus::new(100, 20).warning_level(), RateLimitWarning::Critical);
        assert_eq!(RateLimitStatus::new(100, 5).warning_level(), RateLimitWarning::Exhausted);
        assert_eq!(RateLimitStatus::new(0, 0).warning_level(), RateLimitWarning::Exhausted);
        assert!(RateLimitStatus::new(5000, 0).is_exhausted());
    }
}
