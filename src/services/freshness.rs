//! Staleness horizon estimation.
//!
//! Predicts how many days a parametric answer stays current, from the
//! subject's volatility and how much the query reads like breaking news.

use crate::domain::models::Volatility;

/// Horizon when the breaking-news score is zero.
pub const fn base_horizon_days(volatility: Volatility) -> f64 {
    match volatility {
        Volatility::Timeless => 3650.0,
        Volatility::Slow => 180.0,
        Volatility::Fast => 30.0,
        Volatility::Breaking => 1.0,
    }
}

/// Days until a parametric answer is expected to go stale, never below one.
pub fn staleness_horizon_days(volatility: Volatility, breaking_news: f64) -> f64 {
    let breaking = if breaking_news.is_finite() {
        breaking_news.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (base_horizon_days(volatility) * (1.0 - breaking)).max(1.0)
}

/// Volatility guessed from the query signals when the caller did not declare one.
pub fn infer_volatility(breaking_news: f64, has_time_expression: bool) -> Volatility {
    if breaking_news >= 0.25 {
        Volatility::Breaking
    } else if has_time_expression {
        Volatility::Fast
    } else {
        Volatility::Slow
    }
}

/// Weight a volatility class contributes to the freshness need.
pub const fn volatility_weight(volatility: Volatility) -> f64 {
    match volatility {
        Volatility::Timeless => 0.0,
        Volatility::Slow => 0.2,
        Volatility::Fast => 0.5,
        Volatility::Breaking => 0.9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizon_is_monotone_in_volatility() {
        let breaking = staleness_horizon_days(Volatility::Breaking, 0.0);
        let fast = staleness_horizon_days(Volatility::Fast, 0.0);
        let slow = staleness_horizon_days(Volatility::Slow, 0.0);
        let timeless = staleness_horizon_days(Volatility::Timeless, 0.0);
        assert!(breaking < fast);
        assert!(fast < slow);
        assert!(slow < timeless);
    }

    #[test]
    fn test_breaking_news_shortens_horizon() {
        let calm = staleness_horizon_days(Volatility::Slow, 0.0);
        let urgent = staleness_horizon_days(Volatility::Slow, 0.5);
        assert!((calm - 180.0).abs() < f64::EPSILON);
        assert!((urgent - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_horizon_never_below_one_day() {
        assert!((staleness_horizon_days(Volatility::Fast, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!((staleness_horizon_days(Volatility::Breaking, f64::NAN) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_infer_volatility() {
        assert_eq!(infer_volatility(0.5, false), Volatility::Breaking);
        assert_eq!(infer_volatility(0.0, true), Volatility::Fast);
        assert_eq!(infer_volatility(0.1, false), Volatility::Slow);
    }
}
