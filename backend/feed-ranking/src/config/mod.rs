use crate::models::PartnerTrustTier;
use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "FEED_RANKING_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub ranking: RankingConfig,
    pub defaults: DefaultOptions,
}

/// Relative weight of each sub-score in the composite.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScoringWeights {
    pub user_interest: f64,
    pub content_quality: f64,
    pub local_relevance: f64,
    pub recency: f64,
    pub partner_trust: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            user_interest: 0.35,
            content_quality: 0.25,
            local_relevance: 0.20,
            recency: 0.10,
            partner_trust: 0.10,
        }
    }
}

/// Fixed score for each partner trust tier. Not derived from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TrustTierScale {
    pub unverified: f64,
    pub verified: f64,
    pub premium: f64,
}

impl Default for TrustTierScale {
    fn default() -> Self {
        Self {
            unverified: 0.2,
            verified: 0.6,
            premium: 1.0,
        }
    }
}

impl TrustTierScale {
    pub fn score(&self, tier: PartnerTrustTier) -> f64 {
        match tier {
            PartnerTrustTier::Unverified => self.unverified,
            PartnerTrustTier::Verified => self.verified,
            PartnerTrustTier::Premium => self.premium,
        }
    }
}

/// Immutable ranking parameters handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub weights: ScoringWeights,
    pub trust_scale: TrustTierScale,
    pub recency_half_life_days: f64,
    /// Max occurrences of one tier/category group inside a diversity window
    pub diversity_cap: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            trust_scale: TrustTierScale::default(),
            recency_half_life_days: 14.0,
            diversity_cap: 2,
        }
    }
}

impl RankingConfig {
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_diversity_cap(mut self, cap: usize) -> Self {
        self.diversity_cap = cap;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.weights;
        let t = &self.trust_scale;
        let named = [
            ("weight_user_interest", w.user_interest),
            ("weight_content_quality", w.content_quality),
            ("weight_local_relevance", w.local_relevance),
            ("weight_recency", w.recency),
            ("weight_partner_trust", w.partner_trust),
            ("trust_unverified", t.unverified),
            ("trust_verified", t.verified),
            ("trust_premium", t.premium),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !self.recency_half_life_days.is_finite() || self.recency_half_life_days <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "recency_half_life_days must be positive, got {}",
                self.recency_half_life_days
            )));
        }

        if self.diversity_cap == 0 {
            return Err(ConfigError::Invalid(
                "diversity_cap must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Options the front end falls back to when a request omits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultOptions {
    pub page_size: u32,
    pub diversity_window: u32,
}

impl Default for DefaultOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            diversity_window: 4,
        }
    }
}

/// Raw `FEED_RANKING_*` overrides; anything unset keeps the built-in value.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    weight_user_interest: Option<f64>,
    weight_content_quality: Option<f64>,
    weight_local_relevance: Option<f64>,
    weight_recency: Option<f64>,
    weight_partner_trust: Option<f64>,
    trust_unverified: Option<f64>,
    trust_verified: Option<f64>,
    trust_premium: Option<f64>,
    recency_half_life_days: Option<f64>,
    diversity_cap: Option<usize>,
    default_page_size: Option<u32>,
    default_diversity_window: Option<u32>,
}

impl EnvOverrides {
    fn apply(self) -> Config {
        let base = RankingConfig::default();
        let defaults = DefaultOptions::default();

        Config {
            ranking: RankingConfig {
                weights: ScoringWeights {
                    user_interest: self
                        .weight_user_interest
                        .unwrap_or(base.weights.user_interest),
                    content_quality: self
                        .weight_content_quality
                        .unwrap_or(base.weights.content_quality),
                    local_relevance: self
                        .weight_local_relevance
                        .unwrap_or(base.weights.local_relevance),
                    recency: self.weight_recency.unwrap_or(base.weights.recency),
                    partner_trust: self
                        .weight_partner_trust
                        .unwrap_or(base.weights.partner_trust),
                },
                trust_scale: TrustTierScale {
                    unverified: self
                        .trust_unverified
                        .unwrap_or(base.trust_scale.unverified),
                    verified: self.trust_verified.unwrap_or(base.trust_scale.verified),
                    premium: self.trust_premium.unwrap_or(base.trust_scale.premium),
                },
                recency_half_life_days: self
                    .recency_half_life_days
                    .unwrap_or(base.recency_half_life_days),
                diversity_cap: self.diversity_cap.unwrap_or(base.diversity_cap),
            },
            defaults: DefaultOptions {
                page_size: self.default_page_size.unwrap_or(defaults.page_size),
                diversity_window: self
                    .default_diversity_window
                    .unwrap_or(defaults.diversity_window),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
        let config = overrides.apply();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ranking.validate()?;
        if self.defaults.page_size == 0 || self.defaults.diversity_window == 0 {
            return Err(ConfigError::Invalid(
                "default_page_size and default_diversity_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ranking: RankingConfig::default(),
            defaults: DefaultOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 12] = [
        "FEED_RANKING_WEIGHT_USER_INTEREST",
        "FEED_RANKING_WEIGHT_CONTENT_QUALITY",
        "FEED_RANKING_WEIGHT_LOCAL_RELEVANCE",
        "FEED_RANKING_WEIGHT_RECENCY",
        "FEED_RANKING_WEIGHT_PARTNER_TRUST",
        "FEED_RANKING_TRUST_UNVERIFIED",
        "FEED_RANKING_TRUST_VERIFIED",
        "FEED_RANKING_TRUST_PREMIUM",
        "FEED_RANKING_RECENCY_HALF_LIFE_DAYS",
        "FEED_RANKING_DIVERSITY_CAP",
        "FEED_RANKING_DEFAULT_PAGE_SIZE",
        "FEED_RANKING_DEFAULT_DIVERSITY_WINDOW",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoringWeights::default();
        let sum = w.user_interest + w.content_quality + w.local_relevance + w.recency + w.partner_trust;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_trust_scale() {
        let scale = TrustTierScale::default();
        assert_eq!(scale.score(PartnerTrustTier::Unverified), 0.2);
        assert_eq!(scale.score(PartnerTrustTier::Verified), 0.6);
        assert_eq!(scale.score(PartnerTrustTier::Premium), 1.0);
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_without_override() {
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_with_override() {
        clear_env();
        std::env::set_var("FEED_RANKING_WEIGHT_RECENCY", "0.4");
        std::env::set_var("FEED_RANKING_DIVERSITY_CAP", "3");
        std::env::set_var("FEED_RANKING_DEFAULT_PAGE_SIZE", "50");

        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.ranking.weights.recency, 0.4);
        assert_eq!(config.ranking.weights.user_interest, 0.35);
        assert_eq!(config.ranking.diversity_cap, 3);
        assert_eq!(config.defaults.page_size, 50);
        assert_eq!(config.defaults.diversity_window, 4);
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_rejects_invalid_values() {
        clear_env();
        std::env::set_var("FEED_RANKING_RECENCY_HALF_LIFE_DAYS", "0");
        let result = Config::from_env();
        clear_env();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        std::env::set_var("FEED_RANKING_DIVERSITY_CAP", "not-a-number");
        let result = Config::from_env();
        clear_env();
        assert!(matches!(result, Err(ConfigError::Env(_))));
    }

    #[test]
    fn test_validate_negative_weight() {
        let config = RankingConfig::default().with_weights(ScoringWeights {
            user_interest: -0.1,
            ..ScoringWeights::default()
        });
        assert!(config.validate().is_err());
        assert!(RankingConfig::default().with_diversity_cap(0).validate().is_err());
    }
}
