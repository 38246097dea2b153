use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub max_distance_km: f64,
    pub min_ingredients_for_recipe: usize,
    pub recipe_count_per_query: usize,
    pub recipe_timeout_secs: u64,
    pub max_concurrent_recipe_queries: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 5.0,
            min_ingredients_for_recipe: 4,
            recipe_count_per_query: 5,
            recipe_timeout_secs: 10,
            max_concurrent_recipe_queries: 4,
        }
    }
}

impl MatchingConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            max_distance_km: env_or("MAX_DISTANCE_KM", d.max_distance_km),
            min_ingredients_for_recipe: env_or(
                "MIN_INGREDIENTS_FOR_RECIPE",
                d.min_ingredients_for_recipe,
            ),
            recipe_count_per_query: env_or("RECIPE_COUNT_PER_QUERY", d.recipe_count_per_query),
            recipe_timeout_secs: env_or("RECIPE_TIMEOUT_SECS", d.recipe_timeout_secs),
            max_concurrent_recipe_queries: env_or(
                "RECIPE_MAX_CONCURRENT",
                d.max_concurrent_recipe_queries,
            )
            .max(1),
        }
    }

    pub fn recipe_timeout(&self) -> Duration {
        Duration::from_secs(self.recipe_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpoonacularConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl SpoonacularConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("SPOONACULAR_API_KEY").ok(),
            base_url: std::env::var("SPOONACULAR_BASE_URL")
                .unwrap_or_else(|_| "https://api.spoonacular.com".into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub matching: MatchingConfig,
    pub spoonacular: SpoonacularConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        Ok(Self {
            database_url,
            matching: MatchingConfig::from_env(),
            spoonacular: SpoonacularConfig::from_env(),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
