//! Spoonacular recipe API client.
//!
//! Only the three endpoints the exchange needs are wrapped:
//! `recipes/findByIngredients`, `recipes/{id}/information` and
//! `food/ingredients/substitutes`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::source::{RecipeCandidate, RecipeMeta, RecipeSource};
use crate::config::SpoonacularConfig;
use crate::error::MatchError;

/// Spoonacular ranking mode that maximises used ingredients.
const RANKING_MAXIMIZE_USED: &str = "2";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundRecipe {
    id: i64,
    title: String,
    #[serde(default)]
    used_ingredients: Vec<IngredientRef>,
    #[serde(default)]
    missed_ingredients: Vec<IngredientRef>,
}

#[derive(Debug, Deserialize)]
struct IngredientRef {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeInformation {
    ready_in_minutes: Option<u32>,
    servings: Option<u32>,
    source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubstitutesResponse {
    status: String,
    #[serde(default)]
    substitutes: Vec<String>,
}

fn into_candidate(found: FoundRecipe, info: RecipeInformation) -> RecipeCandidate {
    RecipeCandidate {
        recipe_id: found.id.to_string(),
        title: found.title,
        used_ingredients: found.used_ingredients.into_iter().map(|i| i.name).collect(),
        missed_ingredients: found.missed_ingredients.into_iter().map(|i| i.name).collect(),
        meta: RecipeMeta {
            ready_in_minutes: info.ready_in_minutes,
            servings: info.servings,
            source_url: info.source_url,
        },
    }
}

#[derive(Clone)]
pub struct SpoonacularClient {
    http: reqwest::Client,
    config: SpoonacularConfig,
}

impl SpoonacularClient {
    pub fn new(config: SpoonacularConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { http, config })
    }

    fn api_key(&self) -> Option<&str> {
        self.config.api_key.as_deref().filter(|k| !k.is_empty())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MatchError> {
        let key = self
            .api_key()
            .ok_or_else(|| MatchError::recipe_source("no API key configured"))?;
        let resp = self
            .http
            .get(self.url(path))
            .query(&[("apiKey", key)])
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MatchError::recipe_source(format!(
                "{path} returned {status}: {body}"
            )));
        }
        Ok(resp.json::<T>().await?)
    }

    async fn information(&self, recipe_id: i64) -> Result<RecipeInformation, MatchError> {
        self.get_json(
            &format!("recipes/{recipe_id}/information"),
            &[("includeNutrition", "false")],
        )
        .await
    }
}

#[async_trait]
impl RecipeSource for SpoonacularClient {
    async fn find_by_ingredients(
        &self,
        ingredients: &[String],
        count: usize,
    ) -> Result<Vec<RecipeCandidate>, MatchError> {
        if self.api_key().is_none() {
            warn!("no Spoonacular API key provided");
            return Ok(Vec::new());
        }
        if ingredients.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ingredients.join(",");
        let number = count.to_string();
        let found: Vec<FoundRecipe> = self
            .get_json(
                "recipes/findByIngredients",
                &[
                    ("ingredients", joined.as_str()),
                    ("number", number.as_str()),
                    ("ranking", RANKING_MAXIMIZE_USED),
                    ("ignorePantry", "false"),
                ],
            )
            .await?;
        debug!(found = found.len(), "spoonacular findByIngredients");

        let mut out = Vec::with_capacity(found.len());
        for recipe in found {
            match self.information(recipe.id).await {
                Ok(info) => out.push(into_candidate(recipe, info)),
                Err(e) => warn!(error = %e, recipe_id = recipe.id, "dropping recipe without details"),
            }
        }
        Ok(out)
    }

    async fn substitutes(&self, ingredient: &str) -> Result<Vec<String>, MatchError> {
        if self.api_key().is_none() {
            return Ok(Vec::new());
        }
        let resp: SubstitutesResponse = self
            .get_json(
                "food/ingredients/substitutes",
                &[("ingredientName", ingredient)],
            )
            .await?;
        Ok(successful_substitutes(resp))
    }
}

fn successful_substitutes(resp: SubstitutesResponse) -> Vec<String> {
    if resp.status == "success" {
        resp.substitutes
    } else {
        Vec::new()
    }
}
