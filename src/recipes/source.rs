use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MatchError;
use crate::pantry::normalize_name;

/// Descriptive fields the source attaches to a recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeMeta {
    pub ready_in_minutes: Option<u32>,
    pub servings: Option<u32>,
    pub source_url: Option<String>,
}

/// A recipe proposed by the recipe source for a set of ingredients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCandidate {
    pub recipe_id: String,
    pub title: String,
    pub used_ingredients: Vec<String>,
    pub missed_ingredients: Vec<String>,
    #[serde(flatten)]
    pub meta: RecipeMeta,
}

impl RecipeCandidate {
    /// Every ingredient the recipe declares, normalised and de-duplicated,
    /// used ingredients first.
    pub fn required_ingredients(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in self.used_ingredients.iter().chain(&self.missed_ingredients) {
            let name = normalize_name(name);
            if !name.is_empty() && !out.contains(&name) {
                out.push(name);
            }
        }
        out
    }
}

/// External provider of recipe recommendations.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Up to `count` recipes for `ingredients`, ranked by the source to
    /// maximise used ingredients.
    async fn find_by_ingredients(
        &self,
        ingredients: &[String],
        count: usize,
    ) -> Result<Vec<RecipeCandidate>, MatchError>;

    /// Free-text substitutes for one ingredient, e.g. `"1 cup greek yogurt"`.
    async fn substitutes(&self, _ingredient: &str) -> Result<Vec<String>, MatchError> {
        Ok(Vec::new())
    }
}
