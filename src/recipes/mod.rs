mod source;
mod spoonacular;
pub mod swaps;

pub use source::{RecipeCandidate, RecipeMeta, RecipeSource};
pub use spoonacular::SpoonacularClient;
pub use swaps::SwapSuggestion;
