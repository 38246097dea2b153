use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::source::RecipeCandidate;
use crate::pantry::normalize_name;

/// A recipe two neighbours could cook together, with who brings what and
/// which missing ingredients could be swapped for something already held.
#[derive(Debug, Clone, Serialize)]
pub struct SwapSuggestion {
    pub recipe: RecipeCandidate,
    pub caller_provides: Vec<String>,
    pub other_provides: Vec<String>,
    pub missing: Vec<String>,
    pub possible_swaps: BTreeMap<String, Vec<String>>,
}

/// Splits the recipe's ingredients by who supplies them. The caller is
/// checked first, so shared ingredients count as the caller's.
pub fn split_contributions(
    recipe: &RecipeCandidate,
    caller: &BTreeSet<String>,
    other: &BTreeSet<String>,
) -> SwapSuggestion {
    let mut caller_provides = Vec::new();
    let mut other_provides = Vec::new();
    let mut missing = Vec::new();

    for name in recipe.required_ingredients() {
        if caller.contains(&name) {
            caller_provides.push(name);
        } else if other.contains(&name) {
            other_provides.push(name);
        } else {
            missing.push(name);
        }
    }

    SwapSuggestion {
        recipe: recipe.clone(),
        caller_provides,
        other_provides,
        missing,
        possible_swaps: BTreeMap::new(),
    }
}

/// Ingredient named by a substitute phrase: `"1 cup greek yogurt"` ->
/// `"greek yogurt"`. Phrases of one or two words yield their last word.
pub fn substitute_name(phrase: &str) -> String {
    let lowered = normalize_name(phrase);
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.len() > 2 {
        words[2..].join(" ")
    } else {
        words.last().map(|w| w.to_string()).unwrap_or_default()
    }
}

/// Substitutes whose ingredient is already in `available`.
pub fn usable_substitutes(substitutes: &[String], available: &BTreeSet<String>) -> Vec<String> {
    substitutes
        .iter()
        .filter(|s| available.contains(&substitute_name(s)))
        .cloned()
        .collect()
}
