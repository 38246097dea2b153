use std::collections::HashMap;

use super::combination::RecipeMatch;

/// Keeps one match per recipe id, the one with the fewest missing
/// ingredients (first seen wins ties), then orders by missing count.
///
/// The sort is stable, so equal counts keep first-seen order.
pub fn rank(matches: Vec<RecipeMatch>) -> Vec<RecipeMatch> {
    let mut best: Vec<RecipeMatch> = Vec::with_capacity(matches.len());
    let mut slot_of: HashMap<String, usize> = HashMap::new();

    for m in matches {
        match slot_of.get(&m.recipe.recipe_id) {
            Some(&i) => {
                if m.missing_ingredients.len() < best[i].missing_ingredients.len() {
                    best[i] = m;
                }
            }
            None => {
                slot_of.insert(m.recipe.recipe_id.clone(), best.len());
                best.push(m);
            }
        }
    }

    best.sort_by_key(|m| m.missing_ingredients.len());
    best
}
