//! Saved recipes.
//!
//! Bookmarks are keyed by dish name. Persistence belongs to the caller; the
//! collection only defines its serde shape.

use serde::{Deserialize, Serialize};

use crate::recipe::Recommendation;

/// Ordered collection of bookmarked recommendations, newest last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedRecipes {
    recipes: Vec<Recommendation>,
}

impl SavedRecipes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a copy of `recipe`, or remove it if a dish with the same name is
    /// already saved. Returns true when the recipe is saved afterwards.
    pub fn toggle(&mut self, recipe: &Recommendation) -> bool {
        match self.position(&recipe.dish_name) {
            Some(index) => {
                self.recipes.remove(index);
                false
            }
            None => {
                self.recipes.push(recipe.clone());
                true
            }
        }
    }

    pub fn contains(&self, dish_name: &str) -> bool {
        self.position(dish_name).is_some()
    }

    pub fn get(&self, dish_name: &str) -> Option<&Recommendation> {
        self.position(dish_name).map(|i| &self.recipes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recommendation> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    fn position(&self, dish_name: &str) -> Option<usize> {
        self.recipes.iter().position(|r| r.dish_name == dish_name)
    }
}
