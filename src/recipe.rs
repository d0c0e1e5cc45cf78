//! Request inputs and the [`Recommendation`] result.

use serde::{Deserialize, Serialize};

use crate::error::{ComforterError, Result};

/// The nine fields every recommendation must carry.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "dishName",
    "energyMatch",
    "moodExplanation",
    "estimatedCost",
    "keyIngredients",
    "instructions",
    "bestFor",
    "prepTime",
    "chefTip",
];

/// How the user feels right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Stressed,
    Energetic,
    Sad,
    Happy,
    Tired,
    Anxious,
    Lonely,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Stressed,
        Mood::Energetic,
        Mood::Sad,
        Mood::Happy,
        Mood::Tired,
        Mood::Anxious,
        Mood::Lonely,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Mood::Stressed => "Stressed",
            Mood::Energetic => "Energetic",
            Mood::Sad => "Sad",
            Mood::Happy => "Happy",
            Mood::Tired => "Tired",
            Mood::Anxious => "Anxious",
            Mood::Lonely => "Lonely",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Spending tier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Budget {
    #[serde(rename = "$")]
    Low,
    #[default]
    #[serde(rename = "$$")]
    Mid,
    #[serde(rename = "$$$")]
    High,
    #[serde(rename = "Not Decided")]
    Undecided,
}

impl Budget {
    pub fn label(self) -> &'static str {
        match self {
            Budget::Low => "$",
            Budget::Mid => "$$",
            Budget::High => "$$$",
            Budget::Undecided => "Not Decided",
        }
    }
}

impl std::fmt::Display for Budget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Who is asking. Immutable for the duration of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub full_name: String,
    pub age: u32,
    /// Heritage tag blended into the dish.
    pub nationality: String,
    /// Ordered, duplicate-free dietary labels (e.g. "Vegetarian").
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    /// Free-text allergy notice; empty means none.
    #[serde(default)]
    pub allergies: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            full_name: "Chef Guest".to_owned(),
            age: 25,
            nationality: "Global Citizen".to_owned(),
            dietary_preferences: Vec::new(),
            allergies: String::new(),
            location: None,
        }
    }
}

impl UserProfile {
    /// Add `tag` if absent, remove it if present. Returns whether it is now set.
    pub fn toggle_dietary_preference(&mut self, tag: &str) -> bool {
        if let Some(pos) = self.dietary_preferences.iter().position(|t| t == tag) {
            self.dietary_preferences.remove(pos);
            false
        } else {
            self.dietary_preferences.push(tag.to_owned());
            true
        }
    }

    /// A copy with dietary preferences and allergy notice cleared, used when
    /// the user switches dietary constraints off for a request.
    pub fn without_constraints(&self) -> Self {
        Self {
            dietary_preferences: Vec::new(),
            allergies: String::new(),
            ..self.clone()
        }
    }
}

/// Mood, budget and free narrative selected for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodBudgetContext {
    /// `None` means "infer from the narrative".
    pub mood: Option<Mood>,
    pub budget: Budget,
    pub narrative: String,
}

impl MoodBudgetContext {
    pub fn new(mood: Option<Mood>, budget: Budget) -> Self {
        Self {
            mood,
            budget,
            narrative: String::new(),
        }
    }

    pub fn with_narrative(mut self, narrative: impl Into<String>) -> Self {
        self.narrative = narrative.into();
        self
    }
}

/// A personalised recipe.
///
/// `image_url` and `step_images` are filled progressively after creation.
/// Once `step_images` is initialised it holds exactly `instructions.len()`
/// entries, with `""` marking a step whose picture has not arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub dish_name: String,
    pub energy_match: String,
    pub mood_explanation: String,
    pub estimated_cost: String,
    pub key_ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub best_for: String,
    pub prep_time: String,
    pub chef_tip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_images: Option<Vec<String>>,
}

impl Recommendation {
    /// Check that every required field carries content.
    ///
    /// # Errors
    ///
    /// Returns [`ComforterError::MalformedOutput`] naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        let scalars = [
            ("dishName", &self.dish_name),
            ("energyMatch", &self.energy_match),
            ("moodExplanation", &self.mood_explanation),
            ("estimatedCost", &self.estimated_cost),
            ("bestFor", &self.best_for),
            ("prepTime", &self.prep_time),
            ("chefTip", &self.chef_tip),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ComforterError::MalformedOutput(format!(
                "recipe field {name} is empty"
            )));
        }
        let lists = [
            ("keyIngredients", &self.key_ingredients),
            ("instructions", &self.instructions),
        ];
        for (name, list) in lists {
            if list.iter().all(|item| item.trim().is_empty()) {
                return Err(ComforterError::MalformedOutput(format!(
                    "recipe field {name} has no entries"
                )));
            }
        }
        Ok(())
    }

    /// Drop any image fields, e.g. ones a model echoed back unasked.
    pub fn without_images(mut self) -> Self {
        self.image_url = None;
        self.step_images = None;
        self
    }

    pub fn set_hero_image(&mut self, url: impl Into<String>) {
        self.image_url = Some(url.into());
    }

    /// Initialise `step_images` to one empty entry per instruction, keeping
    /// any entries already filled.
    pub fn ensure_step_images(&mut self) -> &mut Vec<String> {
        let len = self.instructions.len();
        let images = self.step_images.get_or_insert_with(Vec::new);
        images.resize(len, String::new());
        images
    }

    /// Store the picture for step `index`. Returns false if there is no such step.
    pub fn set_step_image(&mut self, index: usize, url: impl Into<String>) -> bool {
        if index >= self.instructions.len() {
            return false;
        }
        self.ensure_step_images()[index] = url.into();
        true
    }

    /// The picture for step `index`, `None` while it is still generating.
    pub fn step_image(&self, index: usize) -> Option<&str> {
        self.step_images
            .as_ref()
            .and_then(|images| images.get(index))
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    /// One-line text for sharing the dish.
    pub fn share_text(&self) -> String {
        format!(
            "Recommendation from The Culinary Comforter: {}",
            self.dish_name
        )
    }
}
