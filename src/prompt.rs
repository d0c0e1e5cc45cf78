//! Prompt construction from configurable templates.
//!
//! Templates use `{name}` placeholders. Unknown placeholders are left as-is.
//!
//! | Template         | Placeholders |
//! |------------------|--------------|
//! | `recommendation` | `nationality`, `fusion_source`, `name`, `age`, `location`, `dietary`, `allergies`, `mood`, `budget`, `time_of_day`, `season`, `context` |
//! | `hero_image`     | `dish_name` |
//! | `step_image`     | `step`, `dish_name` |
//! | `narration`      | `first_name`, `dish_name`, `mood_explanation`, `steps`, `word_limit` |

use chrono::{Datelike, Local, Timelike};

use crate::config::PromptTemplates;
use crate::recipe::{MoodBudgetContext, Recommendation, UserProfile};

/// Used when the display name has no usable first token.
pub const FALLBACK_FIRST_NAME: &str = "Friend";

/// Coarse part of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Bucket a local hour (0-23).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
        }
    }
}

/// Meteorological season (northern hemisphere months).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Bucket a calendar month (1-12).
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Winter => "Winter",
        }
    }
}

/// When the request is made. Only enriches the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptMoment {
    pub time_of_day: TimeOfDay,
    pub season: Season,
}

impl PromptMoment {
    /// The current local moment.
    pub fn now() -> Self {
        let now = Local::now();
        Self {
            time_of_day: TimeOfDay::from_hour(now.hour()),
            season: Season::from_month(now.month()),
        }
    }
}

/// Replace each `{key}` in `template` with its value.
///
/// Only the template is scanned. Inserted values are copied verbatim, so a
/// value that itself contains `{key}` is never expanded. Unknown keys and
/// unmatched braces are kept as literal text.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        rest = tail;
        let Some(close) = tail.find('}') else {
            break;
        };
        let key = &tail[1..close];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// First whitespace-separated token of a display name, or [`FALLBACK_FIRST_NAME`].
pub fn first_name(display_name: &str) -> &str {
    display_name
        .split_whitespace()
        .next()
        .unwrap_or(FALLBACK_FIRST_NAME)
}

/// Render the structured recipe request.
pub fn recommendation_prompt(
    templates: &PromptTemplates,
    profile: &UserProfile,
    context: &MoodBudgetContext,
    moment: PromptMoment,
) -> String {
    let (location, fusion_source) = match profile.location {
        Some(loc) => (
            format!(
                "The user is currently at coordinates: Latitude {}, Longitude {}.",
                loc.latitude, loc.longitude
            ),
            "the cuisine of their live location",
        ),
        None => (
            "Location data is currently unavailable, use global seasonal inspiration.".to_owned(),
            "general seasonal inspiration",
        ),
    };
    let dietary = if profile.dietary_preferences.is_empty() {
        "None".to_owned()
    } else {
        profile.dietary_preferences.join(", ")
    };
    let allergies = non_empty_or(&profile.allergies, "None");
    let mood = context
        .mood
        .map(|m| m.label())
        .unwrap_or("Refer to context");
    let narrative = non_empty_or(&context.narrative, "None");
    let age = profile.age.to_string();

    render(
        &templates.recommendation,
        &[
            ("nationality", profile.nationality.as_str()),
            ("fusion_source", fusion_source),
            ("name", profile.full_name.as_str()),
            ("age", age.as_str()),
            ("location", location.as_str()),
            ("dietary", dietary.as_str()),
            ("allergies", allergies),
            ("mood", mood),
            ("budget", context.budget.label()),
            ("time_of_day", moment.time_of_day.label()),
            ("season", moment.season.label()),
            ("context", narrative),
        ],
    )
}

/// Render the hero photograph prompt.
pub fn hero_image_prompt(templates: &PromptTemplates, dish_name: &str) -> String {
    render(&templates.hero_image, &[("dish_name", dish_name)])
}

/// Render the step action-shot prompt.
pub fn step_image_prompt(templates: &PromptTemplates, step: &str, dish_name: &str) -> String {
    render(
        &templates.step_image,
        &[("step", step), ("dish_name", dish_name)],
    )
}

/// Render the narration script.
pub fn narration_prompt(
    templates: &PromptTemplates,
    recommendation: &Recommendation,
    user_name: &str,
) -> String {
    let steps = recommendation
        .instructions
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {}", i + 1, step.trim()))
        .collect::<Vec<_>>()
        .join("\n");
    let word_limit = templates.narration_word_limit.to_string();

    render(
        &templates.narration,
        &[
            ("first_name", first_name(user_name)),
            ("dish_name", recommendation.dish_name.as_str()),
            ("mood_explanation", recommendation.mood_explanation.as_str()),
            ("steps", steps.as_str()),
            ("word_limit", word_limit.as_str()),
        ],
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
