//! Background image hydration for a displayed recommendation.
//!
//! Runs after the recommendation is already on the board: the hero image
//! first, then step images one at a time with a pacing delay before each.
//! Every result is merged by ticket, so work for a recommendation the user
//! has left is discarded. Failures are logged and never abort the run.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::RecommendationBoard;
use crate::config::HydrationConfig;
use crate::imagery::ImageSynthesizer;
use crate::recipe::Recommendation;

/// Outcome of one hydration run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationReport {
    /// The hero image fell back to the placeholder.
    pub hero_placeholder: bool,
    pub steps_filled: usize,
    pub steps_failed: usize,
    /// The recommendation left the board before the run finished.
    pub stale: bool,
}

/// Run hydration on a detached task. Dropping the handle does not cancel it.
pub fn spawn_hydration(
    board: Arc<RecommendationBoard>,
    images: Arc<ImageSynthesizer>,
    config: HydrationConfig,
    ticket: Uuid,
    recipe: Recommendation,
) -> JoinHandle<HydrationReport> {
    tokio::spawn(async move { hydrate(&board, &images, &config, ticket, &recipe).await })
}

/// Fill the hero and up to `step_image_limit` step images for `ticket`.
///
/// `recipe` is the snapshot the prompts are built from; results are merged
/// into whatever the board holds under `ticket`.
pub async fn hydrate(
    board: &RecommendationBoard,
    images: &ImageSynthesizer,
    config: &HydrationConfig,
    ticket: Uuid,
    recipe: &Recommendation,
) -> HydrationReport {
    let mut report = HydrationReport::default();
    let dish = recipe.dish_name.as_str();

    if !board.apply(ticket, |r| {
        r.ensure_step_images();
    }) {
        debug!(%ticket, "recommendation gone before hydration started");
        report.stale = true;
        return report;
    }

    let hero = images.synthesize_hero_image(dish).await;
    report.hero_placeholder = !hero.starts_with("data:");
    if !board.apply(ticket, |r| r.set_hero_image(hero)) {
        report.stale = true;
        return report;
    }

    let delay = Duration::from_millis(config.step_delay_ms);
    for (step, instruction) in recipe
        .instructions
        .iter()
        .take(config.step_image_limit)
        .enumerate()
    {
        tokio::time::sleep(delay).await;
        if !board.is_current(ticket) {
            report.stale = true;
            break;
        }

        match images.synthesize_step_image(instruction, dish).await {
            Ok(url) => {
                if board.apply(ticket, |r| {
                    r.set_step_image(step, url);
                }) {
                    report.steps_filled += 1;
                } else {
                    report.stale = true;
                    break;
                }
            }
            Err(e) => {
                warn!(step, error = %e, "step image failed, leaving it pending");
                report.steps_failed += 1;
            }
        }
    }

    if !report.stale {
        board.apply(ticket, |r| {
            r.ensure_step_images();
        });
    }
    info!(
        dish,
        hero_placeholder = report.hero_placeholder,
        steps_filled = report.steps_filled,
        steps_failed = report.steps_failed,
        stale = report.stale,
        "hydration finished"
    );
    report
}
