//! The recommendation currently on screen.
//!
//! Each published recommendation gets a fresh ticket. Background work merges
//! into the board by ticket, so updates addressed to a recommendation the
//! user has left, or that a newer request replaced, fall through silently.

use tokio::sync::watch;
use uuid::Uuid;

use crate::recipe::Recommendation;

/// A recommendation together with the ticket it was published under.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedRecommendation {
    pub ticket: Uuid,
    pub recipe: Recommendation,
}

/// Shared slot holding at most one displayed recommendation.
#[derive(Debug)]
pub struct RecommendationBoard {
    slot: watch::Sender<Option<DisplayedRecommendation>>,
}

impl Default for RecommendationBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationBoard {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Display `recipe`, replacing whatever was shown. Returns its ticket.
    pub fn publish(&self, recipe: Recommendation) -> Uuid {
        let ticket = Uuid::new_v4();
        self.slot
            .send_replace(Some(DisplayedRecommendation { ticket, recipe }));
        ticket
    }

    /// Clear the board. Pending merges become no-ops.
    pub fn clear(&self) {
        self.slot.send_if_modified(|slot| slot.take().is_some());
    }

    /// Whether `ticket` is still the one on display.
    pub fn is_current(&self, ticket: Uuid) -> bool {
        self.slot
            .borrow()
            .as_ref()
            .is_some_and(|shown| shown.ticket == ticket)
    }

    /// A copy of what is displayed right now.
    pub fn current(&self) -> Option<DisplayedRecommendation> {
        self.slot.borrow().clone()
    }

    /// Mutate the displayed recommendation if it still carries `ticket`.
    ///
    /// Returns whether `f` ran. Subscribers are notified only when it did.
    pub fn apply<F>(&self, ticket: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut Recommendation),
    {
        self.slot.send_if_modified(|slot| match slot {
            Some(shown) if shown.ticket == ticket => {
                f(&mut shown.recipe);
                true
            }
            _ => false,
        })
    }

    /// Observe every publish, merge and clear.
    pub fn subscribe(&self) -> watch::Receiver<Option<DisplayedRecommendation>> {
        self.slot.subscribe()
    }
}
