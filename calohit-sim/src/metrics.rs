//! Counters owned by the stepping engine.

use calohit_core::step::Category;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Running counters, queried by the host instead of printed at shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SteppingMetrics {
    /// Events closed by an end-of-event notification.
    pub events_processed: u64,
    /// Events aborted by a corrupted step.
    pub events_aborted: u64,
    /// Steps received while an event was open.
    pub steps_seen: u64,
    /// Steps in instrumented volumes, per category (EB, EE, HC).
    pub steps_accepted: [u64; 3],
    /// Steps whose cell did not resolve.
    pub unresolved_cells: u64,
    /// Resolved steps dropped for a non-positive deposit.
    pub empty_deposits: u64,
    /// Records created.
    pub hits_created: u64,
    /// Deposits merged into an existing record.
    pub hits_merged: u64,
    /// Crystal steps whose light-curve geometry was out of band.
    pub light_curve_warnings: u64,
}

impl SteppingMetrics {
    /// Steps accepted for a category.
    #[must_use]
    pub fn accepted(&self, category: Category) -> u64 {
        self.steps_accepted[category.index()]
    }

    /// Counter-wise difference `self - earlier`.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> Self {
        Self {
            events_processed: self.events_processed - earlier.events_processed,
            events_aborted: self.events_aborted - earlier.events_aborted,
            steps_seen: self.steps_seen - earlier.steps_seen,
            steps_accepted: [
                self.steps_accepted[0] - earlier.steps_accepted[0],
                self.steps_accepted[1] - earlier.steps_accepted[1],
                self.steps_accepted[2] - earlier.steps_accepted[2],
            ],
            unresolved_cells: self.unresolved_cells - earlier.unresolved_cells,
            empty_deposits: self.empty_deposits - earlier.empty_deposits,
            hits_created: self.hits_created - earlier.hits_created,
            hits_merged: self.hits_merged - earlier.hits_merged,
            light_curve_warnings: self.light_curve_warnings - earlier.light_curve_warnings,
        }
    }

    /// Adds another set of counters to this one.
    pub fn absorb(&mut self, other: &Self) {
        self.events_processed += other.events_processed;
        self.events_aborted += other.events_aborted;
        self.steps_seen += other.steps_seen;
        for (mine, theirs) in self.steps_accepted.iter_mut().zip(other.steps_accepted) {
            *mine += theirs;
        }
        self.unresolved_cells += other.unresolved_cells;
        self.empty_deposits += other.empty_deposits;
        self.hits_created += other.hits_created;
        self.hits_merged += other.hits_merged;
        self.light_curve_warnings += other.light_curve_warnings;
    }
}

impl std::fmt::Display for SteppingMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Events processed: {}", self.events_processed)?;
        writeln!(f, "Events aborted: {}", self.events_aborted)?;
        writeln!(f, "Steps seen: {}", self.steps_seen)?;
        for category in Category::ALL {
            writeln!(f, "Steps in {}: {}", category, self.accepted(category))?;
        }
        writeln!(f, "Unresolved cells: {}", self.unresolved_cells)?;
        writeln!(f, "Empty deposits: {}", self.empty_deposits)?;
        writeln!(f, "Hits created: {}", self.hits_created)?;
        writeln!(f, "Deposits merged: {}", self.hits_merged)?;
        write!(f, "Light curve warnings: {}", self.light_curve_warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_since_and_absorb() {
        let before = SteppingMetrics {
            steps_seen: 10,
            steps_accepted: [1, 2, 3],
            ..SteppingMetrics::default()
        };
        let after = SteppingMetrics {
            events_processed: 1,
            steps_seen: 25,
            steps_accepted: [4, 2, 9],
            hits_created: 7,
            ..SteppingMetrics::default()
        };

        let delta = after.since(&before);
        assert_eq!(delta.steps_seen, 15);
        assert_eq!(delta.steps_accepted, [3, 0, 6]);
        assert_eq!(delta.hits_created, 7);

        let mut total = before.clone();
        total.absorb(&delta);
        assert_eq!(total, after);
    }

    #[test]
    fn test_display_lists_categories() {
        let text = SteppingMetrics::default().to_string();
        assert!(text.contains("Steps in EB: 0"));
        assert!(text.contains("Steps in HC: 0"));
    }
}
