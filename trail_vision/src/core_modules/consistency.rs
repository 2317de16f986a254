// THEORY:
// The `consistency` module is the stateful heart of the tracking engine. The
// matcher is happy to return a best placement for every single frame, but a lone
// placement is worthless: menus and battles cover the view, the stream glitches,
// and a 10x9 shade grid occasionally fits somewhere it should not. This filter
// turns that noisy per-cycle stream into fixes worth persisting.
//
// Key architectural principles:
// 1.  **Sighting debounce**: The player silhouette must sit in the capture's
//     center tile for several consecutive cycles before any search runs at all.
//     This both suppresses menu/battle frames and avoids burning a full map scan
//     on transient states.
// 2.  **Motion as evidence**: A placement identical to the previously accepted
//     one is rejected outright. A real player is generally moving; a stationary
//     "discovery" cycle after cycle is the signature of a spurious re-match.
// 3.  **Drift-bounded acceptance**: The `Anchor` is a smoothed estimate of the
//     player's general area. A fresh placement is only accepted if it sits within
//     a squared distance of the anchor that grows with the time since the last
//     accepted find, modeling a maximum plausible travel speed. The anchor is
//     nudged toward the candidate before the test, so a burst of consistent
//     placements walks the anchor over even from a cold start.
// 4.  **Confirmation streak**: Acceptance alone is still not persistence. Only a
//     streak of accepted placements confirms a fix; a single drift rejection
//     resets the streak to zero.

use crate::core_modules::grid_matcher::MatchCandidate;
use crate::pipeline::TrackerConfig;
use std::time::Duration;

/// Smoothed running estimate of the player's general map area, in tile units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    /// First-order exponential smoothing: move `fraction` of the remaining
    /// distance toward the target.
    pub fn nudge_toward(&mut self, x: f64, y: f64, fraction: f64) {
        self.x += (x - self.x) * fraction;
        self.y += (y - self.y) * fraction;
    }

    pub fn distance_sq(&self, x: f64, y: f64) -> f64 {
        (x - self.x).powi(2) + (y - self.y).powi(2)
    }
}

/// The filter's verdict on a single candidate placement.
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    /// Identical to the last accepted placement.
    SameAsPrevious,
    /// Too far from the anchor for the time elapsed since the last find.
    TooFar { distance_sq: f64, allowed_sq: f64 },
    /// Accepted; the confirmation streak is still building.
    Unconfirmed { streak: u32 },
    /// Accepted and confirmed.
    Confirmed,
}

/// Cycle-to-cycle tracking state. All mutation happens through `record_sighting`,
/// `reset_sightings` and `assess`; the owning pipeline runs one cycle at a time.
pub struct ConsistencyFilter {
    /// Consecutive cycles with the player silhouette in the center tile.
    sighting_count: u32,
    /// Consecutive accepted placements.
    confirm_streak: u32,
    /// Last placement that survived the same-as-previous check, accepted or not.
    last_accepted: (i32, i32),
    /// Session time of the last drift-accepted placement.
    last_find: Duration,
    anchor: Anchor,
}

impl ConsistencyFilter {
    /// Starts with the anchor (and the last-accepted placement) at the given
    /// point, conventionally the map center.
    pub fn new(initial_anchor: Anchor) -> Self {
        Self {
            sighting_count: 0,
            confirm_streak: 0,
            last_accepted: (initial_anchor.x as i32, initial_anchor.y as i32),
            last_find: Duration::ZERO,
            anchor: initial_anchor,
        }
    }

    /// Center tile was not the player silhouette: back to square one.
    pub fn reset_sightings(&mut self) {
        self.sighting_count = 0;
    }

    /// Center tile held the player silhouette; returns the running count.
    pub fn record_sighting(&mut self) -> u32 {
        self.sighting_count += 1;
        self.sighting_count
    }

    /// Runs the acceptance chain on a placement that already passed the score
    /// threshold. `elapsed` is time since session start.
    pub fn assess(
        &mut self,
        candidate: &MatchCandidate,
        elapsed: Duration,
        config: &TrackerConfig,
    ) -> Assessment {
        if (candidate.x, candidate.y) == self.last_accepted {
            return Assessment::SameAsPrevious;
        }
        self.last_accepted = (candidate.x, candidate.y);

        let since_find = elapsed.saturating_sub(self.last_find);

        // The anchor moves first, then the drift test measures against the
        // moved anchor. Troll placements far from the player only drag the
        // anchor halfway and then fail the test; genuine movement passes and
        // keeps walking the anchor along.
        let (cx, cy) = (candidate.x as f64, candidate.y as f64);
        self.anchor.nudge_toward(cx, cy, config.anchor_smoothing);

        let distance_sq = self.anchor.distance_sq(cx, cy);
        let allowed_sq = since_find.as_secs_f64().powi(2) * config.drift_multiplier;

        if distance_sq <= allowed_sq {
            self.last_find = elapsed;
            self.confirm_streak += 1;
            if self.confirm_streak >= config.confirm_threshold {
                Assessment::Confirmed
            } else {
                Assessment::Unconfirmed {
                    streak: self.confirm_streak,
                }
            }
        } else {
            self.confirm_streak = 0;
            Assessment::TooFar {
                distance_sq,
                allowed_sq,
            }
        }
    }

    /// Manual override: plant the anchor at the given tile and treat now as the
    /// last find, bypassing every check.
    pub fn override_anchor(&mut self, x: f64, y: f64, elapsed: Duration) {
        self.anchor = Anchor { x, y };
        self.last_find = elapsed;
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn sighting_count(&self) -> u32 {
        self.sighting_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrackerConfig {
        TrackerConfig::default()
    }

    fn candidate(x: i32, y: i32) -> MatchCandidate {
        MatchCandidate { score: 90, x, y }
    }

    #[test]
    fn sightings_reset_on_missing_silhouette() {
        let mut filter = ConsistencyFilter::new(Anchor { x: 0.0, y: 0.0 });
        filter.record_sighting();
        filter.record_sighting();
        filter.reset_sightings();
        assert_eq!(filter.sighting_count(), 0);
        assert_eq!(filter.record_sighting(), 1);
    }

    #[test]
    fn same_placement_twice_is_rejected() {
        let cfg = config();
        let mut filter = ConsistencyFilter::new(Anchor { x: 10.0, y: 10.0 });

        let first = filter.assess(&candidate(8, 10), Duration::from_secs(10), &cfg);
        assert_eq!(first, Assessment::Unconfirmed { streak: 1 });

        // Identical placement, maximal score, ample time: still rejected.
        let second = filter.assess(&candidate(8, 10), Duration::from_secs(60), &cfg);
        assert_eq!(second, Assessment::SameAsPrevious);
    }

    #[test]
    fn drift_budget_grows_with_elapsed_time() {
        let cfg = config();

        // multiplier 2, elapsed 3s: allowed squared distance is 18. The anchor
        // is nudged halfway first, so a candidate 4 tiles out lands 2 tiles
        // from the anchor (distance_sq 4) and passes.
        let mut filter = ConsistencyFilter::new(Anchor { x: 0.0, y: 0.0 });
        let verdict = filter.assess(&candidate(4, 0), Duration::from_secs(3), &cfg);
        assert_eq!(verdict, Assessment::Unconfirmed { streak: 1 });
        assert_eq!(filter.anchor(), Anchor { x: 2.0, y: 0.0 });

        // A candidate 12 tiles out lands 6 tiles from the anchor
        // (distance_sq 36 > 18) and is rejected; the streak resets.
        let mut filter = ConsistencyFilter::new(Anchor { x: 0.0, y: 0.0 });
        match filter.assess(&candidate(12, 0), Duration::from_secs(3), &cfg) {
            Assessment::TooFar {
                distance_sq,
                allowed_sq,
            } => {
                assert_eq!(distance_sq, 36.0);
                assert_eq!(allowed_sq, 18.0);
            }
            other => panic!("expected TooFar, got {other:?}"),
        }
    }

    #[test]
    fn drift_rejection_resets_the_streak() {
        let cfg = config();
        let mut filter = ConsistencyFilter::new(Anchor { x: 0.0, y: 0.0 });

        assert_eq!(
            filter.assess(&candidate(1, 0), Duration::from_secs(5), &cfg),
            Assessment::Unconfirmed { streak: 1 }
        );
        assert_eq!(
            filter.assess(&candidate(2, 0), Duration::from_secs(7), &cfg),
            Assessment::Unconfirmed { streak: 2 }
        );

        // A wild jump right after a find: only 1s of budget, far too tight.
        match filter.assess(&candidate(40, 40), Duration::from_secs(8), &cfg) {
            Assessment::TooFar { .. } => {}
            other => panic!("expected TooFar, got {other:?}"),
        }

        // The streak starts over.
        assert_eq!(
            filter.assess(&candidate(3, 0), Duration::from_secs(60), &cfg),
            Assessment::Unconfirmed { streak: 1 }
        );
    }

    #[test]
    fn third_accepted_placement_confirms() {
        let cfg = config();
        let mut filter = ConsistencyFilter::new(Anchor { x: 0.0, y: 0.0 });

        assert_eq!(
            filter.assess(&candidate(1, 0), Duration::from_secs(5), &cfg),
            Assessment::Unconfirmed { streak: 1 }
        );
        assert_eq!(
            filter.assess(&candidate(2, 0), Duration::from_secs(10), &cfg),
            Assessment::Unconfirmed { streak: 2 }
        );
        assert_eq!(
            filter.assess(&candidate(3, 0), Duration::from_secs(15), &cfg),
            Assessment::Confirmed
        );
        // The streak keeps counting: every further accepted placement confirms.
        assert_eq!(
            filter.assess(&candidate(4, 0), Duration::from_secs(20), &cfg),
            Assessment::Confirmed
        );
    }

    #[test]
    fn override_plants_the_anchor_and_refreshes_the_find_clock() {
        let cfg = config();
        let mut filter = ConsistencyFilter::new(Anchor { x: 0.0, y: 0.0 });
        filter.override_anchor(50.0, 40.0, Duration::from_secs(100));
        assert_eq!(filter.anchor(), Anchor { x: 50.0, y: 40.0 });

        // 2s after the override the budget is 8; a neighboring tile passes.
        assert_eq!(
            filter.assess(&candidate(51, 40), Duration::from_secs(102), &cfg),
            Assessment::Unconfirmed { streak: 1 }
        );
    }
}
