//! Scoring engine.
//!
//! Each climb is worth a fixed number of base points when topped, reduced by a
//! per-attempt penalty from the second attempt onward. The penalty stops
//! growing once the attempt cap is reached. A competitor's total is the sum of
//! their best `count_best` climbs.
//!
//! ```
//! use boulderboard::config::{ClimbConfig, ScoringConfig};
//! use boulderboard::scoring::ScoringRules;
//!
//! let config = ScoringConfig {
//!     climbs: vec![ClimbConfig { number: 1, base: 100, penalty: 10 }],
//!     ..ScoringConfig::default()
//! };
//! let rules = ScoringRules::from(&config);
//!
//! assert_eq!(rules.points_for(1, 1, true), 100);
//! assert_eq!(rules.points_for(1, 3, true), 80);
//! assert_eq!(rules.points_for(1, 9, true), 60);
//! assert_eq!(rules.points_for(1, 1, false), 0);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::competitor::{Category, Competitor, Score};
use crate::config::ScoringConfig;

/// Points configuration of one climb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimbValue {
    /// Points for a first-attempt top.
    pub base: u32,
    /// Deduction per additional attempt.
    pub penalty: u32,
}

/// The rules a competition is scored by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringRules {
    climbs: BTreeMap<u32, ClimbValue>,
    count_best: usize,
    penalty_attempt_cap: u32,
    max_attempts: u32,
}

impl From<&ScoringConfig> for ScoringRules {
    fn from(config: &ScoringConfig) -> Self {
        let climbs = config
            .climbs
            .iter()
            .map(|c| {
                (
                    c.number,
                    ClimbValue {
                        base: c.base,
                        penalty: c.penalty,
                    },
                )
            })
            .collect();

        Self {
            climbs,
            count_best: config.count_best,
            penalty_attempt_cap: config.penalty_attempt_cap.max(1),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// One result after points have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoredClimb {
    /// Climb number.
    pub climb_number: u32,
    /// Attempts taken.
    pub attempts: u32,
    /// Whether the climb was topped.
    pub topped: bool,
    /// Points earned.
    pub points: u32,
}

impl ScoredClimb {
    fn counts_as_top(&self) -> bool {
        self.topped && self.points > 0
    }
}

/// A competitor's aggregate over their counted climbs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Sum of points over the counted climbs.
    pub total_points: u64,
    /// Topped climbs among the counted ones.
    pub tops: u32,
    /// Attempts spent on those tops.
    pub attempts_on_tops: u32,
    /// Most recent update among the counted results.
    pub last_update: Option<DateTime<Utc>>,
}

impl ScoringRules {
    /// Maximum attempts a result can record.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Number of best climbs that count, 0 meaning all.
    #[must_use]
    pub fn count_best(&self) -> usize {
        self.count_best
    }

    /// Whether the climb is in the climb table.
    #[must_use]
    pub fn is_known_climb(&self, climb_number: u32) -> bool {
        self.climbs.contains_key(&climb_number)
    }

    /// Climb numbers in ascending order.
    pub fn climb_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.climbs.keys().copied()
    }

    /// Points for a single result.
    ///
    /// Unknown climbs and untopped climbs score 0.
    #[must_use]
    pub fn points_for(&self, climb_number: u32, attempts: u32, topped: bool) -> u32 {
        let Some(value) = self.climbs.get(&climb_number) else {
            return 0;
        };
        if !topped {
            return 0;
        }

        let attempts = attempts.clamp(1, self.max_attempts);
        let penalised = attempts.min(self.penalty_attempt_cap) - 1;
        value
            .base
            .saturating_sub(value.penalty.saturating_mul(penalised))
    }

    /// Score every result for a known climb, best first.
    ///
    /// Ordering is points descending, then attempts and climb number ascending,
    /// so the selection of counted climbs is deterministic.
    #[must_use]
    pub fn scored_climbs(&self, scores: &[Score]) -> Vec<ScoredClimb> {
        let mut scored: Vec<ScoredClimb> = scores
            .iter()
            .filter(|s| self.is_known_climb(s.climb_number))
            .map(|s| ScoredClimb {
                climb_number: s.climb_number,
                attempts: s.attempts,
                topped: s.topped,
                points: self.points_for(s.climb_number, s.attempts, s.topped),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then(a.attempts.cmp(&b.attempts))
                .then(a.climb_number.cmp(&b.climb_number))
        });
        scored
    }

    /// The climbs that count toward the total.
    #[must_use]
    pub fn counted_climbs(&self, scores: &[Score]) -> Vec<ScoredClimb> {
        let mut scored = self.scored_climbs(scores);
        if self.count_best > 0 {
            scored.truncate(self.count_best);
        }
        scored
    }

    /// Aggregate a competitor's results.
    ///
    /// Returns `None` when there is nothing to score, which keeps the
    /// competitor off the leaderboard.
    #[must_use]
    pub fn tally(&self, scores: &[Score]) -> Option<Tally> {
        let counted = self.counted_climbs(scores);
        if counted.is_empty() {
            return None;
        }

        let total_points = counted.iter().map(|c| u64::from(c.points)).sum();
        let tops = counted
            .iter()
            .filter(|c| c.counts_as_top())
            .map(|_| 1u32)
            .sum();
        let attempts_on_tops = counted
            .iter()
            .filter(|c| c.counts_as_top())
            .map(|c| c.attempts)
            .sum();
        let last_update = scores
            .iter()
            .filter(|s| counted.iter().any(|c| c.climb_number == s.climb_number))
            .map(|s| s.updated_at)
            .max();

        Some(Tally {
            total_points,
            tops,
            attempts_on_tops,
            last_update,
        })
    }

    /// Total points, 0 when there is nothing to score.
    #[must_use]
    pub fn total_points(&self, scores: &[Score]) -> u64 {
        self.tally(scores).map_or(0, |t| t.total_points)
    }
}

/// One ranked line of a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    /// Rank; tied rows share a position.
    pub position: u32,
    /// Competitor number.
    pub competitor_number: u32,
    /// Competitor name.
    pub name: String,
    /// Competitor category.
    pub category: Category,
    /// Total points.
    pub total_points: u64,
    /// Counted tops.
    pub tops: u32,
    /// Attempts on counted tops.
    pub attempts_on_tops: u32,
    /// Last result update.
    pub last_update: Option<DateTime<Utc>>,
}

impl LeaderboardRow {
    fn rank_key(&self) -> (u64, u32, u32) {
        (self.total_points, self.tops, self.attempts_on_tops)
    }
}

/// A ranked leaderboard for one category or for everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    /// Heading, e.g. `All` or `Gender Inclusive`.
    pub category: String,
    /// Ranked rows.
    pub rows: Vec<LeaderboardRow>,
}

/// Rank competitors.
///
/// Competitors outside `filter` or without scoreable results are left out.
/// Rows are ordered by points (desc), tops (desc), attempts on tops (asc),
/// then name and number for a stable order among ties.
#[must_use]
pub fn build_leaderboard<S: std::hash::BuildHasher>(
    rules: &ScoringRules,
    competitors: &[Competitor],
    scores: &HashMap<u32, Vec<Score>, S>,
    filter: Option<Category>,
) -> Leaderboard {
    let mut rows: Vec<LeaderboardRow> = competitors
        .iter()
        .filter(|c| filter.map_or(true, |cat| c.category == cat))
        .filter_map(|c| {
            let results = scores.get(&c.number).map_or(&[][..], Vec::as_slice);
            let tally = rules.tally(results)?;
            Some(LeaderboardRow {
                position: 0,
                competitor_number: c.number,
                name: c.name.clone(),
                category: c.category,
                total_points: tally.total_points,
                tops: tally.tops,
                attempts_on_tops: tally.attempts_on_tops,
                last_update: tally.last_update,
            })
        })
        .collect();

    rows.sort_by(compare_rows);

    let mut position = 0;
    let mut previous = None;
    for row in &mut rows {
        let key = row.rank_key();
        if previous != Some(key) {
            position += 1;
        }
        previous = Some(key);
        row.position = position;
    }

    Leaderboard {
        category: filter.map_or("All", Category::label).to_string(),
        rows,
    }
}

fn compare_rows(a: &LeaderboardRow, b: &LeaderboardRow) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then(b.tops.cmp(&a.tops))
        .then(a.attempts_on_tops.cmp(&b.attempts_on_tops))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then(a.competitor_number.cmp(&b.competitor_number))
}
