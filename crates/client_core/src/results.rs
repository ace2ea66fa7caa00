//! Results board: a finished tally projected into ranked rows.

use chrono::{DateTime, Utc};
use shared::{
    domain::CandidateId,
    protocol::{ElectionStatistics, Tally},
};

const PODIUM_PLACES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct TallyRow {
    pub rank: usize,
    pub name: CandidateId,
    pub votes: u64,
    pub percentage: f64,
    pub podium: Option<usize>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsBoard {
    pub rows: Vec<TallyRow>,
    pub total_votes: u64,
    pub statistics: Option<ElectionStatistics>,
    pub updated_at: DateTime<Utc>,
}

impl ResultsBoard {
    /// Rows keep the service's order; rank is the row's position.
    pub fn build(tally: Tally, updated_at: DateTime<Utc>) -> Self {
        let colors = bar_colors(tally.results.len());
        let rows = tally
            .results
            .into_iter()
            .zip(colors)
            .enumerate()
            .map(|(index, (entry, color))| {
                let rank = index + 1;
                TallyRow {
                    rank,
                    percentage: vote_share(entry.votes, tally.total_votes),
                    name: entry.name,
                    votes: entry.votes,
                    podium: (rank <= PODIUM_PLACES).then_some(rank),
                    color,
                }
            })
            .collect();

        Self {
            rows,
            total_votes: tally.total_votes,
            statistics: tally.statistics,
            updated_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Percentage of `total`, rounded to one decimal; zero when nobody voted.
pub fn vote_share(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 / total as f64 * 1000.0).round() / 10.0
}

/// Evenly spaced hues around the colour wheel, one per bar.
pub fn bar_colors(count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }
    let hue_step = 360.0 / count as f64;
    (0..count)
        .map(|i| format!("hsla({}, 70%, 60%, 0.8)", i as f64 * hue_step))
        .collect()
}

#[cfg(test)]
#[path = "tests/results_tests.rs"]
mod tests;
