use serde::{Deserialize, Serialize};

use super::composite::CompositeScore;
use super::round_score;
use super::weights::{TREND_BAND, TREND_WINDOW};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub const fn label(self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

/// Derived view over a doctor's T-MCQ history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorTrendStats {
    pub average_total: i32,
    pub trend: Trend,
    pub count: usize,
    pub most_recent: Option<CompositeScore>,
}

impl DoctorTrendStats {
    pub fn empty() -> Self {
        Self {
            average_total: 0,
            trend: Trend::Stable,
            count: 0,
            most_recent: None,
        }
    }
}

/// Summarize a chronological history (oldest first).
pub fn compute_trend(history: &[CompositeScore]) -> DoctorTrendStats {
    let totals: Vec<i32> = history.iter().map(|score| score.total).collect();
    let Some(most_recent) = history.last() else {
        return DoctorTrendStats::empty();
    };

    let sum: f64 = totals.iter().map(|total| f64::from(*total)).sum();
    let average = sum / totals.len() as f64;

    DoctorTrendStats {
        average_total: round_score(average),
        trend: classify_trend(&totals),
        count: totals.len(),
        most_recent: Some(*most_recent),
    }
}

/// Compare the newest total against the mean of the two before it.
pub fn classify_trend(totals: &[i32]) -> Trend {
    if totals.len() < TREND_WINDOW {
        return Trend::Stable;
    }

    let recent = &totals[totals.len() - TREND_WINDOW..];
    let previous_average = (f64::from(recent[0]) + f64::from(recent[1])) / 2.0;
    let latest = f64::from(recent[2]);

    if latest > previous_average + TREND_BAND {
        Trend::Improving
    } else if latest < previous_average - TREND_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::super::composite::CompetencyTier;
    use super::*;

    fn scores(totals: &[i32]) -> Vec<CompositeScore> {
        totals
            .iter()
            .map(|total| CompositeScore {
                clinical: *total,
                safety: *total,
                prescription: *total,
                documentation: *total,
                communication: *total,
                total: *total,
                status: CompetencyTier::from_total(*total),
            })
            .collect()
    }

    #[test]
    fn empty_history_uses_defaults() {
        let stats = compute_trend(&[]);
        assert_eq!(stats, DoctorTrendStats::empty());
        assert_eq!(stats.average_total, 0);
        assert_eq!(stats.trend, Trend::Stable);
        assert_eq!(stats.count, 0);
        assert!(stats.most_recent.is_none());
    }

    #[test]
    fn two_entries_are_always_stable() {
        assert_eq!(compute_trend(&scores(&[10, 95])).trend, Trend::Stable);
        assert_eq!(compute_trend(&scores(&[95, 10])).trend, Trend::Stable);
    }

    #[test]
    fn rise_beyond_band_is_improving() {
        let stats = compute_trend(&scores(&[70, 70, 82]));
        assert_eq!(stats.trend, Trend::Improving);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.most_recent.map(|score| score.total), Some(82));
    }

    #[test]
    fn small_rise_is_stable() {
        assert_eq!(compute_trend(&scores(&[70, 70, 73])).trend, Trend::Stable);
    }

    #[test]
    fn drop_beyond_band_is_declining() {
        assert_eq!(compute_trend(&scores(&[80, 80, 70])).trend, Trend::Declining);
    }

    #[test]
    fn band_edges_are_exclusive() {
        assert_eq!(classify_trend(&[70, 70, 75]), Trend::Stable);
        assert_eq!(classify_trend(&[70, 70, 76]), Trend::Improving);
        assert_eq!(classify_trend(&[70, 70, 65]), Trend::Stable);
        assert_eq!(classify_trend(&[70, 70, 64]), Trend::Declining);
        // previous average 70.5, edge at 75.5
        assert_eq!(classify_trend(&[70, 71, 75]), Trend::Stable);
        assert_eq!(classify_trend(&[70, 71, 76]), Trend::Improving);
    }

    #[test]
    fn only_the_last_three_entries_drive_the_trend() {
        let stats = compute_trend(&scores(&[20, 95, 70, 70, 82]));
        assert_eq!(stats.trend, Trend::Improving);
        assert_eq!(stats.count, 5);
    }

    #[test]
    fn average_is_rounded_over_the_full_history() {
        // 227 / 3 = 75.67
        assert_eq!(compute_trend(&scores(&[70, 75, 82])).average_total, 76);
        // 141 / 2 = 70.5 rounds away from zero
        assert_eq!(compute_trend(&scores(&[70, 71])).average_total, 71);
    }

    #[test]
    fn extreme_totals_do_not_overflow() {
        assert_eq!(classify_trend(&[i32::MAX, 1, 0]), Trend::Declining);
        assert_eq!(classify_trend(&[i32::MIN, i32::MIN, 0]), Trend::Improving);

        let stats = compute_trend(&scores(&[i32::MAX, i32::MAX, i32::MAX]));
        assert_eq!(stats.trend, Trend::Stable);
        assert_eq!(stats.average_total, i32::MAX);
    }

    #[test]
    fn trend_is_deterministic() {
        let history = scores(&[60, 72, 90, 85]);
        assert_eq!(compute_trend(&history), compute_trend(&history));
    }
}
