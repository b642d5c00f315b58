use serde::{Deserialize, Serialize};

use super::round_score;
use super::weights::{CompositeWeights, TierThresholds};

/// Supervision tier derived from a T-MCQ total.
///
/// The serialized tags are matched verbatim by downstream stores and
/// dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetencyTier {
    Apte,
    Supervision,
    FormationRequise,
}

impl CompetencyTier {
    pub fn from_total(total: i32) -> Self {
        Self::classify(total, &TierThresholds::STANDARD)
    }

    pub fn classify(total: i32, thresholds: &TierThresholds) -> Self {
        if total >= thresholds.apte {
            CompetencyTier::Apte
        } else if total >= thresholds.supervision {
            CompetencyTier::Supervision
        } else {
            CompetencyTier::FormationRequise
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CompetencyTier::Apte => "apte",
            CompetencyTier::Supervision => "supervision",
            CompetencyTier::FormationRequise => "formation_requise",
        }
    }
}

/// Raw, unrounded component scores feeding a composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubScoreSet {
    pub clinical: f64,
    pub safety: f64,
    pub prescription: f64,
    pub documentation: f64,
    pub communication: f64,
}

impl SubScoreSet {
    /// Blend theory and case work into the clinical component and let a single
    /// audit scalar stand in for the four audit-related components.
    pub fn from_collapsed_audit(qcm_score: f64, clinical_case_score: f64, audit_score: f64) -> Self {
        let qcm_share = CompositeWeights::QCM_SHARE_OF_CLINICAL;
        let clinical = qcm_score * qcm_share + clinical_case_score * (1.0 - qcm_share);

        Self {
            clinical,
            safety: audit_score,
            prescription: audit_score,
            documentation: audit_score,
            communication: audit_score,
        }
    }

    pub fn weighted_sum(&self, weights: &CompositeWeights) -> f64 {
        self.clinical * weights.clinical
            + self.safety * weights.safety
            + self.prescription * weights.prescription
            + self.documentation * weights.documentation
            + self.communication * weights.communication
    }
}

/// T-MCQ result. Components are rounded independently of `total`, so they
/// may not re-sum to it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub clinical: i32,
    pub safety: i32,
    pub prescription: i32,
    pub documentation: i32,
    pub communication: i32,
    pub total: i32,
    pub status: CompetencyTier,
}

/// Compute the T-MCQ from the QCM score, the clinical-case score, and a single
/// audit-derived scalar. Inputs are expected in `[0, 100]` and are not clamped.
pub fn compute_composite(
    qcm_score: f64,
    clinical_case_score: f64,
    audit_score: f64,
) -> CompositeScore {
    let sub_scores = SubScoreSet::from_collapsed_audit(qcm_score, clinical_case_score, audit_score);
    compute_composite_from_sub_scores(&sub_scores)
}

pub fn compute_composite_from_sub_scores(sub_scores: &SubScoreSet) -> CompositeScore {
    compute_weighted(
        sub_scores,
        &CompositeWeights::STANDARD,
        &TierThresholds::STANDARD,
    )
}

pub(crate) fn compute_weighted(
    sub_scores: &SubScoreSet,
    weights: &CompositeWeights,
    thresholds: &TierThresholds,
) -> CompositeScore {
    let total = round_score(sub_scores.weighted_sum(weights));

    CompositeScore {
        clinical: round_score(sub_scores.clinical),
        safety: round_score(sub_scores.safety),
        prescription: round_score(sub_scores.prescription),
        documentation: round_score(sub_scores.documentation),
        communication: round_score(sub_scores.communication),
        total,
        status: CompetencyTier::classify(total, thresholds),
    }
}
