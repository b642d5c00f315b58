use serde::{Deserialize, Serialize};

use super::weights::AuditWeights;
use super::{round_score, validate_score, ScoringError};

/// Severity the audit service assigns to a reviewed consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Low,
    Medium,
    High,
}

impl AuditSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            AuditSeverity::Low => "low",
            AuditSeverity::Medium => "medium",
            AuditSeverity::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnamneseDetails {
    pub completeness: f64,
    pub pertinence: f64,
    pub red_flags_asked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionAnalysis {
    pub who_eml_compliant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraindications_checked: Option<bool>,
}

/// Structured review of one consultation as returned by the audit service.
///
/// Stored verbatim next to the scores derived from it. `global_tmcq_score` is
/// the reviewer's own estimate and is kept for reference only; decisions
/// always use [`compute_audit_global_score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAuditOutput {
    pub anamnese_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anamnese_details: Option<AnamneseDetails>,
    pub diagnostic_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_rationale: Option<String>,
    pub prescription_score: f64,
    pub prescription_analysis: PrescriptionAnalysis,
    pub red_flags_score: f64,
    #[serde(default)]
    pub red_flags_detected: Vec<String>,
    #[serde(default)]
    pub red_flags_missed: Vec<String>,
    pub communication_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_tmcq_score: Option<f64>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub requires_supervision: bool,
    pub severity: AuditSeverity,
}

impl AiAuditOutput {
    /// Reject documents whose dimension scores fall outside `[0, 100]`.
    pub fn validate(&self) -> Result<(), ScoringError> {
        validate_score("anamnese_score", self.anamnese_score)?;
        validate_score("diagnostic_score", self.diagnostic_score)?;
        validate_score("prescription_score", self.prescription_score)?;
        validate_score("red_flags_score", self.red_flags_score)?;
        validate_score("communication_score", self.communication_score)?;
        Ok(())
    }

    pub fn weighted_sum(&self, weights: &AuditWeights) -> f64 {
        self.anamnese_score * weights.anamnese
            + self.diagnostic_score * weights.diagnostic
            + self.prescription_score * weights.prescription
            + self.red_flags_score * weights.red_flags
            + self.communication_score * weights.communication
    }
}

/// Global audit score, the scalar most callers feed into
/// [`compute_composite`](super::compute_composite) as the audit input.
pub fn compute_audit_global_score(audit: &AiAuditOutput) -> i32 {
    round_score(audit.weighted_sum(&AuditWeights::STANDARD))
}


#[cfg(test)]
mod tests {
    use super::fixtures::uniform_audit;
    use super::*;
    use serde_json::json;

    #[test]
    fn uniform_dimensions_reproduce_the_input() {
        assert_eq!(compute_audit_global_score(&uniform_audit(80.0)), 80);
        assert_eq!(compute_audit_global_score(&uniform_audit(0.0)), 0);
        assert_eq!(compute_audit_global_score(&uniform_audit(100.0)), 100);
    }

    #[test]
    fn dimensions_use_the_audit_weight_table() {
        let mut audit = uniform_audit(0.0);
        audit.anamnese_score = 100.0;
        assert_eq!(compute_audit_global_score(&audit), 30);

        let mut audit = uniform_audit(0.0);
        audit.prescription_score = 100.0;
        assert_eq!(compute_audit_global_score(&audit), 20);

        let mut audit = uniform_audit(0.0);
        audit.red_flags_score = 100.0;
        assert_eq!(compute_audit_global_score(&audit), 15);

        let mut audit = uniform_audit(0.0);
        audit.communication_score = 100.0;
        assert_eq!(compute_audit_global_score(&audit), 5);
    }

    #[test]
    fn reviewer_estimate_does_not_affect_global_score() {
        let mut audit = uniform_audit(80.0);
        audit.global_tmcq_score = Some(12.0);
        assert_eq!(compute_audit_global_score(&audit), 80);
    }

    #[test]
    fn validate_rejects_out_of_range_dimensions() {
        let mut audit = uniform_audit(80.0);
        audit.diagnostic_score = 101.0;

        match audit.validate() {
            Err(ScoringError::InvalidScore { field, .. }) => {
                assert_eq!(field, "diagnostic_score")
            }
            other => panic!("expected invalid score, got {other:?}"),
        }
    }

    #[test]
    fn deserializes_minimal_documents() {
        let payload = json!({
            "anamnese_score": 70,
            "diagnostic_score": 65,
            "prescription_score": 90,
            "prescription_analysis": { "who_eml_compliant": false },
            "red_flags_score": 40,
            "red_flags_missed": ["chest pain radiating to the arm"],
            "communication_score": 85,
            "severity": "high"
        });

        let audit: AiAuditOutput = serde_json::from_value(payload).expect("valid audit");

        assert!(!audit.prescription_analysis.who_eml_compliant);
        assert_eq!(audit.severity, AuditSeverity::High);
        assert!(audit.red_flags_detected.is_empty());
        assert_eq!(audit.red_flags_missed.len(), 1);
    }
}
