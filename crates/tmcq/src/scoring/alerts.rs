use serde::{Deserialize, Serialize};

use super::audit::{compute_audit_global_score, AiAuditOutput, AuditSeverity};
use super::weights::AlertThresholds;

/// Category of a doctor alert. Serialized tags are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowScore,
    RedFlagMissed,
    NonCompliance,
    PrescriptionError,
}

impl AlertType {
    pub const fn label(self) -> &'static str {
        match self {
            AlertType::LowScore => "low_score",
            AlertType::RedFlagMissed => "red_flag_missed",
            AlertType::NonCompliance => "non_compliance",
            AlertType::PrescriptionError => "prescription_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl From<AuditSeverity> for AlertSeverity {
    fn from(value: AuditSeverity) -> Self {
        match value {
            AuditSeverity::Low => AlertSeverity::Low,
            AuditSeverity::Medium => AlertSeverity::Medium,
            AuditSeverity::High => AlertSeverity::High,
        }
    }
}

/// Alert fragment derived from an audit, before the store assigns identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertNotice {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
}

/// True when any of the four alert conditions holds.
pub fn should_alert(audit: &AiAuditOutput) -> bool {
    let thresholds = AlertThresholds::STANDARD;

    compute_audit_global_score(audit) < thresholds.low_score
        || !audit.red_flags_missed.is_empty()
        || !audit.prescription_analysis.who_eml_compliant
        || audit.severity == AuditSeverity::High
}

/// Build the single highest-priority alert for an audit.
///
/// Order: missed red flags, prescription non-compliance, low score, then the
/// generic non-compliance fallback carrying the audit severity.
pub fn build_alert_message(audit: &AiAuditOutput) -> AlertNotice {
    let thresholds = AlertThresholds::STANDARD;

    if !audit.red_flags_missed.is_empty() {
        return AlertNotice {
            alert_type: AlertType::RedFlagMissed,
            severity: AlertSeverity::Critical,
            message: format!(
                "Missed red flags: {}. Immediate supervision required.",
                audit.red_flags_missed.join(", ")
            ),
        };
    }

    if !audit.prescription_analysis.who_eml_compliant {
        return AlertNotice {
            alert_type: AlertType::PrescriptionError,
            severity: AlertSeverity::High,
            message: "Prescription does not comply with the WHO Essential Medicines List 2023. Review required."
                .to_string(),
        };
    }

    let score = compute_audit_global_score(audit);
    if score < thresholds.low_score {
        let severity = if score < thresholds.high_severity {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        return AlertNotice {
            alert_type: AlertType::LowScore,
            severity,
            message: format!(
                "Insufficient T-MCQ audit score ({score}/100). Additional training recommended."
            ),
        };
    }

    AlertNotice {
        alert_type: AlertType::NonCompliance,
        severity: audit.severity.into(),
        message: "Non-compliance with WHO guidelines detected. Consultation review required."
            .to_string(),
    }
}

pub fn evaluate_alert(audit: &AiAuditOutput) -> Option<AlertNotice> {
    should_alert(audit).then(|| build_alert_message(audit))
}

#[cfg(test)]
mod tests {
    use super::super::audit::fixtures::uniform_audit;
    use super::*;

    fn quiet_audit() -> AiAuditOutput {
        uniform_audit(75.0)
    }

    #[test]
    fn quiet_audit_does_not_alert() {
        let audit = quiet_audit();
        assert!(!should_alert(&audit));
        assert_eq!(evaluate_alert(&audit), None);
    }

    #[test]
    fn low_score_alone_triggers() {
        let audit = uniform_audit(69.0);
        assert!(should_alert(&audit));
    }

    #[test]
    fn missed_red_flag_alone_triggers() {
        let mut audit = quiet_audit();
        audit.red_flags_missed = vec!["neck stiffness".to_string()];
        assert!(should_alert(&audit));
    }

    #[test]
    fn non_compliant_prescription_alone_triggers() {
        let mut audit = quiet_audit();
        audit.prescription_analysis.who_eml_compliant = false;
        assert!(should_alert(&audit));
    }

    #[test]
    fn high_severity_alone_triggers() {
        let mut audit = quiet_audit();
        audit.severity = AuditSeverity::High;
        assert!(should_alert(&audit));
    }

    #[test]
    fn medium_severity_does_not_trigger() {
        let mut audit = quiet_audit();
        audit.severity = AuditSeverity::Medium;
        assert!(!should_alert(&audit));
    }

    #[test]
    fn score_of_seventy_does_not_trigger() {
        assert!(!should_alert(&uniform_audit(70.0)));
    }

    #[test]
    fn missed_red_flags_win_over_every_other_condition() {
        let mut audit = uniform_audit(30.0);
        audit.red_flags_missed = vec!["fever".to_string(), "petechiae".to_string()];
        audit.prescription_analysis.who_eml_compliant = false;
        audit.severity = AuditSeverity::High;

        let notice = build_alert_message(&audit);

        assert_eq!(notice.alert_type, AlertType::RedFlagMissed);
        assert_eq!(notice.severity, AlertSeverity::Critical);
        assert!(notice.message.contains("fever, petechiae"));
        assert!(notice.message.ends_with("Immediate supervision required."));
    }

    #[test]
    fn non_compliance_wins_over_low_score() {
        let mut audit = uniform_audit(30.0);
        audit.prescription_analysis.who_eml_compliant = false;
        audit.severity = AuditSeverity::High;

        let notice = build_alert_message(&audit);

        assert_eq!(notice.alert_type, AlertType::PrescriptionError);
        assert_eq!(notice.severity, AlertSeverity::High);
        assert!(notice.message.contains("WHO Essential Medicines List"));
    }

    #[test]
    fn low_score_severity_depends_on_fifty_cut_off() {
        let notice = build_alert_message(&uniform_audit(49.0));
        assert_eq!(notice.alert_type, AlertType::LowScore);
        assert_eq!(notice.severity, AlertSeverity::High);
        assert!(notice.message.contains("(49/100)"));

        let notice = build_alert_message(&uniform_audit(50.0));
        assert_eq!(notice.alert_type, AlertType::LowScore);
        assert_eq!(notice.severity, AlertSeverity::Medium);

        let notice = build_alert_message(&uniform_audit(69.0));
        assert_eq!(notice.severity, AlertSeverity::Medium);
    }

    #[test]
    fn high_severity_alone_falls_through_to_non_compliance() {
        let mut audit = quiet_audit();
        audit.severity = AuditSeverity::High;

        let notice = evaluate_alert(&audit).expect("alert raised");

        assert_eq!(notice.alert_type, AlertType::NonCompliance);
        assert_eq!(notice.severity, AlertSeverity::High);
    }

    #[test]
    fn fallback_passes_audit_severity_through() {
        let mut audit = quiet_audit();
        audit.severity = AuditSeverity::Medium;
        assert_eq!(build_alert_message(&audit).severity, AlertSeverity::Medium);
    }

    #[test]
    fn notice_serializes_wire_tags() {
        let mut audit = quiet_audit();
        audit.red_flags_missed = vec!["syncope".to_string()];
        let value = serde_json::to_value(build_alert_message(&audit)).expect("serializes");

        assert_eq!(value["type"], "red_flag_missed");
        assert_eq!(value["severity"], "critical");
    }
}
