use serde::{Deserialize, Serialize};

/// Weight table applied to the five T-MCQ components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub clinical: f64,
    pub safety: f64,
    pub prescription: f64,
    pub documentation: f64,
    pub communication: f64,
}

impl CompositeWeights {
    pub const STANDARD: CompositeWeights = CompositeWeights {
        clinical: 0.40,
        safety: 0.30,
        prescription: 0.15,
        documentation: 0.10,
        communication: 0.05,
    };

    /// Share of the QCM score inside the clinical component; the clinical-case
    /// score takes the remainder.
    pub const QCM_SHARE_OF_CLINICAL: f64 = 0.6;

    pub fn sum(&self) -> f64 {
        self.clinical + self.safety + self.prescription + self.documentation + self.communication
    }
}

/// Weight table applied to the five consultation audit dimensions.
///
/// Kept as its own type so it can never be passed where the composite table
/// is expected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuditWeights {
    pub anamnese: f64,
    pub diagnostic: f64,
    pub prescription: f64,
    pub red_flags: f64,
    pub communication: f64,
}

impl AuditWeights {
    pub const STANDARD: AuditWeights = AuditWeights {
        anamnese: 0.30,
        diagnostic: 0.30,
        prescription: 0.20,
        red_flags: 0.15,
        communication: 0.05,
    };

    pub fn sum(&self) -> f64 {
        self.anamnese + self.diagnostic + self.prescription + self.red_flags + self.communication
    }
}

/// Lower bounds (inclusive) of the two upper tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub apte: i32,
    pub supervision: i32,
}

impl TierThresholds {
    pub const STANDARD: TierThresholds = TierThresholds {
        apte: 85,
        supervision: 70,
    };
}

/// Alerting cut-offs on the audit global score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub low_score: i32,
    pub high_severity: i32,
}

impl AlertThresholds {
    pub const STANDARD: AlertThresholds = AlertThresholds {
        low_score: 70,
        high_severity: 50,
    };
}

/// Dead-zone around the previous average inside which a trend stays stable.
pub const TREND_BAND: f64 = 5.0;

/// Number of most recent evaluations inspected for the trend.
pub const TREND_WINDOW: usize = 3;
