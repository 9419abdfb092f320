//! Outcome classification of a synthesized run.

use serde::{Deserialize, Serialize};

/// Compliance below this is a violation.
pub const COMPLIANCE_VIOLATION_THRESHOLD: f64 = 80.0;

/// Compliance below this rejects the decision.
pub const COMPLIANCE_REJECTION_THRESHOLD: f64 = 65.0;

/// Whether the governed decision went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionOutcome {
    Accepted,
    Rejected,
}

impl DecisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionOutcome::Accepted => "Accepted",
            DecisionOutcome::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compliance violation flag, written as `Y` / `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceViolation {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

impl ComplianceViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceViolation::Yes => "Y",
            ComplianceViolation::No => "N",
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, ComplianceViolation::Yes)
    }
}

impl std::fmt::Display for ComplianceViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub decision_outcome: DecisionOutcome,
    pub compliance_violation: ComplianceViolation,
}

/// Classifies a run from its unrounded compliance and ROI.
///
/// The violation and rejection thresholds are independent; both
/// comparisons are strict.
pub fn classify(compliance: f64, roi: f64) -> Classification {
    let compliance_violation = if compliance < COMPLIANCE_VIOLATION_THRESHOLD {
        ComplianceViolation::Yes
    } else {
        ComplianceViolation::No
    };

    let decision_outcome = if roi < 0.0 || compliance < COMPLIANCE_REJECTION_THRESHOLD {
        DecisionOutcome::Rejected
    } else {
        DecisionOutcome::Accepted
    };

    Classification {
        decision_outcome,
        compliance_violation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_violation_threshold_is_strict() {
        assert_eq!(classify(80.0, 1.0).compliance_violation, ComplianceViolation::No);
        assert_eq!(classify(79.999, 1.0).compliance_violation, ComplianceViolation::Yes);
    }

    #[test]
    fn test_roi_zero_is_accepted() {
        assert_eq!(classify(90.0, 0.0).decision_outcome, DecisionOutcome::Accepted);
        assert_eq!(classify(90.0, -0.0001).decision_outcome, DecisionOutcome::Rejected);
    }

    #[test]
    fn test_low_compliance_rejects() {
        assert_eq!(classify(65.0, 2.0).decision_outcome, DecisionOutcome::Accepted);
        assert_eq!(classify(64.9, 2.0).decision_outcome, DecisionOutcome::Rejected);
    }

    #[test]
    fn test_thresholds_are_independent() {
        // Violation without rejection
        let c = classify(70.0, 1.0);
        assert_eq!(c.compliance_violation, ComplianceViolation::Yes);
        assert_eq!(c.decision_outcome, DecisionOutcome::Accepted);

        // Rejection without violation
        let c = classify(95.0, -0.2);
        assert_eq!(c.compliance_violation, ComplianceViolation::No);
        assert_eq!(c.decision_outcome, DecisionOutcome::Rejected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ComplianceViolation::Yes.to_string(), "Y");
        assert_eq!(DecisionOutcome::Rejected.to_string(), "Rejected");
    }

    proptest! {
        #[test]
        fn prop_classification_consistency(compliance in 60.0f64..=100.0, roi in -0.5f64..=9.0) {
            let c = classify(compliance, roi);
            prop_assert_eq!(c.compliance_violation.is_violation(), compliance < 80.0);
            prop_assert_eq!(
                c.decision_outcome == DecisionOutcome::Rejected,
                roi < 0.0 || compliance < 65.0
            );
        }
    }
}
