//! Keyword triage
//!
//! Rules are checked in order and the first keyword found wins, so the
//! cardiac rule takes precedence over fever when both appear.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse risk assigned to a narrative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "HIGH")]
    High,
    /// Analysis was not run (patient withheld consent)
    #[serde(rename = "N/A")]
    NotAssessed,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::NotAssessed => "N/A",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "N/A" => Ok(RiskLevel::NotAssessed),
            other => Err(format!("Unknown risk level: {other}")),
        }
    }
}

/// Outcome of one classification. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub risk: RiskLevel,
    pub recommendation: String,
    pub explanation: String,
}

/// Whether the patient agreed to automated analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    Given,
    Withheld,
}

impl From<bool> for Consent {
    fn from(given: bool) -> Self {
        if given {
            Consent::Given
        } else {
            Consent::Withheld
        }
    }
}

struct TriageRule {
    keyword: &'static str,
    risk: RiskLevel,
    recommendation: &'static str,
    explanation: &'static str,
}

impl TriageRule {
    fn to_result(&self) -> TriageResult {
        TriageResult {
            risk: self.risk,
            recommendation: self.recommendation.to_string(),
            explanation: self.explanation.to_string(),
        }
    }
}

// Keywords are lowercase; input is lowercased before matching.
static RULES: &[TriageRule] = &[
    TriageRule {
        keyword: "chest pain",
        risk: RiskLevel::High,
        recommendation: "Consult Cardiologist",
        explanation: "Chest pain detected → cardiac risk rule triggered",
    },
    TriageRule {
        keyword: "fever",
        risk: RiskLevel::Medium,
        recommendation: "General Physician",
        explanation: "Fever indicates possible infection",
    },
];

static FALLBACK: TriageRule = TriageRule {
    keyword: "",
    risk: RiskLevel::Low,
    recommendation: "Self care / GP",
    explanation: "No high-risk symptoms found",
};

static NO_CONSENT: TriageRule = TriageRule {
    keyword: "",
    risk: RiskLevel::NotAssessed,
    recommendation: "AI analysis disabled by patient",
    explanation: "Patient did not provide consent",
};

/// Classify free text against the rule list (case-insensitive)
pub fn classify(text: &str) -> TriageResult {
    let text = text.to_lowercase();
    RULES
        .iter()
        .find(|rule| text.contains(rule.keyword))
        .unwrap_or(&FALLBACK)
        .to_result()
}

/// Classify only when the patient consented; otherwise return the fixed refusal
pub fn assess(narrative: &str, consent: Consent) -> TriageResult {
    match consent {
        Consent::Given => classify(narrative),
        Consent::Withheld => NO_CONSENT.to_result(),
    }
}

/// Wrap the reported text in the fixed summary template
pub fn summarize(text: &str) -> String {
    format!("Patient reported: {text}. AI summary generated for clinical assistance.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chest_pain_beats_fever() {
        let result = classify("Patient has chest pain and fever");
        assert_eq!(result.risk, RiskLevel::High);
        assert_eq!(result.recommendation, "Consult Cardiologist");
        assert_eq!(
            result.explanation,
            "Chest pain detected → cardiac risk rule triggered"
        );
    }

    #[test]
    fn test_fever_is_medium() {
        let result = classify("mild fever only");
        assert_eq!(result.risk, RiskLevel::Medium);
        assert_eq!(result.recommendation, "General Physician");
        assert_eq!(result.explanation, "Fever indicates possible infection");
    }

    #[test]
    fn test_default_is_low() {
        let result = classify("tired");
        assert_eq!(result.risk, RiskLevel::Low);
        assert_eq!(result.recommendation, "Self care / GP");
        assert_eq!(result.explanation, "No high-risk symptoms found");
        assert_eq!(classify("").risk, RiskLevel::Low);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("CHEST PAIN since morning").risk, RiskLevel::High);
        assert_eq!(classify("High Fever").risk, RiskLevel::Medium);
    }

    #[test]
    fn test_deterministic() {
        let text = "Symptom: fever\nLocation: head";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn test_withheld_consent_skips_classifier() {
        let result = assess("Symptom: chest pain", Consent::Withheld);
        assert_eq!(
            result,
            TriageResult {
                risk: RiskLevel::NotAssessed,
                recommendation: "AI analysis disabled by patient".to_string(),
                explanation: "Patient did not provide consent".to_string(),
            }
        );
        assert_eq!(assess("Symptom: chest pain", Consent::Given).risk, RiskLevel::High);
    }

    #[test]
    fn test_risk_serializes_as_label() {
        let json = serde_json::to_value(assess("", Consent::from(false))).unwrap();
        assert_eq!(json["risk"], "N/A");
        assert_eq!(serde_json::to_value(RiskLevel::Medium).unwrap(), "MEDIUM");
    }

    #[test]
    fn test_summary_template() {
        assert_eq!(
            summarize("Symptom: cough"),
            "Patient reported: Symptom: cough. AI summary generated for clinical assistance."
        );
    }
}
