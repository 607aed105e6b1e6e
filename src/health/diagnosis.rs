use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnosis label produced by a rule branch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Diagnosis {
    Healthy,
    Feverish,
    Critical,
    Uncertain,
    General,
}

impl Diagnosis {
    pub fn as_str(self) -> &'static str {
        match self {
            Diagnosis::Healthy => "Healthy",
            Diagnosis::Feverish => "Feverish",
            Diagnosis::Critical => "Critical",
            Diagnosis::Uncertain => "Uncertain",
            Diagnosis::General => "General",
        }
    }

    /// Fixed advice text shown alongside the label
    pub fn advice(self) -> &'static str {
        match self {
            Diagnosis::Healthy => {
                "Keep up the good lifestyle! Regular check-ups and a balanced diet are recommended."
            }
            Diagnosis::Feverish => {
                "Rest, stay hydrated, and monitor symptoms. Consult a doctor if symptoms persist."
            }
            Diagnosis::Critical => {
                "Seek medical attention immediately for evaluation and possible treatment."
            }
            Diagnosis::Uncertain | Diagnosis::General => {
                "Consult a healthcare professional for further evaluation."
            }
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity attached to a diagnosis.
///
/// Named branches use fixed integer levels; the general branch reports a raw
/// membership degree. The two serialize as a JSON integer and float.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DiagnosisLevel {
    Fixed(u8),
    Degree(f64),
}

impl DiagnosisLevel {
    pub fn as_f64(self) -> f64 {
        match self {
            DiagnosisLevel::Fixed(level) => f64::from(level),
            DiagnosisLevel::Degree(degree) => degree,
        }
    }
}

impl fmt::Display for DiagnosisLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosisLevel::Fixed(level) => write!(f, "{level}"),
            DiagnosisLevel::Degree(degree) => write!(f, "{degree}"),
        }
    }
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosisResult {
    pub diagnosis: Diagnosis,
    pub level: DiagnosisLevel,
}

impl DiagnosisResult {
    pub fn new(diagnosis: Diagnosis, level: DiagnosisLevel) -> Self {
        Self { diagnosis, level }
    }

    pub fn advice(&self) -> &'static str {
        self.diagnosis.advice()
    }
}

/// Response body returned to callers of the diagnosis endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisResponse {
    pub diagnosis: Diagnosis,
    pub advice: String,
    pub diagnosis_level: DiagnosisLevel,
}

impl From<DiagnosisResult> for DiagnosisResponse {
    fn from(result: DiagnosisResult) -> Self {
        Self {
            diagnosis: result.diagnosis,
            advice: result.advice().to_string(),
            diagnosis_level: result.level,
        }
    }
}
