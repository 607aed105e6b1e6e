//! Vital-sign diagnosis core
//!
//! Fuzzy membership over six vital signs plus identity-keyed rule branches.

pub mod diagnosis;
pub mod membership;
pub mod reading;
pub mod rules;

pub use diagnosis::{Diagnosis, DiagnosisLevel, DiagnosisResponse, DiagnosisResult};
pub use membership::{LinguisticTerm, MembershipModel, Term, Trapezoid, Variable};
pub use reading::{HealthData, ValidationError, VitalField, VitalReading};
pub use rules::{Branch, MembershipDegrees, RuleBranch, RuleEvaluator, Signal};

/// Errors from naming variables or terms by string
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HealthError {
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("unknown term: {0}")]
    UnknownTerm(String),

    #[error("term '{term}' is not defined over '{variable}'")]
    TermNotDefined { variable: Variable, term: Term },
}

/// Validate a request, evaluate it with the shared model and attach advice
pub fn diagnose(data: &HealthData) -> Result<DiagnosisResponse, ValidationError> {
    let reading = data.validate()?;
    let result = RuleEvaluator::shared().evaluate(&reading, &data.name);
    Ok(DiagnosisResponse::from(result))
}
