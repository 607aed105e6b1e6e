//! Identity-keyed rule branches.
//!
//! Each branch is an ordered list of entries; the first entry whose signals
//! are all non-zero decides the diagnosis. Degrees only act as truth values
//! here, their magnitude is discarded (except by the general branch, which
//! reports the largest of its degrees as the level).

use super::diagnosis::{Diagnosis, DiagnosisLevel, DiagnosisResult};
use super::membership::{MembershipModel, Term, Variable};
use super::reading::VitalReading;

/// The membership degrees every evaluation computes up front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    TemperatureNormal,
    TemperatureFever,
    HeartRateNormal,
    HeartRateTachycardia,
    HeartRateElevated,
    BloodPressureNormal,
    BloodPressureHypertension,
}

impl Signal {
    pub fn source(self) -> (Variable, Term) {
        match self {
            Signal::TemperatureNormal => (Variable::Temperature, Term::Normal),
            Signal::TemperatureFever => (Variable::Temperature, Term::Fever),
            Signal::HeartRateNormal => (Variable::HeartRate, Term::Normal),
            Signal::HeartRateTachycardia => (Variable::HeartRate, Term::Tachycardia),
            Signal::HeartRateElevated => (Variable::HeartRate, Term::Elevated),
            Signal::BloodPressureNormal => (Variable::BloodPressure, Term::Normal),
            Signal::BloodPressureHypertension => (Variable::BloodPressure, Term::Hypertension),
        }
    }

    /// The reading this signal is measured on
    pub fn value_of(self, reading: &VitalReading) -> f64 {
        match self {
            Signal::TemperatureNormal | Signal::TemperatureFever => reading.temperature,
            Signal::HeartRateNormal | Signal::HeartRateTachycardia | Signal::HeartRateElevated => {
                f64::from(reading.heart_rate)
            }
            Signal::BloodPressureNormal | Signal::BloodPressureHypertension => {
                f64::from(reading.blood_pressure)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MembershipDegrees {
    pub temperature_normal: f64,
    pub temperature_fever: f64,
    pub heart_rate_normal: f64,
    pub heart_rate_tachycardia: f64,
    pub heart_rate_elevated: f64,
    pub blood_pressure_normal: f64,
    pub blood_pressure_hypertension: f64,
}

impl MembershipDegrees {
    pub fn compute(model: &MembershipModel, reading: &VitalReading) -> Self {
        let at = |signal: Signal| {
            let (variable, term) = signal.source();
            model.membership_at(variable, term, signal.value_of(reading))
        };

        Self {
            temperature_normal: at(Signal::TemperatureNormal),
            temperature_fever: at(Signal::TemperatureFever),
            heart_rate_normal: at(Signal::HeartRateNormal),
            heart_rate_tachycardia: at(Signal::HeartRateTachycardia),
            heart_rate_elevated: at(Signal::HeartRateElevated),
            blood_pressure_normal: at(Signal::BloodPressureNormal),
            blood_pressure_hypertension: at(Signal::BloodPressureHypertension),
        }
    }

    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::TemperatureNormal => self.temperature_normal,
            Signal::TemperatureFever => self.temperature_fever,
            Signal::HeartRateNormal => self.heart_rate_normal,
            Signal::HeartRateTachycardia => self.heart_rate_tachycardia,
            Signal::HeartRateElevated => self.heart_rate_elevated,
            Signal::BloodPressureNormal => self.blood_pressure_normal,
            Signal::BloodPressureHypertension => self.blood_pressure_hypertension,
        }
    }

    /// True when `signal` has any membership at all
    pub fn holds(&self, signal: Signal) -> bool {
        self.get(signal) > 0.0
    }
}

/// One `when all signals hold => diagnosis/level` line
#[derive(Debug)]
pub struct RuleEntry {
    pub when: &'static [Signal],
    pub diagnosis: Diagnosis,
    pub level: u8,
}

impl RuleEntry {
    pub fn matches(&self, degrees: &MembershipDegrees) -> bool {
        self.when.iter().all(|&signal| degrees.holds(signal))
    }
}

/// What a branch answers when no entry matched
#[derive(Debug)]
pub enum Fallback {
    Fixed { diagnosis: Diagnosis, level: u8 },
    /// Level is the largest of the listed degrees
    MaxDegree {
        diagnosis: Diagnosis,
        of: &'static [Signal],
    },
}

impl Fallback {
    fn resolve(&self, degrees: &MembershipDegrees) -> DiagnosisResult {
        match self {
            Fallback::Fixed { diagnosis, level } => {
                DiagnosisResult::new(*diagnosis, DiagnosisLevel::Fixed(*level))
            }
            Fallback::MaxDegree { diagnosis, of } => {
                let max = of
                    .iter()
                    .map(|&signal| degrees.get(signal))
                    .fold(0.0, f64::max);
                DiagnosisResult::new(*diagnosis, DiagnosisLevel::Degree(max))
            }
        }
    }
}

#[derive(Debug)]
pub struct RuleBranch {
    pub name: &'static str,
    pub entries: &'static [RuleEntry],
    pub fallback: Fallback,
}

impl RuleBranch {
    pub fn evaluate(&self, degrees: &MembershipDegrees) -> DiagnosisResult {
        self.entries
            .iter()
            .find(|entry| entry.matches(degrees))
            .map(|entry| {
                DiagnosisResult::new(entry.diagnosis, DiagnosisLevel::Fixed(entry.level))
            })
            .unwrap_or_else(|| self.fallback.resolve(degrees))
    }
}

static TEMPERATURE_FIRST: RuleBranch = RuleBranch {
    name: "temperature-first",
    entries: &[
        RuleEntry {
            when: &[Signal::TemperatureNormal, Signal::HeartRateNormal],
            diagnosis: Diagnosis::Healthy,
            level: 20,
        },
        RuleEntry {
            when: &[Signal::TemperatureFever],
            diagnosis: Diagnosis::Feverish,
            level: 50,
        },
        RuleEntry {
            when: &[Signal::HeartRateTachycardia],
            diagnosis: Diagnosis::Critical,
            level: 90,
        },
    ],
    fallback: Fallback::Fixed {
        diagnosis: Diagnosis::Uncertain,
        level: 0,
    },
};

static PRESSURE_FIRST: RuleBranch = RuleBranch {
    name: "pressure-first",
    entries: &[
        RuleEntry {
            when: &[Signal::TemperatureNormal],
            diagnosis: Diagnosis::Healthy,
            level: 20,
        },
        RuleEntry {
            when: &[Signal::BloodPressureHypertension],
            diagnosis: Diagnosis::Critical,
            level: 90,
        },
        RuleEntry {
            when: &[Signal::HeartRateElevated],
            diagnosis: Diagnosis::Feverish,
            level: 50,
        },
    ],
    fallback: Fallback::Fixed {
        diagnosis: Diagnosis::Uncertain,
        level: 0,
    },
};

static GENERAL: RuleBranch = RuleBranch {
    name: "general",
    entries: &[],
    fallback: Fallback::MaxDegree {
        diagnosis: Diagnosis::General,
        of: &[
            Signal::TemperatureNormal,
            Signal::HeartRateNormal,
            Signal::BloodPressureNormal,
        ],
    },
};

/// Known identities plus the general fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Srini,
    Gokul,
    Hemavershini,
    General,
}

impl Branch {
    /// Exact, case-sensitive match; anything else is `General`
    pub fn for_identity(identity: &str) -> Self {
        match identity {
            "Srini" => Branch::Srini,
            "Gokul" => Branch::Gokul,
            "Hemavershini" => Branch::Hemavershini,
            _ => Branch::General,
        }
    }

    pub fn rules(self) -> &'static RuleBranch {
        match self {
            Branch::Srini | Branch::Hemavershini => &TEMPERATURE_FIRST,
            Branch::Gokul => &PRESSURE_FIRST,
            Branch::General => &GENERAL,
        }
    }
}

/// Maps a reading and identity to a diagnosis
#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluator<'m> {
    model: &'m MembershipModel,
}

impl RuleEvaluator<'static> {
    /// Evaluator over the process-wide membership model
    pub fn shared() -> Self {
        Self::new(MembershipModel::shared())
    }
}

impl<'m> RuleEvaluator<'m> {
    pub fn new(model: &'m MembershipModel) -> Self {
        Self { model }
    }

    pub fn evaluate(&self, reading: &VitalReading, identity: &str) -> DiagnosisResult {
        let degrees = MembershipDegrees::compute(self.model, reading);
        let branch = Branch::for_identity(identity);
        let rules = branch.rules();
        let result = rules.evaluate(&degrees);

        tracing::debug!(
            branch = rules.name,
            ?degrees,
            diagnosis = %result.diagnosis,
            level = %result.level,
            "reading evaluated"
        );

        result
    }
}
