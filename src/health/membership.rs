//! Fuzzy membership model over the six vital signs and the output severity axis.
//!
//! Every variable carries exactly three linguistic terms, each a trapezoid
//! (triangles are trapezoids with a single-point plateau). The model is built
//! once and shared read-only.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::HealthError;

/// A measured (or output) variable with its own sample grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    Temperature,
    HeartRate,
    BloodPressure,
    RespiratoryRate,
    OxygenSaturation,
    BloodSugar,
    /// Output diagnosis severity, 0..=100. Not consulted by the current rules.
    Severity,
}

impl Variable {
    pub const ALL: [Variable; 7] = [
        Variable::Temperature,
        Variable::HeartRate,
        Variable::BloodPressure,
        Variable::RespiratoryRate,
        Variable::OxygenSaturation,
        Variable::BloodSugar,
        Variable::Severity,
    ];

    /// `(start, stop, step)` of the sample grid, stop exclusive
    pub fn grid_spec(self) -> (f64, f64, f64) {
        match self {
            Variable::Temperature => (35.0, 42.1, 0.1),
            Variable::HeartRate => (40.0, 181.0, 1.0),
            Variable::BloodPressure => (90.0, 181.0, 1.0),
            Variable::RespiratoryRate => (12.0, 40.0, 1.0),
            Variable::OxygenSaturation => (85.0, 101.0, 1.0),
            Variable::BloodSugar => (70.0, 300.0, 1.0),
            Variable::Severity => (0.0, 101.0, 1.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Variable::Temperature => "temperature",
            Variable::HeartRate => "heart_rate",
            Variable::BloodPressure => "blood_pressure",
            Variable::RespiratoryRate => "respiratory_rate",
            Variable::OxygenSaturation => "oxygen_saturation",
            Variable::BloodSugar => "blood_sugar",
            Variable::Severity => "severity",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variable {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variable::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| HealthError::UnknownVariable(s.to_string()))
    }
}

/// Linguistic term name. Which terms exist depends on the variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    Normal,
    Fever,
    HighFever,
    Elevated,
    Tachycardia,
    Hypertension,
    High,
    Low,
    Critical,
    Healthy,
    Feverish,
}

impl Term {
    pub const ALL: [Term; 11] = [
        Term::Normal,
        Term::Fever,
        Term::HighFever,
        Term::Elevated,
        Term::Tachycardia,
        Term::Hypertension,
        Term::High,
        Term::Low,
        Term::Critical,
        Term::Healthy,
        Term::Feverish,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Term::Normal => "normal",
            Term::Fever => "fever",
            Term::HighFever => "high_fever",
            Term::Elevated => "elevated",
            Term::Tachycardia => "tachycardia",
            Term::Hypertension => "hypertension",
            Term::High => "high",
            Term::Low => "low",
            Term::Critical => "critical",
            Term::Healthy => "healthy",
            Term::Feverish => "feverish",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Term {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Term::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HealthError::UnknownTerm(s.to_string()))
    }
}

/// Piecewise-linear shape: rise a..b, plateau b..c, fall c..d
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trapezoid {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Trapezoid {
    pub const fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    /// Triangle with peak at `b`
    pub const fn triangle(a: f64, b: f64, c: f64) -> Self {
        Self::new(a, b, b, c)
    }

    /// Membership degree of `x`.
    ///
    /// The plateau is tested before the outer bounds so that a collapsed
    /// shoulder (`a == b` or `c == d`) still reaches 1 at the breakpoint.
    pub fn degree(&self, x: f64) -> f64 {
        let Trapezoid { a, b, c, d } = *self;
        if x >= b && x <= c {
            1.0
        } else if x <= a || x >= d {
            0.0
        } else if x < b {
            (x - a) / (b - a)
        } else {
            (d - x) / (d - c)
        }
    }
}

/// Named fuzzy set over one variable, with its sampled curve
#[derive(Debug, Clone, Serialize)]
pub struct LinguisticTerm {
    pub variable: Variable,
    pub term: Term,
    pub shape: Trapezoid,
    grid: Vec<f64>,
    degrees: Vec<f64>,
}

impl LinguisticTerm {
    pub fn new(variable: Variable, term: Term, shape: Trapezoid) -> Self {
        let grid = sample_grid(variable.grid_spec());
        let degrees = grid.iter().map(|&x| shape.degree(x)).collect();
        Self {
            variable,
            term,
            shape,
            grid,
            degrees,
        }
    }

    /// Closed-form degree at `value`; no clamping to the grid
    pub fn degree_at(&self, value: f64) -> f64 {
        self.shape.degree(value)
    }

    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    pub fn degrees(&self) -> &[f64] {
        &self.degrees
    }
}

/// Evenly spaced points `start + i * step` below `stop`, count rounded up.
/// Points are rounded to 1e-9 so a 0.1 step lands on its decimal values.
fn sample_grid((start, stop, step): (f64, f64, f64)) -> Vec<f64> {
    let count = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..count)
        .map(|i| ((start + i as f64 * step) * 1e9).round() / 1e9)
        .collect()
}

/// Breakpoint table. Order inside a variable is the canonical term order.
const TERM_TABLE: [(Variable, Term, Trapezoid); 21] = [
    (Variable::Temperature, Term::Normal, Trapezoid::new(35.0, 35.0, 36.5, 37.5)),
    (Variable::Temperature, Term::Fever, Trapezoid::new(36.5, 37.5, 39.0, 40.0)),
    (Variable::Temperature, Term::HighFever, Trapezoid::new(39.0, 40.0, 42.0, 42.0)),
    (Variable::HeartRate, Term::Normal, Trapezoid::new(40.0, 40.0, 60.0, 80.0)),
    (Variable::HeartRate, Term::Elevated, Trapezoid::new(70.0, 100.0, 120.0, 150.0)),
    (Variable::HeartRate, Term::Tachycardia, Trapezoid::new(120.0, 140.0, 180.0, 180.0)),
    (Variable::BloodPressure, Term::Normal, Trapezoid::new(90.0, 90.0, 110.0, 120.0)),
    (Variable::BloodPressure, Term::Elevated, Trapezoid::new(110.0, 130.0, 140.0, 150.0)),
    (Variable::BloodPressure, Term::Hypertension, Trapezoid::new(140.0, 160.0, 180.0, 180.0)),
    (Variable::RespiratoryRate, Term::Normal, Trapezoid::new(12.0, 12.0, 16.0, 20.0)),
    (Variable::RespiratoryRate, Term::Elevated, Trapezoid::new(18.0, 22.0, 28.0, 35.0)),
    (Variable::RespiratoryRate, Term::High, Trapezoid::new(30.0, 35.0, 40.0, 40.0)),
    (Variable::OxygenSaturation, Term::Normal, Trapezoid::new(95.0, 95.0, 97.0, 100.0)),
    (Variable::OxygenSaturation, Term::Low, Trapezoid::new(85.0, 88.0, 90.0, 94.0)),
    (Variable::OxygenSaturation, Term::Critical, Trapezoid::new(85.0, 85.0, 90.0, 92.0)),
    (Variable::BloodSugar, Term::Normal, Trapezoid::new(70.0, 70.0, 90.0, 110.0)),
    (Variable::BloodSugar, Term::Elevated, Trapezoid::new(100.0, 130.0, 150.0, 180.0)),
    (Variable::BloodSugar, Term::High, Trapezoid::new(170.0, 200.0, 300.0, 300.0)),
    (Variable::Severity, Term::Healthy, Trapezoid::triangle(0.0, 0.0, 30.0)),
    (Variable::Severity, Term::Feverish, Trapezoid::triangle(20.0, 50.0, 80.0)),
    (Variable::Severity, Term::Critical, Trapezoid::triangle(70.0, 100.0, 100.0)),
];

static SHARED: Lazy<MembershipModel> = Lazy::new(MembershipModel::standard);

/// All linguistic terms, immutable once built
#[derive(Debug, Clone)]
pub struct MembershipModel {
    terms: Vec<LinguisticTerm>,
}

impl MembershipModel {
    /// Build the model from the fixed breakpoint table
    pub fn standard() -> Self {
        let terms = TERM_TABLE
            .iter()
            .map(|&(variable, term, shape)| LinguisticTerm::new(variable, term, shape))
            .collect::<Vec<_>>();
        tracing::debug!("membership model built with {} terms", terms.len());
        Self { terms }
    }

    /// Process-wide instance
    pub fn shared() -> &'static MembershipModel {
        &SHARED
    }

    pub fn term(&self, variable: Variable, term: Term) -> Option<&LinguisticTerm> {
        self.terms
            .iter()
            .find(|t| t.variable == variable && t.term == term)
    }

    /// Terms defined over `variable`, in table order
    pub fn terms_of(&self, variable: Variable) -> impl Iterator<Item = &LinguisticTerm> {
        self.terms.iter().filter(move |t| t.variable == variable)
    }

    /// Degree of `value` in `variable`/`term`.
    ///
    /// A term that is not defined over the variable is the empty set.
    pub fn membership_at(&self, variable: Variable, term: Term, value: f64) -> f64 {
        match self.term(variable, term) {
            Some(t) => t.degree_at(value),
            None => {
                tracing::warn!("term '{}' is not defined over '{}'", term, variable);
                0.0
            }
        }
    }

    /// Degree of `value` in each term of `variable`
    pub fn profile(&self, variable: Variable, value: f64) -> Vec<(Term, f64)> {
        self.terms_of(variable)
            .map(|t| (t.term, t.degree_at(value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_every_variable_has_three_terms() {
        let model = MembershipModel::standard();
        for variable in Variable::ALL {
            assert_eq!(model.terms_of(variable).count(), 3, "{variable}");
        }
    }

    #[test]
    fn test_sampled_grid_invariants() {
        let model = MembershipModel::standard();
        for variable in Variable::ALL {
            for term in model.terms_of(variable) {
                assert_eq!(term.grid().len(), term.degrees().len());
                assert!(term.grid().windows(2).all(|w| w[0] < w[1]));
                assert!(term.degrees().iter().all(|d| (0.0..=1.0).contains(d)));
            }
        }
    }

    #[test]
    fn test_grid_lengths_follow_arange() {
        let model = MembershipModel::standard();
        let len = |v| model.terms_of(v).next().unwrap().grid().len();
        assert_eq!(len(Variable::Temperature), 72);
        assert_eq!(len(Variable::HeartRate), 141);
        assert_eq!(len(Variable::BloodPressure), 91);
        assert_eq!(len(Variable::RespiratoryRate), 28);
        assert_eq!(len(Variable::OxygenSaturation), 16);
        assert_eq!(len(Variable::BloodSugar), 230);
        assert_eq!(len(Variable::Severity), 101);

        let temp = model.term(Variable::Temperature, Term::Normal).unwrap();
        assert_eq!(temp.grid()[15], 36.5);
        assert_eq!(*temp.grid().last().unwrap(), 42.1);
    }

    #[test]
    fn test_collapsed_shoulders_reach_one() {
        let model = MembershipModel::standard();
        assert_eq!(model.membership_at(Variable::Temperature, Term::Normal, 35.0), 1.0);
        assert_eq!(model.membership_at(Variable::Temperature, Term::HighFever, 42.0), 1.0);
        assert_eq!(model.membership_at(Variable::HeartRate, Term::Tachycardia, 180.0), 1.0);
        assert_eq!(model.membership_at(Variable::Severity, Term::Healthy, 0.0), 1.0);
        assert_eq!(model.membership_at(Variable::Severity, Term::Critical, 100.0), 1.0);
    }

    #[test]
    fn test_breakpoints() {
        let model = MembershipModel::standard();
        assert_eq!(model.membership_at(Variable::Temperature, Term::Normal, 37.5), 0.0);
        assert_eq!(model.membership_at(Variable::Temperature, Term::Fever, 37.5), 1.0);
        assert_eq!(model.membership_at(Variable::Temperature, Term::Fever, 36.5), 0.0);
        assert_eq!(model.membership_at(Variable::Temperature, Term::Normal, 36.5), 1.0);
        assert_eq!(model.membership_at(Variable::BloodPressure, Term::Normal, 120.0), 0.0);
        assert_eq!(model.membership_at(Variable::BloodPressure, Term::Hypertension, 140.0), 0.0);
        assert_eq!(model.membership_at(Variable::OxygenSaturation, Term::Normal, 100.0), 0.0);
        assert_eq!(model.membership_at(Variable::BloodSugar, Term::High, 300.0), 1.0);
        assert_eq!(model.membership_at(Variable::RespiratoryRate, Term::Normal, 20.0), 0.0);
        assert_eq!(model.membership_at(Variable::RespiratoryRate, Term::Elevated, 18.0), 0.0);
        assert_eq!(model.membership_at(Variable::RespiratoryRate, Term::Elevated, 22.0), 1.0);
        assert_eq!(model.membership_at(Variable::RespiratoryRate, Term::Elevated, 35.0), 0.0);
        assert_eq!(model.membership_at(Variable::RespiratoryRate, Term::High, 30.0), 0.0);
        assert_eq!(model.membership_at(Variable::RespiratoryRate, Term::High, 40.0), 1.0);
    }

    #[test]
    fn test_every_term_at_its_breakpoints() {
        let model = MembershipModel::standard();
        for (variable, term, shape) in TERM_TABLE {
            let at = |x| model.membership_at(variable, term, x);
            let case = format!("{variable}/{term}");

            assert_eq!(at(shape.b), 1.0, "{case} at b");
            assert_eq!(at(shape.c), 1.0, "{case} at c");
            assert_eq!(at((shape.b + shape.c) / 2.0), 1.0, "{case} on plateau");

            let at_a = if shape.a == shape.b { 1.0 } else { 0.0 };
            let at_d = if shape.c == shape.d { 1.0 } else { 0.0 };
            assert_eq!(at(shape.a), at_a, "{case} at a");
            assert_eq!(at(shape.d), at_d, "{case} at d");
        }
    }

    #[test]
    fn test_ramps_interpolate_linearly() {
        let model = MembershipModel::standard();
        assert!(approx(
            model.membership_at(Variable::HeartRate, Term::Elevated, 85.0),
            0.5
        ));
        assert!(approx(
            model.membership_at(Variable::BloodPressure, Term::Normal, 115.0),
            0.5
        ));
        assert!(approx(
            model.membership_at(Variable::Temperature, Term::Fever, 39.5),
            0.5
        ));
        assert!(approx(
            model.membership_at(Variable::Severity, Term::Feverish, 35.0),
            0.5
        ));
        assert!(approx(
            model.membership_at(Variable::RespiratoryRate, Term::High, 32.0),
            0.4
        ));
    }

    #[test]
    fn test_undefined_term_is_empty() {
        let model = MembershipModel::standard();
        assert!(model.term(Variable::Temperature, Term::Tachycardia).is_none());
        assert_eq!(model.membership_at(Variable::Temperature, Term::Tachycardia, 38.0), 0.0);
    }

    #[test]
    fn test_profile_order() {
        let model = MembershipModel::standard();
        let profile = model.profile(Variable::OxygenSaturation, 89.0);
        let terms: Vec<Term> = profile.iter().map(|(t, _)| *t).collect();
        assert_eq!(terms, vec![Term::Normal, Term::Low, Term::Critical]);
        assert_eq!(profile[0].1, 0.0);
        assert_eq!(profile[1].1, 1.0);
        assert_eq!(profile[2].1, 1.0);
    }

    #[test]
    fn test_names_parse() {
        assert_eq!("heart_rate".parse::<Variable>().unwrap(), Variable::HeartRate);
        assert_eq!("high_fever".parse::<Term>().unwrap(), Term::HighFever);
        assert!(matches!(
            "pulse".parse::<Variable>(),
            Err(HealthError::UnknownVariable(_))
        ));
        assert!(matches!("warm".parse::<Term>(), Err(HealthError::UnknownTerm(_))));
    }

    #[test]
    fn test_shared_is_singleton() {
        assert!(std::ptr::eq(MembershipModel::shared(), MembershipModel::shared()));
    }
}
