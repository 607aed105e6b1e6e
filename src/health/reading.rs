use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// One set of six vital-sign readings, already range checked
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    /// °C
    pub temperature: f64,
    /// bpm
    pub heart_rate: i32,
    /// Systolic, mmHg
    pub blood_pressure: i32,
    /// breaths/min
    pub respiratory_rate: i32,
    /// %
    pub oxygen_saturation: f64,
    /// mg/dL
    pub blood_sugar: f64,
}

/// Field of a diagnosis request that carries a range constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VitalField {
    Temperature,
    HeartRate,
    BloodPressure,
    RespiratoryRate,
    OxygenSaturation,
    BloodSugar,
}

impl VitalField {
    /// Accepted range, inclusive on both ends
    pub fn range(self) -> RangeInclusive<f64> {
        match self {
            VitalField::Temperature => 35.0..=42.0,
            VitalField::HeartRate => 40.0..=180.0,
            VitalField::BloodPressure => 90.0..=180.0,
            VitalField::RespiratoryRate => 12.0..=40.0,
            VitalField::OxygenSaturation => 85.0..=100.0,
            VitalField::BloodSugar => 70.0..=300.0,
        }
    }

    fn message(self) -> &'static str {
        match self {
            VitalField::Temperature => "Temperature must be between 35 and 42 Celsius.",
            VitalField::HeartRate => "Heart rate must be between 40 and 180 bpm.",
            VitalField::BloodPressure => "Blood pressure must be between 90 and 180 mmHg.",
            VitalField::RespiratoryRate => {
                "Respiratory rate must be between 12 and 40 breaths per minute."
            }
            VitalField::OxygenSaturation => {
                "Oxygen saturation must be between 85 and 100 percent."
            }
            VitalField::BloodSugar => "Blood sugar must be between 70 and 300 mg/dL.",
        }
    }
}

impl fmt::Display for VitalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Out-of-range request field
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field}")]
    OutOfRange { field: VitalField, value: f64 },
}

impl ValidationError {
    pub fn field(&self) -> VitalField {
        match self {
            ValidationError::OutOfRange { field, .. } => *field,
        }
    }
}

/// Diagnosis request as received from a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthData {
    pub name: String,
    pub temperature: f64,
    #[serde(deserialize_with = "integral")]
    pub heart_rate: i64,
    #[serde(deserialize_with = "integral")]
    pub blood_pressure: i64,
    #[serde(deserialize_with = "integral")]
    pub respiratory_rate: i64,
    pub oxygen_saturation: f64,
    pub blood_sugar: f64,
}

impl HealthData {
    /// Check every field against its range, in declaration order.
    /// The first violation is reported.
    pub fn validate(&self) -> Result<VitalReading, ValidationError> {
        let checks = [
            (VitalField::Temperature, self.temperature),
            (VitalField::HeartRate, self.heart_rate as f64),
            (VitalField::BloodPressure, self.blood_pressure as f64),
            (VitalField::RespiratoryRate, self.respiratory_rate as f64),
            (VitalField::OxygenSaturation, self.oxygen_saturation),
            (VitalField::BloodSugar, self.blood_sugar),
        ];

        // NaN fails `contains`
        if let Some(&(field, value)) = checks
            .iter()
            .find(|(field, value)| !field.range().contains(value))
        {
            return Err(ValidationError::OutOfRange { field, value });
        }

        // in range, so the narrowing casts are exact
        Ok(VitalReading {
            temperature: self.temperature,
            heart_rate: self.heart_rate as i32,
            blood_pressure: self.blood_pressure as i32,
            respiratory_rate: self.respiratory_rate as i32,
            oxygen_saturation: self.oxygen_saturation,
            blood_sugar: self.blood_sugar,
        })
    }
}

/// Accept any integral JSON number, `65` and `65.0` alike.
/// Values past `i64` saturate so the range check still reports them.
fn integral<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct IntegralVisitor;

    impl<'de> Visitor<'de> for IntegralVisitor {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            Ok(i64::try_from(v).unwrap_or(i64::MAX))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.is_finite() && v.fract() == 0.0 {
                // `as` saturates at the i64 bounds
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }
    }

    deserializer.deserialize_any(IntegralVisitor)
}
