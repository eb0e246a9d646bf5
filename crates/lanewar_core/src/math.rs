//! Fixed-point math utilities for deterministic simulation.
//!
//! Distances, speeds, health fractions and knockback progress all use
//! fixed-point arithmetic so that two engines fed the same inputs end
//! every frame bit-identical, regardless of platform.

use fixed::types::I32F32;

/// Fixed-point number type for all fractional simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fraction `numerator / denominator`, saturating to one when the
/// denominator is zero.
#[must_use]
pub fn fraction(numerator: u32, denominator: u32) -> Fixed {
    if denominator == 0 {
        return Fixed::ONE;
    }
    Fixed::from_num(numerator) / Fixed::from_num(denominator)
}

/// `fraction * value` for an integer value, used for health thresholds.
#[must_use]
pub fn scale(value: i32, fraction: Fixed) -> Fixed {
    Fixed::from_num(value) * fraction
}

/// Serde support for fixed-point numbers.
///
/// Values are written as decimal strings (`"2.5"`) and parsed back with
/// the exact decimal parser of the `fixed` crate, so data files stay
/// human-editable without routing through floating point.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal string.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Deserialize a fixed-point number from a decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Fixed::from_str(text.trim()).map_err(de::Error::custom)
    }
}

/// Serde support for `Vec<Fixed>`, each element as a decimal string.
pub mod fixed_vec_serde {
    use super::Fixed;
    use serde::ser::SerializeSeq;
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize a list of fixed-point numbers.
    pub fn serialize<S>(values: &[Fixed], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    /// Deserialize a list of fixed-point numbers.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let texts = Vec::<String>::deserialize(deserializer)?;
        texts
            .iter()
            .map(|text| Fixed::from_str(text.trim()).map_err(de::Error::custom))
            .collect()
    }
}
