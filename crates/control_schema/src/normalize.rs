use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{ControlDescriptor, ControlKind, Conversion, ValueType};

const MPH_TO_KPH: f64 = 1.60934;

/// A raw leaf coerced to the descriptor's declared [`ValueType`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ControlValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    fn matches(&self, candidate: &Value) -> bool {
        match (self, candidate) {
            (Self::Bool(value), Value::Bool(allowed)) => value == allowed,
            (Self::Int(value), Value::Number(allowed)) => {
                allowed.as_i64() == Some(*value) || allowed.as_f64() == Some(*value as f64)
            }
            (Self::Float(value), Value::Number(allowed)) => allowed.as_f64() == Some(*value),
            (Self::Str(value), Value::String(allowed)) => value == allowed,
            _ => false,
        }
    }
}

impl From<ControlValue> for Value {
    fn from(value: ControlValue) -> Self {
        match value {
            ControlValue::Bool(value) => Value::Bool(value),
            ControlValue::Int(value) => Value::from(value),
            ControlValue::Float(value) => Value::from(value),
            ControlValue::Str(value) => Value::String(value),
        }
    }
}

/// Why a raw value was refused. Refusals are never confused with a falsy
/// coerced value such as `false` or `0`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    #[error("value cannot be coerced to {expected}")]
    Coercion { expected: ValueType },
    #[error("objects and arrays are not accepted for string controls")]
    Structured,
    #[error("value is not one of the allowed select values")]
    NotInValues,
    #[error("value is not a finite number")]
    NonFinite,
}

/// Coerces `raw` to the control's value type, then applies the select
/// membership check or the slider clamp-and-snap.
pub fn normalize_value(
    control: &ControlDescriptor,
    raw: &Value,
) -> Result<ControlValue, Rejection> {
    let value_type = control.value_type();
    let coerced = coerce(value_type, raw)?;

    match control.kind {
        ControlKind::Select => {
            let allowed = control.values.as_deref().unwrap_or_default();
            if allowed.iter().any(|candidate| coerced.matches(candidate)) {
                Ok(coerced)
            } else {
                Err(Rejection::NotInValues)
            }
        }
        ControlKind::Slider => Ok(snap_to_slider(control, value_type, coerced)),
        _ => Ok(coerced),
    }
}

/// Converts a normalized value into the stored unit system. Non-numeric
/// values and unknown conversions pass through unchanged.
pub fn apply_conversion(control: &ControlDescriptor, value: ControlValue) -> ControlValue {
    let (Some(conversion), Some(number)) = (control.conversion.as_ref(), value.as_f64()) else {
        return value;
    };
    match conversion {
        Conversion::FahrenheitToCelsius => ControlValue::Float((number - 32.0) * 5.0 / 9.0),
        Conversion::MphToKph => ControlValue::Float(number * MPH_TO_KPH),
        Conversion::Other(_) => value,
    }
}

/// Non-string scalars given to a `str` control keep their JSON spelling
/// (`true`, `null`, `3.5`), not a host-language rendering.
fn coerce(value_type: ValueType, raw: &Value) -> Result<ControlValue, Rejection> {
    let rejected = Rejection::Coercion {
        expected: value_type,
    };
    match value_type {
        ValueType::Bool => coerce_bool(raw).map(ControlValue::Bool).ok_or(rejected),
        ValueType::Int => coerce_int(raw).map(ControlValue::Int).ok_or(rejected),
        ValueType::Float => {
            let value = coerce_float(raw).ok_or(rejected)?;
            if value.is_finite() {
                Ok(ControlValue::Float(value))
            } else {
                Err(Rejection::NonFinite)
            }
        }
        ValueType::Str => match raw {
            Value::Object(_) | Value::Array(_) => Err(Rejection::Structured),
            Value::String(value) => Ok(ControlValue::Str(value.clone())),
            scalar => Ok(ControlValue::Str(scalar.to_string())),
        },
    }
}

fn coerce_bool(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(value) => Some(*value),
        Value::Number(number) => number.as_f64().map(|value| value != 0.0),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Some(true),
            "false" | "0" | "off" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(raw: &Value) -> Option<i64> {
    match raw {
        Value::Bool(value) => Some(i64::from(*value)),
        // Fractional numbers truncate toward zero.
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(|value| float_to_i64(value.trunc()))),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// `None` for non-finite values and values outside the `i64` range; the
/// value is expected to be integral already.
pub(crate) fn float_to_i64(value: f64) -> Option<i64> {
    // `i64::MAX as f64` is 2^63, one past the largest i64.
    (value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64)
        .then_some(value as i64)
}

/// Clamps into `[min, max]` (either bound optional), then snaps to the
/// nearest `step` counted from `min` (or 0). Bounds are in input units.
fn snap_to_slider(
    control: &ControlDescriptor,
    value_type: ValueType,
    coerced: ControlValue,
) -> ControlValue {
    let Some(mut number) = coerced.as_f64() else {
        return coerced;
    };
    if let Some(min) = control.min {
        number = number.max(min);
    }
    if let Some(max) = control.max {
        number = number.min(max);
    }

    let origin = control.min.unwrap_or(0.0);
    let step = control
        .step
        .filter(|step| step.is_finite() && *step > 0.0)
        .unwrap_or(1.0);
    let snapped = origin + ((number - origin) / step).round_ties_even() * step;

    match value_type {
        ValueType::Int => match float_to_i64(snapped.round_ties_even()) {
            Some(value) => ControlValue::Int(value),
            None => coerced,
        },
        _ => ControlValue::Float(snapped),
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
