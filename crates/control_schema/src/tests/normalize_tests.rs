use super::*;
use serde_json::json;

fn control(value_type: ValueType, kind: ControlKind) -> ControlDescriptor {
    ControlDescriptor {
        path: Some("test.value".into()),
        kind,
        value_type: Some(value_type),
        ..ControlDescriptor::default()
    }
}

fn slider(
    value_type: ValueType,
    min: Option<f64>,
    max: Option<f64>,
    step: Option<f64>,
) -> ControlDescriptor {
    ControlDescriptor {
        min,
        max,
        step,
        ..control(value_type, ControlKind::Slider)
    }
}

#[test]
fn bool_accepts_words_numbers_and_booleans() {
    let toggle = control(ValueType::Bool, ControlKind::Toggle);
    for raw in [json!(true), json!("TRUE"), json!(" on "), json!("yes"), json!("1"), json!(2)] {
        assert_eq!(normalize_value(&toggle, &raw), Ok(ControlValue::Bool(true)), "{raw}");
    }
    for raw in [json!(false), json!("False"), json!("off"), json!("no"), json!("0"), json!(0.0)] {
        assert_eq!(normalize_value(&toggle, &raw), Ok(ControlValue::Bool(false)), "{raw}");
    }
}

#[test]
fn bool_rejection_differs_from_false() {
    let toggle = control(ValueType::Bool, ControlKind::Toggle);
    let rejected = normalize_value(&toggle, &json!("maybe"));
    assert_eq!(
        rejected,
        Err(Rejection::Coercion {
            expected: ValueType::Bool
        })
    );
    assert_ne!(rejected, Ok(ControlValue::Bool(false)));
    assert!(normalize_value(&toggle, &json!(null)).is_err());
    assert!(normalize_value(&toggle, &json!([true])).is_err());
}

#[test]
fn int_parses_numbers_and_strings() {
    let input = control(ValueType::Int, ControlKind::Input);
    assert_eq!(normalize_value(&input, &json!(7)), Ok(ControlValue::Int(7)));
    assert_eq!(normalize_value(&input, &json!(" 12 ")), Ok(ControlValue::Int(12)));
    assert_eq!(normalize_value(&input, &json!(3.9)), Ok(ControlValue::Int(3)));
    assert_eq!(normalize_value(&input, &json!(-3.9)), Ok(ControlValue::Int(-3)));
    assert_eq!(normalize_value(&input, &json!(true)), Ok(ControlValue::Int(1)));
    assert_eq!(normalize_value(&input, &json!(0)), Ok(ControlValue::Int(0)));
    for raw in [json!("warm"), json!("3.5"), json!(null), json!({ "v": 1 })] {
        assert!(normalize_value(&input, &raw).is_err(), "{raw}");
    }
}

#[test]
fn int_rejects_floats_outside_i64_range() {
    let input = control(ValueType::Int, ControlKind::Input);
    for raw in [json!(1e30), json!(-1e30), json!(9.3e18)] {
        assert_eq!(
            normalize_value(&input, &raw),
            Err(Rejection::Coercion {
                expected: ValueType::Int
            }),
            "{raw}"
        );
    }
    assert_eq!(
        normalize_value(&input, &json!(-9.2e18)),
        Ok(ControlValue::Int(-9_200_000_000_000_000_000))
    );
}

#[test]
fn float_to_i64_bounds() {
    assert_eq!(float_to_i64(0.0), Some(0));
    assert_eq!(float_to_i64(i64::MIN as f64), Some(i64::MIN));
    assert_eq!(float_to_i64(i64::MAX as f64), None);
    assert_eq!(float_to_i64(f64::NAN), None);
    assert_eq!(float_to_i64(f64::NEG_INFINITY), None);
}

#[test]
fn float_parses_and_rejects_non_finite() {
    let input = control(ValueType::Float, ControlKind::Input);
    assert_eq!(normalize_value(&input, &json!(2)), Ok(ControlValue::Float(2.0)));
    assert_eq!(normalize_value(&input, &json!("21.5")), Ok(ControlValue::Float(21.5)));
    assert_eq!(normalize_value(&input, &json!("inf")), Err(Rejection::NonFinite));
    assert_eq!(
        normalize_value(&input, &json!("warm")),
        Err(Rejection::Coercion {
            expected: ValueType::Float
        })
    );
}

#[test]
fn str_stringifies_scalars_and_rejects_structures() {
    let input = control(ValueType::Str, ControlKind::Input);
    assert_eq!(
        normalize_value(&input, &json!("Radio")),
        Ok(ControlValue::Str("Radio".into()))
    );
    assert_eq!(normalize_value(&input, &json!(5)), Ok(ControlValue::Str("5".into())));
    assert_eq!(
        normalize_value(&input, &json!(true)),
        Ok(ControlValue::Str("true".into()))
    );
    assert_eq!(normalize_value(&input, &json!(["a"])), Err(Rejection::Structured));
    assert_eq!(normalize_value(&input, &json!({ "a": 1 })), Err(Rejection::Structured));
}

#[test]
fn missing_value_type_defaults_to_str() {
    let input = ControlDescriptor {
        path: Some("infotainment.local_game".into()),
        ..ControlDescriptor::default()
    };
    assert_eq!(
        normalize_value(&input, &json!("Elden Ring")),
        Ok(ControlValue::Str("Elden Ring".into()))
    );
}

#[test]
fn select_rejects_values_outside_enumeration() {
    let band = ControlDescriptor {
        values: Some(vec![json!("FM"), json!("AM")]),
        ..control(ValueType::Str, ControlKind::Select)
    };
    assert_eq!(normalize_value(&band, &json!("AM")), Ok(ControlValue::Str("AM".into())));
    assert_eq!(normalize_value(&band, &json!("XM")), Err(Rejection::NotInValues));
    assert_eq!(normalize_value(&band, &json!("fm")), Err(Rejection::NotInValues));
}

#[test]
fn select_compares_numbers_numerically() {
    let distance = ControlDescriptor {
        values: Some(vec![json!(1), json!(2), json!(3)]),
        ..control(ValueType::Int, ControlKind::Select)
    };
    assert_eq!(normalize_value(&distance, &json!("2")), Ok(ControlValue::Int(2)));
    assert_eq!(normalize_value(&distance, &json!(0)), Err(Rejection::NotInValues));

    let without_values = control(ValueType::Int, ControlKind::Select);
    assert_eq!(normalize_value(&without_values, &json!(1)), Err(Rejection::NotInValues));
}

#[test]
fn slider_clamps_and_snaps_to_step() {
    let volume = slider(ValueType::Int, Some(0.0), Some(100.0), Some(5.0));
    assert_eq!(normalize_value(&volume, &json!(97)), Ok(ControlValue::Int(95)));
    assert_eq!(normalize_value(&volume, &json!(-10)), Ok(ControlValue::Int(0)));
    assert_eq!(normalize_value(&volume, &json!(103)), Ok(ControlValue::Int(100)));
    assert_eq!(normalize_value(&volume, &json!(98)), Ok(ControlValue::Int(100)));
}

#[test]
fn slider_snaps_from_min_and_defaults_step() {
    let temp = slider(ValueType::Float, Some(60.5), Some(90.0), None);
    assert_eq!(normalize_value(&temp, &json!(70.2)), Ok(ControlValue::Float(70.5)));

    let open_top = slider(ValueType::Int, Some(0.0), None, Some(10.0));
    assert_eq!(normalize_value(&open_top, &json!(1234)), Ok(ControlValue::Int(1230)));

    let no_min = slider(ValueType::Float, None, Some(10.0), Some(0.5));
    assert_eq!(normalize_value(&no_min, &json!(-3.3)), Ok(ControlValue::Float(-3.5)));

    let zero_step = slider(ValueType::Int, Some(0.0), Some(5.0), Some(0.0));
    assert_eq!(normalize_value(&zero_step, &json!(2.6)), Ok(ControlValue::Int(2)));
}

#[test]
fn slider_rounds_half_to_even() {
    let level = slider(ValueType::Int, Some(0.0), Some(10.0), Some(2.0));
    assert_eq!(normalize_value(&level, &json!(5)), Ok(ControlValue::Int(4)));
    assert_eq!(normalize_value(&level, &json!(7)), Ok(ControlValue::Int(8)));
}

#[test]
fn slider_leaves_non_numeric_values_alone() {
    let odd = slider(ValueType::Str, Some(0.0), Some(10.0), Some(1.0));
    assert_eq!(normalize_value(&odd, &json!("11")), Ok(ControlValue::Str("11".into())));
}

#[test]
fn conversions_run_on_normalized_values() {
    let fahrenheit = ControlDescriptor {
        conversion: Some(Conversion::FahrenheitToCelsius),
        ..slider(ValueType::Float, Some(32.0), Some(212.0), None)
    };
    let clamped = normalize_value(&fahrenheit, &json!(300)).expect("normalized");
    assert_eq!(clamped, ControlValue::Float(212.0));
    assert_eq!(apply_conversion(&fahrenheit, clamped), ControlValue::Float(100.0));

    let speed = ControlDescriptor {
        conversion: Some(Conversion::MphToKph),
        ..control(ValueType::Float, ControlKind::Input)
    };
    let ControlValue::Float(kph) = apply_conversion(&speed, ControlValue::Float(100.0)) else {
        panic!("mph_to_kph should produce a float");
    };
    assert!((kph - 160.934).abs() < 1e-9, "{kph}");
    assert_eq!(
        apply_conversion(&speed, ControlValue::Str("fast".into())),
        ControlValue::Str("fast".into())
    );
}

#[test]
fn unknown_or_missing_conversion_is_identity() {
    let plain = control(ValueType::Int, ControlKind::Input);
    assert_eq!(apply_conversion(&plain, ControlValue::Int(40)), ControlValue::Int(40));

    let unknown = ControlDescriptor {
        conversion: Some(Conversion::Other("c_to_k".into())),
        ..control(ValueType::Float, ControlKind::Input)
    };
    assert_eq!(
        apply_conversion(&unknown, ControlValue::Float(20.0)),
        ControlValue::Float(20.0)
    );
}
