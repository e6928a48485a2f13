//! Unit tests for Value enum

use core_types::Value;
use serde_json::json;

#[cfg(test)]
mod value_conversion_tests {
    use super::*;

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from(42), Value::Smi(42));
        assert_eq!(Value::from(1.5), Value::Double(1.5));
        assert_eq!(Value::from("done"), Value::String("done".to_string()));
    }

    #[test]
    fn test_from_json() {
        let value = Value::from(json!({"title": "Cool post"}));
        assert_eq!(value.as_json().and_then(|j| j["title"].as_str()), Some("Cool post"));
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::Smi(3).as_number(), Some(3.0));
        assert_eq!(Value::Double(0.5).as_number(), Some(0.5));
        assert_eq!(Value::Null.as_number(), None);
    }
}

#[cfg(test)]
mod value_native_tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        latitude: f64,
        longitude: f64,
    }

    #[test]
    fn test_native_roundtrip() {
        let value = Value::native(Position {
            latitude: 51.5,
            longitude: -0.12,
        });
        let position = value.downcast::<Position>().expect("position");
        assert_eq!(position.latitude, 51.5);
    }

    #[test]
    fn test_native_wrong_type() {
        let value = Value::native(Position {
            latitude: 0.0,
            longitude: 0.0,
        });
        assert!(value.downcast::<String>().is_none());
        assert!(Value::Smi(1).downcast::<Position>().is_none());
    }

    #[test]
    fn test_native_display_and_type() {
        let value = Value::native(5u64);
        assert_eq!(value.to_string(), "[object Object]");
        assert_eq!(value.type_of(), "object");
        assert!(value.is_truthy());
    }
}

#[cfg(test)]
mod value_display_tests {
    use super::*;

    #[test]
    fn test_double_display() {
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Double(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(Value::Double(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Double(3.25).to_string(), "3.25");
    }

    #[test]
    fn test_string_display() {
        assert_eq!(Value::from("blog post").to_string(), "blog post");
    }
}
