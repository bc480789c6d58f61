//! Unit tests for Value and Tag

use core_types::{HeapId, Tag, Value};

#[cfg(test)]
mod value_creation_tests {
    use super::*;

    #[test]
    fn test_immediate_tags() {
        assert_eq!(Value::Nil.tag(), Tag::Nil);
        assert_eq!(Value::Boolean(true).tag(), Tag::Boolean);
        assert_eq!(Value::Integer(-3).tag(), Tag::Integer);
        assert_eq!(Value::Real(2.5).tag(), Tag::Real);
    }

    #[test]
    fn test_heap_tags() {
        let id = HeapId::new(0, 0);
        assert_eq!(Value::String(id).tag(), Tag::String);
        assert_eq!(Value::Cell(id).tag(), Tag::Cell);
        assert_eq!(Value::Table(id).tag(), Tag::Table);
        assert_eq!(Value::Function(id).tag(), Tag::Function);
        assert_eq!(Value::NativeFunction(id).tag(), Tag::NativeFunction);
        assert_eq!(Value::Frame(id).tag(), Tag::Frame);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from(9i64), Value::Integer(9));
        assert_eq!(Value::from(0.5f64), Value::Real(0.5));
    }
}

#[cfg(test)]
mod value_access_tests {
    use super::*;

    #[test]
    fn test_numeric_views() {
        assert_eq!(Value::Integer(4).as_integer(), Some(4));
        assert_eq!(Value::Real(4.0).as_integer(), None);
        assert_eq!(Value::Integer(4).as_real(), Some(4.0));
        assert_eq!(Value::Nil.as_real(), None);
    }

    #[test]
    fn test_callable() {
        let id = HeapId::new(7, 1);
        assert!(Value::Function(id).is_callable());
        assert!(Value::NativeFunction(id).is_callable());
        assert!(!Value::Table(id).is_callable());
    }

    #[test]
    fn test_integer_and_real_are_not_identical() {
        assert_ne!(Value::Integer(1), Value::Real(1.0));
    }
}
