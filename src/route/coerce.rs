//! Lenient coercion of raw request values into handler parameter shapes.

/// The declared shape of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    /// A signed integer.
    Int,

    /// A floating point number.
    Float,

    /// A boolean (case-insensitive `true`/`false`).
    Bool,

    /// Raw text, passed through unchanged.
    Text,
}

/// A bound handler argument.
///
/// `Unset` is the explicit sentinel for a value that was absent or failed
/// coercion: binding never raises, it degrades. This is a documented
/// leniency of the binding protocol, not strict validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// No value was resolved, or coercion failed.
    Unset,

    /// A signed integer.
    Int(i64),

    /// A floating point number.
    Float(f64),

    /// A boolean.
    Bool(bool),

    /// Raw text.
    Text(String),
}

impl ParamShape {
    /// Coerce a raw string value into this shape.
    ///
    /// Coercion failure yields [`ParamValue::Unset`], never an error.
    pub fn coerce(self, raw: &str) -> ParamValue {
        match self {
            Self::Int => raw.parse().map(ParamValue::Int).unwrap_or(ParamValue::Unset),
            Self::Float => raw
                .parse()
                .map(ParamValue::Float)
                .unwrap_or(ParamValue::Unset),
            Self::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    ParamValue::Bool(true)
                } else if raw.eq_ignore_ascii_case("false") {
                    ParamValue::Bool(false)
                } else {
                    ParamValue::Unset
                }
            }
            Self::Text => ParamValue::Text(raw.to_owned()),
        }
    }
}

impl ParamValue {
    /// Whether the value is the unset sentinel.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a float, if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_coerce_eq {
        ($shape:expr, $raw:literal, $value:expr) => {{
            assert_eq!($shape.coerce($raw), $value);
        }};
    }

    #[test]
    fn test_coerce() {
        assert_coerce_eq!(ParamShape::Int, "7", ParamValue::Int(7));
        assert_coerce_eq!(ParamShape::Int, "-42", ParamValue::Int(-42));
        assert_coerce_eq!(ParamShape::Int, "abc", ParamValue::Unset);
        assert_coerce_eq!(ParamShape::Int, "4.5", ParamValue::Unset);
        assert_coerce_eq!(ParamShape::Float, "4.5", ParamValue::Float(4.5));
        assert_coerce_eq!(ParamShape::Float, "7", ParamValue::Float(7.0));
        assert_coerce_eq!(ParamShape::Float, "abc", ParamValue::Unset);
        assert_coerce_eq!(ParamShape::Bool, "true", ParamValue::Bool(true));
        assert_coerce_eq!(ParamShape::Bool, "TRUE", ParamValue::Bool(true));
        assert_coerce_eq!(ParamShape::Bool, "False", ParamValue::Bool(false));
        assert_coerce_eq!(ParamShape::Bool, "1", ParamValue::Unset);
        assert_coerce_eq!(ParamShape::Text, "a%20b", ParamValue::Text("a%20b".to_owned()));
        assert_coerce_eq!(ParamShape::Text, "", ParamValue::Text(String::new()));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(ParamValue::Int(7).as_int(), Some(7));
        assert_eq!(ParamValue::Text("7".to_owned()).as_int(), None);
        assert_eq!(ParamValue::Bool(true).as_bool(), Some(true));
        assert_eq!(ParamValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(ParamValue::Text("x".to_owned()).as_text(), Some("x"));
        assert!(ParamValue::Unset.is_unset());
        assert!(!ParamValue::Int(0).is_unset());
    }
}
