//! The format-independent value model every driver produces.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use indexmap::IndexMap;

#[derive(PartialEq, Debug, Clone)]
/// A scalar value handed over by a driver.
/// `u64` and `i64` are separated because `i64` doesn't fit in `u64`,
/// but having `u64` is a fast path for 64-bit architectures, with no need to
/// go through `u128` / `i128` for everything.
pub enum Scalar {
    /// String data. Flat formats deliver everything this way.
    String(String),
    /// Unsigned 64-bit integer scalar.
    U64(u64),
    /// Signed 64-bit integer scalar.
    I64(i64),
    /// 64-bit floating-point scalar.
    F64(f64),
    /// 128-bit unsigned integer scalar.
    U128(u128),
    /// 128-bit signed integer scalar.
    I128(i128),
    /// Boolean scalar.
    Bool(bool),
    /// Null scalar (e.g. for formats supporting explicit null).
    Null,
}

impl Scalar {
    /// Returns the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn as_number(&self) -> Option<&dyn NumericConvert> {
        match self {
            Scalar::U64(n) => Some(n),
            Scalar::I64(n) => Some(n),
            Scalar::F64(n) => Some(n),
            Scalar::U128(n) => Some(n),
            Scalar::I128(n) => Some(n),
            Scalar::String(_) | Scalar::Bool(_) | Scalar::Null => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "string \"{s}\""),
            Scalar::U64(val) => write!(f, "u64 {val}"),
            Scalar::I64(val) => write!(f, "i64 {val}"),
            Scalar::F64(val) => write!(f, "f64 {val}"),
            Scalar::U128(val) => write!(f, "u128 {val}"),
            Scalar::I128(val) => write!(f, "i128 {val}"),
            Scalar::Bool(val) => write!(f, "bool {val}"),
            Scalar::Null => write!(f, "null"),
        }
    }
}

/// A loosely-typed input tree.
///
/// Absence is not a variant: a position with no input is `None` wherever an
/// `Option<&Value>` is expected, which keeps "absent" and "explicit null"
/// apart.
#[derive(PartialEq, Debug, Clone)]
pub enum Value {
    /// Named children.
    Dict(Dict),
    /// Ordered children.
    Sequence(Vec<Value>),
    /// A leaf.
    Scalar(Scalar),
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(Scalar::Null)
    }
}

impl Value {
    /// A string leaf.
    pub fn string(text: impl Into<String>) -> Self {
        Value::Scalar(Scalar::String(text.into()))
    }

    /// Returns the dictionary, if this value has named children.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    /// Returns the elements, if this value is a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the scalar, if this value is a leaf.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Returns the string content, if this value is a string leaf.
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    /// `true` for an explicit null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(Scalar::Null))
    }
}

/// Short description used in "got ..." error messages.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Dict(dict) => write!(f, "an object with {} key(s)", dict.len()),
            Value::Sequence(items) => write!(f, "an array of {} value(s)", items.len()),
            Value::Scalar(scalar) => write!(f, "{scalar}"),
        }
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<Dict> for Value {
    fn from(dict: Dict) -> Self {
        Value::Dict(dict)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::string(text)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::string(text)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Scalar(Scalar::I64(value))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Scalar(Scalar::U64(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(Scalar::F64(value))
    }
}

/// Named children of a [`Value`], in input order.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Dict {
    entries: IndexMap<String, Value>,
}

impl Dict {
    /// An empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a child up by its public name.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Child names, in input order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Adds or replaces a child.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Children, in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wraps this dictionary back into a [`Value`].
    pub fn into_value(self) -> Value {
        Value::Dict(self)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl Extend<(String, Value)> for Dict {
    fn extend<I: IntoIterator<Item = (String, Value)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl<'a> FromIterator<&'a str> for Value {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Value::Sequence(iter.into_iter().map(ToOwned::to_owned).map(Value::string).collect())
    }
}

/// Check if an f64 has no fractional part
#[inline]
fn has_no_fractional_part(value: f64) -> bool {
    value.fract() == 0.0
}

/// Lossless numeric conversions from the numeric scalars.
pub(crate) trait NumericConvert {
    fn to_i8(&self) -> Option<i8>;
    fn to_i16(&self) -> Option<i16>;
    fn to_i32(&self) -> Option<i32>;
    fn to_i64(&self) -> Option<i64>;
    fn to_i128(&self) -> Option<i128>;
    fn to_isize(&self) -> Option<isize>;

    fn to_u8(&self) -> Option<u8>;
    fn to_u16(&self) -> Option<u16>;
    fn to_u32(&self) -> Option<u32>;
    fn to_u64(&self) -> Option<u64>;
    fn to_u128(&self) -> Option<u128>;
    fn to_usize(&self) -> Option<usize>;

    fn to_f32(&self) -> Option<f32>;
    fn to_f64(&self) -> Option<f64>;
}

macro_rules! integer_source {
    (@targets $($method:ident: $target:ty),* $(,)?) => {$(
        fn $method(&self) -> Option<$target> {
            (*self).try_into().ok()
        }
    )*};
    ($($source:ty),* $(,)?) => {$(
        impl NumericConvert for $source {
            integer_source!(@targets
                to_i8: i8, to_i16: i16, to_i32: i32, to_i64: i64, to_i128: i128, to_isize: isize,
                to_u8: u8, to_u16: u16, to_u32: u32, to_u64: u64, to_u128: u128, to_usize: usize,
            );

            fn to_f32(&self) -> Option<f32> {
                Some(*self as f32)
            }
            fn to_f64(&self) -> Option<f64> {
                Some(*self as f64)
            }
        }
    )*};
}

integer_source!(u64, i64, u128, i128);

macro_rules! float_to_integer {
    ($($method:ident: $target:ty),* $(,)?) => {$(
        fn $method(&self) -> Option<$target> {
            let value = *self;
            (has_no_fractional_part(value)
                && value >= <$target>::MIN as f64
                && value < <$target>::MAX as f64 + 1.0)
                .then_some(value as $target)
        }
    )*};
}

impl NumericConvert for f64 {
    float_to_integer!(
        to_i8: i8, to_i16: i16, to_i32: i32, to_i64: i64, to_i128: i128, to_isize: isize,
        to_u8: u8, to_u16: u16, to_u32: u32, to_u64: u64, to_u128: u128, to_usize: usize,
    );

    fn to_f32(&self) -> Option<f32> {
        Some(*self as f32)
    }
    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_convert_only_within_range() {
        assert_eq!(300u64.to_u8(), None);
        assert_eq!(200u64.to_u8(), Some(200));
        assert_eq!((-1i64).to_u32(), None);
        assert_eq!((-1i64).to_i8(), Some(-1));
        assert_eq!(u128::MAX.to_u64(), None);
    }

    #[test]
    fn floats_convert_to_integers_without_fraction_only() {
        assert_eq!(4.0f64.to_i32(), Some(4));
        assert_eq!(4.5f64.to_i32(), None);
        assert_eq!((-3.0f64).to_u16(), None);
        assert_eq!(1e10f64.to_i32(), None);
        assert_eq!(1e20f64.to_u128(), Some(100_000_000_000_000_000_000));
        assert_eq!(1e20f64.to_i64(), None);
        assert_eq!(18_446_744_073_709_551_616f64.to_u64(), None);
        assert_eq!(f64::NAN.to_u8(), None);
    }

    #[test]
    fn dict_keeps_input_order() {
        let dict: Dict = [("b", 1i64), ("a", 2i64)].into_iter().collect();
        assert_eq!(dict.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(dict.lookup("a"), Some(&Value::from(2i64)));
        assert_eq!(dict.lookup("c"), None);
    }

    #[test]
    fn values_describe_themselves() {
        assert_eq!(Value::string("x").to_string(), "string \"x\"");
        assert_eq!(Value::from(vec![Value::from(true)]).to_string(), "an array of 1 value(s)");
        assert_eq!(Value::default().to_string(), "null");
        assert!(Value::default().is_null());
    }
}
