//! Type metadata: what the compiler knows about a target type.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::hash::Hash;
use std::collections::HashMap;

use crate::{BoxError, Capabilities, Compiler, ConfigError, Dict, Hooks, Plan, Scalar, Site, Value};

/// A type the engine knows how to decode.
///
/// Usually derived with `#[derive(Schema)]`. Every field of a record, and
/// every element of a container, must itself implement `Schema`.
pub trait Schema: Default + Send + Sync + 'static {
    /// Human-readable name, used in error messages.
    fn type_name() -> String;

    /// Structural kind, used by drivers to check representability.
    fn kind() -> Kind;

    /// Capability hooks. None by default.
    fn hooks() -> Hooks<Self> {
        Hooks::new()
    }

    /// Builds the plan decoding this type at `site`.
    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError>;
}

/// Structural kind of a [`Schema`] type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A primitive.
    Scalar(ScalarKind),
    /// An indirection. `nullable` pointers accept `nil`.
    Pointer {
        /// Whether the pointer can be empty.
        nullable: bool,
    },
    /// A list; `len` is set for fixed-size arrays.
    Sequence {
        /// Length of a fixed-size array.
        len: Option<usize>,
    },
    /// A string-keyed map.
    Map,
    /// A record with named fields.
    Record,
    /// A raw representation type, copied as-is.
    Dynamic,
    /// A field that never reads input.
    Marker,
}

/// Which primitive a [`Kind::Scalar`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `bool`.
    Bool,
    /// Any integer width.
    Integer,
    /// `f32` or `f64`.
    Float,
    /// `char`.
    Char,
    /// `String`.
    String,
}

/// Everything a driver may inspect about a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// See [`Schema::type_name`].
    pub name: String,
    /// See [`Schema::kind`].
    pub kind: Kind,
    /// See [`Schema::hooks`].
    pub capabilities: Capabilities,
}

impl TypeInfo {
    /// Collects the metadata of `T`.
    pub fn of<T: Schema>() -> Self {
        Self {
            name: T::type_name(),
            kind: T::kind(),
            capabilities: T::hooks().capabilities(),
        }
    }

    /// Whether a flat format can store this type in a single entry.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, Kind::Scalar(_) | Kind::Marker) || self.capabilities.text
    }
}

/// A scalar the engine can read directly, or parse from text.
pub trait Primitive: Schema + Clone {
    /// Exact conversion from a scalar. `None` if the kind or range is wrong.
    fn from_scalar(scalar: &Scalar) -> Option<Self>;

    /// Parses the textual representation, as found in flat formats and in
    /// `default` literals.
    fn parse_text(text: &str) -> Result<Self, BoxError>;
}

macro_rules! numeric {
    ($($ty:ident => $convert:ident, $kind:ident);* $(;)?) => {$(
        impl Schema for $ty {
            fn type_name() -> String {
                stringify!($ty).to_owned()
            }

            fn kind() -> Kind {
                Kind::Scalar(ScalarKind::$kind)
            }

            fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
                compiler.scalar(site)
            }
        }

        impl Primitive for $ty {
            fn from_scalar(scalar: &Scalar) -> Option<Self> {
                scalar.as_number()?.$convert()
            }

            fn parse_text(text: &str) -> Result<Self, BoxError> {
                text.parse::<$ty>().map_err(Into::into)
            }
        }
    )*};
}

numeric! {
    u8 => to_u8, Integer;
    u16 => to_u16, Integer;
    u32 => to_u32, Integer;
    u64 => to_u64, Integer;
    u128 => to_u128, Integer;
    usize => to_usize, Integer;
    i8 => to_i8, Integer;
    i16 => to_i16, Integer;
    i32 => to_i32, Integer;
    i64 => to_i64, Integer;
    i128 => to_i128, Integer;
    isize => to_isize, Integer;
    f32 => to_f32, Float;
    f64 => to_f64, Float;
}

impl Schema for String {
    fn type_name() -> String {
        "String".to_owned()
    }

    fn kind() -> Kind {
        Kind::Scalar(ScalarKind::String)
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.scalar(site)
    }
}

impl Primitive for String {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        scalar.as_str().map(ToOwned::to_owned)
    }

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        Ok(text.to_owned())
    }
}

impl Schema for bool {
    fn type_name() -> String {
        "bool".to_owned()
    }

    fn kind() -> Kind {
        Kind::Scalar(ScalarKind::Bool)
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.scalar(site)
    }
}

impl Primitive for bool {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Bool(value) => Some(*value),
            _ => None,
        }
    }

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        match text {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(format!("invalid syntax for a bool: \"{text}\"").into()),
        }
    }
}

impl Schema for char {
    fn type_name() -> String {
        "char".to_owned()
    }

    fn kind() -> Kind {
        Kind::Scalar(ScalarKind::Char)
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.scalar(site)
    }
}

impl Primitive for char {
    fn from_scalar(scalar: &Scalar) -> Option<Self> {
        let text = scalar.as_str()?;
        let mut chars = text.chars();
        let first = chars.next()?;
        chars.next().is_none().then_some(first)
    }

    fn parse_text(text: &str) -> Result<Self, BoxError> {
        text.parse::<char>().map_err(Into::into)
    }
}

impl<T: Schema> Schema for Option<T> {
    fn type_name() -> String {
        format!("Option<{}>", T::type_name())
    }

    fn kind() -> Kind {
        Kind::Pointer { nullable: true }
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.option(site)
    }
}

fn unbox<T>(boxed: &mut Box<T>) -> &mut T {
    boxed
}

fn unshare<T: Clone>(shared: &mut Arc<T>) -> &mut T {
    Arc::make_mut(shared)
}

impl<T: Schema> Schema for Box<T> {
    fn type_name() -> String {
        format!("Box<{}>", T::type_name())
    }

    fn kind() -> Kind {
        Kind::Pointer { nullable: false }
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.pointer(site, unbox::<T>)
    }
}

impl<T: Schema + Clone> Schema for Arc<T> {
    fn type_name() -> String {
        format!("Arc<{}>", T::type_name())
    }

    fn kind() -> Kind {
        Kind::Pointer { nullable: false }
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.pointer(site, unshare::<T>)
    }
}

impl<T: Schema> Schema for Vec<T> {
    fn type_name() -> String {
        format!("Vec<{}>", T::type_name())
    }

    fn kind() -> Kind {
        Kind::Sequence { len: None }
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.sequence(site)
    }
}

impl<T: Schema, const N: usize> Schema for [T; N]
where
    [T; N]: Default,
{
    fn type_name() -> String {
        format!("[{}; {N}]", T::type_name())
    }

    fn kind() -> Kind {
        Kind::Sequence { len: Some(N) }
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.array(site)
    }
}

/// A map type the engine can fill entry by entry.
pub trait MapLike: Schema {
    /// Key type. Must be a `String` or decodable from text.
    type Key: Schema;
    /// Value type.
    type Item: Schema;

    /// Adds one entry.
    fn insert_entry(&mut self, key: Self::Key, item: Self::Item);
}

impl<K, V> Schema for HashMap<K, V>
where
    K: Schema + Eq + Hash,
    V: Schema,
{
    fn type_name() -> String {
        format!("HashMap<{}, {}>", K::type_name(), V::type_name())
    }

    fn kind() -> Kind {
        Kind::Map
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.map(site)
    }
}

impl<K, V> MapLike for HashMap<K, V>
where
    K: Schema + Eq + Hash,
    V: Schema,
{
    type Key = K;
    type Item = V;

    fn insert_entry(&mut self, key: K, item: V) {
        self.insert(key, item);
    }
}

impl<K, V> Schema for BTreeMap<K, V>
where
    K: Schema + Ord,
    V: Schema,
{
    fn type_name() -> String {
        format!("BTreeMap<{}, {}>", K::type_name(), V::type_name())
    }

    fn kind() -> Kind {
        Kind::Map
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.map(site)
    }
}

impl<K, V> MapLike for BTreeMap<K, V>
where
    K: Schema + Ord,
    V: Schema,
{
    type Key = K;
    type Item = V;

    fn insert_entry(&mut self, key: K, item: V) {
        self.insert(key, item);
    }
}

impl Schema for Value {
    fn type_name() -> String {
        "Value".to_owned()
    }

    fn kind() -> Kind {
        Kind::Dynamic
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.passthrough(site, |value: &Value| Some(value.clone()), || {
            Value::Dict(Dict::new())
        })
    }
}

impl Schema for Dict {
    fn type_name() -> String {
        "Dict".to_owned()
    }

    fn kind() -> Kind {
        Kind::Dynamic
    }

    fn compile(compiler: &mut Compiler<'_>, site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        compiler.passthrough(site, |value: &Value| value.as_dict().cloned(), Dict::new)
    }
}
