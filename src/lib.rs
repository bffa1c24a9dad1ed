#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;
extern crate self as tagplan;

mod value;
pub use value::*;

mod path;
pub use path::*;

mod span;
pub use span::*;

pub mod tags;
pub use tags::{TagError, Tags};

mod error;
pub use error::*;

mod hooks;
pub use hooks::*;

mod schema;
pub use schema::*;

mod plan;
pub use plan::*;

mod compile;
pub use compile::*;

mod driver;
pub use driver::*;

mod deserializer;
pub use deserializer::*;

mod witness;
pub use witness::*;

/// Derives [`Schema`](trait@Schema) for a struct.
///
/// Named fields become record fields; a tuple struct with one field is
/// decoded as its inner type. Attributes:
///
/// - `#[schema(initialize, validate, text, from_str, json, dict)]` on the
///   struct registers the matching hooks, implemented through
///   [`Initializer`], [`Validator`], [`UnmarshalText`], [`core::str::FromStr`],
///   [`UnmarshalJson`] and [`UnmarshalDict`].
/// - `#[schema(name = "...")]` on the struct overrides its type name.
/// - `#[schema(json = "id", default = "7")]` on a field sets metadata
///   entries. `initialized` and `flatten` are flags, and
///   `or_method = "f"` names an associated function `fn f() -> Result<T, E>`
///   used as the field's constructor.
///
/// Fields that are not `pub` never receive input.
pub use tagplan_derive::Schema;
