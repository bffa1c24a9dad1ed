//! Format drivers: adapters from a wire format to the [`Value`] model.

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::{BoxError, ConfigError, InputError, TypeInfo, Value};

mod dict;
mod list;

pub use dict::DictDriver;
pub use list::{KvList, ListDriver};

/// What a driver tells the engine about its format.
///
/// Plans only ever see a `&dyn Driver`; the structural checks in
/// [`Driver::enter`] run while compiling, with exclusive access.
pub trait Driver: Send + Sync {
    /// The lowercase source ID of the format, used for logging.
    fn source(&self) -> &'static str;

    /// Whether the format can represent nested records and sequences.
    fn allows_nesting(&self) -> bool;

    /// Whether values of this type should go through their own decode hooks
    /// rather than through the engine.
    fn should_custom_decode(&self, info: &TypeInfo) -> bool;

    /// The raw form handed to a custom decode hook.
    fn payload<'v>(&self, value: &'v Value) -> Result<Payload<'v>, BoxError>;

    /// How a scalar position reads its input. The error describes what was
    /// found instead.
    fn leaf<'v>(&self, value: &'v Value) -> Result<&'v Value, String> {
        Ok(value)
    }

    /// Called before compiling a type at `at`. Fails if the format cannot
    /// represent the type there.
    fn enter(&mut self, at: &str, info: &TypeInfo) -> Result<(), ConfigError> {
        let _ = (at, info);
        Ok(())
    }

    /// Called after compiling a type entered with [`Driver::enter`].
    fn exit(&mut self, info: &TypeInfo) {
        let _ = info;
    }
}

/// A driver that can also read raw input.
pub trait Format: Driver {
    /// The format's own representation of a document.
    type Raw;

    /// Converts a document to the [`Value`] model.
    fn wrap(&self, raw: Self::Raw) -> Value;

    /// Parses a document from bytes.
    fn parse(&self, bytes: &[u8]) -> Result<Self::Raw, InputError>;
}

/// The raw form of a value, as seen by a custom decode hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'v> {
    /// Text found as-is in the input.
    Text(&'v str),
    /// A structured value, re-encoded by the driver.
    Encoded(Vec<u8>),
}

impl Payload<'_> {
    /// The payload as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Encoded(bytes) => bytes,
        }
    }

    /// The payload as text. Fails if re-encoded bytes are not UTF-8.
    pub fn as_text(&self) -> Result<&str, BoxError> {
        match self {
            Payload::Text(text) => Ok(text),
            Payload::Encoded(bytes) => core::str::from_utf8(bytes).map_err(Into::into),
        }
    }

    fn lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }
}

impl fmt::Display for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lossy())
    }
}
