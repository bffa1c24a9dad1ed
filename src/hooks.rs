//! Capability hooks a target type may opt into.
//!
//! Every hook receives `&mut self`: the staging instance is handed over by
//! exclusive reference, so a hook can never mutate a throwaway copy.

use core::str::FromStr;

use crate::{BoxError, Dict};

/// Pre-populates a value before input is applied.
pub trait Initializer {
    /// Fills defaults, including private fields.
    fn initialize(&mut self) -> Result<(), BoxError>;
}

/// Checks, and possibly completes, a fully decoded value.
pub trait Validator {
    /// Rejects the value with an error, or accepts it.
    fn validate(&mut self) -> Result<(), BoxError>;
}

/// Decodes a value from its textual representation.
pub trait UnmarshalText {
    /// Replaces `self` with the value described by `text`.
    fn unmarshal_text(&mut self, text: &str) -> Result<(), BoxError>;
}

/// Decodes a value from raw JSON bytes.
pub trait UnmarshalJson {
    /// Replaces `self` with the value encoded in `bytes`.
    fn unmarshal_json(&mut self, bytes: &[u8]) -> Result<(), BoxError>;
}

/// Decodes a value directly from a dictionary, bypassing per-field decoding.
pub trait UnmarshalDict {
    /// Replaces `self` with the value described by `dict`.
    fn unmarshal_dict(&mut self, dict: &Dict) -> Result<(), BoxError>;
}

/// A hook with no input.
pub type HookFn<T> = fn(&mut T) -> Result<(), BoxError>;
/// A hook reading text.
pub type TextHookFn<T> = fn(&mut T, &str) -> Result<(), BoxError>;
/// A hook reading raw bytes.
pub type RawHookFn<T> = fn(&mut T, &[u8]) -> Result<(), BoxError>;
/// A hook reading a dictionary.
pub type DictHookFn<T> = fn(&mut T, &Dict) -> Result<(), BoxError>;

/// The capability set of a type, detected once and stored in its plan.
pub struct Hooks<T> {
    pub(crate) initializer: Option<HookFn<T>>,
    pub(crate) validator: Option<HookFn<T>>,
    pub(crate) text: Option<TextHookFn<T>>,
    pub(crate) json: Option<RawHookFn<T>>,
    pub(crate) dict: Option<DictHookFn<T>>,
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Hooks<T> {}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            initializer: None,
            validator: None,
            text: None,
            json: None,
            dict: None,
        }
    }
}

impl<T> core::fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hooks")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

impl<T> Hooks<T> {
    /// No capability at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the type's [`Initializer`] impl.
    pub fn initializer(self) -> Self
    where
        T: Initializer,
    {
        self.with_initializer(T::initialize as HookFn<T>)
    }

    /// Uses the type's [`Validator`] impl.
    pub fn validator(self) -> Self
    where
        T: Validator,
    {
        self.with_validator(T::validate as HookFn<T>)
    }

    /// Uses the type's [`UnmarshalText`] impl.
    pub fn text(self) -> Self
    where
        T: UnmarshalText,
    {
        self.with_text(T::unmarshal_text as TextHookFn<T>)
    }

    /// Decodes text through the type's [`FromStr`] impl.
    pub fn text_from_str(self) -> Self
    where
        T: FromStr,
        T::Err: Into<BoxError>,
    {
        self.with_text(|slot: &mut T, text: &str| match text.parse::<T>() {
            Ok(value) => {
                *slot = value;
                Ok(())
            }
            Err(error) => Err(error.into()),
        })
    }

    /// Uses the type's [`UnmarshalJson`] impl.
    pub fn json(self) -> Self
    where
        T: UnmarshalJson,
    {
        self.with_json(T::unmarshal_json as RawHookFn<T>)
    }

    /// Uses the type's [`UnmarshalDict`] impl.
    pub fn dict(self) -> Self
    where
        T: UnmarshalDict,
    {
        self.with_dict(T::unmarshal_dict as DictHookFn<T>)
    }

    /// Sets the pre-initializer.
    pub fn with_initializer(mut self, hook: HookFn<T>) -> Self {
        self.initializer = Some(hook);
        self
    }

    /// Sets the validator.
    pub fn with_validator(mut self, hook: HookFn<T>) -> Self {
        self.validator = Some(hook);
        self
    }

    /// Sets the text decoder.
    pub fn with_text(mut self, hook: TextHookFn<T>) -> Self {
        self.text = Some(hook);
        self
    }

    /// Sets the raw JSON decoder.
    pub fn with_json(mut self, hook: RawHookFn<T>) -> Self {
        self.json = Some(hook);
        self
    }

    /// Sets the dictionary decoder.
    pub fn with_dict(mut self, hook: DictHookFn<T>) -> Self {
        self.dict = Some(hook);
        self
    }

    /// Which hooks are present.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            initializer: self.initializer.is_some(),
            validator: self.validator.is_some(),
            text: self.text.is_some(),
            json: self.json.is_some(),
            dict: self.dict.is_some(),
        }
    }
}

/// Type-erased view of a [`Hooks`] table, for drivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Has a pre-initializer.
    pub initializer: bool,
    /// Has a validator.
    pub validator: bool,
    /// Can decode from text.
    pub text: bool,
    /// Can decode from raw JSON.
    pub json: bool,
    /// Can decode from a dictionary.
    pub dict: bool,
}
