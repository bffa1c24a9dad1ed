use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use std::collections::HashMap;

use log::trace;
use owo_colors::OwoColorize;

use super::{Driver, Format, Payload};
use crate::{BoxError, ConfigError, Dict, InputError, Kind, TypeInfo, Value};

/// A flat multimap, as produced by query strings and form bodies.
pub type KvList = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Record,
    Sequence,
    Leaf,
    Transparent,
}

/// Driver for flat key to string-list documents.
///
/// Such a document can only represent one record of leaves, or of sequences
/// of leaves. A leaf is a scalar, or a type that decodes itself from text.
/// Anything deeper is rejected while compiling.
#[derive(Debug, Default)]
pub struct ListDriver {
    levels: Vec<Level>,
}

impl ListDriver {
    /// A driver with no compilation in progress.
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> Option<Level> {
        self.levels
            .iter()
            .rev()
            .copied()
            .find(|level| *level != Level::Transparent)
    }
}

fn unsupported(at: &str, info: &TypeInfo) -> ConfigError {
    ConfigError::unsupported_shape(
        at,
        format!(
            "list deserialization expects a record of sequences of trivially decodable types, but at {at}, got {}",
            info.name
        ),
    )
}

impl Driver for ListDriver {
    fn source(&self) -> &'static str {
        "kvlist"
    }

    fn allows_nesting(&self) -> bool {
        false
    }

    fn should_custom_decode(&self, info: &TypeInfo) -> bool {
        info.capabilities.text
    }

    fn payload<'v>(&self, value: &'v Value) -> Result<Payload<'v>, BoxError> {
        let value = self.leaf(value)?;
        match value.as_str() {
            Some(text) => Ok(Payload::Text(text)),
            None => Err(format!("expected a string, got {value}").into()),
        }
    }

    fn leaf<'v>(&self, value: &'v Value) -> Result<&'v Value, String> {
        match value.as_sequence() {
            Some([single]) => Ok(single),
            Some(items) => Err(format!(
                "a list of {} values, which cannot fit into a single entry",
                items.len()
            )),
            None => Ok(value),
        }
    }

    fn enter(&mut self, at: &str, info: &TypeInfo) -> Result<(), ConfigError> {
        let level = if matches!(info.kind, Kind::Pointer { .. }) {
            Level::Transparent
        } else {
            match self.current() {
                None if info.kind == Kind::Record => Level::Record,
                None => {
                    return Err(ConfigError::unsupported_shape(
                        at,
                        format!("list deserialization expects a record, got {}", info.name),
                    ));
                }
                Some(Level::Record) if info.is_leaf() => Level::Leaf,
                Some(Level::Record) => match info.kind {
                    Kind::Sequence { .. } => Level::Sequence,
                    Kind::Record => {
                        return Err(ConfigError::unsupported_shape(
                            at,
                            "this type of extractor does not support nested structs",
                        ));
                    }
                    _ => return Err(unsupported(at, info)),
                },
                Some(Level::Sequence) if info.is_leaf() => Level::Leaf,
                Some(Level::Sequence) => match info.kind {
                    Kind::Sequence { .. } => {
                        return Err(ConfigError::unsupported_shape(
                            at,
                            "this type of extractor does not support nested arrays",
                        ));
                    }
                    Kind::Record => {
                        return Err(ConfigError::unsupported_shape(
                            at,
                            "this type of extractor does not support nested structs",
                        ));
                    }
                    _ => return Err(unsupported(at, info)),
                },
                Some(Level::Leaf | Level::Transparent) => Level::Leaf,
            }
        };
        trace!("Entering {} as {:?}", info.name.blue(), level.yellow());
        self.levels.push(level);
        Ok(())
    }

    fn exit(&mut self, _info: &TypeInfo) {
        self.levels.pop();
    }
}

impl Format for ListDriver {
    type Raw = KvList;

    fn wrap(&self, raw: KvList) -> Value {
        raw.into_iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(key, values)| {
                let values = values.into_iter().map(Value::string).collect::<Vec<_>>();
                (key, Value::Sequence(values))
            })
            .collect::<Dict>()
            .into_value()
    }

    fn parse(&self, bytes: &[u8]) -> Result<KvList, InputError> {
        serde_json::from_slice(bytes).map_err(|err| InputError::json(&err, bytes))
    }
}
