//! The public entry points: building a deserializer and running it.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use log::trace;
use owo_colors::OwoColorize;

use crate::{
    Compiler, ConfigError, ConfigErrorKind, DeserError, Dict, DictDriver, Format, Frame, KvList, Kind,
    ListDriver, Path, Plan, Schema, Segment, Site, Value,
};

/// Construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// The metadata key holding public field names, e.g. `json`. Required.
    pub tag_name: String,
    /// A label prepended to every path in error messages.
    pub root_label: Option<String>,
}

impl Options {
    /// Options reading public names under `tag_name`.
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            root_label: None,
        }
    }

    /// Public names under `json`.
    pub fn json() -> Self {
        Self::new("json")
    }

    /// Public names under `query`.
    pub fn query() -> Self {
        Self::new("query")
    }

    /// Sets the label prepended to error paths, e.g. `Request.Body`.
    pub fn with_root_label(mut self, label: impl Into<String>) -> Self {
        self.root_label = Some(label.into());
        self
    }
}

/// A compiled deserializer for `T`, reading the format of `D`.
///
/// Building one checks the whole schema; decoding never fails because of
/// the schema. A deserializer is immutable and can be shared across threads.
pub struct Deserializer<T, D> {
    plan: Plan<T>,
    driver: D,
    root: String,
}

/// A deserializer for nested documents.
pub type DictDeserializer<T> = Deserializer<T, DictDriver>;

/// A deserializer for flat multimaps.
pub type ListDeserializer<T> = Deserializer<T, ListDriver>;

impl<T: Schema, D: Format> Deserializer<T, D> {
    /// Compiles the plan for `T` against `driver`.
    pub fn new(options: Options, mut driver: D) -> Result<Self, ConfigError> {
        if options.tag_name.is_empty() {
            return Err(ConfigError::new(
                String::new(),
                ConfigErrorKind::MissingOption("tag_name"),
            ));
        }
        let type_name = T::type_name();
        if T::kind() != Kind::Record {
            return Err(ConfigError::new(
                type_name.clone(),
                ConfigErrorKind::NotARecord { type_name },
            ));
        }
        let root = match &options.root_label {
            Some(label) => format!("{label}.{type_name}"),
            None => type_name,
        };
        trace!(
            "Building a {} deserializer for {}",
            driver.source().yellow(),
            root.blue()
        );
        let plan =
            Compiler::new(&mut driver, options.tag_name).compile::<T>(&Site::root(&*root))?;
        Ok(Self { plan, driver, root })
    }

    /// The label errors are reported under.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Decodes an already-wrapped input tree.
    pub fn decode_value(&self, value: &Value) -> Result<T, DeserError> {
        let path = Path::root(&self.root);
        self.decode_at(&path, value)
    }

    fn decode_at(&self, path: &Path<'_>, value: &Value) -> Result<T, DeserError> {
        let frame = Frame::new(&self.driver, path);
        let mut result = T::default();
        self.plan.decode(&frame, Some(value), &mut result)?;
        Ok(result)
    }

    /// Decodes a document in the driver's own representation.
    pub fn decode_raw(&self, raw: D::Raw) -> Result<T, DeserError> {
        self.decode_value(&self.driver.wrap(raw))
    }

    /// Parses and decodes a document.
    pub fn decode_from_bytes(&self, bytes: &[u8]) -> Result<T, DeserError> {
        let raw = self.driver.parse(bytes).map_err(DeserError::syntax)?;
        self.decode_raw(raw)
    }

    /// Parses and decodes a document.
    pub fn decode_from_str(&self, source: &str) -> Result<T, DeserError> {
        self.decode_from_bytes(source.as_bytes())
    }
}

impl<T: Schema> Deserializer<T, DictDriver> {
    /// Decodes a dictionary.
    pub fn decode_from_dict(&self, dict: Dict) -> Result<T, DeserError> {
        self.decode_value(&Value::Dict(dict))
    }

    /// Decodes a JSON value.
    pub fn decode_from_json(&self, json: serde_json::Value) -> Result<T, DeserError> {
        self.decode_raw(json)
    }

    /// Decodes every element, stopping at the first failure. Elements are
    /// addressed as `Root[i]` in errors.
    pub fn decode_from_dict_sequence(&self, values: &[Value]) -> Result<Vec<T>, DeserError> {
        let root = Path::root(&self.root);
        values
            .iter()
            .enumerate()
            .map(|(index, value)| {
                let path = root.push(Segment::Index(index));
                self.decode_at(&path, value)
            })
            .collect()
    }
}

impl<T: Schema> Deserializer<T, ListDriver> {
    /// Decodes a flat multimap, such as a parsed query string.
    pub fn decode_from_multimap<I, K, V, S>(&self, entries: I) -> Result<T, DeserError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: KvList = entries
            .into_iter()
            .map(|(key, values)| (key.into(), values.into_iter().map(Into::into).collect()))
            .collect();
        self.decode_raw(raw)
    }
}

impl<T, D: core::fmt::Debug> core::fmt::Debug for Deserializer<T, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Deserializer")
            .field("root", &self.root)
            .field("driver", &self.driver)
            .field("plan", &self.plan)
            .finish()
    }
}

/// Builds a deserializer for nested documents.
pub fn make_dict_deserializer<T: Schema>(
    options: Options,
) -> Result<DictDeserializer<T>, ConfigError> {
    Deserializer::new(options, DictDriver)
}

/// Builds a deserializer for flat multimaps.
pub fn make_list_deserializer<T: Schema>(
    options: Options,
) -> Result<ListDeserializer<T>, ConfigError> {
    Deserializer::new(options, ListDriver::new())
}
