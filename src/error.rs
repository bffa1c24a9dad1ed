use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::{self, Display};

use miette::{Diagnostic, LabeledSpan, SourceCode};

use crate::{Span, TagError};

/// Failure reported by a user hook: an initializer, a validator, a
/// constructor or a custom decoder.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Which user-supplied operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `Initializer::initialize`.
    Initializer,
    /// A named `orMethod` constructor.
    Constructor,
    /// Materializing a pre-parsed `default` literal.
    Default,
}

impl Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Initializer => write!(f, "initializer"),
            Operation::Constructor => write!(f, "orMethod"),
            Operation::Default => write!(f, "default"),
        }
    }
}

/// Structural position of a failing user hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// The root record.
    Outer,
    /// A nested record.
    Record,
    /// A map.
    Map,
    /// A pointer.
    Pointer,
    /// Any other field.
    Field,
}

impl Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Outer => write!(f, "outer"),
            Context::Record => write!(f, "record"),
            Context::Map => write!(f, "map"),
            Context::Pointer => write!(f, "pointer"),
            Context::Field => write!(f, "field"),
        }
    }
}

/// Error returned by a decode call.
#[derive(Debug)]
pub struct DeserError {
    path: String,
    kind: DeserErrorKind,
}

/// What went wrong while decoding.
#[derive(Debug)]
pub enum DeserErrorKind {
    /// No input, no default, no constructor and no pre-initialization.
    MissingValue {
        /// Name of the type that was expected.
        expected: String,
    },
    /// Input present but of the wrong shape or out of range.
    InvalidValue {
        /// Name of the type that was expected.
        expected: String,
        /// Description of the input.
        got: String,
    },
    /// Input present but rejected by a custom decode hook.
    Unparsable {
        /// Name of the type that was expected.
        expected: String,
        /// The hook's error.
        source: BoxError,
    },
    /// A fixed-size array received the wrong number of elements.
    LengthMismatch {
        /// Length of the array type.
        expected: usize,
        /// Number of elements in the input.
        actual: usize,
    },
    /// A validator rejected the decoded value.
    Validation {
        /// The validator's error.
        source: BoxError,
    },
    /// A user hook other than a validator failed.
    Custom {
        /// Which hook.
        operation: Operation,
        /// Where in the structure.
        context: Context,
        /// The hook's error.
        source: BoxError,
    },
    /// The raw input could not be parsed into a value tree.
    Syntax(InputError),
}

impl DeserError {
    /// Creates an error at the given rendered path.
    pub fn new(path: impl Into<String>, kind: DeserErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub(crate) fn syntax(error: InputError) -> Self {
        Self::new(String::new(), DeserErrorKind::Syntax(error))
    }

    /// Where the error happened, rendered.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// What went wrong.
    pub fn kind(&self) -> &DeserErrorKind {
        &self.kind
    }

    /// Consumes the error, returning what went wrong.
    pub fn into_kind(self) -> DeserErrorKind {
        self.kind
    }

    /// `true` if a validator rejected the value. Such errors describe bad
    /// input, never a bug in the schema.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind, DeserErrorKind::Validation { .. })
    }

    /// `true` if the value was absent with no way to fill it.
    pub fn is_missing(&self) -> bool {
        matches!(self.kind, DeserErrorKind::MissingValue { .. })
    }

    /// `true` if a user hook other than a validator failed.
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, DeserErrorKind::Custom { .. })
    }
}

impl Display for DeserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        match &self.kind {
            DeserErrorKind::MissingValue { expected } => {
                write!(f, "missing value at {path}, expected {expected}")
            }
            DeserErrorKind::InvalidValue { expected, got } => {
                write!(f, "invalid value at {path}, expected {expected}, got {got}")
            }
            DeserErrorKind::Unparsable { expected, source } => write!(
                f,
                "invalid value at {path}, expected to be able to parse a {expected}:\n\t * {source}"
            ),
            DeserErrorKind::LengthMismatch { expected, actual } => write!(
                f,
                "invalid value at {path}, expected an array of length {expected}, got length {actual}"
            ),
            DeserErrorKind::Validation { source } => {
                write!(f, "deserialized value {path} did not pass validation\n\t * {source}")
            }
            DeserErrorKind::Custom {
                operation: Operation::Initializer,
                source,
                ..
            } => write!(
                f,
                "at {path}, encountered an error while initializing optional fields:\n\t * {source}"
            ),
            DeserErrorKind::Custom {
                operation: Operation::Constructor,
                source,
                ..
            } => write!(f, "error in optional value at {path}\n\t * {source}"),
            DeserErrorKind::Custom {
                operation: Operation::Default,
                source,
                ..
            } => write!(f, "error in default value at {path}\n\t * {source}"),
            DeserErrorKind::Syntax(error) => write!(f, "{error}"),
        }
    }
}

impl core::error::Error for DeserError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            DeserErrorKind::Unparsable { source, .. }
            | DeserErrorKind::Validation { source }
            | DeserErrorKind::Custom { source, .. } => Some(source.as_ref()),
            DeserErrorKind::Syntax(error) => Some(error),
            DeserErrorKind::MissingValue { .. }
            | DeserErrorKind::InvalidValue { .. }
            | DeserErrorKind::LengthMismatch { .. } => None,
        }
    }
}

impl Diagnostic for DeserError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match &self.kind {
            DeserErrorKind::MissingValue { .. } => "tagplan::missing_value",
            DeserErrorKind::InvalidValue { .. } => "tagplan::invalid_value",
            DeserErrorKind::Unparsable { .. } => "tagplan::unparsable",
            DeserErrorKind::LengthMismatch { .. } => "tagplan::length_mismatch",
            DeserErrorKind::Validation { .. } => "tagplan::validation",
            DeserErrorKind::Custom { .. } => "tagplan::custom",
            DeserErrorKind::Syntax(_) => "tagplan::syntax",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match &self.kind {
            DeserErrorKind::MissingValue { .. } => Some(Box::new(
                "provide this value, or declare a `default` or an `orMethod` for it",
            )),
            DeserErrorKind::Custom { operation, context, .. } => Some(Box::new(alloc::format!(
                "the {operation} hook failed in {context} position"
            ))),
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match &self.kind {
            DeserErrorKind::Syntax(error) => error.source_code(),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match &self.kind {
            DeserErrorKind::Syntax(error) => error.labels(),
            _ => None,
        }
    }
}

/// Raw input that is not well-formed for its format.
#[derive(Debug)]
pub struct InputError {
    message: String,
    span: Span,
    source_code: String,
}

impl InputError {
    /// Creates an input error pointing at `span` inside `source`.
    pub fn new(message: impl Into<String>, span: Span, source: &[u8]) -> Self {
        Self {
            message: message.into(),
            span,
            source_code: String::from_utf8_lossy(source).into_owned(),
        }
    }

    pub(crate) fn json(error: &serde_json::Error, source: &[u8]) -> Self {
        let span = Span::at_line_column(source, error.line(), error.column());
        Self::new(error.to_string(), span, source)
    }

    /// Where in the input the problem is.
    pub fn span(&self) -> Span {
        self.span
    }
}

impl Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed input: {}", self.message)
    }
}

impl core::error::Error for InputError {}

impl Diagnostic for InputError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new("tagplan::syntax"))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = LabeledSpan::new_with_span(Some(self.message.clone()), self.span);
        Some(Box::new(core::iter::once(label)))
    }
}

/// A schema that cannot be turned into a deserializer.
///
/// These are always reported by `make_*_deserializer`, never while decoding.
#[derive(Debug)]
pub struct ConfigError {
    path: String,
    kind: ConfigErrorKind,
    context: Vec<String>,
}

/// Why a schema was rejected.
#[derive(Debug)]
pub enum ConfigErrorKind {
    /// A required option was left empty.
    MissingOption(&'static str),
    /// The root type is not a record.
    NotARecord {
        /// Name of the root type.
        type_name: String,
    },
    /// Field metadata could not be parsed.
    MalformedTags(TagError),
    /// A field that cannot receive input and that nothing pre-populates.
    PrivateField {
        /// The record owning the field.
        record: String,
        /// The field's native name.
        field: String,
    },
    /// `default` and `orMethod` on the same field.
    DefaultAndConstructor,
    /// `orMethod` names a method the record does not register.
    UnknownMethod {
        /// The method name.
        name: String,
        /// The record that was searched.
        record: String,
    },
    /// `orMethod` names a method returning another type than the field's.
    MethodReturnType {
        /// The method name.
        name: String,
        /// The field's type.
        expected: String,
        /// The method's return type.
        actual: &'static str,
    },
    /// A `default` literal not allowed for this kind of type.
    InvalidDefault {
        /// Kind of type, e.g. "pointers".
        what: &'static str,
        /// The one accepted literal.
        accepted: &'static str,
        /// The literal that was given.
        got: String,
    },
    /// A `default` on a type that has no way to read literals.
    UnsupportedDefault {
        /// The field's type.
        type_name: String,
        /// The literal that was given.
        got: String,
    },
    /// A `default` literal the type's parser rejects.
    UnparsableDefault {
        /// The parser's error.
        source: BoxError,
    },
    /// A map whose keys are not strings or text-decodable.
    UnsupportedMapKey {
        /// The map type.
        type_name: String,
        /// The key type.
        key: String,
    },
    /// `flatten` on a field that is not a record.
    FlattenNonRecord {
        /// The field's type.
        type_name: String,
    },
    /// A shape the driver cannot represent.
    UnsupportedShape {
        /// The driver's explanation.
        message: String,
    },
}

impl ConfigError {
    /// Creates an error about the schema element at `path`.
    pub fn new(path: impl Into<String>, kind: ConfigErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
            context: Vec::new(),
        }
    }

    /// A shape the driver cannot represent, for use by drivers.
    pub fn unsupported_shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            path,
            ConfigErrorKind::UnsupportedShape {
                message: message.into(),
            },
        )
    }

    /// Prepends a line of context.
    pub fn context(mut self, line: impl Into<String>) -> Self {
        self.context.push(line.into());
        self
    }

    /// Where in the schema the problem is.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Why the schema was rejected.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.context.iter().rev() {
            write!(f, "{line}:\n\t * ")?;
        }
        let path = &self.path;
        match &self.kind {
            ConfigErrorKind::MissingOption(option) => write!(f, "missing option {option}"),
            ConfigErrorKind::NotARecord { type_name } => write!(
                f,
                "invalid call to make a record deserializer: {type_name} is not a record"
            ),
            ConfigErrorKind::MalformedTags(error) => {
                write!(f, "at {path}, invalid metadata:\n\t * {error}")
            }
            ConfigErrorKind::PrivateField { record, field } => write!(
                f,
                "record {record} contains a field \"{field}\" that is not public, you should either make it public or give {record} an initializer or a custom decode hook"
            ),
            ConfigErrorKind::DefaultAndConstructor => write!(
                f,
                "at {path}, cannot specify both a `default` and an `orMethod`"
            ),
            ConfigErrorKind::UnknownMethod { name, record } => write!(
                f,
                "at {path}, failed to setup `orMethod`:\n\t * method {name} doesn't seem to exist on {record}"
            ),
            ConfigErrorKind::MethodReturnType {
                name,
                expected,
                actual,
            } => write!(
                f,
                "at {path}, failed to setup `orMethod`:\n\t * method {name} MUST return ({expected}, error) but it returns ({actual}, _)"
            ),
            ConfigErrorKind::InvalidDefault { what, accepted, got } => write!(
                f,
                "at {path}, invalid `default` value. The only supported `default` value for {what} is \"{accepted}\", got: {got}"
            ),
            ConfigErrorKind::UnsupportedDefault { type_name, got } => write!(
                f,
                "at {path}, cannot specify a default value \"{got}\" for type {type_name}, as there is no parser for such values"
            ),
            ConfigErrorKind::UnparsableDefault { source } => {
                write!(f, "cannot parse default value at {path}\n\t * {source}")
            }
            ConfigErrorKind::UnsupportedMapKey { type_name, key } => write!(
                f,
                "invalid map type at {path}, only maps keyed by strings or text-decodable types can be converted into a deserializer, {type_name} is keyed by {key}"
            ),
            ConfigErrorKind::FlattenNonRecord { type_name } => write!(
                f,
                "at {path}, `flatten` only applies to records, got {type_name}"
            ),
            ConfigErrorKind::UnsupportedShape { message } => write!(f, "{message}"),
        }
    }
}

impl core::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            ConfigErrorKind::MalformedTags(error) => Some(error),
            ConfigErrorKind::UnparsableDefault { source } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl Diagnostic for ConfigError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        let code = match &self.kind {
            ConfigErrorKind::MissingOption(_) => "tagplan::config::missing_option",
            ConfigErrorKind::NotARecord { .. } => "tagplan::config::not_a_record",
            ConfigErrorKind::MalformedTags(_) => "tagplan::config::malformed_tags",
            ConfigErrorKind::PrivateField { .. } => "tagplan::config::private_field",
            ConfigErrorKind::DefaultAndConstructor => "tagplan::config::default_and_constructor",
            ConfigErrorKind::UnknownMethod { .. } => "tagplan::config::unknown_method",
            ConfigErrorKind::MethodReturnType { .. } => "tagplan::config::method_return_type",
            ConfigErrorKind::InvalidDefault { .. }
            | ConfigErrorKind::UnsupportedDefault { .. }
            | ConfigErrorKind::UnparsableDefault { .. } => "tagplan::config::default",
            ConfigErrorKind::UnsupportedMapKey { .. } => "tagplan::config::map_key",
            ConfigErrorKind::FlattenNonRecord { .. } => "tagplan::config::flatten",
            ConfigErrorKind::UnsupportedShape { .. } => "tagplan::config::shape",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match &self.kind {
            ConfigErrorKind::DefaultAndConstructor => {
                Some(Box::new("keep either the `default` or the `orMethod`"))
            }
            ConfigErrorKind::UnknownMethod { .. } => Some(Box::new(
                "register the method with `Method::new` or `#[schema(or_method = \"...\")]`",
            )),
            _ => None,
        }
    }
}

impl From<ConfigError> for String {
    fn from(error: ConfigError) -> Self {
        error.to_string()
    }
}
