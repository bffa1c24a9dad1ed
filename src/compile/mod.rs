//! The schema compiler: turns type metadata into [`Plan`]s.
//!
//! Everything that can be checked about a schema is checked here, once, so
//! that a plan never looks at metadata again while decoding.

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;

use log::{trace, warn};
use owo_colors::OwoColorize;

use crate::{
    BoxError, ConfigError, ConfigErrorKind, Driver, Fallback, Hooks, Kind, Plan, PlanKind,
    Producer, Schema, Tags, TypeInfo, Value,
};

mod custom;
mod map;
mod pointer;
mod record;
mod scalar;
mod sequence;

pub use record::{FieldShape, Method, MethodTable, RecordShape};

/// Options shared by every plan built for one deserializer.
#[derive(Debug, Clone)]
pub struct StaticOptions {
    /// The metadata key holding public names, e.g. `json`.
    pub tag_name: String,
    /// Whether the driver can represent nested records and sequences.
    pub allow_nested: bool,
}

/// Builds plans against one driver.
///
/// The driver is borrowed mutably so that it can track, through
/// [`Driver::enter`] and [`Driver::exit`], which shapes it is asked to
/// represent.
pub struct Compiler<'d> {
    driver: &'d mut dyn Driver,
    options: StaticOptions,
}

/// A position in the schema: the path leading to it, the metadata attached
/// to it, and what the enclosing record knows about it.
#[derive(Debug, Clone)]
pub struct Site<'a> {
    pub(crate) path: String,
    pub(crate) tags: Tags,
    pub(crate) preinitialized: bool,
    pub(crate) methods: Option<&'a MethodTable>,
    pub(crate) checked: bool,
    pub(crate) root: bool,
}

impl<'a> Site<'a> {
    /// The root of a deserializer, labelled `path`.
    pub fn root(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            tags: Tags::new(),
            preinitialized: false,
            methods: None,
            checked: true,
            root: true,
        }
    }

    /// Human-readable path to this position.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Metadata attached to this position.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Whether an ancestor fills this position before input is applied.
    pub fn is_preinitialized(&self) -> bool {
        self.preinitialized
    }

    /// A child position without metadata of its own, such as an element.
    pub fn nested(&self, path: impl Into<String>) -> Site<'a> {
        Site {
            path: path.into(),
            tags: Tags::new(),
            preinitialized: self.tags.is_preinitialized(),
            methods: None,
            checked: true,
            root: false,
        }
    }

    /// The same position, seen through a wrapper that adds no structure.
    pub fn transparent(&self) -> Site<'a> {
        Site {
            checked: false,
            ..self.clone()
        }
    }
}

/// How a type reads a `default` literal.
pub enum DefaultRule<T> {
    /// Any literal the parser accepts. Parsed once at compile time; every
    /// decode that needs it gets a copy.
    Parse {
        /// Reads the literal.
        parse: Arc<dyn Fn(&str) -> Result<T, BoxError> + Send + Sync>,
        /// Copies the parsed value.
        copy: fn(&T) -> T,
    },
    /// Any literal the type's text hook accepts. Checked at compile time,
    /// decoded again for every decode that needs it, as the type need not be
    /// `Clone`.
    Text(Arc<dyn Fn(&str) -> Result<T, BoxError> + Send + Sync>),
    /// Exactly one literal, such as `nil` or `[]`.
    Literal {
        /// The accepted literal.
        literal: &'static str,
        /// The kind of type, for error messages.
        what: &'static str,
        /// Produces the value.
        make: fn() -> T,
    },
    /// `{}`: decode from an empty dictionary.
    Record,
    /// No literal at all.
    Unsupported,
}

impl<'d> Compiler<'d> {
    /// A compiler for `driver`, reading public names under `tag_name`.
    pub fn new(driver: &'d mut dyn Driver, tag_name: impl Into<String>) -> Self {
        let allow_nested = driver.allows_nesting();
        Self {
            driver,
            options: StaticOptions {
                tag_name: tag_name.into(),
                allow_nested,
            },
        }
    }

    /// The options every plan is built with.
    pub fn options(&self) -> &StaticOptions {
        &self.options
    }

    /// Compiles `T` at `site`, honoring its capability hooks.
    pub fn compile<T: Schema>(&mut self, site: &Site<'_>) -> Result<Plan<T>, ConfigError> {
        let info = TypeInfo::of::<T>();
        trace!("Compiling {} at {}", info.name.blue(), site.path.yellow());
        if site.checked {
            self.driver.enter(&site.path, &info)?;
        }
        let result = self.compile_entered::<T>(site, &info, T::hooks());
        if site.checked {
            self.driver.exit(&info);
        }
        result.map_err(|err| match info.kind {
            Kind::Record => err.context(format!(
                "could not generate a deserializer for {} with type {}",
                site.path, info.name
            )),
            _ => err,
        })
    }

    fn compile_entered<T: Schema>(
        &mut self,
        site: &Site<'_>,
        info: &TypeInfo,
        hooks: Hooks<T>,
    ) -> Result<Plan<T>, ConfigError> {
        let plan = if let Some(hook) = hooks.dict {
            if hooks.initializer.is_some() {
                warn!(
                    "At {}, type {} supports both an initializer and a dict decoder, defaulting to the dict decoder",
                    site.path, info.name
                );
            }
            self.dict_hook(site, hook)?
        } else if self.driver.should_custom_decode(info) {
            if hooks.initializer.is_some() && hooks.json.is_some() {
                warn!(
                    "At {}, type {} supports both an initializer and a raw decoder, defaulting to the raw decoder",
                    site.path, info.name
                );
            }
            if hooks.json.is_none() && (self.options.allow_nested || info.kind != Kind::Record) {
                trace!("{} accepts two shapes, combining", info.name.blue());
                let structured = T::compile(self, site)?.validated(hooks.validator);
                let custom = self.custom::<T>(site, false)?.validated(hooks.validator);
                return Ok(Plan::combined(structured, custom));
            }
            self.custom::<T>(site, true)?
        } else {
            T::compile(self, site)?
        };
        Ok(plan.validated(hooks.validator))
    }

    /// Resolves what happens at `site` when no input is present, checking
    /// `default` and `orMethod` against `rule`.
    pub fn fallback<T: Schema>(
        &self,
        site: &Site<'_>,
        rule: DefaultRule<T>,
    ) -> Result<Fallback<T>, ConfigError> {
        let literal = site.tags.default_literal();
        let method = site.tags.method_name();
        if literal.is_some() && method.is_some() {
            return Err(ConfigError::new(
                site.path.clone(),
                ConfigErrorKind::DefaultAndConstructor,
            ));
        }
        let walks = matches!(rule, DefaultRule::Record);

        let default = match literal {
            None => None,
            Some(literal) => Some(self.default_value(site, literal, rule)?),
        };
        let constructor = match method {
            None => None,
            Some(name) => Some(Fallback::Constructor(self.constructor::<T>(site, name)?)),
        };

        Ok(if site.preinitialized {
            if walks { Fallback::Walk } else { Fallback::Accept }
        } else {
            default.or(constructor).unwrap_or(Fallback::Missing)
        })
    }

    fn default_value<T: Schema>(
        &self,
        site: &Site<'_>,
        literal: &str,
        rule: DefaultRule<T>,
    ) -> Result<Fallback<T>, ConfigError> {
        match rule {
            DefaultRule::Parse { parse, copy } => {
                let value = parse(literal).map_err(|source| {
                    ConfigError::new(
                        site.path.clone(),
                        ConfigErrorKind::UnparsableDefault { source },
                    )
                })?;
                let make: Producer<T> =
                    Arc::new(move || -> Result<T, BoxError> { Ok(copy(&value)) });
                Ok(Fallback::Value(make))
            }
            DefaultRule::Text(parse) => {
                parse(literal).map_err(|source| {
                    ConfigError::new(
                        site.path.clone(),
                        ConfigErrorKind::UnparsableDefault { source },
                    )
                })?;
                let literal = String::from(literal);
                let make: Producer<T> = Arc::new(move || parse(&literal));
                Ok(Fallback::Value(make))
            }
            DefaultRule::Literal {
                literal: accepted,
                what,
                make,
            } => {
                if literal != accepted {
                    return Err(ConfigError::new(
                        site.path.clone(),
                        ConfigErrorKind::InvalidDefault {
                            what,
                            accepted,
                            got: literal.into(),
                        },
                    ));
                }
                let make: Producer<T> = Arc::new(move || -> Result<T, BoxError> { Ok(make()) });
                Ok(Fallback::Value(make))
            }
            DefaultRule::Record => {
                if literal != "{}" {
                    return Err(ConfigError::new(
                        site.path.clone(),
                        ConfigErrorKind::InvalidDefault {
                            what: "records",
                            accepted: "{}",
                            got: literal.into(),
                        },
                    ));
                }
                Ok(Fallback::Walk)
            }
            DefaultRule::Unsupported => Err(ConfigError::new(
                site.path.clone(),
                ConfigErrorKind::UnsupportedDefault {
                    type_name: T::type_name(),
                    got: literal.into(),
                },
            )),
        }
    }

    fn constructor<T: Schema>(&self, site: &Site<'_>, name: &str) -> Result<Producer<T>, ConfigError> {
        let table = site.methods;
        let Some(method) = table.and_then(|table| table.lookup(name)) else {
            return Err(ConfigError::new(
                site.path.clone(),
                ConfigErrorKind::UnknownMethod {
                    name: name.into(),
                    record: table.map_or_else(|| String::from("<none>"), |table| table.owner.clone()),
                },
            ));
        };
        method.typed::<T>().ok_or_else(|| {
            ConfigError::new(
                site.path.clone(),
                ConfigErrorKind::MethodReturnType {
                    name: name.into(),
                    expected: T::type_name(),
                    actual: method.type_name(),
                },
            )
        })
    }

    /// A single-field wrapper decoded exactly like its field.
    pub fn newtype<T: Schema, F: Schema>(
        &mut self,
        site: &Site<'_>,
        project: fn(&mut T) -> &mut F,
    ) -> Result<Plan<T>, ConfigError> {
        let inner = self.compile::<F>(&site.transparent())?;
        Ok(Plan::new(PlanKind::Newtype, move |frame, input, slot: &mut T| {
            inner.decode(frame, input, project(slot))
        }))
    }

    /// A raw representation type, cloned out of the input. `extract` returns
    /// `None` if the input has the wrong shape; `empty` backs the `{}` default.
    pub fn passthrough<T: Schema>(
        &mut self,
        site: &Site<'_>,
        extract: fn(&Value) -> Option<T>,
        empty: fn() -> T,
    ) -> Result<Plan<T>, ConfigError> {
        let fallback = self.fallback(
            site,
            DefaultRule::Literal {
                literal: "{}",
                what: "dictionaries",
                make: empty,
            },
        )?;
        let expected = T::type_name();
        Ok(Plan::resolving(
            PlanKind::Dynamic,
            expected.clone(),
            fallback,
            move |frame, value, slot| match extract(value) {
                Some(extracted) => {
                    *slot = extracted;
                    Ok(())
                }
                None => Err(frame.invalid(&expected, value)),
            },
        ))
    }
}

impl core::fmt::Debug for Compiler<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Compiler")
            .field("driver", &self.driver.source())
            .field("options", &self.options)
            .finish()
    }
}
