use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::mem;

use log::{error, trace};
use owo_colors::OwoColorize;

use super::{DefaultRule, Site};
use crate::{
    BoxError, Compiler, ConfigError, ConfigErrorKind, Context, Dict, Kind, Operation, Plan,
    PlanKind, Producer, Schema, Segment, TagError, Tags, TypeInfo, Value,
};

type FieldCompile<R> =
    Box<dyn FnOnce(&mut Compiler<'_>, &Site<'_>) -> Result<Plan<R>, ConfigError>>;

fn field_compile<R, C>(compile: C) -> FieldCompile<R>
where
    C: FnOnce(&mut Compiler<'_>, &Site<'_>) -> Result<Plan<R>, ConfigError> + 'static,
{
    Box::new(compile)
}

/// One declared field of a record.
pub struct FieldShape<R> {
    name: &'static str,
    exported: bool,
    tags: Result<Tags, TagError>,
    type_name: fn() -> String,
    kind: fn() -> Kind,
    compile: FieldCompile<R>,
}

impl<R: Schema> FieldShape<R> {
    /// A public field named `name`, reached through `project`.
    pub fn new<F: Schema>(name: &'static str, project: fn(&mut R) -> &mut F) -> Self {
        Self {
            name,
            exported: true,
            tags: Ok(Tags::new()),
            type_name: F::type_name,
            kind: F::kind,
            compile: field_compile(move |compiler, site| {
                let plan = compiler.compile::<F>(site)?;
                Ok(Plan::new(plan.kind(), move |frame, input, record: &mut R| {
                    plan.decode(frame, input, project(record))
                }))
            }),
        }
    }

    /// Marks the field as private: it never reads input.
    pub fn private(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Adds metadata written as a struct tag, e.g. `json:"name" default:"1"`.
    pub fn tag(mut self, raw: &str) -> Self {
        self.tags = self.tags.and_then(|mut tags| {
            tags.merge(Tags::parse(raw)?)?;
            Ok(tags)
        });
        self
    }

    /// Adds one metadata key.
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.tags = self.tags.and_then(|mut tags| {
            tags.insert(key, value)?;
            Ok(tags)
        });
        self
    }
}

/// A zero-argument constructor registered on a record, for `orMethod`.
pub struct Method {
    name: &'static str,
    returns: TypeId,
    type_name: &'static str,
    make: Box<dyn Any + Send + Sync>,
}

impl Method {
    /// Registers `make` under `name`.
    pub fn new<V, E>(
        name: &'static str,
        make: impl Fn() -> Result<V, E> + Send + Sync + 'static,
    ) -> Self
    where
        V: 'static,
        E: Into<BoxError>,
    {
        let producer: Producer<V> =
            Arc::new(move || -> Result<V, BoxError> { make().map_err(Into::into) });
        Self {
            name,
            returns: TypeId::of::<V>(),
            type_name: core::any::type_name::<V>(),
            make: Box::new(producer),
        }
    }

    /// The registered name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The returned type, as written by the compiler.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The constructor, if it returns exactly `T`.
    pub fn typed<T: 'static>(&self) -> Option<Producer<T>> {
        if self.returns != TypeId::of::<T>() {
            return None;
        }
        self.make.downcast_ref::<Producer<T>>().cloned()
    }
}

/// The constructors of one record.
pub struct MethodTable {
    pub(crate) owner: String,
    methods: Vec<Method>,
}

impl MethodTable {
    /// Finds a constructor by name.
    pub fn lookup(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|method| method.name == name)
    }
}

impl core::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MethodTable")
            .field("owner", &self.owner)
            .field(
                "methods",
                &self.methods.iter().map(Method::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// The declared fields of a record, in declaration order, and its
/// constructors.
pub struct RecordShape<R> {
    fields: Vec<FieldShape<R>>,
    methods: MethodTable,
}

impl<R: Schema> Default for RecordShape<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Schema> RecordShape<R> {
    /// A record without fields.
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            methods: MethodTable {
                owner: R::type_name(),
                methods: Vec::new(),
            },
        }
    }

    /// Declares the next field.
    pub fn field(mut self, field: FieldShape<R>) -> Self {
        self.fields.push(field);
        self
    }

    /// Registers a constructor.
    pub fn method(mut self, method: Method) -> Self {
        self.methods.methods.push(method);
        self
    }
}

struct CompiledField<R> {
    label: String,
    accepts_input: bool,
    flatten: bool,
    plan: Plan<R>,
}

impl Compiler<'_> {
    /// A record, decoded field by field.
    ///
    /// Runs the record's initializer, if any, on a fresh staging value, then
    /// every field in declaration order, then commits. Validation is added by
    /// [`Compiler::compile`].
    pub fn record<R: Schema>(
        &mut self,
        site: &Site<'_>,
        shape: RecordShape<R>,
    ) -> Result<Plan<R>, ConfigError> {
        let record_name = R::type_name();
        let initializer = R::hooks().initializer;
        // Fields are walked here, so a custom decoder only covers the fields
        // that read no input.
        let custom = self.driver.should_custom_decode(&TypeInfo::of::<R>());
        let will_preinit = site.preinitialized || initializer.is_some();

        let RecordShape { fields, methods } = shape;
        let mut compiled = Vec::with_capacity(fields.len());
        for field in fields {
            let tags = field.tags.map_err(|err| {
                ConfigError::new(
                    format!("{}.{}", site.path, field.name),
                    ConfigErrorKind::MalformedTags(err),
                )
            })?;
            let label = tags
                .public_name(&self.options.tag_name)
                .unwrap_or(field.name)
                .to_owned();
            let accepts_input = field.exported && label != "-";
            let kind = (field.kind)();
            if !accepts_input && !will_preinit && !custom && kind != Kind::Marker {
                return Err(ConfigError::new(
                    site.path.clone(),
                    ConfigErrorKind::PrivateField {
                        record: record_name.clone(),
                        field: field.name.to_owned(),
                    },
                ));
            }
            let path = format!("{}.{label}", site.path);
            let flatten = tags.is_flattened();
            if flatten && kind != Kind::Record {
                return Err(ConfigError::new(
                    path,
                    ConfigErrorKind::FlattenNonRecord {
                        type_name: (field.type_name)(),
                    },
                ));
            }
            let child = Site {
                path,
                preinitialized: will_preinit
                    || tags.is_preinitialized()
                    || (custom && !accepts_input),
                tags,
                methods: Some(&methods),
                checked: !flatten,
                root: false,
            };
            let plan = (field.compile)(self, &child)?;
            compiled.push(CompiledField {
                label,
                accepts_input,
                flatten,
                plan,
            });
        }

        let mut preinit_site = site.clone();
        preinit_site.preinitialized |= initializer.is_some();
        let fallback = self.fallback(&preinit_site, DefaultRule::Record)?;
        let context = if site.root {
            Context::Outer
        } else {
            Context::Record
        };
        let preinitialized = site.preinitialized;
        let expected = record_name.clone();

        Ok(Plan::resolving(
            PlanKind::Record,
            expected.clone(),
            fallback,
            move |frame, value, slot: &mut R| {
                trace!("Decoding record {} at {}", expected.blue(), frame.path().yellow());
                let empty = Dict::new();
                let dict = match value {
                    Value::Dict(dict) => dict,
                    other if other.is_null() => &empty,
                    other => return Err(frame.invalid(&expected, other)),
                };

                let mut staging = match initializer {
                    Some(initialize) => {
                        let mut fresh = R::default();
                        if let Err(source) = initialize(&mut fresh) {
                            let err = frame.custom(Operation::Initializer, context, source);
                            error!("Internal error during deserialization: {err}");
                            return Err(err);
                        }
                        fresh
                    }
                    None if preinitialized => mem::take(slot),
                    None => R::default(),
                };

                for field in &compiled {
                    if field.flatten {
                        field.plan.decode(frame, Some(value), &mut staging)?;
                        continue;
                    }
                    let input = if field.accepts_input {
                        dict.lookup(&field.label)
                    } else {
                        None
                    };
                    let path = frame.path().push(Segment::Field(&field.label));
                    field.plan.decode(&frame.at(&path), input, &mut staging)?;
                }
                *slot = staging;
                Ok(())
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn method_tables_show_their_owner_and_names() {
        let table = MethodTable {
            owner: "Session".to_owned(),
            methods: vec![Method::new("fresh_id", || Ok::<u64, BoxError>(7))],
        };
        assert_eq!(
            format!("{table:?}"),
            r#"MethodTable { owner: "Session", methods: ["fresh_id"] }"#
        );
        let site = Site {
            methods: Some(&table),
            ..Site::root("Session")
        };
        assert!(format!("{site:?}").contains("fresh_id"));
    }
}
