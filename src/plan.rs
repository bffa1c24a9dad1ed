//! Field Plans: compiled, immutable decoders for one type at one position.

use alloc::string::ToString;
use alloc::sync::Arc;
use core::fmt::Display;

use log::{error, trace};
use owo_colors::OwoColorize;

use crate::{
    BoxError, Context, DeserError, DeserErrorKind, Dict, Driver, HookFn, Operation, Path, Value,
};

/// Per-call decoding state: the driver and the current position.
///
/// Frames live on the stack of the decode call; plans never store them.
#[derive(Clone, Copy)]
pub struct Frame<'a> {
    driver: &'a dyn Driver,
    path: &'a Path<'a>,
}

impl<'a> Frame<'a> {
    /// A frame at `path`.
    pub fn new(driver: &'a dyn Driver, path: &'a Path<'a>) -> Self {
        Self { driver, path }
    }

    /// The driver of this decode call.
    pub fn driver(&self) -> &'a dyn Driver {
        self.driver
    }

    /// The current position.
    pub fn path(&self) -> &'a Path<'a> {
        self.path
    }

    /// The same call, one level deeper.
    pub fn at<'b>(&self, path: &'b Path<'b>) -> Frame<'b>
    where
        'a: 'b,
    {
        Frame {
            driver: self.driver,
            path,
        }
    }

    fn error(&self, kind: DeserErrorKind) -> DeserError {
        DeserError::new(self.path.render(), kind)
    }

    /// No value and no way to produce one.
    pub fn missing(&self, expected: &str) -> DeserError {
        self.error(DeserErrorKind::MissingValue {
            expected: expected.to_string(),
        })
    }

    /// A value of the wrong shape.
    pub fn invalid(&self, expected: &str, got: impl Display) -> DeserError {
        self.error(DeserErrorKind::InvalidValue {
            expected: expected.to_string(),
            got: got.to_string(),
        })
    }

    /// A value a custom decoder rejected.
    pub fn unparsable(&self, expected: &str, source: BoxError) -> DeserError {
        self.error(DeserErrorKind::Unparsable {
            expected: expected.to_string(),
            source,
        })
    }

    /// A value a validator rejected.
    pub fn validation(&self, source: BoxError) -> DeserError {
        self.error(DeserErrorKind::Validation { source })
    }

    /// A failing user hook.
    pub fn custom(&self, operation: Operation, context: Context, source: BoxError) -> DeserError {
        self.error(DeserErrorKind::Custom {
            operation,
            context,
            source,
        })
    }

    /// An array of the wrong length.
    pub fn length_mismatch(&self, expected: usize, actual: usize) -> DeserError {
        self.error(DeserErrorKind::LengthMismatch { expected, actual })
    }
}

type Run<T> =
    dyn Fn(&Frame<'_>, Option<&Value>, &mut T) -> Result<(), DeserError> + Send + Sync;

/// A zero-argument producer of fallback values.
pub type Producer<T> = Arc<dyn Fn() -> Result<T, BoxError> + Send + Sync>;

/// Which variant a [`Plan`] is. Used for logging and error contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    /// A primitive.
    Scalar,
    /// An indirection.
    Pointer,
    /// A growable list.
    Sequence,
    /// A fixed-size array.
    Array,
    /// A string-keyed map.
    Map,
    /// A record.
    Record,
    /// A single-field wrapper.
    Newtype,
    /// A format-specific decode hook.
    Custom,
    /// Two candidate plans tried in order.
    Combined,
    /// A raw representation type.
    Dynamic,
    /// A field that ignores input.
    Marker,
}

impl PlanKind {
    /// Where a hook failing in this plan sits.
    pub fn context(self) -> Context {
        match self {
            PlanKind::Record => Context::Record,
            PlanKind::Map => Context::Map,
            PlanKind::Pointer => Context::Pointer,
            _ => Context::Field,
        }
    }
}

/// What to do when no input is present at a position.
pub enum Fallback<T> {
    /// The value was supplied by pre-initialization; keep it.
    Accept,
    /// Decode from an empty dictionary, so nested fallbacks apply.
    Walk,
    /// A fixed default.
    Value(Producer<T>),
    /// A named constructor.
    Constructor(Producer<T>),
    /// Fail with "missing value".
    Missing,
}

impl<T> Clone for Fallback<T> {
    fn clone(&self) -> Self {
        match self {
            Fallback::Accept => Fallback::Accept,
            Fallback::Walk => Fallback::Walk,
            Fallback::Value(make) => Fallback::Value(Arc::clone(make)),
            Fallback::Constructor(make) => Fallback::Constructor(Arc::clone(make)),
            Fallback::Missing => Fallback::Missing,
        }
    }
}

/// A compiled decoder for `T`.
///
/// Immutable once built, and cheap to clone. A plan holds no per-call state,
/// so it can run concurrently from any number of threads.
pub struct Plan<T> {
    kind: PlanKind,
    run: Arc<Run<T>>,
}

impl<T> Clone for Plan<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> core::fmt::Debug for Plan<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Plan").field("kind", &self.kind).finish()
    }
}

impl<T: Default + 'static> Plan<T> {
    /// Wraps a decode function.
    pub fn new(
        kind: PlanKind,
        run: impl Fn(&Frame<'_>, Option<&Value>, &mut T) -> Result<(), DeserError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            kind,
            run: Arc::new(run),
        }
    }

    /// Decodes `input` into `slot`. `None` means the input is absent.
    pub fn decode(
        &self,
        frame: &Frame<'_>,
        input: Option<&Value>,
        slot: &mut T,
    ) -> Result<(), DeserError> {
        (self.run)(frame, input, slot)
    }

    /// The variant of this plan.
    pub fn kind(&self) -> PlanKind {
        self.kind
    }

    /// A plan that applies `fallback` when input is absent, and `present`
    /// otherwise. `expected` names the type in "missing value" errors.
    pub fn resolving(
        kind: PlanKind,
        expected: impl Into<Arc<str>>,
        fallback: Fallback<T>,
        present: impl Fn(&Frame<'_>, &Value, &mut T) -> Result<(), DeserError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        let expected: Arc<str> = expected.into();
        Self::new(kind, move |frame, input, slot| {
            if let Some(value) = input {
                return present(frame, value, slot);
            }
            match &fallback {
                Fallback::Accept => {
                    trace!("No input at {}, keeping pre-initialized value", frame.path().yellow());
                    Ok(())
                }
                Fallback::Walk => {
                    trace!("No input at {}, walking an empty dict", frame.path().yellow());
                    present(frame, &Value::Dict(Dict::new()), slot)
                }
                Fallback::Value(make) => {
                    trace!("No input at {}, using default", frame.path().yellow());
                    *slot = make().map_err(|source| {
                        frame.custom(Operation::Default, kind.context(), source)
                    })?;
                    Ok(())
                }
                Fallback::Constructor(make) => {
                    trace!("No input at {}, calling constructor", frame.path().yellow());
                    match make() {
                        Ok(value) => {
                            *slot = value;
                            Ok(())
                        }
                        Err(source) => {
                            let err = frame.custom(Operation::Constructor, kind.context(), source);
                            error!("Internal error during deserialization: {err}");
                            Err(err)
                        }
                    }
                }
                Fallback::Missing => Err(frame.missing(&expected)),
            }
        })
    }

    /// Runs `validator`, if any, after every successful decode. A rejected
    /// value is replaced by `T::default()`.
    pub fn validated(self, validator: Option<HookFn<T>>) -> Self {
        let Some(validate) = validator else {
            return self;
        };
        let kind = self.kind;
        Self::new(kind, move |frame, input, slot| {
            self.decode(frame, input, slot)?;
            if let Err(source) = validate(slot) {
                trace!("Validation failed at {}", frame.path().yellow());
                *slot = T::default();
                return Err(frame.validation(source));
            }
            Ok(())
        })
    }

    /// Tries `first`, then `second` on the same input.
    ///
    /// Absent input is resolved by `first` alone. A validation failure in
    /// `first` is final: a rejected value is never reinterpreted.
    pub fn combined(first: Plan<T>, second: Plan<T>) -> Self {
        Self::new(PlanKind::Combined, move |frame, input, slot| {
            let Some(value) = input else {
                return first.decode(frame, None, slot);
            };
            match first.decode(frame, Some(value), slot) {
                Ok(()) => Ok(()),
                Err(err) if err.is_validation() => Err(err),
                Err(err) => {
                    trace!(
                        "Structured decode failed at {} ({err}), trying {}",
                        frame.path().yellow(),
                        "custom decode".blue()
                    );
                    *slot = T::default();
                    second.decode(frame, Some(value), slot)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DictDriver;

    #[test]
    fn fallbacks_apply_only_without_input() {
        let driver = DictDriver;
        let root = Path::root("T");
        let frame = Frame::new(&driver, &root);

        let make: Producer<u8> = Arc::new(|| -> Result<u8, BoxError> { Ok(5) });
        let plan = Plan::resolving(
            PlanKind::Scalar,
            "u8",
            Fallback::Value(make),
            |_, _, slot: &mut u8| {
                *slot = 1;
                Ok(())
            },
        );
        let mut slot = 0;
        plan.decode(&frame, None, &mut slot).unwrap();
        assert_eq!(slot, 5);
        plan.decode(&frame, Some(&Value::default()), &mut slot).unwrap();
        assert_eq!(slot, 1);

        let missing =
            Plan::<u8>::resolving(PlanKind::Scalar, "u8", Fallback::Missing, |_, _, _| Ok(()));
        let err = missing.decode(&frame, None, &mut slot).unwrap_err();
        assert_eq!(err.to_string(), "missing value at T, expected u8");
    }

    #[test]
    fn combined_stops_at_validation_failures() {
        let driver = DictDriver;
        let root = Path::root("T");
        let frame = Frame::new(&driver, &root);
        let input = Value::from(1u64);

        let invalid =
            Plan::<u8>::new(PlanKind::Scalar, |frame, _, _| Err(frame.invalid("u8", "nothing")));
        fn reject(_: &mut u8) -> Result<(), BoxError> {
            Err("odd".into())
        }
        let rejected = Plan::<u8>::new(PlanKind::Scalar, |_, _, _| Ok(())).validated(Some(reject));
        let second = Plan::<u8>::new(PlanKind::Custom, |_, _, slot| {
            *slot = 7;
            Ok(())
        });

        let mut slot = 0;
        Plan::combined(invalid, second.clone())
            .decode(&frame, Some(&input), &mut slot)
            .unwrap();
        assert_eq!(slot, 7);

        let err = Plan::combined(rejected, second)
            .decode(&frame, Some(&input), &mut slot)
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(slot, 0);
    }
}
