use alloc::format;
use alloc::vec::Vec;

use log::trace;
use owo_colors::OwoColorize;

use super::DefaultRule;
use crate::{Compiler, ConfigError, Plan, PlanKind, Schema, Segment, Site};

impl Compiler<'_> {
    /// A growable list. Each element is addressed by its index.
    pub fn sequence<T: Schema>(&mut self, site: &Site<'_>) -> Result<Plan<Vec<T>>, ConfigError> {
        let element = self.compile::<T>(&site.nested(format!("{}[]", site.path)))?;
        let fallback = self.fallback(
            site,
            DefaultRule::Literal {
                literal: "[]",
                what: "slices",
                make: Vec::new,
            },
        )?;
        let expected = <Vec<T>>::type_name();
        Ok(Plan::resolving(
            PlanKind::Sequence,
            expected.clone(),
            fallback,
            move |frame, value, slot| {
                let Some(items) = value.as_sequence() else {
                    return Err(frame.invalid(&expected, value));
                };
                trace!("Decoding {} elements at {}", items.len(), frame.path().yellow());
                let mut decoded = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let path = frame.path().push(Segment::Index(index));
                    let mut staging = T::default();
                    element.decode(&frame.at(&path), Some(item), &mut staging)?;
                    decoded.push(staging);
                }
                *slot = decoded;
                Ok(())
            },
        ))
    }

    /// A fixed-size array. The input must have exactly `N` elements.
    pub fn array<T: Schema, const N: usize>(
        &mut self,
        site: &Site<'_>,
    ) -> Result<Plan<[T; N]>, ConfigError>
    where
        [T; N]: Schema,
    {
        let element = self.compile::<T>(&site.nested(format!("{}[]", site.path)))?;
        let fallback = self.fallback(
            site,
            DefaultRule::Literal {
                literal: "[]",
                what: "arrays",
                make: <[T; N]>::default,
            },
        )?;
        let expected = <[T; N]>::type_name();
        Ok(Plan::resolving(
            PlanKind::Array,
            expected.clone(),
            fallback,
            move |frame, value, slot| {
                let Some(items) = value.as_sequence() else {
                    return Err(frame.invalid(&expected, value));
                };
                if items.len() != N {
                    return Err(frame.length_mismatch(N, items.len()));
                }
                let mut decoded = <[T; N]>::default();
                for (index, (item, target)) in items.iter().zip(decoded.iter_mut()).enumerate() {
                    let path = frame.path().push(Segment::Index(index));
                    element.decode(&frame.at(&path), Some(item), target)?;
                }
                *slot = decoded;
                Ok(())
            },
        ))
    }
}
