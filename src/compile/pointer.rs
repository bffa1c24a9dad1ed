use super::DefaultRule;
use crate::{Compiler, ConfigError, Plan, PlanKind, Schema, Site};

impl Compiler<'_> {
    /// A nullable pointer. An explicit null, or the `nil` default, is a
    /// legitimate value; anything else is decoded into the pointee.
    pub fn option<T: Schema>(&mut self, site: &Site<'_>) -> Result<Plan<Option<T>>, ConfigError> {
        let inner = self.compile::<T>(&site.nested(site.path.clone()))?;
        let fallback = self.fallback(
            site,
            DefaultRule::Literal {
                literal: "nil",
                what: "pointers",
                make: || None,
            },
        )?;
        Ok(Plan::resolving(
            PlanKind::Pointer,
            <Option<T>>::type_name(),
            fallback,
            move |frame, value, slot| {
                if value.is_null() {
                    *slot = None;
                    return Ok(());
                }
                let mut pointee = T::default();
                inner.decode(frame, Some(value), &mut pointee)?;
                *slot = Some(pointee);
                Ok(())
            },
        ))
    }

    /// A non-nullable pointer, decoded in place through `project`.
    ///
    /// The pointer adds no structure: metadata and fallbacks at `site` apply
    /// to the pointee.
    pub fn pointer<P: Schema, T: Schema>(
        &mut self,
        site: &Site<'_>,
        project: fn(&mut P) -> &mut T,
    ) -> Result<Plan<P>, ConfigError> {
        let mut pointee = site.transparent();
        pointee.checked = true;
        let inner = self.compile::<T>(&pointee)?;
        Ok(Plan::new(PlanKind::Pointer, move |frame, input, slot: &mut P| {
            inner.decode(frame, input, project(slot))
        }))
    }
}
