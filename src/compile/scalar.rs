use alloc::sync::Arc;

use log::trace;
use owo_colors::OwoColorize;

use super::DefaultRule;
use crate::{Compiler, ConfigError, Plan, PlanKind, Primitive, Site};

impl Compiler<'_> {
    /// A primitive: exact conversion first, then text parsing.
    pub fn scalar<T: Primitive>(&mut self, site: &Site<'_>) -> Result<Plan<T>, ConfigError> {
        let rule: DefaultRule<T> = DefaultRule::Parse {
            parse: Arc::new(T::parse_text),
            copy: T::clone,
        };
        let fallback = self.fallback(site, rule)?;
        let expected = T::type_name();
        Ok(Plan::resolving(
            PlanKind::Scalar,
            expected.clone(),
            fallback,
            move |frame, value, slot| {
                let leaf = frame
                    .driver()
                    .leaf(value)
                    .map_err(|got| frame.invalid(&expected, got))?;
                let Some(scalar) = leaf.as_scalar() else {
                    return Err(frame.invalid(&expected, leaf));
                };
                if let Some(converted) = T::from_scalar(scalar) {
                    *slot = converted;
                    return Ok(());
                }
                let Some(text) = scalar.as_str() else {
                    return Err(frame.invalid(&expected, scalar));
                };
                trace!("Parsing {} from text at {}", expected.blue(), frame.path().yellow());
                match T::parse_text(text) {
                    Ok(parsed) => {
                        *slot = parsed;
                        Ok(())
                    }
                    Err(_) => Err(frame.invalid(&expected, scalar)),
                }
            },
        ))
    }
}
