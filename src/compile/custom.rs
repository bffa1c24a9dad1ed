use alloc::format;
use alloc::sync::Arc;

use log::trace;
use owo_colors::OwoColorize;

use super::DefaultRule;
use crate::{
    BoxError, Compiler, ConfigError, Dict, DictHookFn, Fallback, Kind, Plan, PlanKind, Schema,
    Site, Value,
};

impl Compiler<'_> {
    /// A type decoded by its own format-specific hooks rather than by the
    /// engine. The raw JSON hook is tried first, then the text hook.
    ///
    /// Without `with_fallback`, absent input is left to another plan (see
    /// [`Plan::combined`]) and is reported as missing here.
    pub(crate) fn custom<T: Schema>(
        &mut self,
        site: &Site<'_>,
        with_fallback: bool,
    ) -> Result<Plan<T>, ConfigError> {
        let hooks = T::hooks();
        let fallback = if with_fallback {
            let rule = match hooks.text {
                Some(text) => {
                    let parse = move |literal: &str| -> Result<T, BoxError> {
                        let mut value = T::default();
                        text(&mut value, literal)?;
                        Ok(value)
                    };
                    DefaultRule::Text(Arc::new(parse))
                }
                None if T::kind() == Kind::Record => DefaultRule::Record,
                None => DefaultRule::Unsupported,
            };
            self.fallback(site, rule)?
        } else {
            Fallback::Missing
        };

        let expected = T::type_name();
        let json = hooks.json;
        let text = hooks.text;
        Ok(Plan::resolving(
            PlanKind::Custom,
            expected.clone(),
            fallback,
            move |frame, value, slot: &mut T| {
                trace!("Custom decoding {} at {}", expected.blue(), frame.path().yellow());
                let payload = frame
                    .driver()
                    .payload(value)
                    .map_err(|source| frame.unparsable(&expected, source))?;

                let raw_error = match json {
                    Some(hook) => match hook(slot, payload.as_bytes()) {
                        Ok(()) => return Ok(()),
                        Err(err) => {
                            *slot = T::default();
                            Some(err)
                        }
                    },
                    None => None,
                };
                let text_result = match (text, payload.as_text()) {
                    (Some(hook), Ok(content)) => hook(slot, content),
                    (Some(_), Err(err)) => Err(err),
                    (None, _) => {
                        let err: BoxError = raw_error.unwrap_or_else(|| {
                            format!("cannot decode {expected} from {value}").into()
                        });
                        return Err(frame.unparsable(&expected, err));
                    }
                };
                match (text_result, raw_error) {
                    (Ok(()), _) => Ok(()),
                    (Err(text_error), None) => Err(frame.unparsable(&expected, text_error)),
                    (Err(text_error), Some(raw_error)) => Err(frame.unparsable(
                        &expected,
                        format!(
                            "failed to decode '{payload}' either as JSON or as text:\n\t * {raw_error}\n\t * and {text_error}"
                        )
                        .into(),
                    )),
                }
            },
        ))
    }

    /// A type decoded directly from a dictionary by its own hook.
    pub(crate) fn dict_hook<T: Schema>(
        &mut self,
        site: &Site<'_>,
        hook: DictHookFn<T>,
    ) -> Result<Plan<T>, ConfigError> {
        let fallback = self.fallback(site, DefaultRule::Record)?;
        let expected = T::type_name();
        Ok(Plan::resolving(
            PlanKind::Custom,
            expected.clone(),
            fallback,
            move |frame, value, slot| {
                let empty = Dict::new();
                let dict = match value {
                    Value::Dict(dict) => dict,
                    other if other.is_null() => &empty,
                    other => return Err(frame.invalid(&expected, other)),
                };
                hook(slot, dict).map_err(|source| frame.unparsable(&expected, source))
            },
        ))
    }
}
