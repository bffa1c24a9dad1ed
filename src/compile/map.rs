use alloc::format;

use super::DefaultRule;
use crate::{
    Compiler, ConfigError, ConfigErrorKind, Dict, Kind, MapLike, Plan, PlanKind, ScalarKind, Schema,
    Segment, Site, Value,
};

impl Compiler<'_> {
    /// A string-keyed map. Keys must be strings, or decodable from text.
    pub fn map<M: MapLike>(&mut self, site: &Site<'_>) -> Result<Plan<M>, ConfigError> {
        let textual_key = M::Key::kind() == Kind::Scalar(ScalarKind::String)
            || M::Key::hooks().text.is_some();
        if !textual_key {
            return Err(ConfigError::new(
                site.path.clone(),
                ConfigErrorKind::UnsupportedMapKey {
                    type_name: M::type_name(),
                    key: M::Key::type_name(),
                },
            ));
        }

        let mut key_site = site.nested(format!("{}[key]", site.path));
        key_site.checked = false;
        let key = self.compile::<M::Key>(&key_site)?;
        let item = self.compile::<M::Item>(&site.nested(format!("{}[]", site.path)))?;
        let fallback = self.fallback(
            site,
            DefaultRule::Literal {
                literal: "{}",
                what: "maps",
                make: M::default,
            },
        )?;
        let expected = M::type_name();
        Ok(Plan::resolving(
            PlanKind::Map,
            expected.clone(),
            fallback,
            move |frame, value, slot| {
                let empty = Dict::new();
                let dict = match value {
                    Value::Dict(dict) => dict,
                    other if other.is_null() => &empty,
                    other => return Err(frame.invalid(&expected, other)),
                };
                let mut decoded = M::default();
                for (name, entry) in dict.iter() {
                    let path = frame.path().push(Segment::Key(name));
                    let frame = frame.at(&path);
                    let mut decoded_key = M::Key::default();
                    key.decode(&frame, Some(&Value::string(name)), &mut decoded_key)?;
                    let mut decoded_item = M::Item::default();
                    item.decode(&frame, Some(entry), &mut decoded_item)?;
                    decoded.insert_entry(decoded_key, decoded_item);
                }
                *slot = decoded;
                Ok(())
            },
        ))
    }
}
