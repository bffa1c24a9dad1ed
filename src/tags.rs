//! Field metadata: the `key:"value"` annotations attached to record fields.

use alloc::borrow::ToOwned;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

/// Metadata key holding a fixed default literal.
pub const DEFAULT: &str = "default";
/// Metadata key naming a zero-argument constructor method.
pub const OR_METHOD: &str = "orMethod";
/// Metadata key marking a field as pre-populated by its container.
pub const INITIALIZED: &str = "initialized";
/// Metadata key inlining a nested record's fields into its parent.
pub const FLATTEN: &str = "flatten";

/// Parsed metadata of one field.
///
/// Values are lists: `fourth:"1,  2,3"` reads as `["1", "2", "3"]`. The
/// `default` and `orMethod` values are kept verbatim, since a default literal
/// may legitimately contain commas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    entries: Vec<(String, Vec<String>)>,
}

/// Malformed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The same key appears twice.
    Duplicate {
        /// The repeated key.
        name: String,
    },
    /// A `:"value"` with nothing before it.
    EmptyName,
    /// A quoted value that cannot be unescaped.
    IllFormed {
        /// The key whose value is broken.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagError::Duplicate { name } => {
                write!(f, "invalid tag, name {name} should only be defined once")
            }
            TagError::EmptyName => write!(f, "invalid tag with empty name"),
            TagError::IllFormed { name, reason } => {
                write!(f, "ill-formed tag {name}:\n\t * {reason}")
            }
        }
    }
}

impl core::error::Error for TagError {}

impl Tags {
    /// No metadata at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a struct-tag style annotation such as
    /// `json:"name" default:"1" flatten:""`.
    ///
    /// Parsing stops silently at the first piece that does not look like
    /// `key:"value"`, matching how struct tags are usually read.
    pub fn parse(raw: &str) -> Result<Self, TagError> {
        let mut tags = Self::new();
        let bytes = raw.as_bytes();
        let mut rest = 0;
        loop {
            while rest < bytes.len() && bytes[rest] == b' ' {
                rest += 1;
            }
            if rest >= bytes.len() {
                break;
            }

            // Scan to colon. A space, a quote or a control character ends the name.
            let mut i = rest;
            while i < bytes.len()
                && bytes[i] > b' '
                && bytes[i] != b':'
                && bytes[i] != b'"'
                && bytes[i] != 0x7f
            {
                i += 1;
            }
            if i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
                break;
            }
            if i == rest {
                return Err(TagError::EmptyName);
            }
            let name = &raw[rest..i];

            // Scan the quoted value.
            let open = i + 1;
            let mut close = open + 1;
            while close < bytes.len() && bytes[close] != b'"' {
                if bytes[close] == b'\\' {
                    close += 1;
                }
                close += 1;
            }
            if close >= bytes.len() {
                break;
            }
            let value = unquote(&raw[open + 1..close]).map_err(|reason| TagError::IllFormed {
                name: name.to_owned(),
                reason,
            })?;
            tags.insert(name, &value)?;
            rest = close + 1;
        }
        Ok(tags)
    }

    /// Adds one key. Fails if the key is already present.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), TagError> {
        if name.is_empty() {
            return Err(TagError::EmptyName);
        }
        if self.lookup(name).is_some() {
            return Err(TagError::Duplicate {
                name: name.to_owned(),
            });
        }
        let values = match name {
            DEFAULT | OR_METHOD => vec![value.to_owned()],
            _ => {
                let mut values: Vec<String> = value
                    .split(',')
                    .map(|item| item.trim_matches(' '))
                    .filter(|item| !item.is_empty())
                    .map(ToOwned::to_owned)
                    .collect();
                if values.is_empty() {
                    values.push(String::new());
                }
                values
            }
        };
        self.entries.push((name.to_owned(), values));
        Ok(())
    }

    /// Merges `other` into `self`, rejecting keys present in both.
    pub fn merge(&mut self, other: Tags) -> Result<(), TagError> {
        for (name, values) in other.entries {
            if self.lookup(&name).is_some() {
                return Err(TagError::Duplicate { name });
            }
            self.entries.push((name, values));
        }
        Ok(())
    }

    /// All values of a key, if present.
    pub fn lookup(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, values)| values.as_slice())
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.lookup(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// The `default` literal.
    pub fn default_literal(&self) -> Option<&str> {
        self.first(DEFAULT)
    }

    /// The `orMethod` constructor name.
    pub fn method_name(&self) -> Option<&str> {
        self.first(OR_METHOD)
    }

    /// The external name under the given format key, e.g. `json`.
    pub fn public_name(&self, tag_name: &str) -> Option<&str> {
        self.first(tag_name)
    }

    /// Whether the `initialized` key is present, whatever its value.
    pub fn is_preinitialized(&self) -> bool {
        self.lookup(INITIALIZED).is_some()
    }

    /// Whether the `flatten` key is present, whatever its value.
    pub fn is_flattened(&self) -> bool {
        self.lookup(FLATTEN).is_some()
    }

    /// `true` if there is no metadata.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unquote(quoted: &str) -> Result<String, String> {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(alloc::format!("invalid escape sequence \\{other}")),
            None => return Err("trailing backslash".to_owned()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANDOM: &str = r#"first:"1,2,3" second:"" third:"abc" fourth:"1,     2,3" fifth:"    abc  " "#;

    #[test]
    fn values_are_split_and_trimmed() {
        let tags = Tags::parse(RANDOM).unwrap();
        assert_eq!(tags.lookup("first").unwrap(), ["1", "2", "3"]);
        assert_eq!(tags.lookup("second").unwrap(), [""]);
        assert_eq!(tags.lookup("third").unwrap(), ["abc"]);
        assert_eq!(tags.lookup("fourth").unwrap(), ["1", "2", "3"]);
        assert_eq!(tags.lookup("fifth").unwrap(), ["abc"]);
        assert!(tags.lookup("absent").is_none());
        assert!(!tags.is_preinitialized());
    }

    #[test]
    fn defaults_are_kept_verbatim() {
        let tags = Tags::parse(r#"default:"abc, def" orMethod:"SomeMethod" renaming:"interesting" initialized:"arbitrary content""#).unwrap();
        assert_eq!(tags.default_literal(), Some("abc, def"));
        assert_eq!(tags.method_name(), Some("SomeMethod"));
        assert_eq!(tags.public_name("renaming"), Some("interesting"));
        assert!(tags.is_preinitialized());
        assert!(!tags.is_flattened());

        assert_eq!(Tags::parse(r#"default:"""#).unwrap().default_literal(), Some(""));
        assert_eq!(Tags::parse(r#"default:"nil""#).unwrap().default_literal(), Some("nil"));
        assert_eq!(Tags::parse(r#"default:"{}""#).unwrap().default_literal(), Some("{}"));
    }

    #[test]
    fn repeated_keys_are_rejected() {
        let err = Tags::parse(r#"abc:"" abc:"""#).unwrap_err();
        assert_eq!(err.to_string(), "invalid tag, name abc should only be defined once");

        let mut tags = Tags::new();
        tags.insert("json", "a").unwrap();
        assert!(tags.insert("json", "b").is_err());
        assert!(tags.merge(Tags::parse(r#"json:"c""#).unwrap()).is_err());
    }

    #[test]
    fn escapes_are_decoded() {
        let tags = Tags::parse(r#"default:"a \"quoted\" value""#).unwrap();
        assert_eq!(tags.default_literal(), Some(r#"a "quoted" value"#));
        assert!(matches!(
            Tags::parse(r#"default:"\q""#),
            Err(TagError::IllFormed { .. })
        ));
    }

    #[test]
    fn garbage_stops_parsing() {
        let tags = Tags::parse(r#"json:"a" this is not a tag"#).unwrap();
        assert_eq!(tags.public_name("json"), Some("a"));
        assert!(Tags::parse(":\"x\"").is_err());
        assert!(Tags::parse("").unwrap().is_empty());
    }
}
