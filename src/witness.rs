//! A marker proving that a value went through a constructor or a decoder.
//!
//! Embed a [`Witness`] in a record to tell apart values built the intended
//! way from values obtained through `Default`.

use alloc::borrow::ToOwned;
use alloc::string::String;

use crate::{Compiler, ConfigError, Kind, Plan, PlanKind, Schema, Site};

/// Initialization marker. Decoding always produces an initialized witness,
/// and never reads input for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Witness {
    initialized: bool,
}

impl Witness {
    /// An initialized witness, for use in constructors.
    pub const fn make() -> Self {
        Self { initialized: true }
    }

    /// Whether the container was built by a constructor or a decoder.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Asserts that the container was properly built.
    ///
    /// # Panics
    ///
    /// Panics if the witness was obtained through `Default`.
    #[track_caller]
    pub fn assert(&self) {
        assert!(
            self.initialized,
            "value was not built by a constructor or by a deserializer"
        );
    }
}

impl Schema for Witness {
    fn type_name() -> String {
        "Witness".to_owned()
    }

    fn kind() -> Kind {
        Kind::Marker
    }

    fn compile(_compiler: &mut Compiler<'_>, _site: &Site<'_>) -> Result<Plan<Self>, ConfigError> {
        Ok(Plan::new(PlanKind::Marker, |_, _, slot: &mut Witness| {
            *slot = Witness::make();
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_constructed_witnesses_are_initialized() {
        assert!(Witness::make().is_initialized());
        assert!(!Witness::default().is_initialized());
        Witness::make().assert();
    }

    #[test]
    #[should_panic(expected = "was not built")]
    fn default_witness_fails_the_assertion() {
        Witness::default().assert();
    }
}
