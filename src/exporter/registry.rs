use std::collections::HashMap;

use thiserror::Error;

use super::Measurement;
use crate::config::Config;

/// Constructs a [`Measurement`] for one measurement id and address family.
pub type MeasurementFactory = Box<dyn Fn(&str, u8, &Config) -> Measurement + Send + Sync>;

#[derive(Debug, Error)]
#[error("measurement type {0} is not supported")]
pub struct UnsupportedType(pub String);

/// Maps protocol type tags to measurement factories. New protocol types
/// register here instead of extending a dispatch site.
#[derive(Default)]
pub struct ExporterRegistry {
    factories: HashMap<&'static str, MeasurementFactory>,
}

impl ExporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_tag: &'static str, factory: MeasurementFactory) {
        self.factories.insert(type_tag, factory);
    }

    /// Builds a measurement for `type_tag`, or fails for unknown tags.
    pub fn create(
        &self,
        type_tag: &str,
        id: &str,
        af: u8,
        cfg: &Config,
    ) -> Result<Measurement, UnsupportedType> {
        match self.factories.get(type_tag) {
            Some(factory) => Ok(factory(id, af, cfg)),
            None => Err(UnsupportedType(type_tag.to_string())),
        }
    }
}
