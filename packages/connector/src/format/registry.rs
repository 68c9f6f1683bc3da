//! Registry mapping metadata formats to their renderers.

use std::collections::HashMap;

use super::dc::OaiDcFormat;
use super::marcxml::MarcXmlFormat;
use super::mets::MetsFormat;
use super::overview::OverviewFormat;
use super::{Format, MetadataFormat};

/// Registry of renderable formats.
///
/// A format known to [`MetadataFormat`] but absent here can still be used
/// for query translation, but cannot be disseminated.
pub struct FormatRegistry {
    formats: HashMap<MetadataFormat, Box<dyn Format>>,
}

impl FormatRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// Registry with every built-in renderer.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(OaiDcFormat);
        registry.register(MetsFormat);
        registry.register(MarcXmlFormat);
        registry.register(OverviewFormat::overview_page());
        registry.register(OverviewFormat::crowdsourcing());
        registry
    }

    /// Register a renderer under the format it reports.
    pub fn register(&mut self, format: impl Format + 'static) {
        self.formats
            .insert(format.metadata_format(), Box::new(format));
    }

    #[must_use]
    pub fn get(&self, format: MetadataFormat) -> Option<&dyn Format> {
        self.formats.get(&format).map(|f| f.as_ref())
    }

    #[must_use]
    pub fn has(&self, format: MetadataFormat) -> bool {
        self.formats.contains_key(&format)
    }

    /// Registered formats in catalogue order.
    #[must_use]
    pub fn registered(&self) -> Vec<MetadataFormat> {
        let mut formats: Vec<MetadataFormat> = self.formats.keys().copied().collect();
        formats.sort();
        formats
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::format::FormatContext;
    use crate::index::Document;

    struct DummyFormat;

    impl Format for DummyFormat {
        fn metadata_format(&self) -> MetadataFormat {
            MetadataFormat::Lido
        }

        fn render(&self, _: &Document, _: Option<&str>, _: &FormatContext<'_>) -> Result<String> {
            Ok("<lido/>".to_string())
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = FormatRegistry::new();
        assert!(!registry.has(MetadataFormat::OaiDc));
        assert!(registry.get(MetadataFormat::OaiDc).is_none());
    }

    #[test]
    fn test_defaults() {
        let registry = FormatRegistry::default();
        assert_eq!(
            registry.registered(),
            vec![
                MetadataFormat::OaiDc,
                MetadataFormat::Mets,
                MetadataFormat::Marcxml,
                MetadataFormat::IvOverviewpage,
                MetadataFormat::IvCrowdsourcing,
            ]
        );
        assert!(!registry.has(MetadataFormat::Epicur));
    }

    #[test]
    fn test_register_custom_format() {
        let mut registry = FormatRegistry::new();
        registry.register(DummyFormat);
        let format = registry.get(MetadataFormat::Lido).unwrap();
        assert_eq!(format.metadata_format(), MetadataFormat::Lido);
    }
}
