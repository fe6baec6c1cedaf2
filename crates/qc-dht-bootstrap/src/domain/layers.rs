//! DHT layer identifiers.

use std::collections::BTreeSet;

use super::errors::DhtError;

/// Identifier of one DHT layer.
pub type LayerId = u32;

/// Layer connected at start; every other layer is attached after it.
pub const PRIMARY_LAYER: LayerId = 0;

/// Set of layers the service has attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerSet(BTreeSet<LayerId>);

impl LayerSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer; returns false if it was already present.
    pub fn insert(&mut self, layer: LayerId) -> bool {
        self.0.insert(layer)
    }

    /// Whether `layer` is attached.
    pub fn contains(&self, layer: LayerId) -> bool {
        self.0.contains(&layer)
    }

    /// Whether the primary layer is attached.
    pub fn has_primary(&self) -> bool {
        self.contains(PRIMARY_LAYER)
    }

    /// Attached layers in ascending order.
    pub fn ids(&self) -> Vec<LayerId> {
        self.0.iter().copied().collect()
    }

    /// Number of attached layers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no layer is attached.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Detach everything.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<LayerId> for LayerSet {
    fn from_iter<I: IntoIterator<Item = LayerId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Parse the comma separated `attached_layers` setting.
///
/// Blank entries are skipped and duplicates collapse. The primary layer is
/// never re-attached. Any other non-integer entry rejects the whole list.
pub fn parse_attached_layers(raw: &str) -> Result<Vec<LayerId>, DhtError> {
    let mut seen = BTreeSet::new();
    let mut layers = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let layer: LayerId = entry
            .parse()
            .map_err(|_| DhtError::InvalidLayer(entry.to_string()))?;
        if layer != PRIMARY_LAYER && seen.insert(layer) {
            layers.push(layer);
        }
    }
    Ok(layers)
}
