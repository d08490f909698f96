//! Scene-wide anchor bookkeeping

use crate::core::types::AnchorId;

/// Insertion-ordered collection of the anchors created this session
///
/// Purely an accumulator: entries are never removed individually, only
/// bulk-cleared when the scene is reset. No cloud interaction.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    anchors: Vec<AnchorId>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the registry to empty. Idempotent.
    pub fn init(&mut self) {
        self.anchors.clear();
    }

    /// Append an anchor; duplicates are kept
    pub fn add(&mut self, anchor: AnchorId) {
        self.anchors.push(anchor);
    }

    /// All registered anchors in insertion order
    pub fn all(&self) -> &[AnchorId] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut registry = AnchorRegistry::new();
        let ids = [AnchorId::new(3), AnchorId::new(1), AnchorId::new(2)];
        for id in ids {
            registry.add(id);
        }
        assert_eq!(registry.all(), &ids);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut registry = AnchorRegistry::new();
        let id = AnchorId::new(5);
        registry.add(id);
        registry.add(id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_init_clears_and_is_idempotent() {
        let mut registry = AnchorRegistry::new();
        registry.add(AnchorId::new(1));
        registry.init();
        assert!(registry.is_empty());
        registry.init();
        assert!(registry.is_empty());
    }
}
