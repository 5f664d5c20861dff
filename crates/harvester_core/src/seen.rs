use std::collections::HashSet;

/// Permalinks discovered during one harvest, in discovery order, without duplicates.
///
/// Entries are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeenLinks {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `link` was not seen before.
    pub fn insert(&mut self, link: String) -> bool {
        if self.index.contains(&link) {
            return false;
        }
        self.index.insert(link.clone());
        self.order.push(link);
        true
    }

    pub fn contains(&self, link: &str) -> bool {
        self.index.contains(link)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}
