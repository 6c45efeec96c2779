use std::collections::HashSet;

/// Set of owned strings, queried by `&str`.
#[derive(Clone, Debug, Default)]
pub struct StringSet {
    data: HashSet<String>,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `key` was not already present.
    pub fn add(&mut self, key: &str) -> bool {
        if self.data.contains(key) {
            return false;
        }
        self.data.insert(key.to_string())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
