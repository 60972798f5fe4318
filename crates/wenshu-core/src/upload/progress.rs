use std::collections::HashMap;

/// Upload progress by message id.
///
/// An entry exists only while its upload is in flight; completion, failure
/// and cancellation all remove it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressTable {
    entries: HashMap<String, u8>,
}

impl ProgressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `message_id` at 0%.
    pub fn register(&mut self, message_id: impl Into<String>) {
        self.entries.insert(message_id.into(), 0);
    }

    /// Records a progress tick. Ticks for untracked ids are dropped so a late
    /// tick can't resurrect a finished or cancelled upload.
    pub fn update(&mut self, message_id: &str, percent: u8) -> bool {
        match self.entries.get_mut(message_id) {
            Some(entry) => {
                *entry = percent.min(100);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, message_id: &str) -> Option<u8> {
        self.entries.remove(message_id)
    }

    pub fn get(&self, message_id: &str) -> Option<u8> {
        self.entries.get(message_id).copied()
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.entries.contains_key(message_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_requires_registration() {
        let mut table = ProgressTable::new();
        assert!(!table.update("m1", 40));
        assert!(!table.contains("m1"));

        table.register("m1");
        assert_eq!(table.get("m1"), Some(0));
        assert!(table.update("m1", 250));
        assert_eq!(table.get("m1"), Some(100));

        assert_eq!(table.remove("m1"), Some(100));
        assert!(table.is_empty());
    }
}
