use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use shield_core::VideoElement;

use crate::record::{SourceKey, VideoRecord};

/// Deduplicated store of known videos, one record per source key.
///
/// Records are never evicted: a long-lived page accumulates one entry per
/// distinct source it has shown.
pub struct VideoRegistry {
    records: Mutex<HashMap<SourceKey, Arc<VideoRecord>>>,
}

impl VideoRegistry {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Return the record for the element's current source, creating it if
    /// this source has not been seen. The flag is true only on creation.
    pub fn register_if_new(
        &self,
        element: &Arc<dyn VideoElement>,
        page_url: &str,
    ) -> (Arc<VideoRecord>, bool) {
        let key = SourceKey::for_element(element.as_ref());
        let mut records = self.records.lock();
        if let Some(existing) = records.get(&key) {
            return (Arc::clone(existing), false);
        }
        let record = Arc::new(VideoRecord::new(element, key.clone(), page_url.to_string()));
        records.insert(key, Arc::clone(&record));
        (record, true)
    }

    pub fn get(&self, key: &SourceKey) -> Option<Arc<VideoRecord>> {
        self.records.lock().get(key).cloned()
    }

    /// Count of distinct entries.
    pub fn size(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Snapshot of all records, in no particular order.
    pub fn records(&self) -> Vec<Arc<VideoRecord>> {
        self.records.lock().values().cloned().collect()
    }
}

impl Default for VideoRegistry {
    fn default() -> Self {
        Self::new()
    }
}
