use std::collections::HashMap;

use tracing::info;

use crate::publisher::Publisher;

/// Holds the publish adapters, keyed by [`Publisher::name`].
pub struct PublisherRegistry {
    publishers: HashMap<String, Box<dyn Publisher>>,
}

impl PublisherRegistry {
    /// Create an empty registry with no registered publishers.
    pub fn new() -> Self {
        Self {
            publishers: HashMap::new(),
        }
    }

    /// Register a publish adapter.
    ///
    /// If a publisher with the same name is already registered it is
    /// replaced.
    pub fn register(&mut self, publisher: Box<dyn Publisher>) {
        let name = publisher.name().to_string();
        info!(channel = %name, "registering publisher");
        self.publishers.insert(name, publisher);
    }

    /// Return the publisher for `name`, if one is registered.
    pub fn get(&self, name: &str) -> Option<&dyn Publisher> {
        self.publishers.get(name).map(|b| b.as_ref())
    }

    /// Registered channel names, sorted for deterministic output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.publishers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

impl Default for PublisherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::{OutboundPost, PublishError, PublishReceipt};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl Publisher for Named {
        fn name(&self) -> &str {
            self.0
        }
        async fn publish(&self, post: &OutboundPost) -> Result<PublishReceipt, PublishError> {
            Ok(PublishReceipt {
                channel: post.channel.clone(),
                remote_id: None,
            })
        }
    }

    #[test]
    fn names_are_sorted_and_replacement_keeps_one_entry() {
        let mut reg = PublisherRegistry::new();
        reg.register(Box::new(Named("linkedin")));
        reg.register(Box::new(Named("bluesky")));
        reg.register(Box::new(Named("linkedin")));

        assert_eq!(reg.names(), vec!["bluesky", "linkedin"]);
        assert!(reg.get("bluesky").is_some());
        assert!(reg.get("threads").is_none());
    }
}
