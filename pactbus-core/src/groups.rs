//! Listener groups: interchangeable handler replicas for one event key.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::handler::EventHandler;

/// Handlers registered for a single event key, bagged by listener name.
///
/// Every handler under one name is treated as a replica of the same logical
/// consumer; one of them is picked per delivery.
#[derive(Default, Clone)]
pub struct ListenerGroups {
    groups: BTreeMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl ListenerGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler under `group`. Repeated registrations accumulate.
    pub fn add_handler(&mut self, group: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.groups.entry(group.into()).or_default().push(handler);
    }

    /// One handler per listener group, each picked uniformly at random.
    pub fn select_representatives(&self) -> Vec<Arc<dyn EventHandler>> {
        self.select_with(&mut rand::thread_rng())
    }

    /// Same as [`select_representatives`](Self::select_representatives) with
    /// a caller-provided random source.
    pub fn select_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Arc<dyn EventHandler>> {
        self.groups
            .values()
            .filter_map(|handlers| match handlers.as_slice() {
                [only] => Some(Arc::clone(only)),
                many => many.choose(rng).cloned(),
            })
            .collect()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of handlers registered under `group`.
    pub fn handler_count(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, Vec::len)
    }

    /// Number of distinct listener groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::event::{Event, EventDefinition};
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Named {
        id: &'static str,
        definition: EventDefinition,
    }

    #[async_trait]
    impl EventHandler for Named {
        fn listener_name(&self) -> &str {
            self.id
        }

        fn wanted_event(&self) -> &EventDefinition {
            &self.definition
        }

        async fn process(&self, _event: &Event) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn handler(id: &'static str) -> Arc<dyn EventHandler> {
        Arc::new(Named {
            id,
            definition: EventDefinition::new("user", "UserDeleted"),
        })
    }

    #[test]
    fn empty_groups_select_nothing() {
        let groups = ListenerGroups::new();
        assert!(groups.is_empty());
        assert!(groups.select_representatives().is_empty());
    }

    #[test]
    fn single_handler_is_always_selected() {
        let mut groups = ListenerGroups::new();
        groups.add_handler("projection", handler("a"));

        for _ in 0..20 {
            let selected = groups.select_representatives();
            assert_eq!(selected.len(), 1);
            assert_eq!(selected[0].listener_name(), "a");
        }
    }

    #[test]
    fn one_representative_per_group() {
        let mut groups = ListenerGroups::new();
        groups.add_handler("projection", handler("p1"));
        groups.add_handler("projection", handler("p2"));
        groups.add_handler("projection", handler("p3"));
        groups.add_handler("audit", handler("a1"));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.handler_count("projection"), 3);
        assert_eq!(groups.handler_count("audit"), 1);
        assert_eq!(groups.handler_count("missing"), 0);
        assert_eq!(groups.group_names().collect::<Vec<_>>(), vec!["audit", "projection"]);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let selected = groups.select_with(&mut rng);
            assert_eq!(selected.len(), 2);
            assert_eq!(selected[0].listener_name(), "a1");
            assert!(selected[1].listener_name().starts_with('p'));
        }
    }

    #[test]
    fn selection_is_roughly_uniform() {
        let mut groups = ListenerGroups::new();
        groups.add_handler("projection", handler("p1"));
        groups.add_handler("projection", handler("p2"));

        let mut rng = StdRng::seed_from_u64(42);
        let rounds = 10_000;
        let first = (0..rounds)
            .filter(|_| groups.select_with(&mut rng)[0].listener_name() == "p1")
            .count();

        // Expected 5000; a fair coin stays well inside this band.
        assert!((4_500..=5_500).contains(&first), "p1 picked {first} times");
    }
}
