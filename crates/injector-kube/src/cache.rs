//! Object cache turning raw watch events into change-feed events
//!
//! The watcher only reports "this object now looks like X" and full
//! relists. Classifying that into added, updated and deleted needs the
//! last known state of every object, which this cache holds.

use std::collections::{BTreeMap, HashMap};

use injector_core::{FeedEvent, SecretId, SecretObject};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::watcher::Event;

#[derive(Debug, Default)]
pub struct SecretCache {
    objects: HashMap<SecretId, Secret>,
    /// Objects seen so far in a relist that has not finished yet
    relist: Option<BTreeMap<SecretId, Secret>>,
    synced: bool,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the first complete listing has been delivered.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Fold one watch event into the cache, returning what changed.
    pub fn apply(&mut self, event: Event<Secret>) -> Vec<FeedEvent<Secret>> {
        match event {
            Event::Init => {
                tracing::debug!("Relist started");
                self.relist = Some(BTreeMap::new());
                Vec::new()
            }
            Event::InitApply(secret) => {
                if let Some(id) = secret.identity() {
                    self.relist.get_or_insert_with(BTreeMap::new).insert(id, secret);
                }
                Vec::new()
            }
            Event::InitDone => self.finish_relist(),
            Event::Apply(secret) => {
                let Some(id) = secret.identity() else {
                    return Vec::new();
                };
                match self.objects.insert(id, secret.clone()) {
                    Some(old) => vec![FeedEvent::Updated { old, new: secret }],
                    None => vec![FeedEvent::Added(secret)],
                }
            }
            Event::Delete(secret) => {
                if let Some(id) = secret.identity() {
                    self.objects.remove(&id);
                }
                vec![FeedEvent::Deleted(secret)]
            }
        }
    }

    /// One `Updated(obj, obj)` per cached object.
    pub fn resync_events(&self) -> Vec<FeedEvent<Secret>> {
        let mut ids: Vec<&SecretId> = self.objects.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| self.objects.get(id))
            .map(|secret| FeedEvent::Updated {
                old: secret.clone(),
                new: secret.clone(),
            })
            .collect()
    }

    /// Diff the completed relist against the cache and replace it.
    fn finish_relist(&mut self) -> Vec<FeedEvent<Secret>> {
        let listed = self.relist.take().unwrap_or_default();
        let mut events = Vec::new();

        let mut gone: Vec<SecretId> = self
            .objects
            .keys()
            .filter(|id| !listed.contains_key(*id))
            .cloned()
            .collect();
        gone.sort();
        for id in gone {
            if let Some(secret) = self.objects.remove(&id) {
                events.push(FeedEvent::Deleted(secret));
            }
        }

        for (id, secret) in listed {
            match self.objects.insert(id, secret.clone()) {
                None => events.push(FeedEvent::Added(secret)),
                Some(old) if old.metadata.resource_version != secret.metadata.resource_version => {
                    events.push(FeedEvent::Updated { old, new: secret })
                }
                Some(_) => {}
            }
        }

        tracing::debug!(objects = self.objects.len(), changes = events.len(), "Relist complete");
        if !self.synced {
            self.synced = true;
            events.push(FeedEvent::Synced);
        }
        events
    }
}
