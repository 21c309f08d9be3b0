//! Mutation reactor
//!
//! Maps DOM mutation events onto lazy-load tracking and animation
//! registration. Load work is queued on the frame queue so it is applied a
//! frame at a time.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::optimizer::{AnimationKind, AnimationRegistry, BatchQueue, FlushReport, UpdatePriority};

/// Attribute that carries a deferred resource URL
pub const LAZY_SOURCE_ATTRIBUTE: &str = "data-src";

// == Mutation Event ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MutationEvent {
    ElementAdded {
        id: String,
        /// Deferred resource, present for lazy elements
        #[serde(default)]
        lazy_src: Option<String>,
        #[serde(default)]
        animation: Option<AnimationKind>,
        #[serde(default)]
        priority: UpdatePriority,
    },
    ElementRemoved {
        id: String,
    },
    AttributeChanged {
        id: String,
        name: String,
        #[serde(default)]
        value: Option<String>,
    },
}

// == Lazy Load Tracker ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Observed,
    Queued,
    Loaded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LazyTarget {
    pub src: String,
    pub priority: UpdatePriority,
    pub state: LoadState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadJob {
    pub id: String,
    pub src: String,
}

#[derive(Debug, Default)]
pub struct LazyLoadTracker {
    targets: BTreeMap<String, LazyTarget>,
}

impl LazyLoadTracker {
    pub fn observe(&mut self, id: &str, src: String, priority: UpdatePriority) {
        self.targets.insert(
            id.to_string(),
            LazyTarget {
                src,
                priority,
                state: LoadState::Observed,
            },
        );
    }

    pub fn unobserve(&mut self, id: &str) -> bool {
        self.targets.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&LazyTarget> {
        self.targets.get(id)
    }

    fn mark_loaded(&mut self, job: &LoadJob) {
        // The element may have been removed, or re-pointed, since queuing
        if let Some(target) = self.targets.get_mut(&job.id) {
            if target.src == job.src {
                target.state = LoadState::Loaded;
            }
        }
    }

    pub fn observed_count(&self) -> usize {
        self.targets.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.targets
            .values()
            .filter(|t| t.state == LoadState::Loaded)
            .count()
    }
}

// == Reactor ==
#[derive(Debug, Default)]
pub struct MutationReactor {
    lazy: LazyLoadTracker,
    animations: AnimationRegistry,
    frame_queue: BatchQueue<LoadJob>,
}

impl MutationReactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: MutationEvent) {
        match event {
            MutationEvent::ElementAdded {
                id,
                lazy_src,
                animation,
                priority,
            } => {
                if let Some(src) = lazy_src {
                    self.lazy.observe(&id, src, priority);
                }
                if let Some(kind) = animation {
                    self.animations.register(id.clone(), kind.adapter());
                }
                debug!("Element '{}' added", id);
            }
            MutationEvent::ElementRemoved { id } => {
                let was_lazy = self.lazy.unobserve(&id);
                let was_animated = self.animations.unregister(&id);
                debug!(
                    "Element '{}' removed (lazy: {}, animated: {})",
                    id, was_lazy, was_animated
                );
            }
            MutationEvent::AttributeChanged { id, name, value } => {
                if name != LAZY_SOURCE_ATTRIBUTE {
                    return;
                }
                match value {
                    Some(src) => {
                        let priority = self
                            .lazy
                            .get(&id)
                            .map(|t| t.priority)
                            .unwrap_or_default();
                        self.lazy.observe(&id, src, priority);
                    }
                    None => {
                        self.lazy.unobserve(&id);
                    }
                }
            }
        }
    }

    /// Queues the load of an observed element that became visible.
    ///
    /// Returns false for unknown, already queued or loaded elements.
    pub fn element_visible(&mut self, id: &str) -> bool {
        let Some(target) = self.lazy.targets.get_mut(id) else {
            return false;
        };
        if target.state != LoadState::Observed {
            return false;
        }
        target.state = LoadState::Queued;
        self.frame_queue.push(
            target.priority,
            LoadJob {
                id: id.to_string(),
                src: target.src.clone(),
            },
        );
        true
    }

    /// Applies queued loads within one frame budget.
    pub fn flush_frame(&mut self, budget: Duration) -> FlushReport {
        let lazy = &mut self.lazy;
        self.frame_queue.flush(budget, |job| lazy.mark_loaded(&job))
    }

    pub fn pause_animations(&mut self) -> usize {
        self.animations.pause_all()
    }

    pub fn resume_animations(&mut self) -> usize {
        self.animations.resume_all()
    }

    pub fn lazy(&self) -> &LazyLoadTracker {
        &self.lazy
    }

    pub fn animations(&self) -> &AnimationRegistry {
        &self.animations
    }

    pub fn pending_loads(&self) -> usize {
        self.frame_queue.len()
    }

    /// Forgets everything; used on monitor teardown.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(id: &str, src: Option<&str>, animation: Option<AnimationKind>) -> MutationEvent {
        MutationEvent::ElementAdded {
            id: id.to_string(),
            lazy_src: src.map(str::to_string),
            animation,
            priority: UpdatePriority::Normal,
        }
    }

    #[test]
    fn test_added_lazy_element_is_observed() {
        let mut reactor = MutationReactor::new();
        reactor.apply(added("img-1", Some("/a.png"), None));

        assert_eq!(reactor.lazy().observed_count(), 1);
        assert_eq!(reactor.lazy().get("img-1").unwrap().state, LoadState::Observed);
    }

    #[test]
    fn test_visible_then_flush_loads() {
        let mut reactor = MutationReactor::new();
        reactor.apply(added("img-1", Some("/a.png"), None));

        assert!(reactor.element_visible("img-1"));
        assert!(!reactor.element_visible("img-1"));
        assert_eq!(reactor.pending_loads(), 1);

        let report = reactor.flush_frame(Duration::from_millis(16));
        assert_eq!(report.executed, 1);
        assert_eq!(reactor.lazy().loaded_count(), 1);
    }

    #[test]
    fn test_removed_element_is_unobserved() {
        let mut reactor = MutationReactor::new();
        reactor.apply(added("img-1", Some("/a.png"), Some(AnimationKind::Css)));
        reactor.element_visible("img-1");
        reactor.apply(MutationEvent::ElementRemoved {
            id: "img-1".to_string(),
        });

        reactor.flush_frame(Duration::from_millis(16));
        assert_eq!(reactor.lazy().observed_count(), 0);
        assert!(reactor.animations().is_empty());
    }

    #[test]
    fn test_source_change_rearms_loading() {
        let mut reactor = MutationReactor::new();
        reactor.apply(added("img-1", Some("/a.png"), None));
        reactor.element_visible("img-1");
        reactor.flush_frame(Duration::from_millis(16));

        reactor.apply(MutationEvent::AttributeChanged {
            id: "img-1".to_string(),
            name: LAZY_SOURCE_ATTRIBUTE.to_string(),
            value: Some("/b.png".to_string()),
        });

        let target = reactor.lazy().get("img-1").unwrap();
        assert_eq!(target.state, LoadState::Observed);
        assert_eq!(target.src, "/b.png");
    }

    #[test]
    fn test_other_attributes_ignored() {
        let mut reactor = MutationReactor::new();
        reactor.apply(MutationEvent::AttributeChanged {
            id: "x".to_string(),
            name: "class".to_string(),
            value: Some("hidden".to_string()),
        });
        assert_eq!(reactor.lazy().observed_count(), 0);
    }

    #[test]
    fn test_animations_pause_and_resume() {
        let mut reactor = MutationReactor::new();
        reactor.apply(added("hero", None, Some(AnimationKind::Lottie)));

        assert_eq!(reactor.pause_animations(), 1);
        assert_eq!(reactor.animations().is_paused("hero"), Some(true));
        assert_eq!(reactor.resume_animations(), 1);
    }

    #[test]
    fn test_deserialize_event() {
        let json = r#"{"event":"element_added","id":"img","lazy_src":"/x.png","priority":"high"}"#;
        let event: MutationEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            MutationEvent::ElementAdded {
                priority: UpdatePriority::High,
                ..
            }
        ));
    }
}
