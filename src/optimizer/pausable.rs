//! Pausable animations
//!
//! A single capability interface over the animation backends a page uses,
//! so suspend/resume never has to check objects for optional methods.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub trait Pausable: Send {
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_paused(&self) -> bool;
}

// == CSS animation ==
/// Drives `animation-play-state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssAnimation {
    play_state: &'static str,
}

impl CssAnimation {
    pub fn new() -> Self {
        Self {
            play_state: "running",
        }
    }

    pub fn play_state(&self) -> &'static str {
        self.play_state
    }
}

impl Default for CssAnimation {
    fn default() -> Self {
        Self::new()
    }
}

impl Pausable for CssAnimation {
    fn pause(&mut self) {
        self.play_state = "paused";
    }

    fn resume(&mut self) {
        self.play_state = "running";
    }

    fn is_paused(&self) -> bool {
        self.play_state == "paused"
    }
}

// == Frame animation ==
/// Lottie-style player: pausing zeroes the speed and resuming restores it.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnimation {
    speed: f64,
    saved_speed: Option<f64>,
}

impl FrameAnimation {
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            saved_speed: None,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl Pausable for FrameAnimation {
    fn pause(&mut self) {
        if self.saved_speed.is_none() {
            self.saved_speed = Some(self.speed);
            self.speed = 0.0;
        }
    }

    fn resume(&mut self) {
        if let Some(speed) = self.saved_speed.take() {
            self.speed = speed;
        }
    }

    fn is_paused(&self) -> bool {
        self.saved_speed.is_some()
    }
}

// == Chart animation ==
/// Chart transitions: pausing disables the transition duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartAnimation {
    duration_ms: u32,
    configured_ms: u32,
}

impl ChartAnimation {
    pub fn new(duration_ms: u32) -> Self {
        Self {
            duration_ms,
            configured_ms: duration_ms,
        }
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }
}

impl Pausable for ChartAnimation {
    fn pause(&mut self) {
        self.duration_ms = 0;
    }

    fn resume(&mut self) {
        self.duration_ms = self.configured_ms;
    }

    fn is_paused(&self) -> bool {
        self.duration_ms == 0 && self.configured_ms != 0
    }
}

// == Animation kind ==
/// Backend named by a mutation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    Css,
    Lottie,
    Chart,
}

impl AnimationKind {
    /// Builds the adapter for this backend.
    pub fn adapter(self) -> Box<dyn Pausable> {
        match self {
            AnimationKind::Css => Box::new(CssAnimation::new()),
            AnimationKind::Lottie => Box::new(FrameAnimation::new(1.0)),
            AnimationKind::Chart => Box::new(ChartAnimation::new(750)),
        }
    }
}

// == Registry ==
#[derive(Default)]
pub struct AnimationRegistry {
    animations: BTreeMap<String, Box<dyn Pausable>>,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: impl Into<String>, animation: Box<dyn Pausable>) {
        self.animations.insert(id.into(), animation);
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        self.animations.remove(id).is_some()
    }

    /// Pauses every running animation; returns how many changed state.
    pub fn pause_all(&mut self) -> usize {
        let mut paused = 0;
        for animation in self.animations.values_mut().filter(|a| !a.is_paused()) {
            animation.pause();
            paused += 1;
        }
        debug!("Paused {} animation(s)", paused);
        paused
    }

    /// Resumes every paused animation; returns how many changed state.
    pub fn resume_all(&mut self) -> usize {
        let mut resumed = 0;
        for animation in self.animations.values_mut().filter(|a| a.is_paused()) {
            animation.resume();
            resumed += 1;
        }
        debug!("Resumed {} animation(s)", resumed);
        resumed
    }

    pub fn is_paused(&self, id: &str) -> Option<bool> {
        self.animations.get(id).map(|a| a.is_paused())
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

impl std::fmt::Debug for AnimationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationRegistry")
            .field("animations", &self.animations.keys().collect::<Vec<_>>())
            .finish()
    }
}
