//! Monitor lifecycle phases

use serde::Serialize;

/// `Uninitialized -> SettingUp -> Active <-> Suspended -> Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    Uninitialized,
    SettingUp,
    Active,
    Suspended,
    Destroyed,
}

impl MonitorPhase {
    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(self, next: MonitorPhase) -> bool {
        use MonitorPhase::*;
        matches!(
            (self, next),
            (Uninitialized, SettingUp)
                | (SettingUp, Active)
                | (Active, Suspended)
                | (Suspended, Active)
                | (Uninitialized | SettingUp | Active | Suspended, Destroyed)
        )
    }

    /// Periodic work runs in these phases.
    pub fn is_running(self) -> bool {
        matches!(self, MonitorPhase::Active | MonitorPhase::Suspended)
    }

    pub fn is_terminal(self) -> bool {
        self == MonitorPhase::Destroyed
    }
}
