use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of counted tab switches after which the attempt is shown as
/// flagged for review. Display only; nothing is enforced.
pub const FLAG_AFTER_TAB_SWITCHES: u32 = 3;

const ESCALATED_TAB_SWITCH_MESSAGE: &str =
    "Multiple tab switches detected. Your exam may be flagged for review.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityKind {
    TabSwitch,
    FullscreenExit,
    ContextMenuBlocked,
    DevToolsBlocked,
    CopyBlocked,
}

impl IntegrityKind {
    /// Warning shown to the student when this kind is observed.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::TabSwitch => {
                "Tab switching detected! This may be flagged as suspicious activity."
            }
            Self::FullscreenExit => {
                "Full screen was exited! This may be flagged as suspicious activity."
            }
            Self::ContextMenuBlocked => "Right-click is disabled during the exam",
            Self::DevToolsBlocked => "Developer tools are disabled during the exam",
            Self::CopyBlocked => "Copy is disabled during the exam",
        }
    }

    /// Leaving the exam surface, either way, counts as a tab switch.
    #[must_use]
    pub fn counts_as_switch(self) -> bool {
        matches!(self, Self::TabSwitch | Self::FullscreenExit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityEvent {
    pub at: DateTime<Utc>,
    pub kind: IntegrityKind,
    pub message: String,
}

/// Append-only warning log for a single attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityLog {
    events: Vec<IntegrityEvent>,
    tab_switches: u32,
}

impl IntegrityLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the warning for `kind`, plus an escalated warning once switches
    /// reach [`FLAG_AFTER_TAB_SWITCHES`]. Returns the number of events added.
    pub fn record(&mut self, kind: IntegrityKind, at: DateTime<Utc>) -> usize {
        self.events.push(IntegrityEvent {
            at,
            kind,
            message: kind.message().to_owned(),
        });

        if !kind.counts_as_switch() {
            return 1;
        }

        self.tab_switches = self.tab_switches.saturating_add(1);
        if self.tab_switches >= FLAG_AFTER_TAB_SWITCHES {
            self.events.push(IntegrityEvent {
                at,
                kind,
                message: ESCALATED_TAB_SWITCH_MESSAGE.to_owned(),
            });
            return 2;
        }
        1
    }

    #[must_use]
    pub fn events(&self) -> &[IntegrityEvent] {
        &self.events
    }

    #[must_use]
    pub fn latest(&self) -> Option<&IntegrityEvent> {
        self.events.last()
    }

    #[must_use]
    pub fn warnings(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn tab_switches(&self) -> u32 {
        self.tab_switches
    }

    #[must_use]
    pub fn flagged(&self) -> bool {
        self.tab_switches >= FLAG_AFTER_TAB_SWITCHES
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.tab_switches = 0;
    }
}
