mod catalog;
mod controller;
mod countdown;
mod driver;
mod monitor;
mod progress;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use catalog::{DEMO_SUBJECT, QuestionSet};
pub use controller::{
    AdaptiveConfig, DEFAULT_ADAPTIVE_DURATION_SECS, DEFAULT_EXAM_DURATION_SECS,
    DEFAULT_QUESTION_TIME_SECS, Effect, ExamConfig, ReplyOutcome, ServiceReply, ServiceRequest,
    Ticket, TimedSession, TimerScope,
};
pub use countdown::{Countdown, Tick};
pub use driver::{SessionCommand, SessionDriver, SessionHandle, SessionReport};
pub use monitor::{MonitorError, MonitorGuard, ScreenMonitor};
pub use progress::{AnswerVerdict, SessionKind, SessionProgress, SessionSnapshot};
