use skilltwin_core::Clock;
use skilltwin_core::model::{
    AdaptiveStart, AdaptiveStartRequest, AnswerFeedback, AnswerRecord, AnswerSubmission,
    CompletionReason, Difficulty, IntegrityKind, IntegrityLog, Question, QuestionId, SessionId,
    SessionOutcome, SessionStatus, StudentId, ability_score, option_label, percent_score,
};

use crate::error::{ApiError, SessionError};

use super::catalog::QuestionSet;
use super::countdown::{Countdown, Tick};
use super::progress::{AnswerVerdict, SessionKind, SessionProgress, SessionSnapshot};

pub const DEFAULT_EXAM_DURATION_SECS: u32 = 3600;
pub const DEFAULT_ADAPTIVE_DURATION_SECS: u32 = 600;
pub const DEFAULT_QUESTION_TIME_SECS: u32 = 60;

/// What the countdown measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerScope {
    /// One countdown for the whole attempt; expiry submits the attempt.
    #[default]
    WholeSession,
    /// Re-armed for every question; expiry submits the current answer.
    PerQuestion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExamConfig {
    pub subject: String,
    pub questions: Vec<Question>,
    pub duration_secs: u32,
    pub monitored: bool,
}

impl ExamConfig {
    /// Proctored exam with the default one-hour limit.
    #[must_use]
    pub fn new(subject: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            subject: subject.into(),
            questions,
            duration_secs: DEFAULT_EXAM_DURATION_SECS,
            monitored: true,
        }
    }

    #[must_use]
    pub fn from_set(set: QuestionSet) -> Self {
        let duration = set.duration_secs.unwrap_or(DEFAULT_EXAM_DURATION_SECS);
        Self::new(set.subject, set.questions).with_duration(duration)
    }

    #[must_use]
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    #[must_use]
    pub fn with_monitoring(mut self, monitored: bool) -> Self {
        self.monitored = monitored;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptiveConfig {
    pub student_id: StudentId,
    pub subject: String,
    /// `None` uses the service's time limit, or the per-question default.
    pub duration_secs: Option<u32>,
    pub timer: TimerScope,
    pub monitored: bool,
}

impl AdaptiveConfig {
    #[must_use]
    pub fn new(student_id: StudentId, subject: impl Into<String>) -> Self {
        Self {
            student_id,
            subject: subject.into(),
            duration_secs: None,
            timer: TimerScope::WholeSession,
            monitored: false,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Give every question its own `secs` countdown.
    #[must_use]
    pub fn per_question(mut self, secs: u32) -> Self {
        self.timer = TimerScope::PerQuestion;
        self.duration_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn with_monitoring(mut self, monitored: bool) -> Self {
        self.monitored = monitored;
        self
    }
}

/// Correlates a service request with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    Start(AdaptiveStartRequest),
    Submit(AnswerSubmission),
}

#[derive(Debug)]
pub enum ServiceReply {
    Started(Result<AdaptiveStart, ApiError>),
    Answered(Result<AnswerFeedback, ApiError>),
}

/// Work the caller must carry out on behalf of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    AcquireMonitor,
    ReleaseMonitor,
    Request {
        ticket: Ticket,
        request: ServiceRequest,
    },
    /// Emitted once, when the attempt reaches `Completed`.
    Completed(SessionOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Applied(Vec<Effect>),
    /// Stale ticket or terminal session; nothing changed.
    Discarded,
}

#[derive(Debug, Clone)]
enum Variant {
    Exam,
    Adaptive {
        student_id: StudentId,
        duration_secs: Option<u32>,
        timer: TimerScope,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Start(Ticket),
    Submit(Ticket),
}

impl Pending {
    fn ticket(self) -> Ticket {
        match self {
            Self::Start(ticket) | Self::Submit(ticket) => ticket,
        }
    }
}

/// One timed attempt as a synchronous state machine.
///
/// Operations never block or perform I/O; they return [`Effect`]s for a
/// driver to execute. Completion is guarded in one place so the countdown
/// and an explicit submit can never both finish the attempt.
#[derive(Debug, Clone)]
pub struct TimedSession {
    variant: Variant,
    clock: Clock,
    subject: String,
    status: SessionStatus,
    session_id: Option<SessionId>,
    questions: Vec<Question>,
    current: usize,
    total: usize,
    answers: AnswerRecord,
    /// Adaptive questions the service has already answered.
    settled: usize,
    countdown: Countdown,
    duration_secs: u32,
    integrity: IntegrityLog,
    monitored: bool,
    monitor_held: bool,
    elapsed_secs: u32,
    shown_at_secs: u32,
    pending: Option<Pending>,
    next_ticket: u64,
    ability: Option<f64>,
    final_score: Option<f64>,
    last_verdict: Option<AnswerVerdict>,
    last_error: Option<String>,
    outcome: Option<SessionOutcome>,
}

impl TimedSession {
    /// Build a locally scored exam.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the question set is empty.
    pub fn exam(config: ExamConfig, clock: Clock) -> Result<Self, SessionError> {
        if config.questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let total = config.questions.len();
        Ok(Self::build(
            Variant::Exam,
            clock,
            config.subject,
            Some(SessionId::local()),
            config.questions,
            total,
            config.duration_secs,
            config.monitored,
        ))
    }

    /// Build an adaptive test. Questions arrive from the service after `start`.
    #[must_use]
    pub fn adaptive(config: AdaptiveConfig, clock: Clock) -> Self {
        Self::build(
            Variant::Adaptive {
                student_id: config.student_id,
                duration_secs: config.duration_secs,
                timer: config.timer,
            },
            clock,
            config.subject,
            None,
            Vec::new(),
            0,
            0,
            config.monitored,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        variant: Variant,
        clock: Clock,
        subject: String,
        session_id: Option<SessionId>,
        questions: Vec<Question>,
        total: usize,
        duration_secs: u32,
        monitored: bool,
    ) -> Self {
        Self {
            variant,
            clock,
            subject,
            status: SessionStatus::NotStarted,
            session_id,
            questions,
            current: 0,
            total,
            answers: AnswerRecord::new(),
            settled: 0,
            countdown: Countdown::new(),
            duration_secs,
            integrity: IntegrityLog::new(),
            monitored,
            monitor_held: false,
            elapsed_secs: 0,
            shown_at_secs: 0,
            pending: None,
            next_ticket: 1,
            ability: None,
            final_score: None,
            last_verdict: None,
            last_error: None,
            outcome: None,
        }
    }

    // ─── Operations ────────────────────────────────────────────────────────

    /// Begin the attempt.
    ///
    /// Exams start immediately. Adaptive tests emit a start request and stay
    /// `NotStarted` until the first question arrives; a failed start can be
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted`, `SessionError::Busy` while a
    /// start request is in flight, or a terminal-state error.
    pub fn start(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.ensure_not_terminal()?;
        if self.status == SessionStatus::InProgress {
            return Err(SessionError::AlreadyStarted);
        }
        if self.pending.is_some() {
            return Err(SessionError::Busy);
        }

        let student_id = match &self.variant {
            Variant::Exam => None,
            Variant::Adaptive { student_id, .. } => Some(student_id.clone()),
        };
        let Some(student_id) = student_id else {
            return self.begin();
        };

        let ticket = self.issue_ticket();
        self.pending = Some(Pending::Start(ticket));
        self.last_error = None;
        tracing::info!(subject = %self.subject, student = %student_id, "requesting adaptive test");
        Ok(vec![Effect::Request {
            ticket,
            request: ServiceRequest::Start(AdaptiveStartRequest {
                student_id,
                subject: self.subject.clone(),
            }),
        }])
    }

    /// Record (or overwrite) the answer for the displayed question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the session is not in progress, an answer
    /// is being submitted, `question_id` is not displayed, or `option` does
    /// not exist.
    pub fn select_answer(
        &mut self,
        question_id: &QuestionId,
        option: usize,
    ) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if matches!(self.pending, Some(Pending::Submit(_))) {
            return Err(SessionError::Busy);
        }
        let question = self.current_question().ok_or(SessionError::NoQuestion)?;
        if question.id() != question_id {
            return Err(SessionError::NotDisplayed(question_id.clone()));
        }
        if !question.has_option(option) {
            return Err(SessionError::InvalidOption {
                question: question_id.clone(),
                option,
            });
        }
        self.answers.set(question_id.clone(), option);
        Ok(())
    }

    /// Move forward. Adaptive tests submit the current answer instead.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the session is not in progress or, for
    /// adaptive tests, when the answer cannot be submitted.
    pub fn advance(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.ensure_in_progress()?;
        match self.variant {
            Variant::Exam => {
                if self.current + 1 < self.total {
                    self.current += 1;
                }
                Ok(Vec::new())
            }
            Variant::Adaptive { .. } => self.submit_current_answer(),
        }
    }

    /// Move back one question. Adaptive tests cannot go back.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the session is not in progress.
    pub fn retreat(&mut self) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if matches!(self.variant, Variant::Exam) {
            self.current = self.current.saturating_sub(1);
        }
        Ok(())
    }

    /// Send the selected answer for the displayed adaptive question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unsupported` for exams, `SessionError::Busy`
    /// while a request is in flight, `SessionError::NoAnswer` when nothing is
    /// selected, or a status error.
    pub fn submit_current_answer(&mut self) -> Result<Vec<Effect>, SessionError> {
        if matches!(self.variant, Variant::Exam) {
            return Err(SessionError::Unsupported);
        }
        self.ensure_in_progress()?;
        if self.pending.is_some() {
            return Err(SessionError::Busy);
        }

        let question_id = self
            .current_question()
            .map(|question| question.id().clone())
            .ok_or(SessionError::NoQuestion)?;
        let option = self
            .answers
            .get(&question_id)
            .ok_or(SessionError::NoAnswer)?;
        let answer = option_label(option).ok_or_else(|| SessionError::InvalidOption {
            question: question_id.clone(),
            option,
        })?;
        let session_id = self.session_id.clone().ok_or(SessionError::NotStarted)?;

        let submission = AnswerSubmission {
            session_id,
            question_id,
            answer,
            response_time_secs: self.elapsed_secs.saturating_sub(self.shown_at_secs),
        };
        let ticket = self.issue_ticket();
        self.pending = Some(Pending::Submit(ticket));
        self.last_error = None;
        tracing::debug!(
            ticket = ticket.value(),
            question = %submission.question_id,
            answer = %submission.answer,
            response_time = submission.response_time_secs,
            "submitting answer"
        );
        Ok(vec![Effect::Request {
            ticket,
            request: ServiceRequest::Submit(submission),
        }])
    }

    /// Advance the clock by one second.
    ///
    /// Expiry of a whole-session countdown completes the attempt exactly once.
    /// Expiry of a per-question countdown submits the selected answer, or
    /// re-arms when nothing is selected.
    pub fn tick(&mut self) -> Vec<Effect> {
        if self.status != SessionStatus::InProgress {
            return Vec::new();
        }
        self.elapsed_secs = self.elapsed_secs.saturating_add(1);

        match self.countdown.tick() {
            Tick::Expired => self.on_expired(),
            Tick::Idle | Tick::Running(_) => Vec::new(),
        }
    }

    /// Finish the attempt. A second call has no effect.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotStarted` before the attempt has begun.
    pub fn submit(&mut self) -> Result<Vec<Effect>, SessionError> {
        match self.status {
            SessionStatus::NotStarted => Err(SessionError::NotStarted),
            SessionStatus::InProgress => Ok(self.finish(CompletionReason::Submitted)),
            SessionStatus::Completed | SessionStatus::Abandoned => Ok(Vec::new()),
        }
    }

    /// Log an integrity warning. Ignored unless the attempt is in progress.
    /// Returns whether the event was recorded.
    pub fn record_integrity_event(&mut self, kind: IntegrityKind) -> bool {
        if self.status != SessionStatus::InProgress {
            tracing::debug!(?kind, status = %self.status, "ignoring integrity event");
            return false;
        }
        self.integrity.record(kind, self.clock.now());
        if let Some(event) = self.integrity.latest() {
            tracing::warn!(
                ?kind,
                tab_switches = self.integrity.tab_switches(),
                flagged = self.integrity.flagged(),
                "{}",
                event.message
            );
        }
        true
    }

    /// Leave without submitting. Answers, warnings and the countdown are
    /// discarded and the service is not told.
    pub fn exit(&mut self) -> Vec<Effect> {
        if self.status.is_terminal() {
            return Vec::new();
        }
        self.status = SessionStatus::Abandoned;
        self.countdown.stop();
        self.pending = None;
        self.answers.clear();
        self.integrity.clear();
        self.last_verdict = None;
        tracing::info!(subject = %self.subject, "session exited");
        self.release_monitor()
    }

    /// Apply a service reply.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` when the reply carries a failure. The
    /// session keeps its previous state and the request may be retried.
    pub fn on_reply(
        &mut self,
        ticket: Ticket,
        reply: ServiceReply,
    ) -> Result<ReplyOutcome, SessionError> {
        let Some(pending) = self.pending.filter(|p| p.ticket() == ticket) else {
            tracing::warn!(ticket = ticket.value(), status = %self.status, "discarding stale service response");
            return Ok(ReplyOutcome::Discarded);
        };
        if self.status.is_terminal() {
            tracing::warn!(ticket = ticket.value(), "discarding response for finished session");
            return Ok(ReplyOutcome::Discarded);
        }

        match (pending, reply) {
            (Pending::Start(_), ServiceReply::Started(result)) => {
                self.pending = None;
                match result {
                    Ok(start) => self.apply_start(start).map(ReplyOutcome::Applied),
                    Err(err) => Err(self.record_failure(err)),
                }
            }
            (Pending::Submit(_), ServiceReply::Answered(result)) => {
                self.pending = None;
                match result {
                    Ok(feedback) => Ok(ReplyOutcome::Applied(self.apply_feedback(feedback))),
                    Err(err) => {
                        if self.timer_scope() == TimerScope::PerQuestion
                            && self.countdown.has_expired()
                        {
                            self.countdown.arm(self.duration_secs);
                        }
                        Err(self.record_failure(err))
                    }
                }
            }
            _ => {
                tracing::warn!(ticket = ticket.value(), "discarding mismatched service response");
                Ok(ReplyOutcome::Discarded)
            }
        }
    }

    // ─── Queries ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn kind(&self) -> SessionKind {
        match self.variant {
            Variant::Exam => SessionKind::Exam,
            Variant::Adaptive { .. } => SessionKind::Adaptive,
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining()
    }

    #[must_use]
    pub fn integrity(&self) -> &IntegrityLog {
        &self.integrity
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.answered_count().min(self.total);
        SessionProgress {
            total: self.total,
            answered,
            remaining: self.total - answered,
            is_complete: self.status == SessionStatus::Completed,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let question = self.current_question().cloned();
        let selected = question
            .as_ref()
            .and_then(|question| self.answers.get(question.id()));
        SessionSnapshot {
            kind: self.kind(),
            status: self.status,
            session_id: self.session_id.clone(),
            subject: self.subject.clone(),
            question,
            index: self.current,
            total: self.total,
            selected,
            remaining_secs: self.countdown.remaining(),
            loading: self.is_loading(),
            ability_estimate: self.ability,
            difficulty: self.ability.map(Difficulty::from_ability),
            last_verdict: self.last_verdict.clone(),
            latest_warning: self.integrity.latest().map(|event| event.message.clone()),
            tab_switches: self.integrity.tab_switches(),
            warnings: self.integrity.warnings(),
            flagged: self.integrity.flagged(),
            progress: self.progress(),
            outcome: self.outcome.clone(),
            last_error: self.last_error.clone(),
        }
    }

    // ─── Internals ─────────────────────────────────────────────────────────

    fn begin(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.status = self.status.transition(SessionStatus::InProgress)?;
        self.countdown.arm(self.duration_secs);
        self.elapsed_secs = 0;
        self.shown_at_secs = 0;
        tracing::info!(
            subject = %self.subject,
            kind = ?self.kind(),
            questions = self.total,
            duration_secs = self.duration_secs,
            "session started"
        );
        if self.monitored {
            self.monitor_held = true;
            Ok(vec![Effect::AcquireMonitor])
        } else {
            Ok(Vec::new())
        }
    }

    fn apply_start(&mut self, start: AdaptiveStart) -> Result<Vec<Effect>, SessionError> {
        let Variant::Adaptive {
            duration_secs,
            timer,
            ..
        } = self.variant
        else {
            return Err(SessionError::Unsupported);
        };

        self.duration_secs = match timer {
            TimerScope::WholeSession => duration_secs
                .or(start.time_limit_secs)
                .unwrap_or(DEFAULT_ADAPTIVE_DURATION_SECS),
            TimerScope::PerQuestion => duration_secs.unwrap_or(DEFAULT_QUESTION_TIME_SECS),
        };
        self.session_id = Some(start.session_id);
        self.ability = start.ability_estimate;
        self.total = usize::try_from(start.total_questions)
            .unwrap_or(usize::MAX)
            .max(1);
        self.answers.clear();
        self.settled = 0;
        self.questions = vec![start.question];
        self.current = 0;
        self.begin()
    }

    fn apply_feedback(&mut self, feedback: AnswerFeedback) -> Vec<Effect> {
        self.ability = Some(feedback.ability_estimate);
        self.final_score = feedback.final_score;
        self.last_verdict = Some(AnswerVerdict {
            correct: feedback.correct,
            explanation: feedback.explanation,
        });
        self.settled = self.current + 1;

        if feedback.test_completed {
            return self.finish(CompletionReason::ServiceCompleted);
        }

        let Some(next) = feedback.next_question else {
            tracing::warn!("service sent no further question; finishing test");
            return self.finish(CompletionReason::ServiceCompleted);
        };

        // The service may serve the same question again; it starts unanswered.
        if self.answers.remove(next.id()).is_some() {
            tracing::debug!(question = %next.id(), "question repeated; clearing previous selection");
        }
        self.questions.push(next);
        self.current = self.questions.len() - 1;
        self.total = self.total.max(self.current + 1);
        self.shown_at_secs = self.elapsed_secs;
        if self.timer_scope() == TimerScope::PerQuestion {
            self.countdown.arm(self.duration_secs);
        }
        Vec::new()
    }

    fn on_expired(&mut self) -> Vec<Effect> {
        match self.timer_scope() {
            TimerScope::WholeSession => {
                tracing::info!(subject = %self.subject, "time expired");
                self.finish(CompletionReason::TimeExpired)
            }
            TimerScope::PerQuestion => {
                if self.pending.is_some() {
                    return Vec::new();
                }
                match self.submit_current_answer() {
                    Ok(effects) => effects,
                    Err(SessionError::NoAnswer) => {
                        tracing::debug!("question time expired without an answer; re-arming");
                        self.countdown.arm(self.duration_secs);
                        Vec::new()
                    }
                    Err(err) => {
                        tracing::warn!(%err, "could not submit on question timeout; re-arming");
                        self.countdown.arm(self.duration_secs);
                        Vec::new()
                    }
                }
            }
        }
    }

    fn finish(&mut self, reason: CompletionReason) -> Vec<Effect> {
        if self.status != SessionStatus::InProgress {
            return Vec::new();
        }
        self.status = SessionStatus::Completed;
        self.countdown.stop();
        if let Some(pending) = self.pending.take() {
            tracing::debug!(ticket = pending.ticket().value(), "dropping in-flight request");
        }

        let outcome = self.build_outcome(reason);
        tracing::info!(
            subject = %self.subject,
            score = outcome.score,
            ?reason,
            time_spent_secs = outcome.time_spent_secs,
            "session completed"
        );
        self.outcome = Some(outcome.clone());

        let mut effects = self.release_monitor();
        effects.push(Effect::Completed(outcome));
        effects
    }

    fn build_outcome(&self, reason: CompletionReason) -> SessionOutcome {
        let (score, ability_estimate, difficulty) = match self.variant {
            Variant::Exam => (
                percent_score(self.answers.correct_count(&self.questions), self.total),
                None,
                None,
            ),
            Variant::Adaptive { .. } => {
                let score = self.final_score.map_or_else(
                    || ability_score(self.ability.unwrap_or(0.0)),
                    |score| ability_score(score / 100.0),
                );
                (score, self.ability, self.ability.map(Difficulty::from_ability))
            }
        };

        SessionOutcome {
            score,
            total_questions: self.total,
            answered: self.answered_count(),
            answers: self.answers.clone(),
            time_spent_secs: self.elapsed_secs,
            tab_switches: self.integrity.tab_switches(),
            warnings: self.integrity.warnings(),
            flagged: self.integrity.flagged(),
            ability_estimate,
            difficulty,
            reason,
            completed_at: self.clock.now(),
        }
    }

    /// Exams count every selection. Adaptive tests count the questions the
    /// service has settled plus a selection on the one still displayed.
    fn answered_count(&self) -> usize {
        match self.variant {
            Variant::Exam => self.answers.len(),
            Variant::Adaptive { .. } => {
                let displayed = self.current >= self.settled
                    && self
                        .current_question()
                        .is_some_and(|question| self.answers.get(question.id()).is_some());
                self.settled + usize::from(displayed)
            }
        }
    }

    fn release_monitor(&mut self) -> Vec<Effect> {
        if self.monitor_held {
            self.monitor_held = false;
            vec![Effect::ReleaseMonitor]
        } else {
            Vec::new()
        }
    }

    fn record_failure(&mut self, err: ApiError) -> SessionError {
        tracing::warn!(%err, "service request failed");
        self.last_error = Some(err.to_string());
        SessionError::Api(err)
    }

    fn timer_scope(&self) -> TimerScope {
        match self.variant {
            Variant::Exam => TimerScope::WholeSession,
            Variant::Adaptive { timer, .. } => timer,
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn ensure_not_terminal(&self) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::Completed => Err(SessionError::Completed),
            SessionStatus::Abandoned => Err(SessionError::Abandoned),
            SessionStatus::NotStarted | SessionStatus::InProgress => Ok(()),
        }
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        self.ensure_not_terminal()?;
        if self.status == SessionStatus::NotStarted {
            return Err(SessionError::NotStarted);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skilltwin_core::time::fixed_clock;

    fn demo_exam(duration: u32) -> TimedSession {
        let set = QuestionSet::demo().unwrap();
        TimedSession::exam(
            ExamConfig::new(set.subject, set.questions).with_duration(duration),
            fixed_clock(),
        )
        .unwrap()
    }

    fn question(id: &str) -> Question {
        Question::new(id, format!("Question {id}"), vec!["A".into(), "B".into(), "C".into()])
            .unwrap()
    }

    fn adaptive(config: AdaptiveConfig) -> TimedSession {
        TimedSession::adaptive(config, fixed_clock())
    }

    fn physics() -> AdaptiveConfig {
        AdaptiveConfig::new(StudentId::new("7"), "Physics").with_duration(60)
    }

    fn start_reply(first: &str) -> ServiceReply {
        ServiceReply::Started(Ok(AdaptiveStart {
            session_id: SessionId::new("t-1"),
            question: question(first),
            question_number: 1,
            total_questions: 10,
            ability_estimate: Some(0.5),
            time_limit_secs: Some(600),
        }))
    }

    fn feedback(next: Option<&str>, completed: bool) -> ServiceReply {
        ServiceReply::Answered(Ok(AnswerFeedback {
            ability_estimate: 0.62,
            test_completed: completed,
            next_question: next.map(question),
            correct: Some(true),
            explanation: None,
            final_score: None,
            questions_completed: Some(1),
        }))
    }

    fn request_ticket(effects: &[Effect]) -> Ticket {
        effects
            .iter()
            .find_map(|effect| match effect {
                Effect::Request { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("request effect")
    }

    fn started_adaptive(config: AdaptiveConfig) -> TimedSession {
        let mut session = adaptive(config);
        let ticket = request_ticket(&session.start().unwrap());
        session.on_reply(ticket, start_reply("q1")).unwrap();
        session
    }

    fn completions(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Completed(_)))
            .count()
    }

    #[test]
    fn empty_exam_is_rejected() {
        let err = TimedSession::exam(ExamConfig::new("Empty", Vec::new()), fixed_clock());
        assert!(matches!(err, Err(SessionError::Empty)));
    }

    #[test]
    fn exam_start_arms_timer_and_acquires_monitor() {
        let mut session = demo_exam(60);
        let effects = session.start().unwrap();
        assert_eq!(effects, vec![Effect::AcquireMonitor]);
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.remaining_secs(), 60);
        assert_eq!(session.current_question().unwrap().id(), &QuestionId::from(1));
        assert!(matches!(session.start(), Err(SessionError::AlreadyStarted)));
    }

    #[test]
    fn selecting_twice_keeps_last_choice() {
        let mut session = demo_exam(60);
        session.start().unwrap();
        let q1 = QuestionId::from(1);
        session.select_answer(&q1, 1).unwrap();
        session.select_answer(&q1, 2).unwrap();
        assert_eq!(session.answers().get(&q1), Some(2));
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn selection_must_target_displayed_question_and_real_option() {
        let mut session = demo_exam(60);
        assert!(matches!(
            session.select_answer(&QuestionId::from(1), 0),
            Err(SessionError::NotStarted)
        ));
        session.start().unwrap();
        assert!(matches!(
            session.select_answer(&QuestionId::from(2), 0),
            Err(SessionError::NotDisplayed(_))
        ));
        assert!(matches!(
            session.select_answer(&QuestionId::from(1), 4),
            Err(SessionError::InvalidOption { option: 4, .. })
        ));
        assert!(session.answers().is_empty());
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut session = demo_exam(60);
        session.start().unwrap();
        let moves = [true, true, true, true, false, true, false, false, false, false, true];
        for forward in moves {
            if forward {
                session.advance().unwrap();
            } else {
                session.retreat().unwrap();
            }
            assert!(session.current_index() < session.total_questions());
        }
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn expiry_completes_exactly_once() {
        let mut session = demo_exam(60);
        session.start().unwrap();

        let mut all = Vec::new();
        for _ in 0..59 {
            all.extend(session.tick());
        }
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.remaining_secs(), 1);

        for _ in 0..10 {
            all.extend(session.tick());
        }
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(completions(&all), 1);
        assert_eq!(
            all.iter().filter(|e| **e == Effect::ReleaseMonitor).count(),
            1
        );
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.reason, CompletionReason::TimeExpired);
        assert_eq!(outcome.time_spent_secs, 60);
    }

    #[test]
    fn submit_scores_locally_and_is_idempotent() {
        let mut session = demo_exam(3600);
        session.start().unwrap();
        session.select_answer(&QuestionId::from(1), 1).unwrap();
        session.advance().unwrap();
        session.select_answer(&QuestionId::from(2), 2).unwrap();
        session.advance().unwrap();
        session.select_answer(&QuestionId::from(3), 0).unwrap();
        session.tick();

        let first = session.submit().unwrap();
        assert_eq!(completions(&first), 1);
        let score = session.outcome().unwrap().score;
        assert_eq!(score, 67);

        assert!(session.submit().unwrap().is_empty());
        assert!(session.tick().is_empty());
        assert_eq!(session.outcome().unwrap().score, score);
        assert_eq!(session.outcome().unwrap().time_spent_secs, 1);
    }

    #[test]
    fn completed_session_rejects_selection() {
        let mut session = demo_exam(60);
        session.start().unwrap();
        session.select_answer(&QuestionId::from(1), 0).unwrap();
        session.submit().unwrap();

        let err = session.select_answer(&QuestionId::from(1), 3).unwrap_err();
        assert!(matches!(err, SessionError::Completed));
        assert_eq!(session.answers().get(&QuestionId::from(1)), Some(0));
    }

    #[test]
    fn integrity_events_count_only_while_in_progress() {
        let mut session = demo_exam(60);
        assert!(!session.record_integrity_event(IntegrityKind::TabSwitch));
        session.start().unwrap();
        for _ in 0..3 {
            assert!(session.record_integrity_event(IntegrityKind::TabSwitch));
        }
        session.record_integrity_event(IntegrityKind::CopyBlocked);
        assert_eq!(session.status(), SessionStatus::InProgress);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.tab_switches, 3);
        assert!(snapshot.flagged);
        assert_eq!(
            snapshot.latest_warning.as_deref(),
            Some("Copy is disabled during the exam")
        );

        session.submit().unwrap();
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.tab_switches, 3);
        assert_eq!(outcome.warnings, 5);
        assert!(!session.record_integrity_event(IntegrityKind::TabSwitch));
    }

    #[test]
    fn exit_discards_state_and_releases_monitor() {
        let mut session = demo_exam(60);
        session.start().unwrap();
        session.select_answer(&QuestionId::from(1), 1).unwrap();
        session.record_integrity_event(IntegrityKind::TabSwitch);

        assert_eq!(session.exit(), vec![Effect::ReleaseMonitor]);
        assert_eq!(session.status(), SessionStatus::Abandoned);
        assert!(session.answers().is_empty());
        assert_eq!(session.integrity().warnings(), 0);
        assert!(session.outcome().is_none());
        assert!(session.tick().is_empty());
        assert!(session.exit().is_empty());
        assert!(session.submit().unwrap().is_empty());
    }

    #[test]
    fn unmonitored_exam_emits_no_monitor_effects() {
        let set = QuestionSet::demo().unwrap();
        let mut session = TimedSession::exam(
            ExamConfig::new(set.subject, set.questions).with_monitoring(false),
            fixed_clock(),
        )
        .unwrap();
        assert!(session.start().unwrap().is_empty());
        let effects = session.submit().unwrap();
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], Effect::Completed(_)));
    }

    #[test]
    fn adaptive_start_waits_for_first_question() {
        let mut session = adaptive(physics());
        let effects = session.start().unwrap();
        assert_eq!(effects.len(), 1);
        assert!(matches!(
            &effects[0],
            Effect::Request { request: ServiceRequest::Start(req), .. } if req.subject == "Physics"
        ));
        assert_eq!(session.status(), SessionStatus::NotStarted);
        assert!(session.is_loading());
        assert!(session.tick().is_empty());
        assert!(matches!(session.start(), Err(SessionError::Busy)));

        let ticket = request_ticket(&effects);
        session.on_reply(ticket, start_reply("q1")).unwrap();
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.remaining_secs(), 60);
        assert_eq!(session.total_questions(), 10);
        assert_eq!(session.session_id(), Some(&SessionId::new("t-1")));
    }

    #[test]
    fn failed_start_can_be_retried() {
        let mut session = adaptive(physics());
        let ticket = request_ticket(&session.start().unwrap());
        let err = session
            .on_reply(
                ticket,
                ServiceReply::Started(Err(ApiError::Rejected {
                    status: 404,
                    message: "No questions available".into(),
                })),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Rejected { status: 404, .. })));
        assert_eq!(session.status(), SessionStatus::NotStarted);
        assert!(session.snapshot().last_error.is_some());

        let retry = request_ticket(&session.start().unwrap());
        assert_ne!(retry, ticket);
        assert!(session.snapshot().last_error.is_none());
    }

    #[test]
    fn service_time_limit_used_without_override() {
        let mut session = adaptive(AdaptiveConfig::new(StudentId::new("7"), "Physics"));
        let ticket = request_ticket(&session.start().unwrap());
        session.on_reply(ticket, start_reply("q1")).unwrap();
        assert_eq!(session.remaining_secs(), 600);
    }

    #[test]
    fn adaptive_answer_round_trip_replaces_question() {
        let mut session = started_adaptive(physics());
        assert!(matches!(session.submit_current_answer(), Err(SessionError::NoAnswer)));

        session.select_answer(&QuestionId::new("q1"), 1).unwrap();
        for _ in 0..4 {
            session.tick();
        }
        let effects = session.advance().unwrap();
        let Some(Effect::Request {
            ticket,
            request: ServiceRequest::Submit(submission),
        }) = effects.first()
        else {
            panic!("expected submission, got {effects:?}");
        };
        assert_eq!(submission.answer, 'B');
        assert_eq!(submission.response_time_secs, 4);
        assert_eq!(submission.session_id, SessionId::new("t-1"));
        assert!(matches!(
            session.select_answer(&QuestionId::new("q1"), 0),
            Err(SessionError::Busy)
        ));

        let applied = session.on_reply(*ticket, feedback(Some("q2"), false)).unwrap();
        assert_eq!(applied, ReplyOutcome::Applied(Vec::new()));
        assert_eq!(session.current_question().unwrap().id(), &QuestionId::new("q2"));
        assert_eq!(session.current_index(), 1);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.ability_estimate, Some(0.62));
        assert_eq!(snapshot.difficulty, Some(Difficulty::Medium));
        assert_eq!(snapshot.last_verdict.unwrap().correct, Some(true));

        session.retreat().unwrap();
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn failed_submission_keeps_answers_intact() {
        let mut session = started_adaptive(physics());
        session.select_answer(&QuestionId::new("q1"), 2).unwrap();
        let ticket = request_ticket(&session.submit_current_answer().unwrap());
        let err = session
            .on_reply(ticket, ServiceReply::Answered(Err(ApiError::Unauthorized)))
            .unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Unauthorized)));
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.answers().get(&QuestionId::new("q1")), Some(2));
        assert!(!session.is_loading());
        assert!(session.submit_current_answer().is_ok());
    }

    #[test]
    fn late_reply_after_expiry_is_discarded() {
        let mut session = started_adaptive(physics());
        session.select_answer(&QuestionId::new("q1"), 0).unwrap();
        let ticket = request_ticket(&session.submit_current_answer().unwrap());

        let mut effects = Vec::new();
        for _ in 0..60 {
            effects.extend(session.tick());
        }
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(completions(&effects), 1);
        assert_eq!(
            session.outcome().unwrap().reason,
            CompletionReason::TimeExpired
        );

        let late = session.on_reply(ticket, feedback(Some("q2"), false)).unwrap();
        assert_eq!(late, ReplyOutcome::Discarded);
        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.current_question().unwrap().id(), &QuestionId::new("q1"));
    }

    #[test]
    fn service_completion_uses_final_score() {
        let mut session = started_adaptive(physics());
        session.select_answer(&QuestionId::new("q1"), 0).unwrap();
        let ticket = request_ticket(&session.submit_current_answer().unwrap());
        let effects = session
            .on_reply(
                ticket,
                ServiceReply::Answered(Ok(AnswerFeedback {
                    ability_estimate: 0.81,
                    test_completed: true,
                    next_question: None,
                    correct: Some(false),
                    explanation: Some("Refraction bends light.".into()),
                    final_score: Some(81.0),
                    questions_completed: Some(10),
                })),
            )
            .unwrap();
        let ReplyOutcome::Applied(effects) = effects else {
            panic!("reply was discarded");
        };
        assert_eq!(completions(&effects), 1);
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.score, 81);
        assert_eq!(outcome.reason, CompletionReason::ServiceCompleted);
        assert_eq!(outcome.difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn manual_submit_derives_score_from_ability() {
        let mut session = started_adaptive(physics());
        session.submit().unwrap();
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.score, 50);
        assert_eq!(outcome.ability_estimate, Some(0.5));
    }

    #[test]
    fn per_question_timer_submits_or_rearms() {
        let mut session = started_adaptive(
            AdaptiveConfig::new(StudentId::new("7"), "Physics").per_question(5),
        );
        assert_eq!(session.remaining_secs(), 5);

        for _ in 0..5 {
            assert!(session.tick().is_empty());
        }
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert_eq!(session.remaining_secs(), 5);

        session.select_answer(&QuestionId::new("q1"), 1).unwrap();
        let mut effects = Vec::new();
        for _ in 0..5 {
            effects.extend(session.tick());
        }
        let ticket = request_ticket(&effects);
        assert!(session.is_loading());
        assert!(session.tick().is_empty());

        session.on_reply(ticket, feedback(Some("q2"), false)).unwrap();
        assert_eq!(session.remaining_secs(), 5);
        assert_eq!(session.current_question().unwrap().id(), &QuestionId::new("q2"));
    }

    #[test]
    fn repeated_question_starts_unanswered() {
        let mut session = adaptive(physics());
        let ticket = request_ticket(&session.start().unwrap());
        session.on_reply(ticket, start_reply("5")).unwrap();
        let repeated = QuestionId::new("5");

        session.select_answer(&repeated, 1).unwrap();
        assert_eq!(session.progress().answered, 1);
        let ticket = request_ticket(&session.advance().unwrap());
        session.on_reply(ticket, feedback(Some("5"), false)).unwrap();

        assert_eq!(session.current_index(), 1);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.selected, None);
        assert_eq!(snapshot.progress.answered, 1);
        assert!(matches!(session.advance(), Err(SessionError::NoAnswer)));

        session.select_answer(&repeated, 2).unwrap();
        assert_eq!(session.progress().answered, 2);
        let ticket = request_ticket(&session.advance().unwrap());
        session.on_reply(ticket, feedback(None, true)).unwrap();
        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.answered, 2);
        assert_eq!(outcome.answers.get(&repeated), Some(2));
    }

    #[test]
    fn per_question_expiry_rearms_when_answer_cannot_be_sent() {
        let mut session = started_adaptive(
            AdaptiveConfig::new(StudentId::new("7"), "Physics").per_question(5),
        );
        session.select_answer(&QuestionId::new("q1"), 1).unwrap();
        session.session_id = None;

        for _ in 0..5 {
            assert!(session.tick().is_empty());
        }
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(!session.is_loading());
        assert_eq!(session.remaining_secs(), 5);

        session.session_id = Some(SessionId::new("t-1"));
        let mut effects = Vec::new();
        for _ in 0..5 {
            effects.extend(session.tick());
        }
        request_ticket(&effects);
        assert!(session.is_loading());
    }

    #[test]
    fn exam_rejects_adaptive_only_operations() {
        let mut session = demo_exam(60);
        session.start().unwrap();
        assert!(matches!(
            session.submit_current_answer(),
            Err(SessionError::Unsupported)
        ));
    }

    #[test]
    fn exit_before_start_abandons() {
        let mut session = adaptive(physics());
        let ticket = request_ticket(&session.start().unwrap());
        assert!(session.exit().is_empty());
        assert_eq!(session.status(), SessionStatus::Abandoned);
        assert_eq!(
            session.on_reply(ticket, start_reply("q1")).unwrap(),
            ReplyOutcome::Discarded
        );
        assert!(matches!(session.start(), Err(SessionError::Abandoned)));
    }
}
