use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use skilltwin_core::model::{IntegrityKind, QuestionId, SessionOutcome, SessionStatus};

use crate::api::AssessmentApi;
use crate::error::SessionError;

use super::controller::{
    Effect, ReplyOutcome, ServiceReply, ServiceRequest, Ticket, TimedSession,
};
use super::monitor::{MonitorGuard, ScreenMonitor};
use super::progress::SessionSnapshot;

const COMMAND_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    SelectAnswer { question_id: QuestionId, option: usize },
    Advance,
    Retreat,
    SubmitCurrentAnswer,
    Submit,
    RecordIntegrity(IntegrityKind),
    Exit,
}

struct Envelope {
    command: SessionCommand,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

/// How a driven session ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub status: SessionStatus,
    pub outcome: Option<SessionOutcome>,
    pub requests_sent: usize,
}

/// Runs a [`TimedSession`] on one event loop.
///
/// Commands, one-second ticks and service replies are handled one at a
/// time. Service calls run on spawned tasks and post their result back with
/// the request ticket, so the countdown keeps running while they are in
/// flight.
#[derive(Clone)]
pub struct SessionDriver {
    api: Arc<dyn AssessmentApi>,
    monitor: Arc<dyn ScreenMonitor>,
    tick_every: Duration,
}

impl SessionDriver {
    #[must_use]
    pub fn new(api: Arc<dyn AssessmentApi>, monitor: Arc<dyn ScreenMonitor>) -> Self {
        Self {
            api,
            monitor,
            tick_every: Duration::from_secs(1),
        }
    }

    /// Spawn the event loop. The returned handle drives the session; the join
    /// handle resolves once the session is completed or exited. Dropping every
    /// handle counts as an exit.
    #[must_use]
    pub fn spawn(self, session: TimedSession) -> (SessionHandle, JoinHandle<SessionReport>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());
        let task = tokio::spawn(self.run(session, commands_rx, snapshots_tx));
        let handle = SessionHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        };
        (handle, task)
    }

    async fn run(
        self,
        mut session: TimedSession,
        mut commands: mpsc::Receiver<Envelope>,
        snapshots: watch::Sender<SessionSnapshot>,
    ) -> SessionReport {
        let (replies_tx, mut replies) = mpsc::unbounded_channel::<(Ticket, ServiceReply)>();
        let mut ticker = tokio::time::interval_at(Instant::now() + self.tick_every, self.tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut guard: Option<MonitorGuard> = None;
        let mut requests_sent = 0usize;

        while !session.status().is_terminal() {
            // Command replies are sent after effects run and the new state is
            // published, so callers observe the state their command produced.
            let mut acknowledge = None;
            let was_running = session.status() == SessionStatus::InProgress;
            let effects = tokio::select! {
                envelope = commands.recv() => match envelope {
                    Some(Envelope { command, reply }) => {
                        match handle_command(&mut session, command) {
                            Ok(effects) => {
                                acknowledge = Some((reply, Ok(())));
                                effects
                            }
                            Err(err) => {
                                acknowledge = Some((reply, Err(err)));
                                Vec::new()
                            }
                        }
                    }
                    None => {
                        tracing::info!("session handle dropped; exiting session");
                        session.exit()
                    }
                },
                Some((ticket, reply)) = replies.recv() => {
                    match session.on_reply(ticket, reply) {
                        Ok(ReplyOutcome::Applied(effects)) => effects,
                        Ok(ReplyOutcome::Discarded) => Vec::new(),
                        Err(err) => {
                            tracing::warn!(%err, "service reply rejected");
                            Vec::new()
                        }
                    }
                }
                _ = ticker.tick() => session.tick(),
            };

            for effect in effects {
                match effect {
                    Effect::AcquireMonitor => match MonitorGuard::acquire(Arc::clone(&self.monitor)) {
                        Ok(acquired) => guard = Some(acquired),
                        Err(err) => tracing::warn!(%err, "continuing without exclusive monitoring"),
                    },
                    Effect::ReleaseMonitor => {
                        if let Some(held) = guard.take() {
                            held.release();
                        }
                    }
                    Effect::Request { ticket, request } => {
                        requests_sent += 1;
                        self.dispatch(ticket, request, replies_tx.clone());
                    }
                    Effect::Completed(outcome) => {
                        tracing::debug!(score = outcome.score, "outcome ready");
                    }
                }
            }

            // The first countdown second starts when the attempt does.
            if !was_running && session.status() == SessionStatus::InProgress {
                ticker.reset();
            }

            snapshots.send_replace(session.snapshot());
            if let Some((reply, result)) = acknowledge {
                let _ = reply.send(result);
            }
        }

        drop(guard);
        SessionReport {
            status: session.status(),
            outcome: session.outcome().cloned(),
            requests_sent,
        }
    }

    fn dispatch(
        &self,
        ticket: Ticket,
        request: ServiceRequest,
        replies: mpsc::UnboundedSender<(Ticket, ServiceReply)>,
    ) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            let reply = match request {
                ServiceRequest::Start(start) => ServiceReply::Started(api.start_adaptive(&start).await),
                ServiceRequest::Submit(submission) => {
                    ServiceReply::Answered(api.submit_answer(&submission).await)
                }
            };
            if replies.send((ticket, reply)).is_err() {
                tracing::debug!(ticket = ticket.value(), "session ended before reply arrived");
            }
        });
    }
}

fn handle_command(
    session: &mut TimedSession,
    command: SessionCommand,
) -> Result<Vec<Effect>, SessionError> {
    match command {
        SessionCommand::Start => session.start(),
        SessionCommand::SelectAnswer {
            question_id,
            option,
        } => session.select_answer(&question_id, option).map(|()| Vec::new()),
        SessionCommand::Advance => session.advance(),
        SessionCommand::Retreat => session.retreat().map(|()| Vec::new()),
        SessionCommand::SubmitCurrentAnswer => session.submit_current_answer(),
        SessionCommand::Submit => session.submit(),
        SessionCommand::RecordIntegrity(kind) => {
            session.record_integrity_event(kind);
            Ok(Vec::new())
        }
        SessionCommand::Exit => Ok(session.exit()),
    }
}

/// Async front to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Envelope>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Send a command and wait until the session has applied it.
    ///
    /// # Errors
    ///
    /// Returns the controller's `SessionError`, or
    /// `SessionError::DriverStopped` once the session has ended.
    pub async fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Envelope { command, reply })
            .await
            .map_err(|_| SessionError::DriverStopped)?;
        response.await.map_err(|_| SessionError::DriverStopped)?
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn start(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Start).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn select_answer(
        &self,
        question_id: QuestionId,
        option: usize,
    ) -> Result<(), SessionError> {
        self.send(SessionCommand::SelectAnswer {
            question_id,
            option,
        })
        .await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn advance(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Advance).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn retreat(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Retreat).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn submit_current_answer(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::SubmitCurrentAnswer).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn submit(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Submit).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn record_integrity_event(&self, kind: IntegrityKind) -> Result<(), SessionError> {
        self.send(SessionCommand::RecordIntegrity(kind)).await
    }

    /// # Errors
    ///
    /// See [`SessionHandle::send`].
    pub async fn exit(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Exit).await
    }

    /// Latest published state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait for the next published state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::DriverStopped` once the session has ended and
    /// no further states will be published.
    pub async fn changed(&mut self) -> Result<SessionSnapshot, SessionError> {
        self.snapshots
            .changed()
            .await
            .map_err(|_| SessionError::DriverStopped)?;
        Ok(self.snapshots.borrow_and_update().clone())
    }
}
