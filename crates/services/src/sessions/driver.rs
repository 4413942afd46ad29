//! Event loop that runs one session against the wall clock.
//!
//! Everything that touches a session goes through a single `select!` over
//! user commands, the countdown tick and the pending post-expiry transition,
//! so no locking is needed and at most one transition is in flight.

use std::time::Duration as StdDuration;

use quiz_core::countdown::CountdownWatch;
use quiz_core::model::{QuizScore, ResultId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::service::{QuizSession, StepOutcome};
use super::workflow::QuizLoopService;

/// Input from whoever is taking the quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Answer(String),
    /// Zero-based position in the current question's options.
    SelectOption(usize),
    /// Free-form input, resolved by [`QuizSession::choose`].
    Choose(String),
    Next,
    Previous,
    Submit,
    Quit,
}

/// What the driver reports back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    QuestionShown {
        index: usize,
        total: usize,
        remaining_secs: u64,
    },
    Tick {
        index: usize,
        remaining_secs: u64,
    },
    AnswerRecorded {
        index: usize,
        answer: String,
    },
    AnswerRejected {
        index: usize,
    },
    NeedsAnswer {
        index: usize,
    },
    NotAllowed {
        index: usize,
    },
    TimeUp {
        index: usize,
        last: bool,
    },
    Completed {
        score: QuizScore,
    },
}

/// State handed back when the loop stops.
#[derive(Debug)]
pub struct DriverOutcome {
    pub session: QuizSession,
    /// Present when the session completed and a result write was started.
    pub submission: Option<JoinHandle<Option<ResultId>>>,
}

pub struct SessionDriver {
    service: QuizLoopService,
    session: QuizSession,
    events: mpsc::Sender<SessionEvent>,
}

struct PendingTransition {
    index: usize,
    at: Instant,
}

fn far_future() -> Instant {
    Instant::now() + StdDuration::from_secs(86_400 * 365)
}

impl SessionDriver {
    #[must_use]
    pub fn new(
        service: QuizLoopService,
        session: QuizSession,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            service,
            session,
            events,
        }
    }

    /// Run until the session completes, `Quit` arrives or the command
    /// channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) -> DriverOutcome {
        let settings = self.service.settings();
        let mut ticker = tokio::time::interval(settings.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut pending: Option<PendingTransition> = None;
        let mut watch = if self.session.is_complete() {
            None
        } else {
            Some(self.arm().await)
        };
        // resumed on a question whose time already ran out
        if watch.is_some() && self.session.is_expired(self.session.current_index()) {
            pending = Some(PendingTransition {
                index: self.session.current_index(),
                at: Instant::now() + settings.grace_period(),
            });
        }
        let mut saved = self.session.snapshot();
        if saved.is_some() {
            self.service.checkpoint(&self.session).await;
        }

        while let Some(active) = watch.as_mut() {
            let grace_at = pending.as_ref().map_or_else(far_future, |p| p.at);

            tokio::select! {
                biased;

                command = commands.recv() => {
                    match command {
                        None | Some(SessionCommand::Quit) => {
                            tracing::info!(index = self.session.current_index(), "session driver stopped");
                            break;
                        }
                        Some(command) => self.handle(command).await,
                    }
                }

                () = tokio::time::sleep_until(grace_at), if pending.is_some() => {
                    let due = pending.take();
                    if due.is_some_and(|p| p.index == self.session.current_index()) {
                        let outcome = self.session.auto_progress(self.service.clock().now());
                        self.report(outcome).await;
                    }
                }

                _ = ticker.tick() => {
                    let tick = active.poll(self.service.clock().now());
                    self.emit(SessionEvent::Tick {
                        index: tick.index,
                        remaining_secs: tick.remaining_secs,
                    })
                    .await;

                    // re-entering an already expired question stays put
                    if tick.expired_now && self.session.expire_current() {
                        let last = self.session.is_last();
                        tracing::info!(index = tick.index, last, "question timed out");
                        self.emit(SessionEvent::TimeUp { index: tick.index, last }).await;
                        pending = Some(PendingTransition {
                            index: tick.index,
                            at: Instant::now() + settings.grace_period(),
                        });
                    }
                }
            }

            if self.session.is_complete() {
                watch = None;
            } else if active_index(watch.as_ref()) != Some(self.session.current_index()) {
                pending = None;
                watch = Some(self.arm().await);
            }

            let current = self.session.snapshot();
            if current != saved {
                self.service.checkpoint(&self.session).await;
                saved = current;
            }
        }

        let submission = if self.session.is_complete() {
            match self.service.submit_in_background(&self.session) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    tracing::warn!(error = %err, "could not hand off result");
                    None
                }
            }
        } else {
            None
        };

        DriverOutcome {
            session: self.session,
            submission,
        }
    }

    async fn arm(&self) -> CountdownWatch {
        let watch = self.service.arm_current(&self.session).await;
        let remaining_secs =
            quiz_core::countdown::remaining_secs(self.service.clock().now(), watch.deadline());
        self.emit(SessionEvent::QuestionShown {
            index: watch.index(),
            total: self.session.total_questions(),
            remaining_secs,
        })
        .await;
        watch
    }

    async fn handle(&mut self, command: SessionCommand) {
        let index = self.session.current_index();
        match command {
            SessionCommand::Answer(value) => {
                let recorded = self.session.select_answer(value);
                self.answer_event(index, recorded).await;
            }
            SessionCommand::SelectOption(option) => {
                let recorded = self.session.select_option(option);
                self.answer_event(index, recorded).await;
            }
            SessionCommand::Choose(input) => {
                let recorded = self.session.choose(&input);
                self.answer_event(index, recorded).await;
            }
            SessionCommand::Next => {
                let outcome = self.session.advance();
                self.report(outcome).await;
            }
            SessionCommand::Previous => {
                let outcome = self.session.retreat();
                self.report(outcome).await;
            }
            SessionCommand::Submit => {
                let outcome = self.session.complete(self.service.clock().now());
                self.report(outcome).await;
            }
            SessionCommand::Quit => {}
        }
    }

    async fn answer_event(&self, index: usize, recorded: bool) {
        let event = match self.session.current_answer() {
            Some(answer) if recorded => SessionEvent::AnswerRecorded {
                index,
                answer: answer.to_owned(),
            },
            _ => SessionEvent::AnswerRejected { index },
        };
        self.emit(event).await;
    }

    async fn report(&self, outcome: StepOutcome) {
        let index = self.session.current_index();
        match outcome {
            StepOutcome::Advanced { .. } | StepOutcome::Retreated { .. } => {}
            StepOutcome::Completed { score } => {
                self.emit(SessionEvent::Completed { score }).await;
            }
            StepOutcome::NeedsAnswer => self.emit(SessionEvent::NeedsAnswer { index }).await,
            StepOutcome::NotAllowed => self.emit(SessionEvent::NotAllowed { index }).await,
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

fn active_index(watch: Option<&CountdownWatch>) -> Option<usize> {
    watch.map(CountdownWatch::index)
}
