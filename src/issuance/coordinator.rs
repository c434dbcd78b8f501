//! Drives one certificate issuance attempt on its own thread.
//!
//! The coordinator reports everything through a single rendezvous channel of
//! [`CoordinatorEvent`]s and takes acknowledgments back through a single-slot
//! channel. After emitting a `Challenge` it parks until the caller
//! acknowledges; the authority is never asked to validate before that.
//!
//! Exactly one terminal event (`Error` or `Issued`) ends an attempt, unless
//! the caller hangs up first, in which case the thread exits silently.

use std::{
    fmt, io,
    sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, warn};

use crate::{
    core::types::{Acknowledgement, CoordinatorEvent},
    issuance::issuer::{Issuer, IssuerError},
};

/// Per-attempt state. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceState {
    Registering,
    OrderCreated,
    ChallengePublished,
    AwaitingAck,
    Validating,
    Issuing,
    Completed,
    Failed,
}

impl IssuanceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, IssuanceState::Completed | IssuanceState::Failed)
    }
}

impl fmt::Display for IssuanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssuanceState::Registering => "registering",
            IssuanceState::OrderCreated => "order_created",
            IssuanceState::ChallengePublished => "challenge_published",
            IssuanceState::AwaitingAck => "awaiting_ack",
            IssuanceState::Validating => "validating",
            IssuanceState::Issuing => "issuing",
            IssuanceState::Completed => "completed",
            IssuanceState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why an attempt stopped before completing.
enum Interrupt {
    Failed(String),
    CallerGone,
}

impl From<IssuerError> for Interrupt {
    fn from(value: IssuerError) -> Self {
        Interrupt::Failed(value.to_string())
    }
}

pub struct IssuanceCoordinator<I: Issuer> {
    issuer: I,
    ack_timeout: Option<Duration>,
}

impl<I: Issuer> IssuanceCoordinator<I> {
    pub fn new(issuer: I) -> Self {
        Self {
            issuer,
            ack_timeout: None,
        }
    }

    /// Bounds the wait for a challenge acknowledgment. When it elapses the
    /// attempt fails with an `Error` event.
    pub fn with_ack_timeout(mut self, ack_timeout: Option<Duration>) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Starts an issuance attempt for `domain` on a new thread and returns
    /// immediately.
    pub fn create(
        self,
        email: impl Into<String>,
        domain: impl Into<String>,
    ) -> io::Result<IssuanceHandle> {
        let email = email.into();
        let domain = domain.into();
        let (event_tx, event_rx) = mpsc::sync_channel(0);
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);

        let thread = thread::Builder::new()
            .name(format!("issuance-{domain}"))
            .spawn(move || {
                let mut attempt = Attempt {
                    state: IssuanceState::Registering,
                    events: event_tx,
                    acks: ack_rx,
                    ack_timeout: self.ack_timeout,
                };
                attempt.run(&self.issuer, &email, &domain);
                attempt.state
            })?;

        Ok(IssuanceHandle {
            events: event_rx,
            acks: ack_tx,
            thread,
        })
    }
}

/// Caller's side of a running attempt.
pub struct IssuanceHandle {
    events: Receiver<CoordinatorEvent>,
    acks: SyncSender<Acknowledgement>,
    thread: JoinHandle<IssuanceState>,
}

impl IssuanceHandle {
    /// Blocks until the next event. `None` means the coordinator thread ended
    /// without anything further to report.
    pub fn recv(&self) -> Option<CoordinatorEvent> {
        self.events.recv().ok()
    }

    /// Releases a coordinator parked on a challenge. Never blocks; fails only
    /// if the coordinator has already stopped listening.
    pub fn acknowledge(&self, ack: Acknowledgement) -> Result<(), Acknowledgement> {
        self.acks.try_send(ack).map_err(|err| match err {
            mpsc::TrySendError::Full(ack) | mpsc::TrySendError::Disconnected(ack) => ack,
        })
    }

    /// Hangs up both channels and waits for the coordinator thread, returning
    /// the state it stopped in.
    ///
    /// Only call this when the coordinator is known to be idle or parked on
    /// an acknowledgment; an in-flight authority request is waited out.
    pub fn finish(self) -> Option<IssuanceState> {
        let IssuanceHandle {
            events,
            acks,
            thread,
        } = self;
        drop(acks);
        drop(events);
        thread.join().ok()
    }
}

struct Attempt {
    state: IssuanceState,
    events: SyncSender<CoordinatorEvent>,
    acks: Receiver<Acknowledgement>,
    ack_timeout: Option<Duration>,
}

impl Attempt {
    fn run<I: Issuer>(&mut self, issuer: &I, email: &str, domain: &str) {
        match self.drive(issuer, email, domain) {
            Ok(()) => {}
            Err(Interrupt::Failed(reason)) => {
                warn!(
                    "[coordinator] attempt for {} failed while {}: {}",
                    domain, self.state, reason
                );
                self.transition(IssuanceState::Failed);
                if self.events.send(CoordinatorEvent::Error(reason)).is_err() {
                    debug!("[coordinator] caller gone before the error could be reported");
                }
            }
            Err(Interrupt::CallerGone) => {
                debug!(
                    "[coordinator] caller hung up while {}, abandoning attempt for {}",
                    self.state, domain
                );
            }
        }
    }

    fn drive<I: Issuer>(
        &mut self,
        issuer: &I,
        email: &str,
        domain: &str,
    ) -> Result<(), Interrupt> {
        let account = issuer.ensure_account(email)?;
        let mut order = issuer.begin_order(&account, domain)?;
        self.transition(IssuanceState::OrderCreated);
        self.emit(CoordinatorEvent::Progress(format!("order created for {domain}")))?;

        if let Some(challenge) = issuer.pending_challenge(&mut order)? {
            self.transition(IssuanceState::ChallengePublished);
            self.emit(CoordinatorEvent::Challenge(challenge))?;

            self.transition(IssuanceState::AwaitingAck);
            let ack = self.await_ack()?;

            self.transition(IssuanceState::Validating);
            self.emit(CoordinatorEvent::Progress(ack.to_string()))?;
            issuer.validate(&mut order)?;
        }

        self.transition(IssuanceState::Issuing);
        self.emit(CoordinatorEvent::Progress(format!("issuing certificate for {domain}")))?;
        let certificate = issuer.finalize(order)?;

        self.transition(IssuanceState::Completed);
        self.emit(CoordinatorEvent::Issued(certificate))
    }

    fn await_ack(&self) -> Result<Acknowledgement, Interrupt> {
        match self.ack_timeout {
            None => self.acks.recv().map_err(|_| Interrupt::CallerGone),
            Some(timeout) => self.acks.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => Interrupt::Failed(format!(
                    "challenge was not acknowledged within {}s",
                    timeout.as_secs_f32()
                )),
                RecvTimeoutError::Disconnected => Interrupt::CallerGone,
            }),
        }
    }

    fn emit(&self, event: CoordinatorEvent) -> Result<(), Interrupt> {
        self.events.send(event).map_err(|_| Interrupt::CallerGone)
    }

    fn transition(&mut self, next: IssuanceState) {
        debug!("[coordinator] {} -> {}", self.state, next);
        self.state = next;
    }
}
