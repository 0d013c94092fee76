//! The client event loop.
//!
//! One task owns the [`RoomSession`] and is the only place where timers, connection attempts
//! and the transport session are driven. Handlers run to completion one at a time, so the
//! session needs no locking.

use std::{future, pin::Pin, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    config::ClientConfig,
    dto::events::{InboundEvent, OutboundEvent},
    error::{ResetError, TransportError},
    services::{
        dispatch::{self, Command, Effect},
        reconciler,
        reset::{self, RoomReloader},
    },
    state::{
        RoomSession,
        clock::TICK_PERIOD,
        connection::{ConnectionAction, ConnectionManager, ConnectionTrigger},
    },
    transport::{Connector, TransportSession, TransportSignal},
    view::RoomView,
};

/// Input accepted by the running client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCommand {
    /// A player action.
    Session(Command),
    /// The client came back to the foreground; reconnect now if disconnected.
    VisibilityRegained,
    /// Stop the event loop and drop the transport session.
    Shutdown,
}

/// Runtime parameters not owned by the session.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Fixed delay before retrying a failed connection.
    pub retry_delay: Duration,
    /// Room page URL with the reset marker, used by the reload reset.
    pub reset_url: String,
}

impl RuntimeOptions {
    /// Options for `room` derived from the client configuration.
    pub fn from_config(config: &ClientConfig, room: &str) -> Self {
        Self {
            retry_delay: config.retry_delay,
            reset_url: config.reset_url(room),
        }
    }
}

/// Cloneable handle used by the front-end to drive the client.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    tx: mpsc::UnboundedSender<RuntimeCommand>,
}

impl ClientHandle {
    /// Forward a player action. Returns `false` once the client stopped.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(RuntimeCommand::Session(command)).is_ok()
    }

    /// Signal that the client is visible again.
    pub fn wake(&self) -> bool {
        self.tx.send(RuntimeCommand::VisibilityRegained).is_ok()
    }

    /// Ask the event loop to stop.
    pub fn shutdown(&self) -> bool {
        self.tx.send(RuntimeCommand::Shutdown).is_ok()
    }
}

/// Start the client: connects immediately and publishes a fresh [`RoomView`] after every change.
///
/// The join handle yields the session once the loop stops.
pub fn spawn<C>(
    session: RoomSession,
    connector: C,
    options: RuntimeOptions,
) -> (ClientHandle, watch::Receiver<RoomView>, JoinHandle<RoomSession>)
where
    C: Connector,
{
    let (tx, commands) = mpsc::unbounded_channel();
    let (view_tx, view_rx) = watch::channel(session.view());
    let (attempt_tx, attempts) = mpsc::unbounded_channel();
    let (reset_tx, resets) = mpsc::unbounded_channel();

    let event_loop = EventLoop {
        manager: ConnectionManager::new(options.retry_delay),
        clock_epoch: session.clock().epoch(),
        session,
        connector,
        reloader: RoomReloader::new(),
        reset_url: options.reset_url,
        view_tx,
        attempt_tx,
        reset_tx,
        attempt_id: 0,
        link: None,
        retry: None,
        ticker: None,
    };
    let task = tokio::spawn(event_loop.run(commands, attempts, resets));

    (ClientHandle { tx }, view_rx, task)
}

type AttemptOutcome = (u64, Result<TransportSession, TransportError>);

struct EventLoop<C> {
    session: RoomSession,
    connector: C,
    manager: ConnectionManager,
    reloader: RoomReloader,
    reset_url: String,
    view_tx: watch::Sender<RoomView>,
    attempt_tx: mpsc::UnboundedSender<AttemptOutcome>,
    reset_tx: mpsc::UnboundedSender<Result<(), ResetError>>,
    attempt_id: u64,
    link: Option<TransportSession>,
    retry: Option<Pin<Box<Sleep>>>,
    ticker: Option<Interval>,
    clock_epoch: u64,
}

impl<C> EventLoop<C>
where
    C: Connector,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<RuntimeCommand>,
        mut attempts: mpsc::UnboundedReceiver<AttemptOutcome>,
        mut resets: mpsc::UnboundedReceiver<Result<(), ResetError>>,
    ) -> RoomSession {
        let action = self.manager.handle(ConnectionTrigger::ConnectRequested);
        self.perform(action);
        self.publish();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(RuntimeCommand::Shutdown) => break,
                    Some(RuntimeCommand::VisibilityRegained) => {
                        let action = self.manager.handle(ConnectionTrigger::VisibilityRegained);
                        self.perform(action);
                    }
                    Some(RuntimeCommand::Session(command)) => {
                        match dispatch::execute(&mut self.session, command) {
                            Some(Effect::Emit(event)) => self.emit(event),
                            Some(Effect::ReloadRoom) => self.reload(),
                            None => {}
                        }
                    }
                },
                Some((id, outcome)) = attempts.recv() => self.on_attempt(id, outcome),
                signal = next_signal(&mut self.link) => self.on_signal(signal),
                _ = next_tick(&mut self.ticker) => {
                    reconciler::on_clock_tick(&mut self.session);
                }
                _ = retry_elapsed(&mut self.retry) => {
                    self.retry = None;
                    let action = self.manager.handle(ConnectionTrigger::RetryElapsed);
                    self.perform(action);
                }
                Some(outcome) = resets.recv() => {
                    let _ = reset::complete_reload(&mut self.session, outcome);
                }
            }

            self.sync_clock();
            self.publish();
        }

        info!(room = %self.session.room(), "client stopped");
        self.session
    }

    fn perform(&mut self, action: ConnectionAction) {
        match action {
            ConnectionAction::ConnectNow => {
                self.retry = None;
                self.attempt_id += 1;
                let id = self.attempt_id;
                info!(
                    room = %self.session.room(),
                    attempt = self.manager.attempts(),
                    "connecting"
                );

                // Attempts are fire-and-forget; a late success is discarded by the manager.
                let connector = self.connector.clone();
                let tx = self.attempt_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send((id, connector.connect().await));
                });
            }
            ConnectionAction::ScheduleRetry(delay) => {
                debug!(delay_ms = delay.as_millis() as u64, "scheduling reconnect");
                self.retry = Some(Box::pin(sleep(delay)));
            }
            ConnectionAction::Adopt | ConnectionAction::Discard | ConnectionAction::Wait => {}
        }
        self.session.set_connection(self.manager.status());
    }

    fn on_attempt(&mut self, id: u64, outcome: Result<TransportSession, TransportError>) {
        match outcome {
            Ok(transport) => match self.manager.handle(ConnectionTrigger::Established) {
                ConnectionAction::Adopt => {
                    info!(room = %self.session.room(), "connected");
                    self.link = Some(transport);
                    self.session.set_connection(self.manager.status());
                    if let Some(request) = self.session.gate.reauth_request() {
                        info!(room = %self.session.room(), "re-joining room after reconnect");
                        self.emit(OutboundEvent::Auth(request));
                    }
                }
                _ => debug!("dropping redundant transport session"),
            },
            Err(err) if id != self.attempt_id => {
                debug!(error = %err, "ignoring failure of a superseded attempt");
            }
            Err(err) => {
                warn!(
                    room = %self.session.room(),
                    attempt = self.manager.attempts(),
                    error = %err,
                    "connection attempt failed"
                );
                let action = self.manager.handle(ConnectionTrigger::AttemptFailed);
                self.perform(action);
            }
        }
    }

    fn on_signal(&mut self, signal: TransportSignal) {
        match signal {
            TransportSignal::Event(event) => {
                let name = event.name.clone();
                match InboundEvent::from_wire(event) {
                    Ok(event) => dispatch::handle_inbound(&mut self.session, event),
                    Err(err) => warn!(event = %name, error = %err, "dropping malformed server event"),
                }
            }
            TransportSignal::Closed => {
                warn!(room = %self.session.room(), "connection lost");
                self.link = None;
                let action = self.manager.handle(ConnectionTrigger::Lost);
                self.perform(action);
            }
        }
    }

    fn emit(&mut self, event: OutboundEvent) {
        let Some(link) = &self.link else {
            warn!(event = event.name(), "not connected; dropping event");
            return;
        };
        match event.to_wire() {
            Ok(wire) => {
                if let Err(err) = link.send(wire) {
                    warn!(event = event.name(), error = %err, "failed to emit event");
                }
            }
            Err(err) => warn!(event = event.name(), error = %err, "failed to encode event"),
        }
    }

    fn reload(&self) {
        info!(url = %self.reset_url, "resetting room");
        let reloader = self.reloader.clone();
        let url = self.reset_url.clone();
        let tx = self.reset_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(reloader.reload(&url).await);
        });
    }

    /// Keep exactly one interval alive while the clock runs.
    fn sync_clock(&mut self) {
        let clock = self.session.clock();
        if clock.epoch() == self.clock_epoch {
            return;
        }
        self.clock_epoch = clock.epoch();
        self.ticker = clock.is_running().then(|| {
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
    }

    fn publish(&self) {
        let view = self.session.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}

async fn next_signal(link: &mut Option<TransportSession>) -> TransportSignal {
    match link {
        Some(link) => link.recv().await,
        None => future::pending().await,
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => future::pending().await,
    }
}

async fn retry_elapsed(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}
