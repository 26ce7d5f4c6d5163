//! Lock-guarded control channel session
//!
//! [`EslSession`] owns at most one live transport. Every command takes the
//! lock, connects lazily when no transport is cached, and holds the lock for
//! the whole write/read exchange so replies can never interleave. Transport
//! failures and timeouts drop the cached transport; the next command
//! reconnects. There is no retry and no backoff.

use crate::command::Command;
use crate::constants::COMMAND_TIMEOUT_SECS;
use crate::error::EslError;
use crate::event::EslEvent;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// One authenticated connection able to run `api` commands
#[async_trait]
pub trait EslTransport: Send {
    /// Write the command and return the frame that answers it
    async fn api(&mut self, command: &Command) -> Result<EslEvent, EslError>;

    /// Release the underlying socket
    async fn close(&mut self);
}

/// Factory for transports
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn EslTransport>, EslError>;
}

/// What handlers depend on: send a command, get the reply payload back
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn send(&self, command: Command) -> Result<String, EslError>;
}

#[derive(Default)]
struct Slot {
    conn: Option<Box<dyn EslTransport>>,
    /// Set while a command is on the wire. Still set on lock acquisition
    /// means the previous holder was cancelled before reading its reply.
    in_flight: bool,
}

impl Slot {
    async fn reset(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
        self.in_flight = false;
    }
}

/// The single persistent control channel to the switch
pub struct EslSession {
    connector: Box<dyn Connector>,
    slot: Mutex<Slot>,
    command_timeout: Duration,
}

impl EslSession {
    pub fn new(connector: Box<dyn Connector>) -> Self {
        Self {
            connector,
            slot: Mutex::new(Slot::default()),
            command_timeout: Duration::from_secs(COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_command_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Release the connection if present; safe to call repeatedly
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if slot.conn.is_some() {
            info!("Closing ESL session");
        }
        slot.reset().await;
    }
}

#[async_trait]
impl CommandChannel for EslSession {
    async fn send(&self, command: Command) -> Result<String, EslError> {
        let mut guard = self.slot.lock().await;
        let slot = &mut *guard;

        if slot.in_flight {
            warn!("Previous ESL command was abandoned mid-exchange, dropping connection");
            slot.reset().await;
        }

        if slot.conn.is_none() {
            match self.connector.connect().await {
                Ok(conn) => {
                    info!("ESL session connected");
                    slot.conn = Some(conn);
                }
                Err(e) => {
                    error!(error = %e, "Failed to establish ESL connection");
                    return Err(e);
                }
            }
        }

        debug!(command = %command, "Sending ESL command");
        slot.in_flight = true;

        let result = match slot.conn.as_mut() {
            Some(conn) => timeout(self.command_timeout, conn.api(&command)).await,
            None => return Err(EslError::Closed),
        };

        match result {
            Ok(Ok(event)) => {
                slot.in_flight = false;
                event.into_reply()
            }
            Ok(Err(e)) if e.is_transport() => {
                warn!(command = %command, error = %e, "ESL transport failure, dropping connection");
                slot.reset().await;
                Err(e)
            }
            Ok(Err(e)) => {
                slot.in_flight = false;
                Err(e)
            }
            Err(_) => {
                warn!(
                    command = %command,
                    timeout_secs = self.command_timeout.as_secs_f64(),
                    "ESL command timed out, dropping connection"
                );
                slot.reset().await;
                Err(EslError::Timeout(self.command_timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    impl EslSession {
        async fn is_connected(&self) -> bool {
            self.slot.lock().await.conn.is_some()
        }
    }

    enum Step {
        Reply(&'static str),
        Fail,
        Hang,
    }

    #[derive(Clone, Default)]
    struct Counters {
        connects: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
    }

    struct ScriptedConnector {
        script: Arc<std::sync::Mutex<VecDeque<Step>>>,
        counters: Counters,
        refuse: bool,
    }

    impl ScriptedConnector {
        fn new(steps: Vec<Step>) -> (Self, Counters) {
            let counters = Counters::default();
            let connector = Self {
                script: Arc::new(std::sync::Mutex::new(steps.into())),
                counters: counters.clone(),
                refuse: false,
            };
            (connector, counters)
        }
    }

    struct ScriptedTransport {
        script: Arc<std::sync::Mutex<VecDeque<Step>>>,
        counters: Counters,
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self) -> Result<Box<dyn EslTransport>, EslError> {
            self.counters.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(EslError::Connection("Connection refused".into()));
            }
            Ok(Box::new(ScriptedTransport {
                script: self.script.clone(),
                counters: self.counters.clone(),
            }))
        }
    }

    #[async_trait]
    impl EslTransport for ScriptedTransport {
        async fn api(&mut self, _command: &Command) -> Result<EslEvent, EslError> {
            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(body)) => {
                    let mut event = EslEvent::from_headers("Content-Type: api/response\n");
                    event.set_body(body);
                    Ok(event)
                }
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(EslError::Closed)
                }
                Some(Step::Fail) | None => Err(EslError::Closed),
            }
        }

        async fn close(&mut self) {
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_lazy_connect_and_reuse() {
        let (connector, counters) = ScriptedConnector::new(vec![Step::Reply("one"), Step::Reply("two")]);
        let session = EslSession::new(Box::new(connector));
        assert!(!session.is_connected().await);

        assert_eq!(session.send(Command::bare("status")).await.unwrap(), "one");
        assert_eq!(session.send(Command::bare("status")).await.unwrap(), "two");
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_forces_reconnect() {
        let (connector, counters) = ScriptedConnector::new(vec![Step::Fail, Step::Reply("+OK")]);
        let session = EslSession::new(Box::new(connector));

        let err = session.send(Command::bare("status")).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!session.is_connected().await);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

        assert_eq!(session.send(Command::bare("status")).await.unwrap(), "+OK");
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remote_error_keeps_connection() {
        let (connector, counters) =
            ScriptedConnector::new(vec![Step::Reply("-ERR No such channel!\n"), Step::Reply("+OK")]);
        let session = EslSession::new(Box::new(connector));

        let err = session
            .send(Command::new("uuid_kill", "abc NORMAL_CLEARING"))
            .await
            .unwrap_err();
        assert!(matches!(err, EslError::Remote(ref m) if m == "-ERR No such channel!"));
        assert!(session.is_connected().await);

        session.send(Command::bare("status")).await.unwrap();
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_tears_down_connection() {
        let (connector, counters) = ScriptedConnector::new(vec![Step::Hang, Step::Reply("+OK")]);
        let session =
            EslSession::new(Box::new(connector)).with_command_timeout(Duration::from_millis(50));

        let err = session.send(Command::bare("status")).await.unwrap_err();
        assert!(matches!(err, EslError::Timeout(_)));
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

        assert_eq!(session.send(Command::bare("status")).await.unwrap(), "+OK");
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let (mut connector, counters) = ScriptedConnector::new(vec![]);
        connector.refuse = true;
        let session = EslSession::new(Box::new(connector));

        let err = session.send(Command::bare("status")).await.unwrap_err();
        assert!(matches!(err, EslError::Connection(_)));
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (connector, counters) = ScriptedConnector::new(vec![Step::Reply("a"), Step::Reply("b")]);
        let session = EslSession::new(Box::new(connector));

        session.send(Command::bare("status")).await.unwrap();
        session.close().await;
        session.close().await;
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

        assert_eq!(session.send(Command::bare("status")).await.unwrap(), "b");
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_senders_share_one_connection() {
        let (connector, counters) = ScriptedConnector::new(vec![Step::Reply("x"), Step::Reply("x")]);
        let session = Arc::new(EslSession::new(Box::new(connector)));

        let a = tokio::spawn({
            let session = session.clone();
            async move { session.send(Command::bare("status")).await }
        });
        let b = tokio::spawn({
            let session = session.clone();
            async move { session.send(Command::bare("status")).await }
        });

        assert_eq!(a.await.unwrap().unwrap(), "x");
        assert_eq!(b.await.unwrap().unwrap(), "x");
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_command_drops_connection() {
        let (connector, counters) = ScriptedConnector::new(vec![Step::Hang, Step::Reply("fresh")]);
        let session = Arc::new(EslSession::new(Box::new(connector)));

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.send(Command::bare("status")).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        pending.abort();
        let _ = pending.await;

        assert_eq!(session.send(Command::bare("status")).await.unwrap(), "fresh");
        assert_eq!(counters.connects.load(Ordering::SeqCst), 2);
        assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    }
}
