//! TCP transport to the FreeSWITCH event socket

use crate::command::Command;
use crate::constants::AUTH_COMMAND;
use crate::error::EslError;
use crate::event::EslEvent;
use crate::session::{Connector, EslTransport};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// An authenticated inbound ESL connection
pub struct EslConnection {
    reader: BufReader<TcpStream>,
    server_id: String,
}

impl EslConnection {
    /// Connect, wait for the `auth/request` greeting and authenticate
    pub async fn connect(addr: &str, password: &str) -> Result<Self, EslError> {
        info!("Connecting to FreeSWITCH ESL: {}", addr);

        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| EslError::Connection(format!("{}: {}", addr, e)))?;

        let mut conn = Self {
            reader: BufReader::new(stream),
            server_id: addr.to_string(),
        };

        // Read greeting
        let greeting = conn.read_message().await?;
        if !greeting.is_auth_request() {
            return Err(EslError::Protocol(format!(
                "unexpected greeting from {}: {}",
                addr, greeting
            )));
        }

        debug!("Received auth request from {}", addr);

        // Authenticate
        conn.write_raw(&format!("{} {}\n\n", AUTH_COMMAND, password))
            .await?;

        let reply = conn.read_message().await?;
        if !reply.is_ok() {
            return Err(EslError::Connection(format!(
                "authentication failed: {}",
                reply.reply_text().unwrap_or("no reply text")
            )));
        }

        info!("Authenticated to FreeSWITCH: {}", addr);
        Ok(conn)
    }

    /// Read one frame: header lines up to a blank line, then
    /// `Content-Length` bytes of body if announced
    async fn read_message(&mut self) -> Result<EslEvent, EslError> {
        let mut head = String::new();

        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(EslError::Closed);
            }

            let line = line.trim_end_matches(&['\r', '\n'][..]);
            if line.is_empty() {
                // Blank lines between frames carry nothing
                if head.is_empty() {
                    continue;
                }
                break;
            }

            head.push_str(line);
            head.push('\n');
        }

        let mut event = EslEvent::from_headers(&head);

        if let Some(len) = event.content_length().filter(|len| *len > 0) {
            let mut body = vec![0u8; len];
            self.reader.read_exact(&mut body).await?;
            event.set_body(String::from_utf8_lossy(&body).into_owned());
        }

        Ok(event)
    }

    async fn write_raw(&mut self, data: &str) -> Result<(), EslError> {
        let stream = self.reader.get_mut();
        stream.write_all(data.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl EslTransport for EslConnection {
    async fn api(&mut self, command: &Command) -> Result<EslEvent, EslError> {
        self.write_raw(&command.wire()).await?;

        // Keep reading until the frame answering the command arrives
        loop {
            let event = self.read_message().await?;

            if event.is_reply() {
                return Ok(event);
            }

            if event.is_disconnect_notice() {
                warn!("FreeSWITCH {} sent disconnect notice", self.server_id);
                return Err(EslError::Closed);
            }

            debug!(
                content_type = event.content_type().unwrap_or("none"),
                "Skipping unsolicited frame while waiting for reply"
            );
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.reader.get_mut().shutdown().await {
            debug!(error = %e, "ESL socket shutdown failed");
        }
        info!("Closed ESL connection to {}", self.server_id);
    }
}

/// Opens [`EslConnection`]s to a fixed address
pub struct TcpConnector {
    addr: String,
    password: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(
        addr: impl Into<String>,
        password: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            addr: addr.into(),
            password: password.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn EslTransport>, EslError> {
        let conn = timeout(
            self.connect_timeout,
            EslConnection::connect(&self.addr, &self.password),
        )
        .await
        .map_err(|_| {
            EslError::Connection(format!(
                "timed out after {:?} connecting to {}",
                self.connect_timeout, self.addr
            ))
        })??;

        Ok(Box::new(conn))
    }
}
