//! Connection establishment.
//!
//! Every round-trip opens its own stream through a [`Connector`]. The
//! production connector dials TCP; tests substitute an in-memory one.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{ProtocolError, Result};
use crate::utils::timeout::{with_timeout_error, DEFAULT_TIMEOUT};

/// Source of fresh byte streams to the server.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Stream: AsyncRead + AsyncWrite + Unpin;

    async fn connect(&self) -> Result<Self::Stream>;
}

/// Dials the configured `host:port` over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            address: config.address.clone(),
            timeout: config.connection_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    #[instrument(skip(self), fields(address = %self.address))]
    async fn connect(&self) -> Result<TcpStream> {
        let stream = with_timeout_error(
            async {
                TcpStream::connect(&self.address)
                    .await
                    .map_err(|e| ProtocolError::ConnectFailed {
                        address: self.address.clone(),
                        reason: e.to_string(),
                    })
            },
            self.timeout,
        )
        .await?;

        stream.set_nodelay(true)?;
        debug!("Connected");
        Ok(stream)
    }
}
