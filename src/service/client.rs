//! Session-driving client.
//!
//! [`TransferClient`] owns the [`Session`] and performs every protocol
//! round-trip on a fresh connection: encode the request, send it as frames,
//! read back one response, validate the header and decode the payload. The
//! connection is dropped at the end of each round-trip whatever the outcome.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use zeroize::Zeroizing;

use crate::config::ClientConfig;
use crate::core::packet::{ResponseCode, ResponseHeader, RESPONSE_HEADER_SIZE};
use crate::core::types::{ClientId, SymmetricKey};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::message::{decode_declared_payload, response_len, Request, ResponsePayload};
use crate::protocol::session::{validate_username, Persistence, Session, StoredIdentity};
use crate::protocol::validator::validate;
use crate::transport::framed::FramedConnection;
use crate::transport::tcp::{Connector, TcpConnector};
use crate::utils::crypto::CryptoProvider;
use crate::utils::metrics::Metrics;

pub struct TransferClient<C, P, S> {
    pub(crate) config: ClientConfig,
    connector: C,
    pub(crate) crypto: P,
    pub(crate) persistence: S,
    pub(crate) session: Session,
    pub(crate) metrics: Arc<Metrics>,
}

impl<P, S> TransferClient<TcpConnector, P, S>
where
    P: CryptoProvider,
    S: Persistence,
{
    /// Client that dials `config.address` over TCP.
    pub fn over_tcp(config: ClientConfig, crypto: P, persistence: S) -> Self {
        let connector = TcpConnector::from_config(&config);
        Self::new(config, connector, crypto, persistence)
    }
}

impl<C, P, S> TransferClient<C, P, S>
where
    C: Connector,
    P: CryptoProvider,
    S: Persistence,
{
    pub fn new(config: ClientConfig, connector: C, crypto: P, persistence: S) -> Self {
        Self {
            config,
            connector,
            crypto,
            persistence,
            session: Session::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share an existing metrics collector
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn crypto(&self) -> &P {
        &self.crypto
    }

    pub fn persistence(&self) -> &S {
        &self.persistence
    }

    async fn open(&self) -> Result<FramedConnection<C::Stream>> {
        let stream = self.connector.connect().await?;
        Ok(FramedConnection::new(stream)
            .with_timeouts(self.config.operation_timeout, self.config.response_timeout)
            .with_metrics(Arc::clone(&self.metrics)))
    }

    /// Send `request` on a new connection and return the validated response.
    pub(crate) async fn round_trip(
        &self,
        request: &Request,
        expected: ResponseCode,
    ) -> Result<ResponsePayload> {
        self.metrics.round_trip_started();
        let result = self.exchange(request, expected).await;
        if let Err(e) = &result {
            self.metrics.round_trip_failed();
            debug!(code = request.code().as_u16(), error = %e, "Round-trip failed");
        }
        result
    }

    async fn exchange(&self, request: &Request, expected: ResponseCode) -> Result<ResponsePayload> {
        let mut conn = self.open().await?;
        conn.send(&request.encode()?).await?;
        let bytes = conn
            .receive_message(RESPONSE_HEADER_SIZE, |prefix| {
                let header = ResponseHeader::from_bytes(prefix)?;
                validate(&header, expected)?;
                response_len(&header)
            })
            .await?;

        let header = ResponseHeader::from_bytes(&bytes)?;
        let payload = decode_declared_payload(&header, &bytes[RESPONSE_HEADER_SIZE..])?;

        if let Err(e) = conn.close().await {
            debug!(error = %e, "Ignoring error while closing connection");
        }
        Ok(payload)
    }

    /// Send a one-way notice; the server does not answer these.
    pub(crate) async fn notify(&self, request: &Request) -> Result<()> {
        self.metrics.round_trip_started();
        let result = async {
            let mut conn = self.open().await?;
            conn.send(&request.encode()?).await?;
            conn.close().await
        }
        .await;
        if result.is_err() {
            self.metrics.round_trip_failed();
        }
        result
    }

    fn check_echo(&self, echoed: ClientId) {
        if echoed != self.session.client_id() {
            warn!(
                expected = %self.session.client_id(),
                echoed = %echoed,
                "Server echoed a different client id"
            );
        }
    }

    /// Load the stored identity and resume as `Registered`.
    #[instrument(skip(self))]
    pub fn restore_identity(&mut self) -> Result<ClientId> {
        let identity = self
            .persistence
            .load_identity()?
            .ok_or_else(|| ProtocolError::Persistence(constants::ERR_NO_IDENTITY.to_string()))?;

        self.session = Session::restore(identity);
        let client_id = self.session.require_client_id()?;
        info!(username = %self.session.username(), client_id = %client_id, "Identity restored");
        Ok(client_id)
    }

    /// Register `username` with the server.
    ///
    /// On success a new keypair is generated and the identity is stored
    /// before the session moves to `Registered`.
    #[instrument(skip(self))]
    pub async fn register(&mut self, username: &str) -> Result<ClientId> {
        let name = validate_username(username)?;
        let request = Request::Registration { name: name.clone() };

        match self
            .round_trip(&request, ResponseCode::RegistrationSuccess)
            .await?
        {
            ResponsePayload::RegistrationSuccess { client_id } => {
                let (public_key, private_key) = self.crypto.generate_keypair()?;
                self.persistence.store_identity(&StoredIdentity {
                    username: name.clone(),
                    client_id,
                    private_key: private_key.clone(),
                })?;
                self.session
                    .complete_registration(name, client_id, public_key, private_key);
                info!(client_id = %client_id, "Registered");
                Ok(client_id)
            }
            ResponsePayload::RegistrationFailure => {
                warn!("Server refused the registration");
                Err(ProtocolError::RegistrationDenied)
            }
            other => Err(unexpected(ResponseCode::RegistrationSuccess, &other)),
        }
    }

    /// Send our public key and install the session key the server returns.
    #[instrument(skip(self))]
    pub async fn exchange_key(&mut self) -> Result<()> {
        let client_id = self.session.require_client_id()?;
        let public_key = match self.session.public_key().cloned() {
            Some(key) => key,
            None => {
                let key = self
                    .crypto
                    .public_key(self.session.require_private_key()?)?;
                self.session.set_public_key(key.clone());
                key
            }
        };

        let request = Request::SendPublicKey {
            client_id,
            name: self.session.username().clone(),
            public_key,
        };

        match self.round_trip(&request, ResponseCode::KeyExchange).await? {
            ResponsePayload::KeyExchange {
                client_id: echoed,
                encrypted_key,
            } => {
                self.check_echo(echoed);
                self.install_session_key(&encrypted_key)?;
                info!("Session key established");
                Ok(())
            }
            other => Err(unexpected(ResponseCode::KeyExchange, &other)),
        }
    }

    /// Ask the server to recognise a stored identity and issue a new key.
    #[instrument(skip(self))]
    pub async fn reconnect(&mut self) -> Result<()> {
        let client_id = self.session.require_client_id()?;
        let request = Request::Reconnect {
            client_id,
            name: self.session.username().clone(),
        };

        match self
            .round_trip(&request, ResponseCode::ReconnectionAccepted)
            .await?
        {
            ResponsePayload::ReconnectionAccepted {
                client_id: echoed,
                encrypted_key,
            } => {
                self.check_echo(echoed);
                self.install_session_key(&encrypted_key)?;
                info!("Reconnected");
                Ok(())
            }
            ResponsePayload::ReconnectionDenied { .. } => {
                self.session.deny();
                warn!("Server denied the reconnection");
                Err(ProtocolError::ReconnectionDenied)
            }
            other => Err(unexpected(ResponseCode::ReconnectionAccepted, &other)),
        }
    }

    fn install_session_key(&mut self, encrypted_key: &[u8]) -> Result<()> {
        let unwrapped = self.session.require_private_key().and_then(|private| {
            let plaintext = Zeroizing::new(self.crypto.rsa_decrypt(private, encrypted_key)?);
            SymmetricKey::from_slice(&plaintext)
        });

        match unwrapped {
            Ok(key) => {
                self.session.install_key(key);
                self.metrics.key_installed();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Discarding unusable session key");
                self.session.discard_key();
                Err(e)
            }
        }
    }
}

pub(crate) fn unexpected(expected: ResponseCode, got: &ResponsePayload) -> ProtocolError {
    ProtocolError::UnexpectedResponseCode {
        expected: expected.as_u16(),
        got: got.code().as_u16(),
    }
}
