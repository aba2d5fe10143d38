//! Client session state.
//!
//! A [`Session`] holds everything one device knows about itself: the
//! username it registered with, the server-assigned [`ClientId`], its RSA
//! keypair and the current AES session key. The round-trips that move it
//! between states live in [`crate::service::client`]; this module only
//! enforces which transitions are legal.
//!
//! ```text
//! Unidentified --register--> Registered --exchange/reconnect--> KeyEstablished
//!                                 |                                   |
//!                                 +--reconnect denied--> Denied       |
//!                                                                     v
//!                               Done <--checksum confirmed-- Transferring
//!                                                                     |
//!                                              Failed <--abandoned----+
//! ```

use std::path::{Path, PathBuf};

use crate::core::types::{ClientId, Name, PublicKey, SymmetricKey};
use crate::error::{constants, ProtocolError, Result};
use crate::utils::crypto::PrivateKey;

/// Where a session stands in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unidentified,
    Registered,
    KeyEstablished,
    Transferring,
    Done,
    Denied,
    Failed,
}

/// Identity material that outlives a single run of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredIdentity {
    pub username: Name,
    pub client_id: ClientId,
    pub private_key: PrivateKey,
}

/// Storage collaborator for identity records and upload sources.
///
/// Implementations decide the on-disk format; the engine only asks for the
/// three operations below.
pub trait Persistence {
    /// The previously stored identity, if there is one.
    fn load_identity(&self) -> Result<Option<StoredIdentity>>;

    /// Replace the stored identity after a successful registration.
    fn store_identity(&self, identity: &StoredIdentity) -> Result<()>;

    /// Full contents of the file to upload.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Validate a username for registration: non-empty ASCII alphanumerics that
/// fit a name field.
pub fn validate_username(username: &str) -> Result<Name> {
    if username.is_empty() {
        return Err(ProtocolError::InvalidUsername(
            constants::ERR_USERNAME_EMPTY.to_string(),
        ));
    }
    if !username.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ProtocolError::InvalidUsername(
            constants::ERR_USERNAME_CHARSET.to_string(),
        ));
    }
    Name::new(username).map_err(|e| ProtocolError::InvalidUsername(e.to_string()))
}

/// File name sent on the wire for `path`: its final component only.
pub fn wire_file_name(path: &Path) -> Result<Name> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ProtocolError::InvalidName(constants::ERR_NO_FILE_NAME.to_string()))?;
    Name::new(name)
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    username: Name,
    client_id: ClientId,
    public_key: Option<PublicKey>,
    private_key: Option<PrivateKey>,
    symmetric_key: Option<SymmetricKey>,
    pending_file: Option<PathBuf>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A device that has never registered.
    pub fn new() -> Self {
        Self {
            state: SessionState::Unidentified,
            username: Name::default(),
            client_id: ClientId::UNASSIGNED,
            public_key: None,
            private_key: None,
            symmetric_key: None,
            pending_file: None,
        }
    }

    /// Resume from a stored identity. The session key is never stored, so
    /// the result is `Registered` and needs a reconnect before uploading.
    pub fn restore(identity: StoredIdentity) -> Self {
        let state = if identity.client_id.is_assigned() {
            SessionState::Registered
        } else {
            SessionState::Unidentified
        };
        Self {
            state,
            username: identity.username,
            client_id: identity.client_id,
            public_key: None,
            private_key: Some(identity.private_key),
            symmetric_key: None,
            pending_file: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> &Name {
        &self.username
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    pub fn symmetric_key(&self) -> Option<&SymmetricKey> {
        self.symmetric_key.as_ref()
    }

    pub fn has_symmetric_key(&self) -> bool {
        self.symmetric_key.is_some()
    }

    pub fn pending_file(&self) -> Option<&Path> {
        self.pending_file.as_deref()
    }

    pub fn set_pending_file(&mut self, path: impl Into<PathBuf>) {
        self.pending_file = Some(path.into());
    }

    /// The assigned client id, or `NotRegistered`.
    pub fn require_client_id(&self) -> Result<ClientId> {
        if self.client_id.is_assigned() {
            Ok(self.client_id)
        } else {
            Err(ProtocolError::NotRegistered)
        }
    }

    /// The private key needed to unwrap a session key, or `NotRegistered`.
    pub fn require_private_key(&self) -> Result<&PrivateKey> {
        self.private_key.as_ref().ok_or(ProtocolError::NotRegistered)
    }

    pub fn require_symmetric_key(&self) -> Result<&SymmetricKey> {
        self.symmetric_key.as_ref().ok_or(ProtocolError::NoSymmetricKey)
    }

    /// Adopt a freshly registered identity. Any previous key is discarded.
    pub fn complete_registration(
        &mut self,
        username: Name,
        client_id: ClientId,
        public_key: PublicKey,
        private_key: PrivateKey,
    ) {
        self.username = username;
        self.client_id = client_id;
        self.public_key = Some(public_key);
        self.private_key = Some(private_key);
        self.symmetric_key = None;
        self.state = SessionState::Registered;
    }

    pub fn set_public_key(&mut self, public_key: PublicKey) {
        self.public_key = Some(public_key);
    }

    /// Install the session key from a key exchange or reconnection.
    pub fn install_key(&mut self, key: SymmetricKey) {
        self.symmetric_key = Some(key);
        self.state = SessionState::KeyEstablished;
    }

    /// Drop the session key after unusable key material; the identity stays.
    pub fn discard_key(&mut self) {
        self.symmetric_key = None;
        if self.client_id.is_assigned() {
            self.state = SessionState::Registered;
        }
    }

    /// The server refused to recognise this client.
    pub fn deny(&mut self) {
        self.symmetric_key = None;
        self.state = SessionState::Denied;
    }

    /// Enter `Transferring`. Requires an installed session key.
    pub fn begin_transfer(&mut self) -> Result<()> {
        self.require_client_id()?;
        self.require_symmetric_key()?;
        self.state = SessionState::Transferring;
        Ok(())
    }

    /// The server confirmed the checksum.
    pub fn finish_transfer(&mut self) {
        self.state = SessionState::Done;
    }

    /// All attempts failed the checksum and the server was told so.
    pub fn abandon_transfer(&mut self) {
        self.state = SessionState::Failed;
    }

    /// The upload stopped on a non-checksum error; the key is still usable.
    pub fn interrupt_transfer(&mut self) {
        if self.state == SessionState::Transferring {
            self.state = SessionState::KeyEstablished;
        }
    }
}
