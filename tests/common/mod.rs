//! Shared fixtures for integration tests: a scripted in-memory server, a
//! reversible fake crypto provider and in-memory persistence.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use secure_transfer::config::FRAME_SIZE;
use secure_transfer::core::packet::{RequestHeader, REQUEST_HEADER_SIZE};
use secure_transfer::core::types::{ClientId, PublicKey, SymmetricKey, CLIENT_ID_SIZE, PUBLIC_KEY_SIZE};
use secure_transfer::error::{ProtocolError, Result};
use secure_transfer::protocol::message::{Request, Response, ResponsePayload};
use secure_transfer::protocol::session::{Persistence, StoredIdentity};
use secure_transfer::transport::tcp::Connector;
use secure_transfer::utils::crypto::{CryptoProvider, PrivateKey};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

pub const KEY_WRAP_MASK: u8 = 0x5A;

pub fn client_id(byte: u8) -> ClientId {
    ClientId::from_bytes([byte; CLIENT_ID_SIZE])
}

/// What the scripted server does with the next connection
pub enum Reply {
    /// Read the request, answer with this response
    Respond(Response),
    /// Read the request, answer with these exact bytes
    Raw(Vec<u8>),
    /// Read the request, answer nothing
    Silent,
}

impl Reply {
    pub fn payload(payload: ResponsePayload) -> Self {
        Reply::Respond(Response::new(payload))
    }
}

#[derive(Default)]
struct ServerState {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<Request>>,
    peers: Mutex<Vec<JoinHandle<()>>>,
}

/// In-memory server that answers one request per connection from a script.
#[derive(Clone, Default)]
pub struct ScriptedServer {
    state: Arc<ServerState>,
}

impl ScriptedServer {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        let server = Self::default();
        server.state.replies.lock().unwrap().extend(replies);
        server
    }

    pub fn push(&self, reply: Reply) {
        self.state.replies.lock().unwrap().push_back(reply);
    }

    pub fn remaining_replies(&self) -> usize {
        self.state.replies.lock().unwrap().len()
    }

    /// Every request received so far, after all peers have finished.
    pub async fn requests(&self) -> Vec<Request> {
        let peers: Vec<_> = self.state.peers.lock().unwrap().drain(..).collect();
        for peer in peers {
            peer.await.unwrap();
        }
        self.state.requests.lock().unwrap().clone()
    }
}

impl Connector for ScriptedServer {
    type Stream = DuplexStream;

    async fn connect(&self) -> Result<DuplexStream> {
        let reply = self
            .state
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ProtocolError::ConnectFailed {
                address: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            })?;

        let (client, server) = duplex(64 * 1024);
        let state = Arc::clone(&self.state);
        let peer = tokio::spawn(async move {
            serve_one(server, reply, state).await;
        });
        self.state.peers.lock().unwrap().push(peer);
        Ok(client)
    }
}

async fn serve_one(mut stream: DuplexStream, reply: Reply, state: Arc<ServerState>) {
    let Some(bytes) = read_request(&mut stream).await else {
        return;
    };
    let request = Request::decode(&bytes).expect("client sent an undecodable request");
    state.requests.lock().unwrap().push(request);

    let response = match reply {
        Reply::Respond(response) => response.encode(),
        Reply::Raw(bytes) => bytes,
        Reply::Silent => return,
    };
    let _ = stream.write_all(&pad_to_frames(&response)).await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut DuplexStream) -> Option<Vec<u8>> {
    let mut data = vec![0u8; FRAME_SIZE];
    stream.read_exact(&mut data).await.ok()?;

    let header = RequestHeader::from_bytes(&data).ok()?;
    let total = REQUEST_HEADER_SIZE + header.payload_size as usize;
    while data.len() < total {
        let mut frame = vec![0u8; FRAME_SIZE];
        stream.read_exact(&mut frame).await.ok()?;
        data.extend_from_slice(&frame);
    }
    Some(data)
}

pub fn pad_to_frames(bytes: &[u8]) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    let frames = bytes.len().div_ceil(FRAME_SIZE).max(1);
    padded.resize(frames * FRAME_SIZE, 0);
    padded
}

/// Reversible stand-in for RSA and AES.
///
/// "RSA" masks the key with [`KEY_WRAP_MASK`] inside a 160-byte blob; "AES"
/// XORs with the key repeated. Enough to check that the engine routes keys and content
/// through the provider correctly.
#[derive(Debug, Clone, Default)]
pub struct FakeCrypto;

/// Fake RSA-1024 ciphertext: a length byte, the masked key, zero fill to
/// one 160-byte block.
pub fn wrap_key(plaintext: &[u8]) -> Vec<u8> {
    let mut blob = vec![plaintext.len() as u8];
    blob.extend(plaintext.iter().map(|b| b ^ KEY_WRAP_MASK));
    blob.resize(blob.len().max(PUBLIC_KEY_SIZE), 0);
    blob
}

fn unwrap_key(blob: &[u8]) -> Option<Vec<u8>> {
    let (&len, rest) = blob.split_first()?;
    let masked = rest.get(..len as usize)?;
    Some(masked.iter().map(|b| b ^ KEY_WRAP_MASK).collect())
}

pub fn fake_public_key() -> PublicKey {
    PublicKey::from_slice(&[0x50; PUBLIC_KEY_SIZE]).unwrap()
}

pub fn xor_with_key(key: &[u8], data: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

impl CryptoProvider for FakeCrypto {
    fn generate_keypair(&self) -> Result<(PublicKey, PrivateKey)> {
        Ok((fake_public_key(), PrivateKey::from_bytes(vec![0x70; 32])))
    }

    fn public_key(&self, _private: &PrivateKey) -> Result<PublicKey> {
        Ok(fake_public_key())
    }

    fn rsa_decrypt(&self, _private: &PrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        unwrap_key(ciphertext).ok_or(ProtocolError::DecryptionFailure)
    }

    fn aes_encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(xor_with_key(key.as_bytes(), plaintext))
    }

    fn aes_decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(xor_with_key(key.as_bytes(), ciphertext))
    }
}

/// Identity and file store kept in memory.
#[derive(Default)]
pub struct MemoryPersistence {
    identity: Mutex<Option<StoredIdentity>>,
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryPersistence {
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: &[u8]) -> Self {
        self.files.insert(path.into(), content.to_vec());
        self
    }

    pub fn with_identity(self, identity: StoredIdentity) -> Self {
        *self.identity.lock().unwrap() = Some(identity);
        self
    }

    pub fn stored(&self) -> Option<StoredIdentity> {
        self.identity.lock().unwrap().clone()
    }
}

impl Persistence for MemoryPersistence {
    fn load_identity(&self) -> Result<Option<StoredIdentity>> {
        Ok(self.identity.lock().unwrap().clone())
    }

    fn store_identity(&self, identity: &StoredIdentity) -> Result<()> {
        *self.identity.lock().unwrap() = Some(identity.clone());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ProtocolError::Persistence(format!("no such file: {}", path.display())))
    }
}
