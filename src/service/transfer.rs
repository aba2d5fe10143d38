//! Encrypted upload with checksum confirmation.
//!
//! The client computes the CRC-32 of the plaintext, uploads the encrypted
//! content and compares its checksum with the one the server reports after
//! decrypting. A match is confirmed with `ValidCrc`. A mismatch is reported
//! with `InvalidCrc` and the upload is repeated; once the retry budget is
//! spent the client sends `FinalInvalidCrc` and gives up.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::core::packet::ResponseCode;
use crate::core::types::Name;
use crate::error::{ProtocolError, Result};
use crate::protocol::message::{Request, ResponsePayload};
use crate::protocol::session::{wire_file_name, Persistence};
use crate::service::client::{unexpected, TransferClient};
use crate::transport::tcp::Connector;
use crate::utils::checksum::crc32;
use crate::utils::crypto::CryptoProvider;
use crate::utils::metrics::Timer;

/// Counts upload attempts against a fixed allowance: one initial attempt
/// plus `max_retries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    used: u32,
}

impl RetryBudget {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            used: 0,
        }
    }

    /// Claim the next attempt, if any remain.
    pub fn try_acquire(&mut self) -> bool {
        if self.used < self.max_attempts {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn attempts(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max_attempts
    }
}

/// What the server acknowledged for one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReceipt {
    pub file_name: Name,
    pub content_size: u32,
    pub checksum: u32,
}

/// Result of a confirmed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub file_name: Name,
    /// Uploads performed, including the successful one
    pub attempts: u32,
    /// Checksum both sides agreed on
    pub checksum: u32,
    /// Encrypted size the server received
    pub content_size: u32,
}

impl<C, P, S> TransferClient<C, P, S>
where
    C: Connector,
    P: CryptoProvider,
    S: Persistence,
{
    /// Upload the file at `path` and confirm its checksum, retrying on
    /// mismatch up to the configured budget.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn transfer_file(&mut self, path: &Path) -> Result<TransferOutcome> {
        let _timer = Timer::start("transfer_file");
        self.session.set_pending_file(path);
        let file_name = wire_file_name(path)?;
        self.session.begin_transfer()?;

        let result = self.run_transfer(path, &file_name).await;
        match &result {
            Ok(outcome) => {
                self.session.finish_transfer();
                self.metrics.transfer_completed();
                info!(
                    file = %outcome.file_name,
                    attempts = outcome.attempts,
                    checksum = outcome.checksum,
                    "Transfer confirmed"
                );
            }
            Err(ProtocolError::TransferAbandoned { attempts }) => {
                self.session.abandon_transfer();
                self.metrics.transfer_abandoned();
                warn!(file = %file_name, attempts, "Transfer abandoned");
            }
            Err(e) => {
                self.session.interrupt_transfer();
                warn!(file = %file_name, error = %e, "Transfer interrupted");
            }
        }
        self.metrics.log_metrics();
        result
    }

    async fn run_transfer(&self, path: &Path, file_name: &Name) -> Result<TransferOutcome> {
        let content = self.persistence.read_file(path)?;
        let mut budget = RetryBudget::new(self.config.max_crc_retries);

        while budget.try_acquire() {
            match self.send_file_once(file_name, &content).await {
                Ok(receipt) => {
                    self.confirm_checksum(file_name).await?;
                    return Ok(TransferOutcome {
                        file_name: receipt.file_name,
                        attempts: budget.attempts(),
                        checksum: receipt.checksum,
                        content_size: receipt.content_size,
                    });
                }
                Err(e) if e.is_integrity_mismatch() => {
                    self.metrics.crc_mismatch();
                    warn!(
                        attempt = budget.attempts(),
                        remaining = budget.remaining(),
                        error = %e,
                        "Checksum mismatch"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        self.send_final_invalid_crc(file_name).await?;
        Err(ProtocolError::TransferAbandoned {
            attempts: budget.attempts(),
        })
    }

    /// Encrypt and upload `content` once, then compare checksums.
    ///
    /// When the server's checksum differs from the CRC-32 of the plaintext an
    /// `InvalidCrc` notice goes out on its own connection and
    /// `IntegrityMismatch` is returned. Whether to upload again is up to the
    /// caller.
    #[instrument(skip(self, content), fields(len = content.len()))]
    pub async fn send_file_once(&self, file_name: &Name, content: &[u8]) -> Result<FileReceipt> {
        let client_id = self.session.require_client_id()?;
        let local = crc32(content);
        let encrypted = self
            .crypto
            .aes_encrypt(self.session.require_symmetric_key()?, content)?;
        let request = Request::send_file(client_id, file_name.clone(), encrypted)?;

        self.metrics.upload_attempt();
        match self
            .round_trip(&request, ResponseCode::FileDeliveredWithCrc)
            .await?
        {
            ResponsePayload::FileDelivered {
                content_size,
                file_name: delivered,
                checksum,
                ..
            } => {
                if checksum != local {
                    self.notify(&Request::InvalidCrc {
                        client_id,
                        file_name: file_name.clone(),
                    })
                    .await?;
                    return Err(ProtocolError::IntegrityMismatch {
                        local,
                        server: checksum,
                    });
                }
                Ok(FileReceipt {
                    file_name: delivered,
                    content_size,
                    checksum,
                })
            }
            other => Err(unexpected(ResponseCode::FileDeliveredWithCrc, &other)),
        }
    }

    async fn confirm_checksum(&self, file_name: &Name) -> Result<()> {
        let request = Request::ValidCrc {
            client_id: self.session.require_client_id()?,
            file_name: file_name.clone(),
        };
        self.expect_delivered(&request).await
    }

    /// Tell the server this client is giving up on `file_name`.
    #[instrument(skip(self))]
    pub async fn send_final_invalid_crc(&self, file_name: &Name) -> Result<()> {
        let request = Request::FinalInvalidCrc {
            client_id: self.session.require_client_id()?,
            file_name: file_name.clone(),
        };
        self.expect_delivered(&request).await
    }

    async fn expect_delivered(&self, request: &Request) -> Result<()> {
        match self
            .round_trip(request, ResponseCode::MessageDelivered)
            .await?
        {
            ResponsePayload::MessageDelivered { .. } => Ok(()),
            other => Err(unexpected(ResponseCode::MessageDelivered, &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_allows_initial_plus_retries() {
        let mut budget = RetryBudget::new(3);
        let mut granted = 0;
        while budget.try_acquire() {
            granted += 1;
        }
        assert_eq!(granted, 4);
        assert_eq!(budget.attempts(), 4);
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_zero_retries_still_attempts_once() {
        let mut budget = RetryBudget::new(0);
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert_eq!(budget.attempts(), 1);
    }
}
