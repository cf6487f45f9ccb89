//! Helpers shared across the task implementations

use std::time::Duration;

use common::types::position::Position;
use common::types::proof::{ProofJobStatus, ProofResult};
use util::backoff::{poll_with_backoff, PollConfig, PollError};
use util::hex::bytes_to_hex_string;
use veil_crypto::derivation::derive_position_secret;
use veil_crypto::signer::{SignerError, WalletSigner};

use crate::task_state::TaskStatusUpdate;
use crate::traits::TaskContext;

/// The display token for the pool's native asset
pub(crate) const NATIVE_TOKEN: &str = "SOL";

/// A failure while awaiting a proof generation job
#[derive(Clone, Debug)]
pub(crate) enum ProofJobError {
    /// The service reported the job as failed
    JobFailed(String),
    /// Polling the job failed at the transport layer
    Poll(String),
    /// The proof budget elapsed before the job finished
    TimedOut,
    /// The task was cancelled while the job was in flight
    Cancelled,
}

/// Poll a proof job until it reaches a terminal status, publishing progress
/// updates as it goes
pub(crate) async fn await_proof_job(
    ctx: &TaskContext,
    job_id: &str,
    state: &str,
) -> Result<ProofResult, ProofJobError> {
    let config =
        PollConfig::fixed(ctx.config.proof_poll_interval, ctx.config.proof_timeout);

    let status = poll_with_backoff(
        || async {
            let status = ctx.api.proof_status(job_id).await?;
            ctx.updates.send_replace(TaskStatusUpdate::progress(
                ctx.task_id,
                state.to_string(),
                status.progress,
                status.stage.clone(),
            ));
            Ok::<_, relayer_api::error::ApiError>(status)
        },
        |resp| resp.status.is_terminal(),
        config,
        &ctx.cancel,
    )
    .await
    .map_err(|e| match e {
        PollError::Cancelled => ProofJobError::Cancelled,
        PollError::TimedOut => ProofJobError::TimedOut,
        PollError::Probe(api) => ProofJobError::Poll(api.to_string()),
    })?;

    match status.status {
        ProofJobStatus::Completed => status
            .result
            .ok_or_else(|| ProofJobError::JobFailed("job completed without a result".to_string())),
        _ => Err(ProofJobError::JobFailed(
            status.error.unwrap_or_else(|| "proof generation failed".to_string()),
        )),
    }
}

/// A failure while resolving a position's secret
#[derive(Clone, Debug)]
pub(crate) enum SecretResolutionError {
    /// The wallet declined to sign the derivation message
    Rejected,
    /// The signer failed for another reason
    Signer(String),
    /// The position carries neither a stored secret nor a nonce
    MissingMaterial,
}

/// Resolve the secret backing a position, as a hex string
///
/// Prefers the legacy stored secret when present (imported positions);
/// otherwise re-derives from the nonce, which prompts the wallet
pub(crate) async fn resolve_secret(
    position: &Position,
    signer: &dyn WalletSigner,
) -> Result<String, SecretResolutionError> {
    if let Some(secret) = &position.secret {
        return Ok(secret.clone());
    }

    let nonce = position.nonce.as_ref().ok_or(SecretResolutionError::MissingMaterial)?;
    let secret = derive_position_secret(signer, nonce).await.map_err(|e| match e {
        SignerError::Rejected => SecretResolutionError::Rejected,
        other => SecretResolutionError::Signer(other.to_string()),
    })?;

    Ok(bytes_to_hex_string(&secret))
}

/// Format a withdrawal lock's remaining duration as "Xh Ym"
pub(crate) fn format_lock_remaining(remaining: Duration) -> String {
    let total_minutes = remaining.as_secs().div_ceil(60);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    format!("{hours}h {minutes}m")
}
