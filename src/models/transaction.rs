//! Downstream transaction records and failure classification
//!
//! A [`TransactionRecord`] describes one downstream notification the
//! orchestrator makes after a successful rebase: a destination, an opaque
//! payload, a per-call compute budget, and the set of failure codes the
//! owner has approved as tolerable.
//!
//! # Critical Invariants
//!
//! 1. **Index is not a stable identity**: removal swaps the last element
//!    into the vacated slot and truncates, so callers must re-resolve an
//!    index before repeat operations. This is an explicit non-guarantee.
//! 2. The approved-failure set travels with the record value, never keyed
//!    by list position.
//! 3. Failure classification is a pure function over the raw failure
//!    payload - same bytes, same code, every time.

use crate::auth::AccountId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// Normalized message used when a call failed without producing any output
/// (it ran out of its compute budget).
pub const OUT_OF_BUDGET_MESSAGE: &str = "out of budget";

/// Normalized message used when a call failed with a payload too short to
/// carry a structured reason.
pub const SILENT_FAILURE_MESSAGE: &str = "silent failure";

/// Minimum length of a structured failure payload: 4-byte selector plus a
/// 32-byte offset word plus a 32-byte length word.
const STRUCTURED_REASON_MIN_LEN: usize = 68;

/// Selector prefixed to structured reason payloads.
const REASON_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Content-derived code identifying a class of downstream failure.
///
/// A code is the SHA-256 hash of the normalized failure message, so owners
/// can approve a failure class by message content without enumerating every
/// destination that might produce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureCode([u8; 32]);

impl FailureCode {
    /// Code for a normalized failure message
    pub fn of_message(message: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(message.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Sentinel for calls that produced no output at all
    pub fn out_of_budget() -> Self {
        Self::of_message(OUT_OF_BUDGET_MESSAGE)
    }

    /// Sentinel for calls that failed without a structured reason
    pub fn silent_failure() -> Self {
        Self::of_message(SILENT_FAILURE_MESSAGE)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Classify a raw failure payload into a code plus the human-readable
/// message it was derived from. Pure function: length-based sentinels first,
/// otherwise the decoded structured reason is hashed.
pub fn classify_failure(raw: &[u8]) -> (FailureCode, String) {
    if raw.is_empty() {
        return (FailureCode::out_of_budget(), OUT_OF_BUDGET_MESSAGE.to_string());
    }
    if raw.len() < STRUCTURED_REASON_MIN_LEN {
        return (FailureCode::silent_failure(), SILENT_FAILURE_MESSAGE.to_string());
    }
    let message = decode_reason(raw);
    (FailureCode::of_message(&message), message)
}

/// Decode the reason string from a structured failure payload.
///
/// Layout: 4-byte selector | 32-byte offset word | 32-byte big-endian length
/// word | UTF-8 message bytes. The declared length is capped by what the
/// payload actually carries, and trailing padding is stripped.
fn decode_reason(raw: &[u8]) -> String {
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&raw[STRUCTURED_REASON_MIN_LEN - 8..STRUCTURED_REASON_MIN_LEN]);
    let declared = u64::from_be_bytes(len_bytes) as usize;

    let available = raw.len() - STRUCTURED_REASON_MIN_LEN;
    let take = declared.min(available);
    let body = &raw[STRUCTURED_REASON_MIN_LEN..STRUCTURED_REASON_MIN_LEN + take];

    String::from_utf8_lossy(body)
        .trim_end_matches('\0')
        .to_string()
}

/// Encode a reason string into the structured failure payload layout.
///
/// Inverse of the decoding in [`classify_failure`]; used by dispatchers and
/// tests that need to produce realistic failure payloads.
pub fn encode_reason(message: &str) -> Vec<u8> {
    let bytes = message.as_bytes();
    let mut raw = Vec::with_capacity(STRUCTURED_REASON_MIN_LEN + bytes.len());
    raw.extend_from_slice(&REASON_SELECTOR);

    // Offset word: reason data starts 32 bytes past the selector
    let mut offset_word = [0u8; 32];
    offset_word[31] = 0x20;
    raw.extend_from_slice(&offset_word);

    let mut length_word = [0u8; 32];
    length_word[24..].copy_from_slice(&(bytes.len() as u64).to_be_bytes());
    raw.extend_from_slice(&length_word);

    raw.extend_from_slice(bytes);
    raw
}

/// One downstream notification in the orchestrator's ordered sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    enabled: bool,
    destination: AccountId,
    payload: Vec<u8>,
    compute_budget: u64,
    approved_failures: HashSet<FailureCode>,
}

impl TransactionRecord {
    /// Create an enabled record
    pub fn new(
        destination: impl Into<AccountId>,
        payload: Vec<u8>,
        compute_budget: u64,
        approved_failures: HashSet<FailureCode>,
    ) -> Self {
        Self {
            enabled: true,
            destination: destination.into(),
            payload,
            compute_budget,
            approved_failures,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn compute_budget(&self) -> u64 {
        self.compute_budget
    }

    pub fn approved_failures(&self) -> &HashSet<FailureCode> {
        &self.approved_failures
    }

    /// Whether a failure code has been approved as tolerable for this record
    pub fn is_approved(&self, code: &FailureCode) -> bool {
        self.approved_failures.contains(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_empty_payload_is_out_of_budget() {
        let (code, message) = classify_failure(&[]);
        assert_eq!(code, FailureCode::out_of_budget());
        assert_eq!(message, OUT_OF_BUDGET_MESSAGE);
    }

    #[test]
    fn test_classify_short_payload_is_silent_failure() {
        let (code, message) = classify_failure(&[0u8; 67]);
        assert_eq!(code, FailureCode::silent_failure());
        assert_eq!(message, SILENT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_classify_structured_reason_round_trip() {
        let raw = encode_reason("pool rebalance failed");
        let (code, message) = classify_failure(&raw);
        assert_eq!(message, "pool rebalance failed");
        assert_eq!(code, FailureCode::of_message("pool rebalance failed"));
    }

    #[test]
    fn test_classify_caps_declared_length() {
        // A length word claiming more bytes than the payload carries must
        // not read past the end.
        let mut raw = encode_reason("short");
        raw[67] = 0xff;
        let (_, message) = classify_failure(&raw);
        assert_eq!(message, "short");
    }

    #[test]
    fn test_failure_code_display_is_hex() {
        let code = FailureCode::of_message("x");
        let rendered = code.to_string();
        assert_eq!(rendered.len(), 64);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
