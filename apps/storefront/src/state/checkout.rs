//! # Checkout State
//!
//! The open checkout session, if any, and the in-flight submission flag.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open() ──► Some(session @ delivery)                                    │
//! │               │                                                         │
//! │               │  with_session_mut(..)   choose / update / advance       │
//! │               ▼                                                         │
//! │  begin_submission() ──► SubmissionGuard ── await payments ──┐           │
//! │               │                                             │           │
//! │               │  second submit while the guard lives        │           │
//! │               └──► SUBMISSION_IN_PROGRESS                   ▼           │
//! │                                                  success: close()       │
//! │                                                  failure: session stays │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use layerline_core::pricing::AdjustmentRates;
use layerline_core::CheckoutSession;

use crate::error::ApiError;

#[derive(Debug, Default)]
pub struct CheckoutState {
    session: Mutex<Option<CheckoutSession>>,
    submitting: AtomicBool,
}

impl CheckoutState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh session at the delivery stage, replacing any open one.
    pub fn open(&self, rates: AdjustmentRates) -> Result<(), ApiError> {
        if self.is_submitting() {
            return Err(ApiError::submission_in_progress());
        }
        *self.lock() = Some(CheckoutSession::new(rates));
        Ok(())
    }

    /// Discards the session. Returns whether one was open.
    pub fn close(&self) -> bool {
        self.lock().take().is_some()
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Runs `f` against the open session.
    ///
    /// ## Returns
    /// * `Err(ApiError)` with `NO_CHECKOUT` when nothing is open
    pub fn with_session<F, R>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&CheckoutSession) -> R,
    {
        let session = self.lock();
        session.as_ref().map(f).ok_or_else(ApiError::no_checkout)
    }

    /// Runs `f` against the open session with write access.
    ///
    /// Refused while a submission is running, so the payload being paid for
    /// cannot change underneath it.
    pub fn with_session_mut<F, R>(&self, f: F) -> Result<R, ApiError>
    where
        F: FnOnce(&mut CheckoutSession) -> R,
    {
        if self.is_submitting() {
            return Err(ApiError::submission_in_progress());
        }
        let mut session = self.lock();
        session.as_mut().map(f).ok_or_else(ApiError::no_checkout)
    }

    /// Claims the single submission slot until the guard is dropped.
    pub fn begin_submission(&self) -> Result<SubmissionGuard<'_>, ApiError> {
        self.submitting
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ApiError::submission_in_progress())?;
        Ok(SubmissionGuard { state: self })
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CheckoutSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the submission slot on drop, including when the submitting
/// future is cancelled.
#[derive(Debug)]
pub struct SubmissionGuard<'a> {
    state: &'a CheckoutState,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.state.submitting.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use layerline_core::{CheckoutStage, DeliveryMethod};

    #[test]
    fn test_no_session_until_opened() {
        let state = CheckoutState::new();
        let err = state.with_session(|s| s.stage()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoCheckout);

        state.open(AdjustmentRates::default()).unwrap();
        assert_eq!(state.with_session(|s| s.stage()).unwrap(), CheckoutStage::Delivery);

        assert!(state.close());
        assert!(!state.close());
    }

    #[test]
    fn test_open_resets_progress() {
        let state = CheckoutState::new();
        state.open(AdjustmentRates::default()).unwrap();
        state
            .with_session_mut(|s| s.choose_delivery(DeliveryMethod::Pickup))
            .unwrap()
            .unwrap();

        state.open(AdjustmentRates::default()).unwrap();
        assert_eq!(state.with_session(|s| s.delivery_method()).unwrap(), None);
    }

    #[test]
    fn test_single_submission_slot() {
        let state = CheckoutState::new();
        state.open(AdjustmentRates::default()).unwrap();

        let guard = state.begin_submission().unwrap();
        assert_eq!(
            state.begin_submission().unwrap_err().code,
            ErrorCode::SubmissionInProgress
        );
        assert!(state.with_session_mut(|_| ()).is_err());
        assert!(state.open(AdjustmentRates::default()).is_err());

        drop(guard);
        assert!(!state.is_submitting());
        assert!(state.begin_submission().is_ok());
    }
}
