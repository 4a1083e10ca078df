//! Pure size-contract accounting for a transfer session.

use super::error::TransferError;

/// Tracks received bytes against the declared total.
///
/// The invariant `received <= declared` holds at every observation point:
/// a chunk that would cross the declared size is rejected wholesale before
/// being counted, never truncated.
#[derive(Debug, Clone)]
pub struct SizeContract {
    declared: u64,
    received: u64,
}

impl SizeContract {
    /// Create a contract for a declared size.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero declared size.
    pub fn new(declared: u64) -> Result<Self, TransferError> {
        if declared == 0 {
            return Err(TransferError::validation("declared size must be positive"));
        }
        Ok(Self {
            declared,
            received: 0,
        })
    }

    /// Account for one incoming chunk, checked before any buffer write.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` if the chunk would exceed the declared size.
    pub fn accept(&mut self, chunk_len: u64) -> Result<(), TransferError> {
        if self.received + chunk_len > self.declared {
            return Err(TransferError::Overflow {
                declared: self.declared,
                received: self.received,
                chunk: chunk_len,
            });
        }
        self.received += chunk_len;
        Ok(())
    }

    /// Verify the contract at close time.
    ///
    /// # Errors
    ///
    /// Returns `SizeMismatch` if fewer bytes than declared were received.
    pub fn close(&self) -> Result<(), TransferError> {
        if self.received != self.declared {
            return Err(TransferError::SizeMismatch {
                declared: self.declared,
                received: self.received,
            });
        }
        Ok(())
    }

    /// Declared total size.
    #[must_use]
    pub fn declared(&self) -> u64 {
        self.declared
    }

    /// Bytes received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Whether every declared byte has arrived.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.received == self.declared
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    // For any split of exactly `declared` bytes into chunks, every chunk is
    // accepted and the contract closes clean.
    proptest! {
        #[test]
        fn prop_exact_split_always_accepted(
            chunks in prop::collection::vec(1u64..4096, 1..64),
        ) {
            let declared: u64 = chunks.iter().sum();
            let mut contract = SizeContract::new(declared).unwrap();

            for chunk in &chunks {
                prop_assert!(contract.accept(*chunk).is_ok());
                prop_assert!(contract.received() <= contract.declared());
            }

            prop_assert!(contract.close().is_ok());
        }
    }

    // Any extra byte beyond the declared size fails, and the failure leaves
    // the accepted count untouched.
    proptest! {
        #[test]
        fn prop_overflow_always_detected(
            chunks in prop::collection::vec(1u64..4096, 1..64),
            excess in 1u64..4096,
        ) {
            let declared: u64 = chunks.iter().sum();
            let mut contract = SizeContract::new(declared).unwrap();
            for chunk in &chunks {
                contract.accept(*chunk).unwrap();
            }

            let before = contract.received();
            let is_overflow = matches!(
                contract.accept(excess),
                Err(TransferError::Overflow { .. })
            );
            prop_assert!(is_overflow);
            prop_assert_eq!(contract.received(), before);
        }
    }

    // Stopping short of the declared size is always a mismatch at close.
    proptest! {
        #[test]
        fn prop_under_delivery_always_mismatch(
            chunks in prop::collection::vec(1u64..4096, 1..64),
            shortfall in 1u64..4096,
        ) {
            let sent: u64 = chunks.iter().sum();
            let declared = sent + shortfall;
            let mut contract = SizeContract::new(declared).unwrap();
            for chunk in &chunks {
                contract.accept(*chunk).unwrap();
            }

            let is_mismatch = matches!(
                contract.close(),
                Err(TransferError::SizeMismatch { .. })
            );
            prop_assert!(is_mismatch);
        }
    }
}
