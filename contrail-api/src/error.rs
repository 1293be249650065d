use contrail_core::LedgerError;

/// Stable, machine-readable code for a ledger failure, as reported by the runner.
pub fn error_code(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::Unauthorized(_) => "UNAUTHORIZED",
        LedgerError::NotFound(_) => "NOT_FOUND",
        LedgerError::InvalidArgument(_) => "INVALID_ARGUMENT",
        LedgerError::InvariantViolation(_) => "INVARIANT_VIOLATION",
        LedgerError::AlreadyDeparted(_) => "ALREADY_DEPARTED",
        LedgerError::PaymentFailed(_) => {
            tracing::error!("Payment failure: {}", err);
            "PAYMENT_FAILED"
        }
        LedgerError::Reentrancy(_) => "REENTRANCY",
    }
}
