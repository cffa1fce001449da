use crate::error::{ExchangeError, Result};
use crate::types::{Address, Timestamp};

/// Fails once `now` is past `deadline`; a call landing exactly on the
/// deadline still goes through.
pub fn check_deadline(deadline: Timestamp, now: Timestamp) -> Result<()> {
    if now > deadline {
        return Err(ExchangeError::DeadlineExceeded { deadline, now });
    }
    Ok(())
}

/// The zero address means "send to the caller".
pub fn resolve_recipient(recipient: Address, caller: Address) -> Address {
    if recipient.is_zero() {
        caller
    } else {
        recipient
    }
}
