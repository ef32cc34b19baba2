//! # Encryption Policy
//!
//! | Action | Direct | External relay |
//! |--------|--------|----------------|
//! | BurnDown | plaintext only | rejected |
//! | Checkpoint | plaintext only | plaintext only |
//! | everything else | either | sealed only |

use crate::domain::action::Action;
use crate::domain::envelope::Transport;
use crate::domain::errors::ProtocolError;

/// Check `action` against how it arrived.
pub fn check_encryption_policy(
    action: Action,
    sealed: bool,
    transport: Transport,
) -> Result<(), ProtocolError> {
    if action == Action::BurnDown && transport == Transport::ExternalRelay {
        return Err(ProtocolError::RelayForbidden { action });
    }
    if action.requires_plaintext() {
        if sealed {
            return Err(ProtocolError::PlaintextRequired { action });
        }
        return Ok(());
    }
    if transport == Transport::ExternalRelay && !sealed {
        return Err(ProtocolError::EncryptionRequired { action });
    }
    Ok(())
}
