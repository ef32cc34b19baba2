//! # Inbound Ports (Driving Ports)

use crate::domain::envelope::Transport;
use crate::domain::errors::ProtocolError;
use crate::domain::outcome::ProcessOutcome;

/// Entry point the request layer calls once per submitted message.
pub trait ProtocolApi {
    /// Validate, authorize and commit one envelope.
    ///
    /// Either the action's leaf and every side effect commit, or nothing
    /// does.
    fn process(&self, message: &str, transport: Transport) -> Result<ProcessOutcome, ProtocolError>;
}
