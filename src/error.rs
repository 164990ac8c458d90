use thiserror::Error;
use crate::frame::RxState;

/// error regarding leaf protocol communication
#[derive(Error, Debug)]
pub enum Error {
    /// channel not acquired or no frame received in expected time
    #[error("timeout: {0}")]
    Timeout(&'static str),
    #[error("problem with uart link")]
    Io(#[from] std::io::Error),
    /// bytes were received but did not form a valid frame
    #[error("invalid message received in state {state:?}: {reason}")]
    InvalidMessageReceived {
        /// receive state reached when the frame was given up
        state: RxState,
        reason: &'static str,
    },
    /// an outgoing message cannot be represented on the wire
    #[error("invalid message creation: {0}")]
    InvalidMessageCreation(&'static str),
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    /// caller passed an argument the protocol cannot honor
    #[error("invalid parameter: {0}")]
    Parameter(&'static str),
    /// the unit answered with the error flag set
    #[error("unit refused the request with error code {0:#04x}")]
    Unit(u8),
}
