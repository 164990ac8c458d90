/*!
    asynchronous leaf protocol client, in a tokio runtime

    The central resource is the [Client] which owns the [Channel] to the uart link. Any number of tasks can share a client (typically in an `Arc`), their exchanges are serialized on the link: a request is written then its response awaited while holding the channel.

    ```ignore
    let client = Client::open(&LinkConfig::default())?;
    let mut version = Register::new(registers::system::FW_VERSION);
    client.read(0, &mut version, Timeouts::default()).await?;
    ```

    Exchanges are done one at a time, tasks waiting for the channel are served in the order the runtime's mutex gives, no fairness is promised to callers.
*/

/// the uart link, its receive worker and frame reception, this is the tricky part of the code
mod channel;
/// request/response exchanges and convenient register access
mod accessing;

pub use channel::Channel;
pub use accessing::Client;

use std::{
    path::PathBuf,
    time::Duration,
    };


/// default serial port of the main board
pub const PORT: &str = "/dev/ttyACM0";
pub const BAUD_RATE: u32 = 115_200;
/// default bound on one read attempt of the receive worker
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// default period at which a waiting frame reception checks its timeout
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// default time a response is waited for after sending a request
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);


/// settings of the uart link, framing is always 8 data bits, no parity, 1 stop bit
#[derive(Clone, Debug, PartialEq)]
pub struct LinkConfig {
    /// serial port file
    pub port: PathBuf,
    pub baud_rate: u32,
    /// bound on one read attempt of the receive worker, this is also the delay for the worker to stop on close
    pub read_timeout: Duration,
    /// period at which a frame reception checks its timeout while no byte arrives
    pub poll_interval: Duration,
}
impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: PathBuf::from(PORT),
            baud_rate: BAUD_RATE,
            read_timeout: READ_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }
}
impl LinkConfig {
    pub fn new(port: impl Into<PathBuf>) -> Self {
        Self {port: port.into(), .. Default::default()}
    }
}

/**
    time bounds of one exchange, `None` waits forever

    by default the channel is waited forever, and the response 5 seconds
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// wait for exclusive access to the channel
    pub acquire: Option<Duration>,
    /// wait for the response once the request is sent
    pub response: Option<Duration>,
}
impl Default for Timeouts {
    fn default() -> Self {
        Self {
            acquire: None,
            response: Some(RESPONSE_TIMEOUT),
        }
    }
}
impl Timeouts {
    pub fn with_acquire(mut self, timeout: Option<Duration>) -> Self {
        self.acquire = timeout;
        self
    }
    pub fn with_response(mut self, timeout: Option<Duration>) -> Self {
        self.response = timeout;
        self
    }
}
