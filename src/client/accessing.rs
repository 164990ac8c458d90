use serial2_tokio::SerialPort;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Mutex,
    };
use log::*;

use crate::{
    error::Error,
    frame::RxState,
    pdu::{Request, Response, ReadResponse, WriteResponse},
    registers::Register,
    };
use super::{Channel, LinkConfig, Timeouts};


/**
    leaf protocol client

    all methods can be called concurrently, each exchange holds the channel from sending the request until its response is received or given up
*/
pub struct Client<T = SerialPort> {
    channel: Mutex<Channel<T>>,
}

impl Client<SerialPort> {
    /// open the serial port described and start receiving, this must be called inside a tokio runtime
    pub fn open(config: &LinkConfig) -> Result<Self, Error> {
        Ok(Self::new(Channel::open(config)?))
    }
}

impl<T: AsyncRead + AsyncWrite + Send + 'static> Client<T> {
    pub fn new(channel: Channel<T>) -> Self {
        Self {channel: Mutex::new(channel)}
    }

    /**
        send a request and wait for its response

        fails with [Error::Timeout] if the channel cannot be acquired in time, or if no response comes in time.
        A frame received that is not answering this request (typically the late answer to a request given up before) is rejected with [Error::InvalidMessageReceived].
    */
    pub async fn execute(&self, request: &Request, timeouts: Timeouts) -> Result<Response, Error> {
        let mut channel = match timeouts.acquire {
            Some(timeout) => tokio::time::timeout(timeout, self.channel.lock()).await
                .map_err(|_| Error::Timeout("channel acquire"))?,
            None => self.channel.lock().await,
        };
        let stale = channel.discard();
        if stale != 0 {
            warn!("discarded {} stale bytes before request", stale);
        }
        channel.write_request(request).await?;
        let frame = channel.read_frame(timeouts.response).await?;
        let response = Response::from(&frame);
        if ! response.answers(request) {
            warn!("response {:?} does not answer request {:?}", response.header(), request.header());
            return Err(Error::InvalidMessageReceived {
                state: RxState::Done,
                reason: "response does not match request",
            });
        }
        Ok(response)
    }

    /// read `count` bytes of registers of a unit, starting at `address`
    pub async fn read_registers(&self, unit: u8, address: u16, count: u16, timeouts: Timeouts) -> Result<ReadResponse, Error> {
        debug!("read unit: {}, address: {}, count: {}, timeouts: {:?}", unit, address, count, timeouts);
        let request = Request::read(unit, address, count)?;
        let response = ReadResponse::from(self.execute(&request, timeouts).await?);
        debug!("{:?}", response);
        Ok(response)
    }

    /// write `count` bytes of registers of a unit, starting at `address`, `data` must be already encoded
    pub async fn write_registers(&self, unit: u8, address: u16, count: u16, data: &[u8], timeouts: Timeouts) -> Result<WriteResponse, Error> {
        debug!("write unit: {}, address: {}, count: {}, data: {:02x?}, timeouts: {:?}", unit, address, count, data, timeouts);
        if usize::from(count) != data.len() {
            return Err(Error::Parameter("count differs from data size"));
        }
        let request = Request::write(unit, address, data)?;
        let response = WriteResponse::from(self.execute(&request, timeouts).await?);
        debug!("{:?}", response);
        Ok(response)
    }

    /// read a register of a unit, its value is updated and returned
    pub async fn read(&self, unit: u8, register: &mut Register, timeouts: Timeouts) -> Result<i64, Error> {
        if ! register.access().readable() {
            return Err(Error::Parameter("register is not readable"));
        }
        let response = self.read_registers(unit, register.address(), register.size(), timeouts).await?;
        if response.is_error() {
            return Err(Error::Unit(response.error_code()));
        }
        register.decode(response.payload())
    }

    /// write the current value of a register to a unit
    pub async fn write(&self, unit: u8, register: &Register, timeouts: Timeouts) -> Result<(), Error> {
        if ! register.access().writable() {
            return Err(Error::Parameter("register is not writable"));
        }
        let data = register.encode()?;
        let response = self.write_registers(unit, register.address(), register.size(), &data, timeouts).await?;
        if response.is_error() {
            return Err(Error::Unit(response.error_code()));
        }
        Ok(())
    }

    /// same as [Self::read] on the unit the register is bound to with [Register::at]
    pub async fn fetch(&self, register: &mut Register, timeouts: Timeouts) -> Result<i64, Error> {
        let unit = register.unit().ok_or(Error::Parameter("register is not bound to a unit"))?;
        self.read(unit, register, timeouts).await
    }

    /// same as [Self::write] on the unit the register is bound to with [Register::at]
    pub async fn store(&self, register: &Register, timeouts: Timeouts) -> Result<(), Error> {
        let unit = register.unit().ok_or(Error::Parameter("register is not bound to a unit"))?;
        self.write(unit, register, timeouts).await
    }

    /// close the channel, waiting for its worker to stop
    pub async fn close(self) -> Result<(), Error> {
        self.channel.into_inner().close().await
    }
}
