use serial2_tokio::{SerialPort, CharSize, StopBits, Parity, FlowControl, Settings};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt, WriteHalf},
    sync::mpsc,
    task::JoinHandle,
    time::Instant,
    };
use log::*;
use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering::*},
        },
    time::Duration,
    };

use crate::{
    error::Error,
    frame::{Frame, FrameBuffer, Assembler, RxState},
    pdu::Request,
    };
use super::LinkConfig;


/**
    exclusive owner of a uart link

    a worker task continuously moves received bytes to a queue while the channel is open, frames are assembled from this queue by [Self::read_frame].
    The worker is stopped and joined by [Self::close], or only stopped when the channel is dropped.
*/
pub struct Channel<T> {
    transmit: WriteHalf<T>,
    /// bytes received by the worker, not yet consumed
    received: mpsc::UnboundedReceiver<u8>,
    worker: JoinHandle<io::Result<()>>,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
    /// reused for every request sent
    buffer: FrameBuffer,
    assembler: Assembler,
}

impl Channel<SerialPort> {
    /// open the serial port and start receiving, this must be called inside a tokio runtime
    pub fn open(config: &LinkConfig) -> Result<Self, Error> {
        debug!("opening {} at {} bauds", config.port.display(), config.baud_rate);
        let port = SerialPort::open(&config.port, |mut settings: Settings| {
                settings.set_raw();
                settings.set_baud_rate(config.baud_rate)?;
                settings.set_char_size(CharSize::Bits8);
                settings.set_stop_bits(StopBits::One);
                settings.set_parity(Parity::None);
                settings.set_flow_control(FlowControl::None);
                Ok(settings)
                })?;
        port.discard_buffers()?;
        Ok(Self::new(port, config))
    }
}

impl<T: AsyncRead + AsyncWrite + Send + 'static> Channel<T> {
    /// start receiving on an already configured transport, this must be called inside a tokio runtime
    pub fn new(transport: T, config: &LinkConfig) -> Self {
        let (receive, transmit) = tokio::io::split(transport);
        let (queue, received) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let worker = tokio::spawn(ingest(receive, queue, running.clone(), config.read_timeout));
        Self {
            transmit,
            received,
            worker,
            running,
            poll_interval: config.poll_interval,
            buffer: FrameBuffer::new(),
            assembler: Assembler::new(),
        }
    }

    /// true until the worker stops, on close or when the link fails
    pub fn is_open(&self) -> bool {
        self.running.load(Acquire) && ! self.worker.is_finished()
    }

    /// send raw bytes
    pub async fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        transmit(&mut self.transmit, data).await
    }
    /// serialize and send a request
    pub async fn write_request(&mut self, request: &Request) -> Result<(), Error> {
        let data = request.encode(&mut self.buffer)?;
        transmit(&mut self.transmit, data).await
    }

    /// drop all bytes received so far, returning their number
    pub fn discard(&mut self) -> usize {
        let mut count = 0;
        while self.received.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    /**
        wait for the next valid frame

        `None` waits forever. When the timeout elapses before a complete frame this is a [Error::Timeout], whatever was received so far. A complete frame failing validation is a [Error::InvalidMessageReceived].
    */
    pub async fn read_frame(&mut self, timeout: Option<Duration>) -> Result<Frame, Error> {
        debug!("waiting frame, timeout {:?}", timeout);
        self.assembler.reset();
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        loop {
            let wait = match deadline {
                Some(deadline) => self.poll_interval.min(deadline.saturating_duration_since(Instant::now())),
                None => self.poll_interval,
            };
            let received = match tokio::time::timeout(wait, self.received.recv()).await {
                Ok(Some(byte)) => {
                    trace!("rx {:#04x}", byte);
                    if self.assembler.push(byte) == RxState::Done {
                        return self.assembler.validate();
                    }
                    true
                },
                Ok(None) => return Err(Error::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "receive worker stopped",
                    ))),
                Err(_) => false,
            };
            // bytes already queued are consumed before giving up
            if received && ! self.received.is_empty()
                {continue}
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                if ! self.assembler.is_idle() {
                    debug!("frame incomplete at timeout, reception was in state {:?}", self.assembler.state());
                }
                return Err(Error::Timeout("waiting for frame"));
            }
        }
    }

    /// stop the worker and wait for it to finish
    pub async fn close(mut self) -> Result<(), Error> {
        debug!("closing channel");
        self.running.store(false, Release);
        match (&mut self.worker).await {
            Ok(result) => result?,
            Err(error) => return Err(io::Error::other(error).into()),
        }
        debug!("channel closed");
        Ok(())
    }
}

impl<T> Drop for Channel<T> {
    fn drop(&mut self) {
        // the worker notices within one read timeout
        self.running.store(false, Release);
    }
}

async fn transmit<T: AsyncWrite>(bus: &mut WriteHalf<T>, data: &[u8]) -> Result<(), Error> {
    debug!("tx {:02x?}", data);
    bus.write_all(data).await?;
    bus.flush().await?;
    Ok(())
}

/// receive worker, moving every received byte to the queue while running
async fn ingest<R: AsyncRead + Unpin>(
    mut bus: R,
    queue: mpsc::UnboundedSender<u8>,
    running: Arc<AtomicBool>,
    period: Duration,
) -> io::Result<()> {
    let mut buffer = [0u8; 64];
    while running.load(Acquire) {
        let size = match tokio::time::timeout(period, bus.read(&mut buffer)).await {
            Err(_) => continue,
            Ok(Ok(0)) => {
                debug!("uart link closed by peer");
                break
            },
            Ok(Ok(size)) => size,
            // the link is expected to fail while closing
            Ok(Err(_)) if ! running.load(Acquire) => break,
            Ok(Err(error)) => {
                error!("uart reception failed: {}", error);
                return Err(error)
            },
        };
        for &byte in &buffer[.. size] {
            if queue.send(byte).is_err() {
                // channel dropped
                return Ok(())
            }
        }
    }
    Ok(())
}
