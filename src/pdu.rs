/*!
    request and response envelopes exchanged with units

    a read request carries no data, its header `size` is the number of register bytes wanted.
    a write request carries exactly `size` bytes of register data.
    a response carries register data, or a single error code when its error flag is set.
*/

use core::ops::Deref;
use log::*;

use crate::{
    error::Error,
    packet::{Header, Kind},
    frame::{Frame, FrameBuffer, Payload, MAX_PAYLOAD},
    registers::Format,
    };


/// error code meaning success
pub const ERROR_OK: u8 = 0;
/// error code reported for an error response not carrying any code
pub const ERROR_UNKNOWN: u8 = 0xff;


/// request sent to a unit
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    header: Header,
    payload: Payload,
}
impl Request {
    /// request `count` bytes of registers starting at `register`
    pub fn read(unit: u8, register: u16, count: u16) -> Result<Self, Error> {
        if usize::from(count) > MAX_PAYLOAD {
            return Err(Error::InvalidMessageCreation("read count exceeds maximum frame payload"));
        }
        Ok(Self {
            header: Header::new(Kind::read_registers(), unit, register, count),
            payload: Payload::new(),
        })
    }
    /// write the given bytes in registers starting at `register`
    pub fn write(unit: u8, register: u16, data: &[u8]) -> Result<Self, Error> {
        let payload = Payload::from_slice(data)
            .map_err(|_| Error::InvalidMessageCreation("write data exceeds maximum frame payload"))?;
        Ok(Self {
            // cannot truncate since payload is bounded by MAX_PAYLOAD
            header: Header::new(Kind::write_registers(), unit, register, payload.len() as u16),
            payload,
        })
    }
    pub fn header(&self) -> &Header  {&self.header}
    pub fn kind(&self) -> Kind  {self.header.kind}
    pub fn unit(&self) -> u8  {self.header.unit}
    pub fn register(&self) -> u16  {self.header.register}
    /// number of register bytes accessed
    pub fn size(&self) -> u16  {self.header.size}
    pub fn payload(&self) -> &[u8]  {&self.payload}

    /// serialize this request in the given frame buffer
    pub fn encode<'b>(&self, buffer: &'b mut FrameBuffer) -> Result<&'b [u8], Error> {
        Frame::new(self.header, &self.payload)?.encode(buffer)
    }
}


/// response received from a unit
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    header: Header,
    error_code: u8,
    payload: Payload,
}
impl Response {
    pub fn header(&self) -> &Header  {&self.header}
    pub fn kind(&self) -> Kind  {self.header.kind}
    pub fn unit(&self) -> u8  {self.header.unit}
    pub fn register(&self) -> u16  {self.header.register}
    pub fn size(&self) -> u16  {self.header.size}
    /// true if the unit refused the request
    pub fn is_error(&self) -> bool  {self.header.kind.error()}
    /// error code set by the unit, [ERROR_OK] unless [Self::is_error]
    pub fn error_code(&self) -> u8  {self.error_code}
    /// register data, empty for an error response
    pub fn payload(&self) -> &[u8]  {&self.payload}

    /// check whether this is the response to the given request
    pub fn answers(&self, request: &Request) -> bool {
        self.header.kind.base() == request.kind()
            && self.header.unit == request.unit()
            && self.header.register == request.register()
    }
}
impl From<&Frame> for Response {
    fn from(frame: &Frame) -> Self {
        let header = *frame.header();
        let data = frame.payload();
        if header.kind.error() {
            return Self {
                header,
                error_code: data.first().copied().unwrap_or(ERROR_UNKNOWN),
                payload: Payload::new(),
            };
        }
        let size = usize::from(header.size);
        if data.len() < size {
            warn!("response announces {} bytes but carries {}", size, data.len());
        }
        Self {
            header,
            error_code: ERROR_OK,
            // a frame payload always fits
            payload: Payload::from_slice(&data[.. size.min(data.len())]).unwrap_or_default(),
        }
    }
}
impl TryFrom<&[u8]> for Response {
    type Error = Error;
    fn try_from(_: &[u8]) -> Result<Self, Error> {
        Err(Error::NotImplemented("decoding a response from raw bytes, assemble a frame first"))
    }
}


/// response to a [Request::read]
#[derive(Clone, Debug, PartialEq)]
pub struct ReadResponse(Response);
impl ReadResponse {
    /// register byte at the given offset from the requested address
    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.payload.get(index).copied()
    }
    /// decode a register value starting at the given offset from the requested address
    pub fn value(&self, offset: usize, format: Format) -> Result<i64, Error> {
        const OUTSIDE: Error = Error::Parameter("register is outside of the response");
        let end = offset.checked_add(usize::from(format.width.size())).ok_or(OUTSIDE)?;
        let data = self.0.payload.get(offset .. end).ok_or(OUTSIDE)?;
        format.decode(data)
    }
    pub fn into_inner(self) -> Response  {self.0}
}
impl From<Response> for ReadResponse {
    fn from(response: Response) -> Self  {Self(response)}
}
impl Deref for ReadResponse {
    type Target = Response;
    fn deref(&self) -> &Response  {&self.0}
}

/// response to a [Request::write]
#[derive(Clone, Debug, PartialEq)]
pub struct WriteResponse(Response);
impl WriteResponse {
    pub fn into_inner(self) -> Response  {self.0}
}
impl From<Response> for WriteResponse {
    fn from(response: Response) -> Self  {Self(response)}
}
impl Deref for WriteResponse {
    type Target = Response;
    fn deref(&self) -> &Response  {&self.0}
}
