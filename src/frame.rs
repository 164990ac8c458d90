/*!
    framing of packets on the uart link

    ```text
    | AA 55 | length: u16 | header: 6 bytes | payload | crc: u16 |
    ```

    all integers are little endian, `length` counts the header and the payload, the crc (CRC-16/CCITT-FALSE) covers everything after the start marker.
*/

use crc::{Crc, CRC_16_IBM_3740};
use packbytes::{FromBytes, ToBytes, ByteArray};
use log::*;

use crate::{
    error::Error,
    packet::{Header, HEADER},
    };


/// start of frame marker
pub const SOF: [u8; 2] = [0xaa, 0x55];
/// maximum number of payload bytes a frame can carry
pub const MAX_PAYLOAD: usize = 256;
/// maximum number of bytes of header and payload
pub const MAX_PACKET: usize = HEADER + MAX_PAYLOAD;
/// maximum size of a frame on the wire
pub const MAX_FRAME: usize = SOF.len() + 2 + MAX_PACKET + 2;

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// payload of one frame
pub type Payload = heapless::Vec<u8, MAX_PAYLOAD>;
/// reusable buffer for serializing frames
pub type FrameBuffer = heapless::Vec<u8, MAX_FRAME>;


/// a complete packet, either built for sending or received and validated
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    header: Header,
    payload: Payload,
}
impl Frame {
    pub fn new(header: Header, payload: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            header,
            payload: Payload::from_slice(payload)
                .map_err(|_| Error::InvalidMessageCreation("payload exceeds maximum frame size"))?,
        })
    }
    pub fn header(&self) -> &Header  {&self.header}
    pub fn payload(&self) -> &[u8]  {&self.payload}

    /// serialize the frame in the given buffer, previous content is dropped
    pub fn encode<'b>(&self, buffer: &'b mut FrameBuffer) -> Result<&'b [u8], Error> {
        const OVERFLOW: Error = Error::InvalidMessageCreation("frame exceeds maximum size");
        // cannot overflow u16 since payload is bounded by MAX_PAYLOAD
        let length = (HEADER + self.payload.len()) as u16;
        buffer.clear();
        buffer.extend_from_slice(&SOF).map_err(|_| OVERFLOW)?;
        buffer.extend_from_slice(&length.to_le_bytes()).map_err(|_| OVERFLOW)?;
        buffer.extend_from_slice(self.header.to_le_bytes().as_ref()).map_err(|_| OVERFLOW)?;
        buffer.extend_from_slice(&self.payload).map_err(|_| OVERFLOW)?;
        let checksum = CRC.checksum(&buffer[SOF.len() ..]);
        buffer.extend_from_slice(&checksum.to_le_bytes()).map_err(|_| OVERFLOW)?;
        Ok(buffer.as_slice())
    }
}


/// steps of frame reception
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxState {
    /// waiting for the first byte of the start marker
    SofLow,
    SofHigh,
    LengthLow,
    LengthHigh,
    /// accumulating header and payload
    Packet,
    ChecksumLow,
    ChecksumHigh,
    /// a whole frame was received, it still needs validation
    Done,
}

/**
    receive state machine, turning a byte stream into frames

    bytes that cannot start a frame are dropped until the next start marker
*/
#[derive(Clone, Debug)]
pub struct Assembler {
    state: RxState,
    length: u16,
    packet: heapless::Vec<u8, MAX_PACKET>,
    checksum: u16,
}
impl Default for Assembler {
    fn default() -> Self {Self::new()}
}
impl Assembler {
    pub fn new() -> Self {
        Self {
            state: RxState::SofLow,
            length: 0,
            packet: heapless::Vec::new(),
            checksum: 0,
        }
    }
    pub fn reset(&mut self) {
        *self = Self::new();
    }
    pub fn state(&self) -> RxState  {self.state}
    /// true when no byte of a frame has been accepted yet
    pub fn is_idle(&self) -> bool  {self.state == RxState::SofLow}

    /// feed one received byte, and return the new state
    pub fn push(&mut self, byte: u8) -> RxState {
        self.state = match self.state {
            RxState::Done => {
                self.reset();
                return self.push(byte)
            },
            RxState::SofLow => {
                if byte == SOF[0]  {RxState::SofHigh}
                else  {RxState::SofLow}
            },
            RxState::SofHigh => {
                if byte == SOF[1]  {RxState::LengthLow}
                else if byte == SOF[0]  {RxState::SofHigh}
                else  {RxState::SofLow}
            },
            RxState::LengthLow => {
                self.length = u16::from(byte);
                RxState::LengthHigh
            },
            RxState::LengthHigh => {
                self.length |= u16::from(byte) << 8;
                let length = usize::from(self.length);
                if length < HEADER || length > MAX_PACKET {
                    warn!("dropping frame with invalid length {}", length);
                    self.reset();
                    return self.state
                }
                self.packet.clear();
                RxState::Packet
            },
            RxState::Packet => {
                // capacity is guaranteed by the length check
                let _ = self.packet.push(byte);
                if self.packet.len() < usize::from(self.length)  {RxState::Packet}
                else  {RxState::ChecksumLow}
            },
            RxState::ChecksumLow => {
                self.checksum = u16::from(byte);
                RxState::ChecksumHigh
            },
            RxState::ChecksumHigh => {
                self.checksum |= u16::from(byte) << 8;
                RxState::Done
            },
        };
        self.state
    }

    /// check the received frame and extract it
    pub fn validate(&self) -> Result<Frame, Error> {
        if self.state != RxState::Done {
            return Err(self.invalid("frame is incomplete"));
        }
        let mut digest = CRC.digest();
        digest.update(&self.length.to_le_bytes());
        digest.update(&self.packet);
        let checksum = digest.finalize();
        if checksum != self.checksum {
            debug!("checksum mismatch: computed {:#06x}, received {:#06x}", checksum, self.checksum);
            return Err(self.invalid("checksum mismatch"));
        }
        let mut header = <Header as FromBytes>::Bytes::zeroed();
        header.as_mut().copy_from_slice(&self.packet[.. HEADER]);
        Frame::new(Header::from_le_bytes(header), &self.packet[HEADER ..])
            .map_err(|_| self.invalid("payload exceeds maximum frame size"))
    }

    fn invalid(&self, reason: &'static str) -> Error {
        Error::InvalidMessageReceived {state: self.state, reason}
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Kind;

    const READ_REQUEST: [u8; 12] = [0xaa, 0x55, 0x06, 0x00, 0x01, 0x05, 0xe8, 0x03, 0x04, 0x00, 0xbf, 0x43];
    const WRITE_REQUEST: [u8; 16] = [0xaa, 0x55, 0x0a, 0x00, 0x02, 0x05, 0xe8, 0x03, 0x04, 0x00, 0x01, 0x02, 0x03, 0x04, 0x3e, 0x8d];

    fn assemble(bytes: &[u8]) -> Assembler {
        let mut assembler = Assembler::new();
        for &byte in bytes {
            assembler.push(byte);
        }
        assembler
    }

    #[test]
    fn encode_golden() {
        let mut buffer = FrameBuffer::new();
        let frame = Frame::new(Header::new(Kind::read_registers(), 5, 1000, 4), &[]).unwrap();
        assert_eq!(frame.encode(&mut buffer).unwrap(), &READ_REQUEST);
        let frame = Frame::new(Header::new(Kind::write_registers(), 5, 1000, 4), &[1, 2, 3, 4]).unwrap();
        assert_eq!(frame.encode(&mut buffer).unwrap(), &WRITE_REQUEST);
    }

    #[test]
    fn payload_too_large() {
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert!(matches!(
            Frame::new(Header::default(), &payload),
            Err(Error::InvalidMessageCreation(_)),
            ));
        assert!(Frame::new(Header::default(), &payload[.. MAX_PAYLOAD]).is_ok());
    }

    #[test]
    fn assemble_golden() {
        let assembler = assemble(&WRITE_REQUEST);
        assert_eq!(assembler.state(), RxState::Done);
        let frame = assembler.validate().unwrap();
        assert_eq!(*frame.header(), Header::new(Kind::write_registers(), 5, 1000, 4));
        assert_eq!(frame.payload(), &[1, 2, 3, 4]);
    }

    #[test]
    fn resync_after_noise() {
        let mut stream = vec![0x00, 0x55, 0xaa, 0x12, 0xaa, 0xaa];
        // the last 0xaa is the start of the real frame
        stream.extend_from_slice(&READ_REQUEST[1 ..]);
        let assembler = assemble(&stream);
        assert_eq!(assembler.state(), RxState::Done);
        assert_eq!(assembler.validate().unwrap().header().register, 1000);
    }

    #[test]
    fn states_progress() {
        let mut assembler = Assembler::new();
        let states: Vec<RxState> = READ_REQUEST.iter().map(|&byte| assembler.push(byte)).collect();
        assert_eq!(states[0], RxState::SofHigh);
        assert_eq!(states[1], RxState::LengthLow);
        assert_eq!(states[3], RxState::Packet);
        assert_eq!(states[9], RxState::ChecksumLow);
        assert_eq!(states[10], RxState::ChecksumHigh);
        assert_eq!(states[11], RxState::Done);
        // next byte starts a new frame
        assert_eq!(assembler.push(0xaa), RxState::SofHigh);
    }

    #[test]
    fn checksum_mismatch() {
        let mut corrupted = READ_REQUEST;
        corrupted[11] = 0x44;
        let assembler = assemble(&corrupted);
        assert_eq!(assembler.state(), RxState::Done);
        assert!(matches!(
            assembler.validate(),
            Err(Error::InvalidMessageReceived {state: RxState::Done, ..}),
            ));
    }

    #[test]
    fn incomplete() {
        let assembler = assemble(&READ_REQUEST[.. 7]);
        assert_eq!(assembler.state(), RxState::Packet);
        assert!(matches!(
            assembler.validate(),
            Err(Error::InvalidMessageReceived {state: RxState::Packet, ..}),
            ));
    }

    #[test]
    fn invalid_length_drops_frame() {
        let assembler = assemble(&[0xaa, 0x55, 0x02, 0x00]);
        assert!(assembler.is_idle());
        let assembler = assemble(&[0xaa, 0x55, 0xff, 0xff]);
        assert!(assembler.is_idle());
    }
}
