use bilge::prelude::*;
use packbytes::{FromBytes, ToBytes};

use crate::pack_bilge;


/// size of [Header] on the wire
pub const HEADER: usize = 6;

/// packet header, common to requests and responses
#[derive(Copy, Clone, FromBytes, ToBytes, Debug, Default, PartialEq)]
pub struct Header {
    /// what the packet is doing
    pub kind: Kind,
    /// unit the request is addressed to, or the unit answering
    pub unit: u8,
    /// first register address accessed
    pub register: u16,
    /// number of register bytes read or written
    pub size: u16,
}
impl Header {
    pub fn new(kind: Kind, unit: u8, register: u16, size: u16) -> Self {
        Self {kind, unit, register, size}
    }
}

/// type byte of a packet
#[bitsize(8)]
#[derive(Copy, Clone, FromBits, DebugBits, PartialEq, Default)]
pub struct Kind {
    /// read registers of a unit
    pub read: bool,
    /// write registers of a unit
    pub write: bool,
    _reserved: u5,
    /// set by a unit that refused the request, the payload then holds an error code instead of register data
    pub error: bool,
}
pack_bilge!(Kind, u8);

impl Kind {
    pub fn read_registers() -> Self {
        let mut kind = Self::default();
        kind.set_read(true);
        kind
    }
    pub fn write_registers() -> Self {
        let mut kind = Self::default();
        kind.set_write(true);
        kind
    }
    pub fn with_error(mut self) -> Self {
        self.set_error(true);
        self
    }
    /// same kind without the error flag
    pub fn base(self) -> Self {
        let mut kind = self;
        kind.set_error(false);
        kind
    }
    /// raw type byte
    pub fn bits(self) -> u8 {
        u8::from(self)
    }
}
