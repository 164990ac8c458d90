/*!
    register values and register table entries

    a register is a fixed width integer at a fixed address of a unit, its value is sent little endian, two's complement when signed.

    register tables are generated from the firmware sources and only consumed here, as [Descriptor] constants like the ones in [system].
*/

use packbytes::{FromBytes, ToBytes, ByteArray};
use crate::error::Error;


/// raw bytes of one register value
pub type RegisterBytes = heapless::Vec<u8, 4>;

/// number of bytes of a register value
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Width {
    One = 1,
    Two = 2,
    Four = 4,
}
impl Width {
    pub const fn size(self) -> u16  {self as u16}
}
impl TryFrom<u8> for Width {
    type Error = Error;
    fn try_from(size: u8) -> Result<Self, Error> {
        match size {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            _ => Err(Error::Parameter("register size must be 1, 2 or 4 bytes")),
        }
    }
}

/// allowed operations on a register
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}
impl Access {
    pub const fn readable(self) -> bool  {matches!(self, Self::Read | Self::ReadWrite)}
    pub const fn writable(self) -> bool  {matches!(self, Self::Write | Self::ReadWrite)}
}

/// binary representation of a register value
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format {
    pub width: Width,
    pub signed: bool,
}
impl Format {
    pub const fn new(width: Width, signed: bool) -> Self {
        Self {width, signed}
    }
    /// smallest representable value
    pub const fn min(self) -> i64 {
        match (self.width, self.signed) {
            (_, false) => 0,
            (Width::One, true) => i8::MIN as i64,
            (Width::Two, true) => i16::MIN as i64,
            (Width::Four, true) => i32::MIN as i64,
        }
    }
    /// biggest representable value
    pub const fn max(self) -> i64 {
        match (self.width, self.signed) {
            (Width::One, false) => u8::MAX as i64,
            (Width::Two, false) => u16::MAX as i64,
            (Width::Four, false) => u32::MAX as i64,
            (Width::One, true) => i8::MAX as i64,
            (Width::Two, true) => i16::MAX as i64,
            (Width::Four, true) => i32::MAX as i64,
        }
    }

    pub fn encode(self, value: i64) -> Result<RegisterBytes, Error> {
        match (self.width, self.signed) {
            (Width::One, false) => pack::<u8>(value),
            (Width::Two, false) => pack::<u16>(value),
            (Width::Four, false) => pack::<u32>(value),
            (Width::One, true) => pack::<i8>(value),
            (Width::Two, true) => pack::<i16>(value),
            (Width::Four, true) => pack::<i32>(value),
        }
    }
    pub fn decode(self, data: &[u8]) -> Result<i64, Error> {
        match (self.width, self.signed) {
            (Width::One, false) => unpack::<u8>(data),
            (Width::Two, false) => unpack::<u16>(data),
            (Width::Four, false) => unpack::<u32>(data),
            (Width::One, true) => unpack::<i8>(data),
            (Width::Two, true) => unpack::<i16>(data),
            (Width::Four, true) => unpack::<i32>(data),
        }
    }
}

fn pack<T: ToBytes + TryFrom<i64>>(value: i64) -> Result<RegisterBytes, Error> {
    let value = T::try_from(value)
        .map_err(|_| Error::Parameter("value does not fit in register"))?;
    RegisterBytes::from_slice(value.to_le_bytes().as_ref())
        .map_err(|_| Error::Parameter("register wider than 4 bytes"))
}
fn unpack<T: FromBytes + Into<i64>>(data: &[u8]) -> Result<i64, Error> {
    if data.len() != T::Bytes::SIZE {
        return Err(Error::Parameter("data size does not match register size"));
    }
    let mut bytes = T::Bytes::zeroed();
    bytes.as_mut().copy_from_slice(data);
    Ok(T::from_le_bytes(bytes).into())
}


/// entry of a register table
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Descriptor {
    pub name: &'static str,
    /// address of the first register byte in the unit
    pub address: u16,
    pub format: Format,
    pub access: Access,
}
impl Descriptor {
    /// unsigned register
    pub const fn new(name: &'static str, address: u16, width: Width, access: Access) -> Self {
        Self {name, address, format: Format::new(width, false), access}
    }
    /// same register holding a signed value
    pub const fn signed(mut self) -> Self {
        self.format.signed = true;
        self
    }
    /// build an entry from a table row, checking the size
    pub fn from_table(name: &'static str, address: u16, size: u8, access: Access, signed: bool) -> Result<Self, Error> {
        Ok(Self {name, address, format: Format::new(Width::try_from(size)?, signed), access})
    }
    pub const fn size(&self) -> u16  {self.format.width.size()}
}

/// a register of a unit, with its last known value
#[derive(Clone, Debug, PartialEq)]
pub struct Register {
    descriptor: Descriptor,
    /// unit owning the register, if bound to one
    unit: Option<u8>,
    value: i64,
}
impl Register {
    pub const fn new(descriptor: Descriptor) -> Self {
        Self {descriptor, unit: None, value: 0}
    }
    /// bind the register to the unit owning it
    pub const fn at(mut self, unit: u8) -> Self {
        self.unit = Some(unit);
        self
    }
    pub fn with_value(descriptor: Descriptor, value: i64) -> Result<Self, Error> {
        let mut register = Self::new(descriptor);
        register.set(value)?;
        Ok(register)
    }
    pub const fn descriptor(&self) -> &Descriptor  {&self.descriptor}
    pub const fn unit(&self) -> Option<u8>  {self.unit}
    pub const fn name(&self) -> &'static str  {self.descriptor.name}
    pub const fn address(&self) -> u16  {self.descriptor.address}
    pub const fn size(&self) -> u16  {self.descriptor.size()}
    pub const fn access(&self) -> Access  {self.descriptor.access}
    pub const fn value(&self) -> i64  {self.value}

    /// change the value, it must be representable by the register
    pub fn set(&mut self, value: i64) -> Result<(), Error> {
        let format = self.descriptor.format;
        if value < format.min() || value > format.max() {
            return Err(Error::Parameter("value does not fit in register"));
        }
        self.value = value;
        Ok(())
    }
    pub fn encode(&self) -> Result<RegisterBytes, Error> {
        self.descriptor.format.encode(self.value)
    }
    pub fn decode(&mut self, data: &[u8]) -> Result<i64, Error> {
        self.value = self.descriptor.format.decode(data)?;
        Ok(self.value)
    }
}


/// standard registers of the main board
pub mod system {
    use super::{Descriptor, Width, Access};

    /// firmware version
    pub const FW_VERSION: Descriptor = Descriptor::new("FW_VERSION", 1000, Width::Two, Access::Read);
    /// board status flags
    pub const GLOBAL_STATUS: Descriptor = Descriptor::new("GLOBAL_STATUS", 1003, Width::Four, Access::Read);
    pub const TACHO_15_VALUE: Descriptor = Descriptor::new("TACHO_15_VALUE", 1033, Width::Two, Access::Read);
    /// unit address of the board on the bus
    pub const ADDR: Descriptor = Descriptor::new("ADDR", 3900, Width::Two, Access::ReadWrite);
    pub const PWM_15_DUTY_CYCLE: Descriptor = Descriptor::new("PWM_15_DUTY_CYCLE", 4057, Width::Two, Access::ReadWrite);
}


#[cfg(test)]
mod tests {
    use super::*;

    const fn test_register(width: Width) -> Descriptor {
        Descriptor::new("REG1", 1, width, Access::Read)
    }

    fn encoded(descriptor: Descriptor, value: i64) -> RegisterBytes {
        Register::with_value(descriptor, value).unwrap().encode().unwrap()
    }

    #[test]
    fn encode_unsigned() {
        assert_eq!(encoded(test_register(Width::One), 0x01), [0x01]);
        assert_eq!(encoded(test_register(Width::Two), 0x0201), [0x01, 0x02]);
        assert_eq!(encoded(test_register(Width::Four), 0x04030201), [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(encoded(test_register(Width::Four), 0xffff_ffff), [0xff; 4]);
    }

    #[test]
    fn encode_signed() {
        assert_eq!(encoded(test_register(Width::One).signed(), -1), [0xff]);
        assert_eq!(encoded(test_register(Width::Two).signed(), -2), [0xfe, 0xff]);
        assert_eq!(encoded(test_register(Width::Four).signed(), -3), [0xfd, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn decode() {
        let mut register = Register::new(test_register(Width::One));
        assert_eq!(register.decode(&[0x01]).unwrap(), 1);
        let mut register = Register::new(test_register(Width::Two));
        assert_eq!(register.decode(&[0x01, 0x02]).unwrap(), 0x0201);
        let mut register = Register::new(test_register(Width::Four));
        assert_eq!(register.decode(&[0x01, 0x02, 0x03, 0x04]).unwrap(), 0x04030201);
        assert_eq!(register.value(), 0x04030201);

        let mut register = Register::new(test_register(Width::One).signed());
        assert_eq!(register.decode(&[0xff]).unwrap(), -1);
        let mut register = Register::new(test_register(Width::Two).signed());
        assert_eq!(register.decode(&[0xfe, 0xff]).unwrap(), -2);
        let mut register = Register::new(test_register(Width::Four).signed());
        assert_eq!(register.decode(&[0xfd, 0xff, 0xff, 0xff]).unwrap(), -3);
    }

    fn survives(format: Format, value: i64) {
        let bytes = format.encode(value).unwrap();
        assert_eq!(bytes.len(), usize::from(format.width.size()));
        assert_eq!(format.decode(&bytes).unwrap(), value, "{:?}", format);
    }

    #[test]
    fn every_small_value_survives() {
        for width in [Width::One, Width::Two] {
            for signed in [false, true] {
                let format = Format::new(width, signed);
                for value in format.min() ..= format.max() {
                    survives(format, value);
                }
            }
        }
    }

    #[test]
    fn wide_extremes_survive() {
        for signed in [false, true] {
            let format = Format::new(Width::Four, signed);
            for value in [format.min(), format.min() + 1, 0, 1, format.max() / 2, format.max() - 1, format.max()] {
                survives(format, value);
            }
        }
    }

    #[test]
    fn out_of_range() {
        assert!(matches!(Register::with_value(test_register(Width::One), 256), Err(Error::Parameter(_))));
        assert!(matches!(Register::with_value(test_register(Width::One), -1), Err(Error::Parameter(_))));
        assert!(matches!(Register::with_value(test_register(Width::Two).signed(), 32768), Err(Error::Parameter(_))));
        assert!(matches!(Format::new(Width::Four, false).encode(1 << 32), Err(Error::Parameter(_))));
    }

    #[test]
    fn wrong_data_size() {
        let mut register = Register::new(test_register(Width::Two));
        assert!(matches!(register.decode(&[0x01]), Err(Error::Parameter(_))));
        assert!(matches!(register.decode(&[0x01, 0x02, 0x03]), Err(Error::Parameter(_))));
        assert_eq!(register.value(), 0);
    }

    #[test]
    fn unsupported_size() {
        assert!(matches!(Width::try_from(3u8), Err(Error::Parameter(_))));
        assert!(matches!(Descriptor::from_table("REG", 0, 0, Access::Read, false), Err(Error::Parameter(_))));
        let descriptor = Descriptor::from_table("REG", 7, 4, Access::ReadWrite, true).unwrap();
        assert_eq!(descriptor.size(), 4);
        assert!(descriptor.format.signed);
    }

    #[test]
    fn owning_unit() {
        let register = Register::new(system::ADDR);
        assert_eq!(register.unit(), None);
        let register = Register::with_value(system::ADDR, 7).unwrap().at(3);
        assert_eq!(register.unit(), Some(3));
        assert_eq!(register.value(), 7);
    }

    #[test]
    fn system_table() {
        assert_eq!(system::FW_VERSION.address, 1000);
        assert_eq!(system::FW_VERSION.size(), 2);
        assert_eq!(system::GLOBAL_STATUS.address, 1003);
        assert_eq!(system::GLOBAL_STATUS.size(), 4);
        assert!(!system::GLOBAL_STATUS.access.writable());
        assert_eq!(system::ADDR.address, 3900);
        assert_eq!(system::ADDR.access, Access::ReadWrite);
        assert_eq!(system::PWM_15_DUTY_CYCLE.address, 4057);
    }
}
