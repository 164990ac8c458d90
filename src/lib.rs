/*!
    host side of the leaf register protocol, spoken over a half-duplex uart to one or more microcontroller units

    - [registers] fixed width register values and the register table entries
    - [packet], [frame] and [pdu] are the wire format, from the bitfield header to the request/response envelopes
    - [client] (feature `client`) serializes register exchanges from many tasks onto the one serial link
*/

mod utils;

pub mod error;
pub mod registers;
pub mod packet;
pub mod frame;
pub mod pdu;
#[cfg(feature = "client")]
pub mod client;

pub use error::Error;
