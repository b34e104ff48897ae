//! Endian-explicit binary serialization used by accessors, datasets and
//! housekeeping packets.
//!
//! Downlinked packets use big endian; packets which never leave the local
//! process use machine endianness.

use crate::error::{PoolError, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Big,
    Little,
    Machine,
}

/// Bounded output buffer. Writes past `max_size` fail with
/// [`PoolError::BufferTooShort`] and leave the buffer untouched.
#[derive(Debug)]
pub struct SerialWriter {
    buffer: alloc::vec::Vec<u8>,
    max_size: usize,
}

impl SerialWriter {
    pub fn new(max_size: usize) -> Self {
        Self {
            buffer: alloc::vec::Vec::with_capacity(max_size),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.max_size - self.buffer.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_vec(self) -> alloc::vec::Vec<u8> {
        self.buffer
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            return Err(PoolError::BufferTooShort);
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    fn reserve_slot(&mut self, width: usize) -> Result<&mut [u8]> {
        if width > self.remaining() {
            return Err(PoolError::BufferTooShort);
        }
        let start = self.buffer.len();
        self.buffer.resize(start + width, 0);
        Ok(&mut self.buffer[start..])
    }
}

/// Cursor over an input byte stream.
#[derive(Debug)]
pub struct SerialReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SerialReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(PoolError::StreamTooShort);
        }
        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Rest of the stream without consuming it.
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }
}

/// Binary serialization with a caller-chosen endianness.
pub trait PoolSerialize {
    fn serialized_size(&self) -> usize;

    fn serialize(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()>;

    fn deserialize(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()>;

    /// Serializes into a freshly allocated buffer of exactly the serialized size.
    fn to_bytes(&self, endianness: Endianness) -> Result<alloc::vec::Vec<u8>> {
        let mut writer = SerialWriter::new(self.serialized_size());
        self.serialize(&mut writer, endianness)?;
        Ok(writer.into_vec())
    }
}

/// Fixed-width numeric values that can be written with any endianness.
pub trait EndianCodec: Sized + Copy {
    const WIDTH: usize;

    fn encode(self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()>;

    fn decode(reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<Self>;
}

macro_rules! impl_endian_codec {
    ($ty:ty, $width:expr, $write:ident, $read:ident) => {
        impl EndianCodec for $ty {
            const WIDTH: usize = $width;

            fn encode(self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
                let slot = writer.reserve_slot(Self::WIDTH)?;
                match endianness {
                    Endianness::Big => BigEndian::$write(slot, self),
                    Endianness::Little => LittleEndian::$write(slot, self),
                    Endianness::Machine => NativeEndian::$write(slot, self),
                }
                Ok(())
            }

            fn decode(reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<Self> {
                let bytes = reader.read_bytes(Self::WIDTH)?;
                Ok(match endianness {
                    Endianness::Big => BigEndian::$read(bytes),
                    Endianness::Little => LittleEndian::$read(bytes),
                    Endianness::Machine => NativeEndian::$read(bytes),
                })
            }
        }
    };
}

impl_endian_codec!(u16, 2, write_u16, read_u16);
impl_endian_codec!(i16, 2, write_i16, read_i16);
impl_endian_codec!(u32, 4, write_u32, read_u32);
impl_endian_codec!(i32, 4, write_i32, read_i32);
impl_endian_codec!(u64, 8, write_u64, read_u64);
impl_endian_codec!(i64, 8, write_i64, read_i64);
impl_endian_codec!(f32, 4, write_f32, read_f32);
impl_endian_codec!(f64, 8, write_f64, read_f64);

impl EndianCodec for u8 {
    const WIDTH: usize = 1;

    fn encode(self, writer: &mut SerialWriter, _endianness: Endianness) -> Result<()> {
        writer.write_u8(self)
    }

    fn decode(reader: &mut SerialReader<'_>, _endianness: Endianness) -> Result<Self> {
        reader.read_u8()
    }
}

impl EndianCodec for i8 {
    const WIDTH: usize = 1;

    fn encode(self, writer: &mut SerialWriter, _endianness: Endianness) -> Result<()> {
        writer.write_u8(self as u8)
    }

    fn decode(reader: &mut SerialReader<'_>, _endianness: Endianness) -> Result<Self> {
        Ok(reader.read_u8()? as i8)
    }
}
