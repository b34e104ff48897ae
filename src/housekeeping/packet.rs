//! Housekeeping packet layouts.
//!
//! Full HK packet: object id (u32), set id (u32), validity flag (u8), the set's
//! variables in registration order, then the optional validity bitmask.
//!
//! Structure packet: object id (u32), set id (u32), diagnostics flag (u8),
//! reporting flag (u8), validity flag (u8), collection interval (f32), fill
//! count (u8), then the local pool ids (u32 each).
//!
//! Snapshot: CDS short timestamp followed by the raw variables, with no header
//! and no validity bitmask. Snapshots never leave the process and use machine
//! endianness.

use crate::dataset::local::validity_mask_len;
use crate::dataset::LocalDataSet;
use crate::error::{PoolError, Result};
use crate::ids::{LocalPoolId, Sid};
use crate::pool::PoolObject;
use crate::serialize::{EndianCodec, Endianness, PoolSerialize, SerialReader, SerialWriter};
use crate::time::{CdsShortTime, TIMESTAMP_SIZE};
use alloc::vec::Vec;
use arrayvec::ArrayVec;

/// Size of the full HK packet header.
pub const HK_PACKET_HEADER_SIZE: usize = 4 + 4 + 1;
/// Largest number of variables whose validity bits [`decode_validity_mask`] returns.
pub const MAX_MASK_VARIABLES: usize = 256;

static_assertions::const_assert_eq!(HK_PACKET_HEADER_SIZE, 9);

/// Full HK packet wrapping a dataset.
pub struct HousekeepingPacketDownlink<'a> {
    sid: Sid,
    set: &'a mut dyn LocalDataSet,
}

impl<'a> HousekeepingPacketDownlink<'a> {
    pub fn new(sid: Sid, set: &'a mut dyn LocalDataSet) -> Self {
        Self { sid, set }
    }
}

impl PoolSerialize for HousekeepingPacketDownlink<'_> {
    fn serialized_size(&self) -> usize {
        HK_PACKET_HEADER_SIZE + self.set.serialized_size()
    }

    fn serialize(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
        if writer.remaining() < self.serialized_size() {
            return Err(PoolError::BufferTooShort);
        }
        self.sid.object_id.encode(writer, endianness)?;
        self.sid.set_id.encode(writer, endianness)?;
        writer.write_bool(self.set.is_valid())?;
        self.set.serialize(writer, endianness)
    }

    /// Reads the header into the sid and set validity, then the set content.
    fn deserialize(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()> {
        let object_id = u32::decode(reader, endianness)?;
        let set_id = u32::decode(reader, endianness)?;
        self.sid = Sid::new(object_id, set_id);
        let valid = reader.read_bool()?;
        self.set.set_validity(valid, false);
        self.set.deserialize(reader, endianness)
    }
}

/// Header of a full HK packet, parsed without knowing the set definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HkPacketHeader {
    pub sid: Sid,
    pub valid: bool,
}

impl HkPacketHeader {
    /// Splits a packet into header and variable payload.
    pub fn parse(data: &[u8], endianness: Endianness) -> Result<(Self, &[u8])> {
        let mut reader = SerialReader::new(data);
        let object_id = u32::decode(&mut reader, endianness)?;
        let set_id = u32::decode(&mut reader, endianness)?;
        let valid = reader.read_bool()?;
        Ok((
            Self {
                sid: Sid::new(object_id, set_id),
                valid,
            },
            reader.peek_rest(),
        ))
    }
}

/// Validity bits of `count` variables from a trailing bitmask.
pub fn decode_validity_mask(mask: &[u8], count: usize) -> Result<ArrayVec<bool, MAX_MASK_VARIABLES>> {
    if count > MAX_MASK_VARIABLES {
        return Err(PoolError::BufferTooShort);
    }
    if mask.len() < validity_mask_len(count) {
        return Err(PoolError::StreamTooShort);
    }
    Ok((0..count)
        .map(|index| mask[index / 8] & (1 << (7 - index % 8)) != 0)
        .collect())
}

/// Structure report of one dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HousekeepingSetPacket {
    pub sid: Sid,
    pub diagnostics: bool,
    pub reporting_enabled: bool,
    pub valid: bool,
    pub collection_interval_s: f32,
    pub local_pool_ids: Vec<LocalPoolId>,
}

impl HousekeepingSetPacket {
    pub fn from_set(set: &dyn LocalDataSet, collection_interval_s: f32) -> Self {
        Self {
            sid: set.sid(),
            diagnostics: set.is_diagnostics(),
            reporting_enabled: set.reporting_enabled(),
            valid: set.is_valid(),
            collection_interval_s,
            local_pool_ids: set.local_pool_ids(),
        }
    }

    pub fn parse(data: &[u8], endianness: Endianness) -> Result<Self> {
        let mut packet = Self::default();
        packet.deserialize(&mut SerialReader::new(data), endianness)?;
        Ok(packet)
    }
}

impl PoolSerialize for HousekeepingSetPacket {
    fn serialized_size(&self) -> usize {
        4 + 4 + 1 + 1 + 1 + 4 + 1 + 4 * self.local_pool_ids.len()
    }

    fn serialize(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
        if self.local_pool_ids.len() > usize::from(u8::MAX) {
            return Err(PoolError::DataTooLarge);
        }
        if writer.remaining() < self.serialized_size() {
            return Err(PoolError::BufferTooShort);
        }
        self.sid.object_id.encode(writer, endianness)?;
        self.sid.set_id.encode(writer, endianness)?;
        writer.write_bool(self.diagnostics)?;
        writer.write_bool(self.reporting_enabled)?;
        writer.write_bool(self.valid)?;
        self.collection_interval_s.encode(writer, endianness)?;
        writer.write_u8(self.local_pool_ids.len() as u8)?;
        for lpid in &self.local_pool_ids {
            lpid.encode(writer, endianness)?;
        }
        Ok(())
    }

    fn deserialize(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()> {
        let object_id = u32::decode(reader, endianness)?;
        let set_id = u32::decode(reader, endianness)?;
        self.sid = Sid::new(object_id, set_id);
        self.diagnostics = reader.read_bool()?;
        self.reporting_enabled = reader.read_bool()?;
        self.valid = reader.read_bool()?;
        self.collection_interval_s = f32::decode(reader, endianness)?;
        let count = reader.read_u8()?;
        self.local_pool_ids.clear();
        for _ in 0..count {
            self.local_pool_ids.push(u32::decode(reader, endianness)?);
        }
        Ok(())
    }
}

enum SnapshotContent<'a> {
    Set(&'a mut dyn LocalDataSet),
    Variable(&'a mut dyn PoolObject),
}

/// Timestamped copy of a dataset or a single pool variable.
pub struct HousekeepingSnapshot<'a> {
    timestamp: CdsShortTime,
    content: SnapshotContent<'a>,
}

impl<'a> HousekeepingSnapshot<'a> {
    pub fn for_set(timestamp: CdsShortTime, set: &'a mut dyn LocalDataSet) -> Self {
        Self {
            timestamp,
            content: SnapshotContent::Set(set),
        }
    }

    pub fn for_variable(timestamp: CdsShortTime, variable: &'a mut dyn PoolObject) -> Self {
        Self {
            timestamp,
            content: SnapshotContent::Variable(variable),
        }
    }

    pub fn timestamp(&self) -> CdsShortTime {
        self.timestamp
    }
}

impl PoolSerialize for HousekeepingSnapshot<'_> {
    fn serialized_size(&self) -> usize {
        TIMESTAMP_SIZE
            + match &self.content {
                SnapshotContent::Set(set) => set.variables_size(),
                SnapshotContent::Variable(variable) => variable.serialized_size(),
            }
    }

    fn serialize(&self, writer: &mut SerialWriter, endianness: Endianness) -> Result<()> {
        if writer.remaining() < self.serialized_size() {
            return Err(PoolError::BufferTooShort);
        }
        writer.write_bytes(&self.timestamp.to_bytes())?;
        match &self.content {
            SnapshotContent::Set(set) => set.serialize_variables(writer, endianness),
            SnapshotContent::Variable(variable) => variable.serialize(writer, endianness),
        }
    }

    fn deserialize(&mut self, reader: &mut SerialReader<'_>, endianness: Endianness) -> Result<()> {
        self.timestamp = CdsShortTime::from_bytes(reader.read_bytes(TIMESTAMP_SIZE)?)?;
        match &mut self.content {
            SnapshotContent::Set(set) => set.deserialize_variables(reader, endianness),
            SnapshotContent::Variable(variable) => variable.deserialize(reader, endianness),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_packet_layout() {
        let packet = HousekeepingSetPacket {
            sid: Sid::new(0x0102_0304, 7),
            diagnostics: true,
            reporting_enabled: false,
            valid: true,
            collection_interval_s: 1.0,
            local_pool_ids: alloc::vec![0x10, 0x11],
        };
        let bytes = packet.to_bytes(Endianness::Big).unwrap();
        assert_eq!(bytes.len(), packet.serialized_size());
        assert_eq!(&bytes[..11], &[1, 2, 3, 4, 0, 0, 0, 7, 1, 0, 1]);
        assert_eq!(&bytes[11..15], &1.0f32.to_be_bytes());
        assert_eq!(bytes[15], 2);
        assert_eq!(HousekeepingSetPacket::parse(&bytes, Endianness::Big), Ok(packet));
    }

    #[test]
    fn test_header_parse() {
        let data = [0, 0, 0, 1, 0, 0, 0, 2, 1, 0xAA, 0xBB];
        let (header, rest) = HkPacketHeader::parse(&data, Endianness::Big).unwrap();
        assert_eq!(header.sid, Sid::new(1, 2));
        assert!(header.valid);
        assert_eq!(rest, &[0xAA, 0xBB]);
        assert_eq!(
            HkPacketHeader::parse(&data[..5], Endianness::Big).err(),
            Some(PoolError::StreamTooShort)
        );
    }

    #[test]
    fn test_decode_validity_mask() {
        let bits = decode_validity_mask(&[0b1010_0000, 0b1000_0000], 9).unwrap();
        assert_eq!(
            bits.as_slice(),
            &[true, false, true, false, false, false, false, false, true]
        );
        assert_eq!(decode_validity_mask(&[0], 9).err(), Some(PoolError::StreamTooShort));
    }
}
