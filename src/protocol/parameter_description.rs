use crate::engine::errors::{Result, WireError};
use crate::protocol::envelope::{MessageDecode, MessageEncode, MessageReader, tag, write_message};

/// Parameter types of a prepared statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDescription {
    pub oids: Vec<u32>,
}

impl<'a> MessageDecode<'a> for ParameterDescription {
    const TAG: u8 = tag::PARAMETER_DESCRIPTION;

    /// The declared count wraps for more than 65535 parameters, so the count
    /// is taken from the body size instead.
    fn decode(body: &'a [u8]) -> Result<Self> {
        let mut r = MessageReader::new(body, "ParameterDescription");
        r.read_u16()?;
        if r.remaining() % 4 != 0 {
            return Err(WireError::malformed(
                "ParameterDescription",
                format!("{} bytes is not a whole number of oids", r.remaining()),
            ));
        }
        let mut oids = Vec::with_capacity(r.remaining() / 4);
        while r.has_bytes(4) {
            oids.push(r.read_u32()?);
        }
        Ok(Self { oids })
    }
}

impl MessageEncode for ParameterDescription {
    const TAG: u8 = tag::PARAMETER_DESCRIPTION;

    fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        write_message(dst, <Self as MessageEncode>::TAG, |w| {
            w.put_count(self.oids.len(), "parameter oids")?;
            for &oid in &self.oids {
                w.put_u32(oid);
            }
            Ok(())
        })
    }
}

/// Parameter description of a time-series insert: column types plus what the
/// packer needs to lay out payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDescriptionEx {
    pub oids: Vec<u32>,
    /// First tag column; everything before it is a field.
    pub tag_index: i16,
    pub primary_tag_ids: Vec<u16>,
    pub storage_lens: Vec<u32>,
}

impl<'a> MessageDecode<'a> for ParameterDescriptionEx {
    const TAG: u8 = tag::PARAMETER_DESCRIPTION_EX;

    fn decode(body: &'a [u8]) -> Result<Self> {
        let mut r = MessageReader::new(body, "ParameterDescriptionEx");

        let count = r.read_u16()? as usize;
        let mut oids = Vec::with_capacity(count.min(r.remaining() / 4));
        for _ in 0..count {
            oids.push(r.read_u32()?);
        }

        let tag_index = r.read_i16()?;

        let count = r.read_u16()? as usize;
        let mut primary_tag_ids = Vec::with_capacity(count.min(r.remaining() / 2));
        for _ in 0..count {
            primary_tag_ids.push(r.read_u16()?);
        }

        let count = r.read_u16()? as usize;
        let mut storage_lens = Vec::with_capacity(count.min(r.remaining() / 4));
        for _ in 0..count {
            storage_lens.push(r.read_u32()?);
        }
        r.expect_end()?;

        Ok(Self {
            oids,
            tag_index,
            primary_tag_ids,
            storage_lens,
        })
    }
}

impl MessageEncode for ParameterDescriptionEx {
    const TAG: u8 = tag::PARAMETER_DESCRIPTION_EX;

    fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        write_message(dst, <Self as MessageEncode>::TAG, |w| {
            w.put_count(self.oids.len(), "parameter oids")?;
            for &oid in &self.oids {
                w.put_u32(oid);
            }
            w.put_i16(self.tag_index);
            w.put_count(self.primary_tag_ids.len(), "primary tag ids")?;
            for &id in &self.primary_tag_ids {
                w.put_u16(id);
            }
            w.put_count(self.storage_lens.len(), "storage lengths")?;
            for &len in &self.storage_lens {
                w.put_u32(len);
            }
            Ok(())
        })
    }
}
