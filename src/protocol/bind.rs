use crate::engine::codec::cell_codec::CellValue;
use crate::engine::errors::{Result, WireError};
use crate::protocol::envelope::{MessageDecode, MessageEncode, MessageReader, tag, write_message};

const BIND: &str = "Bind";
pub const FORMAT_BINARY: i16 = 1;

/// Standard extended-protocol Bind: one row of parameters for a prepared
/// statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bind {
    pub portal: String,
    pub statement: String,
    pub param_formats: Vec<i16>,
    /// `None` is sent as length `-1`.
    pub params: Vec<Option<Vec<u8>>>,
    pub result_formats: Vec<i16>,
}

impl Bind {
    /// Bind one row in the loader's binary argument convention.
    pub fn from_cells(
        portal: impl Into<String>,
        statement: impl Into<String>,
        oids: &[u32],
        row: &[CellValue<'_>],
    ) -> Result<Self> {
        if oids.len() != row.len() {
            return Err(WireError::malformed(
                BIND,
                format!("{} values for {} parameter oids", row.len(), oids.len()),
            ));
        }
        let params = oids
            .iter()
            .zip(row)
            .enumerate()
            .map(|(c, (&oid, v))| v.to_bind_param(oid).map_err(|e| e.at_cell(0, c)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            portal: portal.into(),
            statement: statement.into(),
            param_formats: vec![FORMAT_BINARY],
            params,
            result_formats: vec![FORMAT_BINARY],
        })
    }

    /// The parameters as cell values for `oids`.
    pub fn cells<'s>(&'s self, oids: &[u32]) -> Result<Vec<CellValue<'s>>> {
        if oids.len() != self.params.len() {
            return Err(WireError::malformed(
                BIND,
                format!("{} params for {} parameter oids", self.params.len(), oids.len()),
            ));
        }
        oids.iter()
            .zip(&self.params)
            .map(|(&oid, p)| CellValue::from_bind_param(oid, p.as_deref()))
            .collect()
    }
}

fn read_formats(r: &mut MessageReader<'_>) -> Result<Vec<i16>> {
    let count = r.read_u16()? as usize;
    if !r.has_bytes(count * 2) {
        return Err(WireError::malformed(
            BIND,
            format!("{} format codes need {} bytes, {} left", count, count * 2, r.remaining()),
        ));
    }
    (0..count).map(|_| r.read_i16()).collect()
}

impl<'a> MessageDecode<'a> for Bind {
    const TAG: u8 = tag::BIND;

    fn decode(body: &'a [u8]) -> Result<Self> {
        let mut r = MessageReader::new(body, BIND);
        let portal = r.read_cstr()?.to_string();
        let statement = r.read_cstr()?.to_string();
        let param_formats = read_formats(&mut r)?;

        let count = r.read_u16()? as usize;
        let mut params = Vec::with_capacity(count.min(r.remaining() / 4));
        for _ in 0..count {
            let len = r.read_i32()?;
            if len == -1 {
                params.push(None);
                continue;
            }
            let len = usize::try_from(len).map_err(|_| {
                WireError::malformed(BIND, format!("negative parameter length {}", len))
            })?;
            params.push(Some(r.read_bytes(len)?.to_vec()));
        }

        let result_formats = read_formats(&mut r)?;
        r.expect_end()?;

        Ok(Self {
            portal,
            statement,
            param_formats,
            params,
            result_formats,
        })
    }
}

impl MessageEncode for Bind {
    const TAG: u8 = tag::BIND;

    fn encode(&self, dst: &mut Vec<u8>) -> Result<()> {
        write_message(dst, <Self as MessageEncode>::TAG, |w| {
            w.put_cstr(&self.portal)?;
            w.put_cstr(&self.statement)?;
            w.put_count(self.param_formats.len(), "parameter formats")?;
            for &f in &self.param_formats {
                w.put_i16(f);
            }
            w.put_count(self.params.len(), "parameters")?;
            for param in &self.params {
                match param {
                    None => w.put_i32(-1),
                    Some(bytes) => {
                        let len = i32::try_from(bytes.len()).map_err(|_| {
                            WireError::range("parameter", format!("{} bytes", bytes.len()))
                        })?;
                        w.put_i32(len);
                        w.put_bytes(bytes);
                    }
                }
            }
            w.put_count(self.result_formats.len(), "result formats")?;
            for &f in &self.result_formats {
                w.put_i16(f);
            }
            Ok(())
        })
    }
}
