use crate::engine::errors::{Result, WireError};

pub const SIZE_U16: usize = 2;
pub const SIZE_U32: usize = 4;
/// Type byte plus the `i32` length that follows it.
pub const ENVELOPE_LEN: usize = 1 + SIZE_U32;

/// Message type bytes used by the extended protocol.
pub mod tag {
    pub const BIND: u8 = b'B';
    pub const BIND_EX: u8 = b'W';
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    pub const PARAMETER_DESCRIPTION_EX: u8 = b'X';
    pub const ROW_BATCH: u8 = b'V';
}

pub trait MessageEncode {
    const TAG: u8;

    /// Append the complete message (type byte, length, body) to `dst`.
    fn encode(&self, dst: &mut Vec<u8>) -> Result<()>;
}

pub trait MessageDecode<'a>: Sized {
    const TAG: u8;

    /// `body` excludes the type byte and the length.
    fn decode(body: &'a [u8]) -> Result<Self>;

    fn decode_envelope(env: Envelope<'a>) -> Result<Self> {
        if env.tag != Self::TAG {
            return Err(WireError::malformed(
                "envelope",
                format!(
                    "expected message type '{}', got '{}'",
                    Self::TAG as char,
                    env.tag as char
                ),
            ));
        }
        Self::decode(env.body)
    }
}

/// One framed message borrowed from a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub tag: u8,
    pub body: &'a [u8],
}

impl<'a> Envelope<'a> {
    /// Bytes the whole message occupies on the wire.
    pub fn wire_len(&self) -> usize {
        ENVELOPE_LEN + self.body.len()
    }
}

/// Frame the first message in `buf`. Returns `Ok(None)` while the message is
/// still incomplete.
pub fn split_envelope(buf: &[u8]) -> Result<Option<Envelope<'_>>> {
    if buf.len() < ENVELOPE_LEN {
        return Ok(None);
    }
    let tag = buf[0];
    let declared = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
    if declared < SIZE_U32 as i32 {
        return Err(WireError::malformed(
            "envelope",
            format!("length {} smaller than the length field itself", declared),
        ));
    }
    let end = 1 + declared as usize;
    if buf.len() < end {
        return Ok(None);
    }
    Ok(Some(Envelope {
        tag,
        body: &buf[ENVELOPE_LEN..end],
    }))
}

/// Append one message to `dst`. If `body` fails, `dst` is left as it was.
pub fn write_message<F>(dst: &mut Vec<u8>, tag: u8, body: F) -> Result<()>
where
    F: FnOnce(&mut MessageWriter<'_>) -> Result<()>,
{
    let start = dst.len();
    let mut w = MessageWriter::begin(dst, tag);
    match body(&mut w) {
        Ok(()) => {
            w.finish();
            Ok(())
        }
        Err(e) => {
            dst.truncate(start);
            Err(e)
        }
    }
}

/// Builds a message in place: the length is reserved up front and patched by
/// [`MessageWriter::finish`] once the body is known.
pub struct MessageWriter<'a> {
    dst: &'a mut Vec<u8>,
    len_pos: usize,
}

impl<'a> MessageWriter<'a> {
    pub fn begin(dst: &'a mut Vec<u8>, tag: u8) -> Self {
        dst.push(tag);
        let len_pos = dst.len();
        dst.extend_from_slice(&(-1_i32).to_be_bytes());
        Self { dst, len_pos }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.dst.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.dst.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_i16(&mut self, v: i16) {
        self.dst.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.dst.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.dst.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bytes(&mut self, data: &[u8]) {
        self.dst.extend_from_slice(data);
    }

    /// A NUL-terminated string; `s` itself must not contain NUL.
    pub fn put_cstr(&mut self, s: &str) -> Result<()> {
        if s.as_bytes().contains(&0) {
            return Err(WireError::malformed(
                "cstring",
                format!("{:?} contains a NUL byte", s),
            ));
        }
        self.dst.extend_from_slice(s.as_bytes());
        self.dst.push(0);
        Ok(())
    }

    /// A `u16` element count, failing when `n` does not fit.
    pub fn put_count(&mut self, n: usize, what: &'static str) -> Result<()> {
        let n = u16::try_from(n)
            .map_err(|_| WireError::range(what, format!("{} entries exceed u16", n)))?;
        self.put_u16(n);
        Ok(())
    }

    /// Patch the length field; it counts itself and the body, not the tag.
    pub fn finish(self) {
        let len = (self.dst.len() - self.len_pos) as i32;
        self.dst[self.len_pos..self.len_pos + SIZE_U32].copy_from_slice(&len.to_be_bytes());
    }
}

/// Big-endian cursor over a message body. Every read is bounds-checked and
/// reports the message type it was reading.
pub struct MessageReader<'a> {
    buf: &'a [u8],
    pos: usize,
    message_type: &'static str,
}

impl<'a> MessageReader<'a> {
    pub fn new(buf: &'a [u8], message_type: &'static str) -> Self {
        Self {
            buf,
            pos: 0,
            message_type,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn has_bytes(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    /// Everything not consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if !self.has_bytes(n) {
            return Err(WireError::malformed(
                self.message_type,
                format!(
                    "need {} bytes at offset {}, have {}",
                    n,
                    self.pos,
                    self.remaining()
                ),
            ));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// A NUL-terminated UTF-8 string; the terminator is consumed.
    pub fn read_cstr(&mut self) -> Result<&'a str> {
        let rest = self.rest();
        let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            WireError::malformed(
                self.message_type,
                format!("unterminated string at offset {}", self.pos),
            )
        })?;
        let s = std::str::from_utf8(&rest[..nul]).map_err(|e| {
            WireError::malformed(self.message_type, format!("invalid UTF-8: {e}"))
        })?;
        self.pos += nul + 1;
        Ok(s)
    }

    /// Fail if any bytes are left over.
    pub fn expect_end(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(WireError::malformed(
                self.message_type,
                format!("{} trailing bytes", self.remaining()),
            ));
        }
        Ok(())
    }
}
