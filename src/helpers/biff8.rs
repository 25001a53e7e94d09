//! BIFF8 record reader for the `Workbook` stream of Excel 97-2003 files.
//! Records may be split across CONTINUE records; reads transparently cross
//! those boundaries.

use crate::error::RustyPbixError;
use crate::helpers::bytes::to_f64;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u32;
use crate::helpers::bytes::to_u64;
use encoding_rs::Encoding;
use thiserror::Error;

const CONTINUE: u16 = 60;

/// Errors specific to BIFF8 record parsing
#[derive(Error, Debug)]
pub enum Biff8Error {
    #[error("Record ended with fewer than {0} bytes remaining")]
    NoEnoughDataError(usize),
}

pub(crate) struct Biff8Reader {
    /// Encoding of 16-bit strings, from the CODEPAGE record (1200 = UTF-16LE)
    pub(crate) encoding: &'static Encoding,
    stream: Vec<u8>,
    /// Offset of the next record header
    next_record: usize,
    /// Byte ranges of the current record and its CONTINUE parts
    segments: Vec<(usize, usize)>,
    segment: usize,
    offset: usize,
}

impl Biff8Reader {
    pub(crate) fn new(stream: Vec<u8>) -> Biff8Reader {
        Biff8Reader {
            encoding: encoding_rs::UTF_16LE,
            stream,
            next_record: 0,
            segments: Vec::new(),
            segment: 0,
            offset: 0,
        }
    }

    /// Advances to the next record and returns its type, or None at end of stream.
    pub(crate) fn next(&mut self) -> Result<Option<u16>, RustyPbixError> {
        let kind = match self.record_header(self.next_record) {
            Some((kind, _)) => kind,
            None => return Ok(None),
        };
        self.segments.clear();
        self.segment = 0;
        self.offset = 0;
        self.push_segment();
        while let Some((CONTINUE, _)) = self.record_header(self.next_record) {
            self.push_segment();
        }
        Ok(Some(kind))
    }

    /// Repositions the reader at an absolute stream offset (a BOUNDSHEET8 pointer).
    pub(crate) fn seek(&mut self, offset: usize) {
        self.next_record = offset;
        self.segments.clear();
    }

    fn record_header(&self, at: usize) -> Option<(u16, usize)> {
        let header = self.stream.get(at..at + 4)?;
        Some((to_u16(&header[..2]), to_u16(&header[2..]) as usize))
    }

    fn push_segment(&mut self) {
        let size = self.record_header(self.next_record).map(|(_, size)| size).unwrap_or(0);
        let lower = (self.next_record + 4).min(self.stream.len());
        let upper = (lower + size).min(self.stream.len());
        self.segments.push((lower, upper));
        self.next_record = lower + size;
    }

    /// Takes up to `length` bytes from the current segment only.
    fn take(&mut self, length: usize) -> &[u8] {
        match self.segments.get(self.segment).copied() {
            Some((lower, upper)) => {
                let source = (lower + self.offset).min(upper);
                let target = (source + length).min(upper);
                if target == upper {
                    self.segment += 1;
                    self.offset = 0;
                } else {
                    self.offset += target - source;
                }
                &self.stream[source..target]
            }
            None => &[],
        }
    }

    fn take_exact(&mut self, length: usize) -> Result<&[u8], RustyPbixError> {
        let bytes = self.take(length);
        if bytes.len() == length {
            Ok(bytes)
        } else {
            Err(Biff8Error::NoEnoughDataError(length))?
        }
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<(), RustyPbixError> {
        let mut remaining = length;
        while remaining > 0 {
            let taken = self.take(remaining).len();
            if taken == 0 {
                Err(Biff8Error::NoEnoughDataError(length))?;
            }
            remaining -= taken;
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, RustyPbixError> {
        Ok(self.take_exact(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, RustyPbixError> {
        self.take_exact(2).map(to_u16)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, RustyPbixError> {
        self.take_exact(4).map(to_u32)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, RustyPbixError> {
        self.take_exact(8).map(to_u64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64, RustyPbixError> {
        self.take_exact(8).map(to_f64)
    }

    /// Reads the 16-bit value `offset` bytes before the end of the current record.
    /// MULRK stores its last column index there.
    pub(crate) fn peek_u16_from_end(&self, offset: usize) -> Result<u16, RustyPbixError> {
        let mut offset = offset;
        for (lower, upper) in self.segments.iter().rev() {
            let size = upper - lower;
            if offset <= size {
                let at = upper - offset;
                return self.stream.get(at..at + 2)
                    .map(to_u16)
                    .ok_or_else(|| Biff8Error::NoEnoughDataError(2).into());
            }
            offset -= size;
        }
        Err(Biff8Error::NoEnoughDataError(2))?
    }

    /// Decodes an RK value: a 30-bit integer or the high bits of an f64, optionally divided by 100.
    pub(crate) fn read_rk(&mut self) -> Result<f64, RustyPbixError> {
        let raw = self.read_u32()?;
        let mut value = if raw & 0x02 != 0 {
            ((raw as i32) >> 2) as f64
        } else {
            f64::from_bits(((raw & 0xFFFF_FFFC) as u64) << 32)
        };
        if raw & 0x01 != 0 {
            value /= 100.0;
        }
        Ok(value)
    }

    /// ShortXLUnicodeString: 8-bit character count.
    pub(crate) fn read_short_string(&mut self) -> Result<String, RustyPbixError> {
        let chars = self.read_u8()? as usize;
        let mut text = String::new();
        self.read_characters(chars, false, &mut text)?;
        Ok(text)
    }

    /// XLUnicodeString: 16-bit character count.
    pub(crate) fn read_string(&mut self) -> Result<String, RustyPbixError> {
        let chars = self.read_u16()? as usize;
        let mut text = String::new();
        self.read_characters(chars, false, &mut text)?;
        Ok(text)
    }

    /// XLUnicodeRichExtendedString as stored in the SST; the text may continue
    /// into the next CONTINUE record with a fresh option byte.
    pub(crate) fn read_rich_string(&mut self) -> Result<String, RustyPbixError> {
        let mut text = String::new();
        let mut remaining = self.read_u16()? as usize;
        let mut read = self.read_characters(remaining, true, &mut text)?;
        while read < remaining {
            remaining -= read;
            read = self.read_characters(remaining, false, &mut text)?;
            if read == 0 {
                Err(Biff8Error::NoEnoughDataError(remaining))?;
            }
        }
        Ok(text)
    }

    /// Reads characters from the current segment; returns how many were read.
    fn read_characters(&mut self, chars: usize, extended: bool, text: &mut String) -> Result<usize, RustyPbixError> {
        let flags = self.read_u8()?;
        let wide = flags & 0x01 != 0;
        let runs = if extended && flags & 0x08 != 0 { self.read_u16()? as usize } else { 0 };
        let phonetic = if extended && flags & 0x04 != 0 { self.read_u32()? as usize } else { 0 };

        let encoding = self.encoding;
        let bytes = self.take(if wide { chars * 2 } else { chars });
        let read = if wide { bytes.len() / 2 } else { bytes.len() };
        if wide {
            let (decoded, _, _) = encoding.decode(bytes);
            text.push_str(&decoded);
        } else {
            // Compressed strings drop the high byte of each UTF-16 code unit
            text.extend(bytes.iter().map(|byte| char::from(*byte)));
        }

        // Formatting runs and phonetic blocks are not needed for values
        self.skip(4 * runs)?;
        self.skip(phonetic)?;
        Ok(read)
    }
}

#[macro_export]
macro_rules! match_biff8_record {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(kind) = $reader.next()? {
            match kind {
                $($arms)*
                _ => (),
            }
        }
    };
}
