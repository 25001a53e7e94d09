//! OLE Compound File Binary (CFB) container reader for legacy `.xls` workbooks.
//! Works on an in-memory copy of the upload; every sector access is bounds
//! checked because uploaded bytes are untrusted.

use crate::error::RustyPbixError;
use crate::helpers::bytes::to_u16;
use crate::helpers::bytes::to_u64;
use crate::helpers::bytes::to_usize;
use crate::helpers::bytes::to_usize_iter;
use encoding_rs::UTF_16LE;
use std::collections::HashMap;
use thiserror::Error;

/// Largest regular sector id; larger values are chain markers (free, end of chain, ...)
const MAX_REGULAR_SECTOR: usize = 0xFFFF_FFFA;
/// Streams smaller than this live in the mini stream
const MINI_STREAM_CUTOFF: usize = 4096;
const MINI_SECTOR_SIZE: usize = 64;
const HEADER_SIZE: usize = 512;
const SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;

/// Errors specific to Compound File Binary parsing
#[derive(Error, Debug)]
pub enum CfbError {
    #[error("The file is corrupted or has an invalid CFB structure")]
    FileFormatError,

    #[error("Invalid OLE signature (not an office document?)")]
    OleSignatureError,

    #[error("Invalid sector size '2 ^ {1}' for major version '{0}'")]
    SectorSizeError(u16, u16),

    #[error("Sector chain starting at '{0}' is cyclic or out of bounds")]
    SectorChainError(usize),

    #[error("Empty root directory")]
    RootDirectoryError,
}

/// Returns true if the bytes start with the OLE compound file signature.
pub(crate) fn is_compound_file(bytes: &[u8]) -> bool {
    bytes.len() >= 8 && to_u64(&bytes[..8]) == SIGNATURE
}

/// Parsed compound file: the directory plus both allocation tables.
pub(crate) struct Cfb<'a> {
    streams: HashMap<String, Stream>,
    fat: Vec<usize>,
    sectors: Sectors<'a>,
    mini_fat: Vec<usize>,
    mini_stream: Vec<u8>,
}

impl<'a> Cfb<'a> {
    /// Parses the container structure; stream contents are read lazily by [`Cfb::read`].
    pub(crate) fn new(data: &'a [u8]) -> Result<Cfb<'a>, RustyPbixError> {
        if data.len() < HEADER_SIZE {
            Err(CfbError::FileFormatError)?;
        }
        let header = Header::parse(&data[..HEADER_SIZE])?;
        let sectors = Sectors { data, size: header.sector_size()? };
        let fat = Self::load_fat(&sectors, &header)?;
        let directory = read_chain(&fat, |index| sectors.get(index), header.directory_start)?;
        let streams: HashMap<String, Stream> = directory.chunks_exact(128).map(Stream::parse).collect();
        let root = streams.get("Root Entry").ok_or(CfbError::RootDirectoryError)?;

        let mini_fat = if header.mini_fat_count > 0 {
            to_usize_iter(&read_chain(&fat, |index| sectors.get(index), header.mini_fat_start)?).collect()
        } else {
            Vec::new()
        };
        let mut mini_stream = read_chain(&fat, |index| sectors.get(index), root.start)?;
        mini_stream.truncate(root.size);

        Ok(Cfb { streams, fat, sectors, mini_fat, mini_stream })
    }

    /// Checks whether a named stream exists in the container.
    pub(crate) fn exists(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    /// Reads a named stream, following the regular or mini allocation chain as appropriate.
    pub(crate) fn read(&self, name: &str) -> Result<Option<Vec<u8>>, RustyPbixError> {
        let stream = match self.streams.get(name) {
            Some(stream) => stream,
            None => return Ok(None),
        };
        let mut bytes = if stream.size < MINI_STREAM_CUTOFF {
            read_chain(&self.mini_fat, |index| mini_sector(&self.mini_stream, index), stream.start)?
        } else {
            read_chain(&self.fat, |index| self.sectors.get(index), stream.start)?
        };
        bytes.truncate(stream.size);
        Ok(Some(bytes))
    }

    /// Builds the file allocation table from the header DIFAT entries and any DIFAT sectors.
    fn load_fat(sectors: &Sectors, header: &Header) -> Result<Vec<usize>, RustyPbixError> {
        let mut difat: Vec<usize> = to_usize_iter(&sectors.data[76..HEADER_SIZE]).collect();
        let mut next = header.difat_start;
        let mut visited = 0usize;
        while next <= MAX_REGULAR_SECTOR {
            visited += 1;
            if visited > header.difat_count.max(1) * 2 {
                Err(CfbError::SectorChainError(header.difat_start))?;
            }
            let sector = sectors.get(next).ok_or(CfbError::SectorChainError(next))?;
            difat.extend(to_usize_iter(sector));
            // The last entry of a DIFAT sector links to the next one
            next = difat.pop().unwrap_or(usize::MAX);
        }

        let mut fat = Vec::new();
        for index in difat.into_iter().filter(|index| *index <= MAX_REGULAR_SECTOR) {
            let sector = sectors.get(index).ok_or(CfbError::SectorChainError(index))?;
            fat.extend(to_usize_iter(sector));
        }
        if fat.is_empty() {
            Err(CfbError::FileFormatError)?;
        }
        Ok(fat)
    }
}

/// Concatenates the sectors of an allocation chain, rejecting cycles and dangling ids.
fn read_chain<'s, F>(table: &[usize], sector: F, start: usize) -> Result<Vec<u8>, RustyPbixError>
where
    F: Fn(usize) -> Option<&'s [u8]>,
{
    let mut content = Vec::new();
    let mut index = start;
    let mut steps = 0usize;
    while index <= MAX_REGULAR_SECTOR {
        steps += 1;
        if steps > table.len() + 1 {
            Err(CfbError::SectorChainError(start))?;
        }
        content.extend_from_slice(sector(index).ok_or(CfbError::SectorChainError(start))?);
        index = *table.get(index).ok_or(CfbError::SectorChainError(start))?;
    }
    Ok(content)
}

fn mini_sector(stream: &[u8], index: usize) -> Option<&[u8]> {
    let lower = index.checked_mul(MINI_SECTOR_SIZE)?;
    let upper = stream.len().min(lower + MINI_SECTOR_SIZE);
    stream.get(lower..upper)
}

/// Regular sectors; sector 0 starts right after the header-sized block.
struct Sectors<'a> {
    data: &'a [u8],
    size: usize,
}

impl<'a> Sectors<'a> {
    fn get(&self, index: usize) -> Option<&'a [u8]> {
        let lower = index.checked_add(1)?.checked_mul(self.size)?;
        let upper = self.data.len().min(lower + self.size);
        self.data.get(lower..upper)
    }
}

struct Header {
    major_version: u16,
    sector_shift: u16,
    directory_start: usize,
    mini_fat_start: usize,
    mini_fat_count: usize,
    difat_start: usize,
    difat_count: usize,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Self, RustyPbixError> {
        if to_u64(&data[0..8]) != SIGNATURE {
            Err(CfbError::OleSignatureError)?;
        }
        Ok(Header {
            major_version: to_u16(&data[26..28]),
            sector_shift: to_u16(&data[30..32]),
            directory_start: to_usize(&data[48..52]),
            mini_fat_start: to_usize(&data[60..64]),
            mini_fat_count: to_usize(&data[64..68]),
            difat_start: to_usize(&data[68..72]),
            difat_count: to_usize(&data[72..76]),
        })
    }

    fn sector_size(&self) -> Result<usize, RustyPbixError> {
        match (self.major_version, self.sector_shift) {
            (3, 0x0009) => Ok(512),
            (4, 0x000C) => Ok(4096),
            (version, shift) => Err(CfbError::SectorSizeError(version, shift))?,
        }
    }
}

/// Directory entry: where a stream starts and how long it is.
struct Stream {
    start: usize,
    size: usize,
}

impl Stream {
    fn parse(bytes: &[u8]) -> (String, Stream) {
        let length = (to_u16(&bytes[64..66]) as usize).min(64);
        let (name, _, _) = UTF_16LE.decode(&bytes[..length]);
        let name = name.split('\0').next().unwrap_or_default().to_owned();
        let start = to_usize(&bytes[116..120]);
        let size = to_u64(&bytes[120..128]) as usize;
        (name, Stream { start, size })
    }
}
