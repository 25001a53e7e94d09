#![allow(dead_code)]

use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const SALES_CSV: &str = "date,revenue,product\n2024-01-01,100,A\n2024-02-01,150,A\n2024-03-01,90,B";

/// A CSV with one row per month and the given revenues, starting January 2024.
pub fn monthly_csv(revenues: &[f64]) -> String {
    let mut csv = String::from("date,revenue,product\n");
    for (i, revenue) in revenues.iter().enumerate() {
        csv.push_str(&format!("2024-{:02}-01,{},P{}\n", i + 1, revenue, i % 2));
    }
    csv
}

/// A one-sheet workbook. Cells are written as inline strings, plain numbers
/// or, when prefixed with `@`, date serials with a date style.
pub fn xlsx(rows: &[&[&str]]) -> Vec<u8> {
    xlsx_workbook(rows, false)
}

/// Same as [`xlsx`] with the 1904 date system.
pub fn xlsx_1904(rows: &[&[&str]]) -> Vec<u8> {
    xlsx_workbook(rows, true)
}

fn xlsx_workbook(rows: &[&[&str]], date1904: bool) -> Vec<u8> {
    let mut sheet = String::from(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            if let Some(serial) = value.strip_prefix('@') {
                sheet.push_str(&format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#));
            } else if value.parse::<f64>().is_ok() {
                sheet.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                sheet.push_str(&format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#));
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts = [
        ("xl/workbook.xml", format!(r#"<?xml version="1.0"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<workbookPr date1904="{}"/><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#, u8::from(date1904))),
        ("xl/_rels/workbook.xml.rels", String::from(r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#)),
        ("xl/styles.xml", String::from(r#"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="14"/></cellXfs></styleSheet>"#)),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

const SECTOR_SIZE: usize = 512;
const MINI_SECTOR_SIZE: usize = 64;
const MINI_STREAM_CUTOFF: usize = 4096;
const END_OF_CHAIN: u32 = 0xFFFF_FFFE;
const FREE_SECTOR: u32 = 0xFFFF_FFFF;
const FAT_SECTOR: u32 = 0xFFFF_FFFD;

fn record(kind: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&kind.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

/// 8-bit ("compressed") unicode string body: option byte then one byte per character.
fn compressed(text: &str) -> Vec<u8> {
    let mut bytes = vec![0u8];
    bytes.extend(text.chars().map(|c| c as u8));
    bytes
}

fn cell_header(row: usize, col: usize, xf: u16) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(row as u16).to_le_bytes());
    bytes.extend_from_slice(&(col as u16).to_le_bytes());
    bytes.extend_from_slice(&xf.to_le_bytes());
    bytes
}

/// An Excel 97-2003 workbook with one sheet, the way Excel writes it:
/// CODEPAGE 1200, header cells as LABELSST into the shared string table,
/// other text as LABEL, numbers as NUMBER and `@`-prefixed date serials
/// as NUMBER with a date-formatted XF.
pub fn xls(rows: &[&[&str]]) -> Vec<u8> {
    let header: &[&str] = rows.first().copied().unwrap_or_default();

    let mut sheet = record(0x0809, &[0x00, 0x06, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if r == 0 {
                let mut payload = cell_header(r, c, 0);
                payload.extend_from_slice(&(c as u32).to_le_bytes());
                sheet.extend(record(0x00FD, &payload));
            } else if let Some(serial) = value.strip_prefix('@') {
                let mut payload = cell_header(r, c, 1);
                payload.extend_from_slice(&serial.parse::<f64>().unwrap().to_le_bytes());
                sheet.extend(record(0x0203, &payload));
            } else if let Ok(number) = value.parse::<f64>() {
                let mut payload = cell_header(r, c, 0);
                payload.extend_from_slice(&number.to_le_bytes());
                sheet.extend(record(0x0203, &payload));
            } else {
                let mut payload = cell_header(r, c, 0);
                payload.extend_from_slice(&(value.len() as u16).to_le_bytes());
                payload.extend(compressed(value));
                sheet.extend(record(0x0204, &payload));
            }
        }
    }
    sheet.extend(record(0x000A, &[]));

    let globals = |pointer: u32| {
        let mut stream = record(0x0809, &[0x00, 0x06, 0x05, 0x00, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        stream.extend(record(0x0042, &1200u16.to_le_bytes()));
        for format in [0u16, 14] {
            let mut payload = vec![0u8; 2];
            payload.extend_from_slice(&format.to_le_bytes());
            payload.extend_from_slice(&[0u8; 16]);
            stream.extend(record(0x00E0, &payload));
        }
        let mut sst = Vec::new();
        sst.extend_from_slice(&(header.len() as u32).to_le_bytes());
        sst.extend_from_slice(&(header.len() as u32).to_le_bytes());
        for name in header {
            sst.extend_from_slice(&(name.len() as u16).to_le_bytes());
            sst.extend(compressed(name));
        }
        stream.extend(record(0x00FC, &sst));
        let mut bound_sheet = pointer.to_le_bytes().to_vec();
        bound_sheet.extend_from_slice(&[0, 0, 4]);
        bound_sheet.extend(compressed("Data"));
        stream.extend(record(0x0085, &bound_sheet));
        stream.extend(record(0x000A, &[]));
        stream
    };
    let pointer = globals(0).len() as u32;
    let mut workbook = globals(pointer);
    workbook.extend(sheet);
    compound_file(&[("Workbook", workbook.as_slice())])
}

/// A version 3 compound file (512-byte sectors) holding `streams` in the root storage.
/// Streams below the cutoff go to the mini stream, as real writers do.
pub fn compound_file(streams: &[(&str, &[u8])]) -> Vec<u8> {
    let sectors_of = |size: usize, unit: usize| size.div_ceil(unit);

    let mut mini_stream = Vec::<u8>::new();
    let mut mini_fat = Vec::<u32>::new();
    let mut entries = Vec::<(&str, u8, u32, u64)>::new();
    let mut regular = Vec::<(usize, &[u8])>::new();
    for &(name, data) in streams {
        if data.len() < MINI_STREAM_CUTOFF {
            let start = mini_fat.len() as u32;
            let count = sectors_of(data.len(), MINI_SECTOR_SIZE);
            for i in 0..count as u32 {
                mini_fat.push(if i + 1 < count as u32 { start + i + 1 } else { END_OF_CHAIN });
            }
            mini_stream.extend_from_slice(data);
            mini_stream.resize(mini_fat.len() * MINI_SECTOR_SIZE, 0);
            entries.push((name, 2, if count == 0 { END_OF_CHAIN } else { start }, data.len() as u64));
        } else {
            regular.push((entries.len() + 1, data));
            entries.push((name, 2, END_OF_CHAIN, data.len() as u64));
        }
    }

    let mut fat = vec![FREE_SECTOR; SECTOR_SIZE / 4];
    fat[0] = FAT_SECTOR;
    let mut next = 1usize;
    let mut allocate = |count: usize| -> u32 {
        if count == 0 {
            return END_OF_CHAIN;
        }
        let start = next;
        for i in 0..count {
            fat[start + i] = if i + 1 < count { (start + i + 1) as u32 } else { END_OF_CHAIN };
        }
        next += count;
        start as u32
    };
    let directory_start = allocate(sectors_of((entries.len() + 1) * 128, SECTOR_SIZE));
    let mini_fat_sectors = sectors_of(mini_fat.len() * 4, SECTOR_SIZE);
    let mini_fat_start = allocate(mini_fat_sectors);
    let mini_stream_start = allocate(sectors_of(mini_stream.len(), SECTOR_SIZE));
    let mut regular_starts = Vec::new();
    for (entry, data) in &regular {
        regular_starts.push((*entry, allocate(sectors_of(data.len(), SECTOR_SIZE))));
    }
    assert!(next <= fat.len(), "fixture too large for a single FAT sector");
    entries.insert(0, ("Root Entry", 5, mini_stream_start, mini_stream.len() as u64));
    for (entry, start) in regular_starts {
        entries[entry].2 = start;
    }

    let mut header = vec![0u8; SECTOR_SIZE];
    header[..8].copy_from_slice(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]);
    header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());
    header[26..28].copy_from_slice(&3u16.to_le_bytes());
    header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
    header[30..32].copy_from_slice(&9u16.to_le_bytes());
    header[32..34].copy_from_slice(&6u16.to_le_bytes());
    header[44..48].copy_from_slice(&1u32.to_le_bytes());
    header[48..52].copy_from_slice(&directory_start.to_le_bytes());
    header[56..60].copy_from_slice(&(MINI_STREAM_CUTOFF as u32).to_le_bytes());
    header[60..64].copy_from_slice(&mini_fat_start.to_le_bytes());
    header[64..68].copy_from_slice(&(mini_fat_sectors as u32).to_le_bytes());
    header[68..72].copy_from_slice(&END_OF_CHAIN.to_le_bytes());
    for slot in header[76..].chunks_exact_mut(4) {
        slot.copy_from_slice(&FREE_SECTOR.to_le_bytes());
    }
    header[76..80].copy_from_slice(&0u32.to_le_bytes());

    let mut directory = Vec::new();
    for (name, kind, start, size) in &entries {
        let mut entry = vec![0u8; 128];
        let units: Vec<u16> = name.encode_utf16().chain([0]).collect();
        for (i, unit) in units.iter().enumerate() {
            entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        entry[64..66].copy_from_slice(&((units.len() * 2) as u16).to_le_bytes());
        entry[66] = *kind;
        entry[67] = 1;
        for at in [68, 72, 76] {
            entry[at..at + 4].copy_from_slice(&FREE_SECTOR.to_le_bytes());
        }
        entry[116..120].copy_from_slice(&start.to_le_bytes());
        entry[120..128].copy_from_slice(&size.to_le_bytes());
        directory.extend(entry);
    }

    let padded = |bytes: &[u8]| {
        let mut bytes = bytes.to_vec();
        bytes.resize(sectors_of(bytes.len(), SECTOR_SIZE) * SECTOR_SIZE, 0);
        bytes
    };
    let mut file = header;
    file.extend(fat.iter().flat_map(|index| index.to_le_bytes()));
    file.extend(padded(&directory));
    file.extend(padded(&mini_fat.iter().flat_map(|index| index.to_le_bytes()).collect::<Vec<u8>>()));
    file.extend(padded(&mini_stream));
    for (_, data) in &regular {
        file.extend(padded(data));
    }
    file
}
