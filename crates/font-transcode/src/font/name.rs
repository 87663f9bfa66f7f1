//! `name` table processing.

use core::ops;

use super::Cursor;
use crate::{errors::ParseErrorKind, ParseError};

#[derive(Debug, Clone)]
struct NameRecord {
    platform_id: u16,
    encoding_id: u16,
    language_id: u16,
    name_id: u16,
    range: ops::Range<usize>,
}

/// Naming table (format 0 or 1; language tag records of format 1 are ignored).
#[derive(Debug, Clone)]
pub(crate) struct NameTable<'a> {
    records: Vec<NameRecord>,
    storage: &'a [u8],
}

impl<'a> NameTable<'a> {
    const WINDOWS_PLATFORM: u16 = 3;
    const UNICODE_BMP_ENCODING: u16 = 1;
    const ENGLISH_US: u16 = 0x0409;

    pub(crate) const FAMILY: u16 = 1;
    pub(crate) const SUBFAMILY: u16 = 2;
    pub(crate) const UNIQUE_ID: u16 = 3;
    pub(crate) const FULL_NAME: u16 = 4;
    pub(crate) const VERSION: u16 = 5;
    pub(crate) const POSTSCRIPT_NAME: u16 = 6;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let table_cursor = cursor;
        cursor.read_u16_checked(|format| {
            if format > 1 {
                return Err(ParseErrorKind::UnexpectedTableFormat { format });
            }
            Ok(())
        })?;
        let count = cursor.read_u16()?;
        let storage_offset = usize::from(cursor.read_u16()?);

        let mut records = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let platform_id = cursor.read_u16()?;
            let encoding_id = cursor.read_u16()?;
            let language_id = cursor.read_u16()?;
            let name_id = cursor.read_u16()?;
            let len = usize::from(cursor.read_u16()?);
            let offset = usize::from(cursor.read_u16()?);
            records.push(NameRecord {
                platform_id,
                encoding_id,
                language_id,
                name_id,
                range: offset..offset + len,
            });
        }

        let storage = table_cursor.range(storage_offset..table_cursor.bytes.len())?;
        for record in &records {
            storage.range(record.range.clone())?;
        }
        Ok(Self {
            records,
            storage: storage.bytes,
        })
    }

    /// Returns the UTF-16BE encoded string with the specified ID for the Windows platform,
    /// preferring the English (US) language.
    pub(crate) fn windows_string(&self, name_id: u16) -> Option<&'a [u8]> {
        let mut candidates = self.records.iter().filter(|record| {
            record.platform_id == Self::WINDOWS_PLATFORM
                && record.encoding_id == Self::UNICODE_BMP_ENCODING
                && record.name_id == name_id
        });
        let first = candidates.clone().next()?;
        let record = candidates
            .find(|record| record.language_id == Self::ENGLISH_US)
            .unwrap_or(first);
        // Indexing is safe: ranges are checked when parsing.
        Some(&self.storage[record.range.clone()])
    }

    /// Serializes a format 0 table with Windows / Unicode BMP / English (US) records.
    /// `names` must be sorted by the name ID.
    pub(crate) fn build(names: &[(u16, &str)]) -> Vec<u8> {
        const RECORD_LEN: usize = 12;

        let mut storage = Vec::<u8>::new();
        let mut records = Vec::with_capacity(names.len());
        for &(name_id, value) in names {
            let offset = storage.len();
            for unit in value.encode_utf16() {
                storage.extend_from_slice(&unit.to_be_bytes());
            }
            records.push((name_id, offset, storage.len() - offset));
        }

        let header_len = 6 + RECORD_LEN * records.len();
        let mut buffer = Vec::with_capacity(header_len + storage.len());
        let write_u16 = |buffer: &mut Vec<u8>, value: usize| {
            // Names are short; saturation never happens in practice.
            let value = u16::try_from(value).unwrap_or(u16::MAX);
            buffer.extend_from_slice(&value.to_be_bytes());
        };
        write_u16(&mut buffer, 0); // format
        write_u16(&mut buffer, records.len());
        write_u16(&mut buffer, header_len);
        for (name_id, offset, len) in records {
            write_u16(&mut buffer, Self::WINDOWS_PLATFORM.into());
            write_u16(&mut buffer, Self::UNICODE_BMP_ENCODING.into());
            write_u16(&mut buffer, Self::ENGLISH_US.into());
            write_u16(&mut buffer, name_id.into());
            write_u16(&mut buffer, len);
            write_u16(&mut buffer, offset);
        }
        buffer.extend_from_slice(&storage);
        buffer
    }
}
