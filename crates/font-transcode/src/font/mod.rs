//! OpenType parsing logic.

use core::{fmt, ops};

pub(crate) use self::cmap::{
    CmapTable, SegmentDeltas, SegmentWithDelta, SegmentedCoverage, SequentialMapGroup,
};
use crate::errors::{MapError, ParseError, ParseErrorKind};

mod cmap;
mod name;

pub(crate) use self::name::NameTable;

/// Four-byte tag of an OpenType table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableTag(pub(crate) [u8; 4]);

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TableTag({self})")
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            let ch = if byte.is_ascii_graphic() || byte == b' ' {
                char::from(byte)
            } else {
                '?'
            };
            fmt::Write::write_char(formatter, ch)?;
        }
        Ok(())
    }
}

impl TableTag {
    /// Character to glyph mapping.
    pub const CMAP: Self = Self(*b"cmap");
    /// Font header.
    pub const HEAD: Self = Self(*b"head");
    /// Horizontal header.
    pub const HHEA: Self = Self(*b"hhea");
    /// Horizontal metrics.
    pub const HMTX: Self = Self(*b"hmtx");
    /// Maximum profile.
    pub const MAXP: Self = Self(*b"maxp");
    /// Naming table.
    pub const NAME: Self = Self(*b"name");
    /// OS/2 and Windows-specific metrics.
    pub const OS2: Self = Self(*b"OS/2");
    /// PostScript information.
    pub const POST: Self = Self(*b"post");
    /// Control value table.
    pub const CVT: Self = Self(*b"cvt ");
    /// Font program.
    pub const FPGM: Self = Self(*b"fpgm");
    /// Glyph data.
    pub const GLYF: Self = Self(*b"glyf");
    /// Index to location.
    pub const LOCA: Self = Self(*b"loca");
    /// Control value program.
    pub const PREP: Self = Self(*b"prep");

    /// Returns raw bytes of this tag.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

/// Read-only view into font data that tracks its offset for error reporting.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    pub(crate) bytes: &'a [u8],
    offset: usize,
    table: Option<TableTag>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            table: None,
        }
    }

    fn for_table(bytes: &'a [u8], table: TableTag) -> Self {
        Self {
            bytes,
            offset: 0,
            table: Some(table),
        }
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.offset,
            table: self.table,
        }
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), ParseError> {
        if self.bytes.len() < n {
            Err(self.err(ParseErrorKind::UnexpectedEof))
        } else {
            self.bytes = &self.bytes[n..];
            self.offset += n;
            Ok(())
        }
    }

    pub(crate) fn read_byte_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let Some((head, tail)) = self.bytes.split_first_chunk::<N>() else {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        };
        self.bytes = tail;
        self.offset += N;
        Ok(*head)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        self.read_byte_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_byte_array().map(u32::from_be_bytes)
    }

    pub(crate) fn read_u16_checked<T>(
        &mut self,
        check: impl FnOnce(u16) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u16()?;
        check(value).map_err(|kind| start.err(kind))
    }

    pub(crate) fn read_u32_checked<T>(
        &mut self,
        check: impl FnOnce(u32) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u32()?;
        check(value).map_err(|kind| start.err(kind))
    }

    /// Splits off the first `len` bytes and returns them; `self` is advanced past them.
    pub(crate) fn split_at(&mut self, len: usize) -> Result<Self, ParseError> {
        let head = self.range(0..len)?;
        self.skip(len)?;
        Ok(head)
    }

    pub(crate) fn range(&self, range: ops::Range<usize>) -> Result<Self, ParseError> {
        let bytes = self.bytes.get(range.clone()).ok_or_else(|| {
            self.err(ParseErrorKind::RangeOutOfBounds {
                range: range.clone(),
                len: self.bytes.len(),
            })
        })?;
        Ok(Self {
            bytes,
            offset: self.offset + range.start,
            table: self.table,
        })
    }
}

/// Table record from the font directory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FontTable<'a> {
    pub(crate) tag: TableTag,
    pub(crate) offset: usize,
    pub(crate) data: &'a [u8],
}

/// Parsed OpenType font with TrueType outlines.
#[derive(Debug)]
pub struct Font<'a> {
    pub(crate) bytes: &'a [u8],
    /// Tables in the order of their placement in the font data.
    pub(crate) tables: Vec<FontTable<'a>>,
    pub(crate) head: &'a [u8],
    cmap: CmapTable<'a>,
    glyph_count: u16,
}

impl<'a> Font<'a> {
    pub(crate) const SFNT_VERSION: u32 = 0x_0001_0000;
    /// Magic constant from which the file checksum is subtracted to get `checkSumAdjustment`.
    pub(crate) const SFNT_CHECKSUM: u32 = 0x_b1b0_afba;
    pub(crate) const HEAD_CHECKSUM_OFFSET: usize = 8;
    const HEAD_VERSION: u32 = 0x_0001_0000;

    /// Parses a font from the provided bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the font is malformed, is not a TrueType-flavored sfnt, has a table
    /// with a mismatched checksum, or misses one of `head`, `maxp` or `cmap` tables.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = Cursor::new(bytes);
        cursor.read_u32_checked(|version| {
            if version != Self::SFNT_VERSION {
                return Err(ParseErrorKind::UnexpectedFontVersion);
            }
            Ok(())
        })?;
        let table_count = cursor.read_u16()?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let mut tables = Vec::with_capacity(usize::from(table_count));
        for _ in 0..table_count {
            tables.push(Self::parse_table_record(&mut cursor, bytes)?);
        }
        tables.sort_unstable_by_key(|table| table.offset);

        let find_table = |tag: TableTag| {
            tables
                .iter()
                .find(|table| table.tag == tag)
                .map(|table| table.data)
                .ok_or_else(|| ParseError::missing_table(tag))
        };

        let head = find_table(TableTag::HEAD)?;
        Cursor::for_table(head, TableTag::HEAD).read_u32_checked(|version| {
            if version != Self::HEAD_VERSION {
                return Err(ParseErrorKind::UnexpectedTableVersion { version });
            }
            Ok(())
        })?;
        if head.len() < 54 {
            return Err(
                Cursor::for_table(head, TableTag::HEAD).err(ParseErrorKind::UnexpectedTableLen {
                    expected: 54,
                    actual: head.len(),
                }),
            );
        }

        let glyph_count = Self::parse_glyph_count(find_table(TableTag::MAXP)?)?;
        let cmap = CmapTable::parse(Cursor::for_table(
            find_table(TableTag::CMAP)?,
            TableTag::CMAP,
        ))?;

        Ok(Self {
            bytes,
            tables,
            head,
            cmap,
            glyph_count,
        })
    }

    fn parse_table_record(
        cursor: &mut Cursor<'_>,
        font_bytes: &'a [u8],
    ) -> Result<FontTable<'a>, ParseError> {
        let tag = TableTag(cursor.read_byte_array::<4>()?);
        let checksum = cursor.read_u32()?;
        let offset = cursor.read_u32()? as usize;
        let len = cursor.read_u32()? as usize;

        let range = offset..offset.saturating_add(len);
        let data = font_bytes.get(range.clone()).ok_or_else(|| {
            cursor.err(ParseErrorKind::RangeOutOfBounds {
                range,
                len: font_bytes.len(),
            })
        })?;

        // The `head` checksum is computed with zeroed `checkSumAdjustment`, so it's checked separately.
        if tag != TableTag::HEAD {
            let actual = Self::checksum(data);
            if actual != checksum {
                return Err(Cursor::for_table(data, tag).err(ParseErrorKind::Checksum {
                    expected: checksum,
                    actual,
                }));
            }
        }
        Ok(FontTable { tag, offset, data })
    }

    fn parse_glyph_count(maxp: &[u8]) -> Result<u16, ParseError> {
        let mut cursor = Cursor::for_table(maxp, TableTag::MAXP);
        cursor.read_u32_checked(|version| {
            if version != 0x_0000_5000 && version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion { version });
            }
            Ok(())
        })?;
        cursor.read_u16()
    }

    /// Computes the OpenType checksum of the provided data, padding it with zeros to a 4-byte boundary.
    pub(crate) fn checksum(data: &[u8]) -> u32 {
        let chunks = data.chunks_exact(4);
        let remainder = chunks.remainder();
        let mut sum = chunks.fold(0_u32, |acc, chunk| {
            // `unwrap()` is safe: chunks have exactly 4 bytes
            acc.wrapping_add(u32::from_be_bytes(chunk.try_into().unwrap()))
        });
        if !remainder.is_empty() {
            let mut last = [0_u8; 4];
            last[..remainder.len()].copy_from_slice(remainder);
            sum = sum.wrapping_add(u32::from_be_bytes(last));
        }
        sum
    }

    /// Returns the number of glyphs in this font as recorded in the `maxp` table.
    pub fn glyph_count(&self) -> u16 {
        self.glyph_count
    }

    /// Returns raw data of the table with the specified tag, if the font contains such a table.
    pub fn table(&self, tag: TableTag) -> Option<&'a [u8]> {
        self.tables
            .iter()
            .find(|table| table.tag == tag)
            .map(|table| table.data)
    }

    /// Returns tags of all tables in this font, in the order of their placement in the font data.
    pub fn table_tags(&self) -> impl Iterator<Item = TableTag> + '_ {
        self.tables.iter().map(|table| table.tag)
    }

    /// Maps a char to a glyph index. Returns 0 (the missing glyph) for unmapped chars.
    ///
    /// # Errors
    ///
    /// Returns an error if the `cmap` table cannot represent the char or is malformed.
    pub fn map_char(&self, ch: char) -> Result<u16, MapError> {
        self.cmap.map_char(ch)
    }

    pub(crate) fn required_table(&self, tag: TableTag) -> Result<Cursor<'a>, ParseError> {
        let data = self.table(tag).ok_or_else(|| ParseError::missing_table(tag))?;
        Ok(Cursor::for_table(data, tag))
    }
}
