//! Logic for serializing fonts in OpenType, WOFF and WOFF2 formats.

use core::iter;
use std::io;

use crate::{
    font::{CmapTable, SegmentDeltas, SegmentedCoverage},
    Font, TableTag, TranscodeError,
};

mod brotli;
mod eot;
mod tables;
mod woff;

fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_i16(writer: &mut Vec<u8>, value: i16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn uint_base128_len(val: u32) -> usize {
    if val == 0 {
        1
    } else {
        val.ilog2() as usize / 7 + 1
    }
}

#[allow(clippy::cast_possible_truncation)] // intentional
fn write_uint_base128(buffer: &mut Vec<u8>, val: u32) {
    if val >= 1 << 28 {
        buffer.push(0x80 | (val >> 28) as u8);
    }
    if val >= 1 << 21 {
        buffer.push(0x80 | (val >> 21) as u8);
    }
    if val >= 1 << 14 {
        buffer.push(0x80 | (val >> 14) as u8);
    }
    if val >= 1 << 7 {
        buffer.push(0x80 | (val >> 7) as u8);
    }
    buffer.push((val & 127) as u8);
}

impl CmapTable<'_> {
    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, 0); // table version
        write_u16(writer, 1); // num_tables

        write_u16(writer, CmapTable::UNICODE_PLATFORM);
        let encoding_id = match self {
            Self::Deltas(_) => 3,
            Self::Coverage(_) => 4,
        };
        write_u16(writer, encoding_id);
        write_u32(writer, 12); // subtable_offset

        match self {
            Self::Deltas(deltas) => deltas.write(writer),
            Self::Coverage(coverage) => coverage.write(writer),
        }
    }
}

impl SegmentDeltas<'_> {
    fn subtable_len(&self) -> usize {
        16 + 8 * self.segments.len() + self.glyph_id_array.len()
    }

    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, 4); // subtable format
        write_u16(
            writer,
            self.subtable_len()
                .try_into()
                .expect("subtable_len overflow"),
        );
        write_u16(writer, 0); // language

        let segment_count = u16::try_from(self.segments.len()).expect("segments.len() overflow");
        write_u16(writer, 2 * segment_count);
        // `segment_count` is positive: there's always the terminating segment
        #[allow(clippy::cast_possible_truncation)] // ilog2 of u16 is < 16
        let entry_selector = segment_count.ilog2() as u16;
        let search_range = 1 << (entry_selector + 1);
        write_u16(writer, search_range);
        write_u16(writer, entry_selector);
        let range_shift = 2 * segment_count - search_range;
        write_u16(writer, range_shift);

        for segment in &self.segments {
            write_u16(writer, segment.end_code);
        }
        write_u16(writer, 0); // reserved padding
        for segment in &self.segments {
            write_u16(writer, segment.start_code);
        }
        for segment in &self.segments {
            write_u16(writer, segment.id_delta);
        }
        for segment in &self.segments {
            write_u16(writer, segment.id_range_offset);
        }
        writer.extend_from_slice(self.glyph_id_array);
    }
}

impl SegmentedCoverage {
    fn subtable_len(&self) -> usize {
        16 + 12 * self.groups.len()
    }

    fn write(&self, writer: &mut Vec<u8>) {
        write_u16(writer, 12); // subtable format
        write_u16(writer, 0); // reserved

        write_u32(
            writer,
            self.subtable_len()
                .try_into()
                .expect("subtable_len overflow"),
        );
        write_u32(writer, 0); // language
        write_u32(
            writer,
            self.groups.len().try_into().expect("groups.len() overflow"),
        );
        for group in &self.groups {
            write_u32(writer, group.start_char_code);
            write_u32(writer, group.end_char_code);
            write_u32(writer, group.start_glyph_id);
        }
    }
}

impl Font<'_> {
    /// Re-encodes this font in the WOFF 1.0 format.
    ///
    /// # Errors
    ///
    /// Returns an error if table compression fails.
    pub fn to_woff(&self) -> Result<Vec<u8>, TranscodeError> {
        FontWriter::from_font(self)
            .into_woff()
            .map_err(TranscodeError::Compress)
    }

    /// Re-encodes this font in the WOFF2 format. `glyf` and `loca` tables are not transformed.
    ///
    /// # Errors
    ///
    /// Returns an error if table compression fails.
    pub fn to_woff2(&self) -> Result<Vec<u8>, TranscodeError> {
        FontWriter::from_font(self)
            .into_woff2()
            .map_err(TranscodeError::Compress)
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(test, derive(PartialEq))]
struct TableRecord {
    tag: TableTag,
    checksum: u32,
    /// Offset is initially recorded relative to the table data start. It's always 4-byte aligned.
    offset: u32,
    length: u32,
}

impl TableRecord {
    const BYTE_LEN: usize = 16;

    /// Tags with a predefined index in the WOFF2 table directory.
    const WOFF2_KNOWN_TAGS: [&'static [u8; 4]; 63] = [
        b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
        b"glyf", b"loca", b"prep", b"CFF ", b"VORG", b"EBDT", b"EBLC", b"gasp", b"hdmx", b"kern",
        b"LTSH", b"PCLT", b"VDMX", b"vhea", b"vmtx", b"BASE", b"GDEF", b"GPOS", b"GSUB", b"EBSC",
        b"JSTF", b"MATH", b"CBDT", b"CBLC", b"COLR", b"CPAL", b"SVG ", b"sbix", b"acnt", b"avar",
        b"bdat", b"bloc", b"bsln", b"cvar", b"fdsc", b"feat", b"fmtx", b"fvar", b"gvar", b"hsty",
        b"just", b"lcar", b"mort", b"morx", b"opbd", b"prop", b"trak", b"Zapf", b"Silf", b"Glat",
        b"Gloc", b"Feat", b"Sill",
    ];
    const WOFF2_ARBITRARY_TAG: u8 = 63;

    fn write_opentype(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.tag.0);
        write_u32(writer, self.checksum);
        write_u32(writer, self.offset);
        write_u32(writer, self.length);
    }

    fn self_checksum(&self) -> u32 {
        u32::from_be_bytes(self.tag.0)
            .wrapping_add(self.checksum)
            .wrapping_add(self.offset)
            .wrapping_add(self.length)
    }

    fn woff2_tag_index(&self) -> Option<u8> {
        let idx = Self::WOFF2_KNOWN_TAGS
            .iter()
            .position(|&tag| *tag == self.tag.0)?;
        // `unwrap_or` never triggers: there are 63 known tags
        Some(u8::try_from(idx).unwrap_or(Self::WOFF2_ARBITRARY_TAG))
    }

    fn woff2_len(&self) -> usize {
        let tag_len = if self.woff2_tag_index().is_some() { 0 } else { 4 };
        1 /* flags */ + tag_len + uint_base128_len(self.length)
    }

    fn write_woff2(&self, buffer: &mut Vec<u8>) {
        const NULL_TRANSFORM: u8 = 0b_1100_0000;

        if let Some(idx) = self.woff2_tag_index() {
            let flags = match self.tag {
                TableTag::GLYF | TableTag::LOCA => idx | NULL_TRANSFORM,
                _ => idx,
            };
            buffer.push(flags);
        } else {
            buffer.push(Self::WOFF2_ARBITRARY_TAG);
            buffer.extend_from_slice(&self.tag.0);
        }
        write_uint_base128(buffer, self.length);
    }
}

#[derive(Debug, Clone, Default)]
struct FontWriter {
    tables: Vec<TableRecord>,
    /// Contains *aligned* table data
    table_data: Vec<u8>,
}

impl FontWriter {
    const SFNT_HEADER_LEN: usize = 12;
    const WOFF2_HEADER_LEN: usize = 48;

    /// Copies tables of an existing font in the order of their placement, moving `loca`
    /// directly after `glyf` as WOFF2 requires.
    fn from_font(font: &Font<'_>) -> Self {
        let mut writer = Self::default();
        let loca = font.table(TableTag::LOCA);
        let has_glyf = font.table(TableTag::GLYF).is_some();

        for table in &font.tables {
            match table.tag {
                TableTag::LOCA if has_glyf => { /* written together with `glyf` */ }
                TableTag::HEAD => {
                    writer.write_table(TableTag::HEAD, |buffer| {
                        let head = table.data;
                        buffer.extend_from_slice(&head[..Font::HEAD_CHECKSUM_OFFSET]);
                        write_u32(buffer, 0); // adjusted later
                        buffer.extend_from_slice(&head[Font::HEAD_CHECKSUM_OFFSET + 4..]);
                    });
                }
                tag => writer.write_raw_table(tag, table.data),
            }

            if table.tag == TableTag::GLYF {
                if let Some(loca) = loca {
                    writer.write_raw_table(TableTag::LOCA, loca);
                }
            }
        }
        writer
    }

    fn write_table<T>(&mut self, tag: TableTag, with: impl FnOnce(&mut Vec<u8>) -> T) -> T {
        let offset = self.table_data.len();
        debug_assert_eq!(offset % 4, 0, "unaligned offset: {offset}");

        let output = with(&mut self.table_data);
        let length = self.table_data.len() - offset;
        // Pad the table heap to a 4-byte boundary.
        if length % 4 > 0 {
            let zero_padding = 4 - length % 4;
            self.table_data.extend(iter::repeat_n(0_u8, zero_padding));
        }

        let checksum = Font::checksum(&self.table_data[offset..]);
        self.tables.push(TableRecord {
            tag,
            checksum,
            offset: u32::try_from(offset).expect("table offset overflow"),
            length: u32::try_from(length).expect("table length overflow"),
        });
        output
    }

    fn write_raw_table(&mut self, tag: TableTag, content: &[u8]) {
        self.write_table(tag, |buffer| buffer.extend_from_slice(content));
    }

    fn write_sfnt_header(&self) -> Vec<u8> {
        let mut buffer = vec![];
        write_u32(&mut buffer, Font::SFNT_VERSION);

        let table_count = u16::try_from(self.tables.len()).expect("too many tables");
        write_u16(&mut buffer, table_count);
        // `table_count` is positive: `head` is always written
        #[allow(clippy::cast_possible_truncation)] // ilog2 of u16 is < 16
        let entry_selector = table_count.ilog2() as u16;
        let search_range = 1 << (4 + entry_selector);
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        let range_shift = 16 * table_count - search_range;
        write_u16(&mut buffer, range_shift);

        debug_assert_eq!(buffer.len(), Self::SFNT_HEADER_LEN);
        buffer
    }

    /// Returns the starting offset of table data.
    fn data_offset(&self) -> usize {
        Self::SFNT_HEADER_LEN + self.tables.len() * TableRecord::BYTE_LEN
    }

    fn into_opentype(mut self) -> Vec<u8> {
        let mut buffer = self.write_sfnt_header();
        self.adjust_data(Font::checksum(&buffer));

        self.tables.sort_unstable_by_key(|record| record.tag.0);
        for record in &self.tables {
            record.write_opentype(&mut buffer);
        }
        buffer.extend(self.table_data);
        buffer
    }

    fn adjust_data(&mut self, sfnt_header_checksum: u32) {
        let data_offset = self.data_offset();
        let data_offset_u32 = u32::try_from(data_offset).expect("data_offset overflow");

        let mut file_checksum = sfnt_header_checksum;
        for record in &mut self.tables {
            record.offset += data_offset_u32;
            file_checksum = file_checksum
                .wrapping_add(record.self_checksum())
                .wrapping_add(record.checksum);
        }
        self.patch_head_table(file_checksum, data_offset);
    }

    fn patch_head_table(&mut self, file_checksum: u32, data_offset: usize) {
        let checksum_adjustment = Font::SFNT_CHECKSUM.wrapping_sub(file_checksum);
        let Some(head_table) = self
            .tables
            .iter()
            .find(|record| record.tag == TableTag::HEAD)
        else {
            return;
        };

        // At this point, the table offset already includes the heap offset, so we need to subtract it.
        let offset = head_table.offset as usize + Font::HEAD_CHECKSUM_OFFSET - data_offset;
        self.table_data[offset..offset + 4].copy_from_slice(&checksum_adjustment.to_be_bytes());
    }

    /// Returns data of the table described by `record`, after [`Self::adjust_data()`] was called.
    fn adjusted_table_data(&self, record: &TableRecord) -> &[u8] {
        let start = record.offset as usize - self.data_offset();
        &self.table_data[start..start + record.length as usize]
    }

    fn into_woff2(mut self) -> io::Result<Vec<u8>> {
        const WOFF2_SIGNATURE: u32 = 0x_774f_4632;

        self.adjust_data(Font::checksum(&self.write_sfnt_header()));

        let compressed_data = self.compress_data()?;
        let tables_len = self
            .tables
            .iter()
            .map(TableRecord::woff2_len)
            .sum::<usize>();
        let mut file_len = Self::WOFF2_HEADER_LEN + tables_len + compressed_data.len();
        if file_len % 4 != 0 {
            file_len += 4 - file_len % 4;
        }

        let mut buffer = vec![];
        write_u32(&mut buffer, WOFF2_SIGNATURE);
        write_u32(&mut buffer, Font::SFNT_VERSION);
        write_u32(
            &mut buffer,
            file_len.try_into().expect("file length overflow"),
        );
        write_u16(
            &mut buffer,
            self.tables.len().try_into().expect("too many tables"),
        );
        write_u16(&mut buffer, 0); // reserved

        let decompressed_len = self.data_offset() + self.table_data.len();
        write_u32(
            &mut buffer,
            decompressed_len.try_into().expect("font length overflow"),
        );
        // `unwrap_or` never triggers: `file_len` fits into u32
        write_u32(
            &mut buffer,
            compressed_data.len().try_into().unwrap_or(u32::MAX),
        );
        write_u32(&mut buffer, 0); // WOFF version
        write_u32(&mut buffer, 0); // metadata offset
        write_u32(&mut buffer, 0); // metadata length
        write_u32(&mut buffer, 0); // original metadata length
        write_u32(&mut buffer, 0); // private block offset
        write_u32(&mut buffer, 0); // private block length
        debug_assert_eq!(buffer.len(), Self::WOFF2_HEADER_LEN);

        for record in &self.tables {
            record.write_woff2(&mut buffer);
        }
        debug_assert_eq!(buffer.len(), Self::WOFF2_HEADER_LEN + tables_len);
        buffer.extend(compressed_data);

        // Pad `buffer` to be 4-byte aligned. This is required even though we don't have metadata or private blocks.
        if buffer.len() % 4 != 0 {
            let padding = 4 - buffer.len() % 4;
            buffer.extend(iter::repeat_n(0, padding));
        }
        debug_assert_eq!(file_len, buffer.len());
        Ok(buffer)
    }
}
