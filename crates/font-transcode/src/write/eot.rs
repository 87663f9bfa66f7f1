//! Embedded OpenType (EOT) serialization.

use crate::{
    font::{Font, NameTable, TableTag},
    ParseError,
};

/// Reads a big-endian integer at the specified offset; returns 0 for out-of-bounds fields
/// (e.g., ones missing in older `OS/2` versions).
fn read_be<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    data.get(offset..offset + N)
        .and_then(|bytes| bytes.try_into().ok())
        .unwrap_or([0; N])
}

fn write_u16_le(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_le_bytes());
}

fn write_u32_le(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_le_bytes());
}

/// Writes a name string, converting it from UTF-16BE to UTF-16LE.
fn write_name(writer: &mut Vec<u8>, utf16_be: &[u8]) {
    // Sizes are `u16`; longer names are truncated at a code unit boundary.
    let len = utf16_be.len().min(usize::from(u16::MAX) & !1);
    write_u16_le(writer, 0); // padding
    // `unwrap_or` never triggers: `len` is bounded above
    write_u16_le(writer, u16::try_from(len).unwrap_or(u16::MAX));
    for unit in utf16_be[..len].chunks_exact(2) {
        writer.extend_from_slice(&[unit[1], unit[0]]);
    }
}

impl Font<'_> {
    /// Wraps this font into the Embedded OpenType (EOT) format, version 2.1.
    ///
    /// Font data is embedded as is, without compression or XOR obfuscation. If the font
    /// has no `OS/2` or `name` table, the corresponding header fields are zeroed.
    ///
    /// # Errors
    ///
    /// Returns an error if the `name` table is malformed.
    pub fn to_eot(&self) -> Result<Vec<u8>, ParseError> {
        const VERSION: u32 = 0x_0002_0001;
        const MAGIC_NUMBER: u16 = 0x_504c;
        const DEFAULT_CHARSET: u8 = 1;
        const HEADER_LEN: usize = 80;

        let names = self
            .table(TableTag::NAME)
            .map(|_| self.required_table(TableTag::NAME).and_then(NameTable::parse))
            .transpose()?;
        let name = |name_id| {
            names
                .as_ref()
                .and_then(|names| names.windows_string(name_id))
                .unwrap_or_default()
        };
        let family_name = name(NameTable::FAMILY);
        let style_name = name(NameTable::SUBFAMILY);
        let version_name = name(NameTable::VERSION);
        let full_name = name(NameTable::FULL_NAME);

        let os2 = self.table(TableTag::OS2).unwrap_or_default();
        let weight = u16::from_be_bytes(read_be(os2, 4));
        let fs_type = u16::from_be_bytes(read_be(os2, 8));
        let fs_selection = u16::from_be_bytes(read_be(os2, 62));

        let names_len = [family_name, style_name, version_name, full_name]
            .iter()
            .map(|name| 4 + name.len())
            .sum::<usize>();
        let eot_len = HEADER_LEN + names_len + 4 /* root string */ + self.bytes.len();

        let mut buffer = Vec::with_capacity(eot_len);
        write_u32_le(
            &mut buffer,
            eot_len.try_into().expect("EOT length overflow"),
        );
        write_u32_le(
            &mut buffer,
            self.bytes.len().try_into().expect("font length overflow"),
        );
        write_u32_le(&mut buffer, VERSION);
        write_u32_le(&mut buffer, 0); // flags
        buffer.extend_from_slice(&read_be::<10>(os2, 32)); // PANOSE
        buffer.push(DEFAULT_CHARSET);
        buffer.push(u8::from(fs_selection & 1 == 1)); // italic
        write_u32_le(&mut buffer, weight.into());
        write_u16_le(&mut buffer, fs_type);
        write_u16_le(&mut buffer, MAGIC_NUMBER);
        for offset in [42, 46, 50, 54, 78, 82] {
            // ulUnicodeRange1..4, ulCodePageRange1..2
            write_u32_le(&mut buffer, u32::from_be_bytes(read_be(os2, offset)));
        }
        let checksum_adjustment = read_be(self.head, Font::HEAD_CHECKSUM_OFFSET);
        write_u32_le(&mut buffer, u32::from_be_bytes(checksum_adjustment));
        buffer.extend_from_slice(&[0; 16]); // reserved
        debug_assert_eq!(buffer.len(), HEADER_LEN);

        write_name(&mut buffer, family_name);
        write_name(&mut buffer, style_name);
        write_name(&mut buffer, version_name);
        write_name(&mut buffer, full_name);
        write_u16_le(&mut buffer, 0); // padding
        write_u16_le(&mut buffer, 0); // root string size

        buffer.extend_from_slice(self.bytes);
        debug_assert_eq!(buffer.len(), eot_len);
        Ok(buffer)
    }
}
