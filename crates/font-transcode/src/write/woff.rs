//! WOFF 1.0 serialization.

use std::{
    borrow::Cow,
    io::{self, Write as _},
    iter,
};

use flate2::{write::ZlibEncoder, Compression};

use super::{write_u16, write_u32, FontWriter};
use crate::Font;

impl FontWriter {
    const WOFF_HEADER_LEN: usize = 44;
    const WOFF_TABLE_RECORD_LEN: usize = 20;

    fn compress_table(data: &[u8]) -> io::Result<Cow<'_, [u8]>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len()), Compression::best());
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;
        // Tables are stored uncompressed if compression doesn't help.
        Ok(if compressed.len() < data.len() {
            Cow::Owned(compressed)
        } else {
            Cow::Borrowed(data)
        })
    }

    pub(super) fn into_woff(mut self) -> io::Result<Vec<u8>> {
        const WOFF_SIGNATURE: u32 = 0x_774f_4646;

        self.adjust_data(Font::checksum(&self.write_sfnt_header()));
        let total_sfnt_size = self.data_offset() + self.table_data.len();
        self.tables.sort_unstable_by_key(|record| record.tag.0);

        let compressed_tables = self
            .tables
            .iter()
            .map(|record| Self::compress_table(self.adjusted_table_data(record)))
            .collect::<io::Result<Vec<_>>>()?;

        let mut directory = Vec::with_capacity(Self::WOFF_TABLE_RECORD_LEN * self.tables.len());
        let mut data = vec![];
        let data_offset = Self::WOFF_HEADER_LEN + Self::WOFF_TABLE_RECORD_LEN * self.tables.len();
        for (record, compressed) in self.tables.iter().zip(&compressed_tables) {
            let offset = data_offset + data.len();
            directory.extend_from_slice(&record.tag.0);
            write_u32(
                &mut directory,
                offset.try_into().expect("table offset overflow"),
            );
            write_u32(
                &mut directory,
                compressed.len().try_into().expect("table length overflow"),
            );
            write_u32(&mut directory, record.length);
            write_u32(&mut directory, record.checksum);

            data.extend_from_slice(compressed);
            if data.len() % 4 != 0 {
                let padding = 4 - data.len() % 4;
                data.extend(iter::repeat_n(0, padding));
            }
        }

        let file_len = data_offset + data.len();
        let mut buffer = Vec::with_capacity(file_len);
        write_u32(&mut buffer, WOFF_SIGNATURE);
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
        write_u32(
            &mut buffer,
            total_sfnt_size.try_into().expect("font length overflow"),
        );
        write_u16(&mut buffer, 1); // major version
        write_u16(&mut buffer, 0); // minor version
        write_u32(&mut buffer, 0); // metadata offset
        write_u32(&mut buffer, 0); // metadata length
        write_u32(&mut buffer, 0); // original metadata length
        write_u32(&mut buffer, 0); // private block offset
        write_u32(&mut buffer, 0); // private block length
        debug_assert_eq!(buffer.len(), Self::WOFF_HEADER_LEN);

        buffer.extend(directory);
        buffer.extend(data);
        debug_assert_eq!(buffer.len(), file_len);
        Ok(buffer)
    }
}
