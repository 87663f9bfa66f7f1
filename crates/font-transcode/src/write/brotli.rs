//! Brotli compression of the WOFF2 table stream.

use std::io;

use super::FontWriter;

impl FontWriter {
    /// Concatenates table data in the order of table records, dropping the alignment padding.
    /// Works both before and after [`Self::adjust_data()`] since only relative offsets are used.
    fn table_stream(&self) -> Vec<u8> {
        let base_offset = self.tables.first().map_or(0, |record| record.offset as usize);
        let mut stream = Vec::with_capacity(self.table_data.len());
        for record in &self.tables {
            let start = record.offset as usize - base_offset;
            stream.extend_from_slice(&self.table_data[start..start + record.length as usize]);
        }
        stream
    }

    /// Compresses the table data stream.
    pub(super) fn compress_data(&self) -> io::Result<Vec<u8>> {
        let stream = self.table_stream();
        let params = brotli::enc::BrotliEncoderParams::default();
        let mut compressed = Vec::with_capacity(stream.len() / 2);
        brotli::BrotliCompress(&mut stream.as_slice(), &mut compressed, &params)?;
        Ok(compressed)
    }
}
