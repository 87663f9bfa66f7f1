//! Tables of a TrueType font compiled from an SVG font.

use super::{write_i16, write_u16, write_u32, FontWriter};
use crate::{
    compile::{BoundingBox, CompiledFont, GlyphWithMetrics},
    font::{CmapTable, NameTable},
    svg::clamp_i16,
    SvgFont, TableTag, TranscodeError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocaFormat {
    Short,
    Long,
}

impl LocaFormat {
    fn write(locations: &[usize], writer: &mut Vec<u8>) -> Self {
        let all_even = locations.iter().all(|&loc| loc % 2 == 0);
        let in_bounds = locations
            .last()
            .is_none_or(|&loc| loc <= usize::from(u16::MAX) * 2);
        if all_even && in_bounds {
            for &loc in locations {
                #[allow(clippy::cast_possible_truncation)]
                // doesn't happen due to the preceding check
                write_u16(writer, (loc / 2) as u16);
            }
            Self::Short
        } else {
            for &loc in locations {
                write_u32(writer, u32::try_from(loc).expect("glyph location overflow"));
            }
            Self::Long
        }
    }
}

/// Writes `hmtx` and returns `numberOfHMetrics`; trailing glyphs with equal advances
/// are written as bare side bearings.
fn write_hmtx(glyphs: &[GlyphWithMetrics], writer: &mut Vec<u8>) -> u16 {
    let mut number_of_h_metrics = glyphs.len();
    while let Some([prev, current]) = glyphs[..number_of_h_metrics].last_chunk::<2>() {
        if prev.advance != current.advance {
            break;
        }
        number_of_h_metrics -= 1;
    }

    for (i, glyph) in glyphs.iter().enumerate() {
        if i < number_of_h_metrics {
            write_u16(writer, glyph.advance);
        }
        write_i16(writer, glyph.lsb);
    }

    // `unwrap_or` never triggers: the glyph count is checked when compiling
    number_of_h_metrics.try_into().unwrap_or(u16::MAX)
}

/// Derives a PostScript name: printable ASCII without delimiters, at most 63 chars.
fn postscript_name(family: &str, subfamily: &str) -> String {
    let is_allowed = |ch: &char| ch.is_ascii_graphic() && !"[](){}<>/%".contains(*ch);
    let family = family.chars().filter(is_allowed);
    let subfamily = subfamily.chars().filter(is_allowed);
    family.chain(['-']).chain(subfamily).take(63).collect()
}

impl SvgFont {
    /// Compiles this font to the TrueType format.
    ///
    /// # Errors
    ///
    /// Returns an error if glyph path data cannot be parsed, or the font has too many glyphs.
    pub fn to_truetype(&self) -> Result<Vec<u8>, TranscodeError> {
        Ok(CompiledFont::new(self)?.to_writer().into_opentype())
    }
}

impl CompiledFont<'_> {
    const VERSION: &'static str = "Version 1.0";
    const MAGIC_NUMBER: u32 = 0x_5f0f_3cf5;

    pub(super) fn to_writer(&self) -> FontWriter {
        let cmap = CmapTable::from_map(&self.char_map);

        let mut writer = FontWriter::default();
        writer.write_table(TableTag::CMAP, |buffer| cmap.write(buffer));
        let number_of_h_metrics =
            writer.write_table(TableTag::HMTX, |buffer| write_hmtx(&self.glyphs, buffer));
        writer.write_table(TableTag::HHEA, |buffer| {
            self.write_hhea(number_of_h_metrics, buffer);
        });
        writer.write_table(TableTag::MAXP, |buffer| self.write_maxp(buffer));
        writer.write_raw_table(TableTag::NAME, &self.name_table());
        writer.write_table(TableTag::OS2, |buffer| self.write_os2(buffer));
        writer.write_table(TableTag::POST, |buffer| self.write_post(buffer));

        let locations = writer.write_table(TableTag::GLYF, |buffer| {
            let mut locations = vec![0];
            let initial_offset = buffer.len();
            for glyph in &self.glyphs {
                buffer.extend_from_slice(&glyph.inner.data);
                locations.push(buffer.len() - initial_offset);
            }
            locations
        });
        let loca_format = writer.write_table(TableTag::LOCA, |buffer| {
            LocaFormat::write(&locations, buffer)
        });
        writer.write_table(TableTag::HEAD, |buffer| {
            self.write_head(loca_format, buffer);
        });
        writer
    }

    fn bbox(&self) -> BoundingBox {
        self.bbox.unwrap_or(BoundingBox {
            x_min: 0,
            y_min: 0,
            x_max: 0,
            y_max: 0,
        })
    }

    /// Returns a value proportional to the em size.
    fn per_mille_of_em(&self, per_mille: i32) -> i16 {
        clamp_i16(i32::from(self.font.units_per_em) * per_mille / 1_000)
    }

    fn write_head(&self, loca_format: LocaFormat, writer: &mut Vec<u8>) {
        const FLAGS: u16 = 0b_1011; // baseline at y=0, lsb at x=0, integer ppem
        const LOWEST_REC_PPEM: u16 = 8;
        const FONT_DIRECTION_HINT: i16 = 2;

        let start = writer.len();
        write_u32(writer, 0x_0001_0000); // version
        write_u32(writer, 0x_0001_0000); // fontRevision
        write_u32(writer, 0); // checkSumAdjustment, patched when the font is serialized
        write_u32(writer, Self::MAGIC_NUMBER);
        write_u16(writer, FLAGS);
        write_u16(writer, self.font.units_per_em);
        writer.extend_from_slice(&[0; 16]); // created, modified

        let bbox = self.bbox();
        write_i16(writer, bbox.x_min);
        write_i16(writer, bbox.y_min);
        write_i16(writer, bbox.x_max);
        write_i16(writer, bbox.y_max);

        let mut mac_style = 0_u16;
        if self.font.weight >= 700 {
            mac_style |= 1;
        }
        if self.font.italic {
            mac_style |= 2;
        }
        write_u16(writer, mac_style);
        write_u16(writer, LOWEST_REC_PPEM);
        write_i16(writer, FONT_DIRECTION_HINT);
        write_i16(
            writer,
            match loca_format {
                LocaFormat::Short => 0,
                LocaFormat::Long => 1,
            },
        );
        write_i16(writer, 0); // glyphDataFormat
        debug_assert_eq!(writer.len() - start, 54);
    }

    fn write_hhea(&self, number_of_h_metrics: u16, writer: &mut Vec<u8>) {
        let advance_width_max = self.glyphs.iter().map(|glyph| glyph.advance).max();
        let non_empty_glyphs = self
            .glyphs
            .iter()
            .filter_map(|glyph| Some((glyph, glyph.inner.bbox?)));
        let min_lsb = non_empty_glyphs.clone().map(|(glyph, _)| glyph.lsb).min();
        let min_rsb = non_empty_glyphs
            .clone()
            .filter_map(|(glyph, _)| glyph.rsb())
            .min();
        let x_max_extent = non_empty_glyphs
            .map(|(glyph, bbox)| i32::from(glyph.lsb) + bbox.width())
            .max();

        write_u32(writer, 0x_0001_0000); // version
        write_i16(writer, self.font.ascent);
        write_i16(writer, self.font.descent);
        write_i16(writer, 0); // lineGap
        write_u16(writer, advance_width_max.unwrap_or(0));
        write_i16(writer, min_lsb.unwrap_or(0));
        write_i16(writer, clamp_i16(min_rsb.unwrap_or(0)));
        write_i16(writer, clamp_i16(x_max_extent.unwrap_or(0)));
        write_i16(writer, 1); // caretSlopeRise
        write_i16(writer, 0); // caretSlopeRun
        write_i16(writer, 0); // caretOffset
        writer.extend_from_slice(&[0; 8]); // reserved
        write_i16(writer, 0); // metricDataFormat
        write_u16(writer, number_of_h_metrics);
    }

    fn write_maxp(&self, writer: &mut Vec<u8>) {
        write_u32(writer, 0x_0001_0000); // version
        // `unwrap_or` never triggers: the glyph count is checked when compiling
        write_u16(writer, self.glyphs.len().try_into().unwrap_or(u16::MAX));
        write_u16(writer, self.max_points);
        write_u16(writer, self.max_contours);
        write_u16(writer, 0); // maxCompositePoints
        write_u16(writer, 0); // maxCompositeContours
        write_u16(writer, 2); // maxZones
        // maxTwilightPoints, maxStorage, maxFunctionDefs, maxInstructionDefs,
        // maxStackElements, maxSizeOfInstructions, maxComponentElements, maxComponentDepth
        writer.extend_from_slice(&[0; 16]);
    }

    fn name_table(&self) -> Vec<u8> {
        let family = self.font.family_name();
        let subfamily = self.font.subfamily_name();
        let full_name = format!("{family} {subfamily}");
        let unique_id = format!("{family}:{subfamily}:{}", Self::VERSION);
        let postscript_name = postscript_name(family, subfamily);
        NameTable::build(&[
            (NameTable::FAMILY, family),
            (NameTable::SUBFAMILY, subfamily),
            (NameTable::UNIQUE_ID, &unique_id),
            (NameTable::FULL_NAME, &full_name),
            (NameTable::VERSION, Self::VERSION),
            (NameTable::POSTSCRIPT_NAME, &postscript_name),
        ])
    }

    fn unicode_ranges(&self) -> u128 {
        const BASIC_LATIN: u32 = 0;
        const NON_PLANE_0: u32 = 57;
        const PRIVATE_USE_AREA: u32 = 60;

        self.char_map.iter().fold(0_u128, |ranges, &(ch, _)| {
            let bit = match u32::from(ch) {
                0..=0x7f => BASIC_LATIN,
                0xe000..=0xf8ff => PRIVATE_USE_AREA,
                0x1_0000.. => NON_PLANE_0,
                _ => return ranges,
            };
            ranges | (1 << bit)
        })
    }

    #[allow(clippy::cast_possible_truncation)] // intentional
    fn write_os2(&self, writer: &mut Vec<u8>) {
        const VERSION: u16 = 4;
        const WIDTH_CLASS_NORMAL: u16 = 5;
        const ITALIC: u16 = 0x01;
        const BOLD: u16 = 0x20;
        const REGULAR: u16 = 0x40;
        const LATIN_1_CODE_PAGE: u32 = 1;

        let start = writer.len();
        let font = self.font;
        let non_zero_advances = self
            .glyphs
            .iter()
            .map(|glyph| u32::from(glyph.advance))
            .filter(|&advance| advance > 0);
        let (advance_sum, advance_count) = non_zero_advances
            .fold((0_u32, 0_u32), |(sum, count), advance| {
                (sum.saturating_add(advance), count + 1)
            });
        let avg_char_width = advance_sum.checked_div(advance_count).unwrap_or(0);

        write_u16(writer, VERSION);
        write_i16(
            writer,
            clamp_i16(i32::try_from(avg_char_width).unwrap_or(i32::MAX)),
        );
        write_u16(writer, font.weight.clamp(1, 1_000));
        write_u16(writer, WIDTH_CLASS_NORMAL);
        write_u16(writer, 0); // fsType: installable embedding

        // Subscript and superscript metrics
        let script_x_size = self.per_mille_of_em(650);
        let script_y_size = self.per_mille_of_em(600);
        write_i16(writer, script_x_size);
        write_i16(writer, script_y_size);
        write_i16(writer, 0);
        write_i16(writer, self.per_mille_of_em(75));
        write_i16(writer, script_x_size);
        write_i16(writer, script_y_size);
        write_i16(writer, 0);
        write_i16(writer, self.per_mille_of_em(350));

        write_i16(writer, self.underline_thickness()); // yStrikeoutSize
        write_i16(writer, self.per_mille_of_em(250)); // yStrikeoutPosition
        write_i16(writer, 0); // sFamilyClass
        writer.extend_from_slice(&[0; 10]); // panose

        let ranges = self.unicode_ranges();
        for i in 0..4 {
            write_u32(writer, (ranges >> (32 * i)) as u32);
        }
        writer.extend_from_slice(b"    "); // achVendID

        let mut selection = 0;
        if font.italic {
            selection |= ITALIC;
        }
        if font.weight >= 700 {
            selection |= BOLD;
        }
        if selection == 0 {
            selection = REGULAR;
        }
        write_u16(writer, selection);

        let first_char = self.char_map.first().map_or(0, |&(ch, _)| u32::from(ch));
        let last_char = self.char_map.last().map_or(0, |&(ch, _)| u32::from(ch));
        write_u16(writer, first_char.min(0xffff) as u16);
        write_u16(writer, last_char.min(0xffff) as u16);

        write_i16(writer, font.ascent); // sTypoAscender
        write_i16(writer, font.descent); // sTypoDescender
        write_i16(writer, 0); // sTypoLineGap
        let bbox = self.bbox();
        let win_ascent = font.ascent.max(bbox.y_max).max(0);
        let win_descent = i32::from(font.descent).min(bbox.y_min.into()).min(0);
        write_u16(writer, win_ascent.unsigned_abs());
        write_u16(writer, clamp_i16(-win_descent).unsigned_abs());

        write_u32(writer, LATIN_1_CODE_PAGE);
        write_u32(writer, 0);
        write_i16(writer, 0); // sxHeight
        write_i16(writer, 0); // sCapHeight
        write_u16(writer, 0); // usDefaultChar
        write_u16(writer, u16::from(b' ')); // usBreakChar
        write_u16(writer, 0); // usMaxContext
        debug_assert_eq!(writer.len() - start, 96);
    }

    fn underline_thickness(&self) -> i16 {
        self.font
            .underline_thickness
            .unwrap_or_else(|| self.per_mille_of_em(50))
    }

    fn write_post(&self, writer: &mut Vec<u8>) {
        let underline_position = self
            .font
            .underline_position
            .unwrap_or_else(|| self.per_mille_of_em(-100));

        write_u32(writer, 0x_0003_0000); // version; no glyph names
        write_u32(writer, 0); // italicAngle
        write_i16(writer, underline_position);
        write_i16(writer, self.underline_thickness());
        write_u32(writer, 0); // isFixedPitch
        writer.extend_from_slice(&[0; 16]); // memory usage hints
    }
}
