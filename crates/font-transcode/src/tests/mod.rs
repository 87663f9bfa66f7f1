use std::{
    borrow::Cow, collections::BTreeMap, env, fmt, io::Write, process::Command, sync::OnceLock,
};

use allsorts::{
    binary::read::ReadScope, font::MatchingPresentation, font_data::FontData,
    tables::FontTableProvider,
};
use test_casing::{test_casing, Product};

use crate::{
    svg_to_ttf, ttf_to_eot, ttf_to_woff, ttf_to_woff2, Font, ParseErrorKind, SvgError, SvgFont,
    TableTag, TranscodeError,
};

#[derive(Clone, Copy)]
pub(crate) struct TestFont {
    pub(crate) name: &'static str,
    pub(crate) svg: &'static str,
}

impl fmt::Debug for TestFont {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.name, formatter)
    }
}

impl TestFont {
    /// Returns the expected char to glyph ID mapping.
    fn char_map(self) -> BTreeMap<char, u16> {
        let font = SvgFont::parse(self.svg).unwrap();
        let mut map = BTreeMap::new();
        for (i, glyph) in font.glyphs().enumerate() {
            if let Some(ch) = glyph.mapped_char() {
                let glyph_id = u16::try_from(i + 1).unwrap();
                map.entry(ch).or_insert(glyph_id);
            }
        }
        map
    }
}

const SOLID_FONT: TestFont = TestFont {
    name: "solid",
    svg: include_str!("../../fixtures/icons-solid.svg"),
};
const REGULAR_FONT: TestFont = TestFont {
    name: "regular",
    svg: include_str!("../../fixtures/icons-regular.svg"),
};
const ASTRAL_FONT: TestFont = TestFont {
    name: "astral",
    svg: include_str!("../../fixtures/icons-astral.svg"),
};

pub(crate) const FONTS: [TestFont; 3] = [SOLID_FONT, REGULAR_FONT, ASTRAL_FONT];

#[derive(Debug)]
struct OpenTypeSanitizer {
    path: Option<String>,
}

impl Default for OpenTypeSanitizer {
    fn default() -> Self {
        let Ok(path) = env::var("OTS_SANITIZER") else {
            return Self { path: None };
        };
        let output = Command::new(&path)
            .arg("--version")
            .output()
            .unwrap_or_else(|err| {
                panic!("failed getting version for ots-sanitize at {path}: {err}");
            });
        assert!(
            output.status.success(),
            "failed getting version for ots-sanitize at {path}: non-zero exit code"
        );
        let version = String::from_utf8(output.stdout).unwrap_or_else(|err| {
            panic!("failed getting version for ots-sanitize at {path}: {err}");
        });
        println!("ots-sanitize version: {version}");
        Self { path: Some(path) }
    }
}

impl OpenTypeSanitizer {
    fn get() -> &'static Self {
        static SANITIZER: OnceLock<OpenTypeSanitizer> = OnceLock::new();
        SANITIZER.get_or_init(Self::default)
    }

    fn validate(&self, content: &[u8]) {
        let Some(path) = &self.path else {
            println!("OTS_SANITIZER env var is missing; skipping checks");
            return;
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.as_file_mut().write_all(content).unwrap();
        file.as_file_mut().flush().unwrap();
        let file_path = file.into_temp_path();

        let output = Command::new(path)
            .arg(&file_path)
            .output()
            .expect("failed running ots-sanitize");
        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("ots-sanitize failed:\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Woff,
    Woff2,
}

impl Format {
    const ALL: [Self; 2] = [Self::Woff, Self::Woff2];

    fn encode(self, ttf: &[u8]) -> Vec<u8> {
        match self {
            Self::Woff => ttf_to_woff(ttf).unwrap(),
            Self::Woff2 => ttf_to_woff2(ttf).unwrap(),
        }
    }
}

fn assert_valid_font(raw: &[u8], expected_map: &BTreeMap<char, u16>) {
    let font_file = ReadScope::new(raw).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut font = allsorts::Font::new(font_provider).unwrap();
    for (&ch, &expected_id) in expected_map {
        let (glyph_id, _) = font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(glyph_id, expected_id, "{ch:?}");
    }

    OpenTypeSanitizer::get().validate(raw);
}

#[test_casing(3, FONTS)]
fn compiling_svg_font(font: TestFont) {
    let expected_map = font.char_map();
    assert!(!expected_map.is_empty());
    let ttf = svg_to_ttf(font.svg).unwrap();

    let parsed = Font::new(&ttf).unwrap();
    assert_eq!(Font::checksum(&ttf), Font::SFNT_CHECKSUM);
    let svg_font = SvgFont::parse(font.svg).unwrap();
    assert_eq!(
        usize::from(parsed.glyph_count()),
        svg_font.glyphs().len() + 1
    );
    for (&ch, &expected_id) in &expected_map {
        assert_eq!(parsed.map_char(ch).unwrap(), expected_id, "{ch:?}");
    }
    assert_eq!(parsed.map_char('\u{e000}').unwrap(), 0);

    assert_valid_font(&ttf, &expected_map);
}

#[test_casing(3, FONTS)]
fn compilation_is_deterministic(font: TestFont) {
    let ttf = svg_to_ttf(font.svg).unwrap();
    assert_eq!(svg_to_ttf(font.svg).unwrap(), ttf);
}

#[test_casing(6, Product((FONTS, Format::ALL)))]
fn reencoding_font(font: TestFont, format: Format) {
    let expected_map = font.char_map();
    let ttf = svg_to_ttf(font.svg).unwrap();
    let encoded = format.encode(&ttf);
    assert_eq!(encoded.len() % 4, 0);
    assert_valid_font(&encoded, &expected_map);

    let original = Font::new(&ttf).unwrap();
    let font_file = ReadScope::new(&encoded).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    for tag in original.table_tags() {
        println!("Testing table: {tag:?}");
        let table_contents: Cow<'_, [u8]> = font_provider
            .read_table_data(u32::from_be_bytes(*tag.as_bytes()))
            .unwrap();
        assert_eq!(table_contents.as_ref(), original.table(tag).unwrap());
    }
}

#[test_casing(3, FONTS)]
fn wrapping_font_into_eot(font: TestFont) {
    let ttf = svg_to_ttf(font.svg).unwrap();
    let eot = ttf_to_eot(&ttf).unwrap();
    assert!(eot.ends_with(&ttf));
    let eot_len = u32::from_le_bytes(eot[..4].try_into().unwrap());
    assert_eq!(eot_len as usize, eot.len());
}

#[test]
fn astral_chars_use_segmented_coverage() {
    let ttf = svg_to_ttf(ASTRAL_FONT.svg).unwrap();
    let font = Font::new(&ttf).unwrap();
    let cmap = font.table(TableTag::CMAP).unwrap();
    // Encoding record: platform 0, encoding 4; subtable format 12
    assert_eq!(cmap[4..8], [0, 0, 0, 4]);
    assert_eq!(cmap[12..14], [0, 12]);
    assert_eq!(font.map_char('\u{1f680}').unwrap(), 3);
}

#[test]
fn duplicate_and_ligature_glyphs() {
    let font = SvgFont::parse(REGULAR_FONT.svg).unwrap();
    let ttf = font.to_truetype().unwrap();
    let parsed = Font::new(&ttf).unwrap();
    assert_eq!(parsed.glyph_count(), 6);
    assert_eq!(parsed.map_char('\u{f0f3}').unwrap(), 1);
    assert_eq!(parsed.map_char('\u{f0a2}').unwrap(), 4);
    // Ligature glyphs are not mapped
    assert_eq!(parsed.map_char('a').unwrap(), 0);
}

#[test]
fn transcoding_errors() {
    let err = svg_to_ttf("<svg></svg>").unwrap_err();
    assert!(
        matches!(err, TranscodeError::Svg(SvgError::MissingFont)),
        "{err:?}"
    );

    let err = ttf_to_woff2(b"not a font").unwrap_err();
    let TranscodeError::Parse(err) = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(matches!(err.kind(), ParseErrorKind::UnexpectedFontVersion));

    let mut ttf = svg_to_ttf(SOLID_FONT.svg).unwrap();
    let glyf_offset = {
        let font = Font::new(&ttf).unwrap();
        font.tables
            .iter()
            .find(|table| table.tag == TableTag::GLYF)
            .unwrap()
            .offset
    };
    ttf[glyf_offset] ^= 0xff;
    let err = ttf_to_woff(&ttf).unwrap_err();
    let TranscodeError::Parse(err) = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(matches!(err.kind(), ParseErrorKind::Checksum { .. }));
    assert_eq!(err.table(), Some(TableTag::GLYF));
}
