use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use allsorts::{binary::read::ReadScope, font::MatchingPresentation, font_data::FontData};
use font_transcode::TranscodeError;
use tempfile::TempDir;
use test_casing::test_casing;

use crate::{
    BuiltinTranscoder, Error, FontFormat, FontTranscoder, Minifier, MinifyOptions, Redirect,
    Resource, ResourceInterceptor, StagingArea, SvgFontDocument,
};

const MAIN_CSS: &str = r#"/*!
 * Icon font test stylesheet
 */
.fa, .fas, .far, .fab {
  display: inline-block;
  font-style: normal; }

.fa-fw {
  width: 1.25em; }

.fa-inverse {
  color: #fff; }

.fa-ban:before {
  content: "\f05e"; }

.fa-help:before {
  content: "\f059"; }

.fa-home:before {
  content: "\f015"; }

.fa-user:before {
  content: "\f007"; }

.fa-bell:before {
  content: "\f0f3"; }

.sr-only {
  border: 0; }
"#;

const SOLID_SVG: &str = r#"<?xml version="1.0" standalone="no"?>
<!DOCTYPE svg PUBLIC "-//W3C//DTD SVG 1.1//EN" "http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd" >
<svg xmlns="http://www.w3.org/2000/svg">
<defs>
<font id="fontawesome-free" horiz-adv-x="512" >
<font-face font-family="Font Awesome 5 Free" units-per-em="512" ascent="448" descent="-64" font-weight="900" font-style="normal" />
<missing-glyph />
<glyph glyph-name="home" unicode="&#xf015;" horiz-adv-x="576"
d="M288 448l288 -224h-64v-224h-160v160h-128v-160h-160v224h-64z" />
<glyph glyph-name="user" unicode="&#xf007;" horiz-adv-x="448"
d="M0 0h448v128c0 53 -43 96 -96 96h-256c-53 0 -96 -43 -96 -96z" />
<glyph glyph-name="ban" unicode="&#xf05e;"
d="M256 504c137 0 248 -111 248 -248s-111 -248 -248 -248s-248 111 -248 248s111 248 248 248z" />
<glyph glyph-name="help" unicode="&#xf059;"
d="M64 0h384v448h-384z" />
</font>
</defs>
</svg>
"#;

const REGULAR_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg"><defs>
<font id="fontawesome-free" horiz-adv-x="448">
<font-face font-family="Font Awesome 5 Free" units-per-em="512" ascent="448" descent="-64" font-weight="400" />
<glyph glyph-name="bell" unicode="&#xf0f3;" d="M0 0h448l-224 448z" />
</font>
</defs></svg>
"#;

const SOURCE: &str = r#"<i class="fa fa-help"></i>
<i class="fas fa-home fa-fw"></i>
"#;

fn variant_css(font: &str) -> String {
    format!(
        r#"@font-face {{
  font-family: 'Font Awesome 5 Free';
  font-style: normal;
  src: url("../webfonts/{font}.eot");
  src: url("../webfonts/{font}.eot?#iefix") format("embedded-opentype"), url("../webfonts/{font}.woff2") format("woff2"), url("../webfonts/{font}.woff") format("woff"), url("../webfonts/{font}.ttf") format("truetype"), url("../webfonts/{font}.svg#fontawesome") format("svg"); }}

.fa,
.fas {{
  font-family: 'Font Awesome 5 Free'; }}
"#
    )
}

/// Project with sources in `src` and the icon font library in `vendor`.
#[derive(Debug)]
struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new(sources: &[(&str, &str)]) -> Self {
        let fixture = Self {
            root: tempfile::tempdir().unwrap(),
        };
        fixture.write("vendor/css/fontawesome.css", MAIN_CSS);
        fixture.write("vendor/css/solid.css", &variant_css("fa-solid-900"));
        fixture.write("vendor/css/regular.css", &variant_css("fa-regular-400"));
        fixture.write("vendor/css/brands.css", &variant_css("fa-brands-400"));
        fixture.write("vendor/webfonts/fa-solid-900.svg", SOLID_SVG);
        fixture.write("vendor/webfonts/fa-regular-400.svg", REGULAR_SVG);
        for &(path, contents) in sources {
            fixture.write(&format!("src/{path}"), contents);
        }
        fixture
    }

    fn path(&self, relative_path: &str) -> PathBuf {
        self.root.path().join(relative_path)
    }

    fn write(&self, relative_path: &str, contents: &str) {
        let path = self.path(relative_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn options(&self) -> MinifyOptions {
        MinifyOptions {
            src_dir: self.path("src"),
            ..MinifyOptions::default()
        }
    }

    fn minifier(&self, options: MinifyOptions) -> Minifier {
        self.minifier_with(options, BuiltinTranscoder)
    }

    fn minifier_with<T: FontTranscoder>(&self, options: MinifyOptions, transcoder: T) -> Minifier<T> {
        let staging = StagingArea::create_in(self.root.path(), options.debug).unwrap();
        Minifier::from_parts(options, transcoder, staging).unwrap()
    }

    fn resource(&self, relative_path: &str) -> Resource {
        Resource::new(self.path(relative_path))
    }
}

fn resolve(minifier: &mut impl ResourceInterceptor, resource: &Resource) -> Redirect {
    minifier
        .on_resolve(resource)
        .unwrap()
        .expect("resource was not redirected")
}

fn staged_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort_unstable();
    names
}

fn assert_font_maps(raw: &[u8], expected_map: &BTreeMap<char, u16>) {
    let font_file = ReadScope::new(raw).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut font = allsorts::Font::new(font_provider).unwrap();
    for (&ch, &expected_id) in expected_map {
        let (glyph_id, _) = font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(glyph_id, expected_id, "{ch:?}");
    }
}

#[test]
fn minifying_main_stylesheet() {
    let fixture = Fixture::new(&[("index.html", r#"<i class="fa-help">"#)]);
    let mut minifier = fixture.minifier(fixture.options());
    let resource = fixture.resource("vendor/css/fontawesome.css");
    let redirect = resolve(&mut minifier, &resource);

    assert_eq!(redirect.context, minifier.staging_dir());
    assert_eq!(redirect.path, minifier.staging_dir().join("fontawesome.css"));
    let css = fs::read_to_string(&redirect.path).unwrap();
    let (base, appended) = css.split_at(css.find(".fa-inverse").unwrap());
    assert!(base.starts_with("/*!"));
    assert_eq!(
        appended,
        ".fa-inverse {\n  color: #fff; }.fa-help:before{content:\"\\f059\"}"
    );
    assert!(!css.contains("f05e"));

    // The source stylesheet is not modified.
    let source = fs::read_to_string(&resource.path).unwrap();
    assert_eq!(source, MAIN_CSS);
}

#[test]
fn minifying_variant_stylesheet() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let mut minifier = fixture.minifier(fixture.options());
    let redirect = resolve(&mut minifier, &fixture.resource("vendor/css/solid.css"));
    let staging_dir = minifier.staging_dir().to_owned();
    assert_eq!(redirect.path, staging_dir.join("solid.css"));
    assert_eq!(
        staged_files(&staging_dir),
        [
            "fa-solid-900.eot",
            "fa-solid-900.svg",
            "fa-solid-900.ttf",
            "fa-solid-900.woff",
            "fa-solid-900.woff2",
            "solid.css"
        ]
    );

    let css = fs::read_to_string(&redirect.path).unwrap();
    assert!(!css.contains("../webfonts"), "{css}");
    assert!(css.contains(r#"url("./fa-solid-900.woff2") format("woff2")"#));
    assert!(css.contains(r#"url("./fa-solid-900.svg#fontawesome")"#));

    let svg = fs::read_to_string(staging_dir.join("fa-solid-900.svg")).unwrap();
    let subset = SvgFontDocument::parse(&svg).unwrap();
    let original = SvgFontDocument::parse(SOLID_SVG).unwrap();
    assert_eq!(subset.glyph_count(), 2);
    assert_eq!(subset.glyph("help"), original.glyph("help"));
    assert_eq!(subset.glyph("home"), original.glyph("home"));
    assert_eq!(subset.glyph("user"), None);

    // Glyphs follow the order of used icons.
    let expected_map = BTreeMap::from([('\u{f059}', 1), ('\u{f015}', 2)]);
    for name in ["fa-solid-900.ttf", "fa-solid-900.woff", "fa-solid-900.woff2"] {
        println!("Checking {name}");
        let raw = fs::read(staging_dir.join(name)).unwrap();
        assert_font_maps(&raw, &expected_map);
    }
    let ttf = fs::read(staging_dir.join("fa-solid-900.ttf")).unwrap();
    let eot = fs::read(staging_dir.join("fa-solid-900.eot")).unwrap();
    assert!(eot.ends_with(&ttf));
}

#[test]
fn minifying_all_stylesheets_in_build() {
    let fixture = Fixture::new(&[("index.html", SOURCE), ("app.js", "el.classList.add('fa-user')")]);
    let mut minifier = fixture.minifier(fixture.options());
    assert_eq!(minifier.scan_count(), 0);

    for path in [
        "vendor/css/fontawesome.css",
        "vendor/css/solid.css",
        "vendor/css/regular.css",
        "vendor/css/brands.css",
    ] {
        resolve(&mut minifier, &fixture.resource(path));
    }
    assert_eq!(minifier.scan_count(), 1);

    let staging_dir = minifier.staging_dir().to_owned();
    let main_css = fs::read_to_string(staging_dir.join("fontawesome.css")).unwrap();
    for icon in ["help", "home", "user"] {
        assert_eq!(main_css.matches(&format!(".fa-{icon}:before")).count(), 1);
    }
    assert!(!main_css.contains(".fa-ban:before"));
    assert!(!main_css.contains(".fa-fw:before"));

    // `regular.css` references a font without used glyphs; `brands.css` references
    // a missing font.
    assert_eq!(fs::read_to_string(staging_dir.join("regular.css")).unwrap(), "");
    assert_eq!(fs::read_to_string(staging_dir.join("brands.css")).unwrap(), "");
    let files = staged_files(&staging_dir);
    assert!(!files.iter().any(|name| name.starts_with("fa-regular")));
    assert!(!files.iter().any(|name| name.starts_with("fa-brands")));

    minifier.on_complete().unwrap();
    assert!(!staging_dir.exists());
}

#[test]
fn unrelated_resources_are_passed_through() {
    let fixture = Fixture::new(&[("index.html", SOURCE), ("main.js", "")]);
    let mut minifier = fixture.minifier(fixture.options());
    for path in ["src/main.js", "vendor/css/sr-only.css", "vendor/webfonts/fa-solid-900.svg"] {
        let redirect = minifier.on_resolve(&fixture.resource(path)).unwrap();
        assert_eq!(redirect, None, "{path}");
    }
    assert_eq!(minifier.scan_count(), 0);
}

#[test_casing(2, ["vendor/css/fontawesome.css", "vendor/css/solid.css"])]
fn staged_resources_are_not_processed_again(path: &str) {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let mut minifier = fixture.minifier(fixture.options());
    let mut resource = fixture.resource(path);
    resolve(&mut minifier, &resource).apply(&mut resource);
    let staged_css = fs::read_to_string(&resource.path).unwrap();

    assert_eq!(minifier.on_resolve(&resource).unwrap(), None);
    let by_path = Resource::new(resource.path.clone());
    assert_eq!(minifier.on_resolve(&by_path).unwrap(), None);
    assert_eq!(fs::read_to_string(&resource.path).unwrap(), staged_css);
}

#[test]
fn no_used_icons_skips_minification() {
    let fixture = Fixture::new(&[("index.html", "<p>No icons</p>")]);
    let mut minifier = fixture.minifier(fixture.options());
    for path in ["vendor/css/fontawesome.css", "vendor/css/solid.css"] {
        assert_eq!(minifier.on_resolve(&fixture.resource(path)).unwrap(), None);
    }
    assert_eq!(minifier.scan_count(), 1);
    assert!(staged_files(minifier.staging_dir()).is_empty());
}

#[test]
fn included_icons_are_retained() {
    let fixture = Fixture::new(&[("index.html", "<p>No icons</p>")]);
    let options = MinifyOptions {
        include: vec!["user".to_owned(), "unknown".to_owned()],
        ..fixture.options()
    };
    let mut minifier = fixture.minifier(options);
    let redirect = resolve(&mut minifier, &fixture.resource("vendor/css/fontawesome.css"));
    let css = fs::read_to_string(redirect.path).unwrap();
    assert!(css.ends_with(".fa-user:before{content:\"\\f007\"}"), "{css}");
    assert!(!css.contains("unknown"));
}

#[test]
fn custom_stylesheet_patterns() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    fixture.write("vendor/css/icons-main.css", MAIN_CSS);
    let options = MinifyOptions {
        main_stylesheet_pattern: r"icons-main\.css$".to_owned(),
        variant_stylesheet_pattern: r"solid\.css$".to_owned(),
        ..fixture.options()
    };
    let mut minifier = fixture.minifier(options);

    let redirect = resolve(&mut minifier, &fixture.resource("vendor/css/icons-main.css"));
    assert!(redirect.path.ends_with("icons-main.css"));
    let redirect = minifier
        .on_resolve(&fixture.resource("vendor/css/fontawesome.css"))
        .unwrap();
    assert_eq!(redirect, None);
    let redirect = minifier
        .on_resolve(&fixture.resource("vendor/css/regular.css"))
        .unwrap();
    assert_eq!(redirect, None);
}

#[test]
fn invalid_stylesheet_pattern_is_an_error() {
    let fixture = Fixture::new(&[]);
    let options = MinifyOptions {
        variant_stylesheet_pattern: "(solid".to_owned(),
        ..fixture.options()
    };
    let staging = StagingArea::create_in(fixture.root.path(), false).unwrap();
    let err = Minifier::from_parts(options, BuiltinTranscoder, staging).unwrap_err();
    assert!(matches!(&err, Error::Pattern { pattern, .. } if pattern == "(solid"), "{err:?}");
}

#[test]
fn missing_sentinel_is_an_error() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    fixture.write(
        "vendor/css/fontawesome.css",
        ".fa-home:before { content: \"\\f015\"; }",
    );
    let mut minifier = fixture.minifier(fixture.options());
    let err = minifier
        .on_resolve(&fixture.resource("vendor/css/fontawesome.css"))
        .unwrap_err();
    assert!(
        matches!(&err, Error::MissingBase { sentinel, .. } if sentinel == "fa-inverse"),
        "{err:?}"
    );
}

#[test_casing(2, ["vendor/css/fontawesome.css", "vendor/css/solid.css"])]
fn missing_stylesheet_is_a_read_error(path: &str) {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let mut minifier = fixture.minifier(fixture.options());
    let path = path.replace("css/", "css/missing/");
    let resource = fixture.resource(&path);
    let err = minifier.on_resolve(&resource).unwrap_err();

    let Error::Read { path, source } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(*path, resource.path);
    assert_eq!(source.kind(), io::ErrorKind::NotFound);
}

#[test_casing(2, ["vendor/css/fontawesome.css", "vendor/css/solid.css"])]
fn non_utf8_stylesheet_is_a_read_error(path: &str) {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let resource = fixture.resource(path);
    fs::write(&resource.path, b".fa-inverse { content: \"\xff\xfe\"; }").unwrap();
    let mut minifier = fixture.minifier(fixture.options());
    let err = minifier.on_resolve(&resource).unwrap_err();

    let Error::Read { path, source } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(*path, resource.path);
    assert_eq!(source.kind(), io::ErrorKind::InvalidData);
}

#[test]
fn non_utf8_svg_font_is_a_read_error() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let svg_path = fixture.path("vendor/webfonts/fa-solid-900.svg");
    fs::write(&svg_path, b"<svg><font>\xff</font></svg>").unwrap();
    let mut minifier = fixture.minifier(fixture.options());
    let err = minifier
        .on_resolve(&fixture.resource("vendor/css/solid.css"))
        .unwrap_err();

    let Error::Read { path, source } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert!(path.ends_with("fa-solid-900.svg"), "{path:?}");
    assert_eq!(source.kind(), io::ErrorKind::InvalidData);
}

#[test]
fn missing_source_dir_is_an_error() {
    let fixture = Fixture::new(&[]);
    let mut minifier = fixture.minifier(fixture.options());
    let err = minifier
        .on_resolve(&fixture.resource("vendor/css/fontawesome.css"))
        .unwrap_err();
    let Error::SourceDir { path, source } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(*path, fixture.path("src"));
    assert_eq!(source.kind(), io::ErrorKind::NotFound);
}

#[test]
fn malformed_svg_font_is_an_error() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    fixture.write("vendor/webfonts/fa-solid-900.svg", "<svg><font><glyph></font>");
    let mut minifier = fixture.minifier(fixture.options());
    let err = minifier
        .on_resolve(&fixture.resource("vendor/css/solid.css"))
        .unwrap_err();
    assert!(matches!(err, Error::SvgFont { .. }), "{err:?}");
}

#[derive(Debug)]
struct FailingWoffTranscoder;

impl FontTranscoder for FailingWoffTranscoder {
    fn svg_to_ttf(&self, svg: &str) -> Result<Vec<u8>, TranscodeError> {
        BuiltinTranscoder.svg_to_ttf(svg)
    }

    fn ttf_to_woff(&self, _ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        Err(TranscodeError::Compress(io::Error::other("compression failed")))
    }

    fn ttf_to_woff2(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        BuiltinTranscoder.ttf_to_woff2(ttf)
    }

    fn ttf_to_eot(&self, ttf: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        BuiltinTranscoder.ttf_to_eot(ttf)
    }
}

#[test]
fn transcoding_errors_are_fatal() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let mut minifier = fixture.minifier_with(fixture.options(), FailingWoffTranscoder);
    let err = minifier
        .on_resolve(&fixture.resource("vendor/css/solid.css"))
        .unwrap_err();
    let Error::Transcode { path, format, .. } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(*format, FontFormat::Woff);
    assert!(path.ends_with("fa-solid-900.svg"));
}

#[test]
fn unreferenced_formats_are_named_after_svg_font() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    fixture.write(
        "vendor/css/solid.css",
        "@font-face { src: url(../webfonts/fa-solid-900.woff2) format('woff2'), url('../webfonts/fa-solid-900.svg') format('svg'); }",
    );
    let mut minifier = fixture.minifier(fixture.options());
    let redirect = resolve(&mut minifier, &fixture.resource("vendor/css/solid.css"));
    let css = fs::read_to_string(redirect.path).unwrap();
    assert_eq!(
        css,
        "@font-face { src: url(./fa-solid-900.woff2) format('woff2'), url('./fa-solid-900.svg') format('svg'); }"
    );
    assert_eq!(
        staged_files(minifier.staging_dir()),
        [
            "fa-solid-900.eot",
            "fa-solid-900.svg",
            "fa-solid-900.ttf",
            "fa-solid-900.woff",
            "fa-solid-900.woff2",
            "solid.css"
        ]
    );
}

#[test]
fn completion_is_idempotent() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let mut minifier = fixture.minifier(fixture.options());
    resolve(&mut minifier, &fixture.resource("vendor/css/fontawesome.css"));
    let staging_dir = minifier.staging_dir().to_owned();
    assert!(staging_dir.is_dir());

    minifier.on_complete().unwrap();
    assert!(!staging_dir.exists());
    minifier.on_complete().unwrap();
}

#[test]
fn debug_mode_keeps_staging_dir() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let options = MinifyOptions {
        debug: true,
        ..fixture.options()
    };
    let mut minifier = fixture.minifier(options);
    let redirect = resolve(&mut minifier, &fixture.resource("vendor/css/fontawesome.css"));
    minifier.on_complete().unwrap();
    assert!(redirect.path.is_file());
}

#[derive(Debug, Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(action: impl FnOnce()) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, action);
    let logs = buffer.0.lock().unwrap().clone();
    String::from_utf8(logs).unwrap()
}

#[test_casing(2, [false, true])]
fn diagnostics_are_logged_in_debug_mode(debug: bool) {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let options = MinifyOptions {
        debug,
        include: vec!["unknown".to_owned()],
        ..fixture.options()
    };
    let logs = capture_logs(|| {
        let mut minifier = fixture.minifier(options);
        for path in ["vendor/css/fontawesome.css", "vendor/css/brands.css"] {
            resolve(&mut minifier, &fixture.resource(path));
        }
        minifier.on_complete().unwrap();
    });

    let expected_messages = [
        "detected icons",
        "could not find codepoint for icon",
        "icon=\"unknown\"",
        "ignoring stylesheet referencing a missing SVG font",
        "kept staging directory",
    ];
    for message in expected_messages {
        assert_eq!(logs.contains(message), debug, "{message}\n{logs}");
    }
    assert!(!logs.contains("could not find any icon-font stylesheet"));

    if debug {
        // The warning names the resource in its own fields, not only in the span context.
        let line = logs
            .lines()
            .find(|line| line.contains("could not find codepoint for icon"))
            .unwrap();
        let (_, fields) = line.split_once("could not find codepoint for icon").unwrap();
        let resource = fixture.path("vendor/css/fontawesome.css");
        let expected_field = format!("resource={}", resource.display());
        assert!(fields.contains(&expected_field), "{line}");
    }
}

#[test]
fn missing_stylesheets_are_reported() {
    let fixture = Fixture::new(&[("index.html", SOURCE)]);
    let options = MinifyOptions {
        debug: true,
        ..fixture.options()
    };
    let logs = capture_logs(|| {
        let mut minifier = fixture.minifier(options);
        minifier.on_resolve(&fixture.resource("src/index.html")).unwrap();
        minifier.on_complete().unwrap();
    });
    assert!(
        logs.contains("could not find any icon-font stylesheet"),
        "{logs}"
    );
}
