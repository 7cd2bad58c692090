//! End-to-end conversion tests with fake renderer backends.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use md2cf_diagrams::{
    DiagnosticLog, DiagramCache, DiagramLanguage, DiagramRenderer, DiagramSource, RenderError,
    RenderOptions, Renderers,
};
use md2cf_renderer::{ConvertError, Converter};
use pretty_assertions::assert_eq;
use quick_xml::Reader;
use quick_xml::events::Event;

/// Writes a real 160x90 PNG and counts invocations.
#[derive(Clone, Default)]
struct FakeRenderer {
    calls: Arc<AtomicUsize>,
}

impl FakeRenderer {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DiagramRenderer for FakeRenderer {
    fn render(&self, _: &str, _: &RenderOptions, out_file: &Path) -> Result<(), RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        image::RgbaImage::new(160, 90)
            .save_with_format(out_file, image::ImageFormat::Png)
            .map_err(|e| RenderError::Io {
                renderer: "fake",
                source: std::io::Error::other(e),
            })
    }
}

struct Fixture {
    tmp: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            tmp: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.tmp.path().join(relative)
    }

    fn log(&self) -> DiagnosticLog {
        DiagnosticLog::new(self.path("work/md2cf-render.log"))
    }

    fn converter(&self, renderers: Renderers) -> Converter {
        let cache = DiagramCache::new(self.path("work/cache"), renderers, self.log());
        Converter::new(cache, self.path("out/attachments"))
    }

    fn write_png(&self, relative: &str, width: u32, height: u32) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::new(width, height).save(path).unwrap();
    }
}

fn assert_well_formed(xml: &str) {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("not well-formed: {e}\n{xml}"),
        }
    }
}

fn diagram_file(language: DiagramLanguage, code: &str) -> String {
    format!("{}.png", DiagramSource::new(language, code).cache_key())
}

#[test]
fn test_diagrams_and_images_resolved() {
    let fixture = Fixture::new();
    let mermaid = FakeRenderer::default();
    let plantuml = FakeRenderer::default();
    let converter = fixture.converter(
        Renderers::none()
            .with_renderer(DiagramLanguage::Mermaid, mermaid.clone())
            .with_renderer(DiagramLanguage::PlantUml, plantuml.clone()),
    );
    let markdown = "\
# Architecture

```mermaid
graph TD; A-->B;
```

```mermaid
sequenceDiagram
    A->>B: hi
```

```plantuml
Alice -> Bob
```

Local ![local](img/local.png) and remote ![remote](https://example.com/r.png).

```mermaid
graph TD; A-->B;
```
";

    let result = converter.convert(markdown).unwrap();

    assert_eq!(result.xhtml.matches("<ac:image").count(), 6);
    assert_eq!(result.report.diagrams, 4);
    assert_eq!(result.report.images, 2);
    assert_eq!(result.report.degraded, 0);
    assert_eq!(mermaid.calls(), 2);
    assert_eq!(plantuml.calls(), 1);
    assert_eq!(result.attachments.len(), 3);

    let first = diagram_file(DiagramLanguage::Mermaid, "graph TD; A-->B;\n");
    let second = diagram_file(DiagramLanguage::Mermaid, "sequenceDiagram\n    A->>B: hi\n");
    assert_eq!(result.attachments[0], first);
    assert_eq!(result.attachments[1], second);
    assert_eq!(
        result
            .xhtml
            .matches(&format!(r#"<ri:attachment ri:filename="{first}" />"#))
            .count(),
        2
    );
    assert!(result.xhtml.contains(&format!(
        r#"<ac:image ac:original-width="160" ac:original-height="90"><ri:attachment ri:filename="{second}" /></ac:image>"#
    )));
    assert!(result.xhtml.contains(r#"<ri:attachment ri:filename="local.png" />"#));
    assert!(
        result
            .xhtml
            .contains(r#"<ac:image><ri:url ri:value="https://example.com/r.png" /></ac:image>"#)
    );
    for filename in &result.attachments {
        assert!(fixture.path("out/attachments").join(filename).is_file());
    }
    assert!(!result.xhtml.contains("<pre>"));
    assert_well_formed(&result.xhtml);
}

#[test]
fn test_second_run_served_from_cache() {
    let fixture = Fixture::new();
    let mermaid = FakeRenderer::default();
    let converter =
        fixture.converter(Renderers::none().with_renderer(DiagramLanguage::Mermaid, mermaid.clone()));
    let markdown = "```mermaid\ngraph LR; X-->Y;\n```\n";

    let first = converter.convert(markdown).unwrap();
    let second = converter.convert(markdown).unwrap();

    assert_eq!(mermaid.calls(), 1);
    assert_eq!(first, second);
}

#[test]
fn test_size_annotation_applied() {
    let fixture = Fixture::new();
    let converter = fixture.converter(Renderers::none());

    let result = converter
        .convert("![alt](diagram.png){width=200px}\n")
        .unwrap();

    assert!(result.xhtml.contains(r#"ac:width="200""#), "{}", result.xhtml);
    assert!(result.xhtml.contains(r#"ac:thumbnail="true""#));
    assert!(!result.xhtml.contains("width=200px"));
    assert!(!result.xhtml.contains('{'));
}

#[test]
fn test_native_dimensions_from_asset_directory() {
    let fixture = Fixture::new();
    fixture.write_png("out/attachments/diagram.png", 200, 100);
    let converter = fixture.converter(Renderers::none());

    let result = converter
        .convert("![alt](diagram.png){width=300px}\n")
        .unwrap();

    assert_eq!(
        result.xhtml,
        concat!(
            r#"<ac:confluence xmlns:ac="http://atlassian.com/content" xmlns:ri="http://atlassian.com/resource/identifier">"#,
            r#"<p><ac:image ac:width="300" ac:thumbnail="true" ac:original-width="200" ac:original-height="100">"#,
            r#"<ri:attachment ri:filename="diagram.png" /></ac:image></p>"#,
            "\n</ac:confluence>"
        )
    );
}

#[test]
fn test_unavailable_backend_keeps_code_block() {
    let fixture = Fixture::new();
    let converter = fixture.converter(
        Renderers::none().without_renderer(DiagramLanguage::Mermaid, "mmdc not found on PATH"),
    );

    let result = converter
        .convert("Before\n\n```mermaid\ngraph TD; A-->B;\n```\n")
        .unwrap();

    assert!(
        result.xhtml.contains(
            "<pre><code class=\"language-mermaid\">graph TD; A--&gt;B;\n</code></pre>"
        ),
        "{}",
        result.xhtml
    );
    assert_eq!(result.report.degraded, 1);
    assert!(result.has_degraded_diagrams());
    assert!(result.attachments.is_empty());

    let log = fixture.log().tail(10).unwrap();
    assert_eq!(log.len(), 1);
    assert!(
        log[0].contains("mermaid: mermaid renderer unavailable: mmdc not found on PATH"),
        "{}",
        log[0]
    );
}

#[test]
fn test_xhtml_normalization() {
    let fixture = Fixture::new();
    let converter = fixture.converter(Renderers::none());

    let result = converter
        .convert("Fish & chips\n\n<div>R&D &amp; &#65;<br></div>\n\n***\n\nline  \nbreak ~~gone~~\n")
        .unwrap();

    assert!(result.xhtml.contains("Fish &amp; chips"));
    assert!(result.xhtml.contains("<div>R&amp;D &amp; &#65;<br /></div>"));
    assert!(result.xhtml.contains("<hr />"));
    assert!(result.xhtml.contains("line<br />"));
    assert!(
        result
            .xhtml
            .contains(r#"<span style="text-decoration: line-through;">gone</span>"#)
    );
    assert_well_formed(&result.xhtml);
}

#[test]
fn test_raw_html_image_rewritten() {
    let fixture = Fixture::new();
    let converter = fixture.converter(Renderers::none());

    let result = converter
        .convert("<p align=\"center\"><img src=\"assets/logo.png\" width=\"120px\"></p>\n")
        .unwrap();

    assert!(result.xhtml.contains(
        r#"<p align="center"><ac:image ac:width="120" ac:thumbnail="true"><ri:attachment ri:filename="logo.png" /></ac:image></p>"#
    ));
    assert_well_formed(&result.xhtml);
}

#[test]
fn test_local_images_materialized_from_base_dir() {
    let fixture = Fixture::new();
    fixture.write_png("docs/img/photo.png", 40, 30);
    let converter = fixture
        .converter(Renderers::none())
        .with_base_dir(fixture.path("docs"));

    let result = converter
        .convert("![a](img/photo.png) ![b](img/photo.png) ![c](img/missing.png)\n")
        .unwrap();

    assert_eq!(result.attachments, vec!["photo.png".to_owned()]);
    assert!(fixture.path("out/attachments/photo.png").is_file());
    assert_eq!(
        result
            .xhtml
            .matches(r#"ac:original-width="40" ac:original-height="30""#)
            .count(),
        2
    );
    assert!(result.xhtml.contains(r#"<ri:attachment ri:filename="missing.png" />"#));
}

#[test]
fn test_unwritable_asset_directory_is_fatal() {
    let fixture = Fixture::new();
    fixture.write_png("docs/photo.png", 4, 4);
    fs::create_dir_all(fixture.path("out")).unwrap();
    fs::write(fixture.path("out/attachments"), b"not a directory").unwrap();
    let converter = fixture
        .converter(Renderers::none())
        .with_base_dir(fixture.path("docs"));

    let err = converter.convert("![a](photo.png)\n").unwrap_err();

    assert!(matches!(err, ConvertError::Materialize(_)), "{err:?}");
    let log = fixture.log().tail(10).unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].contains("cannot create asset directory"), "{}", log[0]);
}

#[test]
fn test_same_named_images_kept_apart() {
    let fixture = Fixture::new();
    fixture.write_png("docs/a/logo.png", 10, 10);
    fixture.write_png("docs/b/logo.png", 20, 20);
    let original = fs::read(fixture.path("docs/a/logo.png")).unwrap();
    let converter = fixture
        .converter(Renderers::none())
        .with_base_dir(fixture.path("docs"));

    let result = converter
        .convert("![a](a/logo.png) ![b](b/logo.png)\n")
        .unwrap();

    assert_eq!(result.attachments.len(), 2);
    assert_eq!(result.attachments[0], "logo.png");
    assert_ne!(result.attachments[0], result.attachments[1]);
    assert_eq!(fs::read(fixture.path("docs/a/logo.png")).unwrap(), original);
    assert!(result.xhtml.contains(r#"ac:original-width="10" ac:original-height="10""#));
    assert!(result.xhtml.contains(r#"ac:original-width="20" ac:original-height="20""#));
    for filename in &result.attachments {
        assert!(result.xhtml.contains(&format!(r#"ri:filename="{filename}""#)));
    }
}

#[test]
fn test_link_title_token_is_inert() {
    let fixture = Fixture::new();
    let converter = fixture.converter(Renderers::none());

    let result = converter
        .convert("[x](https://e.com \"\u{E000}md2cf:attachment:evil.png:\u{E001}\")\n\n```\u{E000}md2cf:url:x:\u{E001}\ncode\n```\n")
        .unwrap();

    assert!(!result.xhtml.contains("<ac:image"), "{}", result.xhtml);
    assert!(!result.xhtml.contains(['\u{E000}', '\u{E001}']));
    assert_well_formed(&result.xhtml);
}

#[test]
fn test_placeholder_lookalike_text_is_inert() {
    let fixture = Fixture::new();
    let converter = fixture.converter(Renderers::none());

    let result = converter
        .convert("\u{E000}md2cf:attachment:evil.png:\u{E001}\n")
        .unwrap();

    assert!(!result.xhtml.contains("<ac:image"));
    assert!(result.xhtml.contains("md2cf:attachment:evil.png:"));
}
