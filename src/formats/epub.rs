//! EPUB format handler.

use crate::book::{BookInfo, ExtractReport};
use crate::error::{BookError, Result};
use crate::formats::{BookFormat, FormatHandler};
use roxmltree::{Document, Node};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

/// Handler for EPUB files. Metadata only; EPUB pages are reflowable.
pub struct EpubHandler;

impl EpubHandler {
    /// Read a ZIP member into a string.
    fn read_member(
        archive: &mut ZipArchive<BufReader<File>>,
        name: &str,
        path: &Path,
    ) -> Result<String> {
        let mut member = archive
            .by_name(name)
            .map_err(|e| BookError::open(path, format!("{name}: {e}")))?;
        let mut content = String::new();
        member.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Find the OPF file path from container.xml.
    fn find_opf_path(container: &str, path: &Path) -> Result<String> {
        let doc = Document::parse(container)?;

        doc.descendants()
            .find(|n| n.has_tag_name("rootfile"))
            .and_then(|n| n.attribute("full-path"))
            .map(String::from)
            .ok_or_else(|| BookError::open(path, "No rootfile in container.xml"))
    }

    /// Parse the OPF package document into a metadata record.
    fn parse_opf(content: &str, path: &Path) -> Result<BookInfo> {
        let doc = Document::parse(content)?;
        let package = doc.root_element();
        let metadata = package
            .children()
            .find(|n| n.has_tag_name("metadata"))
            .ok_or_else(|| BookError::open(path, "OPF package has no metadata"))?;

        let elements: Vec<Node> = metadata.children().filter(|n| n.is_element()).collect();
        let texts = |name: &str| -> Vec<String> {
            elements
                .iter()
                .filter(|n| n.tag_name().name() == name)
                .filter_map(|n| text_of(*n))
                .collect()
        };

        // EPUB 3 refinements: (target id, property) -> value
        let refinement = |id: &str, property: &str| -> Option<String> {
            let target = format!("#{id}");
            elements
                .iter()
                .filter(|n| n.tag_name().name() == "meta")
                .find(|n| {
                    n.attribute("refines") == Some(target.as_str())
                        && n.attribute("property") == Some(property)
                })
                .and_then(|n| text_of(*n))
        };
        let named_meta = |name: &str| -> Option<String> {
            elements
                .iter()
                .filter(|n| n.tag_name().name() == "meta")
                .find(|n| n.attribute("name") == Some(name))
                .and_then(|n| n.attribute("content"))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let mut info = BookInfo::from_path(path);

        let mut titles = Vec::new();
        for node in elements.iter().filter(|n| n.tag_name().name() == "title") {
            let Some(text) = text_of(*node) else { continue };
            let is_subtitle = node
                .attribute("id")
                .and_then(|id| refinement(id, "title-type"))
                .is_some_and(|kind| kind == "subtitle");
            if is_subtitle {
                info.subtitle.push(text);
            } else {
                titles.push(text);
            }
        }
        if let Some(title) = titles.into_iter().next() {
            info.title = title;
        }

        info.language = texts("language");

        let descriptions = texts("description");
        if !descriptions.is_empty() {
            info.description = Some(descriptions.join(", "));
        }

        // calibre's OPF extension, then the EPUB 3 collection vocabulary
        if let Some(series) = named_meta("calibre:series") {
            info.series = Some(series);
            info.series_index = named_meta("calibre:series_index");
        } else if let Some(collection) = elements.iter().find(|n| {
            n.tag_name().name() == "meta" && n.attribute("property") == Some("belongs-to-collection")
        }) && let Some(series) = text_of(*collection)
        {
            info.series = Some(series);
            info.series_index = collection
                .attribute("id")
                .and_then(|id| refinement(id, "group-position"));
        }

        info.authors = texts("creator");
        info.publisher = texts("publisher").into_iter().next();
        info.published_date = texts("date").into_iter().next();
        info.keywords = texts("subject");

        info.pages = package
            .children()
            .find(|n| n.has_tag_name("spine"))
            .map(|spine| spine.children().filter(|n| n.has_tag_name("itemref")).count() as u32)
            .unwrap_or(0);

        Ok(info)
    }
}

/// Trimmed, non-empty text content of an element.
fn text_of(node: Node) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl FormatHandler for EpubHandler {
    fn book_info(&self, path: &Path) -> Result<BookInfo> {
        let file = File::open(path).map_err(|e| BookError::open(path, e))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| BookError::open(path, e))?;

        let container = Self::read_member(&mut archive, "META-INF/container.xml", path)?;
        let opf_path = Self::find_opf_path(&container, path)?;
        let opf = Self::read_member(&mut archive, &opf_path, path)?;

        let info = Self::parse_opf(&opf, path)?;
        tracing::debug!(path = %path.display(), opf = %opf_path, spine = info.pages, "Read EPUB package");
        Ok(info)
    }

    fn extract_pages(&self, _path: &Path, _output: &Path) -> Result<ExtractReport> {
        Err(BookError::ExtractionUnsupported(BookFormat::Epub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::write_epub;

    const ALICE_OPF: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title id="t1">Alice's Adventures in Wonderland</dc:title>
    <dc:title id="t2">Illustrated</dc:title>
    <meta refines="#t2" property="title-type">subtitle</meta>
    <dc:language>en</dc:language>
    <dc:creator id="a1">Lewis Carroll</dc:creator>
    <dc:creator>  </dc:creator>
    <dc:description>A girl</dc:description>
    <dc:description>a rabbit hole</dc:description>
    <dc:publisher>Project Gutenberg</dc:publisher>
    <dc:publisher>Someone Else</dc:publisher>
    <dc:date>2008-06-27</dc:date>
    <dc:date>2020-01-01</dc:date>
    <dc:subject>Fantasy fiction</dc:subject>
    <dc:subject></dc:subject>
    <dc:subject>Children's stories</dc:subject>
    <meta name="calibre:series" content="Alice"/>
    <meta name="calibre:series_index" content="1.0"/>
  </metadata>
  <manifest>
    <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="c2.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
    <itemref idref="c2"/>
    <itemref idref="c1"/>
  </spine>
</package>"##;

    #[test]
    fn test_parse_opf() {
        let info = EpubHandler::parse_opf(ALICE_OPF, Path::new("alice.epub")).unwrap();
        assert_eq!(info.title, "Alice's Adventures in Wonderland");
        assert_eq!(info.subtitle, vec!["Illustrated"]);
        assert_eq!(info.language, vec!["en"]);
        assert_eq!(info.authors, vec!["Lewis Carroll"]);
        assert_eq!(info.description.as_deref(), Some("A girl, a rabbit hole"));
        assert_eq!(info.publisher.as_deref(), Some("Project Gutenberg"));
        assert_eq!(info.published_date.as_deref(), Some("2008-06-27"));
        assert_eq!(info.keywords, vec!["Fantasy fiction", "Children's stories"]);
        assert_eq!(info.series.as_deref(), Some("Alice"));
        assert_eq!(info.series_index.as_deref(), Some("1.0"));
        assert_eq!(info.pages, 3);
    }

    #[test]
    fn test_epub3_collection() {
        let opf = r##"<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Book Two</dc:title>
    <meta property="belongs-to-collection" id="c01">The Saga</meta>
    <meta refines="#c01" property="group-position">2</meta>
  </metadata>
  <spine/>
</package>"##;

        let info = EpubHandler::parse_opf(opf, Path::new("two.epub")).unwrap();
        assert_eq!(info.series.as_deref(), Some("The Saga"));
        assert_eq!(info.series_index.as_deref(), Some("2"));
        assert_eq!(info.pages, 0);
    }

    #[test]
    fn test_title_falls_back_to_filename() {
        let opf = r#"<package xmlns="http://www.idpf.org/2007/opf">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title> </dc:title></metadata>
  <spine><itemref idref="x"/></spine>
</package>"#;

        let info = EpubHandler::parse_opf(opf, Path::new("/books/Untitled Draft.epub")).unwrap();
        assert_eq!(info.title, "Untitled Draft");
        assert!(info.authors.is_empty());
        assert!(info.description.is_none());
        assert_eq!(info.pages, 1);
    }

    #[test]
    fn test_book_info_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alice.epub");
        write_epub(&path, "OEBPS/content.opf", ALICE_OPF);

        let info = EpubHandler.book_info(&path).unwrap();
        assert_eq!(info.title, "Alice's Adventures in Wonderland");
        assert_eq!(info.pages, 3);
    }

    #[test]
    fn test_missing_package_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.epub");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(
            EpubHandler.book_info(&path),
            Err(BookError::Open { .. })
        ));
    }

    #[test]
    fn test_extraction_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EpubHandler.extract_pages(&dir.path().join("a.epub"), dir.path()),
            Err(BookError::ExtractionUnsupported(BookFormat::Epub))
        ));
    }
}
