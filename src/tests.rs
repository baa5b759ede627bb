use crate::error::BookError;
use crate::formats::{BookFormat, Bookkeeper, get_book_info, is_valid_book_file};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Encode a solid-colour PNG of the given size.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Write a ZIP archive; names ending in `/` become directory entries.
pub(crate) fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (name, data) in files {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Write an uncompressed TAR archive; names ending in `/` become directories.
pub(crate) fn write_tar(path: &Path, files: &[(&str, &[u8])]) {
    let mut builder = tar::Builder::new(File::create(path).unwrap());
    for (name, data) in files {
        let mut header = tar::Header::new_gnu();
        if name.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_mode(0o755);
        } else {
            header.set_mode(0o644);
        }
        header.set_size(data.len() as u64);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }
    builder.finish().unwrap();
}

/// Write a 7z archive by staging `files` in a scratch directory.
pub(crate) fn write_7z(path: &Path, files: &[(&str, &[u8])]) {
    let staging = tempfile::tempdir().unwrap();
    for (name, data) in files {
        let target = staging.path().join(name);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(target, data).unwrap();
    }
    sevenz_rust::compress_to_path(staging.path(), path).unwrap();
}

/// Write a minimal EPUB holding only its package document.
pub(crate) fn write_epub(path: &Path, opf_path: &str, opf: &str) {
    let container = format!(
        r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{opf_path}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
    );

    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.start_file("META-INF/container.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(container.as_bytes()).unwrap();
    zip.start_file(opf_path, SimpleFileOptions::default())
        .unwrap();
    zip.write_all(opf.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// Write a PDF with `pages` blank 72x144pt pages and an optional info dictionary.
pub(crate) fn write_pdf(path: &Path, pages: usize, info: &[(&str, &str)]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::with_capacity(pages);
    for _ in 0..pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(72),
                Object::Integer(144),
            ],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if !info.is_empty() {
        let mut dict = Dictionary::new();
        for (key, value) in info {
            dict.set(*key, Object::string_literal(*value));
        }
        let info_id = doc.add_object(dict);
        doc.trailer.set("Info", info_id);
    }

    doc.save(path).unwrap();
}

// Dispatcher

#[test]
fn dispatch_accepts_supported_extensions_in_any_case() {
    for ext in ["cbz", "cbr", "cb7", "cbt", "pdf", "epub"] {
        for name in [
            format!("book.{ext}"),
            format!("book.{}", ext.to_uppercase()),
        ] {
            assert!(is_valid_book_file(Path::new(&name)), "{name}");
        }
    }
    for name in ["book.zip", "book.mobi", "book", "book.", "book.cbz.part"] {
        assert!(!is_valid_book_file(Path::new(name)), "{name}");
    }
}

#[test]
fn dispatch_rejects_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    match get_book_info(&path) {
        Err(BookError::UnsupportedFormat(ext)) => assert_eq!(ext, ".txt"),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(matches!(
        Bookkeeper::default().extract(&path, &dir.path().join("out")),
        Err(BookError::UnsupportedFormat(_))
    ));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn dispatch_extract_epub_is_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("novel.epub");
    write_epub(
        &path,
        "content.opf",
        r#"<package xmlns="http://www.idpf.org/2007/opf"><metadata/><spine/></package>"#,
    );

    assert!(matches!(
        Bookkeeper::default().extract(&path, &dir.path().join("out")),
        Err(BookError::ExtractionUnsupported(BookFormat::Epub))
    ));
}

// Comic archives

#[test]
fn info_without_sidecar_uses_stem_and_image_count() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Weekly Strip 12.cbz");
    let page = png_bytes(2, 2);
    write_zip(
        &path,
        &[
            ("scans/", b"".as_slice()),
            ("scans/a.JPEG", page.as_slice()),
            ("scans/b.jpg", page.as_slice()),
            ("scans/c.PNG", page.as_slice()),
            ("scans/d.webp", page.as_slice()),
            ("scans/e.bmp", page.as_slice()),
            ("readme.md", b"# hi".as_slice()),
        ],
    );

    let info = get_book_info(&path).unwrap();
    assert_eq!(info.title, "Weekly Strip 12");
    assert_eq!(info.pages, 4);
}

#[test]
fn info_cbr_holding_zip_opens_by_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mislabelled.cbr");
    write_zip(&path, &[("01.jpg", png_bytes(1, 1).as_slice())]);

    let info = get_book_info(&path).unwrap();
    assert_eq!(info.title, "mislabelled");
    assert_eq!(info.pages, 1);
}

#[test]
fn info_sidecar_in_tar_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("issue.cbt");
    let sidecar = br#"<?xml version="1.0"?>
<ComicInfo xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <Series>Test Comic</Series>
  <Number>5</Number>
  <Year>2023</Year>
  <Month>3</Month>
  <Day>5</Day>
  <Writer>A, B</Writer>
  <Penciller>B, C</Penciller>
  <Genre>Action, Comedy</Genre>
  <Tags>Comedy, Heist</Tags>
  <LanguageISO>en</LanguageISO>
</ComicInfo>"#;
    let page = png_bytes(3, 3);
    write_tar(
        &path,
        &[
            ("issue/", b"".as_slice()),
            ("issue/ComicInfo.xml", sidecar.as_slice()),
            ("issue/p1.jpg", page.as_slice()),
            ("issue/p2.jpg", page.as_slice()),
        ],
    );

    let info = get_book_info(&path).unwrap();
    assert_eq!(info.title, "Test Comic #5");
    assert_eq!(info.series.as_deref(), Some("Test Comic"));
    assert_eq!(info.series_index.as_deref(), Some("5"));
    assert_eq!(info.published_date.as_deref(), Some("2023-03-05"));
    assert_eq!(info.authors, vec!["A", "B", "C"]);
    assert_eq!(info.keywords, vec!["Action", "Comedy", "Heist"]);
    assert_eq!(info.language, vec!["en"]);
    assert_eq!(info.pages, 2);
}

#[test]
fn cb7_info_and_extract() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saga.cb7");
    write_7z(
        &path,
        &[
            (
                "ComicInfo.xml",
                b"<ComicInfo><Series>S</Series><Number>3</Number></ComicInfo>".as_slice(),
            ),
            ("pages/10.png", png_bytes(4, 5).as_slice()),
            ("pages/2.png", png_bytes(4, 5).as_slice()),
            ("pages/bad.jpg", b"not an image".as_slice()),
        ],
    );

    let info = get_book_info(&path).unwrap();
    assert_eq!(info.title, "S #3");
    assert_eq!(info.pages, 3);

    let report = Bookkeeper::default()
        .extract_with_report(&path, &dir.path().join("out"))
        .unwrap();
    let names: Vec<&str> = report.pages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(names, vec!["pages/2.png", "pages/10.png"]);
    assert_eq!((report.pages[0].width, report.pages[0].height), (4, 5));
    assert_eq!(report.dropped, 1);
}

#[test]
fn info_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("repeat.cbz");
    write_zip(
        &path,
        &[
            ("1.png", png_bytes(1, 1).as_slice()),
            (
                "ComicInfo.xml",
                b"<ComicInfo><Title>Again</Title><Writer>W</Writer></ComicInfo>".as_slice(),
            ),
        ],
    );

    let first = get_book_info(&path).unwrap();
    let second = get_book_info(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test]
fn extract_creates_output_and_orders_naturally() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.cbz");
    write_zip(
        &path,
        &[
            ("2.jpg", png_bytes(8, 12).as_slice()),
            ("10.jpg", png_bytes(8, 12).as_slice()),
            ("1.jpg", png_bytes(8, 12).as_slice()),
        ],
    );
    let output = dir.path().join("deep/nested/out");

    let pages = Bookkeeper::default().extract(&path, &output).unwrap();
    let names: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(names, vec!["1.jpg", "2.jpg", "10.jpg"]);
    assert!(output.join("10.jpg").is_file());
}

#[test]
fn extract_drops_undecodable_images_and_reports_them() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.cbz");
    write_zip(
        &path,
        &[
            ("01.png", png_bytes(4, 4).as_slice()),
            ("02.png", b"\x89PNG truncated".as_slice()),
            ("03.webp", b"RIFF".as_slice()),
            ("04.jpg", png_bytes(6, 2).as_slice()),
            ("ComicInfo.xml", b"<ComicInfo/>".as_slice()),
        ],
    );

    let report = Bookkeeper::default()
        .extract_with_report(&path, &dir.path().join("out"))
        .unwrap();

    assert_eq!(report.dropped, 2);
    assert_eq!(report.pages.len(), 2);
    assert!(report.pages.iter().all(|p| p.width > 0 && p.height > 0));
    // content is sniffed, so a PNG named .jpg still probes
    assert_eq!((report.pages[1].width, report.pages[1].height), (6, 2));
}

#[test]
fn extract_corrupt_archive_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.cbz");
    std::fs::write(&path, b"PK\x03\x04 but nothing else").unwrap();

    assert!(matches!(
        Bookkeeper::default().extract(&path, &dir.path().join("out")),
        Err(BookError::Open { .. })
    ));
}

// PDF

#[test]
fn info_pdf_reads_document_info() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_pdf(&path, 4, &[("Title", "Annual Report"), ("Author", "Finance")]);

    let info = get_book_info(&path).unwrap();
    assert_eq!(info.title, "Annual Report");
    assert_eq!(info.authors, vec!["Finance"]);
    assert_eq!(info.pages, 4);
}

#[test]
fn extract_single_page_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.pdf");
    write_pdf(&path, 1, &[]);

    let pages = match Bookkeeper::default().extract(&path, &dir.path().join("out")) {
        Err(BookError::Pdf(reason)) if reason.contains("bind") => {
            eprintln!("skipping: {reason}");
            return;
        }
        other => other.unwrap(),
    };

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].path, "page_01.jpg");
    assert!(pages[0].width > 0 && pages[0].height > 0);
}

// EPUB

#[test]
fn info_epub_through_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pg11.epub");
    write_epub(
        &path,
        "OEBPS/content.opf",
        r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Alice's Adventures in Wonderland</dc:title>
    <dc:creator opf:role="aut">Lewis Carroll</dc:creator>
    <dc:date opf:event="publication">2008-06-27</dc:date>
    <dc:subject>Fantasy fiction</dc:subject>
  </metadata>
  <spine toc="ncx"><itemref idref="a"/><itemref idref="b"/></spine>
</package>"#,
    );

    let info = get_book_info(&path).unwrap();
    assert_eq!(info.title, "Alice's Adventures in Wonderland");
    assert_eq!(info.authors, vec!["Lewis Carroll"]);
    assert_eq!(info.published_date.as_deref(), Some("2008-06-27"));
    assert_eq!(info.keywords, vec!["Fantasy fiction"]);
    assert_eq!(info.pages, 2);
}
