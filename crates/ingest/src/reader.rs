use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::upload::{ExtractedText, UploadedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Text,
}

impl FileKind {
    /// Anything that is not `.pdf` or `.docx` is decoded as text.
    pub fn from_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "pdf" => FileKind::Pdf,
            "docx" => FileKind::Docx,
            _ => FileKind::Text,
        }
    }
}

pub struct FileReader;

impl FileReader {
    /// Decode one upload. Never fails: a file that cannot be decoded comes
    /// back as empty text with the reason attached.
    pub fn extract(file: &UploadedFile) -> ExtractedText {
        let kind = FileKind::from_name(&file.name);

        let decoded = match kind {
            FileKind::Pdf => Self::read_pdf(&file.data),
            FileKind::Docx => Self::read_docx(&file.data),
            FileKind::Text => Ok(String::from_utf8_lossy(&file.data).into_owned()),
        };

        match decoded {
            Ok(text) => {
                debug!(file = %file.name, kind = ?kind, chars = text.len(), "Decoded file");
                ExtractedText::decoded(file.name.clone(), text)
            }
            Err(e) => {
                warn!(
                    file = %file.name,
                    kind = ?kind,
                    error = %format!("{:#}", e),
                    "Failed to decode file, continuing with empty text"
                );
                ExtractedText::degraded(file.name.clone(), format!("{:#}", e))
            }
        }
    }

    /// Extract PDF text page by page, joined with newlines.
    ///
    /// The bytes go through a temporary file that is removed when `scratch`
    /// drops, on success and on every error path.
    pub fn read_pdf(data: &[u8]) -> Result<String> {
        Self::read_pdf_in(data, &std::env::temp_dir())
    }

    fn read_pdf_in(data: &[u8], scratch_dir: &Path) -> Result<String> {
        let mut scratch = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".pdf")
            .tempfile_in(scratch_dir)
            .context("Failed to create temporary PDF file")?;
        scratch
            .write_all(data)
            .context("Failed to write temporary PDF file")?;
        scratch.flush().context("Failed to write temporary PDF file")?;

        let document = lopdf::Document::load(scratch.path()).context("Failed to parse PDF")?;

        let pages: Vec<String> = document
            .get_pages()
            .keys()
            .map(|&page| match document.extract_text(&[page]) {
                Ok(text) => text,
                Err(e) => {
                    debug!(page, error = %e, "Page yielded no text");
                    String::new()
                }
            })
            .collect();

        Ok(pages.join("\n"))
    }

    /// Extract DOCX text from `word/document.xml`, entirely in memory.
    pub fn read_docx(data: &[u8]) -> Result<String> {
        let mut archive =
            zip::ZipArchive::new(Cursor::new(data)).context("Invalid DOCX archive")?;

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .context("DOCX is missing word/document.xml")?
            .read_to_string(&mut xml)
            .context("Failed to read word/document.xml")?;

        docx_body_text(&xml)
    }

    /// Load every regular file under `dir` (recursively), sorted by path.
    pub async fn read_directory(dir: &Path) -> Result<Vec<UploadedFile>> {
        let mut paths: Vec<_> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let data = fs::read(&path)
                .await
                .context(format!("Failed to read file: {:?}", path))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            files.push(UploadedFile::new(name, data));
        }

        Ok(files)
    }
}

/// Paragraph and run structure of a WordprocessingML body flattened to text.
fn docx_body_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event().context("Malformed DOCX XML")? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(e) if in_text_run => {
                text.push_str(&e.unescape().context("Invalid DOCX text run")?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use zip::write::SimpleFileOptions;

    /// One page per entry; an empty string gives a page with no text.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = if text.is_empty() {
                Vec::new()
            } else {
                vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ]
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("word/document.xml", options).unwrap();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_name("paper.PDF"), FileKind::Pdf);
        assert_eq!(FileKind::from_name("notes.docx"), FileKind::Docx);
        assert_eq!(FileKind::from_name("chat.txt"), FileKind::Text);
        assert_eq!(FileKind::from_name("README"), FileKind::Text);
    }

    #[test]
    fn test_text_replaces_invalid_bytes() {
        let file = UploadedFile::new("log.txt", b"caf\xff rules".to_vec());
        let extracted = FileReader::extract(&file);

        assert!(!extracted.is_degraded());
        assert_eq!(extracted.text, "caf\u{FFFD} rules");
    }

    #[test]
    fn test_docx_paragraphs_and_runs() {
        let data = docx_with_body(
            r#"<w:p><w:r><w:t>Neural</w:t></w:r><w:r><w:t xml:space="preserve"> plasticity</w:t></w:r></w:p><w:p><w:r><w:t>A &amp; B</w:t><w:tab/><w:t>end</w:t></w:r></w:p>"#,
        );
        let extracted = FileReader::extract(&UploadedFile::new("paper.docx", data));

        assert!(!extracted.is_degraded());
        assert_eq!(extracted.text, "Neural plasticity\nA & B\tend\n");
    }

    #[test]
    fn test_broken_docx_degrades_to_empty() {
        let extracted = FileReader::extract(&UploadedFile::new("broken.docx", b"not a zip".to_vec()));

        assert!(extracted.is_degraded());
        assert!(extracted.text.is_empty());
    }

    #[test]
    fn test_pdf_pages_joined_with_newlines() {
        let data = pdf_with_pages(&["Hello", "", "World"]);

        let extracted = FileReader::extract(&UploadedFile::new("paper.pdf", data));

        assert!(!extracted.is_degraded());
        assert_eq!(extracted.text, "Hello\n\n\nWorld\n");
    }

    #[test]
    fn test_pdf_scratch_file_removed_on_success_and_failure() {
        let scratch = tempfile::tempdir().unwrap();

        assert!(FileReader::read_pdf_in(b"%PDF-garbage", scratch.path()).is_err());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);

        let text = FileReader::read_pdf_in(&pdf_with_pages(&["Hello"]), scratch.path()).unwrap();
        assert!(text.contains("Hello"));
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_broken_pdf_degrades_to_empty() {
        let extracted =
            FileReader::extract(&UploadedFile::new("broken.pdf", b"%PDF-garbage".to_vec()));

        assert!(extracted.is_degraded());
        assert!(extracted.text.is_empty());
        assert_eq!(extracted.name, "broken.pdf");
    }

    #[tokio::test]
    async fn test_read_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "second").unwrap();
        std::fs::write(dir.path().join("a.txt"), "first").unwrap();

        let files = FileReader::read_directory(dir.path()).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();

        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert_eq!(files[0].data, b"first");
    }
}
