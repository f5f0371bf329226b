//! Local file reading for document text.
//!
//! Uses pdf-extract for PDF, and zip + quick-xml for DOCX and ODT containers.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

/// Largest file accepted for extraction (10 MB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type '{mime}', supported formats: {supported}")]
    UnsupportedFileType { mime: String, supported: String },
    #[error("file size {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },
    #[error("failed to extract text: {0}")]
    ExtractionFailed(String),
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Media types accepted for extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Text,
    Doc,
    Docx,
    Odt,
    Rtf,
}

impl MediaType {
    pub const ALL: [MediaType; 6] = [
        Self::Pdf,
        Self::Text,
        Self::Doc,
        Self::Docx,
        Self::Odt,
        Self::Rtf,
    ];

    pub fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain",
            Self::Doc => "application/msword",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Odt => "application/vnd.oasis.opendocument.text",
            Self::Rtf => "text/rtf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Text => "Text",
            Self::Doc => "DOC",
            Self::Docx => "DOCX",
            Self::Odt => "ODT",
            Self::Rtf => "RTF",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.mime() == mime)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" | "md" => Some(Self::Text),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "odt" => Some(Self::Odt),
            "rtf" => Some(Self::Rtf),
            _ => None,
        }
    }

    /// Comma-separated labels of every supported type
    pub fn supported_labels() -> String {
        Self::ALL
            .iter()
            .map(|t| t.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What [`FileTextExtractor::inspect`] learned about a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub media_type: MediaType,
    /// Size in bytes
    pub size: u64,
}

impl FileInfo {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// Extracts plain text from files on the allow-list
#[derive(Debug, Clone)]
pub struct FileTextExtractor {
    max_file_size: u64,
}

impl Default for FileTextExtractor {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
        }
    }
}

impl FileTextExtractor {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Check the file's size and type without reading its content.
    ///
    /// `mime` overrides the type inferred from the file extension.
    pub fn inspect(&self, path: &Path, mime: Option<&str>) -> Result<FileInfo, ExtractError> {
        let size = std::fs::metadata(path)?.len();
        if size > self.max_file_size {
            return Err(ExtractError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        let media_type = match mime {
            Some(mime) => MediaType::from_mime(mime),
            None => MediaType::from_path(path),
        };

        let media_type = media_type.ok_or_else(|| ExtractError::UnsupportedFileType {
            mime: mime
                .map(str::to_string)
                .or_else(|| {
                    path.extension()
                        .map(|e| format!(".{}", e.to_string_lossy()))
                })
                .unwrap_or_else(|| "unknown".to_string()),
            supported: MediaType::supported_labels(),
        })?;
        Ok(FileInfo { media_type, size })
    }

    /// Read the file and return its text
    pub fn extract(&self, path: &Path, mime: Option<&str>) -> Result<String, ExtractError> {
        let media_type = self.inspect(path, mime)?.media_type;
        let data = std::fs::read(path)?;
        let text = extract_bytes(&data, media_type)?;

        tracing::debug!(
            file = %path.display(),
            kind = media_type.label(),
            chars = text.len(),
            "extracted document text"
        );

        if text.trim().is_empty() {
            return Err(ExtractError::ExtractionFailed(
                "no text found in document".to_string(),
            ));
        }
        Ok(text)
    }
}

/// Decode an in-memory document of a known type
pub fn extract_bytes(data: &[u8], media_type: MediaType) -> Result<String, ExtractError> {
    match media_type {
        MediaType::Pdf => pdf_extract::extract_text_from_mem(data)
            .map_err(|e| ExtractError::ExtractionFailed(format!("failed to process PDF: {e}"))),
        MediaType::Text | MediaType::Rtf => String::from_utf8(data.to_vec())
            .map_err(|e| ExtractError::ExtractionFailed(format!("file is not UTF-8: {e}"))),
        MediaType::Docx => {
            let xml = read_zip_entry(data, "word/document.xml")?;
            xml_to_text(&xml, &OfficeXml::DOCX)
        }
        MediaType::Odt => {
            let xml = read_zip_entry(data, "content.xml")?;
            xml_to_text(&xml, &OfficeXml::ODT)
        }
        MediaType::Doc => Err(ExtractError::ExtractionFailed(
            "legacy Word (.doc) documents cannot be read, save the file as DOCX".to_string(),
        )),
    }
}

fn read_zip_entry(data: &[u8], name: &str) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| ExtractError::ExtractionFailed(format!("failed to open document: {e}")))?;
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::ExtractionFailed(format!("missing {name}: {e}")))?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Element names that carry text structure in an office XML body
struct OfficeXml {
    text: &'static [u8],
    paragraphs: &'static [&'static [u8]],
    tab: &'static [u8],
    line_break: &'static [u8],
    /// Space element and the attribute holding its repeat count
    space: Option<(&'static [u8], &'static str)>,
    /// Formatting block whose children describe layout, not content
    properties: Option<&'static [u8]>,
    /// Paragraph bodies carry text outside any text element
    loose_text: bool,
}

impl OfficeXml {
    const DOCX: OfficeXml = OfficeXml {
        text: b"w:t",
        paragraphs: &[b"w:p".as_slice()],
        tab: b"w:tab",
        line_break: b"w:br",
        space: None,
        properties: Some(b"w:pPr".as_slice()),
        loose_text: false,
    };

    const ODT: OfficeXml = OfficeXml {
        text: b"text:span",
        paragraphs: &[b"text:p".as_slice(), b"text:h".as_slice()],
        tab: b"text:tab",
        line_break: b"text:line-break",
        space: Some((b"text:s".as_slice(), "text:c")),
        properties: None,
        loose_text: true,
    };

    fn is_paragraph(&self, name: &[u8]) -> bool {
        self.paragraphs.iter().any(|p| *p == name)
    }

    fn is_properties(&self, name: &[u8]) -> bool {
        self.properties == Some(name)
    }

    /// Number of spaces a space element stands for, or `None` for other elements
    fn space_count(&self, e: &BytesStart) -> Option<usize> {
        let (name, count_attr) = self.space?;
        if e.name().as_ref() != name {
            return None;
        }
        let count = e
            .try_get_attribute(count_attr)
            .ok()
            .flatten()
            .and_then(|a| std::str::from_utf8(&a.value).ok()?.trim().parse().ok())
            .unwrap_or(1);
        Some(count)
    }
}

fn xml_to_text(xml: &str, names: &OfficeXml) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;
    let mut paragraph_depth = 0usize;
    let mut properties_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                if name.as_ref() == names.text {
                    in_text = true;
                } else if names.is_paragraph(name.as_ref()) {
                    paragraph_depth += 1;
                } else if names.is_properties(name.as_ref()) {
                    properties_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == names.text {
                    in_text = false;
                } else if names.is_paragraph(name.as_ref()) {
                    paragraph_depth = paragraph_depth.saturating_sub(1);
                    out.push('\n');
                } else if names.is_properties(name.as_ref()) {
                    properties_depth = properties_depth.saturating_sub(1);
                }
            }
            // tab stops and similar layout definitions are not content
            Ok(Event::Empty(_)) if properties_depth > 0 => {}
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if name.as_ref() == names.tab {
                    out.push('\t');
                } else if name.as_ref() == names.line_break {
                    out.push('\n');
                } else if let Some(count) = names.space_count(&e) {
                    out.push_str(&" ".repeat(count));
                } else if names.is_paragraph(name.as_ref()) {
                    out.push('\n');
                }
            }
            Ok(Event::Text(e)) => {
                if in_text || (names.loose_text && paragraph_depth > 0) {
                    let text = reader
                        .decoder()
                        .decode(&e)
                        .map_err(|e| ExtractError::ExtractionFailed(e.to_string()))?;
                    out.push_str(&text);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text || (names.loose_text && paragraph_depth > 0) {
                    if let Ok(Some(c)) = e.resolve_char_ref() {
                        out.push(c);
                    } else if let Ok(entity) = reader.decoder().decode(&e) {
                        if let Some(resolved) = resolve_predefined_entity(&entity) {
                            out.push_str(resolved);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::ExtractionFailed(format!(
                    "malformed document XML: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with(name: &str, content: &str) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn maps_mime_types_and_extensions() {
        assert_eq!(MediaType::from_mime("application/pdf"), Some(MediaType::Pdf));
        assert_eq!(MediaType::from_mime("TEXT/PLAIN"), Some(MediaType::Text));
        assert_eq!(MediaType::from_mime("image/png"), None);
        assert_eq!(MediaType::from_path(Path::new("notes.DOCX")), Some(MediaType::Docx));
        assert_eq!(MediaType::from_path(Path::new("essay.odt")), Some(MediaType::Odt));
        assert_eq!(MediaType::from_path(Path::new("photo.png")), None);
        assert_eq!(MediaType::supported_labels(), "PDF, Text, DOC, DOCX, ODT, RTF");
    }

    #[test]
    fn rejects_oversized_file_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, vec![b'a'; 2048]).unwrap();

        let extractor = FileTextExtractor::new(1024);
        assert!(matches!(
            extractor.extract(&path, None),
            Err(ExtractError::FileTooLarge { size: 2048, max: 1024 })
        ));
    }

    #[test]
    fn inspect_reports_type_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, vec![0u8; 512 * 1024]).unwrap();

        let info = FileTextExtractor::default().inspect(&path, None).unwrap();
        assert_eq!(info.media_type, MediaType::Pdf);
        assert_eq!(info.size, 512 * 1024);
        assert_eq!(format!("{:.2}", info.size_mb()), "0.50");
    }

    #[test]
    fn rejects_unlisted_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let extractor = FileTextExtractor::default();
        match extractor.extract(&path, None) {
            Err(ExtractError::UnsupportedFileType { mime, supported }) => {
                assert_eq!(mime, ".png");
                assert!(supported.contains("DOCX"));
            }
            other => panic!("expected unsupported type, got {other:?}"),
        }

        let text_path = dir.path().join("notes.txt");
        std::fs::write(&text_path, b"hello").unwrap();
        assert!(matches!(
            extractor.extract(&text_path, Some("image/png")),
            Err(ExtractError::UnsupportedFileType { .. })
        ));
    }

    #[test]
    fn reads_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "First line.\nSecond line.").unwrap();

        let text = FileTextExtractor::default().extract(&path, None).unwrap();
        assert_eq!(text, "First line.\nSecond line.");
    }

    #[test]
    fn empty_text_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "   \n").unwrap();

        assert!(matches!(
            FileTextExtractor::default().extract(&path, None),
            Err(ExtractError::ExtractionFailed(_))
        ));
    }

    #[test]
    fn reads_docx_paragraphs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Rust &amp; friends.</w:t></w:r></w:p>
    <w:p><w:r><w:t>Second</w:t><w:tab/><w:t>paragraph.</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let data = zip_with("word/document.xml", xml);

        let text = extract_bytes(&data, MediaType::Docx).unwrap();
        assert_eq!(text, "Rust & friends.\nSecond\tparagraph.");
    }

    #[test]
    fn reads_odt_paragraphs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
  <office:body><office:text>
    <text:h>Heading</text:h>
    <text:p>Hello<text:s/>there.</text:p>
  </office:text></office:body>
</office:document-content>"#;
        let data = zip_with("content.xml", xml);

        let text = extract_bytes(&data, MediaType::Odt).unwrap();
        assert_eq!(text, "Heading\nHello there.");
    }

    #[test]
    fn legacy_doc_is_not_decoded() {
        assert!(matches!(
            extract_bytes(b"\xd0\xcf\x11\xe0", MediaType::Doc),
            Err(ExtractError::ExtractionFailed(_))
        ));
    }

    #[test]
    fn resolves_character_and_entity_references() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>&#65;&#x263A; &lt;tag&gt; &quot;q&quot; &apos;a&apos; &amp; &#x1F600;</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let data = zip_with("word/document.xml", xml);

        let text = extract_bytes(&data, MediaType::Docx).unwrap();
        assert_eq!(text, "A\u{263A} <tag> \"q\" 'a' & \u{1F600}");
    }

    #[test]
    fn odt_space_runs_keep_their_count() {
        let xml = r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
  <office:body><office:text>
    <text:p>A<text:s text:c="4"/>B<text:s/>C</text:p>
  </office:text></office:body>
</office:document-content>"#;
        let data = zip_with("content.xml", xml);

        let text = extract_bytes(&data, MediaType::Odt).unwrap();
        assert_eq!(text, "A    B C");
    }

    #[test]
    fn docx_tab_stop_definitions_are_not_text() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9360"/></w:tabs></w:pPr>
      <w:r><w:t>Name</w:t><w:tab/><w:t>Value</w:t></w:r>
    </w:p>
  </w:body>
</w:document>"#;
        let data = zip_with("word/document.xml", xml);

        let text = extract_bytes(&data, MediaType::Docx).unwrap();
        assert_eq!(text, "Name\tValue");
    }
}
