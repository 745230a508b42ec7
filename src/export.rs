//! Rendering highlights to output documents
//!
//! Every format is rendered fully in memory and written with a single call,
//! so a failing export never leaves a partial file behind.

use crate::highlights::Highlight;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Text,
    Docx,
}

impl OutputFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
            OutputFormat::Docx => "docx",
        }
    }

    /// Whether this build can produce the format
    pub fn is_available(&self) -> bool {
        match self {
            OutputFormat::Docx => cfg!(feature = "docx"),
            _ => true,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "txt" | "text" => Ok(OutputFormat::Text),
            "docx" => Ok(OutputFormat::Docx),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown output format: {0}")]
    UnknownFormat(String),
    #[error("{0} output is not available in this build (enable the `docx` feature)")]
    FormatUnavailable(OutputFormat),
    #[error("failed to build document archive: {0}")]
    Archive(String),
}

/// Consecutive highlights sharing a page
fn group_by_page(highlights: &[Highlight]) -> Vec<(u32, Vec<&str>)> {
    let mut groups: Vec<(u32, Vec<&str>)> = Vec::new();
    for h in highlights {
        if let Some((page, texts)) = groups.last_mut() {
            if *page == h.page {
                texts.push(h.text.as_str());
                continue;
            }
        }
        groups.push((h.page, vec![h.text.as_str()]));
    }
    groups
}

/// Markdown: a title, `## Page N` headers and one blockquote per highlight
pub fn to_markdown(highlights: &[Highlight], source_name: &str) -> String {
    let mut out = format!("# Highlights from {}\n\n", source_name);

    for (page, texts) in group_by_page(highlights) {
        out.push_str(&format!("\n## Page {}\n\n", page));
        for text in texts {
            out.push_str(&format!("> {}\n\n", text));
        }
    }

    out
}

/// Plain text: a ruled title, `--- Page N ---` headers and bullet lines
pub fn to_text(highlights: &[Highlight], source_name: &str) -> String {
    let mut out = format!("Highlights from {}\n", source_name);
    out.push_str(&"=".repeat(50));
    out.push_str("\n\n");

    for (page, texts) in group_by_page(highlights) {
        out.push_str(&format!("\n--- Page {} ---\n\n", page));
        for text in texts {
            out.push_str(&format!("* {}\n\n", text));
        }
    }

    out
}

/// Word document bytes
#[cfg(feature = "docx")]
pub fn to_docx(highlights: &[Highlight], source_name: &str) -> Result<Vec<u8>, ExportError> {
    docx::build(highlights, source_name)
}

#[cfg(not(feature = "docx"))]
pub fn to_docx(_highlights: &[Highlight], _source_name: &str) -> Result<Vec<u8>, ExportError> {
    Err(ExportError::FormatUnavailable(OutputFormat::Docx))
}

/// Render highlights in the given format
pub fn render(
    highlights: &[Highlight],
    source_name: &str,
    format: OutputFormat,
) -> Result<Vec<u8>, ExportError> {
    match format {
        OutputFormat::Markdown => Ok(to_markdown(highlights, source_name).into_bytes()),
        OutputFormat::Text => Ok(to_text(highlights, source_name).into_bytes()),
        OutputFormat::Docx => to_docx(highlights, source_name),
    }
}

/// Render and write highlights to `path`
pub fn save<P: AsRef<Path>>(
    highlights: &[Highlight],
    source_name: &str,
    format: OutputFormat,
    path: P,
) -> Result<(), ExportError> {
    let bytes = render(highlights, source_name, format)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(feature = "docx")]
mod docx {
    //! Minimal WordprocessingML package: document, styles and relationships

    use super::{group_by_page, ExportError};
    use crate::highlights::Highlight;
    use quick_xml::escape::escape;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

    const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

    const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:sz w:val="52"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:spacing w:before="480" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:ind w:left="720" w:right="720"/></w:pPr><w:rPr><w:i/></w:rPr></w:style>
</w:styles>"#;

    pub(super) fn build(highlights: &[Highlight], source_name: &str) -> Result<Vec<u8>, ExportError> {
        let document = document_xml(highlights, source_name);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES),
            ("_rels/.rels", PACKAGE_RELS),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS),
            ("word/styles.xml", STYLES),
            ("word/document.xml", document.as_str()),
        ];
        for (name, content) in parts {
            zip.start_file(name, options)
                .map_err(|e| ExportError::Archive(e.to_string()))?;
            zip.write_all(content.as_bytes())?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| ExportError::Archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    fn paragraph(style: &str, text: &str, centered: bool) -> String {
        let justification = if centered { r#"<w:jc w:val="center"/>"# } else { "" };
        format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{}"/>{}</w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            style,
            justification,
            escape(text)
        )
    }

    pub(super) fn document_xml(highlights: &[Highlight], source_name: &str) -> String {
        let mut body = paragraph("Title", &format!("Highlights from {}", source_name), true);

        for (page, texts) in group_by_page(highlights) {
            body.push_str(&paragraph("Heading1", &format!("Page {}", page), false));
            for text in texts {
                body.push_str(&paragraph("Quote", text, false));
            }
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
            body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Highlight> {
        vec![
            Highlight {
                page: 1,
                text: "First passage".into(),
            },
            Highlight {
                page: 1,
                text: "Second passage".into(),
            },
            Highlight {
                page: 3,
                text: "Later passage".into(),
            },
        ]
    }

    #[test]
    fn test_to_markdown() {
        let md = to_markdown(&sample(), "paper.pdf");
        assert_eq!(
            md,
            "# Highlights from paper.pdf\n\n\
             \n## Page 1\n\n> First passage\n\n> Second passage\n\n\
             \n## Page 3\n\n> Later passage\n\n"
        );
    }

    #[test]
    fn test_to_text() {
        let txt = to_text(&sample(), "paper.pdf");
        let title = format!("Highlights from paper.pdf\n{}\n\n", "=".repeat(50));
        assert!(txt.starts_with(&title));
        assert!(txt.contains("\n--- Page 1 ---\n\n* First passage\n\n* Second passage\n\n"));
        assert!(txt.contains("\n--- Page 3 ---\n\n* Later passage\n\n"));
        assert_eq!(txt.matches("--- Page").count(), 2);
    }

    #[test]
    fn test_page_header_repeats_when_page_returns() {
        let highlights = vec![
            Highlight {
                page: 2,
                text: "one".into(),
            },
            Highlight {
                page: 1,
                text: "two".into(),
            },
            Highlight {
                page: 2,
                text: "three".into(),
            },
        ];
        assert_eq!(to_markdown(&highlights, "x.pdf").matches("## Page 2").count(), 2);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("TXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("docx".parse::<OutputFormat>().unwrap(), OutputFormat::Docx);
        assert!(matches!(
            "pdf".parse::<OutputFormat>(),
            Err(ExportError::UnknownFormat(_))
        ));
        assert_eq!(OutputFormat::Docx.extension(), "docx");
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_docx_document_xml() {
        let xml = docx::document_xml(&sample(), "a & b.pdf");
        assert!(xml.contains("Highlights from a &amp; b.pdf"));
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
        assert_eq!(xml.matches(r#"<w:pStyle w:val="Heading1"/>"#).count(), 2);
        assert_eq!(xml.matches(r#"<w:pStyle w:val="Quote"/>"#).count(), 3);
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_docx_is_zip() {
        let bytes = to_docx(&sample(), "paper.pdf").unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[cfg(not(feature = "docx"))]
    #[test]
    fn test_docx_unavailable() {
        assert!(!OutputFormat::Docx.is_available());
        assert!(matches!(
            to_docx(&sample(), "paper.pdf"),
            Err(ExportError::FormatUnavailable(OutputFormat::Docx))
        ));
    }
}
