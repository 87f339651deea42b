//! DOCX text extraction: unzip the package and stream `word/document.xml`.

use std::io::{BufReader, Cursor};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::extraction::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Returns the text of every paragraph, joined with `\n`.
///
/// Tabs become `\t` and manual line breaks become `\n` inside their paragraph.
/// Paragraphs nested in tables and text boxes are included in document order
/// of their closing tag. Text boxes are read once, from `mc:Choice`; the legacy
/// `mc:Fallback` copy is skipped.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a DOCX package: {e}")))?;
    let document = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::Docx(format!("missing {DOCUMENT_PART}: {e}")))?;

    let paragraphs = read_paragraphs(BufReader::new(document))?;
    debug!("DOCX extracted: {} paragraphs", paragraphs.len());
    Ok(paragraphs.join("\n"))
}

#[derive(Default)]
struct OpenParagraph {
    text: String,
    // Set when a text box paragraph closed inside this one.
    anchors_nested: bool,
}

fn read_paragraphs<R: std::io::BufRead>(source: R) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    // Open paragraphs; text boxes can nest a paragraph inside another.
    let mut open: Vec<OpenParagraph> = Vec::new();
    let mut in_text_run = false;
    // `w:tab` inside paragraph properties is a tab stop, not a tab character.
    let mut in_properties = false;
    let mut fallback_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth += 1;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Fallback" => {
                fallback_depth = fallback_depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Docx(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            Ok(_) if fallback_depth > 0 => {}
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => open.push(OpenParagraph::default()),
                b"pPr" => in_properties = true,
                b"t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if !in_properties => push_char(&mut open, '\t'),
                b"br" | b"cr" => push_char(&mut open, '\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::Docx(format!("bad text run: {e}")))?;
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) if in_text_run => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(done) = open.pop() {
                        if let Some(parent) = open.last_mut() {
                            parent.anchors_nested = true;
                        }
                        // A paragraph that only anchors a text box adds no line of its own.
                        if !(done.anchors_nested && done.text.trim().is_empty()) {
                            paragraphs.push(done.text);
                        }
                    }
                }
                b"pPr" => in_properties = false,
                b"t" => in_text_run = false,
                _ => {}
            },
            Ok(_) => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn push_char(open: &mut [OpenParagraph], c: char) {
    if let Some(current) = open.last_mut() {
        current.text.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::fixtures::{docx_with_body, docx_with_paragraphs};

    #[test]
    fn test_paragraphs_joined_with_newlines() {
        let bytes = docx_with_paragraphs(&["Jane Doe", "Data Analyst", "Python, SQL"]);
        assert_eq!(
            extract_text(&bytes).unwrap(),
            "Jane Doe\nData Analyst\nPython, SQL"
        );
    }

    #[test]
    fn test_runs_within_a_paragraph_are_concatenated() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><w:t xml:space="preserve">Senior </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>Engineer</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Senior Engineer");
    }

    #[test]
    fn test_empty_paragraph_contributes_blank_line() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>Top</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>Bottom</w:t></w:r></w:p>",
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Top\n\nBottom");
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>R&amp;D</w:t><w:tab/><w:t>2020</w:t><w:br/><w:t>Lead</w:t></w:r></w:p>",
        );
        assert_eq!(extract_text(&bytes).unwrap(), "R&D\t2020\nLead");
    }

    #[test]
    fn test_tab_stops_in_paragraph_properties_are_ignored() {
        let bytes = docx_with_body(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Summary</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Summary");
    }

    #[test]
    fn test_table_cells_are_included() {
        let bytes = docx_with_body(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Skill</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t>Rust</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Skill\nRust");
    }

    #[test]
    fn test_text_box_is_read_once() {
        let bytes = docx_with_body(
            r#"<w:p><w:r><mc:AlternateContent xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><mc:Choice Requires="wps"><w:drawing><wps:wsp xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape"><wps:txbx><w:txbxContent><w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p></w:txbxContent></wps:txbx></wps:wsp></w:drawing></mc:Choice><mc:Fallback><w:pict><v:shape xmlns:v="urn:schemas-microsoft-com:vml"><v:textbox><w:txbxContent><w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p></w:txbxContent></v:textbox></v:shape></w:pict></mc:Fallback></mc:AlternateContent></w:r></w:p><w:p><w:r><w:t>Skills</w:t></w:r></w:p>"#,
        );
        let text = extract_text(&bytes).unwrap();
        assert_eq!(text.matches("Jane Doe").count(), 1);
        assert_eq!(text, "Jane Doe\nSkills");
    }

    #[test]
    fn test_anchor_paragraph_keeps_its_own_text() {
        let bytes = docx_with_body(
            "<w:p><w:r><w:t>Header</w:t></w:r><w:r><w:txbxContent><w:p><w:r><w:t>Boxed</w:t></w:r></w:p></w:txbxContent></w:r></w:p>",
        );
        assert_eq!(extract_text(&bytes).unwrap(), "Boxed\nHeader");
    }

    #[test]
    fn test_not_a_zip_fails() {
        let err = extract_text(b"PK? nope").unwrap_err();
        assert!(matches!(err, ExtractionError::Docx(ref m) if m.starts_with("not a DOCX package")));
    }

    #[test]
    fn test_zip_without_document_part_fails() {
        use std::io::Write;
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hello").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_text(&bytes).unwrap_err();
        assert!(err.to_string().contains(DOCUMENT_PART));
    }
}
