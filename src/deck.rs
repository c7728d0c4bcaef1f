use std::{io::Read as _, path::Path};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::{
    error::{SlidecastError, SlidecastResult},
    model::{Deck, Slide},
};

/// Reads the slide structure and presenter notes of a source deck.
pub trait DeckParser {
    fn open(&self, path: &Path) -> SlidecastResult<Deck>;
}

/// Office Open XML (`.pptx`) deck parser.
///
/// Slide order comes from `p:sldIdLst` in `ppt/presentation.xml` resolved
/// through the presentation relationships; notes come from each slide's
/// notesSlide part, body placeholder only (the slide-image and slide-number
/// placeholders are not presenter notes).
pub struct PptxDeckParser;

/// Slide size when `p:sldSz` is absent (16:9 at 96 dpi).
const DEFAULT_DECK_PX: (u32, u32) = (1280, 720);

/// OOXML lengths are in English Metric Units; 9525 EMU per 96-dpi pixel.
const EMU_PER_PX: u64 = 9525;

impl DeckParser for PptxDeckParser {
    fn open(&self, path: &Path) -> SlidecastResult<Deck> {
        let file = std::fs::File::open(path).map_err(|e| {
            SlidecastError::parse(format!("failed to open deck '{}': {e}", path.display()))
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            SlidecastError::parse(format!("'{}' is not a readable zip archive: {e}", path.display()))
        })?;

        let rels_xml = read_part(&mut archive, "ppt/_rels/presentation.xml.rels")?;
        let rels = read_relationships(&rels_xml)?;
        let presentation_xml = read_part(&mut archive, "ppt/presentation.xml")?;
        let info = parse_presentation_xml(&presentation_xml)?;

        let slide_parts = ordered_slide_parts(&info.slide_rel_ids, &rels);
        let mut slides = Vec::with_capacity(slide_parts.len());
        for part in slide_parts {
            let index = slides.len();
            match read_slide_notes(&mut archive, &part) {
                Ok(notes_text) => slides.push(Slide { index, notes_text }),
                Err(e) => {
                    tracing::warn!(part = %part, error = %e, "skipping unreadable slide part");
                }
            }
        }

        let (width_px, height_px) = info.dimensions_px.unwrap_or(DEFAULT_DECK_PX);
        Ok(Deck {
            source_path: path.to_path_buf(),
            slides,
            width_px,
            height_px,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

#[derive(Debug, Default)]
struct PresentationInfo {
    /// `r:id` values of `p:sldId` entries, in document order.
    slide_rel_ids: Vec<String>,
    dimensions_px: Option<(u32, u32)>,
}

/// Parse an OPC `.rels` part into its relationship entries.
pub(crate) fn read_relationships(xml: &str) -> SlidecastResult<Vec<Relationship>> {
    let mut rels = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => id = value,
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        _ => {}
                    }
                }
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SlidecastError::parse(format!(
                    "error parsing relationships: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

fn parse_presentation_xml(xml: &str) -> SlidecastResult<PresentationInfo> {
    let mut info = PresentationInfo::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                match local_name(e.name().as_ref()) {
                    b"sldId" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"r:id" {
                                info.slide_rel_ids
                                    .push(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }
                    b"sldSz" => {
                        let mut cx = None;
                        let mut cy = None;
                        for attr in e.attributes().flatten() {
                            let value = String::from_utf8_lossy(&attr.value).to_string();
                            match attr.key.as_ref() {
                                b"cx" => cx = value.parse::<u64>().ok(),
                                b"cy" => cy = value.parse::<u64>().ok(),
                                _ => {}
                            }
                        }
                        if let (Some(cx), Some(cy)) = (cx, cy) {
                            info.dimensions_px = Some((emu_to_px(cx), emu_to_px(cy)));
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SlidecastError::parse(format!(
                    "error parsing presentation.xml: {e}"
                )));
            }
            _ => {}
        }
    }

    Ok(info)
}

pub(crate) fn emu_to_px(emu: u64) -> u32 {
    (emu / EMU_PER_PX).max(1).min(u64::from(u32::MAX)) as u32
}

/// Resolve `p:sldIdLst` order to archive part paths. Falls back to the
/// relationship list sorted by numeric id suffix when the id list is empty.
fn ordered_slide_parts(slide_rel_ids: &[String], rels: &[Relationship]) -> Vec<String> {
    let is_slide_rel = |r: &Relationship| {
        r.rel_type.contains("/slide")
            && !r.rel_type.contains("slideLayout")
            && !r.rel_type.contains("slideMaster")
    };

    if !slide_rel_ids.is_empty() {
        return slide_rel_ids
            .iter()
            .filter_map(|rid| rels.iter().find(|r| &r.id == rid && is_slide_rel(r)))
            .map(|r| resolve_part_path("ppt", &r.target))
            .collect();
    }

    let mut slides: Vec<(&Relationship, Option<usize>)> = rels
        .iter()
        .filter(|r| is_slide_rel(r))
        .map(|r| (r, numeric_suffix(&r.id).or_else(|| numeric_suffix(&r.target))))
        .collect();
    slides.sort_by(|a, b| match (a.1, b.1) {
        (Some(na), Some(nb)) => na.cmp(&nb),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.target.cmp(&b.0.target),
    });
    slides
        .into_iter()
        .map(|(r, _)| resolve_part_path("ppt", &r.target))
        .collect()
}

/// Notes text for the slide at `slide_part`, empty when the slide has no
/// notesSlide. A malformed notes part degrades to empty notes rather than
/// failing the deck.
fn read_slide_notes<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    slide_part: &str,
) -> SlidecastResult<String> {
    // The slide part itself must exist for the slide to count at all.
    read_part(archive, slide_part)?;

    let rels_part = rels_path_for(slide_part);
    let Ok(rels_xml) = read_part(archive, &rels_part) else {
        return Ok(String::new());
    };
    let rels = match read_relationships(&rels_xml) {
        Ok(rels) => rels,
        Err(e) => {
            tracing::warn!(part = %slide_part, error = %e, "malformed slide relationships; treating as no notes");
            return Ok(String::new());
        }
    };

    let base_dir = parent_dir(slide_part);
    let Some(notes_part) = rels
        .iter()
        .find(|r| r.rel_type.contains("notesSlide"))
        .map(|r| resolve_part_path(base_dir, &r.target))
    else {
        return Ok(String::new());
    };

    match read_part(archive, &notes_part) {
        Ok(notes_xml) => match parse_notes_xml(&notes_xml) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::warn!(part = %notes_part, error = %e, "malformed notes part; treating as no notes");
                Ok(String::new())
            }
        },
        Err(e) => {
            tracing::warn!(part = %notes_part, error = %e, "missing notes part; treating as no notes");
            Ok(String::new())
        }
    }
}

/// Extract presenter-notes text from a notesSlide part: text runs of shapes
/// whose placeholder type is `body`, paragraphs joined with newlines.
pub(crate) fn parse_notes_xml(xml: &str) -> SlidecastResult<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut notes = String::new();
    let mut shape_text = String::new();
    let mut ph_type: Option<String> = None;
    let mut in_shape = false;
    let mut in_text_body = false;
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    in_shape = true;
                    shape_text.clear();
                    ph_type = None;
                }
                b"txBody" if in_shape => in_text_body = true,
                b"p" if in_text_body => {
                    if !shape_text.is_empty() {
                        shape_text.push('\n');
                    }
                }
                b"t" if in_text_body => in_run_text = true,
                b"ph" if in_shape => ph_type = placeholder_type(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if local_name(e.name().as_ref()) == b"ph" && in_shape {
                    ph_type = placeholder_type(e);
                }
            }
            Ok(Event::Text(ref e)) => {
                if in_run_text {
                    shape_text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => {
                    if ph_type.as_deref() == Some("body") && !shape_text.trim().is_empty() {
                        if !notes.is_empty() {
                            notes.push('\n');
                        }
                        notes.push_str(shape_text.trim());
                    }
                    in_shape = false;
                    in_text_body = false;
                    in_run_text = false;
                }
                b"txBody" => in_text_body = false,
                b"t" => in_run_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SlidecastError::parse(format!("error parsing notes: {e}")));
            }
            _ => {}
        }
    }

    Ok(notes)
}

fn placeholder_type(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"type")
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn read_part<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> SlidecastResult<String> {
    let mut file = archive.by_name(part).map_err(|e| {
        SlidecastError::parse(format!("part not found in archive '{part}': {e}"))
    })?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| SlidecastError::parse(format!("failed to read '{part}': {e}")))?;
    Ok(content)
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`
fn rels_path_for(part: &str) -> String {
    let dir = parent_dir(part);
    let name = part.rsplit('/').next().unwrap_or(part);
    if dir.is_empty() {
        format!("_rels/{name}.rels")
    } else {
        format!("{dir}/_rels/{name}.rels")
    }
}

fn parent_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Resolve a relationship target against the directory of its source part.
/// Absolute targets (leading `/`) are archive-rooted; `..` segments are
/// normalized.
pub(crate) fn resolve_part_path(base_dir: &str, target: &str) -> String {
    let joined = if let Some(abs) = target.strip_prefix('/') {
        abs.to_string()
    } else if base_dir.is_empty() {
        target.to_string()
    } else {
        format!("{base_dir}/{target}")
    };

    let mut stack: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }
    stack.join("/")
}

/// Strip an XML namespace prefix: `p:sp` -> `sp`.
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .position(|&b| b == b':')
        .map_or(name, |pos| &name[pos + 1..])
}

fn numeric_suffix(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml");
    let digits: String = s
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    if digits.is_empty() { None } else { digits.parse().ok() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const REL_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    const REL_NOTES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";

    fn notes_xml(body_text: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<p:notes xmlns:p="urn:p" xmlns:a="urn:a">
  <p:cSld><p:spTree>
    <p:sp>
      <p:nvSpPr><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:r><a:t>{body_text}</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:sp>
      <p:nvSpPr><p:nvPr><p:ph type="sldNum"/></p:nvPr></p:nvSpPr>
      <p:txBody><a:p><a:fld><a:t>7</a:t></a:fld></a:p></p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:notes>"#
        )
    }

    #[test]
    fn notes_take_only_the_body_placeholder() {
        let text = parse_notes_xml(&notes_xml("Hello there")).unwrap();
        assert_eq!(text, "Hello there");
    }

    #[test]
    fn notes_join_paragraphs_with_newlines() {
        let xml = r#"<p:notes xmlns:p="urn:p" xmlns:a="urn:a"><p:cSld><p:spTree>
            <p:sp><p:nvSpPr><p:nvPr><p:ph type="body"/></p:nvPr></p:nvSpPr>
            <p:txBody><a:p><a:r><a:t>first</a:t></a:r></a:p><a:p><a:r><a:t>second</a:t></a:r></a:p></p:txBody>
            </p:sp></p:spTree></p:cSld></p:notes>"#;
        assert_eq!(parse_notes_xml(xml).unwrap(), "first\nsecond");
    }

    #[test]
    fn notes_without_body_placeholder_are_empty() {
        let xml = r#"<p:notes xmlns:p="urn:p" xmlns:a="urn:a"><p:cSld><p:spTree>
            <p:sp><p:nvSpPr><p:nvPr><p:ph type="sldNum"/></p:nvPr></p:nvSpPr>
            <p:txBody><a:p><a:fld><a:t>3</a:t></a:fld></a:p></p:txBody>
            </p:sp></p:spTree></p:cSld></p:notes>"#;
        assert_eq!(parse_notes_xml(xml).unwrap(), "");
    }

    #[test]
    fn relationships_parse_ids_types_targets() {
        let xml = format!(
            r#"<Relationships>
                 <Relationship Id="rId2" Type="{REL_SLIDE}" Target="slides/slide2.xml"/>
                 <Relationship Id="rId1" Type="{REL_SLIDE}" Target="slides/slide1.xml"/>
               </Relationships>"#
        );
        let rels = read_relationships(&xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].id, "rId2");
        assert_eq!(rels[1].target, "slides/slide1.xml");
    }

    #[test]
    fn part_paths_resolve_relative_and_absolute_targets() {
        assert_eq!(
            resolve_part_path("ppt", "slides/slide1.xml"),
            "ppt/slides/slide1.xml"
        );
        assert_eq!(
            resolve_part_path("ppt/slides", "../notesSlides/notesSlide1.xml"),
            "ppt/notesSlides/notesSlide1.xml"
        );
        assert_eq!(
            resolve_part_path("ppt/slides", "/ppt/media/image1.png"),
            "ppt/media/image1.png"
        );
    }

    #[test]
    fn rels_path_sits_next_to_the_part() {
        assert_eq!(
            rels_path_for("ppt/slides/slide1.xml"),
            "ppt/slides/_rels/slide1.xml.rels"
        );
    }

    #[test]
    fn emu_conversion_matches_powerpoint_defaults() {
        // 16:9 PowerPoint default slide size.
        assert_eq!(emu_to_px(12_192_000), 1280);
        assert_eq!(emu_to_px(6_858_000), 720);
    }

    #[test]
    fn numeric_suffix_handles_rids_and_filenames() {
        assert_eq!(numeric_suffix("rId12"), Some(12));
        assert_eq!(numeric_suffix("slide3.xml"), Some(3));
        assert_eq!(numeric_suffix("nodigits"), None);
    }

    /// Build a minimal two-slide `.pptx` in memory: slide order reversed in
    /// the relationships so only `sldIdLst` yields the right order; slide A
    /// has notes, slide B has none.
    fn write_minimal_pptx(path: &std::path::Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();

        let mut put = |name: &str, content: &str| {
            zip.start_file(name, opts).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };

        put(
            "ppt/presentation.xml",
            r#"<p:presentation xmlns:p="urn:p" xmlns:r="urn:r">
                 <p:sldIdLst>
                   <p:sldId id="256" r:id="rIdA"/>
                   <p:sldId id="257" r:id="rIdB"/>
                 </p:sldIdLst>
                 <p:sldSz cx="9144000" cy="6858000"/>
               </p:presentation>"#,
        );
        put(
            "ppt/_rels/presentation.xml.rels",
            &format!(
                r#"<Relationships>
                     <Relationship Id="rIdB" Type="{REL_SLIDE}" Target="slides/slide2.xml"/>
                     <Relationship Id="rIdA" Type="{REL_SLIDE}" Target="slides/slide1.xml"/>
                   </Relationships>"#
            ),
        );
        put("ppt/slides/slide1.xml", "<p:sld xmlns:p=\"urn:p\"/>");
        put("ppt/slides/slide2.xml", "<p:sld xmlns:p=\"urn:p\"/>");
        put(
            "ppt/slides/_rels/slide1.xml.rels",
            &format!(
                r#"<Relationships>
                     <Relationship Id="rId9" Type="{REL_NOTES}" Target="../notesSlides/notesSlide1.xml"/>
                   </Relationships>"#
            ),
        );
        put("ppt/notesSlides/notesSlide1.xml", &notes_xml("Welcome"));

        zip.finish().unwrap();
    }

    #[test]
    fn open_reads_order_notes_and_dimensions() {
        let dir = std::env::temp_dir().join(format!(
            "slidecast_deck_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deck.pptx");
        write_minimal_pptx(&path);

        let deck = PptxDeckParser.open(&path).unwrap();
        assert_eq!(deck.slides.len(), 2);
        assert_eq!(deck.slides[0].index, 0);
        assert_eq!(deck.slides[0].notes_text, "Welcome");
        assert!(deck.slides[0].has_notes());
        assert!(!deck.slides[1].has_notes());
        // 9144000x6858000 EMU is the 4:3 default, 960x720 at 96 dpi.
        assert_eq!(deck.dimensions(), (960, 720));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn open_rejects_a_non_zip_file() {
        let dir = std::env::temp_dir().join(format!(
            "slidecast_deck_bad_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("deck.pptx");
        std::fs::write(&path, b"not a zip").unwrap();

        let err = PptxDeckParser.open(&path).unwrap_err();
        assert!(matches!(err, SlidecastError::Parse(_)));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
