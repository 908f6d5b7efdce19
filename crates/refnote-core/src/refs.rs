//! Inline file-reference codec.
//!
//! Note text may carry `<<embed:NNNN>>` and `<<attach:NNNN>>` markers that
//! correlate a position in the text with a [`NoteFile`] descriptor by its
//! `file_no`. This module translates between the marker syntax and structured
//! references, and renders mixed text+file content into display segments.
//!
//! The codec never fails on malformed input: anything that is not an exact
//! marker stays literal text, and a marker whose `file_no` has no matching
//! descriptor degrades to a [`Segment::Missing`] placeholder. Partial data
//! (e.g. a file deleted out-of-band) must not corrupt note rendering.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{EmbedType, NoteFile};

/// Combined marker pattern. Markers of either kind are matched in the order
/// they appear in the string, not grouped by kind.
static FILE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<(embed|attach):(\d+)>>").expect("file reference regex"));

/// A decoded file reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Marker kind: `embed` or `attach`.
    pub kind: EmbedType,
    /// The digits exactly as written in the marker.
    pub file_no: String,
}

/// One piece of a rendered note body.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    /// Literal text between markers, preserved verbatim.
    Text(&'a str),
    /// A marker resolved against the note's file list.
    File {
        display: EmbedType,
        file: &'a NoteFile,
    },
    /// A marker whose file_no has no matching descriptor.
    Missing { file_no: &'a str },
}

/// Produce the marker syntax for a file reference.
///
/// `file_no` is emitted exactly as stored (already zero-padded); no
/// re-formatting happens here.
pub fn encode_reference(file_no: &str, embed_type: EmbedType) -> String {
    match embed_type {
        EmbedType::Embed => format!("<<embed:{}>>", file_no),
        EmbedType::Attachment => format!("<<attach:{}>>", file_no),
    }
}

/// Scan `text` left-to-right for file-reference markers.
///
/// Returns the non-overlapping matches in string order. Malformed markers
/// are skipped, never partially consumed; zero matches yields an empty list.
pub fn decode_references(text: &str) -> Vec<FileRef> {
    FILE_REF
        .captures_iter(text)
        .map(|cap| FileRef {
            kind: marker_kind(&cap[1]),
            file_no: cap[2].to_string(),
        })
        .collect()
}

/// Split `text` into display segments, resolving markers against `files`.
///
/// Text between and around matches is preserved verbatim; concatenating the
/// text spans with the original marker spans reproduces the input. Markers
/// referencing an unknown `file_no` become [`Segment::Missing`] rather than
/// an error.
pub fn render_segments<'a>(text: &'a str, files: &'a [NoteFile]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for cap in FILE_REF.captures_iter(text) {
        let m = cap.get(0).expect("whole-pattern match");
        if m.start() > last {
            segments.push(Segment::Text(&text[last..m.start()]));
        }

        let file_no = cap.get(2).expect("file_no group").as_str();
        match files.iter().find(|f| f.file_no == file_no) {
            Some(file) => segments.push(Segment::File {
                display: marker_kind(&cap[1]),
                file,
            }),
            None => segments.push(Segment::Missing { file_no }),
        }

        last = m.end();
    }

    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }

    segments
}

/// Compute the next sequential file number for a note's attachment list.
///
/// Takes the maximum numeric `file_no` among `existing` (non-numeric values
/// are ignored, absence counts as 0) and increments, zero-padded to 4 digits.
/// Beyond 9999 the string grows rather than wrapping: this is unbounded, not
/// truncating.
pub fn next_file_no(existing: &[NoteFile]) -> String {
    let max = existing
        .iter()
        .filter_map(|f| f.file_no.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("{:04}", max + 1)
}

fn marker_kind(name: &str) -> EmbedType {
    if name == "embed" {
        EmbedType::Embed
    } else {
        EmbedType::Attachment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(no: &str) -> NoteFile {
        NoteFile {
            file_no: no.to_string(),
            embed_type: EmbedType::Embed,
            filename: format!("{}.png", no),
            filedata: "aW1n".to_string(),
            mime_type: Some("image/png".to_string()),
            file_size: Some(3),
        }
    }

    #[test]
    fn test_encode_embed_and_attach() {
        assert_eq!(encode_reference("0001", EmbedType::Embed), "<<embed:0001>>");
        assert_eq!(
            encode_reference("0042", EmbedType::Attachment),
            "<<attach:0042>>"
        );
    }

    #[test]
    fn test_encode_does_not_reformat_file_no() {
        // file_no is emitted exactly as given, padding and all
        assert_eq!(encode_reference("7", EmbedType::Embed), "<<embed:7>>");
        assert_eq!(
            encode_reference("10000", EmbedType::Attachment),
            "<<attach:10000>>"
        );
    }

    #[test]
    fn test_round_trip() {
        for kind in [EmbedType::Embed, EmbedType::Attachment] {
            let refs = decode_references(&encode_reference("0007", kind));
            assert_eq!(
                refs,
                vec![FileRef {
                    kind,
                    file_no: "0007".to_string()
                }]
            );
        }
    }

    #[test]
    fn test_decode_preserves_string_order_across_kinds() {
        let refs = decode_references("a <<attach:0002>> b <<embed:0001>> c <<attach:0003>>");
        let got: Vec<(EmbedType, &str)> =
            refs.iter().map(|r| (r.kind, r.file_no.as_str())).collect();
        assert_eq!(
            got,
            vec![
                (EmbedType::Attachment, "0002"),
                (EmbedType::Embed, "0001"),
                (EmbedType::Attachment, "0003"),
            ]
        );
    }

    #[test]
    fn test_decode_empty_and_plain_text() {
        assert!(decode_references("").is_empty());
        assert!(decode_references("no markers here").is_empty());
    }

    #[test]
    fn test_decode_ignores_malformed_markers() {
        // Missing digits, wrong keyword, unclosed, single brackets
        let text = "<<embed:>> <<link:0001>> <<attach:0002 <embed:0003>";
        assert!(decode_references(text).is_empty());
    }

    #[test]
    fn test_render_resolves_files_in_place() {
        let files = vec![file("0001")];
        let segments = render_segments("before <<embed:0001>> after", &files);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Text("before "));
        assert!(matches!(
            segments[1],
            Segment::File {
                display: EmbedType::Embed,
                file: f
            } if f.file_no == "0001"
        ));
        assert_eq!(segments[2], Segment::Text(" after"));
    }

    #[test]
    fn test_render_missing_reference_is_placeholder_not_error() {
        let segments = render_segments("see <<embed:0099>>", &[]);
        assert_eq!(segments[0], Segment::Text("see "));
        assert_eq!(segments[1], Segment::Missing { file_no: "0099" });
    }

    #[test]
    fn test_render_plain_text_passthrough() {
        let segments = render_segments("just text", &[]);
        assert_eq!(segments, vec![Segment::Text("just text")]);
    }

    #[test]
    fn test_render_adjacent_markers_no_empty_gap() {
        let files = vec![file("0001"), file("0002")];
        let segments = render_segments("<<embed:0001>><<embed:0002>>", &files);
        assert_eq!(segments.len(), 2);
        assert!(matches!(segments[0], Segment::File { .. }));
        assert!(matches!(segments[1], Segment::File { .. }));
    }

    #[test]
    fn test_render_segment_coverage() {
        // Concatenating text spans with the original marker spans must
        // reproduce the input; no characters dropped or duplicated.
        let files = vec![file("0001")];
        let text = "a <<embed:0001>> b <<attach:0404>> c";
        let rebuilt: String = render_segments(text, &files)
            .iter()
            .map(|seg| match seg {
                Segment::Text(t) => (*t).to_string(),
                Segment::File { display, file } => encode_reference(&file.file_no, *display),
                Segment::Missing { file_no } => {
                    encode_reference(file_no, EmbedType::Attachment)
                }
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_next_file_no_empty() {
        assert_eq!(next_file_no(&[]), "0001");
    }

    #[test]
    fn test_next_file_no_increments_past_gaps() {
        let files = vec![file("0001"), file("0003")];
        assert_eq!(next_file_no(&files), "0004");
    }

    #[test]
    fn test_next_file_no_ignores_non_numeric() {
        let files = vec![file("abc"), file("0002")];
        assert_eq!(next_file_no(&files), "0003");
        let only_junk = vec![file("abc")];
        assert_eq!(next_file_no(&only_junk), "0001");
    }

    #[test]
    fn test_next_file_no_grows_past_9999() {
        let files = vec![file("9999")];
        assert_eq!(next_file_no(&files), "10000");
    }
}
