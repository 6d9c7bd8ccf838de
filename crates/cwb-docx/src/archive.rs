//! Document archive adapter
//!
//! Moves one XML part in and out of a zip-structured document package.
//! Works purely on byte buffers: reading files and writing results is the
//! caller's job.
//!
//! [`replace_part`] always builds a new buffer. Every entry other than the
//! replaced one is copied raw (compressed bytes and headers untouched), in
//! its original position, so the rest of the package stays byte-identical.

use std::io::{Cursor, Read, Write};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxResult, FileFormatError};
use crate::tree::DocumentTree;

/// Main document body part of a WordprocessingML package
pub const DOCUMENT_PART: &str = "word/document.xml";

fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, FileFormatError> {
    ZipArchive::new(Cursor::new(bytes)).map_err(FileFormatError::corrupt)
}

/// Names of all entries, in archive order
///
/// # Errors
/// - `FileFormatError::CorruptArchive` if the bytes are not a readable zip
pub fn list_parts(archive: &[u8]) -> Result<Vec<String>, FileFormatError> {
    let zip = open_archive(archive)?;
    Ok(zip.file_names().map(str::to_string).collect())
}

/// Extract `part` as text
///
/// A leading UTF-8 byte order mark is dropped.
///
/// # Errors
/// - `FileFormatError::CorruptArchive` if the archive or entry cannot be decompressed
/// - `FileFormatError::MissingPart` if `part` is not an entry
/// - `FileFormatError::NotText` if the entry is not UTF-8
pub fn open_part(archive: &[u8], part: &str) -> Result<String, FileFormatError> {
    let mut zip = open_archive(archive)?;
    let mut entry = match zip.by_name(part) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(FileFormatError::missing_part(part)),
        Err(other) => return Err(FileFormatError::corrupt(other)),
    };

    let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry
        .read_to_end(&mut bytes)
        .map_err(FileFormatError::corrupt)?;

    let mut text = String::from_utf8(bytes).map_err(|_| FileFormatError::NotText {
        part: part.to_string(),
    })?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }

    tracing::debug!(part, bytes = text.len(), "opened archive part");
    Ok(text)
}

/// Produce a copy of `archive` with `part` rewritten to `text`
///
/// The replacement keeps the entry's name and position; it is stored if the
/// original was stored and deflated otherwise, with a fixed timestamp so
/// repeated runs produce identical bytes.
///
/// # Errors
/// - `FileFormatError::CorruptArchive` if the archive cannot be read or re-written
/// - `FileFormatError::MissingPart` if `part` is not an entry
pub fn replace_part(archive: &[u8], part: &str, text: &str) -> Result<Vec<u8>, FileFormatError> {
    let mut zip = open_archive(archive)?;
    if zip.index_for_name(part).is_none() {
        return Err(FileFormatError::missing_part(part));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(
        archive.len() + text.len(),
    )));

    for index in 0..zip.len() {
        let entry = zip.by_index_raw(index).map_err(FileFormatError::corrupt)?;
        if entry.name() != part {
            writer
                .raw_copy_file(entry)
                .map_err(FileFormatError::corrupt)?;
            continue;
        }

        let method = match entry.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(zip::DateTime::default());

        writer
            .start_file(part, options)
            .map_err(FileFormatError::corrupt)?;
        writer.write_all(text.as_bytes())?;
    }

    let cursor = writer.finish().map_err(FileFormatError::corrupt)?;
    let bytes = cursor.into_inner();
    tracing::debug!(part, archive_bytes = bytes.len(), "rewrote archive part");
    Ok(bytes)
}

/// Open `part` and parse it into a tree
///
/// # Errors
/// `DocxError::FileFormat` or `DocxError::Parse`; nothing is mutated on failure
pub fn read_tree(archive: &[u8], part: &str) -> DocxResult<DocumentTree> {
    let text = open_part(archive, part)?;
    let tree = DocumentTree::parse(&text)?;
    tracing::debug!(part, nodes = tree.node_count(), "parsed document part");
    Ok(tree)
}

/// Serialize `tree` and write it back as `part` of a copy of `archive`
///
/// # Errors
/// `DocxError::Serialize` or `DocxError::FileFormat`
pub fn write_tree(archive: &[u8], part: &str, tree: &DocumentTree) -> DocxResult<Vec<u8>> {
    let text = tree.serialize()?;
    Ok(replace_part(archive, part, &text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwb_test_utils::PackageBuilder;

    fn package() -> Vec<u8> {
        PackageBuilder::new()
            .part("[Content_Types].xml", "<Types/>")
            .part(DOCUMENT_PART, "<doc>hello</doc>")
            .stored_part("word/media/image1.bin", &[0u8, 1, 2, 3, 255])
            .build()
    }

    #[test]
    fn open_part_reads_text() {
        let text = open_part(&package(), DOCUMENT_PART).unwrap();
        assert_eq!(text, "<doc>hello</doc>");
    }

    #[test]
    fn open_part_missing_entry() {
        let result = open_part(&package(), "word/missing.xml");
        assert!(matches!(result, Err(FileFormatError::MissingPart(ref p)) if p == "word/missing.xml"));
    }

    #[test]
    fn open_part_rejects_non_zip() {
        let result = open_part(b"definitely not a zip", DOCUMENT_PART);
        assert!(matches!(result, Err(FileFormatError::CorruptArchive(_))));
    }

    #[test]
    fn open_part_rejects_binary_part() {
        let archive = PackageBuilder::new()
            .stored_part("blob", &[0xff, 0xfe, 0x00])
            .build();
        assert!(matches!(
            open_part(&archive, "blob"),
            Err(FileFormatError::NotText { .. })
        ));
    }

    #[test]
    fn open_part_strips_bom() {
        let archive = PackageBuilder::new()
            .part(DOCUMENT_PART, "\u{feff}<doc/>")
            .build();
        assert_eq!(open_part(&archive, DOCUMENT_PART).unwrap(), "<doc/>");
    }

    #[test]
    fn replace_part_rewrites_only_target() {
        let original = package();
        let replaced = replace_part(&original, DOCUMENT_PART, "<doc>bye</doc>").unwrap();

        assert_eq!(open_part(&replaced, DOCUMENT_PART).unwrap(), "<doc>bye</doc>");
        assert_eq!(list_parts(&replaced).unwrap(), list_parts(&original).unwrap());

        let mut before = ZipArchive::new(Cursor::new(original.as_slice())).unwrap();
        let mut after = ZipArchive::new(Cursor::new(replaced.as_slice())).unwrap();
        for name in ["[Content_Types].xml", "word/media/image1.bin"] {
            let mut a = Vec::new();
            let mut b = Vec::new();
            before.by_name(name).unwrap().read_to_end(&mut a).unwrap();
            after.by_name(name).unwrap().read_to_end(&mut b).unwrap();
            assert_eq!(a, b, "entry {name} changed");
        }
    }

    fn raw_entries(archive: &[u8]) -> Vec<(String, u32, u64, Vec<u8>)> {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        (0..zip.len())
            .map(|index| {
                let mut entry = zip.by_index_raw(index).unwrap();
                let mut compressed = Vec::new();
                entry.read_to_end(&mut compressed).unwrap();
                (entry.name().to_string(), entry.crc32(), entry.compressed_size(), compressed)
            })
            .collect()
    }

    #[test]
    fn replace_part_keeps_other_entries_compressed_bytes() {
        let original = package();
        let replaced = replace_part(&original, DOCUMENT_PART, "<doc>bye</doc>").unwrap();

        let before = raw_entries(&original);
        let after = raw_entries(&replaced);
        assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(&after) {
            assert_eq!(old.0, new.0);
            if old.0 == DOCUMENT_PART {
                assert_ne!(old.3, new.3);
            } else {
                assert_eq!(old, new, "entry {} changed on disk", old.0);
            }
        }
    }

    #[test]
    fn replace_part_missing_leaves_input_untouched() {
        let original = package();
        let snapshot = original.clone();
        let result = replace_part(&original, "word/nope.xml", "<x/>");
        assert!(matches!(result, Err(FileFormatError::MissingPart(_))));
        assert_eq!(original, snapshot);
    }

    #[test]
    fn read_tree_reports_parse_errors() {
        let archive = PackageBuilder::new().part(DOCUMENT_PART, "<doc><p></doc>").build();
        assert!(matches!(
            read_tree(&archive, DOCUMENT_PART),
            Err(crate::error::DocxError::Parse(_))
        ));
    }

    #[test]
    fn write_tree_round_trips() {
        let original = package();
        let tree = read_tree(&original, DOCUMENT_PART).unwrap();
        let written = write_tree(&original, DOCUMENT_PART, &tree).unwrap();
        assert_eq!(open_part(&written, DOCUMENT_PART).unwrap(), "<doc>hello</doc>");
    }

    #[test]
    fn replace_part_is_deterministic() {
        let original = package();
        let a = replace_part(&original, DOCUMENT_PART, "<doc>x</doc>").unwrap();
        let b = replace_part(&original, DOCUMENT_PART, "<doc>x</doc>").unwrap();
        assert_eq!(a, b);

        let again = replace_part(&a, DOCUMENT_PART, "<doc>x</doc>").unwrap();
        assert_eq!(again, a);
    }
}
