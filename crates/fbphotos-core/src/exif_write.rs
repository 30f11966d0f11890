use std::fs;
use std::io::Cursor;
use std::path::Path;

use exif::experimental::Writer;
use exif::{Field, In, Rational, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use crate::gps::{DmsCoordinate, GpsPosition};

/// Datetime tags replaced on every write.
const DATETIME_TAGS: [Tag; 3] = [Tag::DateTime, Tag::DateTimeOriginal, Tag::DateTimeDigitized];

/// GPS tags replaced when a position was resolved.
const GPS_TAGS: [Tag; 4] = [
    Tag::GPSLatitude,
    Tag::GPSLatitudeRef,
    Tag::GPSLongitude,
    Tag::GPSLongitudeRef,
];

/// Check whether a file's extension indicates the embedded-metadata format we
/// can rewrite. Everything else is copied untouched.
pub fn supports_metadata(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("jpg") | Some("jpeg")
    )
}

fn ascii_field(tag: Tag, value: &str) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![value.as_bytes().to_vec()]),
    }
}

fn rational_field(tag: Tag, coord: &DmsCoordinate) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational {
                num: coord.degrees.0,
                denom: coord.degrees.1,
            },
            Rational {
                num: coord.minutes.0,
                denom: coord.minutes.1,
            },
            Rational {
                num: coord.seconds.0,
                denom: coord.seconds.1,
            },
        ]),
    }
}

/// Rewrite the file's EXIF block with the derived datetime and, when one was
/// resolved, the GPS field group. Existing fields other than the ones being
/// set are carried over; the prior APP1 segment is dropped wholesale before
/// the rebuilt one is inserted, so no stale tag block survives.
pub fn embed_metadata(
    path: &Path,
    datetime: &str,
    position: Option<&GpsPosition>,
) -> anyhow::Result<()> {
    let file_bytes = fs::read(path)?;

    let mut fields: Vec<Field> = Vec::new();

    if let Ok(existing) = exif::Reader::new().read_from_container(&mut Cursor::new(&file_bytes)) {
        for field in existing.fields() {
            let replaced = DATETIME_TAGS.contains(&field.tag)
                || (position.is_some() && GPS_TAGS.contains(&field.tag));
            if !replaced {
                fields.push(Field {
                    tag: field.tag,
                    ifd_num: field.ifd_num,
                    value: field.value.clone(),
                });
            }
        }
    }

    for tag in DATETIME_TAGS {
        fields.push(ascii_field(tag, datetime));
    }

    if let Some(pos) = position {
        fields.push(ascii_field(Tag::GPSLatitudeRef, pos.latitude.reference));
        fields.push(rational_field(Tag::GPSLatitude, &pos.latitude));
        fields.push(ascii_field(Tag::GPSLongitudeRef, pos.longitude.reference));
        fields.push(rational_field(Tag::GPSLongitude, &pos.longitude));
    }

    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    let mut exif_buffer = Cursor::new(Vec::new());
    writer
        .write(&mut exif_buffer, false)
        .map_err(|e| anyhow::anyhow!("failed to build exif block for {}: {e}", path.display()))?;

    let mut jpeg = Jpeg::from_bytes(Bytes::from(file_bytes))
        .map_err(|e| anyhow::anyhow!("failed to parse jpeg {}: {e}", path.display()))?;
    jpeg.set_exif(Some(Bytes::from(exif_buffer.into_inner())));
    fs::write(path, jpeg.encoder().bytes())?;

    Ok(())
}

/// A syntactically valid 1x1 JPEG: enough structure for segment-level
/// rewriting without being a decodable photograph.
#[cfg(test)]
pub(crate) fn minimal_jpeg() -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8]; // SOI

    // DQT, one flat table
    bytes.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
    bytes.extend_from_slice(&[1u8; 64]);

    // SOF0, 1x1 grayscale
    bytes.extend_from_slice(&[
        0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x01, 0x00, 0x01, 0x01, 0x01, 0x11, 0x00,
    ]);

    // DHT, single one-bit code for symbol 0
    bytes.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x14, 0x00]);
    let mut counts = [0u8; 16];
    counts[0] = 1;
    bytes.extend_from_slice(&counts);
    bytes.push(0x00);

    // SOS + entropy data + EOI
    bytes.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    bytes.extend_from_slice(&[0x7F, 0xFF, 0xD9]);

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::SECONDS_PRECISION;
    use tempfile::tempdir;

    #[test]
    fn test_supported_extensions() {
        assert!(supports_metadata(Path::new("a.jpg")));
        assert!(supports_metadata(Path::new("a.JPG")));
        assert!(supports_metadata(Path::new("a.jpeg")));
        assert!(!supports_metadata(Path::new("a.png")));
        assert!(!supports_metadata(Path::new("a.mp4")));
        assert!(!supports_metadata(Path::new("noext")));
    }

    #[test]
    fn test_embed_datetime_and_gps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, minimal_jpeg()).unwrap();

        let pos = GpsPosition::from_decimal(37.0, -122.0);
        embed_metadata(&path, "2001:02:03 04:05:06", Some(&pos)).unwrap();

        let bytes = fs::read(&path).unwrap();
        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(&bytes))
            .unwrap();

        for tag in DATETIME_TAGS {
            let field = exif.get_field(tag, In::PRIMARY).unwrap();
            match &field.value {
                Value::Ascii(v) => assert_eq!(v[0], b"2001:02:03 04:05:06"),
                other => panic!("unexpected value for {tag}: {other:?}"),
            }
        }

        let lat = exif.get_field(Tag::GPSLatitude, In::PRIMARY).unwrap();
        match &lat.value {
            Value::Rational(r) => {
                assert_eq!((r[0].num, r[0].denom), (37, 1));
                assert_eq!((r[1].num, r[1].denom), (0, 1));
                assert_eq!((r[2].num, r[2].denom), (0, SECONDS_PRECISION));
            }
            other => panic!("unexpected latitude value: {other:?}"),
        }

        let lat_ref = exif.get_field(Tag::GPSLatitudeRef, In::PRIMARY).unwrap();
        match &lat_ref.value {
            Value::Ascii(v) => assert_eq!(v[0], b"N"),
            other => panic!("unexpected latitude ref: {other:?}"),
        }
        let lon_ref = exif.get_field(Tag::GPSLongitudeRef, In::PRIMARY).unwrap();
        match &lon_ref.value {
            Value::Ascii(v) => assert_eq!(v[0], b"W"),
            other => panic!("unexpected longitude ref: {other:?}"),
        }
    }

    #[test]
    fn test_embed_without_position_sets_no_gps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, minimal_jpeg()).unwrap();

        embed_metadata(&path, "2001:02:03 04:05:06", None).unwrap();

        let bytes = fs::read(&path).unwrap();
        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(&bytes))
            .unwrap();
        assert!(exif.get_field(Tag::DateTime, In::PRIMARY).is_some());
        assert!(exif.get_field(Tag::GPSLatitude, In::PRIMARY).is_none());
    }

    #[test]
    fn test_rewrite_replaces_prior_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, minimal_jpeg()).unwrap();

        embed_metadata(&path, "2001:02:03 04:05:06", None).unwrap();
        embed_metadata(&path, "2010:11:12 13:14:15", None).unwrap();

        let bytes = fs::read(&path).unwrap();
        let exif = exif::Reader::new()
            .read_from_container(&mut Cursor::new(&bytes))
            .unwrap();
        let field = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY).unwrap();
        match &field.value {
            Value::Ascii(v) => {
                assert_eq!(v.len(), 1);
                assert_eq!(v[0], b"2010:11:12 13:14:15");
            }
            other => panic!("unexpected value: {other:?}"),
        }
    }
}
