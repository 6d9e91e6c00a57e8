//! EXIF metadata: capture time, GPS position and camera.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Exif, In, Reader, Tag, Value};
use tracing::{debug, warn};

/// Metadata read from a photo's EXIF block. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    pub taken_at: Option<DateTime<Utc>>,
    /// True when `taken_at` came from `DateTimeOriginal` rather than the
    /// generic `DateTime` tag.
    pub taken_at_original: bool,
    /// Decimal `(latitude, longitude)`.
    pub location: Option<(f64, f64)>,
    pub camera: Option<String>,
}

/// Reads EXIF metadata from an image file.
///
/// Files without EXIF data, or that cannot be parsed, yield empty metadata.
pub fn read_metadata(path: &Path) -> PhotoMetadata {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("cannot open {} for exif: {e}", path.display());
            return PhotoMetadata::default();
        }
    };
    let mut reader = BufReader::new(file);
    match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => from_exif(&exif),
        Err(e) => {
            debug!("no exif in {}: {e}", path.display());
            PhotoMetadata::default()
        }
    }
}

fn from_exif(exif: &Exif) -> PhotoMetadata {
    let mut meta = PhotoMetadata::default();

    if let Some(s) = ascii_field(exif, Tag::DateTimeOriginal) {
        meta.taken_at = parse_exif_datetime(&s);
        meta.taken_at_original = meta.taken_at.is_some();
    }
    if meta.taken_at.is_none() {
        if let Some(s) = ascii_field(exif, Tag::DateTime) {
            meta.taken_at = parse_exif_datetime(&s);
        }
    }

    let camera: Vec<String> = [Tag::Make, Tag::Model]
        .into_iter()
        .filter_map(|tag| ascii_field(exif, tag))
        .collect();
    if !camera.is_empty() {
        meta.camera = Some(camera.join(" "));
    }

    let lat = coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 90.0);
    let lon = coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 180.0);
    if let (Some(lat), Some(lon)) = (lat, lon) {
        meta.location = Some((lat, lon));
    }

    meta
}

/// First ASCII value of a primary-IFD field, trimmed. Empty values count as
/// missing.
fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let s = match &field.value {
        Value::Ascii(values) => String::from_utf8_lossy(values.first()?).into_owned(),
        _ => return None,
    };
    let s = s.trim_end_matches('\0').trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag, max: f64) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let dms: Vec<f64> = match &field.value {
        Value::Rational(values) => values.iter().map(|r| r.to_f64()).collect(),
        _ => return None,
    };
    let reference = ascii_field(exif, ref_tag).unwrap_or_default();
    let value = dms_to_decimal(&dms, &reference)?;
    if value.abs() > max {
        warn!("ignoring out-of-range gps value {value}");
        return None;
    }
    Some(value)
}

/// Converts degrees/minutes/seconds to decimal degrees. South and west
/// references are negative.
pub(crate) fn dms_to_decimal(dms: &[f64], reference: &str) -> Option<f64> {
    let [deg, min, sec] = dms else {
        return None;
    };
    let value = deg + min / 60.0 + sec / 3600.0;
    if !value.is_finite() {
        return None;
    }
    match reference {
        "S" | "W" => Some(-value),
        _ => Some(value),
    }
}

/// Parses the EXIF `YYYY:MM:DD HH:MM:SS` format. EXIF carries no zone; the
/// value is taken as UTC.
pub(crate) fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    match NaiveDateTime::parse_from_str(s.trim(), "%Y:%m:%d %H:%M:%S") {
        Ok(dt) => Some(dt.and_utc()),
        Err(_) => {
            warn!("cannot parse exif datetime {s:?}");
            None
        }
    }
}
