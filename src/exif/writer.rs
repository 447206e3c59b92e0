use byteorder::{BigEndian, ByteOrder, LittleEndian};
use img_parts::Bytes;
use img_parts::ImageEXIF;
use img_parts::jpeg::Jpeg;
use serde::{Deserialize, Serialize};

use super::rational::Rational;
use super::tree::*;
use crate::error::{Result, ScrambleError};

const TIFF_MAGIC: u16 = 42;
const HEADER_LEN: usize = 8;
const ENTRY_LEN: usize = 12;

// APP1 payload = "Exif\0\0" + TIFF data, and the segment length field (which
// counts itself) is a u16.
const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const MAX_APP1_PAYLOAD: usize = 65_533;

const MARKER_APP0: u8 = 0xE0;
const MARKER_APP1: u8 = 0xE1;
const MARKER_APP13: u8 = 0xED;
const MARKER_COM: u8 = 0xFE;

/// Byte order of the produced TIFF structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// Motorola order, `MM`.
    #[default]
    Big,
    /// Intel order, `II`.
    Little,
}

impl Endian {
    fn marker(self) -> &'static [u8; 2] {
        match self {
            Self::Big => b"MM",
            Self::Little => b"II",
        }
    }

    fn u16_bytes(self, value: u16) -> [u8; 2] {
        let mut out = [0u8; 2];
        match self {
            Self::Big => BigEndian::write_u16(&mut out, value),
            Self::Little => LittleEndian::write_u16(&mut out, value),
        }
        out
    }

    fn u32_bytes(self, value: u32) -> [u8; 4] {
        let mut out = [0u8; 4];
        match self {
            Self::Big => BigEndian::write_u32(&mut out, value),
            Self::Little => LittleEndian::write_u32(&mut out, value),
        }
        out
    }
}

/// An IFD entry with its value already encoded in the target byte order.
struct RawIfdEntry {
    tag_id: u16,
    format: TagFormat,
    count: u32,
    data: Vec<u8>,
}

impl RawIfdEntry {
    fn is_inline(&self) -> bool {
        self.data.len() <= 4
    }

    /// Bytes this entry occupies in the value area after the entry table.
    fn out_of_line_len(&self) -> usize {
        if self.is_inline() { 0 } else { padded(self.data.len()) }
    }

    fn pointer(tag_id: u16, offset: u32, endian: Endian) -> Self {
        Self {
            tag_id,
            format: TagFormat::Long,
            count: 1,
            data: endian.u32_bytes(offset).to_vec(),
        }
    }
}

fn padded(len: usize) -> usize {
    len + (len & 1)
}

/// Serialize an EXIF tree into the TIFF structure carried by a JPEG APP1 segment.
///
/// Layout: 8-byte header, the 0th IFD and its value area, then the Exif and GPS
/// sub-IFDs (each only when non-empty) in the same format. Every IFD ends the
/// chain with a zero next-IFD offset.
pub fn serialize(tree: &ExifTree, endian: Endian) -> Result<Vec<u8>> {
    let mut primary = encode_ifd(IfdKind::Primary, &tree.primary, endian)?;
    let exif = encode_ifd(IfdKind::Exif, &tree.exif, endian)?;
    let gps = encode_ifd(IfdKind::Gps, &tree.gps, endian)?;

    // Pointer entries are fixed-size, so placeholders give the final 0th IFD size.
    if !exif.is_empty() {
        primary.push(RawIfdEntry::pointer(TAG_EXIF_IFD_POINTER, 0, endian));
    }
    if !gps.is_empty() {
        primary.push(RawIfdEntry::pointer(TAG_GPS_IFD_POINTER, 0, endian));
    }
    primary.sort_by_key(|e| e.tag_id);
    check_entry_count(IfdKind::Primary, &primary)?;

    let primary_offset = HEADER_LEN;
    let exif_offset = primary_offset + ifd_len(&primary);
    let gps_offset = exif_offset + if exif.is_empty() { 0 } else { ifd_len(&exif) };
    let total_len = gps_offset + if gps.is_empty() { 0 } else { ifd_len(&gps) };

    if u32::try_from(total_len).is_err() {
        return Err(ScrambleError::Format(format!(
            "EXIF structure of {total_len} bytes exceeds the 32-bit offset range"
        )));
    }

    for entry in primary.iter_mut() {
        match entry.tag_id {
            TAG_EXIF_IFD_POINTER => entry.data = endian.u32_bytes(exif_offset as u32).to_vec(),
            TAG_GPS_IFD_POINTER => entry.data = endian.u32_bytes(gps_offset as u32).to_vec(),
            _ => {}
        }
    }

    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(endian.marker());
    out.extend_from_slice(&endian.u16_bytes(TIFF_MAGIC));
    out.extend_from_slice(&endian.u32_bytes(primary_offset as u32));

    write_ifd(&mut out, &primary, endian);
    if !exif.is_empty() {
        write_ifd(&mut out, &exif, endian);
    }
    if !gps.is_empty() {
        write_ifd(&mut out, &gps, endian);
    }

    debug_assert_eq!(out.len(), total_len);
    log::debug!(
        "Serialized EXIF: {} bytes, 0th at {primary_offset}, GPS at {}",
        out.len(),
        if gps.is_empty() { 0 } else { gps_offset }
    );
    Ok(out)
}

/// Total bytes of an IFD: count, entry table, next offset and value area.
fn ifd_len(entries: &[RawIfdEntry]) -> usize {
    2 + entries.len() * ENTRY_LEN + 4 + entries.iter().map(RawIfdEntry::out_of_line_len).sum::<usize>()
}

fn check_entry_count(kind: IfdKind, entries: &[RawIfdEntry]) -> Result<()> {
    if entries.len() > u16::MAX as usize {
        return Err(ScrambleError::Format(format!(
            "{} IFD has {} entries, more than a TIFF directory can hold",
            kind.name(),
            entries.len()
        )));
    }
    Ok(())
}

/// Append one IFD at the current end of `out`, which is its offset.
fn write_ifd(out: &mut Vec<u8>, entries: &[RawIfdEntry], endian: Endian) {
    let start = out.len();
    let mut value_offset = start + 2 + entries.len() * ENTRY_LEN + 4;

    out.extend_from_slice(&endian.u16_bytes(entries.len() as u16));
    for entry in entries {
        out.extend_from_slice(&endian.u16_bytes(entry.tag_id));
        out.extend_from_slice(&endian.u16_bytes(entry.format.code()));
        out.extend_from_slice(&endian.u32_bytes(entry.count));
        if entry.is_inline() {
            let mut inline = [0u8; 4];
            inline[..entry.data.len()].copy_from_slice(&entry.data);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&endian.u32_bytes(value_offset as u32));
            value_offset += entry.out_of_line_len();
        }
    }
    // End of chain
    out.extend_from_slice(&endian.u32_bytes(0));

    for entry in entries.iter().filter(|e| !e.is_inline()) {
        out.extend_from_slice(&entry.data);
        if entry.data.len() % 2 == 1 {
            out.push(0);
        }
    }
}

fn encode_ifd(kind: IfdKind, ifd: &Ifd, endian: Endian) -> Result<Vec<RawIfdEntry>> {
    let entries = ifd
        .iter()
        .map(|(tag, value)| encode_entry(kind, tag, value, endian))
        .collect::<Result<Vec<_>>>()?;
    check_entry_count(kind, &entries)?;
    Ok(entries)
}

fn encode_entry(kind: IfdKind, tag: u16, value: &TagValue, endian: Endian) -> Result<RawIfdEntry> {
    let format_err = |msg: String| ScrambleError::Format(format!("{} tag {tag:#06x}: {msg}", kind.name()));

    if kind == IfdKind::Primary && matches!(tag, TAG_EXIF_IFD_POINTER | TAG_GPS_IFD_POINTER) {
        return Err(format_err("sub-IFD pointers are derived, not stored".into()));
    }

    if let Some((format, count)) = declared_shape(kind, tag) {
        if value.format() != format {
            return Err(format_err(format!("expected {format:?}, got {:?}", value.format())));
        }
        if let Some(count) = count {
            if value.count() != count {
                return Err(format_err(format!("expected {count} components, got {}", value.count())));
            }
        }
    }

    let format = value.format();
    let data = encode_value(value, endian).map_err(format_err)?;

    let count = u32::try_from(value.count())
        .map_err(|_| format_err(format!("{} components exceed a u32 count", value.count())))?;
    if data.len() != value.count() * format.unit_size() {
        return Err(format_err(format!(
            "encoded {} bytes for {count} x {format:?}",
            data.len()
        )));
    }

    Ok(RawIfdEntry { tag_id: tag, format, count, data })
}

/// Type and, where fixed, component count the EXIF standard declares for the tags we write.
fn declared_shape(kind: IfdKind, tag: u16) -> Option<(TagFormat, Option<usize>)> {
    match (kind, tag) {
        (IfdKind::Primary, TAG_MAKE | TAG_MODEL | TAG_SOFTWARE) => Some((TagFormat::Ascii, None)),
        (IfdKind::Gps, TAG_GPS_LATITUDE_REF | TAG_GPS_LONGITUDE_REF) => Some((TagFormat::Ascii, Some(2))),
        (IfdKind::Gps, TAG_GPS_LATITUDE | TAG_GPS_LONGITUDE) => Some((TagFormat::Rational, Some(3))),
        _ => None,
    }
}

fn encode_value(value: &TagValue, endian: Endian) -> std::result::Result<Vec<u8>, String> {
    let mut data = Vec::new();
    match value {
        TagValue::Byte(bytes) => data.extend_from_slice(bytes),
        TagValue::Ascii(text) => {
            if !text.is_ascii() {
                return Err(format!("{text:?} is not 7-bit ASCII"));
            }
            if text.contains('\0') {
                return Err(format!("{text:?} contains a NUL byte"));
            }
            data.extend_from_slice(text.as_bytes());
            data.push(0);
        }
        TagValue::Short(values) => {
            for v in values {
                data.extend_from_slice(&endian.u16_bytes(*v));
            }
        }
        TagValue::Long(values) => {
            for v in values {
                data.extend_from_slice(&endian.u32_bytes(*v));
            }
        }
        TagValue::Rational(values) => {
            for r in values {
                let (num, den) = rational_parts(*r)?;
                data.extend_from_slice(&endian.u32_bytes(num));
                data.extend_from_slice(&endian.u32_bytes(den));
            }
        }
    }
    Ok(data)
}

fn rational_parts(r: Rational) -> std::result::Result<(u32, u32), String> {
    if r.denominator == 0 {
        return Err(format!("rational {r} has a zero denominator"));
    }
    let num = u32::try_from(r.numerator).map_err(|_| format!("numerator of {r} exceeds 32 bits"))?;
    let den = u32::try_from(r.denominator).map_err(|_| format!("denominator of {r} exceeds 32 bits"))?;
    Ok((num, den))
}

/// Replace the metadata of a JPEG byte stream with the given TIFF-structured EXIF.
///
/// Existing APP1 (EXIF/XMP), APP13 (IPTC) and COM segments are dropped; the new
/// EXIF segment goes right after any leading APP0 (JFIF) segments.
pub fn embed_in_jpeg(jpeg_bytes: Vec<u8>, tiff: &[u8]) -> Result<Vec<u8>> {
    if EXIF_PREFIX.len() + tiff.len() > MAX_APP1_PAYLOAD {
        return Err(ScrambleError::Format(format!(
            "EXIF payload of {} bytes does not fit in an APP1 segment",
            tiff.len()
        )));
    }

    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_bytes))
        .map_err(|e| ScrambleError::Decode(format!("invalid JPEG structure: {e}")))?;

    jpeg.segments_mut()
        .retain(|s| !matches!(s.marker(), MARKER_APP1 | MARKER_APP13 | MARKER_COM));

    jpeg.set_exif(Some(Bytes::copy_from_slice(tiff)));

    // set_exif() does not put the segment first; EXIF readers expect it ahead of the tables.
    let target_pos = jpeg
        .segments()
        .iter()
        .take_while(|s| s.marker() == MARKER_APP0)
        .count();
    if let Some(pos) = find_exif_segment_pos(&jpeg) {
        if pos != target_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(pos);
            segments.insert(target_pos, seg);
        }
    }

    Ok(jpeg.encoder().bytes().to_vec())
}

/// Find the position of the EXIF APP1 segment in a JPEG.
fn find_exif_segment_pos(jpeg: &Jpeg) -> Option<usize> {
    jpeg.segments()
        .iter()
        .position(|s| s.marker() == MARKER_APP1 && s.contents().starts_with(EXIF_PREFIX))
}
