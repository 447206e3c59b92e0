use std::collections::BTreeMap;

use super::gps::GpsTagSet;
use super::rational::Rational;
use crate::synth::IdentityTagSet;

// 0th IFD
pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_SOFTWARE: u16 = 0x0131;
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
pub const TAG_GPS_IFD_POINTER: u16 = 0x8825;

// GPS IFD
pub const TAG_GPS_LATITUDE_REF: u16 = 0x0001;
pub const TAG_GPS_LATITUDE: u16 = 0x0002;
pub const TAG_GPS_LONGITUDE_REF: u16 = 0x0003;
pub const TAG_GPS_LONGITUDE: u16 = 0x0004;

/// TIFF field types used by this crate, with their on-disk type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    Byte = 1,
    Ascii = 2,
    Short = 3,
    Long = 4,
    Rational = 5,
}

impl TagFormat {
    /// Size in bytes of one component.
    pub fn unit_size(self) -> usize {
        match self {
            Self::Byte | Self::Ascii => 1,
            Self::Short => 2,
            Self::Long => 4,
            Self::Rational => 8,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

/// A typed tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Byte(Vec<u8>),
    /// Stored NUL-terminated; the terminator is added by the serializer.
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
}

impl TagValue {
    pub fn format(&self) -> TagFormat {
        match self {
            Self::Byte(_) => TagFormat::Byte,
            Self::Ascii(_) => TagFormat::Ascii,
            Self::Short(_) => TagFormat::Short,
            Self::Long(_) => TagFormat::Long,
            Self::Rational(_) => TagFormat::Rational,
        }
    }

    /// Component count as written in the IFD entry.
    pub fn count(&self) -> usize {
        match self {
            Self::Byte(v) => v.len(),
            Self::Ascii(s) => s.len() + 1,
            Self::Short(v) => v.len(),
            Self::Long(v) => v.len(),
            Self::Rational(v) => v.len(),
        }
    }
}

/// Which directory of the EXIF tree a tag lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfdKind {
    Primary,
    Exif,
    Gps,
}

impl IfdKind {
    /// The conventional name of the directory ("0th", "Exif", "GPS").
    pub fn name(self) -> &'static str {
        match self {
            Self::Primary => "0th",
            Self::Exif => "Exif",
            Self::Gps => "GPS",
        }
    }
}

/// One image file directory: tag id to value, kept in tag order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ifd {
    entries: BTreeMap<u16, TagValue>,
}

impl Ifd {
    pub fn insert(&mut self, tag: u16, value: TagValue) -> Option<TagValue> {
        self.entries.insert(tag, value)
    }

    pub fn get(&self, tag: u16) -> Option<&TagValue> {
        self.entries.get(&tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.entries.iter().map(|(tag, value)| (*tag, value))
    }
}

/// The metadata written into each output image: a 0th IFD plus Exif and GPS sub-IFDs.
///
/// Sub-IFD pointer tags are not stored here; the serializer derives them from
/// which sub-IFDs are non-empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifTree {
    pub primary: Ifd,
    pub exif: Ifd,
    pub gps: Ifd,
}

impl ExifTree {
    /// Combine identity and GPS tags into a tree. The Exif IFD stays empty.
    pub fn assemble(identity: &IdentityTagSet, gps: &GpsTagSet) -> Self {
        let mut tree = Self::default();

        tree.primary.insert(TAG_MAKE, TagValue::Ascii(identity.make.clone()));
        tree.primary.insert(TAG_MODEL, TagValue::Ascii(identity.model.clone()));
        tree.primary.insert(TAG_SOFTWARE, TagValue::Ascii(identity.software.clone()));

        tree.gps.insert(TAG_GPS_LATITUDE_REF, TagValue::Ascii(gps.latitude_ref.to_string()));
        tree.gps.insert(TAG_GPS_LATITUDE, TagValue::Rational(gps.latitude.to_vec()));
        tree.gps.insert(TAG_GPS_LONGITUDE_REF, TagValue::Ascii(gps.longitude_ref.to_string()));
        tree.gps.insert(TAG_GPS_LONGITUDE, TagValue::Rational(gps.longitude.to_vec()));

        tree
    }
}
