use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Wire protocol a run retrieves granules over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Protocol {
    Https,
    #[default]
    S3,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::S3 => "s3",
        }
    }

    pub fn matches(self, url: &str) -> bool {
        url.split_once("://")
            .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case(self.scheme()))
    }
}

impl FromStr for Protocol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "s3" => Ok(Self::S3),
            _ => Err(ValidationError::Protocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.scheme()) }
}

/// Named set of file markers selecting which granule files to keep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtensionList {
    /// Every GeoTIFF.
    #[default]
    Tif,
    /// Landsat bands and the quality mask.
    L30,
    /// Sentinel-2 bands and the quality mask.
    S30,
}

impl ExtensionList {
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            Self::Tif => &["tif"],
            Self::L30 => &["B02", "B03", "B04", "B05", "B06", "B07", "Fmask"],
            Self::S30 => &["B02", "B03", "B04", "B8A", "B11", "B12", "Fmask"],
        }
    }
}

impl FromStr for ExtensionList {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TIF" => Ok(Self::Tif),
            "L30" => Ok(Self::L30),
            "S30" => Ok(Self::S30),
            _ => Err(ValidationError::ExtensionList(s.to_string())),
        }
    }
}

/// Keeps URLs on the run's protocol carrying one of the wanted markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlFilter {
    pub protocol:   Protocol,
    pub extensions: ExtensionList,
}

impl UrlFilter {
    pub fn new(protocol: Protocol, extensions: ExtensionList) -> Self { Self { protocol, extensions } }

    pub fn accepts(&self, url: &str) -> bool {
        self.protocol.matches(url) && self.extensions.markers().iter().any(|marker| url.contains(marker))
    }
}
