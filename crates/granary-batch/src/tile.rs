use granary_ledger::ArtifactId;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PartitionError;

/// MGRS tile designator as it appears in HLS file names, e.g. `T22VEQ`.
pub const DEFAULT_TILE_PATTERN: &str = r"\bT\d{2}[A-Z]{3}\b";

static DEFAULT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(DEFAULT_TILE_PATTERN).expect("valid default tile pattern"));

/// Pulls the tile id out of an artifact URL.
#[derive(Debug, Clone)]
pub struct TileExtractor {
    regex: Regex,
}

impl Default for TileExtractor {
    fn default() -> Self {
        Self {
            regex: DEFAULT_REGEX.clone(),
        }
    }
}

impl TileExtractor {
    pub fn new(pattern: &str) -> Result<Self, PartitionError> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn pattern(&self) -> &str { self.regex.as_str() }

    /// The single tile id in the URL's file name.
    ///
    /// The file name is the artifact's ledger id. Zero matches and more than
    /// one match are both errors.
    pub fn extract(&self, url: &str) -> Result<String, PartitionError> {
        let id = ArtifactId::from_url(url).map_err(|_| PartitionError::FileName {
            url: url.to_string(),
        })?;
        let mut matches = self.regex.find_iter(id.as_str()).map(|m| m.as_str());
        match (matches.next(), matches.next()) {
            (Some(tile), None) => Ok(tile.to_string()),
            (first, second) => Err(PartitionError::TileId {
                url:   url.to_string(),
                found: usize::from(first.is_some()) + usize::from(second.is_some()) + matches.count(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HLS: &str =
        "s3://lp-prod-protected/HLSS30.020/HLS.S30.T22VEQ.2021248T143156.v2.0/HLS.S30.T22VEQ.2021248T143156.v2.0.B02.tif";

    #[test]
    fn test_extracts_tile_not_timestamp() {
        let extractor = TileExtractor::default();
        assert_eq!(extractor.extract(HLS).unwrap(), "T22VEQ");
    }

    #[test]
    fn test_tile_only_searched_in_file_name() {
        let extractor = TileExtractor::default();
        let url = "s3://bucket/T11AAA/HLS.L30.T15SUB.2021001T000000.v2.0.Fmask.tif";
        assert_eq!(extractor.extract(url).unwrap(), "T15SUB");
    }

    #[test]
    fn test_tile_read_from_ledger_file_name() {
        let extractor = TileExtractor::default();
        for url in [
            "https://h/T11AAA\\HLS.S30.T22VEQ.2021248T143156.v2.0.B02.tif",
            "https://h/a/HLS.S30.T22VEQ.2021248T143156.v2.0.B02.tif/?T11AAA=1#T12BBB",
        ] {
            let id = ArtifactId::from_url(url).unwrap();
            assert_eq!(id.as_str(), "HLS.S30.T22VEQ.2021248T143156.v2.0.B02.tif");
            assert_eq!(extractor.extract(url).unwrap(), "T22VEQ", "{url}");
        }
    }

    #[test]
    fn test_url_without_file_name_is_an_error() {
        let err = TileExtractor::default().extract("https://h/").unwrap_err();
        assert!(matches!(err, PartitionError::FileName { .. }));
    }

    #[test]
    fn test_repeated_tile_is_an_error() {
        let err = TileExtractor::default()
            .extract("s3://bucket/T22VEQ.T22VEQ.tif")
            .unwrap_err();
        assert!(matches!(err, PartitionError::TileId { found: 2, .. }));
    }

    #[test]
    fn test_no_tile_is_an_error() {
        let err = TileExtractor::default().extract("s3://bucket/readme.txt").unwrap_err();
        assert!(matches!(err, PartitionError::TileId { found: 0, .. }));
    }

    #[test]
    fn test_two_tiles_is_an_error() {
        let err = TileExtractor::default()
            .extract("s3://bucket/T11AAA.T12BBB.tif")
            .unwrap_err();
        assert!(matches!(err, PartitionError::TileId { found: 2, .. }));
    }

    #[test]
    fn test_custom_pattern() {
        let extractor = TileExtractor::new(r"h\d{2}v\d{2}").unwrap();
        assert_eq!(extractor.extract("https://h/MOD09.h12v04.hdf").unwrap(), "h12v04");
        assert!(TileExtractor::new("(").is_err());
    }
}
