use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PartitionError;
use crate::tile::TileExtractor;

/// Tiles per job unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 2;

/// Tile id to the set of URLs carrying it, both in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileGroups(IndexMap<String, IndexSet<String>>);

impl TileGroups {
    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn tiles(&self) -> impl Iterator<Item = &str> { self.0.keys().map(String::as_str) }

    pub fn urls(&self, tile: &str) -> Option<&IndexSet<String>> { self.0.get(tile) }

    /// Keep only the first tile.
    #[must_use]
    pub fn smoke(mut self) -> Self {
        self.0.truncate(1);
        self
    }
}

/// Group every URL under its tile id.
///
/// Fails on the first URL without exactly one tile id; nothing is returned
/// for the other URLs in that case.
pub fn group_by_tile<I, S>(extractor: &TileExtractor, urls: I) -> Result<TileGroups, PartitionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for url in urls {
        let url = url.as_ref();
        let tile = extractor.extract(url)?;
        groups.entry(tile).or_default().insert(url.to_string());
    }
    debug!(tiles = groups.len(), "grouped urls by tile");
    Ok(TileGroups(groups))
}

/// A job's worth of tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkBatch {
    pub id:       Uuid,
    pub tile_ids: Vec<String>,
    pub urls:     Vec<String>,
}

/// Cut `groups` into batches of at most `chunk_size` tiles, in map order.
pub fn partition(groups: TileGroups, chunk_size: usize) -> Result<Vec<WorkBatch>, PartitionError> {
    if chunk_size == 0 {
        return Err(PartitionError::ChunkSize);
    }

    let mut batches = Vec::with_capacity(groups.len().div_ceil(chunk_size));
    let mut tiles = groups.0.into_iter().peekable();
    while tiles.peek().is_some() {
        let mut batch = WorkBatch {
            id:       Uuid::new_v4(),
            tile_ids: Vec::with_capacity(chunk_size),
            urls:     Vec::new(),
        };
        for (tile, urls) in tiles.by_ref().take(chunk_size) {
            batch.tile_ids.push(tile);
            batch.urls.extend(urls);
        }
        info!(batch_id = %batch.id, tiles = ?batch.tile_ids, urls = batch.urls.len(), "built work batch");
        batches.push(batch);
    }
    Ok(batches)
}
