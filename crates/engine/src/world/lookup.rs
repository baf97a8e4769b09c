use std::ops::RangeInclusive;

use crate::app::rendering::GridPoint;

use super::chunk::{Chunk, ChunkIndex, WorldBuildError};
use super::entity::FootprintBounds;

/// Dense chunk-coordinate grid over layer 0. Chunk coordinates are
/// `floor(x / chunk_width), floor(y / chunk_height)`; holes in a sparse map
/// are `None`.
#[derive(Debug, Clone)]
pub struct ChunkLookup {
    chunk_width: u32,
    chunk_height: u32,
    origin_column: i32,
    origin_row: i32,
    columns: u32,
    rows: u32,
    cells: Vec<Option<ChunkIndex>>,
}

impl ChunkLookup {
    /// `chunks` must already share one size; that is checked while the layer is built.
    pub fn build(chunks: &[Chunk]) -> Result<Self, WorldBuildError> {
        let Some(first) = chunks.first() else {
            return Err(WorldBuildError::EmptyLayer { layer: 0 });
        };
        let chunk_width = first.width();
        let chunk_height = first.height();

        let mut min_column = i32::MAX;
        let mut min_row = i32::MAX;
        let mut max_column = i32::MIN;
        let mut max_row = i32::MIN;
        for chunk in chunks {
            if chunk.x().rem_euclid(chunk_width as i32) != 0
                || chunk.y().rem_euclid(chunk_height as i32) != 0
            {
                return Err(WorldBuildError::MisalignedChunk {
                    x: chunk.x(),
                    y: chunk.y(),
                    width: chunk_width,
                    height: chunk_height,
                });
            }
            let column = chunk.x().div_euclid(chunk_width as i32);
            let row = chunk.y().div_euclid(chunk_height as i32);
            min_column = min_column.min(column);
            min_row = min_row.min(row);
            max_column = max_column.max(column);
            max_row = max_row.max(row);
        }

        let columns = (max_column - min_column + 1) as u32;
        let rows = (max_row - min_row + 1) as u32;
        let mut lookup = Self {
            chunk_width,
            chunk_height,
            origin_column: min_column,
            origin_row: min_row,
            columns,
            rows,
            cells: vec![None; columns as usize * rows as usize],
        };

        for (index, chunk) in chunks.iter().enumerate() {
            let column = chunk.x().div_euclid(chunk_width as i32);
            let row = chunk.y().div_euclid(chunk_height as i32);
            let Some(cell) = lookup.cell_offset(column, row) else {
                continue;
            };
            if lookup.cells[cell].is_some() {
                return Err(WorldBuildError::DuplicateChunk { column, row });
            }
            lookup.cells[cell] = Some(ChunkIndex(index as u32));
        }

        Ok(lookup)
    }

    pub fn chunk_width(&self) -> u32 {
        self.chunk_width
    }

    pub fn chunk_height(&self) -> u32 {
        self.chunk_height
    }

    /// Chunk coordinates of the chunk that would contain `(x, y)`, or `None`
    /// for non-finite input.
    pub fn chunk_coords(&self, x: f32, y: f32) -> Option<(i32, i32)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some((
            (x / self.chunk_width as f32).floor() as i32,
            (y / self.chunk_height as f32).floor() as i32,
        ))
    }

    pub fn get(&self, column: i32, row: i32) -> Option<ChunkIndex> {
        self.cell_offset(column, row)
            .and_then(|offset| self.cells[offset])
    }

    pub fn chunk_containing(&self, point: GridPoint) -> Option<ChunkIndex> {
        let (column, row) = self.chunk_coords(point.x, point.y)?;
        self.get(column, row)
    }

    /// Column and row ranges of every chunk cell whose half-open tile
    /// rectangle intersects `bounds`, clamped to the grid. `None` when the
    /// bounds miss the grid entirely or are not finite.
    pub fn covering_range(
        &self,
        bounds: FootprintBounds,
    ) -> Option<(RangeInclusive<i32>, RangeInclusive<i32>)> {
        let (first_column, first_row) = self.chunk_coords(bounds.min_x, bounds.min_y)?;
        if !bounds.max_x.is_finite() || !bounds.max_y.is_finite() {
            return None;
        }
        let last_column = ((bounds.max_x / self.chunk_width as f32).ceil() as i32 - 1).max(first_column);
        let last_row = ((bounds.max_y / self.chunk_height as f32).ceil() as i32 - 1).max(first_row);

        let first_column = first_column.max(self.origin_column);
        let first_row = first_row.max(self.origin_row);
        let last_column = last_column.min(self.origin_column + self.columns as i32 - 1);
        let last_row = last_row.min(self.origin_row + self.rows as i32 - 1);
        if first_column > last_column || first_row > last_row {
            return None;
        }
        Some((first_column..=last_column, first_row..=last_row))
    }

    fn cell_offset(&self, column: i32, row: i32) -> Option<usize> {
        let local_column = column.checked_sub(self.origin_column)?;
        let local_row = row.checked_sub(self.origin_row)?;
        if local_column < 0
            || local_row < 0
            || local_column >= self.columns as i32
            || local_row >= self.rows as i32
        {
            return None;
        }
        Some(local_row as usize * self.columns as usize + local_column as usize)
    }
}
