//! Atlas generation with deterministic shelf packing.
//!
//! Tiles are ordered by height (descending), then width (descending), then id
//! so the same inputs always land in the same places. The atlas width is the
//! next power of two that fits both the widest tile and the square root of
//! the total padded area; the height is whatever the shelves use.
//!
//! Gutters replicate the edge pixels of each tile so mip sampling near a tile
//! border never picks up a neighbour.

use std::collections::HashSet;

use thiserror::Error;

use crate::buffer::TextureBuffer;
use crate::color::Color;

/// Errors that can occur while building an atlas.
#[derive(Debug, Error)]
pub enum AtlasError {
    /// No tiles were supplied.
    #[error("Cannot build an atlas from zero tiles")]
    Empty,

    /// Tile has a zero dimension.
    #[error("Tile '{0}' has a zero dimension")]
    DegenerateTile(String),

    /// Duplicate tile id.
    #[error("Duplicate tile id: '{0}'")]
    DuplicateTileId(String),
}

/// One image to be placed in the atlas.
#[derive(Debug, Clone)]
pub struct AtlasTile {
    /// Stable identifier (used for ordering ties and lookups).
    pub id: String,
    /// Tile pixels.
    pub pixels: TextureBuffer,
}

impl AtlasTile {
    pub fn new(id: impl Into<String>, pixels: TextureBuffer) -> Self {
        Self {
            id: id.into(),
            pixels,
        }
    }
}

/// Where a tile landed (content area, excluding gutter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlacement {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of packing: atlas size plus one placement per input tile, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasLayout {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub placements: Vec<TilePlacement>,
}

#[derive(Debug)]
struct Shelf {
    y: u32,
    height: u32,
    current_x: u32,
}

/// Pack tiles onto shelves.
pub fn pack_shelf(tiles: &[AtlasTile], padding: u32) -> Result<AtlasLayout, AtlasError> {
    if tiles.is_empty() {
        return Err(AtlasError::Empty);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for tile in tiles {
        if tile.pixels.width == 0 || tile.pixels.height == 0 {
            return Err(AtlasError::DegenerateTile(tile.id.clone()));
        }
        if !seen.insert(tile.id.as_str()) {
            return Err(AtlasError::DuplicateTileId(tile.id.clone()));
        }
    }

    let padded = |t: &AtlasTile| (t.pixels.width + padding * 2, t.pixels.height + padding * 2);

    let widest = tiles.iter().map(|t| padded(t).0).max().unwrap_or(1);
    let area: u64 = tiles
        .iter()
        .map(|t| {
            let (w, h) = padded(t);
            w as u64 * h as u64
        })
        .sum();
    let side = (area as f64).sqrt().ceil() as u32;
    let atlas_width = widest.max(side).next_power_of_two();

    let mut order: Vec<usize> = (0..tiles.len()).collect();
    order.sort_by(|&a, &b| {
        let (ta, tb) = (&tiles[a], &tiles[b]);
        tb.pixels
            .height
            .cmp(&ta.pixels.height)
            .then_with(|| tb.pixels.width.cmp(&ta.pixels.width))
            .then_with(|| ta.id.cmp(&tb.id))
    });

    let mut shelves: Vec<Shelf> = Vec::new();
    let mut placements: Vec<Option<TilePlacement>> = vec![None; tiles.len()];

    for idx in order {
        let tile = &tiles[idx];
        let (pw, ph) = padded(tile);

        let fits = shelves
            .iter()
            .position(|s| s.current_x + pw <= atlas_width && ph <= s.height);
        let shelf_idx = match fits {
            Some(i) => i,
            None => {
                let y = shelves.last().map_or(0, |s| s.y + s.height);
                shelves.push(Shelf {
                    y,
                    height: ph,
                    current_x: 0,
                });
                shelves.len() - 1
            }
        };
        let shelf = &mut shelves[shelf_idx];

        placements[idx] = Some(TilePlacement {
            id: tile.id.clone(),
            x: shelf.current_x + padding,
            y: shelf.y + padding,
            width: tile.pixels.width,
            height: tile.pixels.height,
        });
        shelf.current_x += pw;
    }

    let height = shelves.last().map_or(0, |s| s.y + s.height);

    Ok(AtlasLayout {
        width: atlas_width,
        height,
        padding,
        placements: placements.into_iter().flatten().collect(),
    })
}

/// Render tiles into a transparent atlas according to `layout`.
pub fn compose(tiles: &[AtlasTile], layout: &AtlasLayout) -> TextureBuffer {
    let mut atlas = TextureBuffer::new(layout.width, layout.height, Color::transparent());
    for (tile, placement) in tiles.iter().zip(layout.placements.iter()) {
        atlas.blit(&tile.pixels, placement.x, placement.y);
        fill_gutter(&mut atlas, &tile.pixels, placement, layout.padding);
    }
    atlas
}

/// Replicate the nearest edge pixel of the tile into its padding band.
fn fill_gutter(atlas: &mut TextureBuffer, tile: &TextureBuffer, placement: &TilePlacement, padding: u32) {
    if padding == 0 {
        return;
    }
    let x0 = placement.x.saturating_sub(padding);
    let y0 = placement.y.saturating_sub(padding);
    let x1 = (placement.x + placement.width + padding).min(atlas.width);
    let y1 = (placement.y + placement.height + padding).min(atlas.height);

    for y in y0..y1 {
        for x in x0..x1 {
            let inside_x = x >= placement.x && x < placement.x + placement.width;
            let inside_y = y >= placement.y && y < placement.y + placement.height;
            if inside_x && inside_y {
                continue;
            }
            let sx = x.clamp(placement.x, placement.x + placement.width - 1) - placement.x;
            let sy = y.clamp(placement.y, placement.y + placement.height - 1) - placement.y;
            atlas.set(x, y, tile.get(sx, sy));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(id: &str, width: u32, height: u32, color: Color) -> AtlasTile {
        AtlasTile::new(id, TextureBuffer::new(width, height, color))
    }

    fn overlaps(a: &TilePlacement, b: &TilePlacement) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(pack_shelf(&[], 2), Err(AtlasError::Empty)));
    }

    #[test]
    fn test_single_tile() {
        let tiles = vec![tile("skin", 64, 32, Color::rgb(1.0, 0.8, 0.7))];
        let layout = pack_shelf(&tiles, 0).unwrap();

        assert_eq!(layout.width, 64);
        assert_eq!(layout.height, 32);
        assert_eq!(layout.placements[0].x, 0);
        assert_eq!(layout.placements[0].y, 0);
    }

    #[test]
    fn test_tiles_never_overlap() {
        let tiles = vec![
            tile("a", 128, 128, Color::rgb(1.0, 0.0, 0.0)),
            tile("b", 64, 64, Color::rgb(0.0, 1.0, 0.0)),
            tile("c", 128, 64, Color::rgb(0.0, 0.0, 1.0)),
            tile("d", 64, 64, Color::rgb(1.0, 1.0, 0.0)),
        ];
        let layout = pack_shelf(&tiles, 2).unwrap();

        for (i, a) in layout.placements.iter().enumerate() {
            assert!(a.x + a.width <= layout.width);
            assert!(a.y + a.height <= layout.height);
            for b in layout.placements.iter().skip(i + 1) {
                assert!(!overlaps(a, b), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_placements_keep_input_order() {
        let tiles = vec![
            tile("small", 16, 16, Color::white()),
            tile("tall", 16, 64, Color::white()),
        ];
        let layout = pack_shelf(&tiles, 0).unwrap();

        assert_eq!(layout.placements[0].id, "small");
        assert_eq!(layout.placements[1].id, "tall");
        // tallest tile opens the first shelf
        assert_eq!(layout.placements[1].y, 0);
    }

    #[test]
    fn test_duplicate_tile_id() {
        let tiles = vec![
            tile("same", 8, 8, Color::white()),
            tile("same", 8, 8, Color::white()),
        ];
        assert!(matches!(pack_shelf(&tiles, 0), Err(AtlasError::DuplicateTileId(_))));
    }

    #[test]
    fn test_compose_fills_gutter_with_edge_pixels() {
        let red = Color::rgb(1.0, 0.0, 0.0);
        let tiles = vec![tile("red", 4, 4, red)];
        let layout = pack_shelf(&tiles, 2).unwrap();
        let atlas = compose(&tiles, &layout);

        assert_eq!(atlas.get(0, 0), red);
        assert_eq!(atlas.get(layout.placements[0].x, layout.placements[0].y), red);
    }

    #[test]
    fn test_layout_is_deterministic() {
        let tiles = vec![
            tile("b", 32, 32, Color::white()),
            tile("a", 32, 32, Color::white()),
            tile("c", 48, 16, Color::white()),
        ];
        assert_eq!(pack_shelf(&tiles, 1).unwrap(), pack_shelf(&tiles, 1).unwrap());
    }
}
