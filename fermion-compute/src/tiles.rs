use fermion_core::PixelRect;

/// Generate tiles covering the canvas, sorted by distance from center.
///
/// Center-out ordering means partial snapshots show the middle of the image
/// first.
pub fn generate_tiles(width: u32, height: u32, tile_size: u32) -> Vec<PixelRect> {
    let tile_size = tile_size.max(1);
    let mut tiles = Vec::new();

    for y_start in (0..height).step_by(tile_size as usize) {
        for x_start in (0..width).step_by(tile_size as usize) {
            let w = tile_size.min(width - x_start);
            let h = tile_size.min(height - y_start);
            tiles.push(PixelRect::new(x_start, y_start, w, h));
        }
    }

    let center_x = width as f64 / 2.0;
    let center_y = height as f64 / 2.0;

    tiles.sort_by(|a, b| {
        a.center_distance_sq(center_x, center_y)
            .partial_cmp(&b.center_distance_sq(center_x, center_y))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    tiles
}

/// Deal tiles round-robin into `groups` work lists, keeping center-out order
/// inside each list.
pub fn partition_tiles(tiles: Vec<PixelRect>, groups: usize) -> Vec<Vec<PixelRect>> {
    let groups = groups.max(1);
    let mut out: Vec<Vec<PixelRect>> = (0..groups).map(|_| Vec::new()).collect();
    for (i, tile) in tiles.into_iter().enumerate() {
        out[i % groups].push(tile);
    }
    out.retain(|group| !group.is_empty());
    out
}
