//! Coarse raster of the areas a rendered scene covers

use super::item::SceneItem;
use crate::geometry::BoundingBox;

/// Mark every cell touched by an item of the scene.
///
/// Item bounds are read as percentages and scaled onto a `width` x `height`
/// grid (`grid[row][column]`). The walk starts at the marks of the root
/// group's first item and descends into every child.
pub fn occupancy_grid(root: &SceneItem, width: usize, height: usize) -> Vec<Vec<bool>> {
    let mut grid = vec![vec![false; width]; height];
    if width == 0 || height == 0 {
        return grid;
    }

    let scale_x = width as f64 / 100.0;
    let scale_y = height as f64 / 100.0;
    let top_level = root.items.first().map(|group| group.items.as_slice()).unwrap_or_default();
    mark_items(top_level, &mut grid, scale_x, scale_y);
    grid
}

fn mark_items(items: &[SceneItem], grid: &mut [Vec<bool>], scale_x: f64, scale_y: f64) {
    for item in items {
        if let Some(bounds) = item.bounds.filter(|b| !b.is_empty()) {
            mark_cells(&bounds, grid, scale_x, scale_y);
        }
        mark_items(&item.items, grid, scale_x, scale_y);
    }
}

fn mark_cells(bounds: &BoundingBox, grid: &mut [Vec<bool>], scale_x: f64, scale_y: f64) {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);
    let clamp = |v: f64, dim: usize| v.max(0.0).min((dim - 1) as f64) as usize;

    let start_x = clamp((bounds.x1 * scale_x).floor(), cols);
    let end_x = clamp((bounds.x2 * scale_x).ceil(), cols);
    let start_y = clamp((bounds.y1 * scale_y).floor(), rows);
    let end_y = clamp((bounds.y2 * scale_y).ceil(), rows);

    for row in &mut grid[start_y..=end_y] {
        for cell in &mut row[start_x..=end_x] {
            *cell = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scene(marks: serde_json::Value) -> SceneItem {
        serde_json::from_value(json!({"marktype": "group", "items": [{"items": marks}]})).unwrap()
    }

    fn occupied(grid: &[Vec<bool>]) -> usize {
        grid.iter().flatten().filter(|c| **c).count()
    }

    #[test]
    fn test_grid_dimensions_are_rows_by_columns() {
        let grid = occupancy_grid(&scene(json!([])), 20, 10);
        assert_eq!(grid.len(), 10);
        assert!(grid.iter().all(|row| row.len() == 20));
        assert_eq!(occupied(&grid), 0);
    }

    #[test]
    fn test_box_covers_floor_to_ceil_cells() {
        let root = scene(json!([
            {"marktype": "rect", "items": [
                {"bounds": {"x1": 10.5, "y1": 20.0, "x2": 12.2, "y2": 21.0}}
            ]}
        ]));
        let grid = occupancy_grid(&root, 100, 100);
        // columns 10..=13, rows 20..=21
        assert_eq!(occupied(&grid), 8);
        assert!(grid[20][10] && grid[21][13]);
        assert!(!grid[22][10]);
    }

    #[test]
    fn test_out_of_range_bounds_clamp_to_edges() {
        let root = scene(json!([
            {"bounds": {"x1": -50, "y1": 95, "x2": 500, "y2": 300}}
        ]));
        let grid = occupancy_grid(&root, 100, 100);
        assert!(grid[99][0] && grid[99][99] && grid[95][50]);
        assert!(!grid[94][50]);
    }

    #[test]
    fn test_nested_items_and_empty_bounds() {
        let root = scene(json!([
            {"marktype": "group", "items": [
                {"items": [{"marktype": "symbol", "items": [
                    {"bounds": {"x1": 0, "y1": 0, "x2": 0, "y2": 0}}
                ]}]}
            ]},
            {"bounds": {"x1": 5, "y1": 5, "x2": 1, "y2": 1}}
        ]));
        let grid = occupancy_grid(&root, 100, 100);
        assert_eq!(occupied(&grid), 1);
        assert!(grid[0][0]);
    }

    #[test]
    fn test_scaling_to_smaller_grid() {
        let root = scene(json!([{"bounds": {"x1": 50, "y1": 50, "x2": 50, "y2": 50}}]));
        let grid = occupancy_grid(&root, 10, 10);
        assert!(grid[5][5]);
        assert_eq!(occupied(&grid), 1);
    }
}
