//! Grid geometry for the video area, consumed by the GUI collaborator.

/// Computes the rows x cols grid that holds `count` video surfaces.
///
/// Starts from the integer square root and widens columns before rows, so
/// the grid leans wide rather than tall (2 -> 1x2, 5 -> 2x3, 7 -> 3x3).
pub fn grid_dimensions(count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let mut rows = (count as f64).sqrt() as usize;
    let mut cols = rows;
    if rows * cols < count {
        cols += 1;
    }
    if rows * cols < count {
        rows += 1;
    }
    (rows, cols)
}

/// Row-major cell of a slot inside a grid with `cols` columns.
pub fn slot_cell(slot_index: usize, cols: usize) -> (usize, usize) {
    (slot_index / cols.max(1), slot_index % cols.max(1))
}
