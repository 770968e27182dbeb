/// Builds a frame from ASCII art. Every distinct character becomes its own
/// pixel value: '.' is 0, '#' is 255, digits map to their numeric value and
/// letters to 100 + their offset from 'A'.
pub fn from_ascii(rows: &[&str]) -> (Vec<u8>, u32, u32) {
    assert!(!rows.is_empty(), "image must have at least one row");
    let width = rows[0].len();
    assert!(rows.iter().all(|r| r.len() == width), "rows must have equal length");

    let data = rows
        .iter()
        .flat_map(|row| row.bytes())
        .map(|c| match c {
            b'.' => 0,
            b'#' => 255,
            b'0'..=b'9' => c - b'0',
            b'A'..=b'Z' => 100 + (c - b'A'),
            other => panic!("unsupported pixel character {:?}", other as char),
        })
        .collect();
    (data, width as u32, rows.len() as u32)
}

/// A checkerboard of `cell`-sized squares alternating between 32 and 220.
pub fn checkerboard_u8(width: usize, height: usize, cell: usize) -> Vec<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    let mut img = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let sum = x / cell + y / cell;
            img[y * width + x] = if sum % 2 == 0 { 32 } else { 220 };
        }
    }
    img
}

/// Vertical teeth on every even column, joined only by the bottom row.
/// Each tooth starts as its own part; the last row merges them all.
pub fn comb(width: usize, height: usize, value: u8) -> Vec<u8> {
    let mut img = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            if x % 2 == 0 || y == height - 1 {
                img[y * width + x] = value;
            }
        }
    }
    img
}

/// Concentric one-pixel rings alternating between 0 and `value`.
pub fn nested_rings(size: usize, value: u8) -> Vec<u8> {
    let mut img = vec![0u8; size * size];
    for y in 0..size {
        for x in 0..size {
            let depth = x.min(y).min(size - 1 - x).min(size - 1 - y);
            img[y * size + x] = if depth % 2 == 0 { 0 } else { value };
        }
    }
    img
}
