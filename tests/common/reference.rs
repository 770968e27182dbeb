/// Reference 4-connected labelling by flood fill. Returns one label per pixel
/// and the number of labels.
pub fn flood_fill_labels(data: &[u8], width: usize, height: usize) -> (Vec<usize>, usize) {
    const UNSET: usize = usize::MAX;
    let mut labels = vec![UNSET; width * height];
    let mut next = 0;
    let mut stack = Vec::new();

    for seed in 0..data.len() {
        if labels[seed] != UNSET {
            continue;
        }
        let value = data[seed];
        labels[seed] = next;
        stack.push(seed);

        while let Some(i) = stack.pop() {
            let (x, y) = (i % width, i / width);
            let mut visit = |j: usize| {
                if labels[j] == UNSET && data[j] == value {
                    labels[j] = next;
                    stack.push(j);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < width {
                visit(i + 1);
            }
            if y > 0 {
                visit(i - width);
            }
            if y + 1 < height {
                visit(i + width);
            }
        }
        next += 1;
    }
    (labels, next)
}

/// Sizes of the reference regions, sorted.
pub fn region_sizes(data: &[u8], width: usize, height: usize) -> Vec<u32> {
    let (labels, count) = flood_fill_labels(data, width, height);
    let mut sizes = vec![0u32; count];
    for label in labels {
        sizes[label] += 1;
    }
    sizes.sort_unstable();
    sizes
}
