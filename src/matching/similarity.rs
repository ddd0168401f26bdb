//! Ratio similarity based on longest common blocks
//!
//! Finds the longest contiguous matching block, then recurses on the
//! unmatched pieces to its left and right. The ratio is
//! `2 * matched / (len(a) + len(b))`.

/// Longest common contiguous block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, size)`. Ties go to the block starting earliest in `a`,
/// then earliest in `b`.
fn longest_match<T: PartialEq>(
    a: &[T],
    b: &[T],
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    // run[j - blo] = length of the common suffix ending at a[i-1], b[j]
    let mut prev = vec![0usize; bhi - blo];
    let mut row = vec![0usize; bhi - blo];
    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo;
            row[k] = if a[i] == b[j] {
                if k > 0 {
                    prev[k - 1] + 1
                } else {
                    1
                }
            } else {
                0
            };
            if row[k] > best.2 {
                best = (i + 1 - row[k], j + 1 - row[k], row[k]);
            }
        }
        std::mem::swap(&mut prev, &mut row);
    }
    best
}

/// Total number of elements in matching blocks
pub fn matched_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut total = 0;
    let mut stack = vec![((0, a.len()), (0, b.len()))];
    while let Some(((alo, ahi), (blo, bhi))) = stack.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let (i, j, size) = longest_match(a, b, (alo, ahi), (blo, bhi));
        if size == 0 {
            continue;
        }
        total += size;
        stack.push(((alo, i), (blo, j)));
        stack.push(((i + size, ahi), (j + size, bhi)));
    }
    total
}

/// Similarity ratio in `[0, 1]`. Two empty inputs are identical.
pub fn ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let len = a.len() + b.len();
    if len == 0 {
        return 1.0;
    }
    2.0 * matched_len(a, b) as f64 / len as f64
}
