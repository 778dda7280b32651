// src/levenshtein.rs
use crate::error::{DistanceError, Operand};

/// Unit of comparison for text inputs.
///
/// `Bytes` compares raw bytes and is the default; a multi-byte character
/// counts once per differing byte. `Chars` compares Unicode scalar values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    #[default]
    Bytes,
    Chars,
}

/// Levenshtein distance between two sequences with unit costs.
///
/// Uses two rolling rows sized by the shorter input, so working memory is
/// `O(min(a.len(), b.len()))`.
pub fn levenshtein_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (rows, cols) = order_by_length(a, b);
    let previous_row: Vec<usize> = (0..=cols.len()).collect();
    let current_row: Vec<usize> = vec![0; cols.len() + 1];
    fill_rows(rows, cols, previous_row, current_row)
}

/// Like [`levenshtein_distance`], but reports a failed row allocation as
/// [`DistanceError::Allocation`] instead of aborting.
pub fn try_levenshtein_distance<T: PartialEq>(a: &[T], b: &[T]) -> Result<usize, DistanceError> {
    let (rows, cols) = order_by_length(a, b);
    let width = cols
        .len()
        .checked_add(1)
        .ok_or(DistanceError::Allocation { requested: usize::MAX })?;

    let mut previous_row = allocate_row(width)?;
    previous_row.extend(0..width);
    let mut current_row = allocate_row(width)?;
    current_row.resize(width, 0);

    Ok(fill_rows(rows, cols, previous_row, current_row))
}

/// Byte-level distance. Input is treated as opaque bytes.
pub fn byte_distance(a: &[u8], b: &[u8]) -> usize {
    levenshtein_distance(a, b)
}

/// Distance over Unicode scalar values.
pub fn char_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    levenshtein_distance(&a_chars, &b_chars)
}

/// Distance between two strings at the given granularity.
pub fn distance(a: &str, b: &str, granularity: Granularity) -> usize {
    match granularity {
        Granularity::Bytes => byte_distance(a.as_bytes(), b.as_bytes()),
        Granularity::Chars => char_distance(a, b),
    }
}

/// Distance between untrusted raw inputs.
///
/// Under [`Granularity::Chars`] both inputs must be valid UTF-8; the first
/// invalid one is reported rather than lossily replaced. Under
/// [`Granularity::Bytes`] nothing is validated.
pub fn distance_from_bytes(
    a: &[u8],
    b: &[u8],
    granularity: Granularity,
) -> Result<usize, DistanceError> {
    match granularity {
        Granularity::Bytes => try_levenshtein_distance(a, b),
        Granularity::Chars => {
            let a = decode(a, Operand::Left)?;
            let b = decode(b, Operand::Right)?;
            let a_chars: Vec<char> = a.chars().collect();
            let b_chars: Vec<char> = b.chars().collect();
            try_levenshtein_distance(&a_chars, &b_chars)
        }
    }
}

/// Normalised similarity in `[0, 1]`: `1 - distance / longest length`.
/// Two empty inputs are identical.
pub fn similarity(a: &str, b: &str, granularity: Granularity) -> f64 {
    let longest = match granularity {
        Granularity::Bytes => a.len().max(b.len()),
        Granularity::Chars => a.chars().count().max(b.chars().count()),
    };
    if longest == 0 {
        return 1.0;
    }
    1.0 - distance(a, b, granularity) as f64 / longest as f64
}

fn decode(bytes: &[u8], operand: Operand) -> Result<&str, DistanceError> {
    std::str::from_utf8(bytes).map_err(|e| DistanceError::InvalidUtf8 {
        operand,
        valid_up_to: e.valid_up_to(),
    })
}

fn allocate_row(width: usize) -> Result<Vec<usize>, DistanceError> {
    let mut row = Vec::new();
    row.try_reserve_exact(width)
        .map_err(|_| DistanceError::Allocation { requested: width })?;
    Ok(row)
}

// The distance is symmetric, so the shorter input can always index columns.
fn order_by_length<'a, T>(a: &'a [T], b: &'a [T]) -> (&'a [T], &'a [T]) {
    if a.len() >= b.len() {
        (a, b)
    } else {
        (b, a)
    }
}

// `previous_row` must hold `0..=cols.len()` on entry.
fn fill_rows<T: PartialEq>(
    rows: &[T],
    cols: &[T],
    mut previous_row: Vec<usize>,
    mut current_row: Vec<usize>,
) -> usize {
    for (i, row_item) in rows.iter().enumerate() {
        current_row[0] = i + 1;
        for (j, col_item) in cols.iter().enumerate() {
            current_row[j + 1] = if row_item == col_item {
                previous_row[j]
            } else {
                1 + previous_row[j + 1].min(current_row[j]).min(previous_row[j])
            };
        }
        std::mem::swap(&mut previous_row, &mut current_row);
    }
    // After the final swap the last written row lives in `previous_row`.
    previous_row[cols.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_pairs() {
        assert_eq!(byte_distance(b"kitten", b"sitting"), 3);
        assert_eq!(byte_distance(b"flaw", b"lawn"), 2);
        assert_eq!(byte_distance(b"gumbo", b"gambol"), 2);
        assert_eq!(byte_distance(b"abc", b"abd"), 1);
        assert_eq!(byte_distance(b"abc", b"abc"), 0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(byte_distance(b"", b""), 0);
        assert_eq!(byte_distance(b"", b"abc"), 3);
        assert_eq!(byte_distance(b"abc", b""), 3);
    }

    #[test]
    fn test_argument_order_does_not_matter() {
        assert_eq!(byte_distance(b"a", b"abcdef"), 5);
        assert_eq!(byte_distance(b"abcdef", b"a"), 5);
        assert_eq!(byte_distance(b"sitting", b"kitten"), 3);
    }

    #[test]
    fn test_generic_over_element_type() {
        let a = [1u32, 2, 3, 4];
        let b = [1u32, 3, 4, 5];
        assert_eq!(levenshtein_distance(&a, &b), 2);
    }

    #[test]
    fn test_try_matches_infallible() {
        for (a, b) in [("", ""), ("kitten", "sitting"), ("gumbo", "gambol"), ("x", "")] {
            assert_eq!(
                try_levenshtein_distance(a.as_bytes(), b.as_bytes()),
                Ok(byte_distance(a.as_bytes(), b.as_bytes()))
            );
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_rows_report_allocation_failure() {
        // Zero-sized elements make a huge input free; the rows are not.
        let mut v: Vec<()> = Vec::new();
        // SAFETY: `()` is zero-sized and `Vec<()>` has capacity `usize::MAX`.
        unsafe { v.set_len(1usize << 61) };
        assert!(matches!(
            try_levenshtein_distance(&v, &v),
            Err(DistanceError::Allocation { requested }) if requested == (1usize << 61) + 1
        ));
    }

    #[test]
    fn test_bytes_vs_chars() {
        // 'é' is two bytes in UTF-8.
        assert_eq!(distance("cafe", "café", Granularity::Bytes), 2);
        assert_eq!(distance("cafe", "café", Granularity::Chars), 1);
        assert_eq!(char_distance("తెలుగు", "తెలుగు"), 0);
    }

    #[test]
    fn test_default_granularity_is_bytes() {
        assert_eq!(Granularity::default(), Granularity::Bytes);
    }

    #[test]
    fn test_invalid_utf8_rejected_under_chars() {
        let err = distance_from_bytes(b"ab\xff", b"abc", Granularity::Chars).unwrap_err();
        assert_eq!(err, DistanceError::InvalidUtf8 { operand: Operand::Left, valid_up_to: 2 });

        let err = distance_from_bytes(b"abc", b"\xc3", Granularity::Chars).unwrap_err();
        assert_eq!(err, DistanceError::InvalidUtf8 { operand: Operand::Right, valid_up_to: 0 });
    }

    #[test]
    fn test_invalid_utf8_opaque_under_bytes() {
        assert_eq!(distance_from_bytes(b"ab\xff", b"abc", Granularity::Bytes), Ok(1));
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("", "", Granularity::Bytes), 1.0);
        assert_eq!(similarity("abc", "abc", Granularity::Chars), 1.0);
        assert_eq!(similarity("abc", "xyz", Granularity::Bytes), 0.0);
        assert!((similarity("abcd", "abce", Granularity::Bytes) - 0.75).abs() < f64::EPSILON);
    }
}
