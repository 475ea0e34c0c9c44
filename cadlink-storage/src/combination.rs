//! Structural combination generation for the legacy variant strategy.

use cadlink_core::{normalize_combination, AttributeValueId, ProductFamily, Variant};

/// Picks a combination for a new variant from a family's attribute lines.
pub trait CombinationGenerator: Send + Sync {
    /// First combination of `family` worth materializing given the variants
    /// that already exist, or `None` when there is nothing left to generate.
    fn first_possible(
        &self,
        family: &ProductFamily,
        existing: &[Variant],
    ) -> Option<Vec<AttributeValueId>>;
}

/// Walks the cartesian product of the family's lines in line order, last
/// line varying fastest, and returns the first combination with no variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstUngeneratedCombination;

impl CombinationGenerator for FirstUngeneratedCombination {
    fn first_possible(
        &self,
        family: &ProductFamily,
        existing: &[Variant],
    ) -> Option<Vec<AttributeValueId>> {
        let lines: Vec<&[AttributeValueId]> = family
            .attribute_lines
            .iter()
            .map(|line| line.value_ids.as_slice())
            .filter(|values| !values.is_empty())
            .collect();
        if lines.is_empty() {
            return None;
        }

        let mut cursor = vec![0usize; lines.len()];
        loop {
            let combination =
                normalize_combination(lines.iter().zip(&cursor).map(|(values, &i)| values[i]));
            if !existing.iter().any(|v| v.value_ids == combination) {
                return Some(combination);
            }

            // odometer increment
            let mut position = lines.len();
            loop {
                if position == 0 {
                    return None;
                }
                position -= 1;
                cursor[position] += 1;
                if cursor[position] < lines[position].len() {
                    break;
                }
                cursor[position] = 0;
            }
        }
    }
}
