use std::collections::HashMap;

/// Percentile rank of every value: `100 * average_rank / count`.
///
/// Ranks are 1-based over the non-missing values; equal values share the mean of
/// their rank positions. Missing values stay missing and do not count.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(idx, v)| v.map(|v| (idx, v)))
        .collect();
    let mut ranks = vec![None; values.len()];
    if present.is_empty() {
        return ranks;
    }
    present.sort_by(|a, b| a.1.total_cmp(&b.1));

    let count = present.len() as f64;
    let mut start = 0;
    while start < present.len() {
        let mut end = start;
        while end + 1 < present.len() && present[end + 1].1 == present[start].1 {
            end += 1;
        }
        // positions start..=end hold ranks start+1..=end+1
        let average = (start + end + 2) as f64 / 2.0;
        for (idx, _) in &present[start..=end] {
            ranks[*idx] = Some(100.0 * average / count);
        }
        start = end + 1;
    }
    ranks
}

/// [`percentile_ranks`] computed separately within each group label.
pub fn grouped_percentile_ranks(values: &[Option<f64>], groups: &[&str]) -> Vec<Option<f64>> {
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, group) in groups.iter().enumerate().take(values.len()) {
        members.entry(*group).or_default().push(idx);
    }

    let mut ranks = vec![None; values.len()];
    for indices in members.values() {
        let subset: Vec<Option<f64>> = indices.iter().map(|&i| values[i]).collect();
        for (&idx, rank) in indices.iter().zip(percentile_ranks(&subset)) {
            ranks[idx] = rank;
        }
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_values() {
        let ranks = percentile_ranks(&[Some(30.0), Some(10.0), Some(20.0), Some(40.0)]);
        assert_eq!(ranks, vec![Some(75.0), Some(25.0), Some(50.0), Some(100.0)]);
    }

    #[test]
    fn test_ties_share_average_rank() {
        let ranks = percentile_ranks(&[Some(5.0), Some(5.0), Some(9.0)]);
        assert_eq!(ranks[0], Some(50.0));
        assert_eq!(ranks[1], Some(50.0));
        assert_eq!(ranks[2], Some(100.0));
    }

    #[test]
    fn test_missing_values_are_excluded() {
        let ranks = percentile_ranks(&[None, Some(1.0), Some(2.0), None]);
        assert_eq!(ranks, vec![None, Some(50.0), Some(100.0), None]);
        assert_eq!(percentile_ranks(&[None, None]), vec![None, None]);
    }

    #[test]
    fn test_invariant_under_positive_scaling() {
        let values = [Some(3.0), Some(-1.5), Some(8.25), Some(3.0), None, Some(0.0)];
        let scaled: Vec<Option<f64>> = values.iter().map(|v| v.map(|v| v * 4.0)).collect();
        assert_eq!(percentile_ranks(&values), percentile_ranks(&scaled));
    }

    #[test]
    fn test_grouped_ranks() {
        let values = [Some(10.0), Some(50.0), Some(20.0), Some(5.0), None];
        let groups = ["PG", "C", "PG", "C", "C"];
        let ranks = grouped_percentile_ranks(&values, &groups);
        assert_eq!(ranks, vec![Some(50.0), Some(100.0), Some(100.0), Some(50.0), None]);
    }

    #[test]
    fn test_single_value_is_top_percentile() {
        assert_eq!(percentile_ranks(&[Some(42.0)]), vec![Some(100.0)]);
    }
}
