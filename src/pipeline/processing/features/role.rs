/// Label and score of the highest-scoring composite.
///
/// `labels` is aligned with `scores`. Ties keep the earliest composite. When every
/// score is missing the label is empty and the score is `None`.
pub fn primary_role(scores: &[Option<f64>], labels: &[String]) -> (String, Option<f64>) {
    let mut best: Option<(usize, f64)> = None;
    for (idx, score) in scores.iter().enumerate() {
        let Some(score) = *score else { continue };
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((idx, score)),
        }
    }
    match best {
        Some((idx, score)) => (
            labels.get(idx).cloned().unwrap_or_default(),
            Some(score),
        ),
        None => (String::new(), None),
    }
}
