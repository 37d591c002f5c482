use crate::error::Error;

/// Skin type labels, positionally aligned with the score vector the
/// prediction endpoint returns.
pub const SKIN_TYPE_LABELS: [&str; 4] = ["Oily Skin", "Normal Skin", "Dry Skin", "Sensitive Skin"];

/// Map a score vector to its label and winning score.
///
/// The vector must be exactly as long as the label set; the endpoint is not
/// trusted on shape. Ties resolve to the lowest index. NaN never wins a
/// comparison, so a NaN score cannot displace a real maximum.
pub fn best_label(scores: &[f32]) -> Result<(&'static str, f32), Error> {
    if scores.len() != SKIN_TYPE_LABELS.len() {
        return Err(Error::MalformedPrediction(format!(
            "expected {} scores, got {}",
            SKIN_TYPE_LABELS.len(),
            scores.len()
        )));
    }

    let mut best = 0;
    for (idx, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = idx;
        }
    }

    Ok((SKIN_TYPE_LABELS[best], scores[best]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_maximum_score() {
        let (label, score) = best_label(&[0.05, 0.10, 0.80, 0.05]).unwrap();
        assert_eq!(label, "Dry Skin");
        assert!((score - 0.80).abs() < f32::EPSILON);
    }

    #[test]
    fn ties_resolve_to_the_lowest_index() {
        let (label, _) = best_label(&[0.1, 0.7, 0.7, 0.05]).unwrap();
        assert_eq!(label, "Normal Skin");
    }

    #[test]
    fn first_position_can_win() {
        let (label, _) = best_label(&[0.9, 0.05, 0.03, 0.02]).unwrap();
        assert_eq!(label, "Oily Skin");
    }

    #[test]
    fn last_position_can_win() {
        let (label, _) = best_label(&[0.1, 0.1, 0.1, 0.7]).unwrap();
        assert_eq!(label, "Sensitive Skin");
    }

    #[test]
    fn short_vector_is_malformed() {
        match best_label(&[0.5, 0.5]) {
            Err(Error::MalformedPrediction(msg)) => assert!(msg.contains("got 2")),
            other => panic!("expected malformed prediction, got {:?}", other),
        }
    }

    #[test]
    fn long_vector_is_malformed() {
        assert!(matches!(
            best_label(&[0.1, 0.2, 0.3, 0.2, 0.2]),
            Err(Error::MalformedPrediction(_))
        ));
    }

    #[test]
    fn empty_vector_is_malformed() {
        assert!(matches!(best_label(&[]), Err(Error::MalformedPrediction(_))));
    }

    #[test]
    fn nan_does_not_displace_a_real_maximum() {
        let (label, _) = best_label(&[0.2, f32::NAN, 0.6, 0.1]).unwrap();
        assert_eq!(label, "Dry Skin");
    }
}
