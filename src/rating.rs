//! Rating aggregator: derives a product's displayed score from its comments.
//!
//! Invoked explicitly at the comment-append call site, inside the same
//! transaction, so the stored score is never stale relative to the stored
//! comment collection.

/// Floor of the mean vote, or None for a product without comments.
///
/// Votes are confined to [0,5], so flooring and truncation coincide.
pub fn average_score(votes: &[i32]) -> Option<i32> {
    if votes.is_empty() {
        return None;
    }
    let sum: i64 = votes.iter().map(|&v| i64::from(v)).sum();
    Some((sum / votes.len() as i64) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floors_the_mean() {
        // floor(14 / 4) == 3
        assert_eq!(average_score(&[5, 4, 3, 2]), Some(3));
    }

    #[test]
    fn exact_mean_is_unchanged() {
        assert_eq!(average_score(&[4, 4, 4]), Some(4));
    }

    #[test]
    fn no_comments_means_no_score() {
        assert_eq!(average_score(&[]), None);
    }

    #[test]
    fn single_vote_is_its_own_mean() {
        assert_eq!(average_score(&[0]), Some(0));
        assert_eq!(average_score(&[5]), Some(5));
    }
}
