//! Splitting the total event count across generator workers.

/// Error type for quota partitioning.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuotaError {
    /// At least one generator worker is required
    #[error("Cannot partition events across zero workers")]
    NoWorkers,
}

/// How the division remainder is assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuotaPolicy {
    /// The last worker absorbs the remainder regardless of worker count.
    #[default]
    RemainderToLast,
    /// Even worker counts get `total / count` each and the remainder is
    /// dropped; odd counts give the remainder to the last worker.
    TruncateEven,
}

/// Partition `total` events across `workers` generator workers.
///
/// All quotas but the last equal `total / workers`. Whether the last one
/// absorbs the remainder depends on `policy`.
pub fn partition(total: u64, workers: usize, policy: QuotaPolicy) -> Result<Vec<u64>, QuotaError> {
    if workers == 0 {
        return Err(QuotaError::NoWorkers);
    }

    let count = workers as u64;
    let share = total / count;
    let mut quotas = vec![share; workers];

    let truncate = policy == QuotaPolicy::TruncateEven && workers % 2 == 0;
    if !truncate {
        quotas[workers - 1] = total - share * (count - 1);
    }

    Ok(quotas)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_leading_equal(quotas: &[u64]) {
        let (_, leading) = quotas.split_last().unwrap();
        assert!(leading.windows(2).all(|w| w[0] == w[1]), "{quotas:?}");
    }

    #[test]
    fn test_zero_workers() {
        assert_eq!(
            partition(100, 0, QuotaPolicy::RemainderToLast),
            Err(QuotaError::NoWorkers)
        );
        assert_eq!(
            partition(100, 0, QuotaPolicy::TruncateEven),
            Err(QuotaError::NoWorkers)
        );
    }

    #[test]
    fn test_odd_counts_sum_to_total() {
        for policy in [QuotaPolicy::RemainderToLast, QuotaPolicy::TruncateEven] {
            for workers in [1, 3, 5, 7, 9] {
                for total in [0, 1, 2, 10, 99, 100, 1_000_001] {
                    let quotas = partition(total, workers, policy).unwrap();
                    assert_eq!(quotas.len(), workers);
                    assert_eq!(quotas.iter().sum::<u64>(), total);
                    assert_leading_equal(&quotas);
                    let last = total - (workers as u64 - 1) * (total / workers as u64);
                    assert_eq!(*quotas.last().unwrap(), last);
                }
            }
        }
    }

    #[test]
    fn test_even_counts_divisible_total() {
        for policy in [QuotaPolicy::RemainderToLast, QuotaPolicy::TruncateEven] {
            for workers in [2usize, 4, 8] {
                let total = 1000 * workers as u64;
                let quotas = partition(total, workers, policy).unwrap();
                assert_eq!(quotas.iter().sum::<u64>(), total);
                assert!(quotas.iter().all(|q| *q == 1000));
            }
        }
    }

    #[test]
    fn test_truncate_even_drops_remainder() {
        let quotas = partition(10, 4, QuotaPolicy::TruncateEven).unwrap();
        assert_eq!(quotas, vec![2, 2, 2, 2]);
        assert_eq!(quotas.iter().sum::<u64>(), 8);
    }

    #[test]
    fn test_remainder_to_last_never_drops() {
        assert_eq!(
            partition(10, 4, QuotaPolicy::RemainderToLast).unwrap(),
            vec![2, 2, 2, 4]
        );
        assert_eq!(
            partition(3, 4, QuotaPolicy::RemainderToLast).unwrap(),
            vec![0, 0, 0, 3]
        );
    }

    #[test]
    fn test_single_worker_takes_everything() {
        assert_eq!(
            partition(12345, 1, QuotaPolicy::RemainderToLast).unwrap(),
            vec![12345]
        );
    }
}
