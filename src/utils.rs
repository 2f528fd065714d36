use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

/// Draw from N(mean, std_dev).
pub fn normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + std_dev * z
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean rounded to one decimal; 0.0 for an empty input.
pub fn mean1(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values.into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { round1(sum / count as f64) }
}

/// Truncate towards zero into an unsigned count; negatives become zero.
pub fn truncate_count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 { value.trunc() as u32 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn round1_keeps_one_decimal() {
        assert_eq!(round1(35.04), 35.0);
        assert_eq!(round1(35.06), 35.1);
        assert_eq!(round1(-2.26), -2.3);
    }

    #[test]
    fn mean1_of_empty_is_zero() {
        assert_eq!(mean1(Vec::<f64>::new()), 0.0);
        assert_eq!(mean1(vec![1.0, 2.0, 4.0]), 2.3);
    }

    #[test]
    fn truncation_floors_positive_values() {
        assert_eq!(truncate_count(12.99), 12);
        assert_eq!(truncate_count(-0.5), 0);
        assert_eq!(truncate_count(f64::NAN), 0);
    }

    #[test]
    fn normal_is_centred_on_mean() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 5_000;
        let sum: f64 = (0..n).map(|_| normal(&mut rng, 35.0, 10.0)).sum();
        let mean = sum / n as f64;
        assert!((mean - 35.0).abs() < 1.0, "mean drifted: {}", mean);
    }
}
