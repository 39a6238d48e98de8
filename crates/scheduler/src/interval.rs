use std::time::Duration;

/// A day stands in for "never" when an endpoint's effective rate is
/// non-positive (disabled via the global multiplier, or a zero/negative
/// frequency slipped past validation).
const NEVER: Duration = Duration::from_secs(24 * 60 * 60);

/// The spacing between two requests to one endpoint, given its
/// per-minute frequency and the global rate multiplier.
pub fn request_interval(frequency: f64, global_multiplier: f64) -> Duration {
    let rate = frequency * global_multiplier;
    if rate <= 0.0 {
        return NEVER;
    }
    Duration::from_secs_f64(60.0 / rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_per_minute_is_one_second_apart() {
        assert_eq!(request_interval(60.0, 1.0), Duration::from_secs(1));
    }

    #[test]
    fn multiplier_scales_the_effective_rate() {
        assert_eq!(request_interval(60.0, 2.0), Duration::from_millis(500));
        assert_eq!(request_interval(60.0, 0.5), Duration::from_secs(2));
    }

    #[test]
    fn non_positive_rate_is_treated_as_never() {
        assert_eq!(request_interval(60.0, 0.0), NEVER);
        assert_eq!(request_interval(-5.0, 1.0), NEVER);
    }
}
