//! Quiet hours window evaluation.
//!
//! The window is `[start, end)` in local wall-clock time and may wrap past
//! midnight. An empty window (`start == end`) is never active.

use chrono::NaiveTime;
use plategate_core::Severity;

use crate::settings::QuietHoursConfig;

/// Whether quiet hours are in effect at `now`.
pub fn is_active(now: NaiveTime, config: &QuietHoursConfig) -> bool {
    if !config.enabled {
        return false;
    }

    let (start, end) = (config.start, config.end);
    if start == end {
        false
    } else if start < end {
        start <= now && now < end
    } else {
        now >= start || now < end
    }
}

/// Whether an event of `severity` must be queued instead of delivered.
pub fn should_defer(severity: Severity, now: NaiveTime, config: &QuietHoursConfig) -> bool {
    is_active(now, config) && !(config.bypass_high_severity && severity.is_elevated())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window(start: NaiveTime, end: NaiveTime) -> QuietHoursConfig {
        QuietHoursConfig {
            enabled: true,
            start,
            end,
            bypass_high_severity: true,
        }
    }

    #[rstest]
    #[case(at(23, 30), true)]
    #[case(at(22, 0), true)]
    #[case(at(0, 0), true)]
    #[case(at(6, 59), true)]
    #[case(at(7, 0), false)]
    #[case(at(12, 0), false)]
    #[case(at(21, 59), false)]
    fn test_overnight_window(#[case] now: NaiveTime, #[case] active: bool) {
        assert_eq!(is_active(now, &window(at(22, 0), at(7, 0))), active);
    }

    #[rstest]
    #[case(at(12, 0), true)]
    #[case(at(13, 0), false)]
    #[case(at(11, 59), false)]
    fn test_daytime_window(#[case] now: NaiveTime, #[case] active: bool) {
        assert_eq!(is_active(now, &window(at(12, 0), at(13, 0))), active);
    }

    #[test]
    fn test_disabled_is_never_active() {
        let mut config = window(at(22, 0), at(7, 0));
        config.enabled = false;
        assert!(!is_active(at(23, 30), &config));
    }

    #[rstest]
    #[case(Severity::Low, true, true)]
    #[case(Severity::Medium, true, true)]
    #[case(Severity::High, true, false)]
    #[case(Severity::Critical, true, false)]
    #[case(Severity::Critical, false, true)]
    fn test_bypass(#[case] severity: Severity, #[case] bypass: bool, #[case] deferred: bool) {
        let mut config = window(at(22, 0), at(7, 0));
        config.bypass_high_severity = bypass;
        assert_eq!(should_defer(severity, at(23, 30), &config), deferred);
    }

    #[test]
    fn test_nothing_deferred_outside_window() {
        let config = window(at(22, 0), at(7, 0));
        assert!(!should_defer(Severity::Low, at(12, 0), &config));
    }

    fn any_time() -> impl Strategy<Value = NaiveTime> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| at(h, m))
    }

    proptest! {
        #[test]
        fn prop_empty_window_never_active(start in any_time(), now in any_time()) {
            prop_assert!(!is_active(now, &window(start, start)));
        }

        #[test]
        fn prop_swapped_window_is_complement(
            start in any_time(),
            end in any_time(),
            now in any_time(),
        ) {
            prop_assume!(start != end);
            prop_assert_ne!(
                is_active(now, &window(start, end)),
                is_active(now, &window(end, start))
            );
        }

        #[test]
        fn prop_start_is_inside_end_is_outside(start in any_time(), end in any_time()) {
            prop_assume!(start != end);
            let config = window(start, end);
            prop_assert!(is_active(start, &config));
            prop_assert!(!is_active(end, &config));
        }
    }
}
