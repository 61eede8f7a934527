//! Property tests for pipeline config validation.

use proptest::prelude::*;
use stockpipe_runner::PipelineConfig;

// ── 1. Split fractions ──────────────────────────────────────────────

proptest! {
    #[test]
    fn fractions_accepted_iff_in_range(train in -0.5f64..1.5, val in -0.5f64..1.5) {
        let mut config = PipelineConfig::default();
        config.sequences.train_fraction = train;
        config.sequences.val_fraction = val;

        let in_range = train > 0.0 && train < 1.0 && val > 0.0 && val < 1.0 && train + val < 1.0;
        prop_assert_eq!(config.validate().is_ok(), in_range);
    }
}

// ── 2. Date window ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn end_before_start_rejected(offset in -3650i64..3650) {
        let mut config = PipelineConfig::default();
        let end = config.collect.start_date + chrono::Duration::days(offset);
        config.collect.end_date = Some(end);
        prop_assert_eq!(config.validate().is_ok(), offset >= 0);
    }
}

// ── 3. TOML round trip ──────────────────────────────────────────────

proptest! {
    #[test]
    fn serialized_config_parses_back(length in 1usize..500, delay in 0u64..10_000) {
        let mut config = PipelineConfig::default();
        config.sequences.length = length;
        config.collect.request_delay_ms = delay;
        let text = toml::to_string(&config).unwrap();
        prop_assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
    }
}
