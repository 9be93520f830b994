//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn base_config(trading: &str) -> Config {
        let toml_str = format!(
            r#"
[polymarket]
address = "0xabc"

[trading]
{}
"#,
            trading
        );
        toml::from_str(&toml_str).unwrap()
    }

    #[test]
    fn test_trading_config_defaults() {
        let config: TradingConfig = toml::from_str("").unwrap();
        assert!(!config.unsupervised_mode);
        assert_eq!(config.max_position_size, dec!(100));
        assert_eq!(config.min_unit_size, dec!(1));
        assert_eq!(config.risk_limit_per_trade, dec!(50));
        assert_eq!(config.min_confidence_threshold, dec!(0.60));
        assert_eq!(config.max_daily_trades, 10);
        assert_eq!(config.max_open_positions, 5);
        assert_eq!(config.buy_threshold, dec!(0.10));
        assert_eq!(config.sell_threshold, dec!(0.90));
        assert_eq!(config.min_edge, dec!(0.02));
        assert_eq!(config.confidence_model, ConfidenceModelKind::PriceDistance);
        assert_eq!(config.tick_interval_secs, 60);
        assert!(config.trading_hours.is_none());
    }

    #[test]
    fn test_scanner_config_defaults() {
        let config: ScannerConfig = toml::from_str("").unwrap();
        assert!(config.watchlist.is_empty());
        assert_eq!(config.max_markets, 50);
        assert_eq!(config.min_liquidity, dec!(100));
    }

    #[test]
    fn test_redemption_config_defaults() {
        let config: RedemptionConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 1800);
    }

    #[test]
    fn test_full_config_parse() {
        let toml_str = r#"
[polymarket]
address = "0xabc"
api_key = "key"
api_secret = "secret"
api_passphrase = "pass"

[chain]
private_key = "0xdeadbeef"
deposit_address = "0xdef"

[trading]
unsupervised_mode = true
max_position_size = 25.0
max_daily_trades = 3

[trading.trading_hours]
start_hour = 9
end_hour = 17
utc_offset_hours = -5

[scanner]
watchlist = ["0x1", "0x2"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();

        assert!(config.trading.unsupervised_mode);
        assert_eq!(config.trading.max_position_size, dec!(25));
        assert_eq!(config.trading.max_daily_trades, 3);
        let hours = config.trading.trading_hours.unwrap();
        assert_eq!(hours.start_hour, 9);
        assert_eq!(hours.utc_offset_hours, -5);
        assert_eq!(config.scanner.watchlist.len(), 2);
        // Contract defaults apply
        assert_eq!(config.chain.chain_id, 137);
        assert!(config.chain.usdc_address.starts_with("0x2791"));
    }

    #[test]
    fn test_validate_rejects_zero_daily_trades() {
        let config = base_config("max_daily_trades = 0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_confidence() {
        let config = base_config("min_confidence_threshold = 1.5");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = base_config("buy_threshold = 0.9\nsell_threshold = 0.1");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsupervised_without_key() {
        let config = base_config("unsupervised_mode = true");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_min_unit() {
        let config = base_config("max_position_size = 5.0\nmin_unit_size = 10.0");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_require_signing() {
        // A key-less supervised config validates but cannot sign
        let config = base_config("");
        config.validate().unwrap();
        let err = config.require_signing().unwrap_err();
        assert!(err.to_string().starts_with("Config error:"));
        assert!(err.to_string().contains("chain.private_key"));

        let mut with_key = base_config("");
        with_key.chain.private_key = "0xabc".into();
        with_key.require_signing().unwrap();
    }

    #[test]
    fn test_trading_hours_window() {
        let hours = TradingHours {
            start_hour: 9,
            end_hour: 17,
            utc_offset_hours: 0,
        };
        let inside = Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 6, 2, 8, 59, 0).unwrap();
        let at_end = Utc.with_ymd_and_hms(2025, 6, 2, 17, 0, 0).unwrap();
        assert!(hours.contains(inside));
        assert!(!hours.contains(before));
        assert!(!hours.contains(at_end));
    }

    #[test]
    fn test_trading_hours_offset() {
        let hours = TradingHours {
            start_hour: 9,
            end_hour: 17,
            utc_offset_hours: -5,
        };
        // 13:00 UTC is 08:00 at UTC-5: outside
        let utc_13 = Utc.with_ymd_and_hms(2025, 6, 2, 13, 0, 0).unwrap();
        assert!(!hours.contains(utc_13));
        // 15:00 UTC is 10:00 at UTC-5: inside
        let utc_15 = Utc.with_ymd_and_hms(2025, 6, 2, 15, 0, 0).unwrap();
        assert!(hours.contains(utc_15));
    }

    #[test]
    fn test_trading_hours_overnight_wrap() {
        let hours = TradingHours {
            start_hour: 22,
            end_hour: 2,
            utc_offset_hours: 0,
        };
        let late = Utc.with_ymd_and_hms(2025, 6, 2, 23, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2025, 6, 2, 1, 0, 0).unwrap();
        let midday = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        assert!(hours.contains(late));
        assert!(hours.contains(early));
        assert!(!hours.contains(midday));
    }
}
