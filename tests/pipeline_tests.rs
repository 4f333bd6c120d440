use chrono::NaiveDate;
use ivsurface_lib::pipeline::collect_quotes;
use ivsurface_lib::{
    aggregate_quotes, build_surface_for_ticker, surface_from_files, AggregatorConfig,
    ChainQuote, MarketDataProvider, OptionQuote, OptionSide, PipelineConfig, StaticMarketData,
    SurfaceError,
};


use test_utils::{
    bs_price, create_test_config, expiry_in, load_test_provider, smile_vol, synthetic_market,
    test_strikes, valuation_date, TEST_TICKER,
};

/// A chain priced at a flat 25% volatility comes back as a flat 25% surface.
#[test]
fn test_flat_volatility_recovered_end_to_end() {
    let market = synthetic_market(&test_strikes(), &[14, 21, 28, 45], |_, _| 0.25);
    let output = build_surface_for_ticker(&market, &create_test_config()).expect("pipeline runs");

    let report = &output.report;
    assert_eq!(report.spot, 100.0);
    assert_eq!(report.valuation_date, valuation_date());
    assert_eq!(
        report.expirations_used,
        vec![expiry_in(14), expiry_in(21), expiry_in(28)]
    );
    assert_eq!(report.aggregation.quotes_seen, 30);
    assert_eq!(report.aggregation.skipped_side, 15);
    assert_eq!(report.aggregation.points, 15);
    assert_eq!(output.points.len(), 15);

    assert_eq!(output.surface.defined_count(), 2500);
    for (strike, days, vol) in output.surface.rows() {
        assert!((vol - 0.25).abs() < 1e-3, "K={strike} d={days}: {vol}");
    }
}

/// Calls and puts at the same site are averaged into one sample.
#[test]
fn test_both_sides_recover_the_smile() {
    let market = synthetic_market(&test_strikes(), &[14, 21, 28], smile_vol);
    let config = create_test_config().with_sides(vec![OptionSide::Call, OptionSide::Put]);
    let output = build_surface_for_ticker(&market, &config).expect("pipeline runs");

    assert_eq!(output.report.aggregation.points, 30);
    assert_eq!(output.report.aggregation.skipped_side, 0);
    for (strike, days, vol) in output.surface.rows() {
        let expected = smile_vol(strike, days);
        assert!((vol - expected).abs() < 5e-4, "K={strike} d={days}: {vol} vs {expected}");
    }
}

/// The horizon keeps 0 < days <= max_days, inclusive at the top.
#[test]
fn test_expiration_horizon() {
    let market = synthetic_market(&test_strikes(), &[7, 14, 21], |_, _| 0.3);
    let mut market = market.with_chain(TEST_TICKER, valuation_date(), Vec::new());
    market.add_quote(
        TEST_TICKER,
        NaiveDate::from_ymd_opt(2024, 12, 20).expect("valid date"),
        ChainQuote {
            strike: 100.0,
            side: OptionSide::Call,
            last_price: 3.0,
        },
    );

    let (quotes, used) = collect_quotes(&market, TEST_TICKER, valuation_date(), 14)
        .expect("provider answers");
    assert_eq!(used, vec![expiry_in(7), expiry_in(14)]);
    assert_eq!(quotes.len(), 20);
    assert!(quotes
        .iter()
        .all(|q| q.expiry_days_from_now == 7 || q.expiry_days_from_now == 14));
}

/// No point survives from a quote with a non-positive price or expiry.
#[test]
fn test_filter_invariant() {
    let mut quotes = Vec::new();
    for (i, strike) in test_strikes().into_iter().enumerate() {
        let days = 10 + 3 * i as i64;
        let good = bs_price(strike, days as f64, 0.3, OptionSide::Call);
        quotes.push(OptionQuote {
            strike,
            expiry_days_from_now: days,
            market_price: good,
            side: OptionSide::Call,
        });
        quotes.push(OptionQuote {
            strike,
            expiry_days_from_now: days,
            market_price: 0.0,
            side: OptionSide::Call,
        });
        quotes.push(OptionQuote {
            strike,
            expiry_days_from_now: -(days),
            market_price: good,
            side: OptionSide::Call,
        });
    }

    let result = aggregate_quotes(&quotes, 100.0, &AggregatorConfig::default());
    assert_eq!(result.summary.quotes_seen, 15);
    assert_eq!(result.summary.rejected_price, 5);
    assert_eq!(result.summary.rejected_expiry, 5);
    assert_eq!(result.points.len(), 5);
    assert!(result
        .points
        .iter()
        .all(|p| p.maturity_days > 0.0 && p.implied_volatility > 0.0));
}

/// The checked-in fixtures: three expirations in range, one zero-price row, puts skipped.
#[test]
fn test_csv_fixture_pipeline() {
    let provider = load_test_provider();
    let output = build_surface_for_ticker(&provider, &create_test_config()).expect("pipeline runs");

    let summary = output.report.aggregation;
    assert_eq!(output.report.expirations_used.len(), 3);
    assert_eq!(summary.quotes_seen, 31);
    assert_eq!(summary.rejected_price, 1);
    assert_eq!(summary.skipped_side, 15);
    assert_eq!(summary.unconverged, 0);
    assert_eq!(summary.points, 15);

    for point in &output.points {
        let expected = smile_vol(point.strike, point.maturity_days);
        assert!((point.implied_volatility - expected).abs() < 1e-4);
    }
}

/// Files in, surface out, with the TOML grid size honoured.
#[test]
fn test_surface_from_files() {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");
    let output = surface_from_files(
        format!("{dir}/chain.csv"),
        format!("{dir}/spots.csv"),
        format!("{dir}/pipeline.toml"),
    )
    .expect("pipeline runs");
    assert_eq!(output.surface.shape(), (20, 10));
    assert_eq!(output.surface.defined_count(), 200);

    let err = surface_from_files(
        format!("{dir}/missing.csv"),
        format!("{dir}/spots.csv"),
        format!("{dir}/pipeline.toml"),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SurfaceError>(),
        Some(SurfaceError::DataFetch { .. })
    ));
}

/// Two strikes on one expiry cannot make a surface.
#[test]
fn test_sparse_chain_is_insufficient() {
    let provider = load_test_provider();
    let config = PipelineConfig::new("ABC").with_valuation_date(valuation_date());
    let err = build_surface_for_ticker(&provider, &config).unwrap_err();
    assert!(matches!(err, SurfaceError::InsufficientData { .. }), "{err}");
}

/// Provider failures surface as DataFetch with the provider's message.
#[test]
fn test_provider_failures_are_data_fetch() {
    let provider = load_test_provider();
    let config = PipelineConfig::new("NOPE").with_valuation_date(valuation_date());
    match build_surface_for_ticker(&provider, &config) {
        Err(SurfaceError::DataFetch { message }) => assert!(message.contains("NOPE"), "{message}"),
        other => panic!("expected DataFetch, got {other:?}"),
    }

    let no_spot = StaticMarketData::new().with_chain(TEST_TICKER, expiry_in(14), Vec::new());
    assert!(no_spot.fetch_spot_price(TEST_TICKER).is_err());
    let err = build_surface_for_ticker(&no_spot, &create_test_config()).unwrap_err();
    assert!(matches!(err, SurfaceError::DataFetch { .. }), "{err}");
}

/// Unusable configuration is rejected before any provider call.
#[test]
fn test_invalid_config_rejected() {
    let provider = load_test_provider();
    let mut config = create_test_config();
    config.surface.strike_points = 1;
    let err = build_surface_for_ticker(&provider, &config).unwrap_err();
    assert!(matches!(err, SurfaceError::InvalidConfig { .. }), "{err}");
}
