//! Integration tests for stanley-analytics.
//!
//! These tests drive the orchestrator end to end over in-memory histories.

use approx::assert_relative_eq;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use stanley_analytics::{
    beta, cumulative_return, holdings_from_positions, volatility, AnalyticsConfig,
    AnalyticsOrchestrator, ApiResponse, Contribution, Error, ExclusionReason, Holding,
    InMemoryPriceSource, Lookback, PositionInput, PriceSeries,
};

// =============================================================================
// TEST FIXTURES
// =============================================================================

/// `n` consecutive weekdays starting at `start`.
fn weekdays(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut d = start;
    while dates.len() < n {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(d);
        }
        d += Duration::days(1);
    }
    dates
}

fn march_calendar(n: usize) -> Vec<NaiveDate> {
    weekdays(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), n)
}

/// Repeat `pattern` until `n` values.
fn cycle(pattern: &[f64], n: usize) -> Vec<f64> {
    pattern.iter().copied().cycle().take(n).collect()
}

/// Closes starting at `start` that produce exactly `returns`.
fn closes_from_returns(start: f64, returns: &[f64]) -> Vec<f64> {
    let mut closes = vec![start];
    for r in returns {
        let last = closes[closes.len() - 1];
        closes.push(last * (1.0 + r));
    }
    closes
}

fn insert(source: &mut InMemoryPriceSource, symbol: &str, dates: &[NaiveDate], closes: &[f64]) {
    let series = PriceSeries::from_columns(symbol, dates, closes).unwrap();
    source.insert(symbol, series);
}

struct Market {
    spy: Vec<f64>,
    qqq: Vec<f64>,
    aapl: Vec<f64>,
    xom: Vec<f64>,
}

/// 31 trading days of SPY, QQQ, AAPL and XOM on the same calendar.
fn market_fixture() -> (InMemoryPriceSource, Market) {
    let n = 30;
    let market = Market {
        spy: cycle(&[0.01, -0.005, 0.007, -0.012, 0.004], n),
        qqq: cycle(&[0.012, -0.006, 0.009, -0.015, 0.005], n),
        aapl: cycle(&[0.02, -0.01, 0.015, -0.02, 0.01], n),
        xom: cycle(&[-0.005, 0.01, -0.002, 0.004, -0.006], n),
    };

    let dates = march_calendar(n + 1);
    let mut source = InMemoryPriceSource::new();
    insert(&mut source, "SPY", &dates, &closes_from_returns(500.0, &market.spy));
    insert(&mut source, "QQQ", &dates, &closes_from_returns(430.0, &market.qqq));
    insert(&mut source, "AAPL", &dates, &closes_from_returns(180.0, &market.aapl));
    insert(&mut source, "XOM", &dates, &closes_from_returns(110.0, &market.xom));
    (source, market)
}

fn tech_energy_holdings() -> Vec<Holding> {
    holdings_from_positions(&[
        PositionInput {
            symbol: "aapl".to_string(),
            weight_pct: Some(60.0),
            sector: Some("Tech".to_string()),
            ..Default::default()
        },
        PositionInput {
            symbol: "xom".to_string(),
            weight_pct: Some(40.0),
            sector: Some("Energy".to_string()),
            ..Default::default()
        },
    ])
    .unwrap()
}

// =============================================================================
// PORTFOLIO ANALYSIS
// =============================================================================

#[test]
fn test_portfolio_end_to_end() {
    let (source, market) = market_fixture();
    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);

    let metrics = orchestrator
        .analyze_portfolio(&tech_energy_holdings(), &Lookback::OneYear)
        .unwrap();

    let expected: Vec<f64> = market
        .aapl
        .iter()
        .zip(&market.xom)
        .map(|(a, x)| 0.6 * a + 0.4 * x)
        .collect();

    assert_eq!(metrics.periods, 30);
    // SPY is not held, so the longest holding (ties alphabetical) anchors
    assert_eq!(metrics.alignment.anchor.as_deref(), Some("AAPL"));
    assert!(!metrics.alignment.is_included("SPY"));
    for (got, want) in metrics.portfolio_returns.iter().zip(&expected) {
        assert_relative_eq!(*got, *want, epsilon = 1e-9);
    }

    assert_relative_eq!(metrics.cum_return, cumulative_return(&expected), epsilon = 1e-9);
    assert_relative_eq!(metrics.volatility, volatility(&expected), epsilon = 1e-9);
    assert_relative_eq!(
        metrics.volatility_annual,
        metrics.volatility * 252.0_f64.sqrt(),
        epsilon = 1e-12
    );
    assert_relative_eq!(metrics.beta, beta(&expected, &market.spy), epsilon = 1e-6);

    // Benchmarks
    let spy = metrics.benchmarks.benchmarks["SPY"];
    assert_relative_eq!(spy.cum_return, cumulative_return(&market.spy), epsilon = 1e-9);
    assert_relative_eq!(
        spy.relative_vs_portfolio,
        metrics.cum_return - spy.cum_return,
        epsilon = 1e-12
    );
    assert!(metrics.benchmarks.benchmarks.contains_key("QQQ"));

    // Attribution
    let aapl = metrics.by_symbol.iter().find(|(s, _)| s == "AAPL").unwrap();
    assert!(matches!(aapl.1, Contribution::Actual(_)));
    assert_relative_eq!(
        aapl.1.value(),
        0.6 * cumulative_return(&market.aapl),
        epsilon = 1e-9
    );
    assert_eq!(metrics.by_sector.len(), 2);

    // Sector exposure
    assert_eq!(metrics.sector_weights.len(), 2);
    assert_eq!(metrics.sector_weights[0].0, "Tech");
    assert_relative_eq!(metrics.sector_weights[0].1, 0.6, epsilon = 1e-12);
    assert_relative_eq!(metrics.sector_weights[1].1, 0.4, epsilon = 1e-12);
    assert_eq!(metrics.missing_sectors.len(), 10);
    assert!(metrics.missing_sectors.contains(&"Technology".to_string()));
    assert!(!metrics.missing_sectors.contains(&"Energy".to_string()));

    // Both positions are above the 10% threshold
    assert_relative_eq!(metrics.concentration.hhi, 0.52, epsilon = 1e-12);
    assert_eq!(
        metrics.concentration.warnings,
        vec!["Positions over 10%: AAPL, XOM".to_string()]
    );
}

#[test]
fn test_portfolio_of_market_has_unit_beta() {
    let (source, _) = market_fixture();
    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);
    let holdings = vec![Holding::new("SPY", 1.0).unwrap()];

    let metrics = orchestrator
        .analyze_portfolio(&holdings, &Lookback::OneYear)
        .unwrap();

    assert_relative_eq!(metrics.beta, 1.0, epsilon = 1e-9);
    let spy = metrics.benchmarks.benchmarks["SPY"];
    assert_relative_eq!(spy.relative_vs_portfolio, 0.0, epsilon = 1e-12);
}

#[test]
fn test_gappy_holding_excluded_and_proxied() {
    let (mut source, market) = market_fixture();
    let dates = march_calendar(31);

    // Quotes on every other day only
    let gappy_dates: Vec<NaiveDate> = dates.iter().step_by(2).copied().collect();
    let gappy_closes = vec![50.0; gappy_dates.len()];
    insert(&mut source, "GAPPY", &gappy_dates, &gappy_closes);

    // One missing day stays within tolerance
    let mut xom_dates = dates.clone();
    let mut xom_closes = closes_from_returns(110.0, &market.xom);
    xom_dates.remove(10);
    xom_closes.remove(10);
    insert(&mut source, "XOM", &xom_dates, &xom_closes);

    let holdings = vec![
        Holding::new("AAPL", 0.5).unwrap(),
        Holding::new("GAPPY", 0.25).unwrap(),
        Holding::new("XOM", 0.25).unwrap(),
    ];
    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);
    let metrics = orchestrator
        .analyze_portfolio(&holdings, &Lookback::OneYear)
        .unwrap();

    assert!(matches!(
        metrics.alignment.exclusion("GAPPY"),
        Some(ExclusionReason::ExceededMissingRatio { .. })
    ));
    let xom = metrics
        .alignment
        .included
        .iter()
        .find(|c| c.symbol == "XOM")
        .unwrap();
    assert_eq!(xom.missing_points, 1);

    let gappy = metrics.by_symbol.iter().find(|(s, _)| s == "GAPPY").unwrap();
    assert_eq!(gappy.1, Contribution::WeightProxy(0.25));

    // First period: AAPL and XOM renormalized to 2/3 and 1/3
    let expected_first = (2.0 / 3.0) * market.aapl[0] + (1.0 / 3.0) * market.xom[0];
    assert_relative_eq!(metrics.portfolio_returns[0], expected_first, epsilon = 1e-9);
}

#[test]
fn test_no_aligned_holdings_is_an_error() {
    let (source, _) = market_fixture();
    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);
    let holdings = vec![Holding::new("GHOST", 1.0).unwrap()];

    let result = orchestrator.analyze_portfolio(&holdings, &Lookback::OneYear);
    match result {
        Err(Error::NoAlignedSymbols { requested, report }) => {
            assert_eq!(requested, vec!["GHOST".to_string()]);
            assert_eq!(
                report.exclusion("GHOST"),
                Some(ExclusionReason::InsufficientPoints { points: 0 })
            );
            // Reference symbols are not part of the holdings' alignment
            assert!(report.anchor.is_none());
            assert!(report.exclusion("SPY").is_none());
        }
        other => panic!("expected NoAlignedSymbols, got {:?}", other.map(|m| m.periods)),
    }
}

/// AAPL rising from 100 to 159 over 60 trading days.
fn steady_riser() -> (Vec<NaiveDate>, Vec<f64>) {
    let dates = march_calendar(60);
    let closes = (0..60).map(|i| 100.0 + i as f64).collect();
    (dates, closes)
}

#[test]
fn test_short_benchmark_keeps_portfolio_window() {
    let (dates, closes) = steady_riser();
    let mut source = InMemoryPriceSource::new();
    insert(&mut source, "AAPL", &dates, &closes);
    insert(&mut source, "SPY", &dates, &closes_from_returns(500.0, &cycle(&[0.01, -0.004], 59)));
    // QQQ only quoted on the last three days
    insert(&mut source, "QQQ", &dates[57..], &[430.0, 433.0, 431.0]);

    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);
    let holdings = vec![Holding::new("AAPL", 1.0).unwrap()];
    let metrics = orchestrator
        .analyze_portfolio(&holdings, &Lookback::OneYear)
        .unwrap();

    assert_eq!(metrics.periods, 59);
    assert_relative_eq!(metrics.cum_return, 0.59, epsilon = 1e-9);

    let qqq = metrics.benchmarks.benchmarks["QQQ"];
    assert_relative_eq!(qqq.cum_return, 431.0 / 430.0 - 1.0, epsilon = 1e-9);
    let spy = metrics.benchmarks.benchmarks["SPY"];
    assert_relative_eq!(
        spy.cum_return,
        cumulative_return(&cycle(&[0.01, -0.004], 59)),
        epsilon = 1e-9
    );
}

#[test]
fn test_short_market_keeps_portfolio_window() {
    let (dates, closes) = steady_riser();
    let mut source = InMemoryPriceSource::new();
    insert(&mut source, "AAPL", &dates, &closes);
    // SPY only quoted on the last ten days
    let spy_returns = cycle(&[0.01, -0.02, 0.015], 9);
    insert(&mut source, "SPY", &dates[50..], &closes_from_returns(500.0, &spy_returns));

    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);
    let holdings = vec![Holding::new("AAPL", 1.0).unwrap()];
    let metrics = orchestrator
        .analyze_portfolio(&holdings, &Lookback::OneYear)
        .unwrap();

    assert_eq!(metrics.periods, 59);
    assert_eq!(metrics.alignment.anchor.as_deref(), Some("AAPL"));
    assert_relative_eq!(metrics.cum_return, 0.59, epsilon = 1e-9);

    // Beta pairs the last nine periods, which share dates
    let expected = beta(&metrics.portfolio_returns, &spy_returns);
    assert_relative_eq!(metrics.beta, expected, epsilon = 1e-9);
    assert!(metrics.beta != 0.0);
}

// Only meaningful with rayon compiled in: `cargo test --features parallel`
#[cfg(feature = "parallel")]
#[test]
fn test_parallel_fetch_matches_sequential() {
    let (source, _) = market_fixture();
    let holdings = tech_energy_holdings();

    let sequential = AnalyticsConfig {
        parallel_fetch: false,
        ..Default::default()
    };
    let a = AnalyticsOrchestrator::new(sequential, source.clone())
        .analyze_portfolio(&holdings, &Lookback::OneYear)
        .unwrap();
    let b = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source)
        .analyze_portfolio(&holdings, &Lookback::OneYear)
        .unwrap();

    assert_eq!(a.portfolio_returns, b.portfolio_returns);
    assert_eq!(a.alignment, b.alignment);
}

#[test]
fn test_json_request_flow() {
    let positions = r#"[
        {"symbol": "AAPL", "weight_pct": 70},
        {"symbol": "MSFT", "weight_pct": 30}
    ]"#;
    let prices = r#"{
        "SPY":  {"dates": ["2023-12-29", "2024-01-02", "2024-01-03", "2024-01-04"],
                 "closes": [475.0, 472.0, 468.0, 467.0]},
        "AAPL": {"dates": ["2023-12-29", "2024-01-02", "2024-01-03", "2024-01-04"],
                 "closes": [192.0, 185.0, 184.0, 181.0]},
        "MSFT": {"dates": ["2023-12-29", "2024-01-02", "2024-01-03", "2024-01-04"],
                 "closes": [376.0, 370.0, 370.0, 367.0]}
    }"#;

    let positions: Vec<PositionInput> = serde_json::from_str(positions).unwrap();
    let holdings = holdings_from_positions(&positions).unwrap();
    let source = InMemoryPriceSource::from_json(prices).unwrap();
    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);

    // YTD drops the December close
    let metrics = orchestrator
        .analyze_portfolio(&holdings, &Lookback::from_label("YTD"))
        .unwrap();
    assert_eq!(metrics.periods, 2);

    let aapl = (181.0 / 185.0) - 1.0;
    let msft = (367.0 / 370.0) - 1.0;
    assert_relative_eq!(
        metrics.by_symbol.iter().find(|(s, _)| s == "AAPL").unwrap().1.value(),
        0.7 * aapl,
        epsilon = 1e-9
    );
    assert_relative_eq!(
        metrics.by_symbol.iter().find(|(s, _)| s == "MSFT").unwrap().1.value(),
        0.3 * msft,
        epsilon = 1e-9
    );

    let json = serde_json::to_value(ApiResponse::ok(metrics)).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"]["periods"], 2);
    assert_eq!(json["data"]["alignment"]["anchor"], "AAPL");
    assert!(json["data"]["benchmarks"]["benchmarks"]["SPY"].is_object());
}

// =============================================================================
// INSTRUMENT ANALYSIS
// =============================================================================

#[test]
fn test_instrument_aligned() {
    let (source, market) = market_fixture();
    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);

    let metrics = orchestrator
        .analyze_instrument("aapl", &Lookback::OneYear)
        .unwrap();

    assert_eq!(metrics.symbol, "AAPL");
    assert!(metrics.aligned);
    assert_relative_eq!(
        metrics.cum_return.unwrap(),
        cumulative_return(&market.aapl),
        epsilon = 1e-9
    );
    assert!(metrics.benchmarks.benchmarks.contains_key("SPY"));
    assert!(metrics.benchmarks.benchmarks.contains_key("QQQ"));

    let closes = closes_from_returns(180.0, &market.aapl);
    assert_relative_eq!(
        metrics.technicals.last_price.unwrap(),
        closes[closes.len() - 1],
        epsilon = 1e-9
    );
    assert!(metrics.technicals.rsi.is_some());
    assert!(metrics.technicals.sma20.is_some());
    assert!(metrics.technicals.sma50.is_none());
}

#[test]
fn test_instrument_falls_back_to_raw_returns() {
    let (mut source, _) = market_fixture();

    // Trades only after the anchor calendar ends
    let later = weekdays(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 5);
    insert(&mut source, "NEWCO", &later, &[10.0, 11.0, 12.1, 12.1, 13.31]);

    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);
    let metrics = orchestrator
        .analyze_instrument("NEWCO", &Lookback::OneYear)
        .unwrap();

    assert!(!metrics.aligned);
    assert_relative_eq!(metrics.cum_return.unwrap(), 0.331, epsilon = 1e-9);
    assert!(metrics.volatility.is_some());
    // No period lines up with the market
    assert!(metrics.beta.is_none());
    assert!(metrics.benchmarks.benchmarks.is_empty());
    assert_eq!(metrics.technicals.last_price, Some(13.31));
}

#[test]
fn test_instrument_without_data() {
    let (source, _) = market_fixture();
    let orchestrator = AnalyticsOrchestrator::new(AnalyticsConfig::default(), source);

    let metrics = orchestrator
        .analyze_instrument("NOPE", &Lookback::SixMonths)
        .unwrap();

    assert!(!metrics.aligned);
    assert!(metrics.cum_return.is_none());
    assert!(metrics.sharpe.is_none());
    assert!(metrics.benchmarks.benchmarks.is_empty());
    assert!(metrics.technicals.last_price.is_none());
}

#[test]
fn test_instrument_rejects_blank_symbol() {
    let orchestrator =
        AnalyticsOrchestrator::new(AnalyticsConfig::default(), InMemoryPriceSource::new());
    let result = orchestrator.analyze_instrument("  ", &Lookback::OneYear);
    assert!(matches!(result, Err(Error::InvalidSymbol(_))));
}
