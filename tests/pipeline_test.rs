use chrono::NaiveDate;
use market_data::{Interval, MarketDataClient, TimeRange};
use mockito::{mock, Matcher};
use ops_shell::collect::{
    CoingeckoSource, CollectionRequest, Collector, FailurePolicy, FixerSource, RequestRange,
    WriteMode,
};
use ops_shell::insert::{SqliteSink, TickerTable};
use ops_shell::ratelimit::Unlimited;
use ops_shell::Error;
use rusqlite::Connection;

const SCHEMA: &str = include_str!("../ops-shell/schema/sqlite.sql");

fn memory_sink() -> SqliteSink {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(
        "INSERT INTO currency (id, name, code, symbol) VALUES \
         ('c-usd', 'US Dollar', 'usd', '$'), \
         ('c-eur', 'Euro', 'eur', 'E'), \
         ('c-jpy', 'Yen', 'jpy', 'Y');",
    )
    .unwrap();
    SqliteSink::new(conn)
}

fn rows(sink: &SqliteSink, table: &str) -> Vec<(String, String, String, f64)> {
    let sql = format!("SELECT * FROM {} ORDER BY 1, 2, 3", table);
    let mut stmt = sink.connection().prepare(&sql).unwrap();
    let rows = stmt
        .query_map([], |r| -> rusqlite::Result<(String, String, String, f64)> {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
        })
        .unwrap();
    rows.map(|r| r.unwrap()).collect()
}

fn client(prefix: &str, key: Option<&str>) -> MarketDataClient {
    MarketDataClient::with_base_url(&format!("{}/{}", mockito::server_url(), prefix), key)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 5, 17).unwrap()
}

#[test]
fn test_asset_tickers_into_sqlite() {
    let btc = mock("GET", Matcher::Regex("^/pipe-cg/coins/bitcoin/market_chart".to_owned()))
        .match_query(Matcher::UrlEncoded("vs_currency".into(), "usd".into()))
        .with_status(200)
        .with_body(r#"{"prices": [[1700000000000, 36500.5], [1700086400000, 35500.25]]}"#)
        .expect(2)
        .create();
    let eth = mock("GET", Matcher::Regex("^/pipe-cg/coins/ethereum/market_chart".to_owned()))
        .match_query(Matcher::UrlEncoded("vs_currency".into(), "usd".into()))
        .with_status(200)
        .with_body(r#"{"prices": [[1700000000000, 2000.0]]}"#)
        .expect(2)
        .create();

    let source = CoingeckoSource::new(client("pipe-cg", None));
    let mut sink = memory_sink();
    let request = CollectionRequest {
        subjects: vec!["bitcoin".to_owned(), "ethereum".to_owned()],
        counters: vec!["usd".to_owned()],
        range: RequestRange::Days(TimeRange::Days(2)),
        interval: Interval::Daily,
    };

    // replaying the same request leaves the table unchanged
    for _ in 0..2 {
        let mut limiter = Unlimited;
        let report = Collector::new(&source, &mut sink, &mut limiter, TickerTable::Asset)
            .run_at(&request, today())
            .unwrap();
        assert_eq!(2, report.units);
        assert_eq!(3, report.written);
    }

    assert_eq!(
        vec![
            ("2023-11-14 22:13:20.000000".to_owned(), "bitcoin".to_owned(), "c-usd".to_owned(), 36500.5),
            ("2023-11-14 22:13:20.000000".to_owned(), "ethereum".to_owned(), "c-usd".to_owned(), 2000.0),
            ("2023-11-15 22:13:20.000000".to_owned(), "bitcoin".to_owned(), "c-usd".to_owned(), 35500.25),
        ],
        rows(&sink, "asset_ticker")
    );
    btc.assert();
    eth.assert();
}

#[test]
fn test_currency_tickers_into_sqlite() {
    let _m = mock("GET", Matcher::Regex("^/pipe-fx/timeseries".to_owned()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("access_key".into(), "secret-key".into()),
            Matcher::UrlEncoded("base".into(), "usd".into()),
            Matcher::UrlEncoded("symbols".into(), "eur,jpy".into()),
            Matcher::UrlEncoded("start_date".into(), "2022-01-01".into()),
            Matcher::UrlEncoded("end_date".into(), "2022-12-31".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"success": true, "timeseries": true, "base": "USD",
                "start_date": "2022-01-01", "end_date": "2022-12-31",
                "rates": {
                    "2022-01-01": {"EUR": 0.88, "JPY": 115.1},
                    "2022-01-02": {"EUR": 0.89, "JPY": 115.3}
                }}"#,
        )
        .create();

    let source = FixerSource::new(client("pipe-fx", Some("secret-key")));
    let mut sink = memory_sink();
    let mut limiter = Unlimited;
    let request = CollectionRequest {
        subjects: vec!["usd".to_owned()],
        counters: vec!["eur".to_owned(), "jpy".to_owned()],
        range: RequestRange::Years(vec![2022]),
        interval: Interval::Daily,
    };
    let report = Collector::new(&source, &mut sink, &mut limiter, TickerTable::Currency)
        .write_mode(WriteMode::PerPair)
        .run_at(&request, today())
        .unwrap();
    assert_eq!(1, report.units);
    assert_eq!(4, report.written);

    let stored = rows(&sink, "currency_ticker");
    assert_eq!(4, stored.len());
    assert_eq!(
        ("2022-01-01 00:00:00.000000".to_owned(), "c-usd".to_owned(), "c-eur".to_owned(), 0.88),
        stored[0]
    );
    assert_eq!(
        ("2022-01-02 00:00:00.000000".to_owned(), "c-usd".to_owned(), "c-jpy".to_owned(), 115.3),
        stored[3]
    );
}

#[test]
fn test_failed_call_skipped_or_aborted() {
    let _ok = mock("GET", Matcher::Regex("^/pipe-skip/coins/bitcoin/market_chart".to_owned()))
        .with_status(200)
        .with_body(r#"{"prices": [[1700000000000, 36500.5]]}"#)
        .create();
    let _down = mock("GET", Matcher::Regex("^/pipe-skip/coins/dogecoin/market_chart".to_owned()))
        .with_status(503)
        .with_body("unavailable")
        .create();

    let source = CoingeckoSource::new(client("pipe-skip", None));
    let request = CollectionRequest {
        subjects: vec!["dogecoin".to_owned(), "bitcoin".to_owned()],
        counters: vec!["usd".to_owned()],
        range: RequestRange::Days(TimeRange::Days(1)),
        interval: Interval::Daily,
    };

    let mut sink = memory_sink();
    let mut limiter = Unlimited;
    let report = Collector::new(&source, &mut sink, &mut limiter, TickerTable::Asset)
        .on_error(FailurePolicy::Skip)
        .run_at(&request, today())
        .unwrap();
    assert_eq!(1, report.failed_units);
    assert_eq!(1, report.written);
    assert_eq!(1, rows(&sink, "asset_ticker").len());

    let mut sink = memory_sink();
    let mut limiter = Unlimited;
    let result = Collector::new(&source, &mut sink, &mut limiter, TickerTable::Asset)
        .run_at(&request, today());
    match result {
        Err(Error::Fetch(_)) => (),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(rows(&sink, "asset_ticker").is_empty());
}
