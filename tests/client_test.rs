use chrono::{NaiveDate, TimeZone, Utc};
use market_data::*;
use mockito::{mock, Matcher};

fn client(prefix: &str, key: Option<&str>) -> MarketDataClient {
    MarketDataClient::with_base_url(&format!("{}/{}", mockito::server_url(), prefix), key)
}

#[test]
fn test_get_market_chart() {
    let _m = mock("GET", Matcher::Regex("^/cg-chart/coins/bitcoin/market_chart".to_owned()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
            Matcher::UrlEncoded("days".into(), "max".into()),
            Matcher::UrlEncoded("interval".into(), "daily".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"prices": [[1700000000000, 123.45], [1700086400000, 124.0]], "market_caps": [], "total_volumes": []}"#)
        .create();

    let cli = client("cg-chart", None);
    let chart = cli
        .execute(GetMarketChart {
            coin: "bitcoin".to_string(),
            vs_currency: "usd".to_string(),
            days: TimeRange::Max,
            interval: Interval::Daily,
        })
        .unwrap();
    let points: Vec<TickerPoint> = chart
        .into_points("bitcoin", "usd")
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        vec![
            TickerPoint::new(
                "bitcoin",
                "usd",
                Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap(),
                123.45
            ),
            TickerPoint::new(
                "bitcoin",
                "usd",
                Utc.with_ymd_and_hms(2023, 11, 15, 22, 13, 20).unwrap(),
                124.0
            ),
        ],
        points
    );
}

#[test]
fn test_get_market_chart_server_error() {
    let _m = mock("GET", Matcher::Regex("^/cg-429/coins/".to_owned()))
        .with_status(429)
        .with_body("Too Many Requests")
        .create();

    let cli = client("cg-429", None);
    let r = cli.execute(GetMarketChart {
        coin: "ethereum".to_string(),
        vs_currency: "eur".to_string(),
        days: TimeRange::Days(1),
        interval: Interval::Daily,
    });
    match r {
        Err(Error::Server(msg)) => assert!(msg.contains("429")),
        other => panic!("unexpected result: {:?}", other.map(|c| c.prices.len())),
    }
}

#[test]
fn test_get_market_chart_malformed_body() {
    let _m = mock("GET", Matcher::Regex("^/cg-bad/coins/".to_owned()))
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create();

    let cli = client("cg-bad", None);
    let r = cli.execute(GetMarketChart {
        coin: "bitcoin".to_string(),
        vs_currency: "usd".to_string(),
        days: TimeRange::Days(7),
        interval: Interval::Daily,
    });
    match r {
        Err(Error::Serde(_)) => (),
        other => panic!("unexpected result: {:?}", other.map(|c| c.prices.len())),
    }
}

#[test]
fn test_get_timeseries() {
    let _m = mock("GET", Matcher::Regex("^/fx-ok/timeseries".to_owned()))
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("access_key".into(), "KEY1234".into()),
            Matcher::UrlEncoded("base".into(), "usd".into()),
            Matcher::UrlEncoded("symbols".into(), "eur,jpy".into()),
            Matcher::UrlEncoded("start_date".into(), "2021-01-01".into()),
            Matcher::UrlEncoded("end_date".into(), "2021-12-31".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"{"success": true, "timeseries": true, "base": "usd",
                "rates": {"2021-01-01": {"eur": 0.82, "jpy": 103.2}}}"#,
        )
        .create();

    let cli = client("fx-ok", Some("KEY1234"));
    let ts = cli
        .execute(GetTimeseries {
            base: "usd".to_string(),
            symbols: vec!["eur".to_string(), "jpy".to_string()],
            start_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2021, 12, 31).unwrap(),
        })
        .unwrap();
    assert_eq!(2, ts.len());
    let counters: Vec<String> = ts
        .into_points()
        .map(|p| p.unwrap().counter_code)
        .collect();
    assert_eq!(vec!["eur".to_string(), "jpy".to_string()], counters);
}

#[test]
fn test_get_timeseries_provider_failure() {
    let _m = mock("GET", Matcher::Regex("^/fx-fail/timeseries".to_owned()))
        .with_status(200)
        .with_body(r#"{"success": false, "error": {"code": 101, "type": "invalid_access_key"}}"#)
        .create();

    let cli = client("fx-fail", Some("nope"));
    let r = cli.execute(GetTimeseries {
        base: "usd".to_string(),
        symbols: vec!["eur".to_string()],
        start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
    });
    match r {
        Err(Error::Server(msg)) => assert!(msg.contains("invalid_access_key")),
        other => panic!("unexpected result: {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn test_get_timeseries_foreign_body() {
    let _m = mock("GET", Matcher::Regex("^/fx-quota/timeseries".to_owned()))
        .with_status(200)
        .with_body(r#"{"message": "You have exceeded your monthly quota"}"#)
        .create();

    let cli = client("fx-quota", Some("KEY1234"));
    let r = cli.execute(GetTimeseries {
        base: "usd".to_string(),
        symbols: vec!["eur".to_string()],
        start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
    });
    match r {
        Err(Error::Serde(_)) => (),
        other => panic!("unexpected result: {:?}", other.map(|ts| ts.len())),
    }
}
