use crate::datetime::{today_utc, year_range};
use crate::insert::{TickerSink, TickerTable};
use crate::ratelimit::RateLimiter;
use crate::{Error, Result};
use chrono::NaiveDate;
use log::{info, warn};
use market_data::{
    GetMarketChart, GetTimeseries, Interval, MarketDataClient, TickerPoint, TimeRange,
};
use std::fmt;
use std::str::FromStr;

/// time selection of a collection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestRange {
    Days(TimeRange),
    Years(Vec<i32>),
}

/// what to collect, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub subjects: Vec<String>,
    pub counters: Vec<String>,
    pub range: RequestRange,
    pub interval: Interval,
}

/// time window of a single provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Days(TimeRange),
    Dates(NaiveDate, NaiveDate),
}

/// a single provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUnit {
    pub subject: String,
    pub counters: Vec<String>,
    pub window: Window,
    pub interval: Interval,
}

impl fmt::Display for FetchUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} versus {}", self.subject, self.counters.join(","))?;
        match self.window {
            Window::Days(range) => write!(f, " over {} days", range),
            Window::Dates(start, end) => write!(f, " from {} to {}", start, end),
        }
    }
}

impl CollectionRequest {
    /// cross product of subjects, windows and counters
    ///
    /// counters stay together in one unit when the provider accepts a list
    pub fn expand(&self, today: NaiveDate, group_counters: bool) -> Result<Vec<FetchUnit>> {
        let windows = match self.range {
            RequestRange::Days(range) => vec![Window::Days(range)],
            RequestRange::Years(ref years) => {
                let mut ws = Vec::with_capacity(years.len());
                for year in years {
                    let (start, end) = year_range(*year, today)?;
                    ws.push(Window::Dates(start, end));
                }
                ws
            }
        };
        let mut units = Vec::new();
        for subject in &self.subjects {
            for window in &windows {
                if group_counters {
                    units.push(FetchUnit {
                        subject: subject.clone(),
                        counters: self.counters.clone(),
                        window: *window,
                        interval: self.interval,
                    });
                    continue;
                }
                for counter in &self.counters {
                    units.push(FetchUnit {
                        subject: subject.clone(),
                        counters: vec![counter.clone()],
                        window: *window,
                        interval: self.interval,
                    });
                }
            }
        }
        Ok(units)
    }
}

/// provider adapter: one call, normalized points
pub trait TickerSource {
    /// whether one call serves all counters of a subject
    fn groups_counters(&self) -> bool {
        false
    }

    fn fetch(&self, unit: &FetchUnit) -> Result<Vec<TickerPoint>>;
}

pub struct CoingeckoSource {
    client: MarketDataClient,
}

impl CoingeckoSource {
    pub fn new(client: MarketDataClient) -> Self {
        CoingeckoSource { client }
    }
}

impl TickerSource for CoingeckoSource {
    fn fetch(&self, unit: &FetchUnit) -> Result<Vec<TickerPoint>> {
        let days = match unit.window {
            Window::Days(days) => days,
            Window::Dates(..) => {
                return Err(Error::Config(
                    "coingecko market chart only accepts a number of days".to_owned(),
                ))
            }
        };
        let mut points = Vec::new();
        for counter in &unit.counters {
            let chart = self.client.execute(GetMarketChart {
                coin: unit.subject.clone(),
                vs_currency: counter.clone(),
                days,
                interval: unit.interval,
            })?;
            for p in chart.into_points(&unit.subject, counter) {
                points.push(p?);
            }
        }
        Ok(points)
    }
}

pub struct FixerSource {
    client: MarketDataClient,
}

impl FixerSource {
    pub fn new(client: MarketDataClient) -> Self {
        FixerSource { client }
    }
}

impl TickerSource for FixerSource {
    fn groups_counters(&self) -> bool {
        true
    }

    fn fetch(&self, unit: &FetchUnit) -> Result<Vec<TickerPoint>> {
        let (start_date, end_date) = match unit.window {
            Window::Dates(start, end) => (start, end),
            Window::Days(TimeRange::Days(n)) => {
                let end = today_utc();
                (end - chrono::Duration::days(i64::from(n)), end)
            }
            Window::Days(TimeRange::Max) => {
                return Err(Error::Config(
                    "fixer time series needs explicit years or days".to_owned(),
                ))
            }
        };
        let series = self.client.execute(GetTimeseries {
            base: unit.subject.clone(),
            symbols: unit.counters.clone(),
            start_date,
            end_date,
        })?;
        let mut points = Vec::with_capacity(series.len());
        for p in series.into_points() {
            points.push(p?);
        }
        Ok(points)
    }
}

/// when points reach the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// everything in one transaction at the end of the run
    Batch,
    /// one transaction per fetch unit, right after the fetch
    PerPair,
}

impl FromStr for WriteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "batch" => Ok(WriteMode::Batch),
            "per-pair" => Ok(WriteMode::PerPair),
            _ => Err(Error::Config(format!("invalid write mode: {}", s))),
        }
    }
}

/// what a failed fetch unit does to the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Abort,
    Skip,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            _ => Err(Error::Config(format!("invalid failure policy: {}", s))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub units: usize,
    pub failed_units: usize,
    pub fetched: usize,
    pub written: usize,
    pub failures: Vec<String>,
}

/// sequences fetch, normalize and write for every unit of a request
pub struct Collector<'a> {
    source: &'a dyn TickerSource,
    sink: &'a mut dyn TickerSink,
    limiter: &'a mut dyn RateLimiter,
    table: TickerTable,
    write_mode: WriteMode,
    on_error: FailurePolicy,
}

impl<'a> Collector<'a> {
    pub fn new(
        source: &'a dyn TickerSource,
        sink: &'a mut dyn TickerSink,
        limiter: &'a mut dyn RateLimiter,
        table: TickerTable,
    ) -> Self {
        Collector {
            source,
            sink,
            limiter,
            table,
            write_mode: WriteMode::Batch,
            on_error: FailurePolicy::Abort,
        }
    }

    pub fn write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    pub fn on_error(mut self, on_error: FailurePolicy) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn run(&mut self, request: &CollectionRequest) -> Result<CollectionReport> {
        self.run_at(request, today_utc())
    }

    pub fn run_at(&mut self, request: &CollectionRequest, today: NaiveDate) -> Result<CollectionReport> {
        let units = request.expand(today, self.source.groups_counters())?;
        info!(
            "Collecting {} through {} calls: subjects={}, counters={}, interval={}.",
            self.table.name(),
            units.len(),
            request.subjects.join(","),
            request.counters.join(","),
            request.interval
        );
        let mut report = CollectionReport {
            units: units.len(),
            ..Default::default()
        };
        let mut pending: Vec<TickerPoint> = Vec::new();
        for unit in &units {
            self.limiter.acquire();
            info!("Fetching tickers for {}.", unit);
            let points = match self.source.fetch(unit) {
                Ok(points) => points,
                Err(e) => {
                    self.fail(unit, e, &mut report)?;
                    continue;
                }
            };
            info!("Fetched {} tickers for {}.", points.len(), unit);
            report.fetched += points.len();
            match self.write_mode {
                WriteMode::Batch => pending.extend(points),
                WriteMode::PerPair => match self.sink.write(self.table, &points) {
                    Ok(n) => report.written += n,
                    Err(e) => self.fail(unit, e, &mut report)?,
                },
            }
        }
        if self.write_mode == WriteMode::Batch {
            report.written += self.sink.write(self.table, &pending)?;
        }
        info!(
            "Collected {}: {} fetched, {} written, {} of {} calls failed.",
            self.table.name(),
            report.fetched,
            report.written,
            report.failed_units,
            report.units
        );
        Ok(report)
    }

    fn fail(&self, unit: &FetchUnit, err: Error, report: &mut CollectionReport) -> Result<()> {
        match self.on_error {
            FailurePolicy::Abort => Err(err),
            FailurePolicy::Skip => {
                warn!("Skipping {} after {} failure: {}", unit, err.stage(), err);
                report.failed_units += 1;
                report.failures.push(format!("{}: {}", unit, err));
                Ok(())
            }
        }
    }
}
