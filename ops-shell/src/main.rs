use dotenv::dotenv;
use log::{info, warn};
use market_data::client::mask_secret;
use market_data::{Interval, MarketDataClient, TimeRange};
use ops_shell::args::{expand_arg_files, parse_codes, parse_list};
use ops_shell::collect::{
    CoingeckoSource, CollectionRequest, Collector, FailurePolicy, FixerSource, RequestRange,
    TickerSource, WriteMode,
};
use ops_shell::datetime::parse_years;
use ops_shell::insert::{open_sink, DbTarget, PgConfig, TickerTable};
use ops_shell::ratelimit::call_interval_limiter;
use ops_shell::registry::{cleanup, DoctlCli, DEFAULT_MIN_KEEP, DEFAULT_REPOSITORIES};
use ops_shell::{init_logging, Error, Result, Verbosity};
use std::path::PathBuf;
use structopt::StructOpt;

fn main() -> std::result::Result<(), Error> {
    dotenv().ok();
    let args = expand_arg_files(std::env::args())?;
    let opt = Opt::from_iter(args);
    init_logging(Verbosity::from_flag(opt.verbose))?;

    match opt.cmd {
        Command::AssetTickers {
            coins,
            vs_currencies,
            days,
            data_interval,
            api_url,
            run,
            db,
        } => {
            info!(
                "Calling Coingecko market chart API: coins={}, vs_currencies={}, days={}, interval={}.",
                coins, vs_currencies, days, data_interval
            );
            let request = CollectionRequest {
                subjects: parse_codes(&coins)?,
                counters: parse_codes(&vs_currencies)?,
                range: RequestRange::Days(days),
                interval: data_interval,
            };
            let source = CoingeckoSource::new(MarketDataClient::with_base_url(&api_url, None));
            collect(&source, TickerTable::Asset, &request, &run, db)?;
        }
        Command::CurrencyTickers {
            access_key,
            base,
            symbols,
            years,
            api_url,
            run,
            db,
        } => {
            info!(
                "Calling Fixer timeseries API: access_key={}, base={}, symbols={}, years={}.",
                mask_secret(&access_key),
                base,
                symbols,
                years
            );
            let request = CollectionRequest {
                subjects: parse_codes(&base)?,
                counters: parse_codes(&symbols)?,
                range: RequestRange::Years(parse_years(&years)?),
                interval: Interval::Daily,
            };
            let client = MarketDataClient::with_base_url(&api_url, Some(&access_key));
            let source = FixerSource::new(client);
            collect(&source, TickerTable::Currency, &request, &run, db)?;
        }
        Command::RegistryCleanup {
            repositories,
            min_keep,
            dry_run,
            doctl,
        } => {
            let repositories: Vec<String> = match repositories {
                Some(ref r) => parse_list(r).map(|s| s.to_owned()).collect(),
                None => DEFAULT_REPOSITORIES.iter().map(|s| s.to_string()).collect(),
            };
            if repositories.is_empty() {
                return Err(Error::Config("no repository given".to_owned()));
            }
            let cli = DoctlCli::new(&doctl);
            let report = cleanup(&cli, &repositories, min_keep.unwrap_or(DEFAULT_MIN_KEEP), dry_run)?;
            info!(
                "Registry cleanup done: {} repositories scanned, {} tags deleted, {} planned.",
                report.scanned, report.deleted, report.planned
            );
            if !report.failed.is_empty() {
                warn!("Deletion failed in: {}", report.failed.join(", "));
            }
        }
    }
    Ok(())
}

fn collect(
    source: &dyn TickerSource,
    table: TickerTable,
    request: &CollectionRequest,
    run: &RunOpt,
    db: DbOpt,
) -> Result<()> {
    let target = db.into_target()?;
    let mut sink = open_sink(&target)?;
    let mut limiter = call_interval_limiter(run.call_interval);
    let report = Collector::new(source, sink.as_mut(), limiter.as_mut(), table)
        .write_mode(run.write_mode)
        .on_error(run.on_error)
        .run(request)?;
    for failure in &report.failures {
        warn!("Failed: {}", failure);
    }
    Ok(())
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "ops-shell",
    about = "operational jobs of cryptofolio",
    after_help = "Arguments can be read from a file, one per line, with @<file>."
)]
struct Opt {
    #[structopt(short, long, global = true, help = "increase output verbosity")]
    verbose: bool,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Collects asset tickers from the Coingecko market chart API
    AssetTickers {
        #[structopt(short, long, help = "comma separated coin ids, e.g. bitcoin,ethereum")]
        coins: String,
        #[structopt(short = "s", long, help = "comma separated currency codes, e.g. usd,eur")]
        vs_currencies: String,
        #[structopt(short, long, help = "number of days back, or max")]
        days: TimeRange,
        #[structopt(short = "i", long, default_value = "daily", help = "daily or hourly")]
        data_interval: Interval,
        #[structopt(long, env = "COINGECKO_API_URL", default_value = "https://api.coingecko.com/api/v3")]
        api_url: String,
        #[structopt(flatten)]
        run: RunOpt,
        #[structopt(flatten)]
        db: DbOpt,
    },
    /// Collects currency tickers from the Fixer timeseries API
    CurrencyTickers {
        #[structopt(short = "k", long, env = "FIXER_ACCESS_KEY", hide_env_values = true)]
        access_key: String,
        #[structopt(short, long, default_value = "usd", help = "the base currency code")]
        base: String,
        #[structopt(short, long, help = "comma separated currency codes, e.g. eur,jpy")]
        symbols: String,
        #[structopt(short, long, help = "comma separated years, e.g. 2021,2022")]
        years: String,
        #[structopt(long, env = "FIXER_API_URL", default_value = "https://data.fixer.io/api")]
        api_url: String,
        #[structopt(flatten)]
        run: RunOpt,
        #[structopt(flatten)]
        db: DbOpt,
    },
    /// Deletes old tags from the container registry through doctl
    RegistryCleanup {
        #[structopt(short, long, help = "comma separated repositories, defaults to all services")]
        repositories: Option<String>,
        #[structopt(long, help = "number of most recent tags to keep, defaults to 3")]
        min_keep: Option<usize>,
        #[structopt(long, help = "only log what would be deleted")]
        dry_run: bool,
        #[structopt(long, env = "DOCTL", default_value = "doctl")]
        doctl: String,
    },
}

#[derive(Debug, StructOpt)]
struct RunOpt {
    #[structopt(long, default_value = "10", help = "seconds between two API calls")]
    call_interval: u64,
    #[structopt(long, default_value = "batch", possible_values = &["batch", "per-pair"])]
    write_mode: WriteMode,
    #[structopt(long, default_value = "abort", possible_values = &["abort", "skip"])]
    on_error: FailurePolicy,
}

#[derive(Debug, StructOpt)]
struct DbOpt {
    #[structopt(long, env = "OPS_DB_FILE", parse(from_os_str), help = "sqlite database file")]
    file: Option<PathBuf>,
    #[structopt(long, env = "OPS_DB_HOST")]
    host: Option<String>,
    #[structopt(long, env = "OPS_DB_PORT", default_value = "5432")]
    port: u16,
    #[structopt(long, env = "OPS_DB_USER")]
    user: Option<String>,
    #[structopt(long, env = "OPS_DB_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    #[structopt(long, env = "OPS_DB_DATABASE", default_value = "cryptofolio")]
    database: String,
}

impl DbOpt {
    /// the sqlite file wins over postgres settings
    fn into_target(self) -> Result<DbTarget> {
        if let Some(file) = self.file {
            return Ok(DbTarget::Sqlite(file));
        }
        match (self.host, self.user) {
            (Some(host), Some(user)) => Ok(DbTarget::Postgres(PgConfig {
                host,
                port: self.port,
                user,
                password: self.password.unwrap_or_default(),
                database: self.database,
            })),
            _ => Err(Error::Config(
                "no database given, use --file or --host and --user".to_owned(),
            )),
        }
    }
}
