use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use structopt::StructOpt;

use crate::config::Config;
use crate::error::{Error, ErrorKind, Result};
use crate::model::{parse_time, EpochSeconds, TimeRange};
use crate::opentsdb::MatcherPolicy;

pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(3600);

#[derive(Debug, StructOpt)]
#[structopt(
    name = "promql-opentsdb",
    about = "Serves PromQL storage queries from OpenTSDB"
)]
pub struct CliOpt {
    #[structopt(long = "addr", env = "ADDR", default_value = "localhost:9080")]
    pub addr: String,

    #[structopt(
        long = "opentsdb-url",
        env = "OPENTSDB_URL",
        default_value = "http://localhost:4242"
    )]
    pub opentsdb_url: String,

    #[structopt(long = "basic-auth-user", env = "OPENTSDB_USER")]
    pub basic_auth_user: Option<String>,

    #[structopt(
        long = "basic-auth-password",
        env = "OPENTSDB_PASSWORD",
        hide_env_values = true
    )]
    pub basic_auth_password: Option<String>,

    #[structopt(
        long = "timeout",
        env = "QUERY_TIMEOUT",
        default_value = "2m",
        parse(try_from_str = parse_duration)
    )]
    pub timeout: Duration,

    /// Map = and != onto literal filters and reject !~ instead of sending
    /// every tag matcher as a regexp filter.
    #[structopt(long = "strict-matchers")]
    pub strict_matchers: bool,

    #[structopt(long = "verbose", short = "v")]
    pub verbose: bool,

    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Serve the Prometheus HTTP API under /api/v1.
    Serve,

    /// Select series once and print them as a Prometheus API matrix.
    Select {
        selector: String,

        #[structopt(long = "start", short = "s", parse(try_from_str = parse_time))]
        start: Option<EpochSeconds>,

        #[structopt(long = "end", short = "e", parse(try_from_str = parse_time))]
        end: Option<EpochSeconds>,

        /// Output format, "h" for human readable. Prometheus API JSON otherwise.
        #[structopt(long = "encode", short = "E")]
        encode: Option<String>,
    },
}

impl CliOpt {
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::new(&self.addr, &self.opentsdb_url)?
            .with_query_timeout(self.timeout)?
            .with_matcher_policy(if self.strict_matchers {
                MatcherPolicy::Strict
            } else {
                MatcherPolicy::Regexp
            });

        match (&self.basic_auth_user, &self.basic_auth_password) {
            (Some(user), Some(password)) => config = config.with_basic_auth(user, password),
            (None, None) => (),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    "basic auth needs both a user and a password",
                ))
            }
        }

        Ok(config)
    }
}

/// Resolves optional `--start`/`--end` bounds; missing ones default to the
/// last hour.
pub fn select_range(start: Option<EpochSeconds>, end: Option<EpochSeconds>) -> Result<TimeRange> {
    TimeRange::with_defaults(start, end, DEFAULT_LOOKBACK)
}

// Prometheus style duration literals: 30s, 1m30s, 250ms, 1h, 7d.
pub fn parse_duration(s: &str) -> Result<Duration> {
    lazy_static! {
        static ref DURATION_PART_RE: Regex = Regex::new(r"(\d+)(ms|s|m|h|d)").unwrap();
    }

    let mut total = Duration::from_millis(0);
    let mut consumed = 0;
    for cap in DURATION_PART_RE.captures_iter(s) {
        let whole = cap.get(0).map_or(0..0, |m| m.start()..m.end());
        if whole.start != consumed {
            break;
        }
        consumed = whole.end;

        let n: u64 = cap[1]
            .parse()
            .map_err(|e| ("duration out of range", e))?;
        let part = match &cap[2] {
            "ms" => Some(Duration::from_millis(n)),
            "s" => Some(Duration::from_secs(n)),
            "m" => n.checked_mul(60).map(Duration::from_secs),
            "h" => n.checked_mul(3600).map(Duration::from_secs),
            _ => n.checked_mul(86400).map(Duration::from_secs),
        };
        total = match part.and_then(|part| total.checked_add(part)) {
            Some(total) => total,
            None => return Err(duration_out_of_range()),
        };
    }

    if s.is_empty() || consumed != s.len() {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            &format!("invalid duration {:?}", s),
        ));
    }
    Ok(total)
}

fn duration_out_of_range() -> Error {
    Error::new(ErrorKind::InvalidArgument, "duration out of range")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        #[rustfmt::skip]
        let tests = [
            ("30s", Some(Duration::from_secs(30))),
            ("2m", Some(Duration::from_secs(120))),
            ("1h5m", Some(Duration::from_secs(3900))),
            ("250ms", Some(Duration::from_millis(250))),
            ("1d", Some(Duration::from_secs(86400))),
            ("", None),
            ("10", None),
            ("5m ", None),
            ("x5m", None),
            ("999999999999999999d", None),
            ("18446744073709551615s1s", None),
            ("99999999999999999999s", None),
        ];

        for (input, expected) in &tests {
            assert_eq!(parse_duration(input).ok(), *expected, "while parsing {:?}", input);
        }
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        let err = parse_duration("999999999999999999d").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "duration out of range");
    }

    #[test]
    fn test_config_from_args() {
        let opt = CliOpt::from_iter(&[
            "promql-opentsdb",
            "--opentsdb-url",
            "http://tsdb:4242",
            "--basic-auth-user",
            "admin",
            "--basic-auth-password",
            "secret",
            "--timeout",
            "30s",
            "--strict-matchers",
            "serve",
        ]);

        let config = opt.config().unwrap();
        assert_eq!(config.opentsdb_url().as_str(), "http://tsdb:4242/");
        assert_eq!(config.basic_auth().map(|a| a.user.as_str()), Some("admin"));
        assert_eq!(config.query_timeout(), Duration::from_secs(30));
        assert_eq!(config.matcher_policy(), MatcherPolicy::Strict);
    }

    #[test]
    fn test_config_rejects_partial_basic_auth() {
        let opt = CliOpt::from_iter(&["promql-opentsdb", "--basic-auth-user", "admin", "serve"]);
        let err = opt.config().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_select_args() {
        let opt = CliOpt::from_iter(&[
            "promql-opentsdb",
            "select",
            r#"cpu{host="a"}"#,
            "--start",
            "1622100000",
            "--end",
            "2021-05-27T08:35:00Z",
        ]);

        match opt.cmd {
            Command::Select {
                selector,
                start,
                end,
                encode,
            } => {
                assert_eq!(encode, None);
                assert_eq!(selector, r#"cpu{host="a"}"#);
                let range = select_range(start, end).unwrap();
                assert_eq!((range.start(), range.end()), (1622100000, 1622104500));
            }
            cmd => panic!("unexpected command {:?}", cmd),
        }
    }

    #[test]
    fn test_select_range_defaults_to_last_hour() {
        let range = select_range(None, Some(1622104500)).unwrap();
        assert_eq!((range.start(), range.end()), (1622100900, 1622104500));
        assert!(select_range(Some(10), Some(5)).is_err());
    }
}
