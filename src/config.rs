use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, ErrorKind, Result};
use crate::opentsdb::MatcherPolicy;

pub const DEFAULT_LISTEN_ADDR: &str = "localhost:9080";
pub const DEFAULT_OPENTSDB_URL: &str = "http://localhost:4242";
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Eq, PartialEq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

// Keep passwords out of logs.
impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Process-wide settings, built once at startup and handed to whatever
/// needs them.
#[derive(Clone, Debug)]
pub struct Config {
    listen_addr: String,
    opentsdb_url: Url,
    basic_auth: Option<BasicAuth>,
    query_timeout: Duration,
    matcher_policy: MatcherPolicy,
}

impl Config {
    pub fn new(listen_addr: &str, opentsdb_url: &str) -> Result<Self> {
        let opentsdb_url = Url::parse(opentsdb_url)
            .map_err(|e| Error::with_source(ErrorKind::InvalidArgument, "invalid OpenTSDB URL", e))?;
        if opentsdb_url.cannot_be_a_base() {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                &format!("OpenTSDB URL {} can't be used as a base URL", opentsdb_url),
            ));
        }

        Ok(Self {
            listen_addr: listen_addr.to_string(),
            opentsdb_url,
            basic_auth: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            matcher_policy: MatcherPolicy::default(),
        })
    }

    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        self.basic_auth = Some(BasicAuth {
            user: user.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout == Duration::from_secs(0) {
            return Err("query timeout must be positive".into());
        }
        self.query_timeout = timeout;
        Ok(self)
    }

    pub fn with_matcher_policy(mut self, policy: MatcherPolicy) -> Self {
        self.matcher_policy = policy;
        self
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    pub fn opentsdb_url(&self) -> &Url {
        &self.opentsdb_url
    }

    pub fn basic_auth(&self) -> Option<&BasicAuth> {
        self.basic_auth.as_ref()
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub fn matcher_policy(&self) -> MatcherPolicy {
        self.matcher_policy
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            opentsdb_url: Url::parse(DEFAULT_OPENTSDB_URL).expect("default URL is valid"),
            basic_auth: None,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            matcher_policy: MatcherPolicy::default(),
        }
    }
}
