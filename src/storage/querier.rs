use async_trait::async_trait;

use super::series::OpenTsdbSeriesSet;
use super::{Appender, Querier, Queryable, SeriesSet};
use crate::config::Config;
use crate::context::QueryContext;
use crate::error::{Error, ErrorKind, Result};
use crate::model::{LabelMatcher, LabelValue, TimeRange};
use crate::opentsdb::{build_request, MatcherPolicy, OpenTsdbClient, ResponseEntry};

/// Read-only storage backed by an OpenTSDB instance.
pub struct OpenTsdbQueryable {
    config: Config,
    http: reqwest::Client,
}

impl OpenTsdbQueryable {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Transport, "couldn't create HTTP client", e))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Queryable for OpenTsdbQueryable {
    fn querier(&self, range: TimeRange) -> Result<Box<dyn Querier>> {
        Ok(Box::new(OpenTsdbQuerier::new(
            OpenTsdbClient::from_config(&self.config, self.http.clone())?,
            range,
            self.config.matcher_policy(),
        )))
    }

    fn appender(&self) -> Result<Box<dyn Appender>> {
        Err(Error::unsupported_operation(
            "OpenTSDB storage is read-only, appending isn't supported",
        ))
    }
}

/// Serves the selects of a single query within fixed time bounds.
pub struct OpenTsdbQuerier {
    client: OpenTsdbClient,
    range: TimeRange,
    policy: MatcherPolicy,
}

impl OpenTsdbQuerier {
    pub fn new(client: OpenTsdbClient, range: TimeRange, policy: MatcherPolicy) -> Self {
        Self {
            client,
            range,
            policy,
        }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    async fn fetch(
        &self,
        ctx: &QueryContext,
        matchers: &[LabelMatcher],
    ) -> Result<Vec<ResponseEntry>> {
        let request = build_request(self.range, matchers, self.policy)?;
        self.client.query(ctx, &request).await
    }
}

#[async_trait]
impl Querier for OpenTsdbQuerier {
    async fn select(&self, ctx: &QueryContext, matchers: &[LabelMatcher]) -> Box<dyn SeriesSet> {
        match self.fetch(ctx, matchers).await {
            Ok(series) => Box::new(OpenTsdbSeriesSet::new(series)),
            Err(err) => {
                tracing::debug!(error = %err, kind = %err.kind(), "select failed");
                Box::new(OpenTsdbSeriesSet::from_error(err))
            }
        }
    }

    async fn label_values(&self, name: &str) -> Result<Vec<LabelValue>> {
        Err(Error::unsupported_operation(&format!(
            "listing values of label {:?} isn't supported by OpenTSDB storage",
            name
        )))
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
