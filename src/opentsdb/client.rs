use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use super::request::QueryRequest;
use super::response::{parse_response, ResponseEntry};
use crate::config::{BasicAuth, Config};
use crate::context::QueryContext;
use crate::error::{Error, ErrorKind, Result};

const QUERY_PATH: &str = "api/query";

/// Client for the OpenTSDB `/api/query` endpoint.
#[derive(Clone, Debug)]
pub struct OpenTsdbClient {
    url: Url,
    basic_auth: Option<BasicAuth>,
    http: reqwest::Client,
}

impl OpenTsdbClient {
    pub fn new(base_url: &Url, basic_auth: Option<BasicAuth>, http: reqwest::Client) -> Result<Self> {
        Ok(Self {
            url: query_url(base_url)?,
            basic_auth,
            http,
        })
    }

    pub fn from_config(config: &Config, http: reqwest::Client) -> Result<Self> {
        Self::new(config.opentsdb_url(), config.basic_auth().cloned(), http)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn query(
        &self,
        ctx: &QueryContext,
        request: &QueryRequest,
    ) -> Result<Vec<ResponseEntry>> {
        let body = serde_json::to_vec(request)
            .map_err(|e| Error::with_source(ErrorKind::InvalidArgument, "couldn't encode query", e))?;

        tracing::debug!(
            url = %self.url,
            metric = %request.queries.first().map(|q| q.metric.as_str()).unwrap_or(""),
            filters = request.queries.iter().map(|q| q.filters.len()).sum::<usize>(),
            "querying OpenTSDB"
        );

        let mut builder = self
            .http
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(auth) = &self.basic_auth {
            builder = builder.basic_auth(&auth.user, Some(&auth.password));
        }

        let (status, body) = ctx
            .run(async move {
                let res = builder.send().await?;
                let status = res.status().as_u16();
                let body = res.bytes().await?;
                Ok((status, body))
            })
            .await?;

        parse_response(status, &body)
    }
}

fn query_url(base_url: &Url) -> Result<Url> {
    let mut url = base_url.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| {
            Error::new(
                ErrorKind::InvalidArgument,
                &format!("{} can't be used as a base URL", base_url),
            )
        })?;
        segments.pop_if_empty();
        segments.extend(QUERY_PATH.split('/'));
    }
    Ok(url)
}
