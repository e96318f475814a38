//! Fetch-paginate engine
//!
//! Issues bearer-authenticated GETs against the Up API, follows `links.next`
//! until the source is exhausted or the record cap is reached, then hands the
//! records to the resource's tabulator. Pages are fetched strictly one after
//! another.
//!
//! [`Fetcher::fetch`] never fails: every error is flattened into an error grid
//! (see [`UpError::to_grid`]).

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::config::UpConfig;
use crate::envelope::Envelope;
use crate::error::{Result, UpError};
use crate::grid::Grid;
use crate::tabulate::{Payload, ResourceKind};
use crate::token_store::CredentialProvider;

/// Timeout for one HTTP request
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing HTTP connections
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of HTTP redirects to follow
pub const REDIRECT_LIMIT: usize = 5;

/// HTTP client bound to one API root and record cap
#[derive(Clone)]
pub struct Fetcher {
    http_client: reqwest::Client,
    base_url: Url,
    max_records: usize,
}

impl Fetcher {
    pub fn new(config: &UpConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
            .user_agent(concat!("upgrid/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.base_url()?,
            max_records: config.max_records(),
        })
    }

    /// Fetch `path` (relative to the API root) and tabulate it as `kind`
    pub async fn fetch<P>(&self, credentials: &P, path: &str, kind: &ResourceKind) -> Grid
    where
        P: CredentialProvider + ?Sized,
    {
        match self.try_fetch(credentials, path, kind).await {
            Ok(grid) => grid,
            Err(e) => {
                match &e {
                    UpError::MissingToken => debug!("No token cached, skipping request"),
                    UpError::Api { errors } => error!(
                        path,
                        count = errors.len(),
                        first = errors.first().map(|e| e.title.as_str()).unwrap_or_default(),
                        "Up API returned errors"
                    ),
                    other => error!(path, error = %other, "Fetch failed"),
                }
                e.to_grid()
            }
        }
    }

    /// Same as [`Fetcher::fetch`] but surfaces the error instead of a grid
    #[instrument(skip(self, credentials, kind), fields(paginate = kind.paginates()))]
    pub async fn try_fetch<P>(&self, credentials: &P, path: &str, kind: &ResourceKind) -> Result<Grid>
    where
        P: CredentialProvider + ?Sized,
    {
        let token = credentials.token()?.ok_or(UpError::MissingToken)?;
        let first = self.base_url.join(path)?;

        if !kind.paginates() {
            let envelope = self.get_page(&token, first).await?;
            return kind.tabulate(Payload::Single(envelope));
        }

        let mut url = Some(first);
        let mut records: Vec<Value> = Vec::new();
        let mut pages = 0usize;

        while let Some(page_url) = url.take() {
            let mut envelope = self.get_page(&token, page_url).await?;
            pages += 1;

            records.extend(envelope.take_records()?);
            // next links are absolute in practice; join also copes with relative ones
            let next = envelope
                .next_link()
                .map(|link| self.base_url.join(link))
                .transpose()?;
            debug!(
                page = pages,
                accumulated = records.len(),
                has_next = next.is_some(),
                "Fetched page"
            );

            if records.len() >= self.max_records {
                if next.is_some() || records.len() > self.max_records {
                    warn!(
                        cap = self.max_records,
                        "Record cap reached, remaining pages not fetched"
                    );
                }
                records.truncate(self.max_records);
                break;
            }
            url = next;
        }

        kind.tabulate(Payload::Records(records))
    }

    /// GET one page and fail on API-reported errors. Non-2xx statuses are not
    /// errors by themselves; the body decides.
    async fn get_page(&self, token: &str, url: Url) -> Result<Envelope> {
        debug!(url = %url, "GET");
        let response = self.http_client.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            debug!(status = %status, "Non-success status, parsing body for errors");
        }

        Envelope::parse(&body)?.check_errors()
    }
}
