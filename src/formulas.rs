//! Formula entry points: one per resource
//!
//! Each entry point validates its arguments, builds the resource path and
//! delegates to the [`Fetcher`] with the matching [`ResourceKind`]. Like
//! spreadsheet formulas they always return a [`Grid`], never an error.
//!
//! ```rust,no_run
//! use upgrid::{Direction, Fetcher, Formulas, StaticCredential, UpConfig};
//!
//! # async fn demo() -> upgrid::error::Result<()> {
//! let fetcher = Fetcher::new(&UpConfig::default())?;
//! let up = Formulas::new(fetcher, StaticCredential::new("up:yeah:..."));
//!
//! // All outgoing transactions classified as "takeaway"
//! let grid = up
//!     .up_transactions("filter[category]=takeaway", Direction::Debit)
//!     .await;
//! println!("{} rows", grid.len());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};

use crate::fetcher::Fetcher;
use crate::grid::{Cell, Grid};
use crate::query::{encode_component, encode_date, encode_filter_query, with_query};
use crate::tabulate::{Direction, ResourceKind};
use crate::token_store::CredentialProvider;

/// Returned by [`Formulas::up_transactions_for_account`] without an id
pub const ACCOUNT_ID_REQUIRED: &str = "accountId is required.";

pub struct Formulas<P> {
    fetcher: Fetcher,
    credentials: P,
}

impl<P: CredentialProvider> Formulas<P> {
    pub fn new(fetcher: Fetcher, credentials: P) -> Self {
        Self {
            fetcher,
            credentials,
        }
    }

    async fn fetch(&self, path: &str, kind: ResourceKind) -> Grid {
        self.fetcher.fetch(&self.credentials, path, &kind).await
    }

    /// Transactions across all accounts
    pub async fn up_transactions(&self, filter_query: &str, direction: Direction) -> Grid {
        let path = transactions_path(filter_query);
        self.fetch(&path, ResourceKind::Transactions { direction })
            .await
    }

    /// Transactions created between `since` and `until`
    pub async fn up_transactions_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        filter_query: &str,
        direction: Direction,
    ) -> Grid {
        let path = transactions_between_path(since, until, filter_query);
        self.fetch(&path, ResourceKind::Transactions { direction })
            .await
    }

    /// Transactions of one account; an empty id is rejected before any request
    pub async fn up_transactions_for_account(
        &self,
        account_id: &str,
        filter_query: &str,
        direction: Direction,
    ) -> Grid {
        let Some(path) = account_transactions_path(account_id, filter_query) else {
            return Grid::from_rows(vec![vec![Cell::text(ACCOUNT_ID_REQUIRED)]]);
        };
        self.fetch(&path, ResourceKind::Transactions { direction })
            .await
    }

    pub async fn up_accounts(&self) -> Grid {
        self.fetch("accounts", ResourceKind::Accounts).await
    }

    pub async fn up_categories(&self) -> Grid {
        self.fetch("categories", ResourceKind::Categories).await
    }

    pub async fn up_tags(&self) -> Grid {
        self.fetch("tags", ResourceKind::Tags).await
    }

    /// Validate the token; shows the API status emoji and the cached expiry
    pub async fn up_ping(&self) -> Grid {
        let token_expiry = self.credentials.token_expiry().ok().flatten();
        self.fetch("util/ping", ResourceKind::Ping { token_expiry })
            .await
    }
}

pub fn transactions_path(filter_query: &str) -> String {
    with_query("transactions", &[encode_filter_query(filter_query)])
}

pub fn transactions_between_path(
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    filter_query: &str,
) -> String {
    with_query(
        "transactions",
        &[
            format!("filter[since]={}", encode_date(since)),
            format!("filter[until]={}", encode_date(until)),
            encode_filter_query(filter_query),
        ],
    )
}

/// `None` when `account_id` is blank
pub fn account_transactions_path(account_id: &str, filter_query: &str) -> Option<String> {
    let account_id = account_id.trim();
    if account_id.is_empty() {
        return None;
    }
    Some(with_query(
        &format!("accounts/{}/transactions", encode_component(account_id)),
        &[encode_filter_query(filter_query)],
    ))
}
