//! Tabulators: raw records → header + rows
//!
//! Each [`ResourceKind`] maps to one pure function. Paginated kinds receive
//! the accumulated `data` records; [`ResourceKind::Ping`] receives the whole
//! envelope since that endpoint does not paginate.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{Result, UpError};
use crate::grid::{Cell, Grid};
use crate::resources::{Account, Category, PingMeta, Tag, Transaction};

pub const TRANSACTIONS_HEADINGS: [&str; 11] = [
    "Created At",
    "Settled At",
    "Status",
    "Direction",
    "Currency",
    "Value",
    "Description",
    "Category",
    "Parent Category",
    "Tags",
    "Message",
];

pub const ACCOUNTS_HEADINGS: [&str; 6] = [
    "Account ID",
    "Created At",
    "Type",
    "Name",
    "Currency",
    "Balance",
];

pub const CATEGORIES_HEADINGS: [&str; 3] = ["Category ID", "Category Name", "Parent Category ID"];

pub const TAGS_HEADINGS: [&str; 1] = ["Tag"];

pub const PING_HEADINGS: [&str; 2] = ["Up API Status", "Token Expiry"];

/// Id of the implicit root category every top-level category hangs off
pub const ROOT_CATEGORY_ID: &str = "all";

/// Client-side filter on transaction direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    #[default]
    All,
    /// Money out (`valueInBaseUnits < 0`)
    Debit,
    /// Money in (`valueInBaseUnits > 0`)
    Credit,
}

impl Direction {
    pub fn keeps(self, value_in_base_units: i64) -> bool {
        match self {
            Direction::All => true,
            Direction::Debit => value_in_base_units < 0,
            Direction::Credit => value_in_base_units > 0,
        }
    }

    /// Label shown in the Direction column; zero counts as a credit
    pub fn label(value_in_base_units: i64) -> &'static str {
        if value_in_base_units < 0 {
            "DEBIT"
        } else {
            "CREDIT"
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::All => write!(f, "ALL"),
            Direction::Debit => write!(f, "DEBIT"),
            Direction::Credit => write!(f, "CREDIT"),
        }
    }
}

impl FromStr for Direction {
    type Err = UpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "ALL" => Ok(Direction::All),
            "DEBIT" => Ok(Direction::Debit),
            "CREDIT" => Ok(Direction::Credit),
            other => Err(UpError::InvalidArgument {
                reason: format!("unknown direction '{}' (expected ALL, DEBIT or CREDIT)", other),
            }),
        }
    }
}

/// Resource type of a request, selecting its tabulator
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceKind {
    Transactions { direction: Direction },
    Accounts,
    Categories,
    Tags,
    /// `token_expiry` is the cached expiry shown next to the status
    Ping { token_expiry: Option<String> },
}

/// What a tabulator is fed
#[derive(Debug)]
pub enum Payload {
    /// Accumulated `data` records of a paginated fetch
    Records(Vec<Value>),
    /// Whole envelope of a single-object response
    Single(Envelope),
}

impl ResourceKind {
    /// Whether the fetch engine should follow `links.next`
    pub fn paginates(&self) -> bool {
        !matches!(self, ResourceKind::Ping { .. })
    }

    pub fn headings(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Transactions { .. } => &TRANSACTIONS_HEADINGS,
            ResourceKind::Accounts => &ACCOUNTS_HEADINGS,
            ResourceKind::Categories => &CATEGORIES_HEADINGS,
            ResourceKind::Tags => &TAGS_HEADINGS,
            ResourceKind::Ping { .. } => &PING_HEADINGS,
        }
    }

    pub fn tabulate(&self, payload: Payload) -> Result<Grid> {
        match (self, payload) {
            (ResourceKind::Ping { token_expiry }, Payload::Single(envelope)) => {
                tabulate_ping(&envelope, token_expiry.as_deref())
            }
            (ResourceKind::Ping { .. }, Payload::Records(_)) => {
                Err(UpError::malformed("ping expects a single response"))
            }
            (_, Payload::Single(mut envelope)) => {
                let records = envelope.take_records()?;
                self.tabulate(Payload::Records(records))
            }
            (ResourceKind::Transactions { direction }, Payload::Records(records)) => {
                tabulate_transactions(*direction, records)
            }
            (ResourceKind::Accounts, Payload::Records(records)) => tabulate_accounts(records),
            (ResourceKind::Categories, Payload::Records(records)) => tabulate_categories(records),
            (ResourceKind::Tags, Payload::Records(records)) => tabulate_tags(records),
        }
    }
}

pub fn tabulate_transactions(direction: Direction, records: Vec<Value>) -> Result<Grid> {
    let mut grid = Grid::with_header(&TRANSACTIONS_HEADINGS);

    for record in records {
        let tx = Transaction::from_value("transaction", record)?;
        let attributes = &tx.attributes;
        let base_units = attributes.amount.value_in_base_units;
        if !direction.keeps(base_units) {
            continue;
        }

        let tags = tx
            .relationships
            .tags
            .data
            .iter()
            .map(|tag| tag.id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        grid.push(vec![
            Cell::Date(attributes.created_at),
            attributes.settled_at.map(Cell::Date).unwrap_or_else(Cell::empty),
            Cell::text(attributes.status.as_str()),
            Cell::text(Direction::label(base_units)),
            Cell::text(attributes.amount.currency_code.as_str()),
            Cell::Number(attributes.amount.decimal()?.abs()),
            Cell::text(attributes.description.as_str()),
            Cell::text(tx.relationships.category.id().unwrap_or_default()),
            Cell::text(tx.relationships.parent_category.id().unwrap_or_default()),
            Cell::Text(tags),
            Cell::text(attributes.message.as_deref().unwrap_or_default()),
        ]);
    }

    Ok(grid)
}

pub fn tabulate_accounts(records: Vec<Value>) -> Result<Grid> {
    let mut grid = Grid::with_header(&ACCOUNTS_HEADINGS);

    for record in records {
        let account = Account::from_value("account", record)?;
        let attributes = account.attributes;
        grid.push(vec![
            Cell::Text(account.id),
            Cell::Date(attributes.created_at),
            Cell::Text(attributes.account_type),
            Cell::Text(attributes.display_name),
            Cell::Text(attributes.balance.currency_code),
            Cell::Text(attributes.balance.value),
        ]);
    }

    Ok(grid)
}

/// Always ends with the synthesized root row `("all", "All", "")`
pub fn tabulate_categories(records: Vec<Value>) -> Result<Grid> {
    let mut grid = Grid::with_header(&CATEGORIES_HEADINGS);

    for record in records {
        let category = Category::from_value("category", record)?;
        let parent = category
            .relationships
            .parent
            .id()
            .unwrap_or(ROOT_CATEGORY_ID)
            .to_string();
        grid.push(vec![
            Cell::Text(category.id),
            Cell::Text(category.attributes.name),
            Cell::Text(parent),
        ]);
    }

    grid.push(vec![
        Cell::text(ROOT_CATEGORY_ID),
        Cell::text("All"),
        Cell::empty(),
    ]);
    Ok(grid)
}

pub fn tabulate_tags(records: Vec<Value>) -> Result<Grid> {
    let mut grid = Grid::with_header(&TAGS_HEADINGS);

    for record in records {
        let tag: Tag = serde_json::from_value(record)
            .map_err(|e| UpError::malformed(format!("invalid tag record: {}", e)))?;
        grid.push(vec![Cell::Text(tag.id)]);
    }

    Ok(grid)
}

pub fn tabulate_ping(envelope: &Envelope, token_expiry: Option<&str>) -> Result<Grid> {
    let meta: PingMeta = match &envelope.meta {
        Some(meta) => serde_json::from_value(meta.clone())
            .map_err(|e| UpError::malformed(format!("invalid ping meta: {}", e)))?,
        None => return Err(UpError::malformed("ping response has no meta block")),
    };

    let mut grid = Grid::with_header(&PING_HEADINGS);
    grid.push(vec![
        Cell::Text(meta.status_emoji),
        Cell::text(token_expiry.unwrap_or_default()),
    ]);
    Ok(grid)
}
