//! Remote fact store speaking the PostgREST dialect used by the back-office database.

use super::{FactStore, FactStoreError, TaquillaScope, WinnerScope};
use crate::domain::{
    Bet, BetId, DailyResult, DateRange, Decimal, LotteryId, NodeId, NodeKind, Percent, Prize,
    ResellerNode, ResultId, Winner,
};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Rows requested per page.
const PAGE_SIZE: usize = 1000;
/// Ids per `in.(...)` filter, keeping request URLs short.
const IDS_PER_REQUEST: usize = 150;

/// Total orderings per table; offset pagination is only stable over these.
const BETS_ORDER: &str = "created_at.asc,id.asc";
const WINNERS_ORDER: &str = "created_at.asc,bet_id.asc";
const RESULTS_ORDER: &str = "result_date.asc,id.asc";
const NODES_ORDER: &str = "created_at.asc,id.asc";

type Filters = Vec<(String, String)>;

#[derive(Debug, Clone)]
pub struct RestFactStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestFactStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Fetch every row of `table` matching `filters`, following pagination in `order`.
    async fn select_all<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &Filters,
        order: &str,
    ) -> Result<Vec<T>, FactStoreError> {
        let mut out = Vec::new();
        let mut offset = 0usize;
        loop {
            let query = page_query(filters, order, offset);
            let page = self.select_page(table, &query).await?;
            let len = page.len();
            for value in page {
                let row = serde_json::from_value::<T>(value).map_err(|e| {
                    warn!("Malformed {} row: {}", table, e);
                    FactStoreError::ParseError(format!("{}: {}", table, e))
                })?;
                out.push(row);
            }
            if len < PAGE_SIZE {
                break;
            }
            offset += len;
        }
        debug!("Fetched {} rows from {}", out.len(), table);
        Ok(out)
    }

    async fn select_page(
        &self,
        table: &str,
        query: &Filters,
    ) -> Result<Vec<serde_json::Value>, FactStoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let mut request = self.client.get(&url).query(query);
            if let Some(key) = &self.api_key {
                request = request.header("apikey", key).bearer_auth(key);
            }

            let response = request.send().await.map_err(|e| {
                backoff::Error::transient(FactStoreError::NetworkError(e.to_string()))
            })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(FactStoreError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(FactStoreError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(FactStoreError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            let body = response.json::<serde_json::Value>().await.map_err(|e| {
                backoff::Error::permanent(FactStoreError::ParseError(e.to_string()))
            })?;
            match body {
                serde_json::Value::Array(rows) => Ok(rows),
                _ => Err(backoff::Error::permanent(FactStoreError::ParseError(
                    "Expected array response".to_string(),
                ))),
            }
        })
        .await
    }
}

fn page_query(filters: &Filters, order: &str, offset: usize) -> Filters {
    let mut query = filters.clone();
    query.push(("select".to_string(), "*".to_string()));
    query.push(("order".to_string(), order.to_string()));
    query.push(("limit".to_string(), PAGE_SIZE.to_string()));
    query.push(("offset".to_string(), offset.to_string()));
    query
}

fn created_at_filters(range: &DateRange) -> Filters {
    let (start, end) = range.utc_bounds();
    vec![
        ("created_at".to_string(), format!("gte.{}", timestamp(start))),
        ("created_at".to_string(), format!("lt.{}", timestamp(end))),
    ]
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn in_filter(column: &str, ids: &[NodeId]) -> (String, String) {
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    (column.to_string(), format!("in.({})", joined))
}

#[derive(Debug, Deserialize)]
struct BetRow {
    id: BetId,
    taquilla_id: NodeId,
    lottery_id: LotteryId,
    animal_number: String,
    amount: Decimal,
    created_at: DateTime<Utc>,
}

impl From<BetRow> for Bet {
    fn from(row: BetRow) -> Self {
        Bet {
            id: row.id,
            taquilla_id: row.taquilla_id,
            lottery_id: row.lottery_id,
            animal_number: row.animal_number,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WinnerRow {
    bet_id: BetId,
    taquilla_id: NodeId,
    lottery_id: LotteryId,
    amount: Decimal,
    potential_win: Decimal,
    created_at: DateTime<Utc>,
}

impl From<WinnerRow> for Winner {
    fn from(row: WinnerRow) -> Self {
        Winner {
            bet_id: row.bet_id,
            taquilla_id: row.taquilla_id,
            lottery_id: row.lottery_id,
            amount: row.amount,
            potential_win: row.potential_win,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailyResultRow {
    id: ResultId,
    lottery_id: LotteryId,
    result_date: NaiveDate,
    animal_number: String,
    animal_name: String,
    multiplier: Decimal,
    total_to_pay: Decimal,
    total_raised: Decimal,
}

impl From<DailyResultRow> for DailyResult {
    fn from(row: DailyResultRow) -> Self {
        DailyResult {
            id: row.id,
            lottery_id: row.lottery_id,
            result_date: row.result_date,
            prize: Prize {
                animal_number: row.animal_number,
                animal_name: row.animal_name,
                multiplier: row.multiplier,
            },
            total_to_pay: row.total_to_pay,
            total_raised: row.total_raised,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeRow {
    id: NodeId,
    kind: NodeKind,
    #[serde(default)]
    name: Option<String>,
    parent_id: Option<NodeId>,
    share_on_sales: Option<Percent>,
    share_on_profits: Option<Percent>,
    #[serde(default = "default_active")]
    is_active: bool,
}

fn default_active() -> bool {
    true
}

impl From<NodeRow> for ResellerNode {
    fn from(row: NodeRow) -> Self {
        ResellerNode {
            id: row.id,
            kind: row.kind,
            name: row.name.unwrap_or_default(),
            parent_id: row.parent_id,
            share_on_sales: row.share_on_sales,
            share_on_profits: row.share_on_profits,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl FactStore for RestFactStore {
    async fn list_bets(
        &self,
        scope: &TaquillaScope,
        range: &DateRange,
    ) -> Result<Vec<Bet>, FactStoreError> {
        let mut bets = Vec::new();
        for chunk in scope.ids().chunks(IDS_PER_REQUEST) {
            let mut filters = created_at_filters(range);
            filters.push(in_filter("taquilla_id", chunk));
            let rows: Vec<BetRow> = self.select_all("bets", &filters, BETS_ORDER).await?;
            bets.extend(rows.into_iter().map(Bet::from));
        }
        Ok(bets)
    }

    async fn list_winners(
        &self,
        scope: &WinnerScope,
        range: &DateRange,
    ) -> Result<Vec<Winner>, FactStoreError> {
        let mut batches: Vec<Filters> = Vec::new();
        match scope {
            WinnerScope::Global => batches.push(created_at_filters(range)),
            WinnerScope::Lottery(id) => {
                let mut filters = created_at_filters(range);
                filters.push(("lottery_id".to_string(), format!("eq.{}", id)));
                batches.push(filters);
            }
            WinnerScope::Taquillas(ids) => {
                for chunk in ids.chunks(IDS_PER_REQUEST) {
                    let mut filters = created_at_filters(range);
                    filters.push(in_filter("taquilla_id", chunk));
                    batches.push(filters);
                }
            }
        }

        let mut winners = Vec::new();
        for filters in &batches {
            let rows: Vec<WinnerRow> = self
                .select_all("winners", filters, WINNERS_ORDER)
                .await?;
            winners.extend(rows.into_iter().map(Winner::from));
        }
        Ok(winners)
    }

    async fn list_daily_results(
        &self,
        range: &DateRange,
    ) -> Result<Vec<DailyResult>, FactStoreError> {
        let filters = vec![
            (
                "result_date".to_string(),
                format!("gte.{}", range.first_day().format("%Y-%m-%d")),
            ),
            (
                "result_date".to_string(),
                format!("lte.{}", range.last_day().format("%Y-%m-%d")),
            ),
        ];
        let rows: Vec<DailyResultRow> = self
            .select_all("daily_results", &filters, RESULTS_ORDER)
            .await?;
        Ok(rows.into_iter().map(DailyResult::from).collect())
    }

    async fn list_reseller_nodes(&self) -> Result<Vec<ResellerNode>, FactStoreError> {
        let rows: Vec<NodeRow> = self
            .select_all("reseller_nodes", &Vec::new(), NODES_ORDER)
            .await?;
        Ok(rows.into_iter().map(ResellerNode::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_created_at_filters_are_half_open() {
        let offset = FixedOffset::west_opt(4 * 3600).unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let filters = created_at_filters(&DateRange::days(offset, day, day));
        assert_eq!(
            filters,
            vec![
                ("created_at".to_string(), "gte.2024-03-05T04:00:00.000Z".to_string()),
                ("created_at".to_string(), "lt.2024-03-06T04:00:00.000Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_page_query_carries_total_order() {
        let filters = vec![("taquilla_id".to_string(), "eq.x".to_string())];
        let first = page_query(&filters, BETS_ORDER, 0);
        let second = page_query(&filters, BETS_ORDER, PAGE_SIZE);

        let get = |q: &Filters, key: &str| {
            q.iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(get(&first, "order"), vec!["created_at.asc,id.asc".to_string()]);
        assert_eq!(get(&second, "order"), get(&first, "order"));
        assert_eq!(get(&first, "offset"), vec!["0".to_string()]);
        assert_eq!(get(&second, "offset"), vec![PAGE_SIZE.to_string()]);
        assert_eq!(get(&second, "taquilla_id"), vec!["eq.x".to_string()]);
    }

    #[test]
    fn test_every_table_order_ends_on_a_unique_key() {
        for (order, key) in [
            (BETS_ORDER, "id.asc"),
            (WINNERS_ORDER, "bet_id.asc"),
            (RESULTS_ORDER, "id.asc"),
            (NODES_ORDER, "id.asc"),
        ] {
            assert!(order.ends_with(key), "{}", order);
        }
    }

    #[test]
    fn test_in_filter_joins_ids() {
        let a = NodeId::random();
        let b = NodeId::random();
        let (column, value) = in_filter("taquilla_id", &[a, b]);
        assert_eq!(column, "taquilla_id");
        assert_eq!(value, format!("in.({},{})", a, b));
    }

    #[test]
    fn test_node_row_parsing() {
        let id = NodeId::random();
        let json = serde_json::json!({
            "id": id.to_string(),
            "kind": "agencia",
            "name": null,
            "parent_id": null,
            "share_on_sales": 10,
            "share_on_profits": null
        });
        let node: ResellerNode = serde_json::from_value::<NodeRow>(json).unwrap().into();
        assert_eq!(node.id, id);
        assert_eq!(node.kind, NodeKind::Agencia);
        assert_eq!(node.share_on_sales.unwrap().value(), Decimal::from(10));
        assert!(node.is_active);
        assert!(node.name.is_empty());
    }

    #[test]
    fn test_bet_row_parsing() {
        let json = serde_json::json!({
            "id": BetId::random().to_string(),
            "taquilla_id": NodeId::random().to_string(),
            "lottery_id": LotteryId::random().to_string(),
            "animal_number": "00",
            "amount": 12.5,
            "created_at": "2024-03-05T14:00:00Z"
        });
        let bet: Bet = serde_json::from_value::<BetRow>(json).unwrap().into();
        assert_eq!(bet.amount, Decimal::from_str_canonical("12.5").unwrap());
        assert_eq!(
            bet.created_at,
            Utc.with_ymd_and_hms(2024, 3, 5, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = RestFactStore::new("https://facts.example/".to_string(), None);
        assert_eq!(store.base_url, "https://facts.example");
    }
}
