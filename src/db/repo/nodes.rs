//! Reseller node operations for the repository.

use crate::domain::{NodeId, NodeKind, Percent, ResellerNode};
use sqlx::Row;

use super::{decode, decode_money, Repository};

impl Repository {
    /// Insert or replace a reseller node, keeping its original listing position.
    pub async fn upsert_node(&self, node: &ResellerNode) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reseller_nodes (id, kind, name, parent_id, share_on_sales, share_on_profits, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                name = excluded.name,
                parent_id = excluded.parent_id,
                share_on_sales = excluded.share_on_sales,
                share_on_profits = excluded.share_on_profits,
                is_active = excluded.is_active
            "#,
        )
        .bind(node.id.to_string())
        .bind(node.kind.as_str())
        .bind(node.name.as_str())
        .bind(node.parent_id.map(|p| p.to_string()))
        .bind(node.share_on_sales.map(|p| p.value().to_canonical_string()))
        .bind(node.share_on_profits.map(|p| p.value().to_canonical_string()))
        .bind(node.is_active as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every node in insertion order.
    pub async fn list_nodes(&self) -> Result<Vec<ResellerNode>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, name, parent_id, share_on_sales, share_on_profits, is_active
            FROM reseller_nodes
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.get("id");
                let kind: String = row.get("kind");
                let parent_id: Option<String> = row.get("parent_id");
                let on_sales: Option<String> = row.get("share_on_sales");
                let on_profits: Option<String> = row.get("share_on_profits");

                Ok(ResellerNode {
                    id: decode::<NodeId, _>("id", &id)?,
                    kind: decode::<NodeKind, _>("kind", &kind)?,
                    name: row.get("name"),
                    parent_id: parent_id
                        .as_deref()
                        .map(|p| decode::<NodeId, _>("parent_id", p))
                        .transpose()?,
                    share_on_sales: on_sales
                        .as_deref()
                        .map(|s| decode_percent("share_on_sales", s))
                        .transpose()?,
                    share_on_profits: on_profits
                        .as_deref()
                        .map(|s| decode_percent("share_on_profits", s))
                        .transpose()?,
                    is_active: row.get::<i32, _>("is_active") != 0,
                })
            })
            .collect()
    }
}

fn decode_percent(column: &str, raw: &str) -> Result<Percent, sqlx::Error> {
    let value = decode_money(column, raw)?;
    Percent::new(value).map_err(|e| sqlx::Error::Decode(format!("{}: {}", column, e).into()))
}
