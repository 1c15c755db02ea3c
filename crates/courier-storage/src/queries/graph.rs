// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Item-graph and policy queries, plus the [`ItemGraph`] implementation
//! served from the local database. Links and policies are written by the
//! workspace sync path and read here.

use async_trait::async_trait;
use courier_core::{
    CourierError, Destination, DestinationKind, ItemGraph, MessagingPolicy,
};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

pub async fn add_link(
    db: &Database,
    from_item: &str,
    to_item: &str,
    to_kind: DestinationKind,
) -> Result<(), CourierError> {
    let from_item = from_item.to_string();
    let to_item = to_item.to_string();
    let to_kind = to_kind.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO item_links (from_item, to_item, to_kind)
                 VALUES (?1, ?2, ?3)",
                params![from_item, to_item, to_kind],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn remove_link(
    db: &Database,
    from_item: &str,
    to_item: &str,
) -> Result<(), CourierError> {
    let from_item = from_item.to_string();
    let to_item = to_item.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM item_links WHERE from_item = ?1 AND to_item = ?2",
                params![from_item, to_item],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_policy(
    db: &Database,
    item_id: &str,
    policy: &MessagingPolicy,
) -> Result<(), CourierError> {
    let item_id = item_id.to_string();
    let policy = serde_json::to_string(policy)
        .map_err(|e| CourierError::Internal(format!("serializing policy: {e}")))?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO destination_policies (item_id, policy)
                 VALUES (?1, ?2)
                 ON CONFLICT(item_id) DO UPDATE SET
                    policy = excluded.policy,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![item_id, policy],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Database-backed view of the destination-authorization graph.
#[derive(Clone)]
pub struct SqliteGraph {
    db: Database,
}

impl SqliteGraph {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemGraph for SqliteGraph {
    async fn has_edge(&self, from: &str, to: &str) -> Result<bool, CourierError> {
        let from = from.to_string();
        let to = to.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<bool, rusqlite::Error> {
                let n: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM item_links WHERE from_item = ?1 AND to_item = ?2",
                    params![from, to],
                    |row| row.get(0),
                )?;
                Ok(n > 0)
            })
            .await
            .map_err(map_tr_err)
    }

    async fn destinations(&self, item_id: &str) -> Result<Vec<Destination>, CourierError> {
        let item_id = item_id.to_string();
        self.db
            .connection()
            .call(move |conn| -> Result<Vec<Destination>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    // rowid breaks created_at ties so same-tick inserts
                    // come back in insertion order.
                    "SELECT to_item, to_kind FROM item_links
                     WHERE from_item = ?1 ORDER BY created_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![item_id], |row| {
                    let kind: String = row.get(1)?;
                    let kind: DestinationKind = kind.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            1,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok(Destination {
                        item_id: row.get(0)?,
                        kind,
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(map_tr_err)
    }

    async fn policy(&self, item_id: &str) -> Result<Option<MessagingPolicy>, CourierError> {
        let item_id = item_id.to_string();
        let raw: Option<String> = self
            .db
            .connection()
            .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
                match conn.query_row(
                    "SELECT policy FROM destination_policies WHERE item_id = ?1",
                    params![item_id],
                    |row| row.get(0),
                ) {
                    Ok(policy) => Ok(Some(policy)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?;
        match raw {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| CourierError::Internal(format!("corrupt stored policy: {e}"))),
            None => Ok(None),
        }
    }
}
