//! Durable trade persistence.
//!
//! Trades are batched in memory by the order book actor and flushed here
//! in a single transaction, either periodically or once the pending
//! buffer crosses a configured threshold. Every method on [`TradeStore`]
//! is synchronous and blocking; async callers run it through
//! [`tokio::task::spawn_blocking`] so a slow disk never stalls the
//! runtime.

pub mod error;

use crate::book::Trade;
use error::StoreError;
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS trades (
    trade_id         INTEGER PRIMARY KEY,
    maker_order_id   TEXT NOT NULL,
    taker_order_id   TEXT NOT NULL,
    buyer_id         TEXT NOT NULL,
    seller_id        TEXT NOT NULL,
    price            TEXT NOT NULL,
    price_f64        REAL NOT NULL,
    quantity         INTEGER NOT NULL,
    timestamp        REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_trades_timestamp ON trades (timestamp);
"#;

/// One open/high/low/close/volume bucket.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OhlcBar {
    /// Unix-seconds start of this bucket.
    #[serde(rename = "time")]
    pub bucket_start: f64,
    /// Price of the first trade in the bucket.
    pub open: f64,
    /// Highest trade price in the bucket.
    pub high: f64,
    /// Lowest trade price in the bucket.
    pub low: f64,
    /// Price of the last trade in the bucket.
    pub close: f64,
    /// Summed traded quantity in the bucket.
    pub volume: u64,
}

/// A SQLite-backed store of every trade the book has ever produced.
#[derive(Clone)]
pub struct TradeStore {
    conn: Arc<Mutex<Connection>>,
}

impl TradeStore {
    /// Opens (creating if absent) a trade store at `path`.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        info!(path, "trade store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store, used by tests and ad-hoc runs.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Appends a batch of trades in a single transaction. A no-op on an
    /// empty slice.
    pub fn append_batch(&self, trades: &[Trade]) -> Result<usize, StoreError> {
        if trades.is_empty() {
            return Ok(0);
        }
        let conn = self.conn.lock();
        conn.execute("BEGIN IMMEDIATE", [])?;
        let result = (|| -> Result<usize, StoreError> {
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO trades
                 (trade_id, maker_order_id, taker_order_id, buyer_id, seller_id,
                  price, price_f64, quantity, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            let mut inserted = 0;
            for trade in trades {
                inserted += stmt.execute(params![
                    trade.trade_id as i64,
                    trade.maker_order_id.to_string(),
                    trade.taker_order_id.to_string(),
                    trade.buyer_id.to_string(),
                    trade.seller_id.to_string(),
                    trade.price.to_string(),
                    trade.price.to_string().parse::<f64>().unwrap_or(0.0),
                    trade.quantity as i64,
                    trade.timestamp,
                ])?;
            }
            Ok(inserted)
        })();

        match result {
            Ok(inserted) => {
                conn.execute("COMMIT", [])?;
                debug!(inserted, "flushed trade batch");
                Ok(inserted)
            }
            Err(err) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(err)
            }
        }
    }

    /// Trades with `timestamp` in `[from, to]` (either bound optional and
    /// open-ended when absent), ordered oldest first.
    pub fn range_trades(
        &self,
        from: Option<f64>,
        to: Option<f64>,
    ) -> Result<Vec<Trade>, StoreError> {
        let conn = self.conn.lock();
        let mut conditions = Vec::new();
        if from.is_some() {
            conditions.push("timestamp >= ?");
        }
        if to.is_some() {
            conditions.push("timestamp <= ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT trade_id, maker_order_id, taker_order_id, buyer_id, seller_id,
                    price, quantity, timestamp
             FROM trades{where_clause}
             ORDER BY timestamp ASC"
        );
        let mut stmt = conn.prepare(&query)?;
        let mut bind_params: Vec<f64> = Vec::new();
        bind_params.extend(from);
        bind_params.extend(to);
        let rows = stmt.query_map(rusqlite::params_from_iter(bind_params.iter()), |row| {
            let price_text: String = row.get(5)?;
            let maker: String = row.get(1)?;
            let taker: String = row.get(2)?;
            let buyer: String = row.get(3)?;
            let seller: String = row.get(4)?;
            Ok((
                row.get::<_, i64>(0)?,
                maker,
                taker,
                buyer,
                seller,
                price_text,
                row.get::<_, i64>(6)?,
                row.get::<_, f64>(7)?,
            ))
        })?;

        let mut trades = Vec::new();
        for row in rows {
            let (trade_id, maker, taker, buyer, seller, price_text, quantity, timestamp) = row?;
            trades.push(Trade {
                trade_id: trade_id as u64,
                maker_order_id: parse_uuid(&maker)?,
                taker_order_id: parse_uuid(&taker)?,
                buyer_id: parse_uuid(&buyer)?,
                seller_id: parse_uuid(&seller)?,
                price: Decimal::from_str(&price_text).map_err(|e| StoreError::Unavailable {
                    message: e.to_string(),
                })?,
                quantity: quantity as u64,
                timestamp,
            });
        }
        Ok(trades)
    }

    /// OHLC bars of width `interval_seconds`, covering trades with
    /// `timestamp` in `[from, to]` (either bound optional and open-ended
    /// when absent).
    ///
    /// Each bucket's start is `floor(timestamp / interval) * interval`,
    /// independent of `from` — a trade at the same wall-clock time falls
    /// in the same bucket no matter what range it was queried through.
    /// Buckets with no trades are omitted rather than emitted with a null
    /// open/close. `interval_seconds` must be positive.
    pub fn ohlc(
        &self,
        from: Option<f64>,
        to: Option<f64>,
        interval_seconds: f64,
    ) -> Result<Vec<OhlcBar>, StoreError> {
        if interval_seconds <= 0.0 {
            return Err(StoreError::InvalidInterval {
                seconds: interval_seconds,
            });
        }

        let conn = self.conn.lock();
        let mut conditions = Vec::new();
        if from.is_some() {
            conditions.push("timestamp >= ?");
        }
        if to.is_some() {
            conditions.push("timestamp <= ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "WITH buckets AS (
                SELECT
                    price_f64,
                    quantity,
                    timestamp,
                    CAST(timestamp / ? AS INTEGER) * ? AS bucket_start,
                    ROW_NUMBER() OVER (
                        PARTITION BY CAST(timestamp / ? AS INTEGER)
                        ORDER BY timestamp ASC
                    ) AS rn_open,
                    ROW_NUMBER() OVER (
                        PARTITION BY CAST(timestamp / ? AS INTEGER)
                        ORDER BY timestamp DESC
                    ) AS rn_close
                FROM trades{where_clause}
            )
            SELECT
                bucket_start,
                MAX(CASE WHEN rn_open = 1 THEN price_f64 END) AS open,
                MAX(price_f64) AS high,
                MIN(price_f64) AS low,
                MAX(CASE WHEN rn_close = 1 THEN price_f64 END) AS close,
                SUM(quantity) AS volume
            FROM buckets
            GROUP BY bucket_start
            HAVING open IS NOT NULL
            ORDER BY bucket_start ASC"
        );
        let mut stmt = conn.prepare(&query)?;

        let mut bind_params = vec![interval_seconds; 4];
        bind_params.extend(from);
        bind_params.extend(to);

        let rows = stmt.query_map(rusqlite::params_from_iter(bind_params.iter()), |row| {
            Ok(OhlcBar {
                bucket_start: row.get(0)?,
                open: row.get(1)?,
                high: row.get(2)?,
                low: row.get(3)?,
                close: row.get(4)?,
                volume: row.get::<_, i64>(5)? as u64,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

fn parse_uuid(text: &str) -> Result<Uuid, rusqlite::Error> {
    Uuid::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(id: u64, price: i64, qty: u64, ts: f64) -> Trade {
        Trade {
            trade_id: id,
            maker_order_id: Uuid::new_v4(),
            taker_order_id: Uuid::new_v4(),
            buyer_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            price: Decimal::new(price, 0),
            quantity: qty,
            timestamp: ts,
        }
    }

    #[test]
    fn open_and_append() {
        let store = TradeStore::open_memory().unwrap();
        let inserted = store.append_batch(&[trade(1, 100, 5, 1.0)]).unwrap();
        assert_eq!(inserted, 1);
    }

    #[test]
    fn append_batch_is_a_single_transaction() {
        let store = TradeStore::open_memory().unwrap();
        let batch = vec![trade(1, 100, 5, 1.0), trade(2, 101, 3, 2.0)];
        assert_eq!(store.append_batch(&batch).unwrap(), 2);
        let loaded = store.range_trades(Some(0.0), Some(10.0)).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn duplicate_trade_id_is_ignored() {
        let store = TradeStore::open_memory().unwrap();
        store.append_batch(&[trade(1, 100, 5, 1.0)]).unwrap();
        let inserted = store.append_batch(&[trade(1, 999, 1, 9.0)]).unwrap();
        assert_eq!(inserted, 0);
    }

    #[test]
    fn range_trades_respects_bounds() {
        let store = TradeStore::open_memory().unwrap();
        store
            .append_batch(&[trade(1, 100, 1, 1.0), trade(2, 100, 1, 5.0), trade(3, 100, 1, 9.0)])
            .unwrap();
        let loaded = store.range_trades(Some(2.0), Some(8.0)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].trade_id, 2);
    }

    #[test]
    fn range_trades_bounds_are_inclusive() {
        let store = TradeStore::open_memory().unwrap();
        store
            .append_batch(&[trade(1, 100, 1, 1.0), trade(2, 100, 1, 5.0), trade(3, 100, 1, 9.0)])
            .unwrap();
        let loaded = store.range_trades(Some(5.0), Some(9.0)).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn range_trades_with_no_bounds_returns_everything() {
        let store = TradeStore::open_memory().unwrap();
        store
            .append_batch(&[trade(1, 100, 1, 1.0), trade(2, 100, 1, 5.0)])
            .unwrap();
        let loaded = store.range_trades(None, None).unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn ohlc_rejects_non_positive_interval() {
        let store = TradeStore::open_memory().unwrap();
        let err = store.ohlc(Some(0.0), Some(10.0), 0.0).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInterval { .. }));
    }

    #[test]
    fn ohlc_buckets_open_high_low_close() {
        let store = TradeStore::open_memory().unwrap();
        store
            .append_batch(&[
                trade(1, 100, 1, 0.0),
                trade(2, 105, 1, 1.0),
                trade(3, 95, 1, 2.0),
                trade(4, 102, 1, 61.0),
            ])
            .unwrap();
        let bars = store.ohlc(Some(0.0), Some(120.0), 60.0).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 105.0);
        assert_eq!(bars[0].low, 95.0);
        assert_eq!(bars[0].close, 95.0);
        assert_eq!(bars[0].volume, 3);
        assert_eq!(bars[1].open, 102.0);
    }

    #[test]
    fn empty_buckets_are_omitted() {
        let store = TradeStore::open_memory().unwrap();
        store
            .append_batch(&[trade(1, 100, 1, 0.0), trade(2, 100, 1, 125.0)])
            .unwrap();
        let bars = store.ohlc(Some(0.0), Some(180.0), 60.0).unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn ohlc_bucket_boundaries_do_not_shift_with_from() {
        let store = TradeStore::open_memory().unwrap();
        store
            .append_batch(&[trade(1, 100, 1, 30.0), trade(2, 105, 1, 90.0)])
            .unwrap();
        let queried_from_zero = store.ohlc(Some(0.0), None, 60.0).unwrap();
        let queried_from_mid = store.ohlc(Some(20.0), None, 60.0).unwrap();
        assert_eq!(queried_from_zero[0].bucket_start, 0.0);
        assert_eq!(queried_from_mid[0].bucket_start, 0.0);
    }

    #[test]
    fn ohlc_with_no_bounds_covers_everything() {
        let store = TradeStore::open_memory().unwrap();
        store
            .append_batch(&[trade(1, 100, 1, 0.0), trade(2, 105, 1, 65.0)])
            .unwrap();
        let bars = store.ohlc(None, None, 60.0).unwrap();
        assert_eq!(bars.len(), 2);
    }
}
