//! Bet, winner and daily result operations for the repository.
//!
//! Inserts exist for the result-posting producer and fixtures; the engine only reads.

use crate::domain::{Bet, DailyResult, LotteryId, NodeId, Prize, Winner};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{decode, decode_money, decode_time, placeholders, Repository, IN_CHUNK_SIZE};

impl Repository {
    /// Record a bet. Returns false when the id already exists.
    pub async fn insert_bet(&self, bet: &Bet) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO bets (id, taquilla_id, lottery_id, animal_number, amount, created_at_ms)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(bet.id.to_string())
        .bind(bet.taquilla_id.to_string())
        .bind(bet.lottery_id.to_string())
        .bind(bet.animal_number.as_str())
        .bind(bet.amount.to_canonical_string())
        .bind(bet.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a posted result. One per lottery per day; a second posting is ignored.
    pub async fn insert_daily_result(&self, result: &DailyResult) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            r#"
            INSERT INTO daily_results (
                id, lottery_id, result_date, animal_number, animal_name,
                multiplier, total_to_pay, total_raised
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(result.id.to_string())
        .bind(result.lottery_id.to_string())
        .bind(result.result_date.format("%Y-%m-%d").to_string())
        .bind(result.prize.animal_number.as_str())
        .bind(result.prize.animal_name.as_str())
        .bind(result.prize.multiplier.to_canonical_string())
        .bind(result.total_to_pay.to_canonical_string())
        .bind(result.total_raised.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(done.rows_affected() > 0)
    }

    /// Record winners in one transaction. Returns how many were new.
    pub async fn insert_winners_batch(&self, winners: &[Winner]) -> Result<usize, sqlx::Error> {
        if winners.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0usize;
        let mut tx = self.pool.begin().await?;
        for winner in winners {
            let result = sqlx::query(
                r#"
                INSERT INTO winners (bet_id, taquilla_id, lottery_id, amount, potential_win, created_at_ms)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(bet_id) DO NOTHING
                "#,
            )
            .bind(winner.bet_id.to_string())
            .bind(winner.taquilla_id.to_string())
            .bind(winner.lottery_id.to_string())
            .bind(winner.amount.to_canonical_string())
            .bind(winner.potential_win.to_canonical_string())
            .bind(winner.created_at.timestamp_millis())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() > 0 {
                inserted += 1;
            }
        }
        tx.commit().await?;

        Ok(inserted)
    }

    /// Bets at `taquillas` with `start <= created_at < end`.
    pub async fn query_bets(
        &self,
        taquillas: &[NodeId],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bet>, sqlx::Error> {
        let mut out = Vec::new();
        for chunk in taquillas.chunks(IN_CHUNK_SIZE) {
            let sql = format!(
                r#"
                SELECT id, taquilla_id, lottery_id, animal_number, amount, created_at_ms
                FROM bets
                WHERE taquilla_id IN ({}) AND created_at_ms >= ? AND created_at_ms < ?
                ORDER BY created_at_ms ASC, id ASC
                "#,
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id.to_string());
            }
            let rows = query
                .bind(start.timestamp_millis())
                .bind(end.timestamp_millis())
                .fetch_all(&self.pool)
                .await?;
            for row in &rows {
                out.push(bet_from_row(row)?);
            }
        }
        Ok(out)
    }

    /// Winners with `start <= created_at < end`, optionally narrowed to a
    /// lottery or a taquilla set.
    pub async fn query_winners(
        &self,
        lottery: Option<LotteryId>,
        taquillas: Option<&[NodeId]>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Winner>, sqlx::Error> {
        const COLUMNS: &str =
            "SELECT bet_id, taquilla_id, lottery_id, amount, potential_win, created_at_ms FROM winners";

        let rows = match (lottery, taquillas) {
            (_, Some(ids)) => {
                let mut rows = Vec::new();
                for chunk in ids.chunks(IN_CHUNK_SIZE) {
                    let sql = format!(
                        "{} WHERE taquilla_id IN ({}) AND created_at_ms >= ? AND created_at_ms < ? ORDER BY created_at_ms ASC",
                        COLUMNS,
                        placeholders(chunk.len())
                    );
                    let mut query = sqlx::query(&sql);
                    for id in chunk {
                        query = query.bind(id.to_string());
                    }
                    rows.extend(
                        query
                            .bind(start.timestamp_millis())
                            .bind(end.timestamp_millis())
                            .fetch_all(&self.pool)
                            .await?,
                    );
                }
                rows
            }
            (Some(lottery), None) => {
                let sql = format!(
                    "{} WHERE lottery_id = ? AND created_at_ms >= ? AND created_at_ms < ? ORDER BY created_at_ms ASC",
                    COLUMNS
                );
                sqlx::query(&sql)
                    .bind(lottery.to_string())
                    .bind(start.timestamp_millis())
                    .bind(end.timestamp_millis())
                    .fetch_all(&self.pool)
                    .await?
            }
            (None, None) => {
                let sql = format!(
                    "{} WHERE created_at_ms >= ? AND created_at_ms < ? ORDER BY created_at_ms ASC",
                    COLUMNS
                );
                sqlx::query(&sql)
                    .bind(start.timestamp_millis())
                    .bind(end.timestamp_millis())
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(winner_from_row).collect()
    }

    /// Results posted for days `first..=last`.
    pub async fn query_daily_results(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Vec<DailyResult>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, lottery_id, result_date, animal_number, animal_name,
                   multiplier, total_to_pay, total_raised
            FROM daily_results
            WHERE result_date >= ? AND result_date <= ?
            ORDER BY result_date ASC, lottery_id ASC
            "#,
        )
        .bind(first.format("%Y-%m-%d").to_string())
        .bind(last.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("id");
                let lottery_id: String = row.get("lottery_id");
                let result_date: String = row.get("result_date");
                let multiplier: String = row.get("multiplier");
                let total_to_pay: String = row.get("total_to_pay");
                let total_raised: String = row.get("total_raised");

                Ok(DailyResult {
                    id: decode("id", &id)?,
                    lottery_id: decode("lottery_id", &lottery_id)?,
                    result_date: decode::<NaiveDate, _>("result_date", &result_date)?,
                    prize: Prize {
                        animal_number: row.get("animal_number"),
                        animal_name: row.get("animal_name"),
                        multiplier: decode_money("multiplier", &multiplier)?,
                    },
                    total_to_pay: decode_money("total_to_pay", &total_to_pay)?,
                    total_raised: decode_money("total_raised", &total_raised)?,
                })
            })
            .collect()
    }
}

fn bet_from_row(row: &SqliteRow) -> Result<Bet, sqlx::Error> {
    let id: String = row.get("id");
    let taquilla_id: String = row.get("taquilla_id");
    let lottery_id: String = row.get("lottery_id");
    let amount: String = row.get("amount");

    Ok(Bet {
        id: decode("id", &id)?,
        taquilla_id: decode("taquilla_id", &taquilla_id)?,
        lottery_id: decode("lottery_id", &lottery_id)?,
        animal_number: row.get("animal_number"),
        amount: decode_money("amount", &amount)?,
        created_at: decode_time("created_at_ms", row.get("created_at_ms"))?,
    })
}

fn winner_from_row(row: &SqliteRow) -> Result<Winner, sqlx::Error> {
    let bet_id: String = row.get("bet_id");
    let taquilla_id: String = row.get("taquilla_id");
    let lottery_id: String = row.get("lottery_id");
    let amount: String = row.get("amount");
    let potential_win: String = row.get("potential_win");

    Ok(Winner {
        bet_id: decode("bet_id", &bet_id)?,
        taquilla_id: decode("taquilla_id", &taquilla_id)?,
        lottery_id: decode("lottery_id", &lottery_id)?,
        amount: decode_money("amount", &amount)?,
        potential_win: decode_money("potential_win", &potential_win)?,
        created_at: decode_time("created_at_ms", row.get("created_at_ms"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::{BetId, Decimal, ResultId};
    use chrono::TimeZone;
    use tempfile::TempDir;

    async fn setup_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("facts.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn bet(taquilla: NodeId, lottery: LotteryId, hour: u32, amount: i64) -> Bet {
        Bet {
            id: BetId::random(),
            taquilla_id: taquilla,
            lottery_id: lottery,
            animal_number: "24".to_string(),
            amount: Decimal::from(amount),
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, hour, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_query_bets_half_open_bounds() {
        let (repo, _temp) = setup_repo().await;
        let taq = NodeId::random();
        let lottery = LotteryId::random();
        let early = bet(taq, lottery, 8, 10);
        let late = bet(taq, lottery, 20, 15);
        repo.insert_bet(&early).await.unwrap();
        repo.insert_bet(&late).await.unwrap();
        repo.insert_bet(&bet(NodeId::random(), lottery, 9, 99))
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 5, 20, 0, 0).unwrap();
        let bets = repo.query_bets(&[taq], start, end).await.unwrap();
        assert_eq!(bets, vec![early]);
    }

    #[tokio::test]
    async fn test_insert_bet_is_idempotent() {
        let (repo, _temp) = setup_repo().await;
        let b = bet(NodeId::random(), LotteryId::random(), 10, 5);
        assert!(repo.insert_bet(&b).await.unwrap());
        assert!(!repo.insert_bet(&b).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_winners_by_scope() {
        let (repo, _temp) = setup_repo().await;
        let lottery_a = LotteryId::random();
        let lottery_b = LotteryId::random();
        let taq = NodeId::random();
        let win = |lottery, taquilla| Winner {
            bet_id: BetId::random(),
            taquilla_id: taquilla,
            lottery_id: lottery,
            amount: Decimal::from(10),
            potential_win: Decimal::from(300),
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
        };
        let inserted = repo
            .insert_winners_batch(&[win(lottery_a, taq), win(lottery_b, NodeId::random())])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let start = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap();
        assert_eq!(repo.query_winners(None, None, start, end).await.unwrap().len(), 2);
        let by_lottery = repo
            .query_winners(Some(lottery_b), None, start, end)
            .await
            .unwrap();
        assert_eq!(by_lottery.len(), 1);
        assert_eq!(by_lottery[0].lottery_id, lottery_b);
        let by_taq = repo
            .query_winners(None, Some(&[taq]), start, end)
            .await
            .unwrap();
        assert_eq!(by_taq.len(), 1);
        assert_eq!(by_taq[0].taquilla_id, taq);
    }

    #[tokio::test]
    async fn test_one_result_per_lottery_per_day() {
        let (repo, _temp) = setup_repo().await;
        let lottery = LotteryId::random();
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let result = DailyResult {
            id: ResultId::random(),
            lottery_id: lottery,
            result_date: day,
            prize: Prize {
                animal_number: "0".to_string(),
                animal_name: "Delfin".to_string(),
                multiplier: Decimal::from(30),
            },
            total_to_pay: Decimal::from(300),
            total_raised: Decimal::from(-210),
        };
        assert!(repo.insert_daily_result(&result).await.unwrap());
        let again = DailyResult {
            id: ResultId::random(),
            ..result.clone()
        };
        assert!(!repo.insert_daily_result(&again).await.unwrap());

        let results = repo.query_daily_results(day, day).await.unwrap();
        assert_eq!(results, vec![result]);
    }
}
