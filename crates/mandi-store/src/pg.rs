//! PostgreSQL persistence via SQLx.
//!
//! Scalar fields that queries filter or join on live as typed columns;
//! nested value objects (commodity descriptors, term blocks, transition
//! logs, address snapshots, tax breakdowns) live as JSONB and round-trip
//! through serde. Status columns are TEXT in the aggregate's canonical
//! `as_str` form and parse back leniently, warning on unrecognized values.
//!
//! Composite commands (`append_offer`, `finalize`, `expire`, trade
//! creation) serialize on their aggregate row with `SELECT ... FOR UPDATE`
//! inside one transaction, so racing writers queue up and the loser
//! revalidates against the committed state. Single-statement status writes
//! are compare-and-set guarded on the expected prior status instead.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Transaction;
use uuid::Uuid;

use mandi_core::{
    AvailabilityId, BranchId, MandiError, MessageId, NegotiationId, OfferId, PartnerId,
    PartySide, RequirementId, Timestamp, TradeId,
};
use mandi_match::{DisclosureLevel, MatchToken, TokenCode, TokenStore};
use mandi_negotiation::{
    Actor, FinalDecision, Negotiation, NegotiationMessage, NegotiationOffer, NegotiationStatus,
    NegotiationStore, OfferProposal, OfferStatus, PriorOfferDisposition,
};
use mandi_partner::{Branch, BranchDirectory, BranchFilter, BranchSlot, PostalAddress};
use mandi_trade::{Trade, TradeDraft, TradeNumber, TradeStatus, TradeStore};

/// Initialize the connection pool and run embedded migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, MandiError> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running with the in-memory store only. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&url)
        .await
        .map_err(|err| MandiError::Storage(format!("failed to connect to postgres: {err}")))?;
    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|err| MandiError::Storage(format!("migration failed: {err}")))?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

/// Store implementing every persistence contract over PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Upsert a branch record. Registration and later edits share this
    /// path; trades are unaffected because they carry frozen snapshots.
    pub async fn save_branch(&self, branch: &Branch) -> Result<(), MandiError> {
        let commodities = to_json("commodities", &branch.commodities)?;
        sqlx::query(
            "INSERT INTO branches (id, partner_id, name, line1, line2, city, state,
                postal_code, country, commodities, storage_capacity, active,
                default_ship_to, default_ship_from, default_bill_to)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                line1 = EXCLUDED.line1,
                line2 = EXCLUDED.line2,
                city = EXCLUDED.city,
                state = EXCLUDED.state,
                postal_code = EXCLUDED.postal_code,
                country = EXCLUDED.country,
                commodities = EXCLUDED.commodities,
                storage_capacity = EXCLUDED.storage_capacity,
                active = EXCLUDED.active,
                default_ship_to = EXCLUDED.default_ship_to,
                default_ship_from = EXCLUDED.default_ship_from,
                default_bill_to = EXCLUDED.default_bill_to",
        )
        .bind(*branch.id.as_uuid())
        .bind(*branch.partner_id.as_uuid())
        .bind(&branch.name)
        .bind(&branch.address.line1)
        .bind(&branch.address.line2)
        .bind(&branch.address.city)
        .bind(&branch.address.state)
        .bind(&branch.address.postal_code)
        .bind(&branch.address.country)
        .bind(&commodities)
        .bind(branch.storage_capacity)
        .bind(branch.active)
        .bind(branch.default_ship_to)
        .bind(branch.default_ship_from)
        .bind(branch.default_bill_to)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Load all match tokens for hydration.
    pub async fn load_all_tokens(&self) -> Result<Vec<MatchToken>, MandiError> {
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM match_tokens ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(token_from_row).collect()
    }

    /// Load all negotiations for hydration.
    pub async fn load_all_negotiations(&self) -> Result<Vec<Negotiation>, MandiError> {
        let rows = sqlx::query_as::<_, NegotiationRow>(&format!(
            "SELECT {NEGOTIATION_COLUMNS} FROM negotiations ORDER BY initiated_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(negotiation_from_row).collect()
    }

    /// Load all trades for hydration.
    pub async fn load_all_trades(&self) -> Result<Vec<Trade>, MandiError> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(trade_from_row).collect()
    }

    /// Load all branches for hydration.
    pub async fn load_all_branches(&self) -> Result<Vec<Branch>, MandiError> {
        let rows = sqlx::query_as::<_, BranchRow>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches ORDER BY partner_id, name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(branch_from_row).collect()
    }
}

impl fmt::Debug for PgStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStore").finish_non_exhaustive()
    }
}

// ── Match tokens ─────────────────────────────────────────────────────────

const TOKEN_COLUMNS: &str = "code, requirement_id, availability_id, buyer_partner_id, \
     seller_partner_id, commodity, match_score, buyer_disclosure, seller_disclosure, \
     created_at, expires_at, negotiation_started_at";

#[async_trait]
impl TokenStore for PgStore {
    async fn insert(&self, token: &MatchToken) -> Result<(), MandiError> {
        let commodity = to_json("commodity", &token.commodity)?;
        sqlx::query(
            "INSERT INTO match_tokens (code, requirement_id, availability_id,
                buyer_partner_id, seller_partner_id, commodity, match_score,
                buyer_disclosure, seller_disclosure, created_at, expires_at,
                negotiation_started_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(token.code.as_str())
        .bind(*token.requirement_id.as_uuid())
        .bind(*token.availability_id.as_uuid())
        .bind(*token.buyer_partner_id.as_uuid())
        .bind(*token.seller_partner_id.as_uuid())
        .bind(&commodity)
        .bind(token.match_score)
        .bind(token.buyer_disclosure.as_str())
        .bind(token.seller_disclosure.as_str())
        .bind(*token.created_at.as_datetime())
        .bind(*token.expires_at.as_datetime())
        .bind(token.negotiation_started_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                MandiError::Conflict(format!("match token {} already exists", token.code))
            } else {
                db_err(err)
            }
        })?;
        Ok(())
    }

    async fn fetch(&self, code: &TokenCode) -> Result<MatchToken, MandiError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM match_tokens WHERE code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| MandiError::not_found("match token", code.to_string()))?;
        token_from_row(row)
    }

    async fn update(&self, token: &MatchToken) -> Result<(), MandiError> {
        let result = sqlx::query(
            "UPDATE match_tokens
             SET buyer_disclosure = $2, seller_disclosure = $3, negotiation_started_at = $4
             WHERE code = $1",
        )
        .bind(token.code.as_str())
        .bind(token.buyer_disclosure.as_str())
        .bind(token.seller_disclosure.as_str())
        .bind(token.negotiation_started_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(MandiError::not_found("match token", token.code.to_string()));
        }
        Ok(())
    }
}

// ── Negotiations ─────────────────────────────────────────────────────────

const NEGOTIATION_COLUMNS: &str = "id, token_code, requirement_id, availability_id, \
     buyer_partner_id, seller_partner_id, commodity, status, current_round, current_price, \
     current_quantity, current_terms, initiated_by, last_offer_by, auto_negotiate_buyer, \
     auto_negotiate_seller, outcome, initiated_at, last_activity_at, expires_at, transition_log";

const OFFER_COLUMNS: &str = "id, negotiation_id, round_number, offered_by, price_per_unit, \
     quantity, terms, message, ai, status, responded_at, response_message, created_at";

#[async_trait]
impl NegotiationStore for PgStore {
    async fn insert(&self, negotiation: &Negotiation) -> Result<(), MandiError> {
        let commodity = to_json("commodity", &negotiation.commodity)?;
        let terms = to_json("current_terms", &negotiation.current_terms)?;
        let outcome = negotiation
            .outcome
            .as_ref()
            .map(|o| to_json("outcome", o))
            .transpose()?;
        let log = to_json("transition_log", &negotiation.transition_log)?;
        sqlx::query(
            "INSERT INTO negotiations (id, token_code, requirement_id, availability_id,
                buyer_partner_id, seller_partner_id, commodity, status, current_round,
                current_price, current_quantity, current_terms, initiated_by, last_offer_by,
                auto_negotiate_buyer, auto_negotiate_seller, outcome, initiated_at,
                last_activity_at, expires_at, transition_log)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21)",
        )
        .bind(*negotiation.id.as_uuid())
        .bind(negotiation.token_code.as_str())
        .bind(*negotiation.requirement_id.as_uuid())
        .bind(*negotiation.availability_id.as_uuid())
        .bind(*negotiation.buyer_partner_id.as_uuid())
        .bind(*negotiation.seller_partner_id.as_uuid())
        .bind(&commodity)
        .bind(negotiation.status.as_str())
        .bind(negotiation.current_round as i32)
        .bind(negotiation.current_price)
        .bind(negotiation.current_quantity)
        .bind(&terms)
        .bind(negotiation.initiated_by.as_str())
        .bind(negotiation.last_offer_by.map(|s| s.as_str()))
        .bind(negotiation.auto_negotiate_buyer)
        .bind(negotiation.auto_negotiate_seller)
        .bind(&outcome)
        .bind(*negotiation.initiated_at.as_datetime())
        .bind(*negotiation.last_activity_at.as_datetime())
        .bind(*negotiation.expires_at.as_datetime())
        .bind(&log)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                MandiError::Conflict(format!(
                    "a negotiation already exists for token {}",
                    negotiation.token_code
                ))
            } else {
                db_err(err)
            }
        })?;
        Ok(())
    }

    async fn fetch(&self, id: &NegotiationId) -> Result<Negotiation, MandiError> {
        let row = sqlx::query_as::<_, NegotiationRow>(&format!(
            "SELECT {NEGOTIATION_COLUMNS} FROM negotiations WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| MandiError::not_found("negotiation", id.to_string()))?;
        negotiation_from_row(row)
    }

    async fn fetch_by_token(
        &self,
        code: &TokenCode,
    ) -> Result<Option<Negotiation>, MandiError> {
        let row = sqlx::query_as::<_, NegotiationRow>(&format!(
            "SELECT {NEGOTIATION_COLUMNS} FROM negotiations WHERE token_code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(negotiation_from_row).transpose()
    }

    async fn append_offer(
        &self,
        id: &NegotiationId,
        by: PartySide,
        proposal: OfferProposal,
        disposition: PriorOfferDisposition,
        now: Timestamp,
    ) -> Result<NegotiationOffer, MandiError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut negotiation = lock_negotiation(&mut tx, id).await?;

        let round = match &disposition {
            PriorOfferDisposition::Counter => negotiation.record_offer(by, &proposal, now)?,
            PriorOfferDisposition::Reject { .. } => {
                negotiation.record_rejection_counter(by, &proposal, now)?
            }
        };

        if let Some(mut prior) = lock_pending_offer(&mut tx, id).await? {
            match &disposition {
                PriorOfferDisposition::Counter => {
                    prior.resolve(OfferStatus::Countered, None, now)?
                }
                PriorOfferDisposition::Reject { reason } => {
                    prior.resolve(OfferStatus::Rejected, Some(reason.clone()), now)?
                }
            }
            update_offer(&mut tx, &prior).await?;
        }

        let offer = NegotiationOffer::new(negotiation.id.clone(), round, by, proposal, now);
        insert_offer(&mut tx, &offer).await?;
        update_negotiation(&mut tx, &negotiation, None).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(offer)
    }

    async fn finalize(
        &self,
        id: &NegotiationId,
        by: PartySide,
        decision: FinalDecision,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut negotiation = lock_negotiation(&mut tx, id).await?;
        let prior_status = negotiation.status;

        let response = match &decision {
            FinalDecision::Accept { message } => {
                negotiation.accept(by, message.clone(), now)?;
                message.clone()
            }
            FinalDecision::Reject { reason } => {
                negotiation.reject(by, reason.clone(), now)?;
                Some(reason.clone())
            }
        };
        let offer_status = match &decision {
            FinalDecision::Accept { .. } => OfferStatus::Accepted,
            FinalDecision::Reject { .. } => OfferStatus::Rejected,
        };

        if let Some(mut latest) = lock_pending_offer(&mut tx, id).await? {
            latest.resolve(offer_status, response.clone(), now)?;
            update_offer(&mut tx, &latest).await?;
        }
        if let Some(body) = response {
            let line = NegotiationMessage::new(id.clone(), Actor::from(by), body, now);
            insert_message(&mut tx, &line).await?;
        }
        update_negotiation(&mut tx, &negotiation, Some(prior_status)).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(negotiation)
    }

    async fn expire(
        &self,
        id: &NegotiationId,
        now: Timestamp,
    ) -> Result<Negotiation, MandiError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut negotiation = lock_negotiation(&mut tx, id).await?;
        let prior_status = negotiation.status;
        negotiation.expire(now)?;

        if let Some(mut latest) = lock_pending_offer(&mut tx, id).await? {
            latest.resolve(OfferStatus::Expired, None, now)?;
            update_offer(&mut tx, &latest).await?;
        }
        let line =
            NegotiationMessage::new(id.clone(), Actor::System, "expired without agreement", now);
        insert_message(&mut tx, &line).await?;
        update_negotiation(&mut tx, &negotiation, Some(prior_status)).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(negotiation)
    }

    async fn expirable(&self, now: Timestamp) -> Result<Vec<Negotiation>, MandiError> {
        let rows = sqlx::query_as::<_, NegotiationRow>(&format!(
            "SELECT {NEGOTIATION_COLUMNS} FROM negotiations
             WHERE status IN ('INITIATED', 'IN_PROGRESS') AND expires_at < $1
             ORDER BY expires_at"
        ))
        .bind(*now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(negotiation_from_row).collect()
    }

    async fn offers_for(
        &self,
        id: &NegotiationId,
    ) -> Result<Vec<NegotiationOffer>, MandiError> {
        let rows = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM negotiation_offers
             WHERE negotiation_id = $1 ORDER BY round_number"
        ))
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(offer_from_row).collect()
    }

    async fn latest_offer(
        &self,
        id: &NegotiationId,
    ) -> Result<Option<NegotiationOffer>, MandiError> {
        let row = sqlx::query_as::<_, OfferRow>(&format!(
            "SELECT {OFFER_COLUMNS} FROM negotiation_offers
             WHERE negotiation_id = $1 ORDER BY round_number DESC LIMIT 1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(offer_from_row).transpose()
    }

    async fn append_message(&self, message: &NegotiationMessage) -> Result<(), MandiError> {
        sqlx::query(
            "INSERT INTO negotiation_messages (id, negotiation_id, author, body, sent_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*message.id.as_uuid())
        .bind(*message.negotiation_id.as_uuid())
        .bind(message.author.as_str())
        .bind(&message.body)
        .bind(*message.sent_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                MandiError::not_found("negotiation", message.negotiation_id.to_string())
            } else {
                db_err(err)
            }
        })?;
        Ok(())
    }

    async fn messages_for(
        &self,
        id: &NegotiationId,
    ) -> Result<Vec<NegotiationMessage>, MandiError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, negotiation_id, author, body, sent_at FROM negotiation_messages
             WHERE negotiation_id = $1 ORDER BY seq",
        )
        .bind(*id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(message_from_row).collect())
    }
}

// ── Trades ───────────────────────────────────────────────────────────────

const TRADE_COLUMNS: &str = "id, number, negotiation_id, buyer_partner_id, seller_partner_id, \
     commodity, quantity, price_per_unit, total_amount, ship_to, bill_to, ship_from, tax, \
     delivery_terms, payment_terms, document, status, trade_date, expected_delivery_date, \
     actual_delivery_date, created_at, updated_at, transition_log";

#[async_trait]
impl TradeStore for PgStore {
    async fn create(&self, draft: TradeDraft) -> Result<Trade, MandiError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The counter row stays locked until commit; a failed insert rolls
        // the increment back, keeping the sequence gapless.
        let year = draft.trade_date.year();
        let raw_sequence: i32 = sqlx::query_scalar(
            "INSERT INTO trade_counters (year, last_value) VALUES ($1, 1)
             ON CONFLICT (year) DO UPDATE SET last_value = trade_counters.last_value + 1
             RETURNING last_value",
        )
        .bind(year)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let sequence = u32::try_from(raw_sequence)
            .map_err(|_| MandiError::Storage(format!("trade counter overflow for year {year}")))?;

        let trade = draft.finalize(TradeNumber::from_parts(year, sequence));
        insert_trade(&mut tx, &trade).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(trade)
    }

    async fn fetch(&self, id: &TradeId) -> Result<Trade, MandiError> {
        let row = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| MandiError::not_found("trade", id.to_string()))?;
        trade_from_row(row)
    }

    async fn fetch_by_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<Trade>, MandiError> {
        let row = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades WHERE negotiation_id = $1"
        ))
        .bind(*negotiation_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(trade_from_row).transpose()
    }

    async fn update(&self, trade: &Trade, expected: TradeStatus) -> Result<(), MandiError> {
        let ship_to = trade.ship_to.as_ref().map(|s| to_json("ship_to", s)).transpose()?;
        let bill_to = trade.bill_to.as_ref().map(|s| to_json("bill_to", s)).transpose()?;
        let ship_from = trade.ship_from.as_ref().map(|s| to_json("ship_from", s)).transpose()?;
        let tax = trade.tax.as_ref().map(|t| to_json("tax", t)).transpose()?;
        let document = trade.document.as_ref().map(|d| to_json("document", d)).transpose()?;
        let log = to_json("transition_log", &trade.transition_log)?;

        let result = sqlx::query(
            "UPDATE trades
             SET ship_to = $3, bill_to = $4, ship_from = $5, tax = $6, document = $7,
                 status = $8, actual_delivery_date = $9, updated_at = $10,
                 transition_log = $11
             WHERE id = $1 AND status = $2",
        )
        .bind(*trade.id.as_uuid())
        .bind(expected.as_str())
        .bind(&ship_to)
        .bind(&bill_to)
        .bind(&ship_from)
        .bind(&tax)
        .bind(&document)
        .bind(trade.status.as_str())
        .bind(trade.actual_delivery_date.map(|t| *t.as_datetime()))
        .bind(*trade.updated_at.as_datetime())
        .bind(&log)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM trades WHERE id = $1)")
                    .bind(*trade.id.as_uuid())
                    .fetch_one(&self.pool)
                    .await
                    .map_err(db_err)?;
            return if exists {
                Err(MandiError::Conflict(format!(
                    "trade {} changed concurrently (expected status {expected})",
                    trade.number
                )))
            } else {
                Err(MandiError::not_found("trade", trade.id.to_string()))
            };
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Trade>, MandiError> {
        let rows = sqlx::query_as::<_, TradeRow>(&format!(
            "SELECT {TRADE_COLUMNS} FROM trades ORDER BY trade_date DESC, number DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(trade_from_row).collect()
    }
}

// ── Branch directory ─────────────────────────────────────────────────────

const BRANCH_COLUMNS: &str = "id, partner_id, name, line1, line2, city, state, postal_code, \
     country, commodities, storage_capacity, active, default_ship_to, default_ship_from, \
     default_bill_to";

#[async_trait]
impl BranchDirectory for PgStore {
    async fn branch(&self, id: &BranchId) -> Result<Branch, MandiError> {
        let row = sqlx::query_as::<_, BranchRow>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| MandiError::not_found("branch", id.to_string()))?;
        branch_from_row(row)
    }

    async fn branches_of(&self, partner: &PartnerId) -> Result<Vec<Branch>, MandiError> {
        let rows = sqlx::query_as::<_, BranchRow>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE partner_id = $1 ORDER BY name"
        ))
        .bind(*partner.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(branch_from_row).collect()
    }

    async fn eligible(
        &self,
        partner: &PartnerId,
        filter: &BranchFilter,
    ) -> Result<Vec<Branch>, MandiError> {
        // Eligibility rules live on the aggregate; the query narrows by
        // partner and Rust applies the same `matches` used in memory.
        let branches = self.branches_of(partner).await?;
        Ok(branches.into_iter().filter(|b| b.matches(filter)).collect())
    }

    async fn default_for(
        &self,
        partner: &PartnerId,
        slot: BranchSlot,
    ) -> Result<Option<Branch>, MandiError> {
        let row = sqlx::query_as::<_, BranchRow>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches
             WHERE partner_id = $1 AND {} AND active",
            default_column(slot)
        ))
        .bind(*partner.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(branch_from_row).transpose()
    }

    async fn set_default(
        &self,
        partner: &PartnerId,
        slot: BranchSlot,
        branch: &BranchId,
    ) -> Result<(), MandiError> {
        let column = default_column(slot);
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT partner_id FROM branches WHERE id = $1 FOR UPDATE")
                .bind(*branch.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let owner = owner.ok_or_else(|| MandiError::not_found("branch", branch.to_string()))?;
        if &owner != partner.as_uuid() {
            return Err(MandiError::Authorization(format!(
                "branch {branch} does not belong to partner {partner}"
            )));
        }

        sqlx::query(&format!(
            "UPDATE branches SET {column} = FALSE WHERE partner_id = $1 AND {column}"
        ))
        .bind(*partner.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        sqlx::query(&format!("UPDATE branches SET {column} = TRUE WHERE id = $1"))
            .bind(*branch.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}

fn default_column(slot: BranchSlot) -> &'static str {
    match slot {
        BranchSlot::ShipTo => "default_ship_to",
        BranchSlot::ShipFrom => "default_ship_from",
        BranchSlot::BillTo => "default_bill_to",
    }
}

// ── Transaction helpers ──────────────────────────────────────────────────

async fn lock_negotiation(
    tx: &mut Transaction<'_, sqlx::Postgres>,
    id: &NegotiationId,
) -> Result<Negotiation, MandiError> {
    let row = sqlx::query_as::<_, NegotiationRow>(&format!(
        "SELECT {NEGOTIATION_COLUMNS} FROM negotiations WHERE id = $1 FOR UPDATE"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?
    .ok_or_else(|| MandiError::not_found("negotiation", id.to_string()))?;
    negotiation_from_row(row)
}

async fn lock_pending_offer(
    tx: &mut Transaction<'_, sqlx::Postgres>,
    id: &NegotiationId,
) -> Result<Option<NegotiationOffer>, MandiError> {
    let row = sqlx::query_as::<_, OfferRow>(&format!(
        "SELECT {OFFER_COLUMNS} FROM negotiation_offers
         WHERE negotiation_id = $1 AND status = 'PENDING'
         ORDER BY round_number DESC LIMIT 1 FOR UPDATE"
    ))
    .bind(*id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?;
    row.map(offer_from_row).transpose()
}

async fn insert_offer(
    tx: &mut Transaction<'_, sqlx::Postgres>,
    offer: &NegotiationOffer,
) -> Result<(), MandiError> {
    let terms = to_json("terms", &offer.terms)?;
    let ai = offer.ai.as_ref().map(|a| to_json("ai", a)).transpose()?;
    sqlx::query(
        "INSERT INTO negotiation_offers (id, negotiation_id, round_number, offered_by,
            price_per_unit, quantity, terms, message, ai, status, responded_at,
            response_message, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(*offer.id.as_uuid())
    .bind(*offer.negotiation_id.as_uuid())
    .bind(offer.round_number as i32)
    .bind(offer.offered_by.as_str())
    .bind(offer.price_per_unit)
    .bind(offer.quantity)
    .bind(&terms)
    .bind(&offer.message)
    .bind(&ai)
    .bind(offer.status.as_str())
    .bind(offer.responded_at.map(|t| *t.as_datetime()))
    .bind(&offer.response_message)
    .bind(*offer.created_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn update_offer(
    tx: &mut Transaction<'_, sqlx::Postgres>,
    offer: &NegotiationOffer,
) -> Result<(), MandiError> {
    sqlx::query(
        "UPDATE negotiation_offers
         SET status = $2, responded_at = $3, response_message = $4
         WHERE id = $1",
    )
    .bind(*offer.id.as_uuid())
    .bind(offer.status.as_str())
    .bind(offer.responded_at.map(|t| *t.as_datetime()))
    .bind(&offer.response_message)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn insert_message(
    tx: &mut Transaction<'_, sqlx::Postgres>,
    message: &NegotiationMessage,
) -> Result<(), MandiError> {
    sqlx::query(
        "INSERT INTO negotiation_messages (id, negotiation_id, author, body, sent_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(*message.id.as_uuid())
    .bind(*message.negotiation_id.as_uuid())
    .bind(message.author.as_str())
    .bind(&message.body)
    .bind(*message.sent_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Persist an updated negotiation. When `expected` is given the write is
/// additionally compare-and-set guarded on it.
async fn update_negotiation(
    tx: &mut Transaction<'_, sqlx::Postgres>,
    negotiation: &Negotiation,
    expected: Option<NegotiationStatus>,
) -> Result<(), MandiError> {
    let terms = to_json("current_terms", &negotiation.current_terms)?;
    let outcome = negotiation
        .outcome
        .as_ref()
        .map(|o| to_json("outcome", o))
        .transpose()?;
    let log = to_json("transition_log", &negotiation.transition_log)?;

    let result = sqlx::query(
        "UPDATE negotiations
         SET status = $2, current_round = $3, current_price = $4, current_quantity = $5,
             current_terms = $6, last_offer_by = $7, outcome = $8, last_activity_at = $9,
             transition_log = $10
         WHERE id = $1 AND ($11::text IS NULL OR status = $11)",
    )
    .bind(*negotiation.id.as_uuid())
    .bind(negotiation.status.as_str())
    .bind(negotiation.current_round as i32)
    .bind(negotiation.current_price)
    .bind(negotiation.current_quantity)
    .bind(&terms)
    .bind(negotiation.last_offer_by.map(|s| s.as_str()))
    .bind(&outcome)
    .bind(*negotiation.last_activity_at.as_datetime())
    .bind(&log)
    .bind(expected.map(|s| s.as_str()))
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 0 {
        return Err(MandiError::Conflict(format!(
            "negotiation {} changed concurrently",
            negotiation.id
        )));
    }
    Ok(())
}

async fn insert_trade(
    tx: &mut Transaction<'_, sqlx::Postgres>,
    trade: &Trade,
) -> Result<(), MandiError> {
    let commodity = to_json("commodity", &trade.commodity)?;
    let ship_to = trade.ship_to.as_ref().map(|s| to_json("ship_to", s)).transpose()?;
    let bill_to = trade.bill_to.as_ref().map(|s| to_json("bill_to", s)).transpose()?;
    let ship_from = trade.ship_from.as_ref().map(|s| to_json("ship_from", s)).transpose()?;
    let tax = trade.tax.as_ref().map(|t| to_json("tax", t)).transpose()?;
    let delivery = trade.delivery_terms.as_ref().map(|d| to_json("delivery_terms", d)).transpose()?;
    let payment = trade.payment_terms.as_ref().map(|p| to_json("payment_terms", p)).transpose()?;
    let document = trade.document.as_ref().map(|d| to_json("document", d)).transpose()?;
    let log = to_json("transition_log", &trade.transition_log)?;

    sqlx::query(
        "INSERT INTO trades (id, number, negotiation_id, buyer_partner_id, seller_partner_id,
            commodity, quantity, price_per_unit, total_amount, ship_to, bill_to, ship_from,
            tax, delivery_terms, payment_terms, document, status, trade_date,
            expected_delivery_date, actual_delivery_date, created_at, updated_at,
            transition_log)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
            $17, $18, $19, $20, $21, $22, $23)",
    )
    .bind(*trade.id.as_uuid())
    .bind(trade.number.to_string())
    .bind(*trade.negotiation_id.as_uuid())
    .bind(*trade.buyer_partner_id.as_uuid())
    .bind(*trade.seller_partner_id.as_uuid())
    .bind(&commodity)
    .bind(trade.quantity)
    .bind(trade.price_per_unit)
    .bind(trade.total_amount)
    .bind(&ship_to)
    .bind(&bill_to)
    .bind(&ship_from)
    .bind(&tax)
    .bind(&delivery)
    .bind(&payment)
    .bind(&document)
    .bind(trade.status.as_str())
    .bind(*trade.trade_date.as_datetime())
    .bind(trade.expected_delivery_date.map(|t| *t.as_datetime()))
    .bind(trade.actual_delivery_date.map(|t| *t.as_datetime()))
    .bind(*trade.created_at.as_datetime())
    .bind(*trade.updated_at.as_datetime())
    .bind(&log)
    .execute(&mut **tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            MandiError::Conflict(format!(
                "a trade already exists for negotiation {}",
                trade.negotiation_id
            ))
        } else {
            db_err(err)
        }
    })?;
    Ok(())
}

// ── Row types ────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct TokenRow {
    code: String,
    requirement_id: Uuid,
    availability_id: Uuid,
    buyer_partner_id: Uuid,
    seller_partner_id: Uuid,
    commodity: serde_json::Value,
    match_score: f64,
    buyer_disclosure: String,
    seller_disclosure: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    negotiation_started_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct NegotiationRow {
    id: Uuid,
    token_code: String,
    requirement_id: Uuid,
    availability_id: Uuid,
    buyer_partner_id: Uuid,
    seller_partner_id: Uuid,
    commodity: serde_json::Value,
    status: String,
    current_round: i32,
    current_price: Option<Decimal>,
    current_quantity: Option<Decimal>,
    current_terms: serde_json::Value,
    initiated_by: String,
    last_offer_by: Option<String>,
    auto_negotiate_buyer: bool,
    auto_negotiate_seller: bool,
    outcome: Option<serde_json::Value>,
    initiated_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    transition_log: serde_json::Value,
}

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    negotiation_id: Uuid,
    round_number: i32,
    offered_by: String,
    price_per_unit: Decimal,
    quantity: Decimal,
    terms: serde_json::Value,
    message: Option<String>,
    ai: Option<serde_json::Value>,
    status: String,
    responded_at: Option<DateTime<Utc>>,
    response_message: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    negotiation_id: Uuid,
    author: String,
    body: String,
    sent_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct TradeRow {
    id: Uuid,
    number: String,
    negotiation_id: Uuid,
    buyer_partner_id: Uuid,
    seller_partner_id: Uuid,
    commodity: serde_json::Value,
    quantity: Decimal,
    price_per_unit: Decimal,
    total_amount: Decimal,
    ship_to: Option<serde_json::Value>,
    bill_to: Option<serde_json::Value>,
    ship_from: Option<serde_json::Value>,
    tax: Option<serde_json::Value>,
    delivery_terms: Option<serde_json::Value>,
    payment_terms: Option<serde_json::Value>,
    document: Option<serde_json::Value>,
    status: String,
    trade_date: DateTime<Utc>,
    expected_delivery_date: Option<DateTime<Utc>>,
    actual_delivery_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    transition_log: serde_json::Value,
}

#[derive(sqlx::FromRow)]
struct BranchRow {
    id: Uuid,
    partner_id: Uuid,
    name: String,
    line1: String,
    line2: Option<String>,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    commodities: serde_json::Value,
    storage_capacity: Option<Decimal>,
    active: bool,
    default_ship_to: bool,
    default_ship_from: bool,
    default_bill_to: bool,
}

// ── Hydration ────────────────────────────────────────────────────────────

fn token_from_row(row: TokenRow) -> Result<MatchToken, MandiError> {
    let code = TokenCode::new(row.code.as_str())
        .map_err(|err| MandiError::Storage(format!("corrupt token code {:?}: {err}", row.code)))?;
    Ok(MatchToken {
        commodity: from_json("commodity", &code, row.commodity)?,
        code,
        requirement_id: RequirementId(row.requirement_id),
        availability_id: AvailabilityId(row.availability_id),
        buyer_partner_id: PartnerId(row.buyer_partner_id),
        seller_partner_id: PartnerId(row.seller_partner_id),
        match_score: row.match_score,
        buyer_disclosure: parse_disclosure(&row.buyer_disclosure),
        seller_disclosure: parse_disclosure(&row.seller_disclosure),
        created_at: Timestamp::from_utc(row.created_at),
        expires_at: Timestamp::from_utc(row.expires_at),
        negotiation_started_at: row.negotiation_started_at.map(Timestamp::from_utc),
    })
}

fn negotiation_from_row(row: NegotiationRow) -> Result<Negotiation, MandiError> {
    let id = NegotiationId(row.id);
    let token_code = TokenCode::new(row.token_code.as_str()).map_err(|err| {
        MandiError::Storage(format!("corrupt token code in negotiation {id}: {err}"))
    })?;
    let current_round = u32::try_from(row.current_round).map_err(|_| {
        MandiError::Storage(format!("corrupt round counter in negotiation {id}"))
    })?;
    Ok(Negotiation {
        commodity: from_json("commodity", &id, row.commodity)?,
        current_terms: from_json("current_terms", &id, row.current_terms)?,
        outcome: row.outcome.map(|o| from_json("outcome", &id, o)).transpose()?,
        transition_log: from_json("transition_log", &id, row.transition_log)?,
        id,
        token_code,
        requirement_id: RequirementId(row.requirement_id),
        availability_id: AvailabilityId(row.availability_id),
        buyer_partner_id: PartnerId(row.buyer_partner_id),
        seller_partner_id: PartnerId(row.seller_partner_id),
        status: parse_negotiation_status(&row.status),
        current_round,
        current_price: row.current_price,
        current_quantity: row.current_quantity,
        initiated_by: parse_party(&row.initiated_by),
        last_offer_by: row.last_offer_by.as_deref().map(parse_party),
        auto_negotiate_buyer: row.auto_negotiate_buyer,
        auto_negotiate_seller: row.auto_negotiate_seller,
        initiated_at: Timestamp::from_utc(row.initiated_at),
        last_activity_at: Timestamp::from_utc(row.last_activity_at),
        expires_at: Timestamp::from_utc(row.expires_at),
    })
}

fn offer_from_row(row: OfferRow) -> Result<NegotiationOffer, MandiError> {
    let id = OfferId(row.id);
    let round_number = u32::try_from(row.round_number)
        .map_err(|_| MandiError::Storage(format!("corrupt round number in offer {id}")))?;
    Ok(NegotiationOffer {
        terms: from_json("terms", &id, row.terms)?,
        ai: row.ai.map(|a| from_json("ai", &id, a)).transpose()?,
        id,
        negotiation_id: NegotiationId(row.negotiation_id),
        round_number,
        offered_by: parse_party(&row.offered_by),
        price_per_unit: row.price_per_unit,
        quantity: row.quantity,
        message: row.message,
        status: parse_offer_status(&row.status),
        responded_at: row.responded_at.map(Timestamp::from_utc),
        response_message: row.response_message,
        created_at: Timestamp::from_utc(row.created_at),
    })
}

fn message_from_row(row: MessageRow) -> NegotiationMessage {
    NegotiationMessage {
        id: MessageId(row.id),
        negotiation_id: NegotiationId(row.negotiation_id),
        author: parse_actor(&row.author),
        body: row.body,
        sent_at: Timestamp::from_utc(row.sent_at),
    }
}

fn trade_from_row(row: TradeRow) -> Result<Trade, MandiError> {
    let id = TradeId(row.id);
    let number = TradeNumber::parse(&row.number).map_err(|err| {
        MandiError::Storage(format!("corrupt trade number in trade {id}: {err}"))
    })?;
    Ok(Trade {
        commodity: from_json("commodity", &id, row.commodity)?,
        ship_to: row.ship_to.map(|s| from_json("ship_to", &id, s)).transpose()?,
        bill_to: row.bill_to.map(|s| from_json("bill_to", &id, s)).transpose()?,
        ship_from: row.ship_from.map(|s| from_json("ship_from", &id, s)).transpose()?,
        tax: row.tax.map(|t| from_json("tax", &id, t)).transpose()?,
        delivery_terms: row
            .delivery_terms
            .map(|d| from_json("delivery_terms", &id, d))
            .transpose()?,
        payment_terms: row
            .payment_terms
            .map(|p| from_json("payment_terms", &id, p))
            .transpose()?,
        document: row.document.map(|d| from_json("document", &id, d)).transpose()?,
        transition_log: from_json("transition_log", &id, row.transition_log)?,
        id,
        number,
        negotiation_id: NegotiationId(row.negotiation_id),
        buyer_partner_id: PartnerId(row.buyer_partner_id),
        seller_partner_id: PartnerId(row.seller_partner_id),
        quantity: row.quantity,
        price_per_unit: row.price_per_unit,
        total_amount: row.total_amount,
        status: parse_trade_status(&row.status),
        trade_date: Timestamp::from_utc(row.trade_date),
        expected_delivery_date: row.expected_delivery_date.map(Timestamp::from_utc),
        actual_delivery_date: row.actual_delivery_date.map(Timestamp::from_utc),
        created_at: Timestamp::from_utc(row.created_at),
        updated_at: Timestamp::from_utc(row.updated_at),
    })
}

fn branch_from_row(row: BranchRow) -> Result<Branch, MandiError> {
    let id = BranchId(row.id);
    Ok(Branch {
        commodities: from_json("commodities", &id, row.commodities)?,
        id,
        partner_id: PartnerId(row.partner_id),
        name: row.name,
        address: PostalAddress {
            line1: row.line1,
            line2: row.line2,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            country: row.country,
        },
        storage_capacity: row.storage_capacity,
        active: row.active,
        default_ship_to: row.default_ship_to,
        default_ship_from: row.default_ship_from,
        default_bill_to: row.default_bill_to,
    })
}

// ── Parsing and error helpers ────────────────────────────────────────────

fn parse_negotiation_status(s: &str) -> NegotiationStatus {
    match s {
        "INITIATED" => NegotiationStatus::Initiated,
        "IN_PROGRESS" => NegotiationStatus::InProgress,
        "ACCEPTED" => NegotiationStatus::Accepted,
        "REJECTED" => NegotiationStatus::Rejected,
        "EXPIRED" => NegotiationStatus::Expired,
        other => {
            tracing::warn!(
                value = other,
                "unrecognized negotiation status in database, defaulting to INITIATED"
            );
            NegotiationStatus::Initiated
        }
    }
}

fn parse_offer_status(s: &str) -> OfferStatus {
    match s {
        "PENDING" => OfferStatus::Pending,
        "ACCEPTED" => OfferStatus::Accepted,
        "REJECTED" => OfferStatus::Rejected,
        "COUNTERED" => OfferStatus::Countered,
        "EXPIRED" => OfferStatus::Expired,
        other => {
            tracing::warn!(
                value = other,
                "unrecognized offer status in database, defaulting to PENDING"
            );
            OfferStatus::Pending
        }
    }
}

fn parse_trade_status(s: &str) -> TradeStatus {
    match s {
        "PENDING_BRANCH_SELECTION" => TradeStatus::PendingBranchSelection,
        "ACTIVE" => TradeStatus::Active,
        "IN_TRANSIT" => TradeStatus::InTransit,
        "DELIVERED" => TradeStatus::Delivered,
        "COMPLETED" => TradeStatus::Completed,
        "CANCELLED" => TradeStatus::Cancelled,
        "DISPUTED" => TradeStatus::Disputed,
        other => {
            tracing::warn!(
                value = other,
                "unrecognized trade status in database, defaulting to PENDING_BRANCH_SELECTION"
            );
            TradeStatus::PendingBranchSelection
        }
    }
}

fn parse_party(s: &str) -> PartySide {
    match s {
        "BUYER" => PartySide::Buyer,
        "SELLER" => PartySide::Seller,
        other => {
            tracing::warn!(value = other, "unrecognized party side in database, defaulting to BUYER");
            PartySide::Buyer
        }
    }
}

fn parse_actor(s: &str) -> Actor {
    match s {
        "BUYER" => Actor::Buyer,
        "SELLER" => Actor::Seller,
        "SYSTEM" => Actor::System,
        other => {
            tracing::warn!(value = other, "unrecognized actor in database, defaulting to SYSTEM");
            Actor::System
        }
    }
}

fn parse_disclosure(s: &str) -> DisclosureLevel {
    match s {
        "MATCHED" => DisclosureLevel::Matched,
        "NEGOTIATING" => DisclosureLevel::Negotiating,
        "TRADE" => DisclosureLevel::Trade,
        other => {
            tracing::warn!(
                value = other,
                "unrecognized disclosure level in database, defaulting to MATCHED"
            );
            DisclosureLevel::Matched
        }
    }
}

fn to_json<T: Serialize>(what: &str, value: &T) -> Result<serde_json::Value, MandiError> {
    serde_json::to_value(value)
        .map_err(|err| MandiError::Storage(format!("failed to serialize {what}: {err}")))
}

fn from_json<T: DeserializeOwned>(
    what: &str,
    id: impl fmt::Display,
    value: serde_json::Value,
) -> Result<T, MandiError> {
    serde_json::from_value(value)
        .map_err(|err| MandiError::Storage(format!("corrupt {what} data in {id}: {err}")))
}

fn db_err(err: sqlx::Error) -> MandiError {
    MandiError::Storage(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}
