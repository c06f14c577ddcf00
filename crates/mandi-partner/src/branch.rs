//! # Branch Directory
//!
//! Partners operate named branches (warehouses, offices, yards). Trades
//! bind three branch slots: where goods ship to, where they ship from,
//! and where the invoice bills to. The directory answers eligibility
//! queries for those slots and maintains per-slot default branches.
//!
//! ## Eligibility
//!
//! A branch is eligible for a filter when it is active, handles the
//! requested commodity (an empty commodity list means the branch handles
//! everything), and meets the capacity floor (branches with untracked
//! capacity are not refused on capacity grounds).

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use mandi_core::{BranchId, MandiError, PartnerId};

// ── Address ──────────────────────────────────────────────────────────────

/// A postal address carried by branches and frozen into trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    /// State or union territory. GST treatment compares this field
    /// across the two shipping slots of a trade.
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl PostalAddress {
    /// An address in India; `line2` is absent until set.
    pub fn new(
        line1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        Self {
            line1: line1.into(),
            line2: None,
            city: city.into(),
            state: state.into(),
            postal_code: postal_code.into(),
            country: "IN".to_string(),
        }
    }

    /// Set the second address line.
    pub fn with_line2(mut self, line2: impl Into<String>) -> Self {
        self.line2 = Some(line2.into());
        self
    }

    /// Override the country code.
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }
}

impl std::fmt::Display for PostalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {} {}", self.line1, self.city, self.state, self.postal_code)
    }
}

// ── Slots ────────────────────────────────────────────────────────────────

/// The three branch roles a trade must fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchSlot {
    /// Buyer-side delivery destination.
    ShipTo,
    /// Seller-side dispatch origin.
    ShipFrom,
    /// Buyer-side invoicing address.
    BillTo,
}

impl BranchSlot {
    /// The canonical string name of this slot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShipTo => "SHIP_TO",
            Self::ShipFrom => "SHIP_FROM",
            Self::BillTo => "BILL_TO",
        }
    }
}

impl std::fmt::Display for BranchSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Branch ───────────────────────────────────────────────────────────────

/// One operating location of a partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub partner_id: PartnerId,
    pub name: String,
    pub address: PostalAddress,
    /// Commodity names this branch handles. Empty means all.
    pub commodities: Vec<String>,
    /// Storage capacity in the partner's stock unit. `None` means the
    /// branch does not track capacity.
    pub storage_capacity: Option<Decimal>,
    pub active: bool,
    pub default_ship_to: bool,
    pub default_ship_from: bool,
    pub default_bill_to: bool,
}

impl Branch {
    /// An active branch with no commodity restriction, no tracked
    /// capacity, and no default flags.
    pub fn new(partner_id: PartnerId, name: impl Into<String>, address: PostalAddress) -> Self {
        Self {
            id: BranchId::new(),
            partner_id,
            name: name.into(),
            address,
            commodities: Vec::new(),
            storage_capacity: None,
            active: true,
            default_ship_to: false,
            default_ship_from: false,
            default_bill_to: false,
        }
    }

    /// Restrict the branch to the given commodity names.
    pub fn with_commodities(mut self, commodities: Vec<String>) -> Self {
        self.commodities = commodities;
        self
    }

    /// Record a tracked storage capacity.
    pub fn with_capacity(mut self, capacity: Decimal) -> Self {
        self.storage_capacity = Some(capacity);
        self
    }

    /// Whether this branch handles `commodity`. Comparison is
    /// case-insensitive on trimmed names.
    pub fn handles_commodity(&self, commodity: &str) -> bool {
        if self.commodities.is_empty() {
            return true;
        }
        let wanted = commodity.trim().to_uppercase();
        self.commodities
            .iter()
            .any(|name| name.trim().to_uppercase() == wanted)
    }

    /// Whether this branch satisfies `filter`.
    pub fn matches(&self, filter: &BranchFilter) -> bool {
        if !self.active {
            return false;
        }
        if let Some(commodity) = &filter.commodity {
            if !self.handles_commodity(commodity) {
                return false;
            }
        }
        if let Some(min) = filter.min_capacity {
            if let Some(capacity) = self.storage_capacity {
                if capacity < min {
                    return false;
                }
            }
        }
        true
    }

    /// Whether this branch is the partner's default for `slot`.
    pub fn is_default_for(&self, slot: BranchSlot) -> bool {
        match slot {
            BranchSlot::ShipTo => self.default_ship_to,
            BranchSlot::ShipFrom => self.default_ship_from,
            BranchSlot::BillTo => self.default_bill_to,
        }
    }

    /// Set or clear the default flag for `slot`.
    pub fn set_default_flag(&mut self, slot: BranchSlot, value: bool) {
        match slot {
            BranchSlot::ShipTo => self.default_ship_to = value,
            BranchSlot::ShipFrom => self.default_ship_from = value,
            BranchSlot::BillTo => self.default_bill_to = value,
        }
    }
}

// ── Filter ───────────────────────────────────────────────────────────────

/// Eligibility constraints for a branch query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchFilter {
    /// Require the branch to handle this commodity.
    pub commodity: Option<String>,
    /// Require at least this much tracked capacity.
    pub min_capacity: Option<Decimal>,
}

impl BranchFilter {
    /// No constraints beyond the branch being active.
    pub fn any() -> Self {
        Self::default()
    }

    /// Require the branch to handle `commodity`.
    pub fn for_commodity(commodity: impl Into<String>) -> Self {
        Self {
            commodity: Some(commodity.into()),
            min_capacity: None,
        }
    }

    /// Add a capacity floor.
    pub fn with_min_capacity(mut self, min: Decimal) -> Self {
        self.min_capacity = Some(min);
        self
    }
}

// ── Directory ────────────────────────────────────────────────────────────

/// Query and default-management boundary over partner branches.
#[async_trait]
pub trait BranchDirectory: Send + Sync {
    /// Fetch one branch.
    ///
    /// # Errors
    ///
    /// `NotFound` when no branch has this id.
    async fn branch(&self, id: &BranchId) -> Result<Branch, MandiError>;

    /// All branches of `partner`, eligible or not, ordered by name.
    async fn branches_of(&self, partner: &PartnerId) -> Result<Vec<Branch>, MandiError>;

    /// Branches of `partner` satisfying `filter`, ordered by name.
    async fn eligible(
        &self,
        partner: &PartnerId,
        filter: &BranchFilter,
    ) -> Result<Vec<Branch>, MandiError>;

    /// The partner's default branch for `slot`, if one is flagged.
    async fn default_for(
        &self,
        partner: &PartnerId,
        slot: BranchSlot,
    ) -> Result<Option<Branch>, MandiError>;

    /// Flag `branch` as the partner's default for `slot`, clearing the
    /// flag from every other branch of the same partner in the same
    /// step. At most one default per partner and slot can ever be
    /// observed.
    ///
    /// # Errors
    ///
    /// `NotFound` when the branch does not exist; `Authorization` when
    /// it belongs to a different partner.
    async fn set_default(
        &self,
        partner: &PartnerId,
        slot: BranchSlot,
        branch: &BranchId,
    ) -> Result<(), MandiError>;
}

/// In-memory branch directory.
#[derive(Default)]
pub struct InMemoryBranchDirectory {
    branches: RwLock<HashMap<BranchId, Branch>>,
}

impl InMemoryBranchDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a branch record.
    pub fn register(&self, branch: Branch) {
        self.branches.write().insert(branch.id.clone(), branch);
    }
}

#[async_trait]
impl BranchDirectory for InMemoryBranchDirectory {
    async fn branch(&self, id: &BranchId) -> Result<Branch, MandiError> {
        self.branches
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| MandiError::not_found("branch", id.to_string()))
    }

    async fn branches_of(&self, partner: &PartnerId) -> Result<Vec<Branch>, MandiError> {
        let mut found: Vec<Branch> = self
            .branches
            .read()
            .values()
            .filter(|branch| &branch.partner_id == partner)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn eligible(
        &self,
        partner: &PartnerId,
        filter: &BranchFilter,
    ) -> Result<Vec<Branch>, MandiError> {
        let mut found: Vec<Branch> = self
            .branches
            .read()
            .values()
            .filter(|branch| &branch.partner_id == partner && branch.matches(filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn default_for(
        &self,
        partner: &PartnerId,
        slot: BranchSlot,
    ) -> Result<Option<Branch>, MandiError> {
        Ok(self
            .branches
            .read()
            .values()
            .find(|branch| {
                &branch.partner_id == partner && branch.active && branch.is_default_for(slot)
            })
            .cloned())
    }

    async fn set_default(
        &self,
        partner: &PartnerId,
        slot: BranchSlot,
        branch: &BranchId,
    ) -> Result<(), MandiError> {
        let mut branches = self.branches.write();
        {
            let target = branches
                .get(branch)
                .ok_or_else(|| MandiError::not_found("branch", branch.to_string()))?;
            if &target.partner_id != partner {
                return Err(MandiError::Authorization(format!(
                    "branch {branch} does not belong to partner {partner}"
                )));
            }
        }
        // One pass under the write lock: exclusivity holds at every
        // point an observer could acquire the lock.
        for record in branches.values_mut().filter(|b| &b.partner_id == partner) {
            let is_target = &record.id == branch;
            record.set_default_flag(slot, is_target);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBranchDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBranchDirectory")
            .field("branches", &self.branches.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn nagpur_address() -> PostalAddress {
        PostalAddress::new("14 Cotton Market Rd", "Nagpur", "Maharashtra", "440018")
    }

    fn rajkot_address() -> PostalAddress {
        PostalAddress::new("7 Gondal Rd", "Rajkot", "Gujarat", "360002")
    }

    #[test]
    fn empty_commodity_list_handles_everything() {
        let branch = Branch::new(PartnerId::new(), "Main", nagpur_address());
        assert!(branch.handles_commodity("COTTON"));
        assert!(branch.handles_commodity("turmeric"));
    }

    #[test]
    fn commodity_match_is_case_insensitive() {
        let branch = Branch::new(PartnerId::new(), "Main", nagpur_address())
            .with_commodities(vec!["Cotton".to_string()]);
        assert!(branch.handles_commodity(" COTTON "));
        assert!(!branch.handles_commodity("WHEAT"));
    }

    #[test]
    fn untracked_capacity_passes_capacity_filter() {
        let branch = Branch::new(PartnerId::new(), "Main", nagpur_address());
        let filter = BranchFilter::any().with_min_capacity(Decimal::from(500));
        assert!(branch.matches(&filter));
    }

    #[test]
    fn tracked_capacity_below_floor_is_filtered_out() {
        let branch = Branch::new(PartnerId::new(), "Main", nagpur_address())
            .with_capacity(Decimal::from(200));
        let filter = BranchFilter::any().with_min_capacity(Decimal::from(500));
        assert!(!branch.matches(&filter));
    }

    #[test]
    fn slot_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&BranchSlot::ShipFrom).unwrap(),
            "\"SHIP_FROM\""
        );
        let parsed: BranchSlot = serde_json::from_str("\"BILL_TO\"").unwrap();
        assert_eq!(parsed, BranchSlot::BillTo);
    }

    #[test]
    fn inactive_branch_never_matches() {
        let mut branch = Branch::new(PartnerId::new(), "Main", nagpur_address());
        branch.active = false;
        assert!(!branch.matches(&BranchFilter::any()));
    }

    #[tokio::test]
    async fn eligible_is_scoped_to_the_partner() {
        let directory = InMemoryBranchDirectory::new();
        let buyer = PartnerId::new();
        let seller = PartnerId::new();
        directory.register(Branch::new(buyer.clone(), "Nagpur Yard", nagpur_address()));
        directory.register(Branch::new(seller.clone(), "Rajkot Godown", rajkot_address()));

        let found = directory.eligible(&buyer, &BranchFilter::any()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Nagpur Yard");
    }

    #[tokio::test]
    async fn eligible_results_are_ordered_by_name() {
        let directory = InMemoryBranchDirectory::new();
        let partner = PartnerId::new();
        directory.register(Branch::new(partner.clone(), "Zeta", nagpur_address()));
        directory.register(Branch::new(partner.clone(), "Alpha", nagpur_address()));

        let found = directory.eligible(&partner, &BranchFilter::any()).await.unwrap();
        let names: Vec<&str> = found.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn set_default_moves_the_flag_atomically() {
        let directory = InMemoryBranchDirectory::new();
        let partner = PartnerId::new();
        let first = Branch::new(partner.clone(), "First", nagpur_address());
        let second = Branch::new(partner.clone(), "Second", nagpur_address());
        let first_id = first.id.clone();
        let second_id = second.id.clone();
        directory.register(first);
        directory.register(second);

        directory
            .set_default(&partner, BranchSlot::ShipTo, &first_id)
            .await
            .unwrap();
        directory
            .set_default(&partner, BranchSlot::ShipTo, &second_id)
            .await
            .unwrap();

        let holder = directory
            .default_for(&partner, BranchSlot::ShipTo)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(holder.id, second_id);
        assert!(!directory.branch(&first_id).await.unwrap().default_ship_to);
    }

    #[tokio::test]
    async fn default_flags_are_independent_per_slot() {
        let directory = InMemoryBranchDirectory::new();
        let partner = PartnerId::new();
        let branch = Branch::new(partner.clone(), "Main", nagpur_address());
        let id = branch.id.clone();
        directory.register(branch);

        directory
            .set_default(&partner, BranchSlot::ShipTo, &id)
            .await
            .unwrap();

        assert!(directory
            .default_for(&partner, BranchSlot::BillTo)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn set_default_rejects_foreign_branches() {
        let directory = InMemoryBranchDirectory::new();
        let owner = PartnerId::new();
        let intruder = PartnerId::new();
        let branch = Branch::new(owner, "Main", nagpur_address());
        let id = branch.id.clone();
        directory.register(branch);

        let err = directory
            .set_default(&intruder, BranchSlot::ShipFrom, &id)
            .await
            .unwrap_err();
        assert!(matches!(err, MandiError::Authorization(_)));
    }
}
