use mandi_core::BranchId;
use mandi_partner::Branch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a branch ended up on a trade slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionSource {
    /// Explicitly named by the acting partner.
    Override,
    /// Only one branch passed the eligibility filter.
    SingleEligible,
    /// Chosen via the partner's designated default for the slot.
    PartnerDefault,
}

impl SelectionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionSource::Override => "OVERRIDE",
            SelectionSource::SingleEligible => "SINGLE_ELIGIBLE",
            SelectionSource::PartnerDefault => "PARTNER_DEFAULT",
        }
    }
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address fields copied out of a branch at selection time.
///
/// The copy is deliberate: later edits to the branch record must not
/// change what the contract says, so the trade owns these values outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub branch_id: BranchId,
    pub branch_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl AddressSnapshot {
    pub fn from_branch(branch: &Branch) -> Self {
        AddressSnapshot {
            branch_id: branch.id.clone(),
            branch_name: branch.name.clone(),
            line1: branch.address.line1.clone(),
            line2: branch.address.line2.clone(),
            city: branch.address.city.clone(),
            state: branch.address.state.clone(),
            postal_code: branch.address.postal_code.clone(),
            country: branch.address.country.clone(),
        }
    }
}

impl fmt::Display for AddressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.branch_name, self.city, self.state)
    }
}

/// A resolved slot: the frozen address plus how it was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSelection {
    pub snapshot: AddressSnapshot,
    pub source: SelectionSource,
}

impl BranchSelection {
    pub fn new(branch: &Branch, source: SelectionSource) -> Self {
        BranchSelection { snapshot: AddressSnapshot::from_branch(branch), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mandi_core::PartnerId;
    use mandi_partner::PostalAddress;

    fn sample_branch() -> Branch {
        Branch::new(
            PartnerId::new(),
            "Nagpur Warehouse",
            PostalAddress::new("Plot 14, MIDC", "Nagpur", "Maharashtra", "440016"),
        )
    }

    #[test]
    fn snapshot_copies_every_address_field() {
        let branch = sample_branch();
        let snapshot = AddressSnapshot::from_branch(&branch);
        assert_eq!(snapshot.branch_id, branch.id);
        assert_eq!(snapshot.branch_name, "Nagpur Warehouse");
        assert_eq!(snapshot.line1, "Plot 14, MIDC");
        assert_eq!(snapshot.state, "Maharashtra");
        assert_eq!(snapshot.country, "IN");
    }

    #[test]
    fn snapshot_survives_branch_edits() {
        let mut branch = sample_branch();
        let snapshot = AddressSnapshot::from_branch(&branch);

        branch.name = "Renamed Depot".to_string();
        branch.address.city = "Pune".to_string();
        branch.address.state = "Karnataka".to_string();

        assert_eq!(snapshot.branch_name, "Nagpur Warehouse");
        assert_eq!(snapshot.city, "Nagpur");
        assert_eq!(snapshot.state, "Maharashtra");
    }

    #[test]
    fn selection_source_serializes_screaming() {
        let json = serde_json::to_string(&SelectionSource::SingleEligible).unwrap();
        assert_eq!(json, "\"SINGLE_ELIGIBLE\"");
    }
}
