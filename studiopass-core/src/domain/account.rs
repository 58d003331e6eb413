//! Account domain model
//!
//! An account record lives in the remote store as a flat attribute bag.
//! The typed structures here deserialize out of (and back into) that bag:
//! shared profile fields on every account, plus a kind-specific field set
//! held as a tagged variant so member-only and partner-only logic stays
//! with its own data instead of branching on a string discriminant.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};

/// Attribute bag shape shared with the remote record store
pub type Attributes = serde_json::Map<String, JsonValue>;

/// The storage key that denotes "no custom icon uploaded"
pub const DEFAULT_ICON_KEY: &str = "default-icon.png";

/// Account discriminant, fixed at creation and never changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    Member,
    Partner,
}

impl AccountKind {
    /// Remote collection holding records of this kind
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Member => "users",
            Self::Partner => "partners",
        }
    }

    /// Wire value stored in the `account_type` attribute and encoded in
    /// the auth profile display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "user",
            Self::Partner => "partner",
        }
    }

    pub fn from_wire(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(Self::Member),
            "partner" => Ok(Self::Partner),
            other => Err(Error::validation(format!(
                "unknown account type: {}",
                other
            ))),
        }
    }

    /// Parse the kind out of an auth display name
    ///
    /// Display names follow the `<account_type>_<first>_<last>` convention;
    /// anything unparseable falls back to a member account, matching how
    /// sign-in treats legacy profiles.
    pub fn from_display_name(display_name: &str) -> Self {
        match display_name.split('_').next() {
            Some("partner") => Self::Partner,
            _ => Self::Member,
        }
    }

    /// Encode a display name carrying the kind, per the auth convention
    pub fn encode_display_name(&self, first: &str, last: &str) -> String {
        format!("{}_{}_{}", self.as_str(), first, last)
    }
}

/// A booked or bookable attendance slot: one class at one time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRef {
    pub class_id: String,
    pub time_id: String,
}

/// Fields present only on member accounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberFields {
    #[serde(default)]
    pub active_memberships: Vec<String>,
    #[serde(default)]
    pub active_classes: Vec<ClassRef>,
    #[serde(default)]
    pub scheduled_classes: Vec<ClassRef>,
}

impl MemberFields {
    /// Whether this time slot has already been bought
    pub fn has_purchased(&self, time_id: &str) -> bool {
        self.active_classes.iter().any(|c| c.time_id == time_id)
    }

    /// Whether this time slot is already on the schedule
    pub fn has_scheduled(&self, time_id: &str) -> bool {
        self.scheduled_classes.iter().any(|c| c.time_id == time_id)
    }

    pub fn owns_membership(&self, membership_id: &str) -> bool {
        self.active_memberships.iter().any(|m| m == membership_id)
    }

    /// Class ids a member cares about: active and scheduled, de-duplicated
    pub fn relevant_class_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for c in self.active_classes.iter().chain(self.scheduled_classes.iter()) {
            if !ids.contains(&c.class_id) {
                ids.push(c.class_id.clone());
            }
        }
        ids
    }

    pub fn scheduled_class_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for c in &self.scheduled_classes {
            if !ids.contains(&c.class_id) {
                ids.push(c.class_id.clone());
            }
        }
        ids
    }

    /// Check the booking invariants: no duplicate time slot in either
    /// sequence, no duplicate membership id
    pub fn validate(&self) -> Result<()> {
        for (i, c) in self.scheduled_classes.iter().enumerate() {
            if self.scheduled_classes[..i].iter().any(|p| p.time_id == c.time_id) {
                return Err(Error::validation(format!(
                    "duplicate scheduled time slot: {}",
                    c.time_id
                )));
            }
        }
        for (i, c) in self.active_classes.iter().enumerate() {
            if self.active_classes[..i].iter().any(|p| p.time_id == c.time_id) {
                return Err(Error::validation(format!(
                    "duplicate active time slot: {}",
                    c.time_id
                )));
            }
        }
        for (i, m) in self.active_memberships.iter().enumerate() {
            if self.active_memberships[..i].contains(m) {
                return Err(Error::validation(format!("duplicate membership: {}", m)));
            }
        }
        Ok(())
    }
}

/// Fields present only on partner accounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartnerFields {
    #[serde(default)]
    pub associated_classes: Vec<String>,
    #[serde(default)]
    pub associated_gyms: Vec<String>,
    #[serde(default)]
    pub revenue: Decimal,
    #[serde(default)]
    pub revenue_total: Decimal,
}

/// Kind-specific field set, tagged by account kind
#[derive(Debug, Clone)]
pub enum AccountFields {
    Member(MemberFields),
    Partner(PartnerFields),
}

impl AccountFields {
    /// Empty field set for a freshly created account of this kind
    pub fn empty(kind: AccountKind) -> Self {
        match kind {
            AccountKind::Member => Self::Member(MemberFields::default()),
            AccountKind::Partner => Self::Partner(PartnerFields::default()),
        }
    }

    /// Deserialize the kind-specific fields out of a record attribute bag
    ///
    /// Missing collections deserialize as empty, matching records written
    /// before a field existed.
    pub fn from_attributes(kind: AccountKind, attrs: &Attributes) -> Result<Self> {
        let value = JsonValue::Object(attrs.clone());
        Ok(match kind {
            AccountKind::Member => Self::Member(serde_json::from_value(value)?),
            AccountKind::Partner => Self::Partner(serde_json::from_value(value)?),
        })
    }

    /// Serialize back into attribute-bag form for merging into a mirror
    pub fn to_attributes(&self) -> Result<Attributes> {
        let value = match self {
            Self::Member(f) => serde_json::to_value(f)?,
            Self::Partner(f) => serde_json::to_value(f)?,
        };
        match value {
            JsonValue::Object(map) => Ok(map),
            _ => Err(Error::Other("account fields must serialize to an object".into())),
        }
    }

    /// Class ids relevant to this account for catalog joins
    pub fn relevant_class_ids(&self) -> Vec<String> {
        match self {
            Self::Member(f) => f.relevant_class_ids(),
            Self::Partner(f) => f.associated_classes.clone(),
        }
    }
}

/// Shared profile fields present on every account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_icon")]
    pub icon_uri: String,
    #[serde(default)]
    pub icon_uri_foreign: Option<String>,
}

fn default_icon() -> String {
    DEFAULT_ICON_KEY.to_string()
}

impl Profile {
    pub fn from_attributes(attrs: &Attributes) -> Result<Self> {
        Ok(serde_json::from_value(JsonValue::Object(attrs.clone()))?)
    }

    /// Full display name, `"first last"`
    pub fn name(&self) -> String {
        format!("{} {}", self.first, self.last)
    }
}

/// Denormalized account view returned by `retrieve_user`
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    pub id: String,
    pub kind: AccountKind,
    pub name: String,
    /// Resolved public URL for the account icon, if any source had one
    pub icon_uri_full: Option<String>,
    #[serde(flatten)]
    pub profile: Profile,
    /// The full record attribute bag, for screens that need raw fields
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ref_(class_id: &str, time_id: &str) -> ClassRef {
        ClassRef {
            class_id: class_id.to_string(),
            time_id: time_id.to_string(),
        }
    }

    #[test]
    fn test_kind_from_display_name() {
        assert_eq!(
            AccountKind::from_display_name("partner_Jane_Doe"),
            AccountKind::Partner
        );
        assert_eq!(
            AccountKind::from_display_name("user_John_Smith"),
            AccountKind::Member
        );
        // Legacy/garbage display names fall back to member
        assert_eq!(AccountKind::from_display_name("whatever"), AccountKind::Member);
    }

    #[test]
    fn test_display_name_round_trip() {
        let name = AccountKind::Partner.encode_display_name("Jane", "Doe");
        assert_eq!(name, "partner_Jane_Doe");
        assert_eq!(AccountKind::from_display_name(&name), AccountKind::Partner);
    }

    #[test]
    fn test_member_fields_from_sparse_bag() {
        // Records written before a collection existed have no such key
        let attrs = json!({ "first": "A", "last": "B" });
        let fields = AccountFields::from_attributes(
            AccountKind::Member,
            attrs.as_object().unwrap(),
        )
        .unwrap();
        match fields {
            AccountFields::Member(f) => {
                assert!(f.active_classes.is_empty());
                assert!(f.active_memberships.is_empty());
            }
            _ => panic!("expected member fields"),
        }
    }

    #[test]
    fn test_relevant_class_ids_dedup() {
        let fields = MemberFields {
            active_memberships: vec![],
            active_classes: vec![ref_("c1", "t1"), ref_("c2", "t2")],
            scheduled_classes: vec![ref_("c1", "t1"), ref_("c3", "t3")],
        };
        assert_eq!(fields.relevant_class_ids(), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_validate_rejects_duplicate_time_slot() {
        let fields = MemberFields {
            active_memberships: vec![],
            active_classes: vec![],
            scheduled_classes: vec![ref_("c1", "t1"), ref_("c2", "t1")],
        };
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_membership() {
        let fields = MemberFields {
            active_memberships: vec!["m1".into(), "m1".into()],
            active_classes: vec![],
            scheduled_classes: vec![],
        };
        assert!(fields.validate().is_err());
    }

    #[test]
    fn test_profile_defaults_icon() {
        let attrs = json!({ "first": "A", "last": "B", "email": "a@b.c" });
        let profile = Profile::from_attributes(attrs.as_object().unwrap()).unwrap();
        assert_eq!(profile.icon_uri, DEFAULT_ICON_KEY);
        assert_eq!(profile.name(), "A B");
    }
}
