//! Account entity - guarded, payment-bearing operations on one record
//!
//! Every mutating operation follows one template:
//!
//! 1. acquire the single-flight guard
//! 2. ensure hydrated
//! 3. `force_pull` so the precondition check runs against fresh state
//! 4. validate the precondition; fail fast with a domain error BEFORE any
//!    external call
//! 5. invoke the gateway action(s); a failure here aborts before any local
//!    mutation, so the mirror is never half-mutated against a failed charge
//! 6. merge the derived state into the mirror
//! 7. push
//!
//! The order never varies; the staleness window of the precondition check
//! is bounded by the duration of one remote read.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

use crate::cache::KeyValueCache;
use crate::config::{DEFAULT_ICON_MAX_BYTES, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_DELAY_MS};
use crate::domain::result::{Error, Result};
use crate::domain::{
    AccountFields, AccountKind, AccountOverview, Attributes, ClassRef, LivestreamKey,
    MemberFields, NewPaymentMethod, PastTransaction, PaymentMethod, Profile,
    PurchaseClassDetails, PurchaseMembershipDetails, ScheduleClassDetails, DEFAULT_ICON_KEY,
};
use crate::ports::{
    calls, AuthProvider, AuthUser, ClassCatalog, GymCatalog, ImagePicker, ObjectStorage,
    PickedImage, RecordKey, RemoteRecordStore, ServiceGateway,
};
use crate::services::guard::SingleFlight;
use crate::services::logging::EventLogger;
use crate::services::poll::{poll_bounded, PollOutcome, Probe};
use crate::services::record::RecordMirror;

/// Collection holding the payment provider's per-customer subcollections
const PAYMENT_CUSTOMERS_COLLECTION: &str = "stripe_customers";
const PAYMENT_METHODS_SUBRESOURCE: &str = "payment_methods";
const PAYMENTS_SUBRESOURCE: &str = "payments";

/// Names of the guarded operations, as reported by `Error::Busy`
pub mod ops {
    pub const PURCHASE_CLASS: &str = "purchase_class";
    pub const SCHEDULE_CLASS: &str = "schedule_class";
    pub const PURCHASE_MEMBERSHIP: &str = "purchase_membership";
    pub const DELETE_SUBSCRIPTION: &str = "delete_subscription";
    pub const CREATE_LIVESTREAM: &str = "create_livestream";
}

/// Tunables for entity operations, sourced from [`crate::config::Config`]
#[derive(Debug, Clone)]
pub struct OperationLimits {
    pub poll_attempts: u32,
    pub poll_delay: Duration,
    pub icon_max_bytes: u64,
}

impl Default for OperationLimits {
    fn default() -> Self {
        Self {
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_delay: Duration::from_millis(DEFAULT_POLL_DELAY_MS),
            icon_max_bytes: DEFAULT_ICON_MAX_BYTES,
        }
    }
}

/// Explicitly injected collaborators for an account entity
///
/// No ambient globals: every entity carries its own cache handle and
/// session context, so tests never couple through hidden module state.
#[derive(Clone)]
pub struct AccountDeps {
    pub store: Arc<dyn RemoteRecordStore>,
    pub cache: Arc<KeyValueCache>,
    pub gateway: Arc<dyn ServiceGateway>,
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub classes: Arc<dyn ClassCatalog>,
    pub gyms: Arc<dyn GymCatalog>,
    pub picker: Arc<dyn ImagePicker>,
    pub limits: OperationLimits,
    pub logger: Option<Arc<EventLogger>>,
}

/// Sign-up form for a manually created account
#[derive(Debug, Clone)]
pub struct SignUpForm {
    pub first: String,
    pub last: String,
    pub email: String,
    pub password: String,
    pub kind: AccountKind,
}

/// Sign-up through a social identity provider
///
/// The provider has already authenticated the user; name and icon come
/// from its profile.
#[derive(Debug, Clone)]
pub struct SocialSignUp {
    pub kind: AccountKind,
    pub user: AuthUser,
}

/// In-memory entity binding account behavior to one remote record
pub struct AccountEntity {
    kind: AccountKind,
    uid: String,
    mirror: RecordMirror,
    guard: SingleFlight,
    deps: AccountDeps,
}

impl AccountEntity {
    /// Bind an entity to a known record identity
    pub fn new(kind: AccountKind, uid: impl Into<String>, deps: AccountDeps) -> Self {
        let mirror = RecordMirror::new(deps.store.clone(), deps.cache.clone());
        Self {
            kind,
            uid: uid.into(),
            mirror,
            guard: SingleFlight::new(),
            deps,
        }
    }

    /// Build the entity for the currently signed-in session
    ///
    /// The account kind is parsed out of the auth display name, which is
    /// how the client knows the collection before fetching anything.
    pub fn for_current_session(deps: AccountDeps) -> Result<Self> {
        let user = deps
            .auth
            .current_user()
            .ok_or_else(|| Error::validation("no signed-in user"))?;
        let kind = AccountKind::from_display_name(&user.display_name);
        Ok(Self::new(kind, user.uid, deps))
    }

    /// Create a brand-new account with email and password
    pub async fn create(form: SignUpForm, deps: AccountDeps) -> Result<Self> {
        let user = deps.auth.create_user(&form.email, &form.password).await?;
        let entity = Self::new(form.kind, user.uid, deps);
        entity
            .seed_record(&form.first, &form.last, &form.email, None)
            .await?;
        Ok(entity)
    }

    /// Create a brand-new account from a social identity
    pub async fn create_social(social: SocialSignUp, deps: AccountDeps) -> Result<Self> {
        let mut names = social.user.display_name.split_whitespace();
        let first = names.next().unwrap_or_default().to_string();
        let last = names.collect::<Vec<_>>().join(" ");
        let email = social.user.email.clone().unwrap_or_default();

        let entity = Self::new(social.kind, social.user.uid.clone(), deps);
        entity
            .seed_record(&first, &last, &email, social.user.photo_url.clone())
            .await?;
        Ok(entity)
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    fn record_key(&self) -> RecordKey {
        RecordKey::new(self.kind.collection(), self.uid.clone())
    }

    /// Ensure the mirror is hydrated from cache or the remote store
    pub async fn init(&self) -> Result<()> {
        self.mirror.init_by_key(self.record_key()).await
    }

    /// Seed and push the record for a freshly created account
    async fn seed_record(
        &self,
        first: &str,
        last: &str,
        email: &str,
        icon_uri_foreign: Option<String>,
    ) -> Result<()> {
        self.mirror.bind_fresh(self.record_key())?;

        let shared = json!({
            "account_type": self.kind.as_str(),
            "id": self.uid,
            "first": first,
            "last": last,
            "email": email,
            "icon_uri": DEFAULT_ICON_KEY,
            "icon_uri_foreign": icon_uri_foreign,
        });
        self.mirror.merge_items(as_attrs(shared)?)?;
        self.mirror
            .merge_items(AccountFields::empty(self.kind).to_attributes()?)?;

        // The record push and the display-name write go out together; the
        // display name is how the next sign-in learns the account kind.
        let display_name = self.kind.encode_display_name(first, last);
        let (pushed, renamed) = tokio::join!(
            self.mirror.push(),
            self.deps.auth.update_display_name(&display_name)
        );
        pushed?;
        renamed?;
        Ok(())
    }

    // =========================================================================
    // Guarded mutating operations
    // =========================================================================

    /// Purchase a single class time slot
    ///
    /// Charges the customer, documents the purchase for the partner, and
    /// registers the slot as both active and scheduled (a purchase
    /// auto-schedules attendance).
    pub async fn purchase_class(&self, details: &PurchaseClassDetails) -> Result<()> {
        let _permit = self.guard.acquire(ops::PURCHASE_CLASS)?;
        let outcome = self.purchase_class_inner(details).await;
        self.log_outcome(ops::PURCHASE_CLASS, &outcome);
        outcome
    }

    async fn purchase_class_inner(&self, details: &PurchaseClassDetails) -> Result<()> {
        self.init().await?;
        self.mirror.force_pull().await?;

        let attrs = self.mirror.get_all()?;
        let fields = self.member_fields(&attrs)?;
        if fields.has_purchased(&details.time_id) {
            return Err(Error::AlreadyPurchased {
                time_id: details.time_id.clone(),
            });
        }

        let profile = Profile::from_attributes(&attrs)?;
        self.deps
            .gateway
            .call(
                calls::CHARGE_CUSTOMER,
                json!({
                    "cardId": details.credit_card_id,
                    "amount": details.price,
                    "description": details.description,
                }),
            )
            .await?;
        self.deps
            .gateway
            .call(
                calls::DOCUMENT_CLASS_PURCHASE,
                json!({
                    "classId": details.class_id,
                    "timeId": details.time_id,
                    "partnerId": details.partner_id,
                    "amount": details.price,
                    "user": user_summary(&profile),
                }),
            )
            .await?;

        let entry = ClassRef {
            class_id: details.class_id.clone(),
            time_id: details.time_id.clone(),
        };
        let mut updated = fields;
        updated.active_classes.push(entry.clone());
        updated.scheduled_classes.push(entry);
        self.merge_member_fields(updated)?;
        self.mirror.push().await
    }

    /// Put a class time on the schedule (no charge involved)
    pub async fn schedule_class(&self, details: &ScheduleClassDetails) -> Result<()> {
        let _permit = self.guard.acquire(ops::SCHEDULE_CLASS)?;
        let outcome = self.schedule_class_inner(details).await;
        self.log_outcome(ops::SCHEDULE_CLASS, &outcome);
        outcome
    }

    async fn schedule_class_inner(&self, details: &ScheduleClassDetails) -> Result<()> {
        self.init().await?;
        self.mirror.force_pull().await?;

        let attrs = self.mirror.get_all()?;
        let fields = self.member_fields(&attrs)?;
        if fields.has_scheduled(&details.time_id) {
            return Err(Error::AlreadyScheduled {
                time_id: details.time_id.clone(),
            });
        }

        // Lets the partner see who has scheduled their class
        let profile = Profile::from_attributes(&attrs)?;
        self.deps
            .gateway
            .call(
                calls::DOCUMENT_SCHEDULED_CLASS,
                json!({
                    "classId": details.class_id,
                    "timeId": details.time_id,
                    "user": user_summary(&profile),
                }),
            )
            .await?;

        let mut updated = fields;
        updated.scheduled_classes.push(ClassRef {
            class_id: details.class_id.clone(),
            time_id: details.time_id.clone(),
        });
        self.merge_member_fields(updated)?;
        self.mirror.push().await
    }

    /// Purchase a recurring membership
    pub async fn purchase_membership(&self, details: &PurchaseMembershipDetails) -> Result<()> {
        let _permit = self.guard.acquire(ops::PURCHASE_MEMBERSHIP)?;
        let outcome = self.purchase_membership_inner(details).await;
        self.log_outcome(ops::PURCHASE_MEMBERSHIP, &outcome);
        outcome
    }

    async fn purchase_membership_inner(&self, details: &PurchaseMembershipDetails) -> Result<()> {
        self.init().await?;
        self.mirror.force_pull().await?;

        let attrs = self.mirror.get_all()?;
        let fields = self.member_fields(&attrs)?;
        if fields.owns_membership(&details.membership_id) {
            return Err(Error::AlreadyOwned {
                membership_id: details.membership_id.clone(),
            });
        }

        self.deps
            .gateway
            .call(
                calls::SUBSCRIBE_CUSTOMER,
                json!({
                    "gymId": details.gym_id,
                    "cardId": details.credit_card_id,
                    "amount": details.price,
                    "description": details.description,
                }),
            )
            .await?;
        self.deps
            .gateway
            .call(
                calls::DOCUMENT_MEMBERSHIP_PURCHASE,
                json!({
                    "partnerId": details.partner_id,
                    "gymId": details.gym_id,
                    "amount": details.price,
                }),
            )
            .await?;

        let mut updated = fields;
        updated.active_memberships.push(details.membership_id.clone());
        self.merge_member_fields(updated)?;
        self.mirror.push().await
    }

    /// Cancel the membership bound to a gym
    ///
    /// Idempotent: the id is filtered out even if already absent, and the
    /// external cancellation call is safe to repeat.
    pub async fn delete_subscription(&self, gym_id: &str) -> Result<()> {
        let _permit = self.guard.acquire(ops::DELETE_SUBSCRIPTION)?;
        let outcome = self.delete_subscription_inner(gym_id).await;
        self.log_outcome(ops::DELETE_SUBSCRIPTION, &outcome);
        outcome
    }

    async fn delete_subscription_inner(&self, gym_id: &str) -> Result<()> {
        self.init().await?;
        self.mirror.force_pull().await?;

        let attrs = self.mirror.get_all()?;
        let fields = self.member_fields(&attrs)?;

        self.deps
            .gateway
            .call(
                calls::DELETE_SUBSCRIPTION,
                json!({ "gymIds": [gym_id] }),
            )
            .await?;

        let mut updated = fields;
        updated.active_memberships.retain(|m| m != gym_id);
        self.merge_member_fields(updated)?;
        self.mirror.push().await
    }

    /// Provision a livestream for a partner account
    ///
    /// The backend assigns the stream key asynchronously; after requesting
    /// creation this polls the record a bounded number of times. A
    /// `Pending` result means "try again later", not failure.
    pub async fn create_livestream(&self) -> Result<LivestreamKey> {
        let _permit = self.guard.acquire(ops::CREATE_LIVESTREAM)?;
        let outcome = self.create_livestream_inner().await;
        self.log_outcome(ops::CREATE_LIVESTREAM, &outcome);
        outcome
    }

    async fn create_livestream_inner(&self) -> Result<LivestreamKey> {
        self.init().await?;

        if let Some(key) = self.stream_key()? {
            return Ok(LivestreamKey::Ready(key));
        }

        self.deps
            .gateway
            .call(calls::CREATE_LIVESTREAM, json!({}))
            .await?;

        let outcome = poll_bounded(
            self.deps.limits.poll_attempts,
            self.deps.limits.poll_delay,
            || {
                let entity = self;
                async move {
                    entity.mirror.force_pull().await?;
                    Ok(match entity.stream_key()? {
                        Some(key) => Probe::Ready(key),
                        None => Probe::NotYet,
                    })
                }
            },
        )
        .await?;

        Ok(match outcome {
            PollOutcome::Ready(key) => LivestreamKey::Ready(key),
            PollOutcome::GaveUp { .. } => LivestreamKey::Pending,
        })
    }

    // =========================================================================
    // Unguarded mutations
    // =========================================================================

    /// Register a new payment method with the payment provider
    ///
    /// On success the returned method is appended to the payment-methods
    /// cache entry; the account record itself is untouched.
    pub async fn add_payment_method(&self, form: &NewPaymentMethod) -> Result<PaymentMethod> {
        self.init().await?;

        let result = self
            .deps
            .gateway
            .call(calls::ADD_PAYMENT_METHOD, serde_json::to_value(form)?)
            .await?;
        let method = match result {
            JsonValue::Object(map) => map,
            other => {
                return Err(Error::validation(format!(
                    "unexpected payment method shape: {}",
                    other
                )))
            }
        };

        let cache_key = self
            .record_key()
            .subresource_cache_key(PAYMENT_METHODS_SUBRESOURCE);
        let mut cached = match self.deps.cache.get(&cache_key) {
            Some(JsonValue::Array(entries)) => entries,
            _ => Vec::new(),
        };
        cached.push(JsonValue::Object(method.clone()));
        self.deps.cache.set(cache_key, JsonValue::Array(cached));

        Ok(method)
    }

    /// Onboard a partner account as a seller with the payment provider
    pub async fn create_stripe_seller(&self) -> Result<JsonValue> {
        self.require_partner()?;
        self.init().await?;
        self.deps
            .gateway
            .call(calls::CREATE_STRIPE_SELLER, json!({ "uid": self.uid }))
            .await
    }

    /// Replace the account icon with a freshly picked image
    ///
    /// Returns `false` if the user cancelled the picker. The size cap is
    /// enforced before any upload happens.
    pub async fn change_icon(&self) -> Result<bool> {
        self.init().await?;

        match self.deps.picker.pick_image().await? {
            PickedImage::Cancelled => Ok(false),
            PickedImage::Failed(message) => Err(Error::validation(format!(
                "image picker failed: {}",
                message
            ))),
            PickedImage::Selected {
                file_path,
                file_size,
            } => {
                if file_size > self.deps.limits.icon_max_bytes {
                    return Err(Error::validation(format!(
                        "image file size must not exceed {} bytes",
                        self.deps.limits.icon_max_bytes
                    )));
                }

                self.deps.storage.put_file(&self.uid, &file_path).await?;
                self.mirror
                    .merge_items(as_attrs(json!({ "icon_uri": self.uid }))?)?;
                self.mirror.push().await?;
                Ok(true)
            }
        }
    }

    // =========================================================================
    // Read-only derived views
    // =========================================================================

    /// Denormalized account overview for profile screens
    pub async fn retrieve_user(&self) -> Result<AccountOverview> {
        self.init().await?;

        let attrs = self.mirror.get_all()?;
        let profile = Profile::from_attributes(&attrs)?;

        // Normalize: make sure the kind-specific collections exist in the
        // mirror even on records written before a field was introduced.
        let fields = AccountFields::from_attributes(self.kind, &attrs)?;
        self.mirror.merge_items(fields.to_attributes()?)?;

        let icon_uri_full = self.resolve_icon(&profile).await?;
        Ok(AccountOverview {
            id: self.uid.clone(),
            kind: self.kind,
            name: profile.name(),
            icon_uri_full,
            profile,
            attributes: self.mirror.get_all()?,
        })
    }

    /// The account's stored payment methods, cached after the first fetch
    pub async fn retrieve_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.retrieve_payment_subresource(PAYMENT_METHODS_SUBRESOURCE)
            .await
    }

    /// The account's past transactions, cached after the first fetch
    pub async fn retrieve_past_transactions(&self) -> Result<Vec<PastTransaction>> {
        self.retrieve_payment_subresource(PAYMENTS_SUBRESOURCE).await
    }

    async fn retrieve_payment_subresource(&self, sub: &str) -> Result<Vec<Attributes>> {
        self.init().await?;

        let cache_key = self.record_key().subresource_cache_key(sub);
        if let Some(JsonValue::Array(cached)) = self.deps.cache.get(&cache_key) {
            if !cached.is_empty() {
                return Ok(cached
                    .into_iter()
                    .filter_map(|v| match v {
                        JsonValue::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect());
            }
        }

        let customer_key = RecordKey::new(PAYMENT_CUSTOMERS_COLLECTION, self.uid.clone());
        let docs = self.deps.store.get_subcollection(&customer_key, sub).await?;

        self.deps.cache.set(
            cache_key,
            JsonValue::Array(docs.iter().cloned().map(JsonValue::Object).collect()),
        );
        Ok(docs)
    }

    /// Class documents relevant to this account, joined via the catalog
    ///
    /// Members see their active and scheduled classes, de-duplicated;
    /// partners see the classes they run.
    pub async fn retrieve_classes(&self) -> Result<Vec<Attributes>> {
        self.init().await?;
        let attrs = self.mirror.get_all()?;
        let ids = AccountFields::from_attributes(self.kind, &attrs)?.relevant_class_ids();
        self.deps.classes.classes_by_ids(&ids).await
    }

    /// Class documents on a member's schedule
    pub async fn retrieve_scheduled_classes(&self) -> Result<Vec<Attributes>> {
        self.init().await?;
        let attrs = self.mirror.get_all()?;
        let ids = match AccountFields::from_attributes(self.kind, &attrs)? {
            AccountFields::Member(fields) => fields.scheduled_class_ids(),
            AccountFields::Partner(_) => return Ok(Vec::new()),
        };
        self.deps.classes.classes_by_ids(&ids).await
    }

    /// Gym documents a partner operates; empty for member accounts
    pub async fn retrieve_partner_gyms(&self) -> Result<Vec<Attributes>> {
        self.init().await?;
        let attrs = self.mirror.get_all()?;
        let ids = match AccountFields::from_attributes(self.kind, &attrs)? {
            AccountFields::Partner(fields) => fields.associated_gyms,
            AccountFields::Member(_) => return Ok(Vec::new()),
        };
        self.deps.gyms.gyms_by_ids(&ids).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn member_fields(&self, attrs: &Attributes) -> Result<MemberFields> {
        match AccountFields::from_attributes(self.kind, attrs)? {
            AccountFields::Member(fields) => Ok(fields),
            AccountFields::Partner(_) => Err(Error::validation(
                "operation requires a member account",
            )),
        }
    }

    fn require_partner(&self) -> Result<()> {
        if self.kind != AccountKind::Partner {
            return Err(Error::validation("operation requires a partner account"));
        }
        Ok(())
    }

    fn merge_member_fields(&self, fields: MemberFields) -> Result<()> {
        fields.validate()?;
        self.mirror
            .merge_items(AccountFields::Member(fields).to_attributes()?)
    }

    fn stream_key(&self) -> Result<Option<String>> {
        let attrs = self.mirror.get_all()?;
        Ok(attrs
            .get("stream_key")
            .and_then(JsonValue::as_str)
            .map(str::to_string))
    }

    async fn resolve_icon(&self, profile: &Profile) -> Result<Option<String>> {
        // Custom upload first, then the social provider's photo, then
        // whatever key the record carries (usually the default icon)
        if let Some(url) = self.deps.storage.public_url(&self.uid).await? {
            return Ok(Some(url));
        }
        if let Some(foreign) = &profile.icon_uri_foreign {
            return Ok(Some(foreign.clone()));
        }
        self.deps.storage.public_url(&profile.icon_uri).await
    }

    fn log_outcome<T>(&self, operation: &'static str, outcome: &Result<T>) {
        let Some(logger) = &self.deps.logger else {
            return;
        };
        // Logging never fails an operation
        let _ = match outcome {
            Ok(_) => logger.log_operation(operation, self.kind.as_str()),
            Err(e) => {
                logger.log_operation_error(operation, self.kind.as_str(), e.code(), &e.to_string())
            }
        };
    }
}

/// The user summary attached to partner-facing bookkeeping calls
fn user_summary(profile: &Profile) -> JsonValue {
    json!({
        "icon_uri": profile.icon_uri,
        "first": profile.first,
        "last": profile.last,
    })
}

fn as_attrs(value: JsonValue) -> Result<Attributes> {
    match value {
        JsonValue::Object(map) => Ok(map),
        _ => Err(Error::Other("expected a JSON object".into())),
    }
}
