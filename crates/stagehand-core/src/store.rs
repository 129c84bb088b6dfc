//! Store traits: the service layer every backend implements.
//!
//! The traits are split by area so tests and tools can depend on the slice
//! they use; [`PlatformStore`] bundles them for the HTTP layer. Permission
//! checks that depend on the caller live above this layer; the store enforces
//! data invariants (uniqueness, capacity, status transitions).
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Classify,
  account::{Account, AccountPatch, NewAccount},
  booking::{Booking, BookingQuery, BookingStatus, NewBooking},
  event::{Event, EventPatch, EventQuery, NewEvent},
  feed::{FeedQuery, NewPost, NewScheduledPost, Post, ScheduledPost},
  measure::ComplianceRule,
  message::{InboxEntry, Message, NewMessage},
  profile::{NewProfile, Profile, Session},
  site_map::{Measurement, NewComplianceRule, NewMeasurement, NewSiteMap, SiteMap},
  ticket::{NewTicketTier, TicketOrder, TicketTier},
  travel::{NewTravelGroup, NewTravelLeg, TravelGroup, TravelLeg},
};

/// The shared error type of a backend.
pub trait Store: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;
}

// ─── Profiles & sessions ─────────────────────────────────────────────────────

pub trait ProfileStore: Store {
  /// Create a profile together with its personal account, which becomes the
  /// active account. Fails with a conflict if the email is taken.
  fn register(
    &self,
    input: NewProfile,
  ) -> impl Future<Output = Result<(Profile, Account), Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Look up a profile and its password hash by (normalised) email.
  fn credentials(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<(Profile, String)>, Self::Error>> + Send + '_;

  fn create_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve an unexpired session to its profile.
  fn session_profile(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Returns `false` if no such session existed.
  fn delete_session(
    &self,
    token_hash: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove every session that expired before `now`; returns how many.
  fn purge_expired_sessions(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── Accounts ────────────────────────────────────────────────────────────────

pub trait AccountStore: Store {
  fn create_account(
    &self,
    input: NewAccount,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  /// All accounts owned by a profile, oldest first.
  fn list_accounts(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Account>, Self::Error>> + Send + '_;

  fn update_account(
    &self,
    account_id: Uuid,
    patch: AccountPatch,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Make `account_id` the profile's active account. The account must be
  /// owned by the profile.
  fn switch_account(
    &self,
    profile_id: Uuid,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;
}

// ─── Events & ticketing ──────────────────────────────────────────────────────

pub trait EventStore: Store {
  fn create_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn get_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Events ordered by start time. With a `viewer_id`, other organizers'
  /// drafts are filtered out before paging.
  fn list_events(
    &self,
    query: EventQuery,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Capacity may not drop below the tickets already allocated to tiers.
  fn update_event(
    &self,
    event_id: Uuid,
    patch: EventPatch,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn cancel_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Tier quantities of an event may not sum past its capacity.
  fn add_ticket_tier(
    &self,
    input: NewTicketTier,
  ) -> impl Future<Output = Result<TicketTier, Self::Error>> + Send + '_;

  fn get_ticket_tier(
    &self,
    tier_id: Uuid,
  ) -> impl Future<Output = Result<Option<TicketTier>, Self::Error>> + Send + '_;

  fn list_ticket_tiers(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TicketTier>, Self::Error>> + Send + '_;

  /// Atomically reserve `quantity` tickets. Fails with a conflict when the
  /// tier would oversell or the event is not published.
  fn purchase_tickets(
    &self,
    tier_id: Uuid,
    buyer_id: Uuid,
    quantity: u32,
  ) -> impl Future<Output = Result<TicketOrder, Self::Error>> + Send + '_;

  fn list_orders(
    &self,
    buyer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TicketOrder>, Self::Error>> + Send + '_;
}

// ─── Bookings ────────────────────────────────────────────────────────────────

pub trait BookingStore: Store {
  /// Fails with a conflict if an open booking already exists for the same
  /// event and artist.
  fn request_booking(
    &self,
    input: NewBooking,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;

  fn get_booking(
    &self,
    booking_id: Uuid,
  ) -> impl Future<Output = Result<Option<Booking>, Self::Error>> + Send + '_;

  fn list_bookings(
    &self,
    query: BookingQuery,
  ) -> impl Future<Output = Result<Vec<Booking>, Self::Error>> + Send + '_;

  /// Move a booking to `status`, rejecting illegal transitions.
  fn set_booking_status(
    &self,
    booking_id: Uuid,
    status: BookingStatus,
  ) -> impl Future<Output = Result<Booking, Self::Error>> + Send + '_;
}

// ─── Site maps ───────────────────────────────────────────────────────────────

pub trait SiteMapStore: Store {
  fn create_site_map(
    &self,
    input: NewSiteMap,
  ) -> impl Future<Output = Result<SiteMap, Self::Error>> + Send + '_;

  fn get_site_map(
    &self,
    site_map_id: Uuid,
  ) -> impl Future<Output = Result<Option<SiteMap>, Self::Error>> + Send + '_;

  fn list_site_maps(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SiteMap>, Self::Error>> + Send + '_;

  /// Record a measurement; its value is computed from the points.
  fn add_measurement(
    &self,
    input: NewMeasurement,
  ) -> impl Future<Output = Result<Measurement, Self::Error>> + Send + '_;

  fn get_measurement(
    &self,
    measurement_id: Uuid,
  ) -> impl Future<Output = Result<Option<Measurement>, Self::Error>> + Send + '_;

  fn list_measurements(
    &self,
    site_map_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Measurement>, Self::Error>> + Send + '_;

  fn delete_measurement(
    &self,
    measurement_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn add_rule(
    &self,
    input: NewComplianceRule,
  ) -> impl Future<Output = Result<ComplianceRule, Self::Error>> + Send + '_;

  fn list_rules(
    &self,
    site_map_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ComplianceRule>, Self::Error>> + Send + '_;
}

// ─── Feed ────────────────────────────────────────────────────────────────────

pub trait FeedStore: Store {
  fn create_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  fn get_post(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<Option<Post>, Self::Error>> + Send + '_;

  /// Newest first, honouring the query's cursor and limit.
  fn list_posts(
    &self,
    query: FeedQuery,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  fn delete_post(
    &self,
    post_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn schedule_post(
    &self,
    input: NewScheduledPost,
  ) -> impl Future<Output = Result<ScheduledPost, Self::Error>> + Send + '_;

  fn get_scheduled_post(
    &self,
    scheduled_post_id: Uuid,
  ) -> impl Future<Output = Result<Option<ScheduledPost>, Self::Error>> + Send + '_;

  fn list_scheduled_posts(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ScheduledPost>, Self::Error>> + Send + '_;

  /// Only posts still in `Scheduled` status can be cancelled.
  fn cancel_scheduled_post(
    &self,
    scheduled_post_id: Uuid,
  ) -> impl Future<Output = Result<ScheduledPost, Self::Error>> + Send + '_;

  /// Publish every scheduled post due at or before `now` into the feed.
  fn publish_due(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<ScheduledPost>, Self::Error>> + Send + '_;
}

// ─── Messaging ───────────────────────────────────────────────────────────────

pub trait MessageStore: Store {
  fn send_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  fn get_message(
    &self,
    message_id: Uuid,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + '_;

  /// Messages between two accounts, oldest first.
  fn conversation(
    &self,
    account_id: Uuid,
    other_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + '_;

  /// Latest message per counterpart, most recent conversation first.
  fn inbox(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Vec<InboxEntry>, Self::Error>> + Send + '_;

  /// Idempotent: an already-read message keeps its original `read_at`.
  fn mark_read(
    &self,
    message_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;
}

// ─── Travel ──────────────────────────────────────────────────────────────────

pub trait TravelStore: Store {
  /// Create a group; the creator becomes its first member.
  fn create_travel_group(
    &self,
    input: NewTravelGroup,
  ) -> impl Future<Output = Result<TravelGroup, Self::Error>> + Send + '_;

  fn get_travel_group(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Option<TravelGroup>, Self::Error>> + Send + '_;

  /// Returns `false` if the account was already a member.
  fn join_travel_group(
    &self,
    group_id: Uuid,
    account_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the account was not a member.
  fn leave_travel_group(
    &self,
    group_id: Uuid,
    account_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn is_travel_member(
    &self,
    group_id: Uuid,
    account_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn add_travel_leg(
    &self,
    input: NewTravelLeg,
  ) -> impl Future<Output = Result<TravelLeg, Self::Error>> + Send + '_;

  /// A group's legs ordered by departure.
  fn list_travel_legs(
    &self,
    group_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TravelLeg>, Self::Error>> + Send + '_;

  fn travel_groups_for(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Vec<TravelGroup>, Self::Error>> + Send + '_;

  /// Legs departing at or after `now` in any of the account's groups.
  fn upcoming_legs_for(
    &self,
    account_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<TravelLeg>, Self::Error>> + Send + '_;

  /// `(group_id, member_count)` for each of the account's groups.
  fn member_counts_for(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Vec<(Uuid, u32)>, Self::Error>> + Send + '_;
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// Every store capability the HTTP layer needs.
pub trait PlatformStore:
  ProfileStore
  + AccountStore
  + EventStore
  + BookingStore
  + SiteMapStore
  + FeedStore
  + MessageStore
  + TravelStore
{
}

impl<T> PlatformStore for T where
  T: ProfileStore
    + AccountStore
    + EventStore
    + BookingStore
    + SiteMapStore
    + FeedStore
    + MessageStore
    + TravelStore
{
}
