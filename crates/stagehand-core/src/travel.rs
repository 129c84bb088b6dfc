//! Travel coordination: groups of accounts travelling to an event together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelGroup {
  pub group_id:   Uuid,
  pub event_id:   Uuid,
  pub name:       String,
  pub created_by: Uuid,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTravelGroup {
  pub event_id:   Uuid,
  pub name:       String,
  pub created_by: Uuid,
}

impl NewTravelGroup {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::invalid("group name must not be empty"));
    }
    Ok(())
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LegKind {
  Flight,
  Lodging,
  Ground,
}

/// A piece of a group's itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelLeg {
  pub leg_id:      Uuid,
  pub group_id:    Uuid,
  pub kind:        LegKind,
  pub description: String,
  pub departs_at:  DateTime<Utc>,
  pub arrives_at:  Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTravelLeg {
  pub group_id:    Uuid,
  pub kind:        LegKind,
  pub description: String,
  pub departs_at:  DateTime<Utc>,
  pub arrives_at:  Option<DateTime<Utc>>,
}

impl NewTravelLeg {
  pub fn validate(&self) -> Result<()> {
    if self.description.trim().is_empty() {
      return Err(Error::invalid("leg description must not be empty"));
    }
    if self.arrives_at.is_some_and(|arrival| arrival < self.departs_at) {
      return Err(Error::invalid("a leg cannot arrive before it departs"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
  pub group:        TravelGroup,
  pub member_count: u32,
}

/// Everything an account needs to see about its travel at a glance.
///
/// Sections that failed to load are empty and explained in `warnings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelDashboard {
  pub account_id:    Uuid,
  pub generated_at:  DateTime<Utc>,
  pub groups:        Vec<GroupSummary>,
  pub upcoming_legs: Vec<TravelLeg>,
  pub warnings:      Vec<String>,
}
