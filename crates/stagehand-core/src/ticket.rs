//! Ticket tiers and orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Largest quantity a single order may request.
pub const MAX_ORDER_QUANTITY: u32 = 20;

/// Highest price a tier may carry, in cents.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTier {
  pub tier_id:     Uuid,
  pub event_id:    Uuid,
  pub name:        String,
  pub price_cents: i64,
  /// Total tickets available in this tier.
  pub quantity:    u32,
  /// Tickets sold so far; never exceeds `quantity`.
  pub sold:        u32,
  pub created_at:  DateTime<Utc>,
}

impl TicketTier {
  pub fn remaining(&self) -> u32 { self.quantity.saturating_sub(self.sold) }
}

#[derive(Debug, Clone)]
pub struct NewTicketTier {
  pub event_id:    Uuid,
  pub name:        String,
  pub price_cents: i64,
  pub quantity:    u32,
}

impl NewTicketTier {
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::invalid("tier name must not be empty"));
    }
    if self.price_cents < 0 {
      return Err(Error::invalid("price must not be negative"));
    }
    if self.price_cents > MAX_PRICE_CENTS {
      return Err(Error::invalid(format!(
        "price must not exceed {MAX_PRICE_CENTS} cents"
      )));
    }
    if self.quantity == 0 {
      return Err(Error::invalid("tier quantity must be positive"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketOrder {
  pub order_id:    Uuid,
  pub tier_id:     Uuid,
  pub event_id:    Uuid,
  pub buyer_id:    Uuid,
  pub quantity:    u32,
  pub total_cents: i64,
  pub created_at:  DateTime<Utc>,
}

pub fn check_order_quantity(quantity: u32) -> Result<()> {
  if quantity == 0 || quantity > MAX_ORDER_QUANTITY {
    return Err(Error::invalid(format!(
      "order quantity must be between 1 and {MAX_ORDER_QUANTITY}"
    )));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tier(price_cents: i64) -> NewTicketTier {
    NewTicketTier { event_id: Uuid::nil(), name: "General".into(), price_cents, quantity: 10 }
  }

  #[test]
  fn price_bounds() {
    assert!(tier(0).validate().is_ok());
    assert!(tier(MAX_PRICE_CENTS).validate().is_ok());
    assert!(matches!(tier(-1).validate(), Err(Error::Invalid(_))));
    assert!(matches!(tier(MAX_PRICE_CENTS + 1).validate(), Err(Error::Invalid(_))));
    assert!(matches!(tier(i64::MAX).validate(), Err(Error::Invalid(_))));
  }

  #[test]
  fn order_quantity_bounds() {
    assert!(check_order_quantity(1).is_ok());
    assert!(check_order_quantity(MAX_ORDER_QUANTITY).is_ok());
    assert!(check_order_quantity(0).is_err());
    assert!(check_order_quantity(MAX_ORDER_QUANTITY + 1).is_err());
  }
}
