//! Users, as seen from the ride lifecycle.
//!
//! Drivers and voters are both users. Account records live elsewhere; the
//! core only needs identity, a display name and a phone number.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:      Uuid,
  pub name:         String,
  pub phone_number: Option<String>,
}

impl User {
  /// The phone number reduced to digits, with a `1` country code prefixed to
  /// bare ten-digit numbers. `None` if there are no digits at all.
  pub fn phone_number_normalized(&self) -> Option<String> {
    let digits: String = self
      .phone_number
      .as_deref()?
      .chars()
      .filter(char::is_ascii_digit)
      .collect();
    match digits.len() {
      0 => None,
      10 => Some(format!("1{digits}")),
      _ => Some(digits),
    }
  }
}
