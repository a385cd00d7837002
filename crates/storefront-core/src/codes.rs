//! # Ticket Codes
//!
//! Ticket codes are external reference numbers (printed on confirmations,
//! quoted to support), so they must be unique without coordination and
//! readable enough to dictate over the phone.
//!
//! ## Format
//! `YYYYMMDD-XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX`
//! - `YYYYMMDD`: UTC issue date, so codes sort roughly by day
//! - 32 uppercase hex digits: a random UUID v4 (122 bits of entropy)
//!
//! Uniqueness is still checked by the Ticket Ledger on insert.

use chrono::Utc;
use uuid::Uuid;

/// Source of fresh ticket codes.
///
/// Each call must return a new candidate; the checkout engine calls it
/// again when the ledger reports a collision.
pub trait TicketCodeGenerator: Send + Sync {
    fn next_code(&self) -> String;
}

/// Default generator: UTC date prefix + random UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatedUuidCodes;

impl TicketCodeGenerator for DatedUuidCodes {
    fn next_code(&self) -> String {
        let date_part = Utc::now().format("%Y%m%d");
        let random_part = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("{}-{}", date_part, random_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_code_format() {
        let code = DatedUuidCodes.next_code();
        let (date, random) = code.split_once('-').unwrap();

        assert_eq!(date.len(), 8);
        assert!(date.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(random.len(), 32);
        assert!(random.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_codes_do_not_repeat() {
        let codes: HashSet<String> = (0..1000).map(|_| DatedUuidCodes.next_code()).collect();
        assert_eq!(codes.len(), 1000);
    }
}
