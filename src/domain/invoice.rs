//! Invoice Sequencer
//!
//! Invoice numbers have the form `INV<DDMMYYYY>-<NNNN>`, where `NNNN` is the
//! account's order count since local midnight plus one. The count is only a
//! hint: the store's unique index on invoice numbers has the final word.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, Utc};

use crate::store::{AtomicUnit, StoreError};

/// Computes per-account, per-day invoice numbers in a fixed reference timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceSequencer {
    offset: FixedOffset,
}

impl InvoiceSequencer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Midnight of `now`'s calendar day in the reference timezone, as UTC
    pub fn day_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_midnight = now
            .with_timezone(&self.offset)
            .date_naive()
            .and_time(NaiveTime::MIN);
        let utc_midnight = local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc_midnight, Utc)
    }

    /// Render an invoice number for the day of `now` and a 1-based sequence
    pub fn format(&self, now: DateTime<Utc>, sequence: i64) -> String {
        format!(
            "INV{}-{:04}",
            now.with_timezone(&self.offset).format("%d%m%Y"),
            sequence
        )
    }

    /// Next invoice number for `account_id`, read inside the caller's atomic unit
    pub async fn next_invoice(
        &self,
        unit: &mut dyn AtomicUnit,
        account_id: i64,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let count = unit
            .count_orders_since(account_id, self.day_start(now))
            .await?;
        Ok(self.format(now, count + 1))
    }
}

impl Default for InvoiceSequencer {
    fn default() -> Self {
        Self::utc()
    }
}

/// Parse a UTC offset such as `+07:00`, `-0530`, `Z` or `UTC`
pub fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = if let Some(rest) = value.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = value.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
