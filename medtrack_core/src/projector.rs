//! Stock projector: time decay and restock forecasting.
//!
//! Projection is a pure function of one record and one calendar date:
//! - Elapsed whole days since the last observation are clamped at zero
//! - Stock and remaining course length decay by the daily dose count
//! - Restock quantity is the shortfall against the decayed course
//!
//! Persisting the decay is a separate, explicit step (`DecayUpdate::apply`)
//! so that viewing the inventory twice on the same day never decays twice.

use crate::dates::days_elapsed;
use crate::{DecayUpdate, MedicineRecord, Projection};
use chrono::{Local, NaiveDate};

/// Fewer projected days of supply than this raises the low-stock flag
pub const LOW_STOCK_DAYS: u32 = 3;

/// Source of "today" for the host
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Project a record's inventory state onto `today`
///
/// Note that `doses_to_buy` is measured against the *decayed* course length,
/// so the purchase quantity shrinks as the course nears its end.
pub fn project(record: &MedicineRecord, today: NaiveDate) -> Projection {
    let doses_per_day = record.schedule.doses_per_day();
    let elapsed = days_elapsed(record.last_updated, today);

    let adjusted_intended_days = record.intended_duration_days.saturating_sub(elapsed);
    let consumed = doses_per_day.saturating_mul(elapsed);
    let adjusted_doses_left = record.doses_left.saturating_sub(consumed);

    let days_remaining = if doses_per_day > 0 {
        adjusted_doses_left / doses_per_day
    } else {
        0
    };

    // No schedule means no demand, so nothing to buy.
    let doses_to_buy = adjusted_intended_days
        .saturating_mul(doses_per_day)
        .saturating_sub(adjusted_doses_left);

    let price_per_day = record
        .price_per_dose
        .map(|price| f64::from(doses_per_day) * price)
        .unwrap_or(0.0);

    Projection {
        id: record.id,
        generic_name: record.generic_name.clone(),
        brand_name: record.brand_name.clone(),
        schedule: record.schedule,
        notes: record.notes.clone(),
        price_per_dose: record.price_per_dose,
        last_updated: record.last_updated,
        today,
        doses_per_day,
        days_elapsed: elapsed,
        adjusted_intended_days,
        adjusted_doses_left,
        days_remaining,
        doses_to_buy,
        price_per_day,
        low_stock: days_remaining < LOW_STOCK_DAYS,
    }
}

impl Projection {
    /// The record revision this projection implies, if any time has passed
    pub fn decay(&self) -> Option<DecayUpdate> {
        (self.days_elapsed > 0).then(|| DecayUpdate {
            intended_duration_days: self.adjusted_intended_days,
            doses_left: self.adjusted_doses_left,
            last_updated: self.today,
            observed: self.last_updated,
        })
    }

    /// Cost of buying `doses_to_buy`; zero when the price is unknown
    pub fn restock_cost(&self) -> f64 {
        match self.price_per_dose {
            Some(price) if self.doses_to_buy > 0 => f64::from(self.doses_to_buy) * price,
            _ => 0.0,
        }
    }
}

/// Project and return only the proposed decay
pub fn propose_decay(record: &MedicineRecord, today: NaiveDate) -> Option<DecayUpdate> {
    project(record, today).decay()
}

impl DecayUpdate {
    /// Fold the decay into `record`
    ///
    /// Applies only if the record is still in the state the decay was
    /// computed from; otherwise the record changed in between (or the decay
    /// is older than the record) and it is left untouched. Returns whether
    /// the record was modified.
    pub fn apply(&self, record: &mut MedicineRecord) -> bool {
        if record.last_updated != self.observed {
            tracing::warn!(
                "Ignoring stale decay for {} (record at {:?}, decay computed from {:?})",
                record.generic_name,
                record.last_updated,
                self.observed
            );
            return false;
        }
        record.intended_duration_days = self.intended_duration_days;
        record.doses_left = self.doses_left;
        record.last_updated = Some(self.last_updated);
        true
    }
}

/// Total cost of every shortfall with a known price
pub fn total_restock_cost(projections: &[Projection]) -> f64 {
    projections.iter().map(Projection::restock_cost).sum()
}
