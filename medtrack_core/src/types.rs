//! Core domain types for the medicine inventory.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medicine records and their dosing schedule
//! - Add and partial-update requests
//! - Projections and the decay they propose

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identity
// ============================================================================

/// Opaque unique identity of a medicine record
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedicineId(pub Uuid);

impl MedicineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MedicineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MedicineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ============================================================================
// Schedule
// ============================================================================

/// Daily dosing slots
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub morning: bool,
    #[serde(default)]
    pub midday: bool,
    #[serde(default)]
    pub evening: bool,
}

impl Schedule {
    pub fn new(morning: bool, midday: bool, evening: bool) -> Self {
        Self {
            morning,
            midday,
            evening,
        }
    }

    /// Number of enabled slots (0..=3)
    pub fn doses_per_day(&self) -> u32 {
        [self.morning, self.midday, self.evening]
            .iter()
            .filter(|slot| **slot)
            .count() as u32
    }

    /// Slot labels for display, e.g. "8AM 8PM"
    pub fn label(&self) -> String {
        [
            (self.morning, "8AM"),
            (self.midday, "1PM"),
            (self.evening, "8PM"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, label)| *label)
        .collect::<Vec<_>>()
        .join(" ")
    }
}

// ============================================================================
// Medicine Record
// ============================================================================

/// A medicine as persisted by the store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MedicineRecord {
    pub id: MedicineId,
    pub generic_name: String,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub schedule: Schedule,
    /// Prescribed course length in days, as of `last_updated`
    #[serde(default)]
    pub intended_duration_days: u32,
    /// Doses on hand, as of `last_updated`
    #[serde(default)]
    pub doses_left: u32,
    #[serde(default)]
    pub price_per_dose: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    /// `None` when the stored date was missing or unreadable
    #[serde(default, deserialize_with = "crate::dates::deserialize_lenient")]
    pub last_updated: Option<NaiveDate>,
}

/// Fields supplied when adding a medicine
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NewMedicine {
    pub generic_name: String,
    pub brand_name: Option<String>,
    pub schedule: Schedule,
    pub intended_duration_days: u32,
    pub doses_left: u32,
    pub price_per_dose: Option<f64>,
    pub notes: Option<String>,
}

impl NewMedicine {
    pub fn new(generic_name: impl Into<String>) -> Self {
        Self {
            generic_name: generic_name.into(),
            ..Self::default()
        }
    }

    /// Validate and turn into a record observed on `today`
    pub fn into_record(self, today: NaiveDate) -> crate::Result<MedicineRecord> {
        let generic_name = normalize_name(&self.generic_name)?;
        validate_price(self.price_per_dose)?;

        Ok(MedicineRecord {
            id: MedicineId::new(),
            generic_name,
            brand_name: non_blank(self.brand_name),
            schedule: self.schedule,
            intended_duration_days: self.intended_duration_days,
            doses_left: self.doses_left,
            price_per_dose: self.price_per_dose,
            notes: non_blank(self.notes),
            last_updated: Some(today),
        })
    }
}

// ============================================================================
// Partial Update
// ============================================================================

/// Explicit "leave alone" vs "set to this value" marker
///
/// Clearing an optional field is `Set(None)`, which is distinct from `Unset`.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldUpdate<T> {
    #[default]
    Unset,
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, FieldUpdate::Set(_))
    }

    /// Overwrite `target` if a value was provided
    pub fn apply_to(self, target: &mut T) {
        if let FieldUpdate::Set(value) = self {
            *target = value;
        }
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => FieldUpdate::Set(v),
            None => FieldUpdate::Unset,
        }
    }
}

/// A partial update to a medicine record
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MedicineUpdate {
    pub generic_name: FieldUpdate<String>,
    pub brand_name: FieldUpdate<Option<String>>,
    pub morning: FieldUpdate<bool>,
    pub midday: FieldUpdate<bool>,
    pub evening: FieldUpdate<bool>,
    pub intended_duration_days: FieldUpdate<u32>,
    pub doses_left: FieldUpdate<u32>,
    pub price_per_dose: FieldUpdate<Option<f64>>,
    pub notes: FieldUpdate<Option<String>>,
}

impl MedicineUpdate {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        !(self.generic_name.is_set()
            || self.brand_name.is_set()
            || self.morning.is_set()
            || self.midday.is_set()
            || self.evening.is_set()
            || self.intended_duration_days.is_set()
            || self.doses_left.is_set()
            || self.price_per_dose.is_set()
            || self.notes.is_set())
    }

    /// Validated replacement name, if the update renames the record
    pub fn new_name(&self) -> crate::Result<Option<String>> {
        match &self.generic_name {
            FieldUpdate::Set(name) => normalize_name(name).map(Some),
            FieldUpdate::Unset => Ok(None),
        }
    }

    /// Apply every set field to `record`
    ///
    /// Does not touch `id` or `last_updated`; stamping is the store's job.
    pub fn apply(self, record: &mut MedicineRecord) -> crate::Result<()> {
        let new_name = self.new_name()?;
        if let FieldUpdate::Set(price) = &self.price_per_dose {
            validate_price(*price)?;
        }

        if let Some(name) = new_name {
            record.generic_name = name;
        }
        if let FieldUpdate::Set(brand) = self.brand_name {
            record.brand_name = non_blank(brand);
        }
        self.morning.apply_to(&mut record.schedule.morning);
        self.midday.apply_to(&mut record.schedule.midday);
        self.evening.apply_to(&mut record.schedule.evening);
        self.intended_duration_days
            .apply_to(&mut record.intended_duration_days);
        self.doses_left.apply_to(&mut record.doses_left);
        self.price_per_dose.apply_to(&mut record.price_per_dose);
        if let FieldUpdate::Set(notes) = self.notes {
            record.notes = non_blank(notes);
        }
        Ok(())
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Time-decayed inventory snapshot of one medicine
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Projection {
    pub id: MedicineId,
    pub generic_name: String,
    pub brand_name: Option<String>,
    pub schedule: Schedule,
    pub notes: Option<String>,
    pub price_per_dose: Option<f64>,
    pub last_updated: Option<NaiveDate>,
    pub today: NaiveDate,
    pub doses_per_day: u32,
    pub days_elapsed: u32,
    pub adjusted_intended_days: u32,
    pub adjusted_doses_left: u32,
    pub days_remaining: u32,
    pub doses_to_buy: u32,
    pub price_per_day: f64,
    pub low_stock: bool,
}

/// Record revision proposed by a projection when time has passed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecayUpdate {
    pub intended_duration_days: u32,
    pub doses_left: u32,
    pub last_updated: NaiveDate,
    /// `last_updated` of the record the decay was computed from
    pub observed: Option<NaiveDate>,
}

// ============================================================================
// Validation helpers
// ============================================================================

fn normalize_name(name: &str) -> crate::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::InvalidInput(
            "generic name is required".into(),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_price(price: Option<f64>) -> crate::Result<()> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => Err(crate::Error::InvalidInput(format!(
            "price per dose must be a non-negative number, got {}",
            p
        ))),
        _ => Ok(()),
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
