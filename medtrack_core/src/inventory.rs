//! Inventory service: the boundary between a host and the core.
//!
//! Wires a `MedicineStore` and a `Clock` together. Every read of the
//! inventory goes through the projector, and `refresh` folds elapsed-time
//! decay back into the store exactly once per observation.

use crate::projector::{self, Clock};
use crate::store::MedicineStore;
use crate::{Error, MedicineRecord, MedicineUpdate, NewMedicine, Projection, Result};

/// A medicine inventory backed by `S` and dated by `C`
pub struct Inventory<S, C> {
    store: S,
    clock: C,
}

impl<S: MedicineStore, C: Clock> Inventory<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// The date projections are made for
    pub fn today(&self) -> chrono::NaiveDate {
        self.clock.today()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Add a new medicine, observed today
    pub fn add(&mut self, medicine: NewMedicine) -> Result<MedicineRecord> {
        let today = self.clock.today();
        self.store.insert(medicine, today)
    }

    pub fn get_by_name(&self, generic_name: &str) -> Result<MedicineRecord> {
        self.store
            .find_by_name(generic_name)?
            .ok_or_else(|| Error::NotFound(generic_name.trim().to_string()))
    }

    /// Update a medicine by generic name
    ///
    /// The store folds pending decay in with the same write, so editing one
    /// field does not discard the consumption since the last observation.
    /// A rejected update leaves the record exactly as it was.
    pub fn update(&mut self, generic_name: &str, update: MedicineUpdate) -> Result<MedicineRecord> {
        let today = self.clock.today();
        let record = self.get_by_name(generic_name)?;
        self.store.update(record.id, update, today)
    }

    pub fn delete(&mut self, generic_name: &str) -> Result<MedicineRecord> {
        self.store.delete_by_name(generic_name)
    }

    /// Project every medicine onto today without writing anything
    pub fn preview(&self) -> Result<Vec<Projection>> {
        let today = self.clock.today();
        Ok(self
            .store
            .list()?
            .iter()
            .map(|record| projector::project(record, today))
            .collect())
    }

    /// Project every medicine onto today and commit the decay
    ///
    /// Calling this twice on the same day yields the same projections and
    /// writes nothing the second time.
    pub fn refresh(&mut self) -> Result<Vec<Projection>> {
        let projections = self.preview()?;

        let mut committed = 0;
        for projection in &projections {
            if let Some(decay) = projection.decay() {
                if self.store.apply_decay(projection.id, &decay)? {
                    committed += 1;
                    tracing::info!(
                        "{}: {} day(s) elapsed, {} doses left",
                        projection.generic_name,
                        projection.days_elapsed,
                        projection.adjusted_doses_left
                    );
                }
            }
        }

        for projection in projections.iter().filter(|p| p.low_stock) {
            tracing::info!(
                "Low stock: {} has {} day(s) of supply left",
                projection.generic_name,
                projection.days_remaining
            );
        }

        tracing::debug!(
            "Refreshed {} medicines, committed {} decays",
            projections.len(),
            committed
        );
        Ok(projections)
    }

    /// Sum of restock costs for every priced shortfall, as of today
    pub fn total_restock_cost(&self) -> Result<f64> {
        Ok(projector::total_restock_cost(&self.preview()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::FixedClock;
    use crate::store::MemoryStore;
    use crate::{FieldUpdate, Schedule};
    use chrono::NaiveDate;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() + chrono::Duration::days(n)
    }

    fn inventory_on(n: i64, store: MemoryStore) -> Inventory<MemoryStore, FixedClock> {
        Inventory::new(store, FixedClock(day(n)))
    }

    fn medicine(name: &str, schedule: Schedule, doses: u32, days: u32, price: Option<f64>) -> NewMedicine {
        NewMedicine {
            generic_name: name.into(),
            schedule,
            intended_duration_days: days,
            doses_left: doses,
            price_per_dose: price,
            ..Default::default()
        }
    }

    #[test]
    fn test_refresh_commits_decay_once() {
        crate::logging::init_test();
        let mut inv = inventory_on(0, MemoryStore::new());
        inv.add(medicine("Amoxicillin", Schedule::new(true, false, true), 20, 30, Some(5.0)))
            .unwrap();

        let mut inv = inventory_on(5, inv.into_store());
        let first = inv.refresh().unwrap();
        assert_eq!(first[0].adjusted_doses_left, 10);
        assert_eq!(first[0].doses_to_buy, 40);

        let stored = inv.get_by_name("Amoxicillin").unwrap();
        assert_eq!(stored.doses_left, 10);
        assert_eq!(stored.intended_duration_days, 25);
        assert_eq!(stored.last_updated, Some(day(5)));

        let second = inv.refresh().unwrap();
        assert_eq!(second[0].days_elapsed, 0);
        assert_eq!(second[0].adjusted_doses_left, first[0].adjusted_doses_left);
        assert_eq!(second[0].doses_to_buy, first[0].doses_to_buy);
    }

    #[test]
    fn test_preview_does_not_write() {
        let mut inv = inventory_on(0, MemoryStore::new());
        inv.add(medicine("Amoxicillin", Schedule::new(true, false, false), 20, 30, None))
            .unwrap();

        let inv = inventory_on(4, inv.into_store());
        let projections = inv.preview().unwrap();
        assert_eq!(projections[0].adjusted_doses_left, 16);
        assert_eq!(inv.get_by_name("Amoxicillin").unwrap().doses_left, 20);
    }

    #[test]
    fn test_update_commits_pending_decay_first() {
        let mut inv = inventory_on(0, MemoryStore::new());
        inv.add(medicine("Amoxicillin", Schedule::new(true, false, true), 20, 30, None))
            .unwrap();

        let mut inv = inventory_on(3, inv.into_store());
        let update = MedicineUpdate {
            notes: FieldUpdate::Set(Some("take with water".into())),
            ..Default::default()
        };
        let updated = inv.update("Amoxicillin", update).unwrap();

        assert_eq!(updated.doses_left, 14);
        assert_eq!(updated.intended_duration_days, 27);
        assert_eq!(updated.last_updated, Some(day(3)));
        assert_eq!(updated.notes.as_deref(), Some("take with water"));
    }

    #[test]
    fn test_rejected_update_commits_nothing() {
        let mut inv = inventory_on(0, MemoryStore::new());
        inv.add(medicine("A", Schedule::new(true, false, true), 20, 30, None))
            .unwrap();
        inv.add(NewMedicine::new("B")).unwrap();

        let mut inv = inventory_on(5, inv.into_store());
        let rename = MedicineUpdate {
            generic_name: FieldUpdate::Set("B".into()),
            ..Default::default()
        };
        assert!(matches!(
            inv.update("A", rename),
            Err(Error::DuplicateKey { .. })
        ));

        let negative_price = MedicineUpdate {
            price_per_dose: FieldUpdate::Set(Some(-1.0)),
            ..Default::default()
        };
        assert!(matches!(
            inv.update("A", negative_price),
            Err(Error::InvalidInput(_))
        ));

        let blank_name = MedicineUpdate {
            generic_name: FieldUpdate::Set("   ".into()),
            ..Default::default()
        };
        assert!(matches!(
            inv.update("A", blank_name),
            Err(Error::InvalidInput(_))
        ));

        let stored = inv.get_by_name("A").unwrap();
        assert_eq!(stored.doses_left, 20);
        assert_eq!(stored.intended_duration_days, 30);
        assert_eq!(stored.last_updated, Some(day(0)));
    }

    #[test]
    fn test_update_sets_stock_as_of_today() {
        let mut inv = inventory_on(0, MemoryStore::new());
        inv.add(medicine("Amoxicillin", Schedule::new(true, false, true), 20, 30, None))
            .unwrap();

        let mut inv = inventory_on(3, inv.into_store());
        let refill = MedicineUpdate {
            doses_left: FieldUpdate::Set(60),
            ..Default::default()
        };
        inv.update("Amoxicillin", refill).unwrap();

        let projections = inv.refresh().unwrap();
        assert_eq!(projections[0].adjusted_doses_left, 60);
        assert_eq!(projections[0].days_remaining, 30);
    }

    #[test]
    fn test_missing_records_report_not_found() {
        let mut inv = inventory_on(0, MemoryStore::new());
        assert!(matches!(
            inv.update("Nothing", MedicineUpdate::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(inv.delete("Nothing"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_total_restock_cost() {
        let mut inv = inventory_on(0, MemoryStore::new());
        // 1/day for 10 days, 4 on hand: 6 to buy at 2.5
        inv.add(medicine("Losartan", Schedule::new(true, false, false), 4, 10, Some(2.5)))
            .unwrap();
        // No price: contributes nothing
        inv.add(medicine("Vitamin C", Schedule::new(true, false, false), 0, 10, None))
            .unwrap();
        // Fully stocked
        inv.add(medicine("Metformin", Schedule::new(true, false, true), 40, 10, Some(7.0)))
            .unwrap();

        assert_eq!(inv.total_restock_cost().unwrap(), 15.0);
    }

    #[test]
    fn test_duplicate_add_leaves_inventory_unchanged() {
        let mut inv = inventory_on(0, MemoryStore::new());
        inv.add(NewMedicine::new("Losartan")).unwrap();
        assert!(matches!(
            inv.add(NewMedicine::new("Losartan")),
            Err(Error::DuplicateKey { .. })
        ));
        assert_eq!(inv.preview().unwrap().len(), 1);
    }
}
