//! Extras selection with sequenced charge recalculation.
//!
//! Each change to the selection issues a new sequence number. A quote returned by the PMS
//! is applied only if it carries the latest issued number, so a slow response for an older
//! selection can never overwrite the charge for a newer one.

use arboreal_core::pms::{CalculateExtrasRequest, ExtraChargeLine};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedExtra {
    pub extra_id: String,
    pub quantity: u32,
}

/// Work handed to the background recalculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalcTicket {
    pub seq: u64,
    pub extra_ids: String,
    pub quantities: String,
}

impl RecalcTicket {
    pub fn request(&self, check_in: NaiveDate, check_out: NaiveDate) -> CalculateExtrasRequest {
        CalculateExtrasRequest {
            check_in_date: check_in,
            check_out_date: check_out,
            extra_charge_id: self.extra_ids.clone(),
            total_extra_item: self.quantities.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recalculation {
    /// The selection became empty; the charge is already zero.
    Cleared,
    /// A PMS quote is needed for this ticket.
    Pending(RecalcTicket),
    /// Nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtrasSelection {
    pub selected: Vec<SelectedExtra>,
    pub charge: Decimal,
    pub issued_seq: u64,
    pub applied_seq: u64,
}

impl ExtrasSelection {
    pub fn quantity_of(&self, extra_id: &str) -> Option<u32> {
        self.selected
            .iter()
            .find(|s| s.extra_id == extra_id)
            .map(|s| s.quantity)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// A quote is outstanding for the current selection.
    pub fn is_calculating(&self) -> bool {
        self.applied_seq < self.issued_seq
    }

    /// Adds the extra with quantity 1, or removes it entirely if already selected.
    pub fn toggle(&mut self, extra_id: &str) -> Recalculation {
        match self.selected.iter().position(|s| s.extra_id == extra_id) {
            Some(index) => {
                self.selected.remove(index);
            }
            None => self.selected.push(SelectedExtra {
                extra_id: extra_id.to_string(),
                quantity: 1,
            }),
        }
        self.begin_recalc()
    }

    /// Quantities below one and unselected extras leave the state untouched.
    pub fn set_quantity(&mut self, extra_id: &str, quantity: u32) -> Recalculation {
        if quantity < 1 {
            return Recalculation::Unchanged;
        }
        let Some(entry) = self.selected.iter_mut().find(|s| s.extra_id == extra_id) else {
            return Recalculation::Unchanged;
        };
        if entry.quantity == quantity {
            return Recalculation::Unchanged;
        }
        entry.quantity = quantity;
        self.begin_recalc()
    }

    pub fn begin_recalc(&mut self) -> Recalculation {
        self.issued_seq += 1;

        if self.selected.is_empty() {
            self.charge = Decimal::ZERO;
            self.applied_seq = self.issued_seq;
            return Recalculation::Cleared;
        }

        let extra_ids = self
            .selected
            .iter()
            .map(|s| s.extra_id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let quantities = self
            .selected
            .iter()
            .map(|s| s.quantity.to_string())
            .collect::<Vec<_>>()
            .join(",");

        Recalculation::Pending(RecalcTicket {
            seq: self.issued_seq,
            extra_ids,
            quantities,
        })
    }

    /// Applies a quote if it is for the latest issued sequence. Returns false for stale quotes.
    pub fn apply_charge(&mut self, seq: u64, total: Decimal) -> bool {
        if seq != self.issued_seq {
            return false;
        }
        self.charge = total;
        self.applied_seq = seq;
        true
    }

    /// A failed quote keeps the previous total but stops the calculating state.
    pub fn abandon(&mut self, seq: u64) -> bool {
        if seq != self.issued_seq {
            return false;
        }
        self.applied_seq = seq;
        true
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.charge = Decimal::ZERO;
        self.issued_seq += 1;
        self.applied_seq = self.issued_seq;
    }

    /// PMS `ExtraCharge` block: `Extra_1`, `Extra_2`, … in selection order.
    pub fn package(&self) -> BTreeMap<String, ExtraChargeLine> {
        self.selected
            .iter()
            .enumerate()
            .map(|(i, s)| {
                (
                    format!("Extra_{}", i + 1),
                    ExtraChargeLine {
                        extra_charge_id: s.extra_id.clone(),
                        charge_adult: s.quantity.to_string(),
                    },
                )
            })
            .collect()
    }
}
