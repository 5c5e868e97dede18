use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use elast_core::{Factor, FormulaId, ProductId, Quantity};

/// Why a consumption happened, copied onto every ledger entry it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionContext {
    pub particulars: String,
    pub remarks: Option<String>,
    /// Ledger quantity per product unit; the product's own unit weight when absent.
    pub unit_weight: Option<Factor>,
    pub occurred_at: DateTime<Utc>,
}

impl ConsumptionContext {
    pub fn new(particulars: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            particulars: particulars.into(),
            remarks: None,
            unit_weight: None,
            occurred_at,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn with_unit_weight(mut self, unit_weight: Factor) -> Self {
        self.unit_weight = Some(unit_weight);
        self
    }
}

/// A manual batch run of a formula, not tied to a product transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaUsage {
    pub formula_id: FormulaId,
    /// Weight of compound produced per batch.
    pub batch_weight: Factor,
    pub number_of_batches: Quantity,
    pub order_reference: String,
    pub remarks: Option<String>,
    pub shift: Option<String>,
    pub machine_no: Option<String>,
    pub operator: Option<String>,
    pub batch_no: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl FormulaUsage {
    pub fn new(
        formula_id: FormulaId,
        batch_weight: Factor,
        number_of_batches: Quantity,
        order_reference: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            formula_id,
            batch_weight,
            number_of_batches,
            order_reference: order_reference.into(),
            remarks: None,
            shift: None,
            machine_no: None,
            operator: None,
            batch_no: None,
            occurred_at,
        }
    }

    /// Shop-floor details appended to the formula entry's remarks.
    pub(crate) fn run_details(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("shift", &self.shift),
            ("machine", &self.machine_no),
            ("operator", &self.operator),
            ("batch", &self.batch_no),
            ("remarks", &self.remarks),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label}: {v}")))
        .collect();

        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

/// A production order entering the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntake {
    pub product_id: ProductId,
    pub quantity_ordered: Quantity,
    pub weight_per_product: Option<Factor>,
    pub customer_name: String,
    pub remarks: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
