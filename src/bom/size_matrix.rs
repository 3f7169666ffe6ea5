//! Step 3: per-size consumption quantities.
//!
//! Rows are categories, columns are the product's size labels sorted from the
//! largest size to the smallest. A cell holding zero is the same as an empty
//! cell: it counts as not configured.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;
use strum::{Display, EnumString};
use tracing::debug;
use utoipa::ToSchema;

use super::error::{BomError, ValidationIssue};
use super::types::{Category, CategoryId, SizeConsumptionItem, SizeConsumptionRecord};

/// Selects which configured categories become matrix rows.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SizeMatrixRowFilter {
    /// Categories that require a color.
    #[default]
    ColorVariable,
    /// Categories whose quantity varies by size.
    SizeVariable,
}

impl SizeMatrixRowFilter {
    pub fn includes(&self, category: &Category) -> bool {
        match self {
            Self::ColorVariable => category.has_color,
            Self::SizeVariable => category.quantity_varies_by_size,
        }
    }
}

const GARMENT_LADDER: &[(&str, u8)] = &[
    ("XXS", 1),
    ("2XS", 1),
    ("XS", 2),
    ("S", 3),
    ("M", 4),
    ("L", 5),
    ("XL", 6),
    ("XXL", 7),
    ("2XL", 7),
    ("XXXL", 8),
    ("3XL", 8),
    ("XXXXL", 9),
    ("4XL", 9),
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SizeKey {
    // Variant order is the group order when sorting ascending.
    Other(String),
    Garment(u8),
    Numeric(Decimal),
}

fn size_key(label: &str) -> SizeKey {
    let trimmed = label.trim();
    if let Ok(value) = Decimal::from_str(trimmed) {
        return SizeKey::Numeric(value);
    }
    let normalized: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    GARMENT_LADDER
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, rank)| SizeKey::Garment(*rank))
        .unwrap_or_else(|| SizeKey::Other(trimmed.to_string()))
}

/// Compares two size labels, larger sizes first.
pub fn compare_sizes_descending(a: &str, b: &str) -> Ordering {
    size_key(b)
        .cmp(&size_key(a))
        .then_with(|| b.cmp(a))
}

/// Distinct labels ordered numerically, then by garment size, then by text, all descending.
pub fn sort_sizes_descending<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sorted: Vec<String> = Vec::new();
    for label in labels {
        let label = label.into();
        if !sorted.contains(&label) {
            sorted.push(label);
        }
    }
    sorted.sort_by(|a, b| compare_sizes_descending(a, b));
    sorted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Completion {
    pub filled: usize,
    pub total: usize,
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        self.filled == self.total
    }

    /// Whole-number percentage, 100 for an empty matrix.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.filled * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeConsumptionMatrix {
    rows: Vec<CategoryId>,
    columns: Vec<String>,
    cells: BTreeMap<(CategoryId, String), Decimal>,
}

impl SizeConsumptionMatrix {
    pub fn new<I, S>(rows: Vec<CategoryId>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut matrix = Self {
            rows: Vec::new(),
            columns: sort_sizes_descending(columns),
            cells: BTreeMap::new(),
        };
        matrix.set_rows(rows);
        matrix
    }

    pub fn rows(&self) -> &[CategoryId] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Replaces the row set; cells of rows that are gone are dropped.
    pub fn set_rows(&mut self, rows: Vec<CategoryId>) {
        let mut deduped: Vec<CategoryId> = Vec::with_capacity(rows.len());
        for row in rows {
            if !deduped.contains(&row) {
                deduped.push(row);
            }
        }
        self.rows = deduped;
        let rows = &self.rows;
        self.cells.retain(|(category_id, _), _| rows.contains(category_id));
    }

    pub fn has_row(&self, category_id: CategoryId) -> bool {
        self.rows.contains(&category_id)
    }

    pub fn has_column(&self, size_label: &str) -> bool {
        self.columns.iter().any(|c| c == size_label)
    }

    pub fn quantity(&self, category_id: CategoryId, size_label: &str) -> Option<Decimal> {
        self.cells
            .get(&(category_id, size_label.to_string()))
            .copied()
    }

    fn check_value(value: Decimal) -> Result<(), BomError> {
        if value < Decimal::ZERO {
            Err(ValidationIssue::NegativeQuantity { quantity: value }.into())
        } else {
            Ok(())
        }
    }

    fn check_row(&self, category_id: CategoryId) -> Result<(), BomError> {
        if self.has_row(category_id) {
            Ok(())
        } else {
            Err(ValidationIssue::UnknownRow { category_id }.into())
        }
    }

    fn check_column(&self, size_label: &str) -> Result<(), BomError> {
        if self.has_column(size_label) {
            Ok(())
        } else {
            Err(ValidationIssue::UnknownSize {
                size_label: size_label.to_string(),
            }
            .into())
        }
    }

    fn put(&mut self, category_id: CategoryId, size_label: &str, value: Decimal) {
        let key = (category_id, size_label.to_string());
        if value.is_zero() {
            self.cells.remove(&key);
        } else {
            self.cells.insert(key, value);
        }
    }

    /// Sets one cell; zero clears it.
    pub fn set_cell(
        &mut self,
        category_id: CategoryId,
        size_label: &str,
        value: Decimal,
    ) -> Result<(), BomError> {
        Self::check_value(value)?;
        self.check_row(category_id)?;
        self.check_column(size_label)?;
        self.put(category_id, size_label, value);
        Ok(())
    }

    pub fn fill_all(&mut self, value: Decimal) -> Result<(), BomError> {
        Self::check_value(value)?;
        for row in self.rows.clone() {
            for column in self.columns.clone() {
                self.put(row, &column, value);
            }
        }
        Ok(())
    }

    /// Column `i` of the sorted columns gets `base + increment * i` in every row.
    ///
    /// Rejected without changes when any resulting value would be negative or
    /// out of the decimal range.
    pub fn apply_incremental_pattern(
        &mut self,
        base: Decimal,
        increment: Decimal,
    ) -> Result<(), BomError> {
        let values = (0..self.columns.len())
            .map(|i| {
                increment
                    .checked_mul(Decimal::from(i as u64))
                    .and_then(|step| base.checked_add(step))
                    .ok_or(ValidationIssue::QuantityOverflow)
            })
            .collect::<Result<Vec<Decimal>, _>>()?;
        if let Some(negative) = values.iter().find(|v| **v < Decimal::ZERO) {
            return Err(ValidationIssue::NegativeQuantity {
                quantity: *negative,
            }
            .into());
        }
        for row in self.rows.clone() {
            for (column, value) in self.columns.clone().iter().zip(values.iter()) {
                self.put(row, column, *value);
            }
        }
        Ok(())
    }

    pub fn fill_row(&mut self, category_id: CategoryId, value: Decimal) -> Result<(), BomError> {
        Self::check_value(value)?;
        self.check_row(category_id)?;
        for column in self.columns.clone() {
            self.put(category_id, &column, value);
        }
        Ok(())
    }

    pub fn fill_column(&mut self, size_label: &str, value: Decimal) -> Result<(), BomError> {
        Self::check_value(value)?;
        self.check_column(size_label)?;
        for row in self.rows.clone() {
            self.put(row, size_label, value);
        }
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.cells.clear();
    }

    pub fn clear_row(&mut self, category_id: CategoryId) {
        self.cells.retain(|(row, _), _| *row != category_id);
    }

    pub fn completion(&self) -> Completion {
        Completion {
            filled: self.cells.len(),
            total: self.rows.len() * self.columns.len(),
        }
    }

    /// Filled cells in row order, then column order.
    pub fn items(&self) -> Vec<SizeConsumptionItem> {
        let mut items = Vec::with_capacity(self.cells.len());
        for row in &self.rows {
            for column in &self.columns {
                if let Some(quantity) = self.quantity(*row, column) {
                    items.push(SizeConsumptionItem {
                        category_id: *row,
                        size_label: column.clone(),
                        quantity,
                    });
                }
            }
        }
        items
    }

    /// Replaces all cells with persisted rows that fit the current rows and columns.
    pub fn replace_from_records(&mut self, records: &[SizeConsumptionRecord]) {
        self.cells.clear();
        for record in records {
            if !self.has_row(record.category_id) || !self.has_column(&record.size_label) {
                debug!(
                    category_id = record.category_id,
                    size = %record.size_label,
                    "persisted size consumption outside the matrix"
                );
                continue;
            }
            if record.quantity > Decimal::ZERO {
                self.put(record.category_id, &record.size_label, record.quantity);
            }
        }
    }
}
