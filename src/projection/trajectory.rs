//! Per-year output rows and the trajectory that collects them

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::state::{Phase, TerminationReason};

/// How an excess surplus was split by the redirect rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RedirectSplit {
    pub reserve: f64,
    pub debt_paydown: f64,
    pub reinvestment: f64,
    pub rebate: f64,
}

impl RedirectSplit {
    /// Sum of all four shares
    pub fn total(&self) -> f64 {
        self.reserve + self.debt_paydown + self.reinvestment + self.rebate
    }

    /// Portion that leaves the ledger instead of retiring debt
    pub fn outflows(&self) -> f64 {
        self.reserve + self.reinvestment + self.rebate
    }
}

/// A single row of projection output for one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    // Timing
    pub year_index: u32,
    pub calendar_year: i32,

    // Economy
    pub gdp: f64,
    pub scale_factor: f64,
    pub inflation_factor: f64,
    pub growth_rate: f64,
    pub inflation_rate: f64,

    // Ledger
    pub revenue_by_stream: BTreeMap<String, f64>,
    pub spending_by_category: BTreeMap<String, f64>,
    pub category_surplus: BTreeMap<String, f64>,
    pub total_revenue: f64,
    pub program_spending: f64,
    pub interest_expense: f64,
    pub total_spending: f64,
    pub primary_surplus: f64,
    pub surplus: f64,
    pub general_revenue_contribution: f64,
    pub redirect: RedirectSplit,

    // Debt
    pub debt_start: f64,
    pub cumulative_debt: f64,
    pub debt_to_gdp: f64,

    // Safeguards
    pub spending_to_gdp: f64,
    pub phase: Phase,
    pub recession: bool,
    pub degraded: bool,
    /// Copy of the last valid row after early termination
    pub extrapolated: bool,
    pub termination: Option<TerminationReason>,
}

impl YearRow {
    /// Create an empty row for a year
    pub fn new(year_index: u32, calendar_year: i32) -> Self {
        Self {
            year_index,
            calendar_year,
            gdp: 0.0,
            scale_factor: 1.0,
            inflation_factor: 1.0,
            growth_rate: 0.0,
            inflation_rate: 0.0,
            revenue_by_stream: BTreeMap::new(),
            spending_by_category: BTreeMap::new(),
            category_surplus: BTreeMap::new(),
            total_revenue: 0.0,
            program_spending: 0.0,
            interest_expense: 0.0,
            total_spending: 0.0,
            primary_surplus: 0.0,
            surplus: 0.0,
            general_revenue_contribution: 0.0,
            redirect: RedirectSplit::default(),
            debt_start: 0.0,
            cumulative_debt: 0.0,
            debt_to_gdp: 0.0,
            spending_to_gdp: 0.0,
            phase: Phase::Normal,
            recession: false,
            degraded: false,
            extrapolated: false,
            termination: None,
        }
    }

    /// Repeat this row at a later year, flagged as extrapolated
    pub fn extrapolate_to(&self, year_index: u32, calendar_year: i32) -> Self {
        Self {
            year_index,
            calendar_year,
            extrapolated: true,
            ..self.clone()
        }
    }
}

/// Fields reduced across Monte Carlo trials
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrackedField {
    Gdp,
    TotalRevenue,
    TotalSpending,
    Surplus,
    CumulativeDebt,
    DebtToGdp,
    InterestExpense,
}

impl TrackedField {
    pub const ALL: [TrackedField; 7] = [
        TrackedField::Gdp,
        TrackedField::TotalRevenue,
        TrackedField::TotalSpending,
        TrackedField::Surplus,
        TrackedField::CumulativeDebt,
        TrackedField::DebtToGdp,
        TrackedField::InterestExpense,
    ];

    /// Read this field from a row
    pub fn value(&self, row: &YearRow) -> f64 {
        match self {
            TrackedField::Gdp => row.gdp,
            TrackedField::TotalRevenue => row.total_revenue,
            TrackedField::TotalSpending => row.total_spending,
            TrackedField::Surplus => row.surplus,
            TrackedField::CumulativeDebt => row.cumulative_debt,
            TrackedField::DebtToGdp => row.debt_to_gdp,
            TrackedField::InterestExpense => row.interest_expense,
        }
    }

    /// Snake-case column name
    pub fn label(&self) -> &'static str {
        match self {
            TrackedField::Gdp => "gdp",
            TrackedField::TotalRevenue => "total_revenue",
            TrackedField::TotalSpending => "total_spending",
            TrackedField::Surplus => "surplus",
            TrackedField::CumulativeDebt => "cumulative_debt",
            TrackedField::DebtToGdp => "debt_to_gdp",
            TrackedField::InterestExpense => "interest_expense",
        }
    }
}

/// Year and reason of an early stop
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Termination {
    pub year_index: u32,
    pub reason: TerminationReason,
}

/// Complete projection result for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub policy_name: String,
    pub start_year: i32,
    pub rows: Vec<YearRow>,
    pub termination: Option<Termination>,
    /// Any year needed value substitution
    pub degraded: bool,
}

impl Trajectory {
    /// Empty trajectory for a policy starting in `start_year`
    pub fn new(policy_name: impl Into<String>, start_year: i32) -> Self {
        Self {
            policy_name: policy_name.into(),
            start_year,
            rows: Vec::new(),
            termination: None,
            degraded: false,
        }
    }

    /// Append a year. Rows are only ever added, never edited.
    pub fn add_row(&mut self, row: YearRow) {
        self.degraded |= row.degraded;
        if self.termination.is_none() {
            if let Some(reason) = row.termination {
                self.termination = Some(Termination {
                    year_index: row.year_index,
                    reason,
                });
            }
        }
        self.rows.push(row);
    }

    /// Number of rows, extrapolated rows included
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Full horizon with no substitution and no early stop
    pub fn is_clean(&self) -> bool {
        !self.degraded && self.termination.is_none()
    }

    /// Year index of the early stop, if any
    pub fn terminated_at(&self) -> Option<u32> {
        self.termination.map(|t| t.year_index)
    }

    /// Last row, which may be extrapolated
    pub fn final_row(&self) -> Option<&YearRow> {
        self.rows.last()
    }

    /// One tracked field as a time series
    pub fn series(&self, field: TrackedField) -> Vec<f64> {
        self.rows.iter().map(|row| field.value(row)).collect()
    }

    /// Get summary statistics
    ///
    /// Flow totals count projected years only; extrapolated rows after an
    /// early termination would otherwise repeat the last year's flows.
    pub fn summary(&self) -> TrajectorySummary {
        let projected = || self.rows.iter().filter(|r| !r.extrapolated);
        let total_revenue: f64 = projected().map(|r| r.total_revenue).sum();
        let total_spending: f64 = projected().map(|r| r.total_spending).sum();
        let total_surplus: f64 = projected().map(|r| r.surplus).sum();
        let total_interest: f64 = projected().map(|r| r.interest_expense).sum();

        let final_debt = self.rows.last().map(|r| r.cumulative_debt).unwrap_or(0.0);
        let final_gdp = self.rows.last().map(|r| r.gdp).unwrap_or(0.0);
        let final_debt_to_gdp = self.rows.last().map(|r| r.debt_to_gdp).unwrap_or(0.0);

        TrajectorySummary {
            total_years: self.rows.len() as u32,
            total_revenue,
            total_spending,
            total_surplus,
            total_interest,
            final_debt,
            final_gdp,
            final_debt_to_gdp,
        }
    }
}

/// Summary statistics for a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub total_years: u32,
    pub total_revenue: f64,
    pub total_spending: f64,
    pub total_surplus: f64,
    pub total_interest: f64,
    pub final_debt: f64,
    pub final_gdp: f64,
    pub final_debt_to_gdp: f64,
}
