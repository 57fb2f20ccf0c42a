//! Shared value types for the quality-of-earnings domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (scores are in `[0.0, 1.0]`, materiality
//! amounts are non-negative) and participate in domain computations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

/// Number of tokens consumed or permitted in a text-generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenCount(u64);

impl TokenCount {
    /// Creates a [`TokenCount`] from a raw integer.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Returns the underlying integer value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TokenCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// Sampling temperature passed to the text-generation model, in `[0.0, 2.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Temperature(f64);

impl Temperature {
    /// Creates a [`Temperature`], returning `None` if `value` is outside `[0.0, 2.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=2.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the temperature as an `f64`.
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Score types
// ---------------------------------------------------------------------------

/// Generates a `[0.0, 1.0]` score newtype whose serde form is a bare number.
///
/// Deserialisation goes through `TryFrom<f64>`, so a model response carrying an
/// out-of-range score fails to parse instead of producing an invalid value.
macro_rules! unit_score {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(try_from = "f64", into = "f64")]
        pub struct $name(f64);

        impl $name {
            /// The neutral score `0.5`, used when no reliable estimate exists.
            pub const NEUTRAL: Self = Self(0.5);

            /// Creates a score, returning `None` if `value` is outside `[0.0, 1.0]`.
            #[must_use]
            pub fn new(value: f64) -> Option<Self> {
                if value.is_finite() && (0.0..=1.0).contains(&value) {
                    Some(Self(value))
                } else {
                    None
                }
            }

            /// Returns the score as an `f64` in `[0.0, 1.0]`.
            pub fn as_f64(self) -> f64 {
                self.0
            }
        }

        impl TryFrom<f64> for $name {
            type Error = String;

            fn try_from(value: f64) -> Result<Self, Self::Error> {
                Self::new(value).ok_or_else(|| {
                    format!("{} must be within [0, 1], got {}", stringify!($name), value)
                })
            }
        }

        impl From<$name> for f64 {
            fn from(score: $name) -> f64 {
                score.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.2}", self.0)
            }
        }
    };
}

unit_score! {
    /// Self-reported likelihood that an adjustment is real, in `[0.0, 1.0]`.
    ConfidenceScore
}

unit_score! {
    /// Self-reported accuracy of the computed amount, in `[0.0, 1.0]`.
    PrecisionScore
}

// ---------------------------------------------------------------------------
// Materiality
// ---------------------------------------------------------------------------

/// Minimum absolute monetary magnitude an adjustment must reach to be reported.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MaterialityAmount(f64);

impl MaterialityAmount {
    /// Creates a [`MaterialityAmount`], returning `None` if `value` is negative,
    /// infinite, or NaN.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the threshold as an `f64`.
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Returns `true` if `amount` is material under this threshold (`|amount| >= threshold`).
    pub fn is_met_by(self, amount: f64) -> bool {
        amount.abs() >= self.0
    }
}

impl TryFrom<f64> for MaterialityAmount {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("MaterialityAmount must be a non-negative finite number, got {value}"))
    }
}

impl From<MaterialityAmount> for f64 {
    fn from(value: MaterialityAmount) -> f64 {
        value.0
    }
}

impl std::fmt::Display for MaterialityAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// Materiality expressed as a percentage of an earnings base, in `[0.0, 100.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MaterialityPercentage(f64);

impl MaterialityPercentage {
    /// Creates a [`MaterialityPercentage`], returning `None` if `value` is
    /// outside `[0.0, 100.0]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (0.0..=100.0).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Returns the percentage as an `f64` (e.g. `3.0` for 3 %).
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Applies this percentage to `base`, returning an absolute amount.
    pub fn of(self, base: f64) -> f64 {
        base.abs() * self.0 / 100.0
    }
}

impl TryFrom<f64> for MaterialityPercentage {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("MaterialityPercentage must be within [0, 100], got {value}"))
    }
}

impl From<MaterialityPercentage> for f64 {
    fn from(value: MaterialityPercentage) -> f64 {
        value.0
    }
}

impl std::fmt::Display for MaterialityPercentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

// ---------------------------------------------------------------------------
// Document classification
// ---------------------------------------------------------------------------

/// Kind of financial document the analysed text was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// General ledger export.
    #[serde(rename = "gl")]
    GeneralLedger,
    /// Profit and loss statement.
    #[serde(rename = "p_and_l")]
    ProfitAndLoss,
    /// Payroll register.
    Payroll,
    /// Trial balance.
    TrialBalance,
    /// Anything the classifier could not place.
    Other,
}

impl DocumentType {
    /// Every document type, in declaration order.
    pub const ALL: [DocumentType; 5] = [
        DocumentType::GeneralLedger,
        DocumentType::ProfitAndLoss,
        DocumentType::Payroll,
        DocumentType::TrialBalance,
        DocumentType::Other,
    ];

    /// Returns the wire tag (e.g. `"p_and_l"`).
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::GeneralLedger => "gl",
            DocumentType::ProfitAndLoss => "p_and_l",
            DocumentType::Payroll => "payroll",
            DocumentType::TrialBalance => "trial_balance",
            DocumentType::Other => "other",
        }
    }

    /// Returns a human-readable label used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            DocumentType::GeneralLedger => "General Ledger",
            DocumentType::ProfitAndLoss => "Profit & Loss",
            DocumentType::Payroll => "Payroll",
            DocumentType::TrialBalance => "Trial Balance",
            DocumentType::Other => "Other",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown document type '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Adjustment catalog
// ---------------------------------------------------------------------------

/// Generates [`AdjustmentType`] together with its tag table so the enum, the
/// wire tags, and the catalog offered to the model can never drift apart.
macro_rules! adjustment_types {
    ($($variant:ident => $tag:literal),+ $(,)?) => {
        /// Category of a quality-of-earnings adjustment.
        ///
        /// Deserialisation is lenient: tags are normalised and anything outside
        /// the catalog becomes [`AdjustmentType::Other`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String")]
        pub enum AdjustmentType {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl AdjustmentType {
            /// The full catalog, in the order it is presented to the model.
            pub const ALL: &'static [AdjustmentType] = &[$(AdjustmentType::$variant),+];

            /// Returns the wire tag (e.g. `"executive_compensation"`).
            pub fn as_str(self) -> &'static str {
                match self {
                    $(AdjustmentType::$variant => $tag,)+
                }
            }

            /// Strict lookup of a catalog tag after normalisation.
            pub fn parse(tag: &str) -> Option<Self> {
                let normalised = normalise_tag(tag);
                match normalised.as_str() {
                    $($tag => Some(AdjustmentType::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

adjustment_types! {
    ExecutiveCompensation => "executive_compensation",
    Severance => "severance",
    OneTimeRevenue => "one_time_revenue",
    Depreciation => "depreciation",
    StockCompensation => "stock_compensation",
    LitigationCosts => "litigation_costs",
    Restructuring => "restructuring",
    AcquisitionCosts => "acquisition_costs",
    IpoCosts => "ipo_costs",
    ConsultantFees => "consultant_fees",
    TravelEntertainment => "travel_entertainment",
    RentNormalization => "rent_normalization",
    RelatedParty => "related_party",
    InsuranceNormalization => "insurance_normalization",
    BadDebt => "bad_debt",
    InventoryAdjustment => "inventory_adjustment",
    WarrantyReserve => "warranty_reserve",
    AccrualAdjustment => "accrual_adjustment",
    AccountingPolicy => "accounting_policy",
    SeasonalAdjustment => "seasonal_adjustment",
    CustomerConcentration => "customer_concentration",
    SupplierConcentration => "supplier_concentration",
    ContractAdjustment => "contract_adjustment",
    RevenueRecognition => "revenue_recognition",
    CostAllocation => "cost_allocation",
    AssetImpairment => "asset_impairment",
    TaxAdjustment => "tax_adjustment",
    Other => "other",
}

impl AdjustmentType {
    /// Lenient lookup: unknown or empty tags map to [`AdjustmentType::Other`].
    pub fn from_tag(tag: &str) -> Self {
        Self::parse(tag).unwrap_or(AdjustmentType::Other)
    }

    /// Returns the catalog as a comma-separated list for prompts.
    pub fn catalog() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<String> for AdjustmentType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl std::fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cases and maps separators so `"One-Time Revenue"` matches `one_time_revenue`.
fn normalise_tag(tag: &str) -> String {
    tag.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' | '/' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
