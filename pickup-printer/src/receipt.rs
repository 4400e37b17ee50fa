//! Pickup receipt document
//!
//! A [`PickupDocument`] is what the host hands over after a courier collects
//! parcels. This module holds the document model, the fixed Persian receipt
//! text, and the per-step [`ReceiptReport`] returned after rendering.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::device::Bitmap;
use crate::error::ReceiptError;
use crate::locale::{pad_label, to_locale_digits};

/// Fixed receipt text
pub mod labels {
    /// "collected at"
    pub const COLLECTED_AT: &str = "جمع\u{200C}آوری";
    /// "tracking code"
    pub const TRACKING_ID: &str = "کدپیگیری";
    /// "user"
    pub const AGENT: &str = "کاربر";
    /// "count / total weight"
    pub const TOTALS: &str = "تعداد/وزن\u{200C}کل";
    /// "kilo"
    pub const WEIGHT_UNIT: &str = "کیلو";
    /// "city"
    pub const DESTINATION: &str = "شهر";
    /// "count / weight in kilograms"
    pub const COUNT_WEIGHT: &str = "تعداد / وزن کیلوگرم";
}

/// Shop contact line printed under the logo
pub const DEFAULT_CONTACT_LINE: &str = "mahex.com         ۰۲۱-۹۶۹۶";

/// Dotted rule between the summary and the parcel table
pub const SEPARATOR: &str = "..............................";

/// Bordered placeholder for a handwritten signature ("signature")
pub const SIGNATURE_BOX: &str = concat!(
    " ..........................\n",
    ".                          .\n",
    ".                          .\n",
    ".                          .\n",
    ".           امضا            .\n",
    ".                          .\n",
    ".                          .\n",
    ".                          .\n",
    " ..........................\n",
);

/// One consignment line of a pickup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "ParcelFields")]
pub struct Parcel {
    destination: String,
    weight: Decimal,
    count: u32,
}

#[derive(Deserialize)]
struct ParcelFields {
    destination: String,
    weight: Decimal,
    count: u32,
}

impl TryFrom<ParcelFields> for Parcel {
    type Error = ReceiptError;

    fn try_from(fields: ParcelFields) -> Result<Self, Self::Error> {
        Parcel::new(fields.destination, fields.weight, fields.count)
    }
}

impl Parcel {
    /// Create a parcel line; the weight must not be negative
    pub fn new(
        destination: impl Into<String>,
        weight: Decimal,
        count: u32,
    ) -> Result<Self, ReceiptError> {
        let destination = destination.into();
        if weight.is_sign_negative() && !weight.is_zero() {
            return Err(ReceiptError::NegativeWeight {
                destination,
                weight: weight.to_string(),
            });
        }
        Ok(Self {
            destination,
            weight,
            count,
        })
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn weight(&self) -> Decimal {
        self.weight
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Parcels collected from one sender
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "DocumentFields")]
pub struct PickupDocument {
    timestamp: String,
    tracking_id: String,
    agent_name: String,
    parcels: Vec<Parcel>,
    total_weight: Decimal,
}

#[derive(Deserialize)]
struct DocumentFields {
    timestamp: String,
    tracking_id: String,
    agent_name: String,
    parcels: Vec<Parcel>,
}

impl TryFrom<DocumentFields> for PickupDocument {
    type Error = ReceiptError;

    fn try_from(fields: DocumentFields) -> Result<Self, Self::Error> {
        PickupDocument::new(
            fields.timestamp,
            fields.tracking_id,
            fields.agent_name,
            fields.parcels,
        )
    }
}

impl PickupDocument {
    /// Build a document; fails when the parcel weights do not fit one total
    pub fn new(
        timestamp: impl Into<String>,
        tracking_id: impl Into<String>,
        agent_name: impl Into<String>,
        parcels: Vec<Parcel>,
    ) -> Result<Self, ReceiptError> {
        let total_weight = parcels
            .iter()
            .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.weight))
            .ok_or(ReceiptError::WeightOverflow {
                parcels: parcels.len(),
            })?;
        Ok(Self {
            timestamp: timestamp.into(),
            tracking_id: tracking_id.into(),
            agent_name: agent_name.into(),
            parcels,
            total_weight,
        })
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn parcels(&self) -> &[Parcel] {
        &self.parcels
    }

    pub fn total_count(&self) -> u64 {
        self.parcels.iter().map(|p| p.count as u64).sum()
    }

    /// Exact decimal sum of parcel weights
    pub fn total_weight(&self) -> Decimal {
        self.total_weight
    }

    /// Summary block rows as (label, value)
    pub fn summary_rows(&self) -> Vec<(String, String)> {
        let totals = format!(
            "{} / {} {}",
            to_locale_digits(&self.total_count().to_string()),
            to_locale_digits(&self.total_weight().to_string()),
            labels::WEIGHT_UNIT
        );
        vec![
            (
                labels::COLLECTED_AT.to_string(),
                to_locale_digits(&self.timestamp),
            ),
            (
                labels::TRACKING_ID.to_string(),
                to_locale_digits(&self.tracking_id),
            ),
            (labels::AGENT.to_string(), to_locale_digits(&self.agent_name)),
            (labels::TOTALS.to_string(), totals),
        ]
    }

    /// One (destination, "weight /count") row per parcel, in input order
    pub fn parcel_rows(&self) -> Vec<(String, String)> {
        self.parcels
            .iter()
            .map(|p| {
                let value = format!(
                    "{} /{}",
                    to_locale_digits(&p.weight.to_string()),
                    pad_label(&to_locale_digits(&p.count.to_string()))
                );
                (p.destination.clone(), value)
            })
            .collect()
    }
}

/// Printer-side receipt branding
#[derive(Debug, Clone)]
pub struct ReceiptLayout {
    /// Logo printed at the top, if any
    pub header_logo: Option<Bitmap>,
    pub contact_line: String,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self {
            header_logo: None,
            contact_line: DEFAULT_CONTACT_LINE.to_string(),
        }
    }
}

/// Sections of the pickup receipt, in print order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStep {
    Header,
    Summary,
    Separator,
    ColumnHeader,
    ParcelRows,
    SignatureBlock,
    FeedPaper,
}

/// Outcome of one receipt section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: ReceiptStep,
    /// Every device call of the section went through
    pub ok: bool,
}

/// What a receipt render did
///
/// Rendering never fails as a whole; sections whose device calls were
/// skipped or faulted are listed as degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptReport {
    pub total_count: u64,
    pub total_weight: Decimal,
    pub steps: Vec<StepOutcome>,
}

impl ReceiptReport {
    pub(crate) fn new(total_count: u64, total_weight: Decimal) -> Self {
        Self {
            total_count,
            total_weight,
            steps: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, step: ReceiptStep, ok: bool) {
        self.steps.push(StepOutcome { step, ok });
    }

    /// Whether every section printed cleanly
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.ok)
    }

    pub fn degraded_steps(&self) -> Vec<ReceiptStep> {
        self.steps
            .iter()
            .filter(|s| !s.ok)
            .map(|s| s.step)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample() -> PickupDocument {
        PickupDocument::new(
            "1399/04/04-03:27",
            "112313424",
            "Ali Ahmadi",
            vec![
                Parcel::new("Tehran", Decimal::from(24), 4).unwrap(),
                Parcel::new("Shiraz", Decimal::from(12), 5).unwrap(),
                Parcel::new("Isfahan", Decimal::from(2), 16).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_totals() {
        let doc = sample();
        assert_eq!(doc.total_count(), 25);
        assert_eq!(doc.total_weight(), Decimal::from(38));
    }

    #[test]
    fn test_total_weight_is_exact() {
        let weights = ["0.1", "0.2", "1.15", "2.35", "100.005"];
        let parcels = weights
            .iter()
            .map(|w| Parcel::new("x", Decimal::from_str(w).unwrap(), 1).unwrap())
            .collect();
        let doc = PickupDocument::new("", "", "", parcels).unwrap();

        assert_eq!(doc.total_weight(), Decimal::from_str("103.805").unwrap());
        assert_eq!(doc.total_weight().to_string(), "103.805");
    }

    #[test]
    fn test_total_weight_tenths() {
        let parcels = (0..10)
            .map(|_| Parcel::new("x", Decimal::from_str("0.1").unwrap(), 2).unwrap())
            .collect();
        let doc = PickupDocument::new("", "", "", parcels).unwrap();
        assert_eq!(doc.total_weight(), Decimal::ONE);
        assert_eq!(doc.total_count(), 20);
    }

    #[test]
    fn test_empty_document_totals() {
        let doc = PickupDocument::new("t", "id", "agent", vec![]).unwrap();
        assert_eq!(doc.total_count(), 0);
        assert_eq!(doc.total_weight(), Decimal::ZERO);
        assert!(doc.parcel_rows().is_empty());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let err = Parcel::new("Tehran", Decimal::from(-1), 1).unwrap_err();
        assert!(matches!(err, ReceiptError::NegativeWeight { .. }));
        assert!(Parcel::new("Tehran", Decimal::ZERO, 0).is_ok());
    }

    #[test]
    fn test_summary_rows() {
        let rows = sample().summary_rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], (labels::COLLECTED_AT.into(), "۱۳۹۹/۰۴/۰۴-۰۳:۲۷".into()));
        assert_eq!(rows[1], (labels::TRACKING_ID.into(), "۱۱۲۳۱۳۴۲۴".into()));
        assert_eq!(rows[2], (labels::AGENT.into(), "Ali Ahmadi".into()));
        assert_eq!(rows[3], (labels::TOTALS.into(), "۲۵ / ۳۸ کیلو".into()));
    }

    #[test]
    fn test_parcel_rows_keep_order_and_duplicates() {
        let mut parcels = sample().parcels;
        parcels.push(Parcel::new("Tehran", Decimal::from_str("1.5").unwrap(), 1).unwrap());
        let doc = PickupDocument::new("t", "id", "agent", parcels).unwrap();

        let rows = doc.parcel_rows();
        let destinations: Vec<_> = rows.iter().map(|(d, _)| d.as_str()).collect();
        assert_eq!(destinations, ["Tehran", "Shiraz", "Isfahan", "Tehran"]);
        assert_eq!(rows[0].1, "۲۴ /    ۴");
        assert_eq!(rows[2].1, "۲ /   ۱۶");
        assert_eq!(rows[3].1, "۱.۵ /    ۱");
    }

    #[test]
    fn test_deserialize_document() {
        let json = r#"{
            "timestamp": "1399/04/04-03:27",
            "tracking_id": "112313424",
            "agent_name": "Ali",
            "parcels": [
                {"destination": "Tehran", "weight": "24", "count": 4},
                {"destination": "Shiraz", "weight": 12.5, "count": 5}
            ]
        }"#;
        let doc: PickupDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.parcels().len(), 2);
        assert_eq!(doc.total_weight(), Decimal::from_str("36.5").unwrap());
    }

    #[test]
    fn test_deserialize_rejects_negative_weight() {
        let json = r#"{
            "timestamp": "t", "tracking_id": "1", "agent_name": "a",
            "parcels": [{"destination": "Tehran", "weight": "-3", "count": 1}]
        }"#;
        assert!(serde_json::from_str::<PickupDocument>(json).is_err());
    }

    #[test]
    fn test_weight_overflow_rejected() {
        let parcels = vec![
            Parcel::new("Tehran", Decimal::MAX, 1).unwrap(),
            Parcel::new("Shiraz", Decimal::ONE, 1).unwrap(),
        ];
        assert_eq!(
            PickupDocument::new("t", "1", "a", parcels).unwrap_err(),
            ReceiptError::WeightOverflow { parcels: 2 }
        );

        let parcels = vec![Parcel::new("Tehran", Decimal::MAX, 1).unwrap()];
        let doc = PickupDocument::new("t", "1", "a", parcels).unwrap();
        assert_eq!(doc.total_weight(), Decimal::MAX);
    }

    #[test]
    fn test_deserialize_rejects_weight_overflow() {
        let json = r#"{
            "timestamp": "t", "tracking_id": "1", "agent_name": "a",
            "parcels": [
                {"destination": "Tehran", "weight": "79228162514264337593543950335", "count": 1},
                {"destination": "Shiraz", "weight": "1", "count": 1}
            ]
        }"#;
        let err = serde_json::from_str::<PickupDocument>(json).unwrap_err();
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_signature_box_shape() {
        let lines: Vec<_> = SIGNATURE_BOX.lines().collect();
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], lines[8]);
        assert!(lines[4].contains("امضا"));
        assert!(SIGNATURE_BOX.ends_with('\n'));
        assert_eq!(SEPARATOR.len(), 30);
    }

    #[test]
    fn test_report() {
        let mut report = ReceiptReport::new(1, Decimal::ONE);
        report.record(ReceiptStep::Header, true);
        report.record(ReceiptStep::FeedPaper, false);
        assert!(!report.is_complete());
        assert_eq!(report.degraded_steps(), vec![ReceiptStep::FeedPaper]);
    }
}
