use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 10;

/// Wire names of the biomarkers, in the column order the scaler was fitted on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "proline",
    "lKynurenine",
    "spermidine",
    "aminoHippuricAcid",
    "palmitoylLCarnitine",
    "taurine",
    "phenylalanine",
    "lValine",
    "oTyr",
    "carnitine",
];

/// Fixed MRI categories, indexed by the image classifier's output position.
pub const MRI_CLASSES: [&str; 3] = ["Bengin cases", "Malignant cases", "Normal cases"];

/// Ten biomarker measurements. Any field missing from the request body is `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BiomarkerPanel {
    pub proline: f64,
    pub l_kynurenine: f64,
    pub spermidine: f64,
    pub amino_hippuric_acid: f64,
    pub palmitoyl_l_carnitine: f64,
    pub taurine: f64,
    pub phenylalanine: f64,
    pub l_valine: f64,
    pub o_tyr: f64,
    pub carnitine: f64,
}

impl BiomarkerPanel {
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.proline,
            self.l_kynurenine,
            self.spermidine,
            self.amino_hippuric_acid,
            self.palmitoyl_l_carnitine,
            self.taurine,
            self.phenylalanine,
            self.l_valine,
            self.o_tyr,
            self.carnitine,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Bands are strict lower bounds: exactly 0.7 is Medium, exactly 0.4 is Low.
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.7 {
            RiskLevel::High
        } else if probability > 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionOutcome {
    pub prediction: u8,
    pub probability: f64,
    pub stage: u32,
    pub histological_type: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone)]
pub struct NewBloodTest {
    pub user_id: i64,
    pub panel: BiomarkerPanel,
    pub histological_type: String,
    pub prediction: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodTestRecord {
    pub id: i64,
    pub user_id: i64,
    pub histological_type: String,
    #[serde(flatten)]
    pub panel: BiomarkerPanel,
    pub prediction: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMriPrediction {
    pub user_id: i64,
    pub prediction: String,
    pub probability: f64,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MriRecord {
    pub id: i64,
    pub user_id: i64,
    pub prediction: String,
    pub probability: f64,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_zero() {
        let panel: BiomarkerPanel =
            serde_json::from_str(r#"{"proline": 1.5, "carnitine": 2.0}"#).unwrap();

        assert_eq!(panel.proline, 1.5);
        assert_eq!(panel.carnitine, 2.0);
        assert_eq!(panel.l_kynurenine, 0.0);
        assert_eq!(panel.o_tyr, 0.0);
    }

    #[test]
    fn test_empty_body_is_all_zero() {
        let panel: BiomarkerPanel = serde_json::from_str("{}").unwrap();
        assert_eq!(panel.to_vector(), [0.0; FEATURE_COUNT]);
    }

    #[test]
    fn test_vector_follows_wire_order() {
        let json = serde_json::json!({
            "proline": 1.0,
            "lKynurenine": 2.0,
            "spermidine": 3.0,
            "aminoHippuricAcid": 4.0,
            "palmitoylLCarnitine": 5.0,
            "taurine": 6.0,
            "phenylalanine": 7.0,
            "lValine": 8.0,
            "oTyr": 9.0,
            "carnitine": 10.0
        });
        let panel: BiomarkerPanel = serde_json::from_value(json).unwrap();

        assert_eq!(
            panel.to_vector(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
        );
    }

    #[test]
    fn test_feature_names_match_serialized_keys() {
        let value = serde_json::to_value(BiomarkerPanel::default()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), FEATURE_COUNT);
        for name in FEATURE_NAMES {
            assert!(object.contains_key(name), "missing key {name}");
        }
    }

    #[test]
    fn test_non_numeric_field_is_rejected() {
        let result = serde_json::from_str::<BiomarkerPanel>(r#"{"proline": "high"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_probability(0.95), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.7000001), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.7), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.55), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.4000001), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_probability(0.4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
    }

    #[test]
    fn test_risk_level_serializes_as_label() {
        assert_eq!(serde_json::to_value(RiskLevel::High).unwrap(), "High");
        assert_eq!(RiskLevel::Medium.as_str(), "Medium");
    }

    #[test]
    fn test_blood_test_record_is_flat_camel_case() {
        let record = BloodTestRecord {
            id: 1,
            user_id: 7,
            histological_type: "Adenocarcinoma".to_string(),
            panel: BiomarkerPanel {
                l_valine: 3.25,
                ..Default::default()
            },
            prediction: 1,
            created_at: Utc::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["userId"], 7);
        assert_eq!(value["histologicalType"], "Adenocarcinoma");
        assert_eq!(value["lValine"], 3.25);
        assert_eq!(value["prediction"], 1);
    }
}
