//! Field-schema mapping for CRM leads.
//!
//! LeadSquared tenants rename fields freely (`mx_Stage` vs `ProspectStage`
//! vs `Stage`), and some endpoints return leads as `{Attribute, Value}`
//! property lists while others return flat objects. The schema declares an
//! ordered candidate list per canonical attribute and resolves each one
//! exactly once at ingestion — no fallback chains at use sites.

use std::collections::HashMap;

use serde_json::Value;

use crate::model::LeadRecord;

/// Ordered candidate CRM property names per canonical lead attribute.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub id: Vec<&'static str>,
    pub first_name: Vec<&'static str>,
    pub last_name: Vec<&'static str>,
    pub email: Vec<&'static str>,
    pub stage: Vec<&'static str>,
    pub source: Vec<&'static str>,
    pub stage_entered_at: Vec<&'static str>,
    pub offer_given_at: Vec<&'static str>,
    pub lead_type: Vec<&'static str>,
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self {
            id: vec!["ProspectID", "ProspectId", "LeadId"],
            first_name: vec!["FirstName"],
            last_name: vec!["LastName"],
            email: vec!["EmailAddress", "Email"],
            stage: vec!["ProspectStage", "mx_Stage", "Stage"],
            source: vec!["Source", "LeadSource", "mx_Lead_Source"],
            stage_entered_at: vec![
                "mx_Stage_Change_Date",
                "StageChangeDate",
                "ModifiedOn",
            ],
            offer_given_at: vec!["mx_Offer_Given_Date", "OfferGivenDate"],
            lead_type: vec!["mx_Lead_Type", "LeadType"],
        }
    }
}

impl FieldSchema {
    /// Resolve a raw CRM lead into a [`LeadRecord`].
    ///
    /// Comparison fields (`stage`, `source`, `lead_type`) are trimmed and
    /// lower-cased here; `stage_label` keeps the CRM's casing.
    pub fn resolve(&self, raw: &Value) -> LeadRecord {
        let flat = flatten_lead(raw);

        let stage_label = pick(&flat, &self.stage).unwrap_or_default();
        LeadRecord {
            prospect_id: pick(&flat, &self.id).unwrap_or_default(),
            first_name: pick(&flat, &self.first_name).unwrap_or_default(),
            last_name: pick(&flat, &self.last_name).unwrap_or_default(),
            email: pick(&flat, &self.email).unwrap_or_default(),
            stage: stage_label.to_lowercase(),
            stage_label,
            source: pick(&flat, &self.source)
                .unwrap_or_default()
                .to_lowercase(),
            stage_entered_at: pick(&flat, &self.stage_entered_at),
            offer_given_at: pick(&flat, &self.offer_given_at),
            lead_type: pick(&flat, &self.lead_type)
                .unwrap_or_default()
                .to_lowercase(),
        }
    }
}

/// Flatten a raw lead into a key/value map.
///
/// Accepts both shapes LeadSquared produces: a flat JSON object of scalars,
/// or an object carrying a `LeadPropertyList` array of `{Attribute, Value}`
/// pairs (a bare array of pairs also works).
pub fn flatten_lead(raw: &Value) -> HashMap<String, String> {
    let mut flat = HashMap::new();

    match raw {
        Value::Object(map) => {
            for (key, value) in map {
                if key == "LeadPropertyList" {
                    if let Value::Array(pairs) = value {
                        insert_property_pairs(&mut flat, pairs);
                    }
                    continue;
                }
                if let Some(s) = scalar_to_string(value) {
                    flat.insert(key.clone(), s);
                }
            }
        }
        Value::Array(pairs) => insert_property_pairs(&mut flat, pairs),
        _ => {}
    }

    flat
}

fn insert_property_pairs(flat: &mut HashMap<String, String>, pairs: &[Value]) {
    for pair in pairs {
        let attribute = pair.get("Attribute").and_then(Value::as_str);
        let value = pair.get("Value").and_then(scalar_to_string);
        if let (Some(attr), Some(val)) = (attribute, value) {
            flat.insert(attr.to_string(), val);
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First candidate present with a non-empty value wins. Key comparison is
/// case-insensitive because tenants are inconsistent about field casing.
fn pick(flat: &HashMap<String, String>, candidates: &[&str]) -> Option<String> {
    for candidate in candidates {
        let found = flat.iter().find_map(|(key, value)| {
            (key.eq_ignore_ascii_case(candidate) && !value.is_empty()).then(|| value.clone())
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_flat_object() {
        let raw = json!({
            "ProspectID": "p-1",
            "FirstName": "Ana",
            "LastName": "Iyer",
            "EmailAddress": "ana@example.com",
            "ProspectStage": "Application Completed",
            "Source": "Website",
        });
        let lead = FieldSchema::default().resolve(&raw);
        assert_eq!(lead.prospect_id, "p-1");
        assert_eq!(lead.stage, "application completed");
        assert_eq!(lead.stage_label, "Application Completed");
        assert_eq!(lead.source, "website");
    }

    #[test]
    fn resolves_property_list() {
        let raw = json!({
            "LeadPropertyList": [
                {"Attribute": "ProspectID", "Value": "p-2"},
                {"Attribute": "mx_Stage", "Value": " Application Pending "},
                {"Attribute": "mx_Lead_Source", "Value": "Chatbot"},
            ]
        });
        let lead = FieldSchema::default().resolve(&raw);
        assert_eq!(lead.prospect_id, "p-2");
        assert_eq!(lead.stage, "application pending");
        assert_eq!(lead.source, "chatbot");
    }

    #[test]
    fn earlier_candidates_win() {
        let raw = json!({
            "ProspectStage": "Enrolled",
            "mx_Stage": "Application Pending",
        });
        let lead = FieldSchema::default().resolve(&raw);
        assert_eq!(lead.stage, "enrolled");
    }

    #[test]
    fn empty_values_fall_through() {
        let raw = json!({
            "ProspectStage": "",
            "mx_Stage": "Enrolled",
        });
        let lead = FieldSchema::default().resolve(&raw);
        assert_eq!(lead.stage, "enrolled");
    }

    #[test]
    fn key_lookup_is_case_insensitive() {
        let raw = json!({ "prospectid": "p-3" });
        let lead = FieldSchema::default().resolve(&raw);
        assert_eq!(lead.prospect_id, "p-3");
    }
}
