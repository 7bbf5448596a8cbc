use serde::{Deserialize, Deserializer, Serialize};
use spg_common::Baht;

//--------------------------------------   Request objects    ---------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub payload: VerifyPayload,
}

impl VerifyRequest {
    /// Builds the verification request for one image. When `expected_amount` is given the
    /// provider is asked to enforce it as a floor ("gte") check in addition to our own matching.
    pub fn for_image(image: &[u8], expected_amount: Option<Baht>) -> Self {
        let image_base64 = format!("data:image/jpeg;base64,{}", base64::encode(image));
        Self {
            payload: VerifyPayload {
                image_base64,
                check_condition: CheckCondition {
                    check_duplicate: true,
                    check_amount: expected_amount.map(CheckAmount::at_least),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayload {
    pub image_base64: String,
    pub check_condition: CheckCondition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCondition {
    pub check_duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_amount: Option<CheckAmount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckAmount {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: String,
}

impl CheckAmount {
    pub fn at_least(amount: Baht) -> Self {
        Self { kind: "gte".to_string(), amount: amount.format_qr() }
    }
}

//--------------------------------------   Response objects   ---------------------------------------------------------

/// The provider's response envelope. `code` has been observed both as a JSON string and as a
/// number, so it is normalized to a string on the way in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    #[serde(default, deserialize_with = "code_as_string")]
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<SlipData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlipData {
    pub amount: Option<f64>,
    pub transaction_date: Option<String>,
    pub is_duplicate: Option<bool>,
    pub trans_ref: Option<String>,
    pub sender: Option<Party>,
    pub receiver: Option<Party>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Party {
    pub name: Option<String>,
    pub display_name: Option<String>,
}

impl Party {
    pub fn best_name(&self) -> Option<String> {
        self.name.clone().or_else(|| self.display_name.clone())
    }
}

fn code_as_string<'de, D>(de: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let value = serde_json::Value::deserialize(de)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
