use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use slip_payment_engine::traits::{SlipVerdict, SlipVerifier, VerificationError};
use spg_common::Baht;

use crate::{
    config::Slip2GoConfig,
    data_objects::{VerifyRequest, VerifyResponse},
    Slip2GoApiError,
};

#[derive(Clone)]
pub struct Slip2GoApi {
    config: Slip2GoConfig,
    client: Arc<Client>,
}

impl Slip2GoApi {
    pub fn new(config: Slip2GoConfig) -> Result<Self, Slip2GoApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| Slip2GoApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Slip2GoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Submits one slip image and returns the provider's answer mapped onto the engine's
    /// verdict space.
    ///
    /// Slip2Go delivers verdict codes with both success and client-error HTTP statuses, so the
    /// body is parsed regardless of status and classification falls to the [`crate::VerdictMap`].
    /// Only an unparseable body is treated as a failed query.
    pub async fn verify_qr_slip(
        &self,
        image: &[u8],
        expected_amount: Option<Baht>,
    ) -> Result<SlipVerdict, Slip2GoApiError> {
        let body = VerifyRequest::for_image(image, expected_amount);
        trace!("🧾️ Sending verification request to {}", self.config.verify_url);
        let response = self.client.post(&self.config.verify_url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: VerifyResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(Slip2GoApiError::JsonError(e.to_string())),
            Err(_) => return Err(Slip2GoApiError::QueryError { status: status.as_u16(), message: text }),
        };
        debug!("🧾️ Verification response code {} ({})", parsed.code, status);
        Ok(self.config.verdict_map.verdict(&parsed))
    }

    pub fn config(&self) -> &Slip2GoConfig {
        &self.config
    }
}

impl SlipVerifier for Slip2GoApi {
    async fn verify_slip(&self, image: &[u8], expected_amount: Option<Baht>) -> Result<SlipVerdict, VerificationError> {
        self.verify_qr_slip(image, expected_amount).await.map_err(Into::into)
    }
}
