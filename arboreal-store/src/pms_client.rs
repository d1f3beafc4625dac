//! HTTP client for the property-management system's booking API.

use arboreal_core::pms::{
    CalculateExtrasRequest, Envelope, ExtraItem, ExtrasChargeQuote, PaymentGateway, PmsClient, PmsError,
    ReservationPayload, ReservationReceipt,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

const EXTRAS_PATH: &str = "api/booking/extras";
const CALCULATE_EXTRAS_PATH: &str = "api/booking/calculate-extras";
const PAYMENT_GATEWAYS_PATH: &str = "api/booking/payment-gateways";
const CREATE_BOOKING_PATH: &str = "api/booking/create";

pub struct HttpPmsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpPmsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PmsError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| PmsError::InvalidConfig(format!("invalid PMS base URL {}: {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PmsError::InvalidConfig(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PmsError> {
        self.base_url
            .join(path)
            .map_err(|e| PmsError::InvalidConfig(format!("invalid PMS path {}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PmsError> {
        let url = self.endpoint(path)?;
        tracing::debug!("PMS GET {}", url);
        let response = self.http.get(url).send().await.map_err(transport)?;
        Self::read(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, PmsError> {
        let url = self.endpoint(path)?;
        tracing::debug!("PMS POST {}", url);
        let response = self.http.post(url).json(body).send().await.map_err(transport)?;
        Self::read(response).await
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PmsError> {
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        decode(status, &body)
    }
}

fn transport(e: reqwest::Error) -> PmsError {
    if e.is_timeout() {
        PmsError::Transport("request timed out".to_string())
    } else {
        PmsError::Transport(e.to_string())
    }
}

/// Decodes an envelope body. A 5xx without a readable envelope is an upstream outage; other
/// non-2xx responses without one become rejections carrying the HTTP status as their code.
pub fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, PmsError> {
    match serde_json::from_str::<Envelope<T>>(body) {
        Ok(envelope) => envelope.into_result(),
        Err(_) if status.is_server_error() => {
            Err(PmsError::Transport(format!("PMS responded with {}", status)))
        }
        Err(_) if !status.is_success() => Err(PmsError::Rejected {
            message: format!("PMS responded with {}", status),
            code: Some(status.as_u16().to_string()),
        }),
        Err(e) => Err(PmsError::InvalidResponse(e.to_string())),
    }
}

#[async_trait]
impl PmsClient for HttpPmsClient {
    async fn list_extras(&self) -> Result<Vec<ExtraItem>, PmsError> {
        self.get(EXTRAS_PATH).await
    }

    async fn calculate_extras(
        &self,
        request: &CalculateExtrasRequest,
    ) -> Result<ExtrasChargeQuote, PmsError> {
        self.post(CALCULATE_EXTRAS_PATH, request).await
    }

    async fn list_payment_gateways(&self) -> Result<Vec<PaymentGateway>, PmsError> {
        self.get(PAYMENT_GATEWAYS_PATH).await
    }

    async fn create_booking(
        &self,
        payload: &ReservationPayload,
    ) -> Result<ReservationReceipt, PmsError> {
        self.post(CREATE_BOOKING_PATH, payload).await
    }
}
