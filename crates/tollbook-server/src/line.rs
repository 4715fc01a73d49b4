use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tollbook_config::Line;
use tollbook_contracts::ReplyMessageRequest;

/// Base64 HMAC-SHA256 of `body` under the channel secret, as sent in
/// the signature header.
pub fn sign_body(channel_secret: &str, body: &[u8]) -> String {
    match body_mac(channel_secret, body) {
        Some(mac) => STANDARD.encode(mac.finalize().into_bytes()),
        None => String::new(),
    }
}

pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    match body_mac(channel_secret, body) {
        Some(mac) => mac.verify_slice(&expected).is_ok(),
        None => false,
    }
}

fn body_mac(channel_secret: &str, body: &[u8]) -> Option<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(mac)
}

pub struct LineClient {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl LineClient {
    pub fn new(cfg: &Line) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            endpoint: cfg.reply_endpoint.clone(),
            access_token: cfg.channel_access_token.clone(),
        })
    }

    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<(), String> {
        let request = ReplyMessageRequest::text(reply_token, text);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("reply transport error: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("reply rejected with {status}: {detail}"));
        }
        Ok(())
    }
}
