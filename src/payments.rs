use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::config::{optional_var, required_var, ConfigError};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_API_BASE: &str = "https://api.mercadopago.com";
const DEFAULT_CURRENCY: &str = "USD";
pub const WEBHOOK_PATH: &str = "/api/webhooks/payments";

/// ---------------------------------------------------------------------------
/// Subscription Plan Catalog
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
  pub id: &'static str,
  pub name: &'static str,
  pub price: f64,
  pub period_days: i64,
}

pub static PLANS: [SubscriptionPlan; 3] = [
  SubscriptionPlan {
    id: "basic",
    name: "Basic",
    price: 19.0,
    period_days: 30,
  },
  SubscriptionPlan {
    id: "pro",
    name: "Pro",
    price: 39.0,
    period_days: 30,
  },
  SubscriptionPlan {
    id: "team",
    name: "Team",
    price: 99.0,
    period_days: 30,
  },
];

pub fn find_plan(plan_id: &str) -> Option<&'static SubscriptionPlan> {
  PLANS.iter().find(|plan| plan.id == plan_id)
}

/// ---------------------------------------------------------------------------
/// Gateway Configuration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PaymentConfig {
  pub access_token: String,
  /// Public base URL of this service, without trailing slash
  pub site_url: String,
  pub api_base: String,
  pub currency: String,
}

impl PaymentConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    Ok(Self {
      access_token: required_var("PAYMENT_ACCESS_TOKEN")?,
      site_url: base_url("SITE_URL", required_var("SITE_URL")?)?,
      api_base: base_url("PAYMENT_API_BASE", optional_var("PAYMENT_API_BASE", DEFAULT_API_BASE))?,
      currency: optional_var("PAYMENT_CURRENCY", DEFAULT_CURRENCY).to_ascii_uppercase(),
    })
  }

  pub fn notification_url(&self) -> String {
    format!("{}{}", self.site_url, WEBHOOK_PATH)
  }
}

/// An absolute http(s) URL, returned without its trailing slash
fn base_url(name: &str, raw: String) -> Result<String, ConfigError> {
  match Url::parse(&raw) {
    Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
      Ok(raw.trim_end_matches('/').to_string())
    }
    _ => Err(ConfigError::Invalid {
      name: name.to_string(),
      value: raw,
    }),
  }
}

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("HTTP request failed: {0}")]
  Request(#[from] reqwest::Error),

  #[error("Gateway returned {status}: {body}")]
  Api { status: u16, body: String },

  #[error("Gateway response has no checkout URL")]
  MissingCheckoutUrl,

  #[error("Invalid payment id: {0:?}")]
  InvalidPaymentId(String),

  #[error("Invalid external reference: {0:?}")]
  InvalidReference(String),
}

/// ---------------------------------------------------------------------------
/// External Reference ("{coachId}-{planId}")
/// ---------------------------------------------------------------------------

/// Ties a gateway payment back to the coach and plan it was opened for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
  pub coach_id: Uuid,
  pub plan_id: String,
}

impl ExternalReference {
  pub fn new(coach_id: Uuid, plan_id: impl Into<String>) -> Self {
    Self {
      coach_id,
      plan_id: plan_id.into(),
    }
  }

  /// Split on the last '-': the coach id itself is a hyphenated UUID
  pub fn parse(raw: &str) -> Result<Self, PaymentError> {
    let invalid = || PaymentError::InvalidReference(raw.to_string());

    let (coach, plan) = raw.rsplit_once('-').ok_or_else(invalid)?;
    if plan.is_empty() {
      return Err(invalid());
    }
    let coach_id = Uuid::parse_str(coach).map_err(|_| invalid())?;

    Ok(Self::new(coach_id, plan))
  }
}

impl fmt::Display for ExternalReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.coach_id, self.plan_id)
  }
}

/// ---------------------------------------------------------------------------
/// Checkout Preference
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
  id: &'a str,
  title: String,
  quantity: u32,
  unit_price: f64,
  currency_id: &'a str,
}

#[derive(Debug, Serialize)]
struct BackUrls {
  success: String,
  failure: String,
  pending: String,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest<'a> {
  items: Vec<PreferenceItem<'a>>,
  back_urls: BackUrls,
  auto_return: &'static str,
  external_reference: String,
  notification_url: String,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
  id: String,
  init_point: Option<String>,
  sandbox_init_point: Option<String>,
}

/// Where to send the coach to pay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
  pub preference_id: String,
  pub checkout_url: String,
}

pub async fn create_checkout_preference(
  config: &PaymentConfig,
  coach_id: Uuid,
  plan: &SubscriptionPlan,
) -> Result<Checkout, PaymentError> {
  let client = Client::new();
  let reference = ExternalReference::new(coach_id, plan.id);
  let return_url = |outcome: &str| format!("{}/subscription/{}", config.site_url, outcome);

  let request = PreferenceRequest {
    items: vec![PreferenceItem {
      id: plan.id,
      title: format!("powerlog {} plan", plan.name),
      quantity: 1,
      unit_price: plan.price,
      currency_id: &config.currency,
    }],
    back_urls: BackUrls {
      success: return_url("success"),
      failure: return_url("failure"),
      pending: return_url("pending"),
    },
    auto_return: "approved",
    external_reference: reference.to_string(),
    notification_url: config.notification_url(),
  };

  let response = client
    .post(format!("{}/checkout/preferences", config.api_base))
    .bearer_auth(&config.access_token)
    .json(&request)
    .send()
    .await?;

  if !response.status().is_success() {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    return Err(PaymentError::Api { status, body });
  }

  let preference: PreferenceResponse = response.json().await?;
  let checkout_url = preference
    .init_point
    .or(preference.sandbox_init_point)
    .ok_or(PaymentError::MissingCheckoutUrl)?;

  debug!(preference_id = %preference.id, %reference, "Created checkout preference");

  Ok(Checkout {
    preference_id: preference.id,
    checkout_url,
  })
}

/// ---------------------------------------------------------------------------
/// Payment Lookup
/// ---------------------------------------------------------------------------

/// The gateway sends ids as numbers in some payloads and strings in others
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum GatewayId {
  Number(i64),
  Text(String),
}

impl fmt::Display for GatewayId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GatewayId::Number(n) => write!(f, "{}", n),
      GatewayId::Text(s) => f.write_str(s),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
  pub id: GatewayId,
  pub status: String,
  pub status_detail: Option<String>,
  pub external_reference: Option<String>,
  pub transaction_amount: Option<f64>,
  pub date_approved: Option<DateTime<Utc>>,
}

fn validate_payment_id(payment_id: &str) -> Result<(), PaymentError> {
  if payment_id.is_empty() || !payment_id.chars().all(|c| c.is_ascii_alphanumeric()) {
    return Err(PaymentError::InvalidPaymentId(payment_id.to_string()));
  }
  Ok(())
}

pub async fn fetch_payment(config: &PaymentConfig, payment_id: &str) -> Result<PaymentDetails, PaymentError> {
  validate_payment_id(payment_id)?;
  let client = Client::new();

  let response = client
    .get(format!("{}/v1/payments/{}", config.api_base, payment_id))
    .bearer_auth(&config.access_token)
    .send()
    .await?;

  if !response.status().is_success() {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!(payment_id, status, "Payment lookup failed");
    return Err(PaymentError::Api { status, body });
  }

  let payment: PaymentDetails = response.json().await?;
  Ok(payment)
}

/// ---------------------------------------------------------------------------
/// Webhook Notification
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationData {
  pub id: GatewayId,
}

/// Body of a gateway notification, e.g. `{"type":"payment","data":{"id":123}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentNotification {
  #[serde(rename = "type", alias = "topic")]
  pub kind: Option<String>,
  pub data: Option<NotificationData>,
}

impl PaymentNotification {
  /// The payment id to look up, if this notification is about a payment.
  ///
  /// Falls back to the `type`/`topic` and `data.id`/`id` query parameters
  /// for gateways that send an empty body.
  pub fn payment_id(&self, query: &HashMap<String, String>) -> Option<String> {
    let kind = self
      .kind
      .clone()
      .or_else(|| query.get("type").cloned())
      .or_else(|| query.get("topic").cloned())?;
    if kind != "payment" {
      return None;
    }

    self
      .data
      .as_ref()
      .map(|data| data.id.to_string())
      .or_else(|| query.get("data.id").cloned())
      .or_else(|| query.get("id").cloned())
      .filter(|id| !id.is_empty())
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------
