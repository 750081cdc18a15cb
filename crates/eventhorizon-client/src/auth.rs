//! Authentication adapters.
//!
//! Exactly one strategy is active per client: no auth, a signed
//! caller-identity proof carried in the `Authorization` header, or delegated
//! authentication descriptors attached as headers. Adapters run after body
//! marshalling so a signed proof binds to the exact outbound body.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Error;

type HmacSha256 = Hmac<Sha256>;

/// Scheme prefix of the `Authorization` header for signed-identity auth.
pub const SIGNED_IDENTITY_SCHEME: &str = "sts:GetCallerIdentity";

/// Header binding a signed proof to the outbound request body.
pub const REQUEST_HASH_HEADER: &str = "X-Event-Horizon-Request-Hash";

pub const DELEGATED_PRINCIPAL_HEADER: &str = "X-EventHorizon-Delegated-Principal";
pub const DELEGATED_SESSION_HEADER: &str = "X-EventHorizon-Delegated-Session";
pub const DELEGATED_SIGNATURE_HEADER: &str = "X-EventHorizon-Delegated-Signature";

const STS_URL: &str = "https://sts.amazonaws.com/";
const STS_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";
const SIGNING_PREFIX: &str = "EH1";
const SIGNING_SCOPE: &str = "eventhorizon_request";

/// Time source for signing; tests pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Mutates an outgoing request to attach credentials. Implementations must
/// be safe for concurrent use by the request pipeline.
pub trait AuthAdapter: Send + Sync {
    fn adapt(&self, request: &mut reqwest::Request) -> Result<(), Error>;
}

/// The default adapter: no modification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl AuthAdapter for NoAuth {
    fn adapt(&self, _request: &mut reqwest::Request) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// A serialized, signed `GetCallerIdentity` request. The service replays the
/// signature check and verifies that `request_hash` matches the body of the
/// request the proof arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCallerIdentity {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Url")]
    pub url: String,
    #[serde(rename = "AmzDate")]
    pub amz_date: String,
    #[serde(rename = "AccessKeyID")]
    pub access_key_id: String,
    #[serde(rename = "SessionToken", default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    #[serde(rename = "RequestHash")]
    pub request_hash: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "Signature")]
    pub signature: String,
}

impl SignedCallerIdentity {
    /// Signs a caller-identity request at `now`, binding `request_hash`.
    pub fn sign(
        credentials: &Credentials,
        now: DateTime<Utc>,
        request_hash: &str,
    ) -> Result<Self, Error> {
        let amz_date = format_amz_date(now);
        let mut signed = Self {
            method: "POST".to_string(),
            url: STS_URL.to_string(),
            amz_date,
            access_key_id: credentials.access_key_id.clone(),
            session_token: credentials.session_token.clone(),
            request_hash: request_hash.to_string(),
            body: STS_BODY.to_string(),
            signature: String::new(),
        };
        signed.signature = signed.compute_signature(&credentials.secret_access_key)?;
        Ok(signed)
    }

    /// Recomputes the signature under `credentials` at the clock's instant
    /// and checks it together with the identity and date fields.
    pub fn verify(&self, credentials: &Credentials, clock: &dyn Clock) -> Result<(), Error> {
        if self.access_key_id != credentials.access_key_id {
            return Err(Error::validation("access key id mismatch"));
        }
        if self.amz_date != format_amz_date(clock.now()) {
            return Err(Error::validation("signing date mismatch"));
        }
        let expected = self.compute_signature(&credentials.secret_access_key)?;
        if self.signature != expected {
            return Err(Error::validation("signature mismatch"));
        }
        Ok(())
    }

    /// SigV4-style chained derivation: a date key scoped to this service,
    /// then an HMAC over the canonical request string.
    fn compute_signature(&self, secret_access_key: &str) -> Result<String, Error> {
        let canonical = format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}",
            self.method,
            self.url,
            self.amz_date,
            self.access_key_id,
            self.session_token.as_deref().unwrap_or(""),
            self.request_hash,
            self.body,
        );
        let date_stamp = self.amz_date.get(..8).unwrap_or(&self.amz_date);
        let secret = format!("{SIGNING_PREFIX}{secret_access_key}");
        let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes())?;
        let k_signing = hmac_sha256(&k_date, SIGNING_SCOPE.as_bytes())?;
        let signature = hmac_sha256(&k_signing, canonical.as_bytes())?;
        Ok(hex::encode(signature))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| Error::validation("invalid hmac key length"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn format_amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Hex SHA-256 of the request body (empty bodies hash the empty string).
pub fn request_body_hash(request: &reqwest::Request) -> String {
    let body = request
        .body()
        .and_then(reqwest::Body::as_bytes)
        .unwrap_or_default();
    hex::encode(Sha256::digest(body))
}

/// Attaches a pre-computed caller-identity proof:
/// `Authorization: sts:GetCallerIdentity <base64-of-signed-request>` plus
/// the request-hash binding header.
pub struct SignedIdentityAuth {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
}

impl SignedIdentityAuth {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_clock(credentials, Arc::new(SystemClock))
    }

    pub fn with_clock(credentials: Credentials, clock: Arc<dyn Clock>) -> Self {
        Self { credentials, clock }
    }
}

impl AuthAdapter for SignedIdentityAuth {
    fn adapt(&self, request: &mut reqwest::Request) -> Result<(), Error> {
        let request_hash = request_body_hash(request);
        let signed = SignedCallerIdentity::sign(&self.credentials, self.clock.now(), &request_hash)?;
        let payload = serde_json::to_vec(&signed).map_err(Error::decode)?;
        let authorization = format!("{SIGNED_IDENTITY_SCHEME} {}", STANDARD.encode(payload));

        let headers = request.headers_mut();
        headers.insert(REQUEST_HASH_HEADER, header_value(&request_hash)?);
        headers.insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }
}

/// Caller identity the service should impersonate on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedAuthInfo {
    #[serde(rename = "Principal")]
    pub principal: String,
    #[serde(rename = "SessionName")]
    pub session_name: String,
    #[serde(rename = "Signature")]
    pub signature: String,
}

/// Serializes a [`DelegatedAuthInfo`] into request headers.
pub struct DelegatedAuth {
    info: DelegatedAuthInfo,
}

impl DelegatedAuth {
    pub fn new(info: DelegatedAuthInfo) -> Self {
        Self { info }
    }
}

impl AuthAdapter for DelegatedAuth {
    fn adapt(&self, request: &mut reqwest::Request) -> Result<(), Error> {
        let headers = request.headers_mut();
        headers.insert(DELEGATED_PRINCIPAL_HEADER, header_value(&self.info.principal)?);
        headers.insert(DELEGATED_SESSION_HEADER, header_value(&self.info.session_name)?);
        headers.insert(DELEGATED_SIGNATURE_HEADER, header_value(&self.info.signature)?);
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::validation("header value contains invalid characters"))
}
