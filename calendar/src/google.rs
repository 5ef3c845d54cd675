// calendar/src/google.rs
//
// Google Calendar REST client. OAuth code exchange and token refresh talk to
// the Google token endpoint; event writes go to the Calendar v3 events
// resource. Everything the worker needs sits behind `CalendarApi` so tests
// substitute a mock.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use models::{ClinicError, ClinicResult};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";
const SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

/// OAuth client settings, loaded from server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// IANA timezone the clinic's shift times are expressed in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Asia/Jakarta".to_string()
}

/// Google token endpoint response, shared by code exchange and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs))
    }
}

/// The event fields the worker pushes. Times are clinic-local wall clock
/// (`HH:MM`) on the schedule date, tagged with the configured timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Creates an event, returning the external event id.
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> ClinicResult<String>;

    /// Overwrites an existing event, returning its (unchanged) id.
    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &EventPayload,
    ) -> ClinicResult<String>;

    /// Exchanges a refresh token for a fresh access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> ClinicResult<TokenResponse>;
}

#[derive(Clone)]
pub struct GoogleCalendarApi {
    http: reqwest::Client,
    config: GoogleConfig,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    id: String,
}

impl GoogleCalendarApi {
    pub fn new(config: GoogleConfig) -> Self {
        GoogleCalendarApi {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// The consent URL the browser is sent to; `state` carries the user id
    /// back through the redirect.
    pub fn auth_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            AUTH_URL, self.config.client_id, self.config.redirect_uri, SCOPE, state
        )
    }

    /// Redeems the authorization code from the OAuth callback.
    pub async fn exchange_code(&self, code: &str) -> ClinicResult<TokenResponse> {
        self.token_request(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> ClinicResult<TokenResponse> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(form)
            .send()
            .await
            .map_err(|e| ClinicError::External(format!("token endpoint unreachable: {}", e)))?;
        if !response.status().is_success() {
            return Err(ClinicError::External(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ClinicError::External(format!("malformed token response: {}", e)))
    }

    fn event_body(&self, event: &EventPayload) -> serde_json::Value {
        json!({
            "summary": event.summary,
            "description": event.description,
            "start": {
                "dateTime": format!("{}T{}:00", event.date, event.start_time),
                "timeZone": self.config.timezone,
            },
            "end": {
                "dateTime": format!("{}T{}:00", event.date, event.end_time),
                "timeZone": self.config.timezone,
            },
        })
    }

    async fn send_event(
        &self,
        request: reqwest::RequestBuilder,
        access_token: &str,
        event: &EventPayload,
    ) -> ClinicResult<String> {
        let response = request
            .bearer_auth(access_token)
            .json(&self.event_body(event))
            .send()
            .await
            .map_err(|e| ClinicError::External(format!("calendar unreachable: {}", e)))?;
        if !response.status().is_success() {
            return Err(ClinicError::External(format!(
                "calendar returned {}",
                response.status()
            )));
        }
        let body = response
            .json::<EventResponse>()
            .await
            .map_err(|e| ClinicError::External(format!("malformed event response: {}", e)))?;
        Ok(body.id)
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarApi {
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> ClinicResult<String> {
        let url = format!("{}/calendars/{}/events", CALENDAR_API, calendar_id);
        self.send_event(self.http.post(url), access_token, event)
            .await
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &EventPayload,
    ) -> ClinicResult<String> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API, calendar_id, event_id
        );
        self.send_event(self.http.put(url), access_token, event)
            .await
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> ClinicResult<TokenResponse> {
        self.token_request(&[
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}
