//! REST backend seam and its reqwest implementation
use super::config::ApiConfig;
use super::error::{ClientError, ClientResult};
use super::session::Credential;
use super::types::{
    Booking, BookingStatus, BookingUpdate, CleanupReport, CleanupStatus, ClockTime, NewBooking,
    Priority, Registration, Role, Room, TimeStamp, User,
};
use super::utils::{REQUEST_ID_HEADER, new_request_id};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ROOM_IMAGE: &str = "https://images.unsplash.com/photo-1497366754035-f200968a6e72?auto=format&fit=crop&q=80&w=1000";

/// Everything the client asks of the booking backend.
///
/// The backend owns persistence, conflict enforcement and authorization.
/// Implementations only move requests and decode answers.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    /// Bearer token sent with every following request, `None` to stop sending one.
    fn set_token(&mut self, token: Option<String>);

    async fn login(&self, email: &str, password: &str) -> ClientResult<Credential>;
    async fn me(&self) -> ClientResult<User>;
    async fn register(&self, registration: &Registration) -> ClientResult<User>;

    async fn rooms(&self) -> ClientResult<Vec<Room>>;
    async fn bookings(&self) -> ClientResult<Vec<Booking>>;

    async fn create_booking(&self, booking: &NewBooking) -> ClientResult<Booking>;
    async fn update_booking(&self, id: &str, update: &BookingUpdate) -> ClientResult<Booking>;
    async fn approve_booking(&self, id: &str) -> ClientResult<Booking>;
    async fn reject_booking(&self, id: &str, notes: &str) -> ClientResult<Booking>;
    async fn cancel_booking(&self, id: &str, notes: Option<&str>) -> ClientResult<Booking>;
    async fn delete_booking(&self, id: &str) -> ClientResult<()>;

    async fn cleanup_status(&self) -> ClientResult<CleanupStatus>;
    async fn toggle_cleanup(&self, enabled: bool) -> ClientResult<bool>;
    async fn run_cleanup_now(&self) -> ClientResult<CleanupReport>;
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct NotesBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<&'a str>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Deserialize)]
struct ToggleResponse {
    enabled: bool,
}

#[derive(Deserialize)]
struct RunNowResponse {
    result: CleanupReport,
}

/// FastAPI error body, `detail` is a string or a list of validation errors.
#[derive(Deserialize)]
struct ApiErrorResponse {
    detail: serde_json::Value,
}

#[derive(Deserialize)]
pub(crate) struct RoomRecord {
    id: String,
    name: String,
    #[serde(default)]
    floor: Option<String>,
    #[serde(default)]
    room_number: Option<String>,
    #[serde(default)]
    capacity: Option<u32>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    features: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub(crate) struct BookingRecord {
    id: String,
    user_id: String,
    #[serde(default)]
    user_name: Option<String>,
    room_id: String,
    #[serde(default)]
    room_name: Option<String>,
    date: NaiveDate,
    start_time: ClockTime,
    end_time: ClockTime,
    title: String,
    attendees: u32,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<Priority>,
    #[serde(default)]
    status: Option<BookingStatus>,
    #[serde(default)]
    equipment: Option<Vec<String>>,
    created_at: TimeStamp,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct UserRecord {
    id: String,
    email: String,
    name: String,
    role: Role,
    #[serde(default)]
    avatar: Option<String>,
}

impl From<RoomRecord> for Room {
    fn from(r: RoomRecord) -> Self {
        Room {
            id: r.id,
            name: r.name,
            floor: r.floor.unwrap_or_default(),
            room_number: r.room_number.unwrap_or_default(),
            capacity: r.capacity.unwrap_or(0),
            image_url: r
                .image_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| DEFAULT_ROOM_IMAGE.to_string()),
            features: r.features.unwrap_or_default(),
        }
    }
}

impl From<BookingRecord> for Booking {
    fn from(r: BookingRecord) -> Self {
        Booking {
            id: r.id,
            user_id: r.user_id,
            user_name: r.user_name.unwrap_or_else(|| "Unknown".to_string()),
            room_id: r.room_id,
            room_name: r.room_name.unwrap_or_else(|| "Unknown Room".to_string()),
            date: r.date,
            start_time: r.start_time,
            end_time: r.end_time,
            title: r.title,
            attendees: r.attendees,
            description: r.description.unwrap_or_default(),
            priority: r.priority.unwrap_or_default(),
            // an absent status is a freshly created request
            status: r.status.unwrap_or_default(),
            equipment: r.equipment.unwrap_or_default(),
            created_at: r.created_at,
            notes: r.notes,
        }
    }
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        let avatar = r
            .avatar
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| User::generated_avatar(&r.name, r.role));
        User {
            id: r.id,
            email: r.email,
            name: r.name,
            role: r.role,
            avatar: Some(avatar),
        }
    }
}

/// Talks to the backend over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let request_id = new_request_id();
        debug!(%method, %url, %request_id, "backend request");

        let mut req = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> ClientResult<reqwest::Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(body) => match body.detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            },
            Err(_) => text,
        };
        debug!(status = status.as_u16(), %message, "backend rejected request");

        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::BadRequest(message)
            }
            _ => ClientError::Server {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClientResult<T> {
        let response = self.send(req).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn fetch_booking(&self, req: RequestBuilder) -> ClientResult<Booking> {
        let record: BookingRecord = self.fetch(req).await?;
        Ok(record.into())
    }
}

#[async_trait]
impl BookingBackend for HttpBackend {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    async fn login(&self, email: &str, password: &str) -> ClientResult<Credential> {
        let req = self
            .request(Method::POST, "auth/login")
            .json(&LoginRequest { email, password });
        let token: TokenResponse = self.fetch(req).await?;

        Ok(Credential {
            access_token: token.access_token,
            token_type: token.token_type,
        })
    }

    async fn me(&self) -> ClientResult<User> {
        let record: UserRecord = self.fetch(self.request(Method::GET, "auth/me")).await?;
        Ok(record.into())
    }

    async fn register(&self, registration: &Registration) -> ClientResult<User> {
        let req = self
            .request(Method::POST, "users/register")
            .json(registration);
        let record: UserRecord = self.fetch(req).await?;
        Ok(record.into())
    }

    async fn rooms(&self) -> ClientResult<Vec<Room>> {
        let records: Vec<RoomRecord> = self.fetch(self.request(Method::GET, "rooms")).await?;
        Ok(records.into_iter().map(Room::from).collect())
    }

    async fn bookings(&self) -> ClientResult<Vec<Booking>> {
        let records: Vec<BookingRecord> =
            self.fetch(self.request(Method::GET, "bookings")).await?;
        Ok(records.into_iter().map(Booking::from).collect())
    }

    async fn create_booking(&self, booking: &NewBooking) -> ClientResult<Booking> {
        self.fetch_booking(self.request(Method::POST, "bookings").json(booking))
            .await
    }

    async fn update_booking(&self, id: &str, update: &BookingUpdate) -> ClientResult<Booking> {
        let req = self
            .request(Method::PUT, &format!("bookings/{id}"))
            .json(update);
        self.fetch_booking(req).await
    }

    async fn approve_booking(&self, id: &str) -> ClientResult<Booking> {
        self.fetch_booking(self.request(Method::POST, &format!("bookings/{id}/approve")))
            .await
    }

    async fn reject_booking(&self, id: &str, notes: &str) -> ClientResult<Booking> {
        let req = self
            .request(Method::POST, &format!("bookings/{id}/reject"))
            .json(&NotesBody { notes: Some(notes) });
        self.fetch_booking(req).await
    }

    async fn cancel_booking(&self, id: &str, notes: Option<&str>) -> ClientResult<Booking> {
        // the backend reads the note from the query string
        let mut req = self.request(Method::PATCH, &format!("bookings/{id}/cancel"));
        if let Some(notes) = notes {
            req = req.query(&[("notes", notes)]);
        }
        self.fetch_booking(req.json(&NotesBody { notes })).await
    }

    async fn delete_booking(&self, id: &str) -> ClientResult<()> {
        self.send(self.request(Method::DELETE, &format!("bookings/{id}")))
            .await?;
        Ok(())
    }

    async fn cleanup_status(&self) -> ClientResult<CleanupStatus> {
        self.fetch(self.request(Method::GET, "admin/cleanup/status"))
            .await
    }

    async fn toggle_cleanup(&self, enabled: bool) -> ClientResult<bool> {
        let req = self
            .request(Method::POST, "admin/cleanup/toggle")
            .query(&[("enabled", enabled)]);
        let body: ToggleResponse = self.fetch(req).await?;
        Ok(body.enabled)
    }

    async fn run_cleanup_now(&self) -> ClientResult<CleanupReport> {
        let body: RunNowResponse = self
            .fetch(self.request(Method::POST, "admin/cleanup/run-now"))
            .await?;
        Ok(body.result)
    }
}
