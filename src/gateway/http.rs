use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{BookingListResponse, BookingResponse};
use super::{
    Booking, CreateBookingRequest, DriverAssignment, EmailRequest, Gateway, LoginRequest,
    LoginResponse, MessageResponse, ProfileUpdate, ResetPasswordRequest, SignupRequest,
};
use crate::config::ApiConfig;
use crate::error::ClientError;

/// A response that made it back from the server with a 2xx status.
struct Reply {
    status: StatusCode,
    raw: String,
    body: Option<Value>,
}

impl Reply {
    fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        let Some(body) = self.body else {
            return Err(ClientError::Malformed(self.raw));
        };
        serde_json::from_value(body).map_err(|e| {
            debug!(status = %self.status, error = %e, "Unexpected response shape");
            ClientError::Malformed(self.raw)
        })
    }

    fn message(&self) -> Option<String> {
        self.body
            .as_ref()
            .and_then(|b| b.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// JSON-over-HTTPS gateway.
pub struct HttpGateway {
    base_url: Option<String>,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(format!("ridebook/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Misconfigured(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    fn url(&self, path: &str) -> Result<String, ClientError> {
        match &self.base_url {
            Some(base) => Ok(format!("{}{}", base, path)),
            None => Err(ClientError::Misconfigured(
                "no backend base URL configured".to_string(),
            )),
        }
    }

    fn authorized(builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.bearer_auth(token)
    }

    /// Send a request and split the outcome into the error taxonomy.
    ///
    /// Bodies are read as text first so that non-JSON replies (proxy error
    /// pages, plain-text errors) still produce a readable message.
    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Reply, ClientError> {
        let request_id = uuid::Uuid::new_v4();
        let response = builder
            .header("X-Request-Id", request_id.to_string())
            .send()
            .await
            .map_err(|e| {
                warn!(request = %what, request_id = %request_id, error = %e, "Request failed");
                ClientError::Network(e.to_string())
            })?;

        let status = response.status();
        let raw = response.text().await.map_err(ClientError::from)?;
        let body = serde_json::from_str::<Value>(&raw).ok();
        debug!(request = %what, request_id = %request_id, status = %status, "Response received");

        let reply = Reply { status, raw, body };

        if !status.is_success() {
            let message = match &reply.body {
                Some(_) => reply.message(),
                None => Some(reply.raw.clone()),
            };
            return Err(ClientError::rejected(status.as_u16(), message));
        }

        let declined = reply
            .body
            .as_ref()
            .and_then(|b| b.get("success"))
            .and_then(Value::as_bool)
            == Some(false);
        if declined {
            return Err(ClientError::rejected(status.as_u16(), reply.message()));
        }

        Ok(reply)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<Reply, ClientError> {
        let mut builder = self.client.post(self.url(path)?).json(body);
        if let Some(token) = token {
            builder = Self::authorized(builder, token);
        }
        self.send(builder, path).await
    }

    async fn get_authorized(&self, path: &str, token: &str) -> Result<Reply, ClientError> {
        let builder = Self::authorized(self.client.get(self.url(path)?), token);
        self.send(builder, path).await
    }
}

fn encode_id(id: &str) -> Result<&str, ClientError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(id)
    } else {
        Err(ClientError::validation(format!("Invalid booking id '{}'", id)))
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.post_json("/auth/login", None, req).await?.decode()
    }

    async fn signup(&self, req: &SignupRequest) -> Result<Option<String>, ClientError> {
        let reply = self.post_json("/auth/signup", None, req).await?;
        Ok(reply.message())
    }

    async fn send_otp(&self, email: &str) -> Result<(), ClientError> {
        let body = EmailRequest {
            email: email.to_string(),
        };
        self.post_json("/auth/sendotp", None, &body).await?;
        Ok(())
    }

    async fn reset_otp(&self, email: &str) -> Result<(), ClientError> {
        let body = EmailRequest {
            email: email.to_string(),
        };
        self.post_json("/auth/resetOtp", None, &body).await?;
        Ok(())
    }

    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), ClientError> {
        self.post_json("/auth/resetPassword", None, req).await?;
        Ok(())
    }

    async fn create_booking(
        &self,
        token: &str,
        req: &CreateBookingRequest,
    ) -> Result<(), ClientError> {
        let reply = self
            .post_json("/booking/createbooking", Some(token), req)
            .await?;
        if reply.status != StatusCode::CREATED {
            debug!(status = %reply.status, "Booking accepted with non-201 status");
        }
        Ok(())
    }

    async fn list_bookings(&self, token: &str) -> Result<Vec<Booking>, ClientError> {
        let list: BookingListResponse = self
            .get_authorized("/booking/getallbookings", token)
            .await?
            .decode()?;
        Ok(list.bookings)
    }

    async fn user_bookings(&self, token: &str) -> Result<Vec<Booking>, ClientError> {
        let list: BookingListResponse = self
            .get_authorized("/booking/user/bookings", token)
            .await?
            .decode()?;
        Ok(list.bookings)
    }

    async fn get_booking(&self, token: &str, id: &str) -> Result<Booking, ClientError> {
        let path = format!("/booking/getbooking/{}", encode_id(id)?);
        let found: BookingResponse = self.get_authorized(&path, token).await?.decode()?;
        Ok(found.booking)
    }

    async fn assign_driver(
        &self,
        token: &str,
        id: &str,
        driver: &DriverAssignment,
    ) -> Result<(), ClientError> {
        let path = format!("/booking/assign-driver/{}", encode_id(id)?);
        let builder = Self::authorized(self.client.put(self.url(&path)?), token).json(driver);
        let reply = self.send(builder, &path).await?;

        // This endpoint must say yes explicitly
        let ack: MessageResponse = reply.decode()?;
        match ack.success {
            Some(true) => Ok(()),
            _ => Err(ClientError::rejected(200, ack.message)),
        }
    }

    async fn delete_booking(&self, token: &str, id: &str) -> Result<(), ClientError> {
        let path = format!("/booking/deletebooking/{}", encode_id(id)?);
        let builder = Self::authorized(self.client.delete(self.url(&path)?), token);
        self.send(builder, &path).await?;
        Ok(())
    }

    async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<(), ClientError> {
        let mut form = multipart::Form::new()
            .text("username", update.username.clone())
            .text("phone", update.phone.clone())
            .text("email", update.email.clone());
        if let Some(password) = &update.password {
            form = form.text("password", password.clone());
        }
        if let Some(image) = &update.image {
            let part = multipart::Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)
                .map_err(|e| ClientError::validation(format!("Invalid image type: {}", e)))?;
            form = form.part("image", part);
        }

        let builder = Self::authorized(self.client.put(self.url("/user/update")?), token)
            .multipart(form);
        self.send(builder, "/user/update").await?;
        Ok(())
    }
}
