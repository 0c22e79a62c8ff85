//! Sign-in, sign-out, cold-start restore, sign-up and password reset.

use tracing::{info, warn};

use super::{reject, submit};
use crate::error::{ClientError, FieldErrors};
use crate::gateway::{LoginRequest, ResetPasswordRequest, SignupRequest};
use crate::inflight::ActionKey;
use crate::notify::Notice;
use crate::router::Event;
use crate::session::{Profile, RestoreOutcome, Role};
use crate::validation::{
    keep_digits, keep_letters, validate_email, validate_password_strength, validate_username,
};
use crate::AppState;

pub const OTP_LENGTH: usize = 4;

const FILL_ALL_FIELDS: &str = "Please fill in all fields";

/// Four single-digit cells of a one-time code sent by email.
///
/// A resend clears the cells; a successful sign-up or reset consumes the
/// challenge for good.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    email: String,
    cells: [Option<u8>; OTP_LENGTH],
    consumed: bool,
}

impl OtpChallenge {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            cells: [None; OTP_LENGTH],
            consumed: false,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Type into one cell. Non-digits are dropped; only the last digit typed stays.
    pub fn set_cell(&mut self, index: usize, input: &str) -> Result<(), ClientError> {
        if index >= OTP_LENGTH {
            return Err(ClientError::validation(format!(
                "OTP cell {} does not exist",
                index + 1
            )));
        }
        let digits = keep_digits(input, None);
        if digits.rejected {
            return Err(ClientError::validation("OTP can only contain digits (0-9)"));
        }
        self.cells[index] = digits
            .value
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map(|d| d as u8);
        Ok(())
    }

    /// Fill every cell from a pasted code such as `"1234"`.
    pub fn fill(&mut self, code: &str) -> Result<(), ClientError> {
        let code = code.trim();
        if code.chars().count() != OTP_LENGTH {
            return Err(ClientError::validation("Please enter the 4-digit OTP"));
        }
        for (i, c) in code.chars().enumerate() {
            self.set_cell(i, &c.to_string())?;
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        !self.consumed && self.cells.iter().all(Option::is_some)
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// The concatenated code, once all cells hold a digit.
    pub fn code(&self) -> Option<String> {
        if !self.is_complete() {
            return None;
        }
        Some(self.cells.iter().flatten().map(|d| d.to_string()).collect())
    }

    fn require_code(&self) -> Result<String, ClientError> {
        if self.consumed {
            return Err(ClientError::validation(
                "This code has already been used. Please request a new one.",
            ));
        }
        self.code()
            .ok_or_else(|| ClientError::validation("Please enter the 4-digit OTP"))
    }

    fn invalidate(&mut self) {
        self.cells = [None; OTP_LENGTH];
        self.consumed = false;
    }

    fn consume(&mut self) {
        self.cells = [None; OTP_LENGTH];
        self.consumed = true;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub username: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Typed username input, letters only. Returns true when something was dropped.
    pub fn set_username(&mut self, input: &str) -> bool {
        let sanitized = keep_letters(input);
        self.username = sanitized.value;
        sanitized.rejected
    }

    /// Typed phone input, digits only. Returns true when something was dropped.
    pub fn set_phone(&mut self, input: &str) -> bool {
        let sanitized = keep_digits(input, Some(10));
        self.phone = sanitized.value;
        sanitized.rejected
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let required = [
            &self.username,
            &self.phone,
            &self.email,
            &self.password,
            &self.confirm_password,
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            errors.add("form", FILL_ALL_FIELDS);
            return errors;
        }

        if let Err(e) = validate_username(&self.username) {
            errors.add("username", e);
        }
        if keep_digits(&self.phone, None).rejected {
            errors.add("phone", "Phone Number can only contain digits (0-9)");
        } else if self.phone.len() != 10 {
            errors.add("phone", "Phone number must be exactly 10 digits");
        }
        if validate_email(&self.email).is_err() {
            errors.add("email", "Invalid email address");
        }
        if self.password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }
        errors
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetForm {
    pub new_password: String,
    pub confirm_password: String,
}

impl ResetForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Err(e) = validate_password_strength(&self.new_password) {
            errors.add("new_password", e);
        }
        if self.new_password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }
        errors
    }
}

/// Cold start: hydrate the session from storage and mount the right stack.
/// Failures are silent.
pub async fn restore_session(state: &AppState) -> RestoreOutcome {
    let outcome = state.session.restore().await;
    let role = match outcome {
        RestoreOutcome::Restored(role) => Some(role),
        RestoreOutcome::Anonymous => None,
    };
    if let Err(e) = state.navigate(Event::Restored(role)) {
        warn!(error = %e, "Restore did not change route");
    }
    outcome
}

pub async fn sign_in(state: &AppState, email: &str, password: &str) -> Result<Role, ClientError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return reject(state, "Error", ClientError::validation(FILL_ALL_FIELDS));
    }
    if state.session.is_authenticated() {
        return reject(
            state,
            "Error",
            ClientError::validation("Already signed in. Sign out first."),
        );
    }

    let req = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    let res = submit(state, ActionKey::SignIn, "Error", || state.gateway.login(&req)).await?;

    // An unrecognized role leaves nothing behind: no session, no transition
    let role = match res.user.role.parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
            warn!(role = %res.user.role, "Login returned an unknown role");
            return reject(state, "Error", e);
        }
    };

    let profile = Profile {
        name: res.user.username.clone(),
        phone: res.user.phone.clone().unwrap_or_default(),
        email: res.user.email.clone().unwrap_or_else(|| email.to_string()),
        picture_uri: res.user.image.clone(),
    };
    state.session.login(res.token, role, profile).await;
    state.navigate(Event::LoggedIn(role))?;

    state.notify(Notice::success(
        "Sign In",
        format!("Welcome, {}", res.user.username),
    ));
    Ok(role)
}

/// Safe to call with no session.
pub async fn sign_out(state: &AppState) {
    let was_authenticated = state.session.is_authenticated();
    state.session.logout().await;
    if let Err(e) = state.navigate(Event::LoggedOut) {
        warn!(error = %e, "Sign-out did not change route");
    }
    if was_authenticated {
        state.notify(Notice::success("Success", "You have been signed out"));
    }
}

/// Validate the form and email a sign-up code.
pub async fn send_signup_otp(
    state: &AppState,
    form: &SignupForm,
) -> Result<OtpChallenge, ClientError> {
    form.validate().finish().or_else(|e| reject(state, "Error", e))?;

    let email = form.email.trim().to_string();
    submit(state, ActionKey::SendOtp, "Error", || state.gateway.send_otp(&email)).await?;

    info!("Sign-up code sent");
    state.notify(Notice::success("OTP Sent", format!("A code was sent to {}", email)));
    Ok(OtpChallenge::new(email))
}

/// Request a fresh code; whatever was typed into the old one is discarded.
pub async fn resend_signup_otp(
    state: &AppState,
    challenge: &mut OtpChallenge,
) -> Result<(), ClientError> {
    let email = challenge.email().to_string();
    submit(state, ActionKey::SendOtp, "Error", || state.gateway.send_otp(&email)).await?;
    challenge.invalidate();
    state.notify(Notice::success("OTP Sent", format!("A new code was sent to {}", email)));
    Ok(())
}

pub async fn sign_up(
    state: &AppState,
    form: &SignupForm,
    challenge: &mut OtpChallenge,
) -> Result<(), ClientError> {
    form.validate().finish().or_else(|e| reject(state, "Error", e))?;
    let otp = challenge.require_code().or_else(|e| reject(state, "Error", e))?;

    let req = SignupRequest {
        username: form.username.clone(),
        phone: form.phone.clone(),
        email: challenge.email().to_string(),
        password: form.password.clone(),
        confirm_password: form.confirm_password.clone(),
        otp,
    };
    let message = submit(state, ActionKey::SignUp, "Error", || state.gateway.signup(&req)).await?;

    challenge.consume();
    state.navigate(Event::SignedUp)?;
    info!("Account created");
    state.notify(Notice::success(
        "Success",
        message.unwrap_or_else(|| "Account Created Successfully".to_string()),
    ));
    Ok(())
}

/// Email a password-reset code.
pub async fn request_password_reset(
    state: &AppState,
    email: &str,
) -> Result<OtpChallenge, ClientError> {
    let email = email.trim().to_string();
    validate_email(&email).or_else(|e| reject(state, "Error", ClientError::validation(e)))?;

    submit(state, ActionKey::SendOtp, "Error", || state.gateway.reset_otp(&email)).await?;
    state.notify(Notice::success("OTP Sent", format!("A code was sent to {}", email)));
    Ok(OtpChallenge::new(email))
}

pub async fn resend_reset_code(
    state: &AppState,
    challenge: &mut OtpChallenge,
) -> Result<(), ClientError> {
    let email = challenge.email().to_string();
    submit(state, ActionKey::SendOtp, "Error", || state.gateway.reset_otp(&email)).await?;
    challenge.invalidate();
    state.notify(Notice::success("OTP Sent", format!("A new code was sent to {}", email)));
    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    challenge: &mut OtpChallenge,
    form: &ResetForm,
) -> Result<(), ClientError> {
    let otp = challenge.require_code().or_else(|e| reject(state, "Error", e))?;
    form.validate().finish().or_else(|e| reject(state, "Error", e))?;

    let req = ResetPasswordRequest {
        email: challenge.email().to_string(),
        otp,
        new_password: form.new_password.clone(),
        confirm_password: form.confirm_password.clone(),
    };
    submit(state, ActionKey::ResetPassword, "Error", || {
        state.gateway.reset_password(&req)
    })
    .await?;

    challenge.consume();
    state.navigate(Event::PasswordReset)?;
    state.notify(Notice::success("Success", "Password reset successful"));
    Ok(())
}
