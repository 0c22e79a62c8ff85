//! Profile editing. Field edits stay local until `confirm_changes`.

use tracing::info;

use super::{reject, submit};
use crate::error::{ClientError, FieldErrors};
use crate::gateway::{ProfileImage, ProfileUpdate};
use crate::inflight::ActionKey;
use crate::notify::Notice;
use crate::router::{Event, RouteState, Screen};
use crate::session::{Profile, ProfileField};
use crate::validation::{validate_email, validate_password_strength, validate_phone};
use crate::AppState;

fn check_field(field: ProfileField, value: &str) -> Result<(), String> {
    match field {
        ProfileField::Name => {
            if value.trim().is_empty()
                || !value.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
            {
                return Err("Name must contain only alphabetical characters".to_string());
            }
            Ok(())
        }
        ProfileField::Phone => validate_phone(value),
        ProfileField::Email => validate_email(value),
        ProfileField::Picture => Ok(()),
    }
}

fn field_key(field: ProfileField) -> &'static str {
    match field {
        ProfileField::Name => "name",
        ProfileField::Phone => "phone",
        ProfileField::Email => "email",
        ProfileField::Picture => "picture",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEditor {
    saved: Profile,
    current: Profile,
    password: Option<String>,
    image: Option<ProfileImage>,
    errors: FieldErrors,
}

impl ProfileEditor {
    pub fn new(profile: Profile) -> Self {
        Self {
            saved: profile.clone(),
            current: profile,
            password: None,
            image: None,
            errors: FieldErrors::new(),
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.current
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Apply one edit. An invalid value is recorded as a field error and the
    /// field keeps its previous value.
    pub fn set_field(&mut self, field: ProfileField, value: &str) -> Result<(), ClientError> {
        let key = field_key(field);
        if let Err(message) = check_field(field, value) {
            self.errors.clear(key);
            self.errors.add(key, message.clone());
            return Err(ClientError::validation(message));
        }
        self.errors.clear(key);
        match field {
            ProfileField::Name => self.current.name = value.to_string(),
            ProfileField::Phone => self.current.phone = value.to_string(),
            ProfileField::Email => self.current.email = value.to_string(),
            ProfileField::Picture => {
                self.current.picture_uri = Some(value.to_string()).filter(|v| !v.is_empty())
            }
        }
        Ok(())
    }

    /// A new password to send with the update. Empty means unchanged.
    pub fn set_password(&mut self, password: &str) -> Result<(), ClientError> {
        self.errors.clear("password");
        if password.is_empty() {
            self.password = None;
            return Ok(());
        }
        if let Err(message) = validate_password_strength(password) {
            self.errors.add("password", message.clone());
            return Err(ClientError::validation(message));
        }
        self.password = Some(password.to_string());
        Ok(())
    }

    /// A freshly picked JPEG picture. `uri` names the local copy and becomes
    /// the cached picture once the update is confirmed.
    pub fn set_picture(&mut self, uri: &str, bytes: Vec<u8>) {
        self.current.picture_uri = Some(uri.to_string()).filter(|v| !v.is_empty());
        self.image = Some(ProfileImage::jpeg(bytes));
    }

    pub fn is_dirty(&self) -> bool {
        self.current != self.saved || self.password.is_some() || self.image.is_some()
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = self.errors.clone();
        for field in [ProfileField::Name, ProfileField::Phone, ProfileField::Email] {
            let value = match field {
                ProfileField::Name => &self.current.name,
                ProfileField::Phone => &self.current.phone,
                _ => &self.current.email,
            };
            if let Err(message) = check_field(field, value) {
                errors.clear(field_key(field));
                errors.add(field_key(field), message);
            }
        }
        errors
    }

    pub fn to_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            username: self.current.name.clone(),
            phone: self.current.phone.clone(),
            email: self.current.email.clone(),
            password: self.password.clone(),
            image: self.image.clone(),
        }
    }

    fn mark_saved(&mut self) {
        self.saved = self.current.clone();
        self.password = None;
        self.image = None;
        self.errors = FieldErrors::new();
    }
}

/// Open the profile screen with an editor over the cached profile.
pub fn edit_profile(state: &AppState) -> Result<ProfileEditor, ClientError> {
    let profile = match state.session.profile() {
        Some(profile) if state.session.is_authenticated() => profile,
        _ => return reject(state, "Error", ClientError::NotAuthenticated),
    };
    if state.router.lock().state() == RouteState::AuthenticatedUser {
        state.navigate(Event::Open(Screen::Profile))?;
    }
    Ok(ProfileEditor::new(profile))
}

/// Edit one field in the editor and mirror it into the session.
pub fn edit_field(
    state: &AppState,
    editor: &mut ProfileEditor,
    field: ProfileField,
    value: &str,
) -> Result<(), ClientError> {
    let title = match field {
        ProfileField::Name => "Invalid Name",
        ProfileField::Phone => "Invalid Phone Number",
        ProfileField::Email => "Invalid Email",
        ProfileField::Picture => "Error",
    };
    editor
        .set_field(field, value)
        .or_else(|e| reject(state, title, e))?;
    state.session.update_profile_field(field, value)
}

/// Send the edited profile and, once accepted, make it the cached one.
pub async fn confirm_changes(
    state: &AppState,
    editor: &mut ProfileEditor,
) -> Result<Profile, ClientError> {
    let token = match state.session.require_token() {
        Ok(token) => token,
        Err(e) => return reject(state, "Error", e),
    };
    editor
        .validate()
        .finish()
        .or_else(|e| reject(state, "Error", e))?;

    let update = editor.to_update();
    submit(state, ActionKey::UpdateProfile, "Error", || {
        state.gateway.update_profile(&token, &update)
    })
    .await?;

    let profile = editor.profile().clone();
    state.session.sync_profile(profile.clone()).await?;
    editor.mark_saved();

    info!(
        password_changed = update.password.is_some(),
        picture_changed = update.image.is_some(),
        "Profile updated"
    );
    state.notify(Notice::success("Success", "Profile updated successfully"));
    Ok(profile)
}
