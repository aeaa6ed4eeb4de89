use std::fmt::{Display, Formatter};
use std::path::Path;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use crate::endpoints::{Endpoint, Endpoints};
use crate::error::{ApiError, ErrorBody};
use crate::lifecycle::{Lifecycle, Ticket};
use crate::session::Session;
use crate::transport::{Api, ApiRequest, ApiResponse, MultipartForm};

pub const UPDATED_TEXT: &str = "Perfil atualizado com sucesso!";
const NO_FOLLOWERS_TEXT: &str = "Nenhum seguidor ainda";
const NOT_FOLLOWING_TEXT: &str = "Você ainda não segue ninguém";

/// The editable part of the current user's profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    pub email: String,
    /// Null on the server is read as an empty bio
    #[serde(default, deserialize_with = "null_as_empty")]
    pub bio: String,
    /// Url of the current avatar, if one was uploaded
    #[serde(default)]
    pub avatar: Option<String>,
}

fn null_as_empty<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// An image picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Avatar {

    /// Reads an image from disk. The mime type is derived from the file extension.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Could not read avatar from {}", path.display()))?;
        let file_name = path.file_name()
            .context("Avatar path has no file name")?
            .to_string_lossy()
            .to_string();
        Ok(Self {
            file_name,
            mime: mime_guess::from_path(path).first_or_octet_stream().to_string(),
            bytes,
        })
    }

}

/// Local state of the edit form. Nothing of it is persisted until it is submitted as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub email: String,
    pub bio: String,
    /// Only sent when set and not empty
    pub new_password: Option<String>,
    /// Only sent when set. The server reads a missing avatar as "keep the current one".
    pub avatar: Option<Avatar>,
}

impl ProfileDraft {

    /// Builds the multipart body of the update request
    pub fn to_form(&self) -> MultipartForm {
        let mut form = MultipartForm::default()
            .text("email", self.email.as_str())
            .text("bio", self.bio.as_str());
        if let Some(password) = self.new_password.as_deref().filter(|p| !p.is_empty()) {
            form = form.text("password", password);
        }
        if let Some(avatar) = &self.avatar {
            form = form.file("avatar", avatar.file_name.as_str(), avatar.mime.as_str(), avatar.bytes.clone());
        }
        form
    }

}

/// A follower or followed user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: u64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connections {
    #[serde(default)]
    pub followers: Vec<Connection>,
    #[serde(default)]
    pub following: Vec<Connection>,
    #[serde(default)]
    pub followers_count: Option<usize>,
    #[serde(default)]
    pub following_count: Option<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Edit,
    Connections,
}

/// The single status line shown above the edit form
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    Updated,
    /// The server refused the update, shown with its payload verbatim
    Rejected(ErrorBody),
    ConnectionError(String),
}

impl Display for StatusMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusMessage::Updated => write!(f, "{}", UPDATED_TEXT),
            StatusMessage::Rejected(body) => write!(f, "Erro: {}", body),
            StatusMessage::ConnectionError(err) => write!(f, "Erro de conexão: {}", err),
        }
    }
}

/// Requests issued when the view (re)mounts, sharing one ticket
#[derive(Debug)]
pub struct ProfileLoad {
    pub ticket: Ticket,
    pub profile: ApiRequest,
    pub connections: ApiRequest,
}

#[derive(Debug)]
pub struct PendingSubmit {
    pub ticket: Ticket,
    pub request: ApiRequest,
}

/// The current user's profile page: the edit form, its status line and the connection lists.
#[derive(Debug, Default)]
pub struct ProfileView {
    lifecycle: Lifecycle,
    synced_token: Option<String>,
    pub profile: ProfileData,
    pub connections: Connections,
    mode: DisplayMode,
    status: Option<StatusMessage>,
}

impl ProfileView {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Switches between editing and the connection lists. Never touches the network.
    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    /// A draft prefilled with the last known profile
    pub fn draft(&self) -> ProfileDraft {
        ProfileDraft {
            email: self.profile.email.clone(),
            bio: self.profile.bio.clone(),
            new_password: None,
            avatar: None,
        }
    }

    /// Loads profile and connections if the session token differs from the last synced one. \
    /// The two fetches are independent: a failure of one leaves the other's result in place.
    pub fn sync(&mut self, api: &impl Api, session: &Session) {
        let Some(ProfileLoad { ticket, profile, connections }) = self.begin_sync(api.endpoints(), session) else { return };
        let profile = api.send(profile);
        self.apply_profile(&ticket, profile);
        let connections = api.send(connections);
        self.apply_connections(&ticket, connections);
    }

    /// Starts a new load generation when the token changed. \
    /// Returns `None` when there is nothing to fetch, either because the token is unchanged or absent.
    pub fn begin_sync(&mut self, endpoints: &Endpoints, session: &Session) -> Option<ProfileLoad> {
        if self.synced_token.as_deref() == session.token() {
            return None;
        }
        self.synced_token = session.token().map(str::to_string);
        // Whatever the previous token was still waiting for is not ours anymore
        let ticket = self.lifecycle.restart();
        let token = session.token()?;
        Some(ProfileLoad {
            ticket,
            profile: ApiRequest::get(endpoints.url(Endpoint::Profile)).bearer(token),
            connections: ApiRequest::get(endpoints.url(Endpoint::FollowersFollowing)).bearer(token),
        })
    }

    pub fn apply_profile(&mut self, ticket: &Ticket, outcome: Result<ApiResponse, ApiError>) {
        if !self.accepts(ticket) {
            log::debug!("Dropping stale profile response");
            return;
        }
        match outcome.and_then(|response| response.json::<ProfileData>()) {
            Ok(profile) => self.profile = profile,
            Err(err) => log::error!("Could not fetch profile: {}", err),
        }
    }

    pub fn apply_connections(&mut self, ticket: &Ticket, outcome: Result<ApiResponse, ApiError>) {
        if !self.accepts(ticket) {
            log::debug!("Dropping stale connections response");
            return;
        }
        match outcome.and_then(|response| response.json::<Connections>()) {
            Ok(connections) => self.connections = connections,
            Err(err) => log::error!("Could not fetch connections: {}", err),
        }
    }

    /// Sends `draft` as one multipart update and records the outcome in [`ProfileView::status()`]
    pub fn submit_profile(&mut self, api: &impl Api, session: &Session, draft: &ProfileDraft) {
        let Some(PendingSubmit { ticket, request }) = self.begin_submit(api.endpoints(), session, draft) else { return };
        let outcome = api.send(request);
        self.apply_submit(&ticket, outcome);
    }

    pub fn begin_submit(&self, endpoints: &Endpoints, session: &Session, draft: &ProfileDraft) -> Option<PendingSubmit> {
        let token = session.token()?;
        let form = draft.to_form();
        log::debug!("Submitting profile update with fields {:?}", form.parts.iter().map(|part| &part.name).collect::<Vec<_>>());
        Some(PendingSubmit {
            ticket: self.lifecycle.ticket(),
            request: ApiRequest::patch(endpoints.url(Endpoint::Profile))
                .bearer(token)
                .multipart(form),
        })
    }

    pub fn apply_submit(&mut self, ticket: &Ticket, outcome: Result<ApiResponse, ApiError>) {
        if !self.accepts(ticket) {
            log::debug!("Dropping stale profile update response");
            return;
        }
        let status = match outcome {
            Ok(response) => {
                match response.json::<ProfileData>() {
                    Ok(profile) => self.profile = profile,
                    Err(err) => log::warn!("Profile updated, but the response could not be read: {}", err),
                }
                log::info!("Profile updated");
                StatusMessage::Updated
            }
            Err(ApiError::Transport(err)) => {
                log::error!("Could not send profile update: {}", err);
                StatusMessage::ConnectionError(err)
            }
            Err(err) => {
                log::warn!("Profile update rejected: {}", err);
                match err.server_body() {
                    Some(body) => StatusMessage::Rejected(body.clone()),
                    None => StatusMessage::ConnectionError(err.to_string()),
                }
            }
        };
        self.status = Some(status);
    }

    /// Invalidates every outstanding request of this view
    pub fn unmount(&mut self) {
        self.lifecycle.advance();
        self.synced_token = None;
    }

    fn accepts(&self, ticket: &Ticket) -> bool {
        ticket.belongs_to(&self.lifecycle) && ticket.is_current()
    }

    pub fn followers_heading(&self) -> String {
        format!("Seguidores ({})", self.connections.followers.len())
    }

    pub fn following_heading(&self) -> String {
        format!("Seguindo ({})", self.connections.following.len())
    }

    /// Shown instead of the follower list when it is empty
    pub fn followers_notice(&self) -> Option<&'static str> {
        self.connections.followers.is_empty().then_some(NO_FOLLOWERS_TEXT)
    }

    pub fn following_notice(&self) -> Option<&'static str> {
        self.connections.following.is_empty().then_some(NOT_FOLLOWING_TEXT)
    }

}
