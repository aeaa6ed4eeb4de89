//! Blocking client for a social network REST api.
//!
//! Each page of the network is modelled as a view: plain state plus operations that send requests
//! through an [`Api`] and apply the responses. Requests are stamped with a [`lifecycle::Ticket`],
//! so a response that arrives after its view was unmounted or re-triggered is dropped.
//!
//! ```no_run
//! use social_client::{SocialClient, Session, SearchView};
//!
//! let client = SocialClient::from_env()?;
//! let session = Session::login(&client, "ana@example.com", "password")?;
//! let mut search = SearchView::new();
//! search.search(&client, &session, "bia");
//! for user in search.results() {
//!     println!("{} ({})", user.username, user.follow_label());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod profile;
pub mod search;
pub mod session;
pub mod transport;
pub mod tweets;

#[cfg(test)]
mod testing;

pub use client::SocialClient;
pub use config::{ApiConfig, Environment};
pub use endpoints::{Endpoint, Endpoints};
pub use error::{ApiError, ErrorBody};
pub use profile::{Avatar, Connection, DisplayMode, ProfileDraft, ProfileView, StatusMessage};
pub use search::{SearchResult, SearchView};
pub use session::Session;
pub use transport::{Api, ApiRequest, ApiResponse};
pub use tweets::{Comment, TimelineView, Tweet};
