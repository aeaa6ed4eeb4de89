use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use crate::endpoints::{Endpoint, Endpoints};
use crate::error::ApiError;
use crate::lifecycle::{Lifecycle, Ticket};
use crate::session::Session;
use crate::transport::{Api, ApiRequest, ApiResponse};

/// A post in the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: u64,
    pub content: String,
    pub username: String,
    pub author_id: u64,
    /// Creation time as sent by the server (ISO 8601)
    #[serde(default)]
    pub timestamp: String,
    /// If the current user follows the author
    #[serde(default)]
    pub is_following: bool,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub liked_by_me: bool,
    #[serde(default)]
    pub replies_count: u64,
    #[serde(default)]
    pub retweets_count: u64,
    #[serde(default)]
    pub handle: String,
}

impl Tweet {

    /// The author's handle, falling back to the username for servers that don't send one
    pub fn handle_or_username(&self) -> &str {
        if self.handle.is_empty() {
            &self.username
        } else {
            &self.handle
        }
    }

}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub tweet: u64,
    pub author: u64,
    pub author_email: String,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
}

/// The feed comes either as a plain list or as a paginated page
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Feed {
    List(Vec<Tweet>),
    Page { results: Vec<Tweet> },
}

impl From<Feed> for Vec<Tweet> {
    fn from(value: Feed) -> Self {
        match value {
            Feed::List(tweets) | Feed::Page { results: tweets } => tweets,
        }
    }
}

/// Body of a successful like toggle. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeResponse {
    #[serde(default, alias = "liked_by_me")]
    pub liked: Option<bool>,
    #[serde(default)]
    pub likes_count: Option<u64>,
}

#[derive(Debug)]
pub struct PendingTimeline {
    pub ticket: Ticket,
    pub request: ApiRequest,
}

/// The feed page: the tweets, their like buttons and the comments loaded so far.
#[derive(Debug, Default)]
pub struct TimelineView {
    lifecycle: Lifecycle,
    /// Advanced by every refresh, so only the latest feed may land
    refreshes: Lifecycle,
    session_token: Option<String>,
    tweets: Vec<Tweet>,
    comments: HashMap<u64, Vec<Comment>>,
    loading: bool,
}

impl TimelineView {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn tweets(&self) -> &[Tweet] {
        &self.tweets
    }

    /// The comments of `tweet_id`, if they were loaded
    pub fn comments(&self, tweet_id: u64) -> Option<&[Comment]> {
        self.comments.get(&tweet_id).map(Vec::as_slice)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    fn ticket_accepted(&self, ticket: &Ticket, lifecycle: &Lifecycle) -> bool {
        ticket.belongs_to(lifecycle) && ticket.is_current()
    }

    /// The feed belongs to the session it was fetched with
    fn follow_session(&mut self, session: &Session) {
        if self.session_token.as_deref() == session.token() {
            return;
        }
        self.session_token = session.token().map(str::to_string);
        self.lifecycle.advance();
        self.refreshes.advance();
        self.tweets.clear();
        self.comments.clear();
        self.loading = false;
    }

    /// Replaces the feed with the server's current one. Failures keep the old feed.
    pub fn refresh(&mut self, api: &impl Api, session: &Session) {
        let Some(PendingTimeline { ticket, request }) = self.begin_refresh(api.endpoints(), session) else { return };
        let outcome = api.send(request);
        self.apply_refresh(&ticket, outcome);
    }

    pub fn begin_refresh(&mut self, endpoints: &Endpoints, session: &Session) -> Option<PendingTimeline> {
        self.follow_session(session);
        let token = session.token()?;
        self.loading = true;
        Some(PendingTimeline {
            ticket: self.refreshes.restart(),
            request: ApiRequest::get(endpoints.url(Endpoint::Tweets)).bearer(token),
        })
    }

    pub fn apply_refresh(&mut self, ticket: &Ticket, outcome: Result<ApiResponse, ApiError>) {
        if !self.ticket_accepted(ticket, &self.refreshes) {
            log::debug!("Dropping superseded feed response");
            return;
        }
        self.loading = false;
        match outcome.and_then(|response| response.json::<Feed>()) {
            Ok(feed) => self.tweets = feed.into(),
            Err(err) => log::error!("Could not fetch tweets: {}", err),
        }
    }

    /// Publishes a tweet and puts it on top of the feed. Blank content is ignored.
    pub fn post_tweet(&mut self, api: &impl Api, session: &Session, content: &str) -> Option<Tweet> {
        let PendingTimeline { ticket, request } = self.begin_post(api.endpoints(), session, content)?;
        let outcome = api.send(request);
        self.apply_post(&ticket, outcome)
    }

    pub fn begin_post(&mut self, endpoints: &Endpoints, session: &Session, content: &str) -> Option<PendingTimeline> {
        self.follow_session(session);
        if content.trim().is_empty() {
            return None;
        }
        let token = session.token()?;
        Some(PendingTimeline {
            ticket: self.lifecycle.ticket(),
            request: ApiRequest::post(endpoints.url(Endpoint::Tweets))
                .bearer(token)
                .json(json!({ "content": content })),
        })
    }

    pub fn apply_post(&mut self, ticket: &Ticket, outcome: Result<ApiResponse, ApiError>) -> Option<Tweet> {
        if !self.ticket_accepted(ticket, &self.lifecycle) {
            log::debug!("Dropping stale tweet response");
            return None;
        }
        match outcome.and_then(|response| response.json::<Tweet>()) {
            Ok(tweet) => {
                self.tweets.insert(0, tweet.clone());
                Some(tweet)
            }
            Err(err) => {
                log::warn!("Could not post tweet: {}", err);
                None
            }
        }
    }

    /// Likes or unlikes a tweet. Only that tweet's row changes, and only on success.
    pub fn toggle_like(&mut self, api: &impl Api, session: &Session, tweet_id: u64) -> Option<LikeResponse> {
        let PendingTimeline { ticket, request } = self.begin_like(api.endpoints(), session, tweet_id)?;
        let outcome = api.send(request);
        self.apply_like(&ticket, tweet_id, outcome)
    }

    pub fn begin_like(&mut self, endpoints: &Endpoints, session: &Session, tweet_id: u64) -> Option<PendingTimeline> {
        self.follow_session(session);
        let token = session.token()?;
        Some(PendingTimeline {
            ticket: self.lifecycle.ticket(),
            request: ApiRequest::post(endpoints.url(Endpoint::LikeTweet(tweet_id))).bearer(token),
        })
    }

    pub fn apply_like(&mut self, ticket: &Ticket, tweet_id: u64, outcome: Result<ApiResponse, ApiError>) -> Option<LikeResponse> {
        if !self.ticket_accepted(ticket, &self.lifecycle) {
            log::debug!("Dropping stale like for tweet {}", tweet_id);
            return None;
        }
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                log::warn!("Could not toggle like for tweet {}: {}", tweet_id, err);
                return None;
            }
        };
        let body = response.json::<LikeResponse>().unwrap_or_default();
        for tweet in self.tweets.iter_mut().filter(|tweet| tweet.id == tweet_id) {
            let liked = body.liked.unwrap_or(!tweet.liked_by_me);
            tweet.likes_count = body.likes_count.unwrap_or(match (tweet.liked_by_me, liked) {
                (false, true) => tweet.likes_count + 1,
                (true, false) => tweet.likes_count.saturating_sub(1),
                _ => tweet.likes_count,
            });
            tweet.liked_by_me = liked;
        }
        Some(body)
    }

    /// Loads the comments of one tweet, replacing those loaded before
    pub fn load_comments(&mut self, api: &impl Api, session: &Session, tweet_id: u64) {
        let Some(PendingTimeline { ticket, request }) = self.begin_comments(api.endpoints(), session, tweet_id) else { return };
        let outcome = api.send(request);
        self.apply_comments(&ticket, tweet_id, outcome);
    }

    pub fn begin_comments(&mut self, endpoints: &Endpoints, session: &Session, tweet_id: u64) -> Option<PendingTimeline> {
        self.follow_session(session);
        let token = session.token()?;
        Some(PendingTimeline {
            ticket: self.lifecycle.ticket(),
            request: ApiRequest::get(endpoints.url(Endpoint::TweetComments(tweet_id))).bearer(token),
        })
    }

    pub fn apply_comments(&mut self, ticket: &Ticket, tweet_id: u64, outcome: Result<ApiResponse, ApiError>) {
        if !self.ticket_accepted(ticket, &self.lifecycle) {
            log::debug!("Dropping stale comments of tweet {}", tweet_id);
            return;
        }
        match outcome.and_then(|response| response.json::<Vec<Comment>>()) {
            Ok(comments) => {
                self.comments.insert(tweet_id, comments);
            }
            Err(err) => log::error!("Could not fetch comments of tweet {}: {}", tweet_id, err),
        }
    }

    /// Comments on a tweet. The new comment is appended to the loaded ones and counted on the tweet.
    pub fn add_comment(&mut self, api: &impl Api, session: &Session, tweet_id: u64, content: &str) -> Option<Comment> {
        let PendingTimeline { ticket, request } = self.begin_add_comment(api.endpoints(), session, tweet_id, content)?;
        let outcome = api.send(request);
        self.apply_add_comment(&ticket, tweet_id, outcome)
    }

    pub fn begin_add_comment(&mut self, endpoints: &Endpoints, session: &Session, tweet_id: u64, content: &str) -> Option<PendingTimeline> {
        self.follow_session(session);
        if content.trim().is_empty() {
            return None;
        }
        let token = session.token()?;
        Some(PendingTimeline {
            ticket: self.lifecycle.ticket(),
            request: ApiRequest::post(endpoints.url(Endpoint::AddComment(tweet_id)))
                .bearer(token)
                .json(json!({ "content": content })),
        })
    }

    pub fn apply_add_comment(&mut self, ticket: &Ticket, tweet_id: u64, outcome: Result<ApiResponse, ApiError>) -> Option<Comment> {
        if !self.ticket_accepted(ticket, &self.lifecycle) {
            log::debug!("Dropping stale comment on tweet {}", tweet_id);
            return None;
        }
        match outcome.and_then(|response| response.json::<Comment>()) {
            Ok(comment) => {
                if let Some(comments) = self.comments.get_mut(&tweet_id) {
                    comments.push(comment.clone());
                }
                for tweet in self.tweets.iter_mut().filter(|tweet| tweet.id == tweet_id) {
                    tweet.replies_count += 1;
                }
                Some(comment)
            }
            Err(err) => {
                log::warn!("Could not comment on tweet {}: {}", tweet_id, err);
                None
            }
        }
    }

    /// Invalidates every outstanding request of this view
    pub fn unmount(&mut self) {
        self.lifecycle.advance();
        self.refreshes.advance();
        self.loading = false;
    }

}
