use serde::{Deserialize, Serialize};
use crate::endpoints::{Endpoint, Endpoints};
use crate::error::ApiError;
use crate::lifecycle::{Lifecycle, Ticket};
use crate::session::Session;
use crate::transport::{Api, ApiRequest, ApiResponse};

pub const FOLLOW_LABEL: &str = "Seguir";
pub const FOLLOWING_LABEL: &str = "Seguindo";

/// A user found by [`SearchView::search()`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// If the current user follows this user
    #[serde(alias = "isFollowing")]
    pub is_following: bool,
}

impl SearchResult {

    /// Label of the follow button of this row
    pub fn follow_label(&self) -> &'static str {
        if self.is_following {
            FOLLOWING_LABEL
        } else {
            FOLLOW_LABEL
        }
    }

    /// The bio, if there is anything to show
    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref().filter(|bio| !bio.trim().is_empty())
    }

}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// Body of a successful follow toggle. \
/// Older servers answer with an empty body, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleFollowResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub is_following: Option<bool>,
    #[serde(default)]
    pub followers_count: Option<u64>,
}

#[derive(Debug)]
pub struct PendingSearch {
    pub ticket: Ticket,
    pub request: ApiRequest,
}

#[derive(Debug)]
pub struct PendingToggle {
    pub ticket: Ticket,
    pub user_id: u64,
    pub request: ApiRequest,
}

/// The user search page: a query, its results and the follow buttons of each row.
#[derive(Debug, Default)]
pub struct SearchView {
    /// Bound to the lifetime of the view and to the session it shows results for
    lifecycle: Lifecycle,
    /// Advanced by every new submission, so only the latest search may land
    searches: Lifecycle,
    session_token: Option<String>,
    query: String,
    /// The query `results` were found for
    results_query: String,
    results: Vec<SearchResult>,
    loading: bool,
    searched: bool,
}

impl SearchView {

    pub fn new() -> Self {
        Self::default()
    }

    /// The last submitted query
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Shown when a finished search matched nobody
    pub fn empty_notice(&self) -> Option<String> {
        (!self.loading && self.searched && self.results.is_empty())
            .then(|| format!("Nenhum usuário encontrado para \"{}\"", self.results_query))
    }

    /// Searches users by `query` and replaces the result list with the answer. \
    /// Blank queries and missing tokens are ignored. Failures leave the list as is.
    pub fn search(&mut self, api: &impl Api, session: &Session, query: &str) {
        let Some(PendingSearch { ticket, request }) = self.begin_search(api.endpoints(), session, query) else { return };
        let outcome = api.send(request);
        self.apply_search(&ticket, outcome);
    }

    /// Marks the view as loading and supersedes any search still in flight
    pub fn begin_search(&mut self, endpoints: &Endpoints, session: &Session, query: &str) -> Option<PendingSearch> {
        self.follow_session(session);
        if query.trim().is_empty() {
            return None;
        }
        let token = session.token()?;
        self.query = query.to_string();
        self.loading = true;
        Some(PendingSearch {
            ticket: self.searches.restart(),
            request: ApiRequest::get(endpoints.search(query)).bearer(token),
        })
    }

    pub fn apply_search(&mut self, ticket: &Ticket, outcome: Result<ApiResponse, ApiError>) {
        if !(ticket.belongs_to(&self.searches) && ticket.is_current()) {
            log::debug!("Dropping superseded search response");
            return;
        }
        self.loading = false;
        match outcome.and_then(|response| response.json::<SearchResults>()) {
            Ok(found) => {
                log::debug!("Search for {:?} found {} users", self.query, found.results.len());
                // Only the current ticket gets here, so `query` is the one this answer belongs to
                self.results_query = self.query.clone();
                self.results = found.results;
                self.searched = true;
            }
            Err(err) => log::error!("Could not search users: {}", err),
        }
    }

    /// Follows or unfollows `user_id`. \
    /// Only the matching row changes, and only after the server accepted the toggle.
    /// Returns what the server answered, `None` if nothing was sent or the toggle failed.
    pub fn toggle_follow(&mut self, api: &impl Api, session: &Session, user_id: u64) -> Option<ToggleFollowResponse> {
        let PendingToggle { ticket, user_id, request } = self.begin_toggle(api.endpoints(), session, user_id)?;
        let outcome = api.send(request);
        self.apply_toggle(&ticket, user_id, outcome)
    }

    pub fn begin_toggle(&mut self, endpoints: &Endpoints, session: &Session, user_id: u64) -> Option<PendingToggle> {
        self.follow_session(session);
        let token = session.token()?;
        Some(PendingToggle {
            ticket: self.lifecycle.ticket(),
            user_id,
            request: ApiRequest::post(endpoints.url(Endpoint::ToggleFollow(user_id))).bearer(token),
        })
    }

    pub fn apply_toggle(&mut self, ticket: &Ticket, user_id: u64, outcome: Result<ApiResponse, ApiError>) -> Option<ToggleFollowResponse> {
        if !(ticket.belongs_to(&self.lifecycle) && ticket.is_current()) {
            log::debug!("Dropping stale follow toggle for user {}", user_id);
            return None;
        }
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                log::warn!("Could not toggle follow for user {}: {}", user_id, err);
                return None;
            }
        };
        let body = response.json::<ToggleFollowResponse>().unwrap_or_default();
        // Prefer what the server says over flipping blindly
        for row in self.results.iter_mut().filter(|row| row.id == user_id) {
            row.is_following = body.is_following.unwrap_or(!row.is_following);
        }
        Some(body)
    }

    /// Results belong to the session they were fetched with. \
    /// A different token drops them together with everything still in flight for the old one.
    fn follow_session(&mut self, session: &Session) {
        if self.session_token.as_deref() == session.token() {
            return;
        }
        self.session_token = session.token().map(str::to_string);
        self.lifecycle.advance();
        self.searches.advance();
        self.results.clear();
        self.searched = false;
        self.loading = false;
    }

    /// Invalidates every outstanding request of this view
    pub fn unmount(&mut self) {
        self.lifecycle.advance();
        self.searches.advance();
        self.loading = false;
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;
    use crate::transport::Method;

    const ANA: &str = r#"{"results": [{"id": 1, "username": "ana", "email": "ana@x.com", "bio": "", "is_following": false}]}"#;
    const TWO: &str = r#"{"results": [
        {"id": 1, "username": "ana", "email": "ana@x.com", "bio": "", "is_following": false},
        {"id": 2, "username": "anabel", "email": "anabel@x.com", "bio": "hello", "is_following": true}
    ]}"#;

    fn searched(api: &MockApi, body: &str) -> SearchView {
        api.respond(200, body);
        let mut view = SearchView::new();
        view.search(api, &Session::with_token("t1"), "ana");
        view
    }

    #[test]
    fn test_search_replaces_results() {
        let api = MockApi::new();
        let view = searched(&api, ANA);
        assert_eq!(view.results().len(), 1);
        assert_eq!(view.results()[0].follow_label(), FOLLOW_LABEL);
        assert!(view.results()[0].bio().is_none());
        assert!(!view.is_loading());

        let request = api.last_request();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url.path(), "/api/users/search/");
        assert_eq!(request.url.query(), Some("q=ana"));
        assert_eq!(request.bearer.as_deref(), Some("t1"));
    }

    #[test]
    fn test_camel_case_flag_is_accepted() {
        let found: SearchResults = serde_json::from_str(
            r#"{"results":[{"id":1,"username":"ana","email":"ana@x.com","bio":"","isFollowing":false}]}"#
        ).unwrap();
        assert!(!found.results[0].is_following);
    }

    #[test]
    fn test_guarded_searches_send_nothing() {
        let api = MockApi::new();
        let mut view = SearchView::new();
        view.search(&api, &Session::with_token("t1"), "   ");
        view.search(&api, &Session::anonymous(), "ana");
        view.toggle_follow(&api, &Session::anonymous(), 1);
        assert_eq!(api.request_count(), 0);
        assert!(!view.is_loading());
        assert!(view.empty_notice().is_none());
    }

    #[test]
    fn test_failed_search_keeps_results() {
        let api = MockApi::new();
        let mut view = searched(&api, TWO);
        api.respond(500, "boom");
        view.search(&api, &Session::with_token("t1"), "zed");
        assert_eq!(view.results().len(), 2);
        api.fail("timeout");
        view.search(&api, &Session::with_token("t1"), "zed");
        assert_eq!(view.results().len(), 2);
        assert!(!view.is_loading());
    }

    #[test]
    fn test_empty_notice() {
        let api = MockApi::new();
        let view = searched(&api, r#"{"results": []}"#);
        assert_eq!(view.empty_notice().as_deref(), Some("Nenhum usuário encontrado para \"ana\""));
    }

    #[test]
    fn test_toggle_flips_only_matching_row() {
        let api = MockApi::new();
        let mut view = searched(&api, TWO);
        api.respond(200, "");
        view.toggle_follow(&api, &Session::with_token("t1"), 1);
        assert!(view.results()[0].is_following);
        assert_eq!(view.results()[0].follow_label(), FOLLOWING_LABEL);
        assert!(view.results()[1].is_following);

        let request = api.last_request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url.path(), "/api/users/toggle-follow/1/");
    }

    #[test]
    fn test_toggle_uses_confirmed_state() {
        let api = MockApi::new();
        let mut view = searched(&api, TWO);
        api.respond(200, r#"{"status": "followed", "is_following": true, "followers_count": 3}"#);
        view.toggle_follow(&api, &Session::with_token("t1"), 2);
        assert!(view.results()[1].is_following);
        assert!(!view.results()[0].is_following);
    }

    #[test]
    fn test_failed_toggle_leaves_row() {
        let api = MockApi::new();
        let mut view = searched(&api, ANA);
        api.respond(400, r#"{"detail": "Você não pode seguir a si mesmo."}"#);
        view.toggle_follow(&api, &Session::with_token("t1"), 1);
        assert!(!view.results()[0].is_following);
        api.fail("connection reset");
        view.toggle_follow(&api, &Session::with_token("t1"), 1);
        assert!(!view.results()[0].is_following);
    }

    #[test]
    fn test_latest_search_wins() {
        let api = MockApi::new();
        let session = Session::with_token("t1");
        let mut view = SearchView::new();
        let first = view.begin_search(api.endpoints(), &session, "an").unwrap();
        let second = view.begin_search(api.endpoints(), &session, "ana").unwrap();
        assert!(view.is_loading());

        view.apply_search(&second.ticket, Ok(ApiResponse::new(200, ANA)));
        view.apply_search(&first.ticket, Ok(ApiResponse::new(200, TWO)));
        assert_eq!(view.results().len(), 1);
        assert_eq!(view.query(), "ana");
        assert!(!view.is_loading());
    }

    #[test]
    fn test_stale_search_does_not_end_loading() {
        let api = MockApi::new();
        let session = Session::with_token("t1");
        let mut view = SearchView::new();
        let first = view.begin_search(api.endpoints(), &session, "an").unwrap();
        let _second = view.begin_search(api.endpoints(), &session, "ana").unwrap();
        view.apply_search(&first.ticket, Ok(ApiResponse::new(200, TWO)));
        assert!(view.is_loading());
        assert!(view.results().is_empty());
    }

    #[test]
    fn test_unmount_drops_pending_responses() {
        let api = MockApi::new();
        let session = Session::with_token("t1");
        let mut view = searched(&api, ANA);
        let toggle = view.begin_toggle(api.endpoints(), &session, 1).unwrap();
        let search = view.begin_search(api.endpoints(), &session, "bia").unwrap();
        view.unmount();
        view.apply_toggle(&toggle.ticket, toggle.user_id, Ok(ApiResponse::new(200, "")));
        view.apply_search(&search.ticket, Ok(ApiResponse::new(200, r#"{"results": []}"#)));
        assert_eq!(view.results().len(), 1);
        assert!(!view.results()[0].is_following);
    }

    #[test]
    fn test_toggle_from_previous_session_is_dropped() {
        let api = MockApi::new();
        let alice = Session::with_token("token-a");
        let bob = Session::with_token("token-b");
        let mut view = SearchView::new();
        let toggle = view.begin_toggle(api.endpoints(), &alice, 1).unwrap();

        api.respond(200, ANA);
        view.search(&api, &bob, "ana");
        let applied = view.apply_toggle(&toggle.ticket, toggle.user_id, Ok(ApiResponse::new(200, r#"{"is_following": true}"#)));
        assert!(applied.is_none());
        assert!(!view.results()[0].is_following);
    }

    #[test]
    fn test_session_change_clears_results() {
        let api = MockApi::new();
        let mut view = searched(&api, TWO);
        let pending = view.begin_search(api.endpoints(), &Session::with_token("t1"), "anab").unwrap();
        view.search(&api, &Session::with_token("t2"), "   ");
        assert!(view.results().is_empty());
        assert!(!view.is_loading());
        assert!(view.empty_notice().is_none());
        view.apply_search(&pending.ticket, Ok(ApiResponse::new(200, TWO)));
        assert!(view.results().is_empty());
    }

    #[test]
    fn test_failed_search_keeps_notice_query() {
        let api = MockApi::new();
        let mut view = searched(&api, r#"{"results": []}"#);
        api.respond(500, "boom");
        view.search(&api, &Session::with_token("t1"), "zed");
        assert_eq!(view.query(), "zed");
        assert_eq!(view.empty_notice().as_deref(), Some("Nenhum usuário encontrado para \"ana\""));
    }

    #[test]
    fn test_toggle_without_results_reports_server_answer() {
        let api = MockApi::new();
        let mut view = SearchView::new();
        api.respond(200, r#"{"status": "followed", "is_following": true, "followers_count": 4}"#);
        let answer = view.toggle_follow(&api, &Session::with_token("t1"), 7).unwrap();
        assert_eq!(answer.is_following, Some(true));
        assert_eq!(answer.followers_count, Some(4));
        assert_eq!(api.last_request().url.path(), "/api/users/toggle-follow/7/");
        api.respond(404, r#"{"detail": "Usuário não encontrado."}"#);
        assert!(view.toggle_follow(&api, &Session::with_token("t1"), 8).is_none());
    }
}
