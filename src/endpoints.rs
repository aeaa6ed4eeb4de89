use serde::{Deserialize, Serialize};
use url::Url;

/// A logical backend operation. \
/// Parameterised endpoints carry the id of the user or tweet they act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Login,
    Signup,
    TokenRefresh,
    Profile,
    FollowersFollowing,
    Search,
    ToggleFollow(u64),
    Tweets,
    LikeTweet(u64),
    TweetComments(u64),
    AddComment(u64),
}

impl Endpoint {

    /// The path of the endpoint, relative to the api base
    pub fn path(&self) -> String {
        match self {
            Endpoint::Login => "users/token/".to_string(),
            Endpoint::Signup => "users/signup/".to_string(),
            Endpoint::TokenRefresh => "users/token/refresh/".to_string(),
            Endpoint::Profile => "users/profile/".to_string(),
            Endpoint::FollowersFollowing => "users/followers-following/".to_string(),
            Endpoint::Search => "users/search/".to_string(),
            Endpoint::ToggleFollow(user_id) => format!("users/toggle-follow/{}/", user_id),
            Endpoint::Tweets => "tweets/".to_string(),
            Endpoint::LikeTweet(id) => format!("tweets/{}/like_tweet/", id),
            Endpoint::TweetComments(id) => format!("tweets/{}/comments/", id),
            Endpoint::AddComment(id) => format!("tweets/{}/add_comment/", id),
        }
    }

}

/// Resolves [`Endpoint`]s to fully qualified urls below a single base. \
/// Holds nothing but the base, so resolving is a pure function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {

    /// Creates a registry rooted at `base` (e.g. `http://localhost:8001/api`). \
    /// A missing trailing slash is added, so the last path segment of the base is kept when joining.
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The fully qualified url of `endpoint`
    pub fn url(&self, endpoint: Endpoint) -> Url {
        // Paths are relative and made of url-safe characters only, joining cannot fail
        self.base.join(&endpoint.path()).expect("Endpoint paths are always valid relative urls")
    }

    /// The user search url, with `query` encoded into the `q` parameter
    pub fn search(&self, query: &str) -> Url {
        let mut url = self.url(Endpoint::Search);
        url.query_pairs_mut().append_pair("q", query);
        url
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints::new(Url::parse("http://localhost:8001/api").unwrap())
    }

    #[test]
    fn test_keeps_base_path() {
        assert_eq!(endpoints().url(Endpoint::Profile).as_str(), "http://localhost:8001/api/users/profile/");
        assert_eq!(endpoints().url(Endpoint::FollowersFollowing).as_str(), "http://localhost:8001/api/users/followers-following/");
        // Trailing slash on the base must not double up
        let with_slash = Endpoints::new(Url::parse("https://twitter-b01m.onrender.com/api/").unwrap());
        assert_eq!(with_slash.url(Endpoint::Login).as_str(), "https://twitter-b01m.onrender.com/api/users/token/");
    }

    #[test]
    fn test_parameterised_endpoints() {
        let endpoints = endpoints();
        assert_eq!(endpoints.url(Endpoint::ToggleFollow(42)).as_str(), "http://localhost:8001/api/users/toggle-follow/42/");
        assert_eq!(endpoints.url(Endpoint::LikeTweet(7)).as_str(), "http://localhost:8001/api/tweets/7/like_tweet/");
        assert_eq!(endpoints.url(Endpoint::AddComment(3)).as_str(), "http://localhost:8001/api/tweets/3/add_comment/");
    }

    #[test]
    fn test_search_query_is_encoded() {
        let url = endpoints().search("ana maria&x");
        assert_eq!(url.path(), "/api/users/search/");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "q");
        assert_eq!(value, "ana maria&x");
        assert_eq!(url.query_pairs().count(), 1);
    }
}
