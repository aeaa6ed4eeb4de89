use std::path::PathBuf;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use crate::client::SocialClient;
use crate::profile::{Avatar, DisplayMode, ProfileDraft, ProfileView, StatusMessage};
use crate::search::{SearchView, FOLLOWING_LABEL, FOLLOW_LABEL};
use crate::tweets::{TimelineView, Tweet};
use crate::session::{signup, Session};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "social-cli", version, subcommand_required = true)]
pub struct Args {
    /// Bearer token of the logged in user
    #[arg(long, env = "SOCIAL_API_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and print the access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create a new account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show the own profile
    Profile {
        /// Show followers and followed users instead of the profile fields
        #[arg(long)]
        connections: bool,
    },
    /// Update the own profile. Unset fields keep their current value.
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// New password
        #[arg(long)]
        password: Option<String>,
        /// Image file to upload as avatar
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    /// Search users by email
    Search {
        query: String,
        /// Follow or unfollow the user with this id among the results
        #[arg(long)]
        toggle: Option<u64>,
    },
    /// Follow or unfollow a user by id
    Follow {
        user_id: u64,
    },
    /// Show the feed
    Feed,
    /// Publish a tweet
    Tweet {
        content: String,
    },
    /// Like or unlike a tweet
    Like {
        tweet_id: u64,
    },
    /// Show the comments of a tweet, or add one with `--add`
    Comments {
        tweet_id: u64,
        #[arg(long)]
        add: Option<String>,
    },
}

fn authenticated(token: Option<String>) -> anyhow::Result<Session> {
    let session = Session::with_token(token.unwrap_or_default());
    if !session.is_authenticated() {
        bail!("No token given. Pass --token or set SOCIAL_API_TOKEN (see `social-cli login`)");
    }
    Ok(session)
}

/// The update draft: the current profile with the given fields replaced
fn update_draft(view: &ProfileView, email: Option<String>, bio: Option<String>, password: Option<String>, avatar: Option<PathBuf>) -> anyhow::Result<ProfileDraft> {
    // Without a loaded profile the draft would send an empty email
    if email.is_none() && view.profile.email.is_empty() {
        bail!("Could not load the current profile. Pass --email to update anyway");
    }
    let mut draft = view.draft();
    if let Some(email) = email {
        draft.email = email;
    }
    if let Some(bio) = bio {
        draft.bio = bio;
    }
    draft.new_password = password;
    draft.avatar = avatar.map(Avatar::from_path).transpose()?;
    Ok(draft)
}

fn print_tweet(tweet: &Tweet) {
    let liked = if tweet.liked_by_me { "*" } else { "" };
    println!("[{}] @{}: {} ({}{} likes, {} replies)", tweet.id, tweet.handle_or_username(), tweet.content, tweet.likes_count, liked, tweet.replies_count);
}

fn print_profile(view: &ProfileView) {
    match view.mode() {
        DisplayMode::Edit => {
            println!("E-mail: {}", view.profile.email);
            println!("Bio: {}", view.profile.bio);
            if let Some(avatar) = &view.profile.avatar {
                println!("Avatar: {}", avatar);
            }
        }
        DisplayMode::Connections => {
            println!("{}", view.followers_heading());
            match view.followers_notice() {
                Some(notice) => println!("  {}", notice),
                None => println!("{}", view.connections.followers.iter().map(|c| format!("  {} <{}>", c.username, c.email)).join("\n")),
            }
            println!("{}", view.following_heading());
            match view.following_notice() {
                Some(notice) => println!("  {}", notice),
                None => println!("{}", view.connections.following.iter().map(|c| format!("  {} <{}>", c.username, c.email)).join("\n")),
            }
        }
    }
}

fn print_results(view: &SearchView) {
    if let Some(notice) = view.empty_notice() {
        println!("{}", notice);
        return;
    }
    for user in view.results() {
        let bio = user.bio().map(|bio| format!(" - {}", bio)).unwrap_or_default();
        println!("[{}] {} <{}>{} ({})", user.id, user.username, user.email, bio, user.follow_label());
    }
}

pub fn run_cli(args: Args) -> anyhow::Result<()> {
    let client = SocialClient::from_env()?;

    match args.command {
        Command::Login { email, password } => {
            let session = Session::login(&client, &email, &password)
                .context("Could not log in")?;
            println!("{}", session.token().unwrap_or_default());
        }
        Command::Signup { email, password } => {
            let receipt = signup(&client, &email, &password)
                .context("Could not sign up")?;
            println!("Created user {} ({})", receipt.id, receipt.email);
        }
        Command::Profile { connections } => {
            let session = authenticated(args.token)?;
            let mut view = ProfileView::new();
            view.sync(&client, &session);
            if connections {
                view.set_mode(DisplayMode::Connections);
            }
            print_profile(&view);
        }
        Command::Update { email, bio, password, avatar } => {
            let session = authenticated(args.token)?;
            let mut view = ProfileView::new();
            view.sync(&client, &session);
            let draft = update_draft(&view, email, bio, password, avatar)?;
            view.submit_profile(&client, &session, &draft);
            match view.status() {
                Some(StatusMessage::Updated) => println!("{}", StatusMessage::Updated),
                Some(status) => bail!("{}", status),
                None => bail!("Profile was not submitted"),
            }
        }
        Command::Search { query, toggle } => {
            let session = authenticated(args.token)?;
            let mut view = SearchView::new();
            view.search(&client, &session, &query);
            if let Some(user_id) = toggle {
                if !view.results().iter().any(|user| user.id == user_id) {
                    bail!("User {} is not among the results for {:?}", user_id, query);
                }
                view.toggle_follow(&client, &session, user_id);
            }
            print_results(&view);
        }
        Command::Follow { user_id } => {
            let session = authenticated(args.token)?;
            let mut view = SearchView::new();
            let answer = view.toggle_follow(&client, &session, user_id)
                .with_context(|| format!("Could not toggle follow for user {}", user_id))?;
            match answer.is_following {
                Some(true) => println!("{} {}", FOLLOWING_LABEL, user_id),
                Some(false) => println!("{} {}", FOLLOW_LABEL, user_id),
                None => println!("Toggled follow for user {}", user_id),
            }
        }
        Command::Feed => {
            let session = authenticated(args.token)?;
            let mut view = TimelineView::new();
            view.refresh(&client, &session);
            view.tweets().iter().for_each(print_tweet);
        }
        Command::Tweet { content } => {
            let session = authenticated(args.token)?;
            let tweet = TimelineView::new().post_tweet(&client, &session, &content)
                .context("Could not post tweet")?;
            print_tweet(&tweet);
        }
        Command::Like { tweet_id } => {
            let session = authenticated(args.token)?;
            let answer = TimelineView::new().toggle_like(&client, &session, tweet_id)
                .with_context(|| format!("Could not toggle like for tweet {}", tweet_id))?;
            let liked = answer.liked.map_or("toggled", |liked| if liked { "liked" } else { "unliked" });
            println!("Tweet {} {}", tweet_id, liked);
        }
        Command::Comments { tweet_id, add } => {
            let session = authenticated(args.token)?;
            let mut view = TimelineView::new();
            if let Some(content) = add {
                view.add_comment(&client, &session, tweet_id, &content)
                    .with_context(|| format!("Could not comment on tweet {}", tweet_id))?;
            }
            view.load_comments(&client, &session, tweet_id);
            let comments = view.comments(tweet_id)
                .with_context(|| format!("Could not load comments of tweet {}", tweet_id))?;
            println!("{}", comments.iter().map(|c| format!("{}: {}", c.author_email, c.content)).join("\n"));
        }
    }
    Ok(())
}
