use std::{fmt, str::FromStr};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
	Tweet,
	RedditSubmission,
	RedditComment,
	TelegramPost,
	YoutubeVideo,
	YoutubeComment,
	PodcastEpisode,
	NewsArticle,
}
impl Platform {
	pub const ALL: [Platform; 8] = [
		Platform::Tweet,
		Platform::RedditSubmission,
		Platform::RedditComment,
		Platform::TelegramPost,
		Platform::YoutubeVideo,
		Platform::YoutubeComment,
		Platform::PodcastEpisode,
		Platform::NewsArticle,
	];

	/// Tag stored in `post_registry.platform`.
	pub fn as_str(self) -> &'static str {
		match self {
			Platform::Tweet => "tweet",
			Platform::RedditSubmission => "reddit_submission",
			Platform::RedditComment => "reddit_comment",
			Platform::TelegramPost => "telegram_post",
			Platform::YoutubeVideo => "youtube_video",
			Platform::YoutubeComment => "youtube_comment",
			Platform::PodcastEpisode => "podcast_episode",
			Platform::NewsArticle => "news_article",
		}
	}

	/// Native table holding the platform's rows.
	pub fn table(self) -> &'static str {
		match self {
			Platform::Tweet => "tweets",
			Platform::RedditSubmission => "reddit_submissions",
			Platform::RedditComment => "reddit_comments",
			Platform::TelegramPost => "telegram_posts",
			Platform::YoutubeVideo => "youtube_videos",
			Platform::YoutubeComment => "youtube_comments",
			Platform::PodcastEpisode => "podcast_episodes",
			Platform::NewsArticle => "news_articles",
		}
	}

	/// Whether the natural key has a second component.
	pub fn has_composite_key(self) -> bool {
		matches!(self, Platform::TelegramPost | Platform::YoutubeComment)
	}

	pub fn key(self, key1: impl Into<String>, key2: Option<&str>) -> PostKey {
		PostKey::new(self, key1, key2)
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlatform(pub String);

impl fmt::Display for UnknownPlatform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Unknown platform tag {:?}.", self.0)
	}
}

impl std::error::Error for UnknownPlatform {}

impl FromStr for Platform {
	type Err = UnknownPlatform;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Platform::ALL
			.into_iter()
			.find(|platform| platform.as_str() == s)
			.ok_or_else(|| UnknownPlatform(s.to_string()))
	}
}

/// Natural key of a post. `key2` is the empty string for single-key platforms, so the registry
/// uniqueness constraint never compares NULLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PostKey {
	pub platform: Platform,
	pub key1: String,
	pub key2: String,
}
impl PostKey {
	pub fn new(platform: Platform, key1: impl Into<String>, key2: Option<&str>) -> Self {
		Self {
			platform,
			key1: key1.into(),
			key2: key2.map(str::to_string).unwrap_or_default(),
		}
	}

	/// Human-readable `platform:key1[:key2]`, stored as `post_registry.composite_key`.
	pub fn composite(&self) -> String {
		if self.key2.is_empty() {
			format!("{}:{}", self.platform, self.key1)
		} else {
			format!("{}:{}:{}", self.platform, self.key1, self.key2)
		}
	}
}
