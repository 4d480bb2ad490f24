//! Write path for scraped posts. The registry entry and the native row are created and removed
//! together.

use sqlx::PgConnection;
use time::OffsetDateTime;

use wmvi_domain::{LanguageFlag, Platform, PostKey};

use crate::{Result, db::Db, registry};

/// Columns every platform table carries.
#[derive(Debug, Clone, Default)]
pub struct PostBody {
	/// Scrubbed text; the only text that is ever searched.
	pub filtered_text: Option<String>,
	pub created_at: Option<OffsetDateTime>,
	pub language: LanguageFlag,
}

/// What the registry and the search surface need from a native post.
pub trait Searchable {
	fn key(&self) -> PostKey;

	fn body(&self) -> &PostBody;

	fn text(&self) -> Option<&str> {
		self.body().filtered_text.as_deref()
	}

	fn language(&self) -> LanguageFlag {
		self.body().language
	}
}

#[derive(Debug, Clone, Default)]
pub struct Tweet {
	pub id: String,
	pub conversation_id: Option<String>,
	pub tweet_text: Option<String>,
	pub like_count: Option<i64>,
	pub retweet_count: Option<i64>,
	pub body: PostBody,
}

#[derive(Debug, Clone, Default)]
pub struct RedditSubmission {
	pub id: String,
	pub subreddit: Option<String>,
	pub title: Option<String>,
	pub selftext: Option<String>,
	pub permalink: Option<String>,
	pub score: Option<i64>,
	pub body: PostBody,
}

#[derive(Debug, Clone, Default)]
pub struct RedditComment {
	pub id: String,
	pub link_id: Option<String>,
	pub parent_comment_id: Option<String>,
	pub subreddit: Option<String>,
	pub text: Option<String>,
	pub permalink: Option<String>,
	pub score: Option<i64>,
	pub body: PostBody,
}

#[derive(Debug, Clone, Default)]
pub struct TelegramPost {
	pub channel_id: String,
	pub message_id: String,
	pub link: Option<String>,
	pub text: Option<String>,
	pub views: Option<i64>,
	pub forwards: Option<i64>,
	pub body: PostBody,
}

#[derive(Debug, Clone, Default)]
pub struct YoutubeVideo {
	pub video_id: String,
	pub url: Option<String>,
	pub title: Option<String>,
	pub description: Option<String>,
	pub channel_id: Option<String>,
	pub channel_title: Option<String>,
	pub view_count: Option<i64>,
	pub body: PostBody,
}

#[derive(Debug, Clone, Default)]
pub struct YoutubeComment {
	pub video_id: String,
	pub comment_id: String,
	pub comment_url: Option<String>,
	pub text: Option<String>,
	pub like_count: Option<i64>,
	pub body: PostBody,
}

#[derive(Debug, Clone, Default)]
pub struct PodcastEpisode {
	pub id: String,
	pub podcast_id: Option<String>,
	pub guid: Option<String>,
	pub title: Option<String>,
	pub description: Option<String>,
	pub audio_url: Option<String>,
	/// Transcript, scrubbed.
	pub body: PostBody,
}

#[derive(Debug, Clone, Default)]
pub struct NewsArticle {
	pub id: String,
	pub url: Option<String>,
	pub outlet: Option<String>,
	pub title: Option<String>,
	pub text: Option<String>,
	pub body: PostBody,
}

#[derive(Debug, Clone)]
pub enum NativePost {
	Tweet(Tweet),
	RedditSubmission(RedditSubmission),
	RedditComment(RedditComment),
	TelegramPost(TelegramPost),
	YoutubeVideo(YoutubeVideo),
	YoutubeComment(YoutubeComment),
	PodcastEpisode(PodcastEpisode),
	NewsArticle(NewsArticle),
}
impl NativePost {
	pub fn platform(&self) -> Platform {
		match self {
			NativePost::Tweet(_) => Platform::Tweet,
			NativePost::RedditSubmission(_) => Platform::RedditSubmission,
			NativePost::RedditComment(_) => Platform::RedditComment,
			NativePost::TelegramPost(_) => Platform::TelegramPost,
			NativePost::YoutubeVideo(_) => Platform::YoutubeVideo,
			NativePost::YoutubeComment(_) => Platform::YoutubeComment,
			NativePost::PodcastEpisode(_) => Platform::PodcastEpisode,
			NativePost::NewsArticle(_) => Platform::NewsArticle,
		}
	}
}

impl Searchable for NativePost {
	fn key(&self) -> PostKey {
		let platform = self.platform();

		match self {
			NativePost::Tweet(post) => platform.key(post.id.as_str(), None),
			NativePost::RedditSubmission(post) => platform.key(post.id.as_str(), None),
			NativePost::RedditComment(post) => platform.key(post.id.as_str(), None),
			NativePost::TelegramPost(post) =>
				platform.key(post.channel_id.as_str(), Some(post.message_id.as_str())),
			NativePost::YoutubeVideo(post) => platform.key(post.video_id.as_str(), None),
			NativePost::YoutubeComment(post) =>
				platform.key(post.video_id.as_str(), Some(post.comment_id.as_str())),
			NativePost::PodcastEpisode(post) => platform.key(post.id.as_str(), None),
			NativePost::NewsArticle(post) => platform.key(post.id.as_str(), None),
		}
	}

	fn body(&self) -> &PostBody {
		match self {
			NativePost::Tweet(post) => &post.body,
			NativePost::RedditSubmission(post) => &post.body,
			NativePost::RedditComment(post) => &post.body,
			NativePost::TelegramPost(post) => &post.body,
			NativePost::YoutubeVideo(post) => &post.body,
			NativePost::YoutubeComment(post) => &post.body,
			NativePost::PodcastEpisode(post) => &post.body,
			NativePost::NewsArticle(post) => &post.body,
		}
	}
}

/// Registers the post and stores its native row in one transaction. Re-inserting a known post
/// returns the existing id and leaves the stored row untouched.
///
/// A key that was registered on its own, without a native row, may hold an id a matcher has
/// already scanned past. That entry is replaced so the stored post gets a fresh id above every
/// watermark.
pub async fn insert_post(db: &Db, post: &NativePost) -> Result<i64> {
	let key = post.key();

	if key.key1.is_empty() || (post.platform().has_composite_key() && key.key2.is_empty()) {
		return Err(crate::Error::InvalidArgument(format!(
			"Incomplete natural key for {}.",
			key.composite()
		)));
	}

	let mut tx = db.pool.begin().await?;

	if let Some(existing) = registry::lookup_id(&mut tx, &key).await? {
		if native_exists(&mut tx, key.platform, existing).await? {
			tx.commit().await?;

			return Ok(existing);
		}

		registry::remove_tx(&mut tx, existing).await?;

		tracing::info!(
			stale_id = existing,
			key = %key.composite(),
			"Replacing registry entry that had no native row."
		);
	}

	let post_id = registry::register_tx(&mut tx, &key).await?;

	insert_native(&mut tx, post_id, post).await?;

	tx.commit().await?;

	tracing::debug!(post_id, key = %key.composite(), "Post stored.");

	Ok(post_id)
}

/// Deletes the post and its registry entry together. Returns whether anything was removed.
///
/// The registry row is deleted and the native row follows through its cascading foreign key,
/// so a single statement covers both.
pub async fn delete_post(db: &Db, key: &PostKey) -> Result<bool> {
	let removed = registry::deregister(db, key).await?;

	if removed {
		tracing::debug!(key = %key.composite(), "Post deleted.");
	}

	Ok(removed)
}

async fn native_exists(conn: &mut PgConnection, platform: Platform, post_id: i64) -> Result<bool> {
	// The table name comes from a closed enum, never from input.
	let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE post_id = $1)", platform.table());
	let exists: bool =
		sqlx::query_scalar(sql.as_str()).bind(post_id).fetch_one(&mut *conn).await?;

	Ok(exists)
}

async fn insert_native(conn: &mut PgConnection, post_id: i64, post: &NativePost) -> Result<()> {
	let body = post.body();

	match post {
		NativePost::Tweet(tweet) => {
			sqlx::query(
				"\
INSERT INTO tweets (
	post_id,
	id,
	conversation_id,
	tweet_text,
	like_count,
	retweet_count,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (id) DO NOTHING",
			)
			.bind(post_id)
			.bind(tweet.id.as_str())
			.bind(tweet.conversation_id.as_deref())
			.bind(tweet.tweet_text.as_deref())
			.bind(tweet.like_count)
			.bind(tweet.retweet_count)
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
		NativePost::RedditSubmission(submission) => {
			sqlx::query(
				"\
INSERT INTO reddit_submissions (
	post_id,
	id,
	subreddit,
	title,
	selftext,
	permalink,
	score,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (id) DO NOTHING",
			)
			.bind(post_id)
			.bind(submission.id.as_str())
			.bind(submission.subreddit.as_deref())
			.bind(submission.title.as_deref())
			.bind(submission.selftext.as_deref())
			.bind(submission.permalink.as_deref())
			.bind(submission.score)
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
		NativePost::RedditComment(comment) => {
			sqlx::query(
				"\
INSERT INTO reddit_comments (
	post_id,
	id,
	link_id,
	parent_comment_id,
	subreddit,
	body,
	permalink,
	score,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT (id) DO NOTHING",
			)
			.bind(post_id)
			.bind(comment.id.as_str())
			.bind(comment.link_id.as_deref())
			.bind(comment.parent_comment_id.as_deref())
			.bind(comment.subreddit.as_deref())
			.bind(comment.text.as_deref())
			.bind(comment.permalink.as_deref())
			.bind(comment.score)
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
		NativePost::TelegramPost(message) => {
			sqlx::query(
				"\
INSERT INTO telegram_posts (
	post_id,
	channel_id,
	message_id,
	link,
	text,
	views,
	forwards,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (channel_id, message_id) DO NOTHING",
			)
			.bind(post_id)
			.bind(message.channel_id.as_str())
			.bind(message.message_id.as_str())
			.bind(message.link.as_deref())
			.bind(message.text.as_deref())
			.bind(message.views)
			.bind(message.forwards)
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
		NativePost::YoutubeVideo(video) => {
			sqlx::query(
				"\
INSERT INTO youtube_videos (
	post_id,
	video_id,
	url,
	title,
	description,
	channel_id,
	channel_title,
	view_count,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT (video_id) DO NOTHING",
			)
			.bind(post_id)
			.bind(video.video_id.as_str())
			.bind(video.url.as_deref())
			.bind(video.title.as_deref())
			.bind(video.description.as_deref())
			.bind(video.channel_id.as_deref())
			.bind(video.channel_title.as_deref())
			.bind(video.view_count)
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
		NativePost::YoutubeComment(comment) => {
			sqlx::query(
				"\
INSERT INTO youtube_comments (
	post_id,
	video_id,
	comment_id,
	comment_url,
	text,
	like_count,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (video_id, comment_id) DO NOTHING",
			)
			.bind(post_id)
			.bind(comment.video_id.as_str())
			.bind(comment.comment_id.as_str())
			.bind(comment.comment_url.as_deref())
			.bind(comment.text.as_deref())
			.bind(comment.like_count)
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
		NativePost::PodcastEpisode(episode) => {
			sqlx::query(
				"\
INSERT INTO podcast_episodes (
	post_id,
	id,
	podcast_id,
	guid,
	title,
	description,
	audio_url,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (id) DO NOTHING",
			)
			.bind(post_id)
			.bind(episode.id.as_str())
			.bind(episode.podcast_id.as_deref())
			.bind(episode.guid.as_deref())
			.bind(episode.title.as_deref())
			.bind(episode.description.as_deref())
			.bind(episode.audio_url.as_deref())
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
		NativePost::NewsArticle(article) => {
			sqlx::query(
				"\
INSERT INTO news_articles (
	post_id,
	id,
	url,
	outlet,
	title,
	body,
	filtered_text,
	created_at_ts,
	is_en
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
ON CONFLICT (id) DO NOTHING",
			)
			.bind(post_id)
			.bind(article.id.as_str())
			.bind(article.url.as_deref())
			.bind(article.outlet.as_deref())
			.bind(article.title.as_deref())
			.bind(article.text.as_deref())
			.bind(body.filtered_text.as_deref())
			.bind(body.created_at)
			.bind(body.language.as_option())
			.execute(&mut *conn)
			.await?;
		},
	}

	Ok(())
}
