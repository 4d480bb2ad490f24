use std::time::Duration;

use wmvi_domain::{LanguageFlag, Platform};
use wmvi_storage::{
	db::Db,
	ingest::{self, NativePost, PostBody, Tweet, YoutubeComment},
	matches,
	models::NewMatch,
	registry, terms,
};
use wmvi_testkit::TestDatabase;

async fn setup(test_name: &str) -> Option<(TestDatabase, Db)> {
	let Some(base_dsn) = wmvi_testkit::env_dsn() else {
		eprintln!("Skipping {test_name}; set WMVI_PG_DSN to run this test.");

		return None;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = Db::connect(&test_db.postgres_config(2))
		.await
		.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	Some((test_db, db))
}

fn tweet(id: &str, text: &str) -> NativePost {
	NativePost::Tweet(Tweet {
		id: id.to_string(),
		body: PostBody {
			filtered_text: Some(text.to_string()),
			created_at: None,
			language: LanguageFlag::English,
		},
		..Default::default()
	})
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn registration_is_idempotent() {
	let Some((test_db, db)) = setup("registration_is_idempotent").await else {
		return;
	};
	let key = Platform::Tweet.key("1001", None);
	let first = registry::register(&db, &key).await.expect("Failed to register post.");
	let second = registry::register(&db, &key).await.expect("Failed to re-register post.");

	assert_eq!(first, second);

	let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_registry")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to count registry rows.");

	assert_eq!(count, 1);
	assert_eq!(registry::latest_post_id(&db).await.expect("Failed to read head."), first);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn ensure_schema_can_run_twice() {
	let Some((test_db, db)) = setup("ensure_schema_can_run_twice").await else {
		return;
	};

	db.ensure_schema().await.expect("Second schema bootstrap must succeed.");

	let missing = db.missing_search_indexes().await.expect("Failed to inspect indexes.");

	assert!(missing.is_empty(), "Missing GIN indexes: {missing:?}");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn ids_increase_and_head_survives_deletion() {
	let Some((test_db, db)) = setup("ids_increase_and_head_survives_deletion").await else {
		return;
	};
	let a = ingest::insert_post(&db, &tweet("1", "first")).await.expect("Failed to insert post.");
	let b = ingest::insert_post(&db, &tweet("2", "second")).await.expect("Failed to insert post.");

	assert!(b > a);

	let removed = ingest::delete_post(&db, &Platform::Tweet.key("2", None))
		.await
		.expect("Failed to delete post.");

	assert!(removed);
	assert_eq!(registry::latest_post_id(&db).await.expect("Failed to read head."), b);

	let c = ingest::insert_post(&db, &tweet("3", "third")).await.expect("Failed to insert post.");

	assert!(c > b, "Ids must never be reused.");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn deleting_post_removes_native_row_and_matches() {
	let Some((test_db, db)) = setup("deleting_post_removes_native_row_and_matches").await else {
		return;
	};
	let post = NativePost::YoutubeComment(YoutubeComment {
		video_id: "vid1".to_string(),
		comment_id: "c1".to_string(),
		body: PostBody {
			filtered_text: Some("my booster appointment".to_string()),
			created_at: None,
			language: LanguageFlag::English,
		},
		..Default::default()
	});
	let post_id = ingest::insert_post(&db, &post).await.expect("Failed to insert post.");
	let term =
		terms::insert_term(&db, "booster", Some("generic")).await.expect("Failed to add term.");
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	matches::upsert_matches(
		&mut conn,
		"v1",
		&[NewMatch { post_id, term_id: term.id, span: None, occurrences: 1 }],
	)
	.await
	.expect("Failed to insert match.");

	drop(conn);

	let key = Platform::YoutubeComment.key("vid1", Some("c1"));

	assert!(ingest::delete_post(&db, &key).await.expect("Failed to delete post."));
	assert!(!ingest::delete_post(&db, &key).await.expect("Failed to delete post."));

	let native_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM youtube_comments")
		.fetch_one(&db.pool)
		.await
		.expect("Failed to count native rows.");

	assert_eq!(native_rows, 0);
	assert!(registry::lookup(&db, &key).await.expect("Failed to look up post.").is_none());
	assert!(
		matches::matches_for_post(&db, post_id, None)
			.await
			.expect("Failed to list matches.")
			.is_empty()
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn incomplete_composite_keys_are_rejected() {
	let Some((test_db, db)) = setup("incomplete_composite_keys_are_rejected").await else {
		return;
	};
	let post = NativePost::YoutubeComment(YoutubeComment {
		video_id: "vid1".to_string(),
		..Default::default()
	});
	let err = ingest::insert_post(&db, &post).await.expect_err("Expected key validation error.");

	assert!(matches!(err, wmvi_storage::Error::InvalidArgument(_)), "Unexpected error: {err:?}");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn open_registration_is_invisible_to_the_head() {
	let Some((test_db, db)) = setup("open_registration_is_invisible_to_the_head").await else {
		return;
	};
	let committed =
		ingest::insert_post(&db, &tweet("1", "first")).await.expect("Failed to insert post.");
	let mut tx = db.pool.begin().await.expect("Failed to begin transaction.");
	let pending = registry::register_tx(&mut tx, &Platform::Tweet.key("2", None))
		.await
		.expect("Failed to register inside transaction.");

	assert!(pending > committed);
	assert_eq!(registry::latest_post_id(&db).await.expect("Failed to read head."), committed);

	let other = Db::connect(&test_db.postgres_config(1))
		.await
		.expect("Failed to connect to Postgres.");
	let concurrent = tokio::spawn(async move {
		registry::register(&other, &Platform::Tweet.key("3", None)).await
	});

	tokio::time::sleep(Duration::from_millis(300)).await;

	assert!(!concurrent.is_finished(), "A second registration must wait for the head lock.");

	tx.commit().await.expect("Failed to commit registration.");

	let later = concurrent
		.await
		.expect("Registration task panicked.")
		.expect("Concurrent registration failed.");

	assert!(later > pending, "Commit order must follow id order.");
	assert_eq!(registry::latest_post_id(&db).await.expect("Failed to read head."), later);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn bare_registration_gets_a_fresh_id_on_insert() {
	let Some((test_db, db)) = setup("bare_registration_gets_a_fresh_id_on_insert").await else {
		return;
	};
	let key = Platform::Tweet.key("9", None);
	let early = registry::register(&db, &key).await.expect("Failed to register post.");
	let other =
		ingest::insert_post(&db, &tweet("2", "second")).await.expect("Failed to insert post.");
	let stored =
		ingest::insert_post(&db, &tweet("9", "ninth")).await.expect("Failed to insert post.");

	assert!(other > early);
	assert!(stored > other, "The native row must land above every earlier id.");
	assert!(registry::entry_by_id(&db, early).await.expect("Lookup failed.").is_none());
	assert_eq!(
		registry::lookup(&db, &key).await.expect("Lookup failed.").map(|entry| entry.id),
		Some(stored)
	);

	let again =
		ingest::insert_post(&db, &tweet("9", "ninth again")).await.expect("Failed to re-insert.");

	assert_eq!(again, stored);
	assert_eq!(registry::latest_post_id(&db).await.expect("Failed to read head."), stored);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
