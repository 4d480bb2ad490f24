use wmvi_domain::{LanguageFlag, MatchSpan, Platform, QueryMode};
use wmvi_storage::{
	db::Db,
	ingest::{self, NativePost, PostBody, RedditComment, Tweet},
	language, matches,
	models::NewMatch,
	search,
	state::{self, Advance},
	stats, terms,
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

fn body(text: &str, language: LanguageFlag) -> PostBody {
	PostBody { filtered_text: Some(text.to_string()), created_at: None, language }
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn watermark_never_moves_backward() {
	let Some((test_db, db)) = setup("watermark_never_moves_backward").await else {
		return;
	};
	let term = terms::insert_term(&db, "mrna", None).await.expect("Failed to add term.");

	assert_eq!(
		state::get_or_init_watermark(&db, term.id, "v1").await.expect("Failed to init state."),
		None
	);
	assert_eq!(
		state::advance_watermark(&db, term.id, "v1", 10).await.expect("Failed to advance."),
		Advance::Advanced { to: 10 }
	);
	assert_eq!(
		state::advance_watermark(&db, term.id, "v1", 7).await.expect("Failed to advance."),
		Advance::Superseded { stored: 10 }
	);
	assert_eq!(
		state::advance_watermark(&db, term.id, "v1", 10).await.expect("Failed to advance."),
		Advance::Advanced { to: 10 }
	);
	assert_eq!(
		state::get_or_init_watermark(&db, term.id, "v1").await.expect("Failed to read state."),
		Some(10)
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn matcher_versions_keep_independent_state() {
	let Some((test_db, db)) = setup("matcher_versions_keep_independent_state").await else {
		return;
	};
	let term = terms::insert_term(&db, "mrna", None).await.expect("Failed to add term.");

	state::get_or_init_watermark(&db, term.id, "v1").await.expect("Failed to init state.");
	state::get_or_init_watermark(&db, term.id, "v2").await.expect("Failed to init state.");
	state::advance_watermark(&db, term.id, "v1", 42).await.expect("Failed to advance.");

	assert_eq!(
		state::get_or_init_watermark(&db, term.id, "v2").await.expect("Failed to read state."),
		None
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn duplicate_hits_are_ignored() {
	let Some((test_db, db)) = setup("duplicate_hits_are_ignored").await else {
		return;
	};
	let post_id = ingest::insert_post(
		&db,
		&NativePost::Tweet(Tweet {
			id: "1".to_string(),
			body: body("mRNA news", LanguageFlag::English),
			..Default::default()
		}),
	)
	.await
	.expect("Failed to insert post.");
	let term = terms::insert_term(&db, "mrna", None).await.expect("Failed to add term.");
	let hit = NewMatch {
		post_id,
		term_id: term.id,
		span: Some(MatchSpan { start: 0, end: 4 }),
		occurrences: 1,
	};
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");
	let first = matches::upsert_matches(&mut conn, "v1", &[hit.clone(), hit.clone()])
		.await
		.expect("Failed to insert match.");
	let second = matches::upsert_matches(&mut conn, "v1", std::slice::from_ref(&hit))
		.await
		.expect("Failed to re-insert match.");
	let other_version = matches::upsert_matches(&mut conn, "v2", std::slice::from_ref(&hit))
		.await
		.expect("Failed to insert match under another version.");

	assert_eq!((first, second, other_version), (1, 0, 1));

	let stored = matches::matches_for_term(&db, term.id, Some("v1"))
		.await
		.expect("Failed to list matches.");

	assert_eq!(stored.len(), 1);
	assert_eq!((stored[0].span_start, stored[0].span_end), (Some(0), Some(4)));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn search_view_only_returns_english_posts() {
	let Some((test_db, db)) = setup("search_view_only_returns_english_posts").await else {
		return;
	};
	let english = ingest::insert_post(
		&db,
		&NativePost::RedditComment(RedditComment {
			id: "c1".to_string(),
			body: body("Vaccines are available at the clinic", LanguageFlag::English),
			..Default::default()
		}),
	)
	.await
	.expect("Failed to insert post.");
	let unknown = ingest::insert_post(
		&db,
		&NativePost::RedditComment(RedditComment {
			id: "c2".to_string(),
			body: body("vaccine vaccine vaccine", LanguageFlag::Unknown),
			..Default::default()
		}),
	)
	.await
	.expect("Failed to insert post.");
	let hits = search::search_range(&db, QueryMode::Plain, "vaccine", 0, unknown)
		.await
		.expect("Failed to search.");

	assert_eq!(hits.iter().map(|hit| hit.post_id).collect::<Vec<_>>(), vec![english]);
	assert_eq!(hits[0].platform, "reddit_comment");

	let labeled = language::set_language(
		&db,
		&Platform::RedditComment.key("c2", None),
		LanguageFlag::English,
	)
	.await
	.expect("Failed to label post.");

	assert!(labeled);

	let hits = search::search_range(&db, QueryMode::Plain, "vaccine", english, unknown)
		.await
		.expect("Failed to search.");

	assert_eq!(hits.iter().map(|hit| hit.post_id).collect::<Vec<_>>(), vec![unknown]);
	assert!(
		search::query_is_empty(&db, QueryMode::Plain, "the and of")
			.await
			.expect("Failed to inspect query.")
	);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn term_stats_count_matches_per_version() {
	let Some((test_db, db)) = setup("term_stats_count_matches_per_version").await else {
		return;
	};
	let post_id = ingest::insert_post(
		&db,
		&NativePost::Tweet(Tweet {
			id: "1".to_string(),
			body: body("pfizer booster", LanguageFlag::English),
			..Default::default()
		}),
	)
	.await
	.expect("Failed to insert post.");
	let pfizer = terms::insert_term(&db, "pfizer", None).await.expect("Failed to add term.");
	let moderna = terms::insert_term(&db, "moderna", None).await.expect("Failed to add term.");
	let mut conn = db.pool.acquire().await.expect("Failed to acquire connection.");

	matches::upsert_matches(
		&mut conn,
		"v1",
		&[NewMatch { post_id, term_id: pfizer.id, span: None, occurrences: 1 }],
	)
	.await
	.expect("Failed to insert match.");

	drop(conn);

	let rows = stats::term_stats(&db, "v1", &[]).await.expect("Failed to load stats.");

	assert_eq!(rows.len(), 2);
	assert_eq!((rows[0].term_id, rows[0].match_count), (pfizer.id, 1));
	assert_eq!((rows[1].term_id, rows[1].match_count), (moderna.id, 0));

	let rows = stats::term_stats(&db, "v2", &[pfizer.id]).await.expect("Failed to load stats.");

	assert_eq!(rows.len(), 1);
	assert_eq!(rows[0].match_count, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set WMVI_PG_DSN to run."]
async fn term_lookup_filters_and_trims() {
	let Some((test_db, db)) = setup("term_lookup_filters_and_trims").await else {
		return;
	};
	let mrna = terms::insert_term(&db, "mRNA vaccine", None).await.expect("Failed to add term.");
	let again = terms::insert_term(&db, " mRNA vaccine ", None).await.expect("Failed to add term.");
	let flu = terms::insert_term(&db, "flu shot", None).await.expect("Failed to add term.");

	assert_eq!(mrna, again);

	let filtered = terms::list_terms(&db, Some("MRNA")).await.expect("Failed to list terms.");

	assert_eq!(filtered, vec![mrna.clone()]);

	let by_name = terms::terms_by_names(&db, &["  flu shot ".to_string(), "".to_string()])
		.await
		.expect("Failed to look up terms.");

	assert_eq!(by_name, vec![flu.clone()]);

	let by_id =
		terms::terms_by_ids(&db, &[flu.id, mrna.id, 9_999]).await.expect("Failed to look up terms.");

	assert_eq!(by_id, vec![mrna.clone(), flu.clone()]);
	assert!(terms::delete_term(&db, flu.id).await.expect("Failed to delete term."));
	assert!(!terms::delete_term(&db, flu.id).await.expect("Failed to delete term."));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
