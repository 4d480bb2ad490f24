pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

/// Splits a script into statements on `;`, ignoring semicolons inside single-quoted literals
/// and `--` comments.
pub fn split_statements(sql: &str) -> Vec<String> {
	let mut out = Vec::new();
	let mut current = String::new();
	let mut chars = sql.chars().peekable();
	let mut in_literal = false;

	while let Some(ch) = chars.next() {
		if in_literal {
			current.push(ch);

			if ch == '\'' {
				in_literal = false;
			}

			continue;
		}

		match ch {
			'\'' => {
				in_literal = true;

				current.push(ch);
			},
			'-' if chars.peek() == Some(&'-') => {
				for next in chars.by_ref() {
					if next == '\n' {
						current.push('\n');

						break;
					}
				}
			},
			';' => {
				push_statement(&mut out, &current);
				current.clear();
			},
			_ => current.push(ch),
		}
	}

	push_statement(&mut out, &current);

	out
}

fn push_statement(out: &mut Vec<String>, statement: &str) {
	let trimmed = statement.trim();

	if !trimmed.is_empty() {
		out.push(trimmed.to_string());
	}
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_post_registry.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_post_registry.sql")),
				"tables/002_post_registry_head.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_post_registry_head.sql")),
				"tables/010_tweets.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_tweets.sql")),
				"tables/011_reddit_submissions.sql" =>
					out.push_str(include_str!("../../../sql/tables/011_reddit_submissions.sql")),
				"tables/012_reddit_comments.sql" =>
					out.push_str(include_str!("../../../sql/tables/012_reddit_comments.sql")),
				"tables/013_telegram_posts.sql" =>
					out.push_str(include_str!("../../../sql/tables/013_telegram_posts.sql")),
				"tables/014_youtube_videos.sql" =>
					out.push_str(include_str!("../../../sql/tables/014_youtube_videos.sql")),
				"tables/015_youtube_comments.sql" =>
					out.push_str(include_str!("../../../sql/tables/015_youtube_comments.sql")),
				"tables/016_podcast_episodes.sql" =>
					out.push_str(include_str!("../../../sql/tables/016_podcast_episodes.sql")),
				"tables/017_news_articles.sql" =>
					out.push_str(include_str!("../../../sql/tables/017_news_articles.sql")),
				"tables/020_vaccine_terms.sql" =>
					out.push_str(include_str!("../../../sql/tables/020_vaccine_terms.sql")),
				"tables/021_term_match_state.sql" =>
					out.push_str(include_str!("../../../sql/tables/021_term_match_state.sql")),
				"tables/022_post_term_matches.sql" =>
					out.push_str(include_str!("../../../sql/tables/022_post_term_matches.sql")),
				"tables/023_lang_label_state.sql" =>
					out.push_str(include_str!("../../../sql/tables/023_lang_label_state.sql")),
				"views/001_posts_all.sql" =>
					out.push_str(include_str!("../../../sql/views/001_posts_all.sql")),
				"views/002_post_search_en.sql" =>
					out.push_str(include_str!("../../../sql/views/002_post_search_en.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
