use lectern_domain::{
	document::Document,
	intent::{Action, Explicitness, Intent, Scope},
	session::{Mode, Session, SessionState},
};
use lectern_service::{
	Error, Grounding, SearchConfig,
	grounder::{AGGREGATE_UNAVAILABLE, SEARCH_UNAVAILABLE},
	messenger::MESSENGER_MARKER,
	relevance::RELEVANCE_MARKER,
};
use lectern_testkit::{Harness, test_config};

fn intent(action: Action, explicitness: Explicitness) -> Intent {
	Intent { action, scope: Scope::Single, explicitness, confidence: 0.9, reasoning: String::new() }
}

fn search(query: &str) -> Intent {
	intent(Action::Search { query: query.to_string() }, Explicitness::Medium)
}

fn session() -> Session {
	Session::new("s-1", "u-1")
}

fn assert_consistent(session: &Session) {
	assert_eq!(session.state() == SessionState::Focused, session.focus().is_some());
}

fn bare(doc: &Document) -> Document {
	Document::new(doc.id, doc.title.clone())
}

fn expect_answer(grounding: Grounding) -> lectern_domain::context::GroundedContext {
	match grounding {
		Grounding::Answer(ctx) => ctx,
		Grounding::Reply(reply) => panic!("Expected an answer, got reply: {reply}"),
	}
}

fn expect_reply(grounding: Grounding) -> String {
	match grounding {
		Grounding::Reply(reply) => reply,
		Grounding::Answer(ctx) => panic!("Expected a reply, got context: {ctx:?}"),
	}
}

#[tokio::test]
async fn search_keeps_scores_at_threshold_in_descending_order() {
	let mut cfg = test_config();

	cfg.search.snippet_chars = 5;

	let h = Harness::with_config(cfg);
	let a = h.store.insert("Alpha", "alpha body text");
	let b = h.store.insert("Beta", "beta body text");
	let c = h.store.insert("Gamma", "gamma body text");

	h.store.set_hits(vec![(a.id, 0.5), (b.id, 0.34), (c.id, 0.36), (a.id, 0.4)]);

	let found = h
		.service
		.search_documents("body", "u-1", SearchConfig::default())
		.await
		.expect("Search should succeed.");

	assert_eq!(found.iter().map(|doc| doc.id).collect::<Vec<_>>(), vec![a.id, c.id]);
	assert_eq!(found[0].score, 0.5);
	assert_eq!(found[1].score, 0.36);
	assert_eq!(found[0].content, "alpha...");
	assert_eq!(found[1].title, "Gamma");
}

#[tokio::test]
async fn lone_search_survivor_carries_full_content() {
	let mut cfg = test_config();

	cfg.search.snippet_chars = 5;

	let h = Harness::with_config(cfg);
	let a = h.store.insert("Alpha", "alpha body text");
	let b = h.store.insert("Beta", "beta body text");

	h.store.set_hits(vec![(a.id, 0.8), (b.id, 0.1)]);

	let found = h
		.service
		.search_documents("alpha", "u-1", SearchConfig::default())
		.await
		.expect("Search should succeed.");

	assert_eq!(found.len(), 1);
	assert_eq!(found[0].content, "alpha body text");
}

#[tokio::test]
async fn stale_index_hit_leaves_the_survivor_fully_hydrated() {
	let mut cfg = test_config();

	cfg.search.snippet_chars = 5;

	let h = Harness::with_config(cfg);
	let a = h.store.insert("Alpha", "alpha body text that is long");
	let b = h.store.insert("Beta", "beta body text");

	h.store.set_hits(vec![(a.id, 0.8), (b.id, 0.7)]);
	h.store.remove(b.id);

	let mut session = session();
	let ctx = expect_answer(h.service.ground(&search("alpha"), &mut session, "alpha?", &[]).await);

	assert_eq!(ctx.ids, vec![a.id]);
	assert_eq!(ctx.notes[0].content, "alpha body text that is long");
	assert_eq!(session.focused_document().map(|focused| focused.id), Some(a.id));
	assert_consistent(&session);
}

#[tokio::test]
async fn embedding_failure_is_returned_from_search() {
	let h = Harness::with_failing_embedding();
	let err = h
		.service
		.search_documents("anything", "u-1", SearchConfig::default())
		.await
		.expect_err("Embedding failure should surface.");

	assert!(matches!(err, Error::Provider { .. }));
	assert_eq!(h.store.search_calls(), 0);
}

#[tokio::test]
async fn single_search_result_is_focused_and_answered() {
	let h = Harness::new();
	let doc = h.store.insert("Rent", "Rent is 900 per month.");

	h.store.set_hits(vec![(doc.id, 0.72)]);

	let mut session = session();
	let ctx = expect_answer(h.service.ground(&search("rent"), &mut session, "rent?", &[]).await);

	assert_eq!(ctx.scope, Scope::Single);
	assert_eq!(ctx.focus_index, 1);
	assert_eq!(ctx.ids, vec![doc.id]);
	assert_eq!(ctx.notes[0].content, "Rent is 900 per month.");
	assert_eq!(session.state(), SessionState::Focused);
	assert_eq!(session.focused_document().map(|focused| focused.id), Some(doc.id));
	assert_eq!(session.mode(), Mode::Rag);
	assert!(h.llm.calls().is_empty());
	assert_consistent(&session);
}

#[tokio::test]
async fn ambiguous_search_with_medium_explicitness_browses() {
	let h = Harness::new();
	let docs: Vec<Document> = ["Exam 1", "Exam 2", "Exam 3"]
		.iter()
		.map(|title| h.store.insert(title, "questions"))
		.collect();

	h.store.set_hits(docs.iter().map(|doc| (doc.id, 0.6)).collect());
	h.llm.reply(RELEVANCE_MARKER, r#"{"relevant": [1, 2, 3]}"#);
	h.llm.reply(MESSENGER_MARKER, "Which exam do you mean?");

	let mut session = session();
	let reply = expect_reply(
		h.service.ground(&search("english exam"), &mut session, "answer my english exam", &[]).await,
	);

	assert_eq!(reply, "Which exam do you mean?\n\n1. Exam 1\n2. Exam 2\n3. Exam 3");
	assert_eq!(session.state(), SessionState::Browsing);
	assert_eq!(session.candidates().len(), 3);
	assert_consistent(&session);
}

#[tokio::test]
async fn relevance_filter_narrowing_to_one_focuses_it() {
	let h = Harness::new();
	let a = h.store.insert("Cat food", "brand A");
	let b = h.store.insert("Dog food", "brand B, 12 dollars");

	h.store.set_hits(vec![(a.id, 0.7), (b.id, 0.65)]);
	h.llm.reply(RELEVANCE_MARKER, "```json\n{\"relevant\": [2]}\n```");

	let mut session = session();
	let ctx =
		expect_answer(h.service.ground(&search("dog food"), &mut session, "dog food?", &[]).await);

	assert_eq!(ctx.ids, vec![b.id]);
	assert_eq!(ctx.focus_index, 1);
	assert_eq!(ctx.notes[0].content, "brand B, 12 dollars");
	assert_eq!(session.candidates().len(), 1);
	assert_consistent(&session);
}

#[tokio::test]
async fn relevance_filter_rejecting_everything_is_not_found() {
	let h = Harness::new();
	let a = h.store.insert("A", "a");
	let b = h.store.insert("B", "b");

	h.store.set_hits(vec![(a.id, 0.7), (b.id, 0.65)]);
	h.llm.reply(RELEVANCE_MARKER, r#"{"relevant": []}"#);

	let mut session = session();
	let reply = expect_reply(h.service.ground(&search("zebra"), &mut session, "zebra", &[]).await);

	assert!(reply.starts_with("I couldn't find any notes"));
	assert!(session.is_empty());
}

#[tokio::test]
async fn high_explicitness_aggregates_all_relevant_results() {
	let h = Harness::new();
	let a = h.store.insert("Q1 report", "revenue 10");
	let b = h.store.insert("Q2 report", "revenue 12");

	h.store.set_hits(vec![(a.id, 0.7), (b.id, 0.6)]);

	let mut session = session();
	let ctx = expect_answer(
		h.service
			.ground(
				&intent(Action::Search { query: "reports".to_string() }, Explicitness::High),
				&mut session,
				"sum revenue over all reports",
				&[],
			)
			.await,
	);

	assert_eq!(ctx.scope, Scope::All);
	assert_eq!(ctx.ids, vec![a.id, b.id]);
	assert_eq!(ctx.notes[1].content, "revenue 12");
	assert!(session.is_aggregated());
	assert_consistent(&session);
}

#[tokio::test]
async fn focus_out_of_range_leaves_session_unchanged() {
	let h = Harness::new();
	let docs: Vec<Document> =
		["A", "B", "C"].iter().map(|title| bare(&h.store.insert(title, "body"))).collect();
	let mut session = session();

	session.to_browsing(docs.clone());

	for target in [5, 3, -1] {
		let reply = expect_reply(
			h.service
				.ground(
					&intent(Action::Focus { target }, Explicitness::High),
					&mut session,
					"the sixth",
					&[],
				)
				.await,
		);

		assert_eq!(reply, "That number isn't on the list. Please choose a number between 1 and 3.");
		assert_eq!(session.state(), SessionState::Browsing);
		assert_eq!(session.candidates(), docs.as_slice());
	}

	assert_eq!(h.store.find_calls(), 0);
}

#[tokio::test]
async fn focus_loads_the_chosen_candidate() {
	let h = Harness::new();
	let a = h.store.insert("A", "alpha");
	let b = h.store.insert("B", "beta full text");
	let mut session = session();

	session.to_browsing(vec![bare(&a), bare(&b)]);

	let ctx = expect_answer(
		h.service
			.ground(&intent(Action::Focus { target: 1 }, Explicitness::High), &mut session, "2", &[])
			.await,
	);

	assert_eq!(ctx.focus_index, 2);
	assert_eq!(ctx.notes[0].content, "beta full text");
	assert_eq!(ctx.candidates.len(), 2);
	assert_eq!(session.focus_index(), 2);
	assert_consistent(&session);
}

#[tokio::test]
async fn focus_load_failure_is_a_direct_message() {
	let h = Harness::new();
	let a = h.store.insert("A", "alpha");
	let b = h.store.insert("Budget", "beta");
	let mut session = session();

	session.to_browsing(vec![bare(&a), bare(&b)]);
	h.store.fail_find(true);

	let reply = expect_reply(
		h.service
			.ground(&intent(Action::Focus { target: 1 }, Explicitness::High), &mut session, "2", &[])
			.await,
	);

	assert!(reply.starts_with("I couldn't open \"Budget\""));
	assert_eq!(session.state(), SessionState::Browsing);
	assert!(h.llm.calls().is_empty());
}

#[tokio::test]
async fn aggregate_then_answer_expands_back_to_each_note() {
	let h = Harness::new();
	let a = h.store.insert("A", "alpha");
	let b = h.store.insert("B", "beta");
	let mut session = session();

	session.to_browsing(vec![bare(&a), bare(&b)]);

	let aggregated = expect_answer(
		h.service
			.ground(
				&intent(Action::Aggregate { query: None }, Explicitness::High),
				&mut session,
				"both",
				&[],
			)
			.await,
	);
	let answered = expect_answer(
		h.service
			.ground(&intent(Action::Answer, Explicitness::Medium), &mut session, "and?", &[])
			.await,
	);

	assert_eq!(aggregated.ids, vec![a.id, b.id]);
	assert_eq!(answered.ids, vec![a.id, b.id]);
	assert_eq!(answered.scope, Scope::All);
	assert_eq!(answered.notes.len(), 2);
	assert_eq!(answered.notes[0].content, "alpha");
	assert!(session.is_aggregated());
	assert_consistent(&session);
}

#[tokio::test]
async fn aggregate_failure_to_load_is_a_direct_message() {
	let h = Harness::new();
	let a = h.store.insert("A", "alpha");
	let b = h.store.insert("B", "beta");
	let mut session = session();

	session.to_browsing(vec![bare(&a), bare(&b)]);
	h.store.fail_find(true);

	let reply = expect_reply(
		h.service
			.ground(
				&intent(Action::Aggregate { query: None }, Explicitness::High),
				&mut session,
				"all",
				&[],
			)
			.await,
	);

	assert_eq!(reply, AGGREGATE_UNAVAILABLE);
	assert_eq!(session.state(), SessionState::Browsing);
}

#[tokio::test]
async fn aggregate_on_empty_session_bootstraps_a_search() {
	let h = Harness::new();
	let a = h.store.insert("Receipt March", "12");
	let b = h.store.insert("Receipt April", "15");

	h.store.set_hits(vec![(a.id, 0.8), (b.id, 0.7)]);

	let mut session = session();
	let ctx = expect_answer(
		h.service
			.ground(
				&intent(
					Action::Aggregate { query: Some("tax receipts".to_string()) },
					Explicitness::High,
				),
				&mut session,
				"total all my receipts",
				&[],
			)
			.await,
	);
	let relevance = h.llm.calls_matching(RELEVANCE_MARKER);

	assert_eq!(ctx.ids, vec![a.id, b.id]);
	assert_eq!(relevance.len(), 1);
	assert!(relevance[0].text.contains("tax receipts"));
	assert!(session.is_aggregated());
}

#[tokio::test]
async fn answer_without_focus_degrades() {
	let h = Harness::new();
	let answer = intent(Action::Answer, Explicitness::Medium);
	let mut empty = session();
	let lost = expect_reply(h.service.ground(&answer, &mut empty, "and then?", &[]).await);

	assert!(lost.starts_with("I've lost track"));

	let a = h.store.insert("A", "alpha");
	let mut browsing = session();

	browsing.to_browsing(vec![bare(&a)]);

	let listed = expect_reply(h.service.ground(&answer, &mut browsing, "and then?", &[]).await);

	assert!(listed.contains("1. A"));
	assert_consistent(&browsing);
}

#[tokio::test]
async fn answer_reloads_a_focus_restored_without_content() {
	let h = Harness::new();
	let a = h.store.insert("A", "alpha full");
	let mut session = session();

	session.to_focused(bare(&a));

	let ctx = expect_answer(
		h.service.ground(&intent(Action::Answer, Explicitness::Medium), &mut session, "?", &[]).await,
	);

	assert_eq!(ctx.notes[0].content, "alpha full");
	assert_eq!(session.focused_document().map(|doc| doc.content.as_str()), Some("alpha full"));
}

#[tokio::test]
async fn answer_on_a_deleted_focus_loses_context() {
	let h = Harness::new();
	let a = h.store.insert("A", "alpha");
	let b = h.store.insert("B", "beta");
	let mut session = session();

	session.to_browsing(vec![bare(&a), bare(&b)]);
	session.to_focused(bare(&a));
	h.store.remove(a.id);

	let reply = expect_reply(
		h.service.ground(&intent(Action::Answer, Explicitness::Medium), &mut session, "?", &[]).await,
	);

	assert!(reply.starts_with("I've lost track"));
	assert_eq!(session.state(), SessionState::Browsing);
	assert_eq!(session.candidates().iter().map(|doc| doc.id).collect::<Vec<_>>(), vec![b.id]);
}

#[tokio::test]
async fn meta_analysis_answers_from_history_and_answer_returns_to_rag() {
	let h = Harness::new();
	let a = h.store.insert("A", "alpha");
	let mut session = session();

	session.to_focused(a.clone());

	let ctx = expect_answer(
		h.service
			.ground(
				&intent(Action::MetaAnalysis, Explicitness::Medium),
				&mut session,
				"what did I ask first?",
				&[],
			)
			.await,
	);

	assert_eq!(ctx.scope, Scope::None);
	assert!(ctx.notes.is_empty());
	assert_eq!(session.mode(), Mode::Nuance);

	expect_answer(
		h.service.ground(&intent(Action::Answer, Explicitness::Medium), &mut session, "ok", &[]).await,
	);

	assert_eq!(session.mode(), Mode::Rag);
}

#[tokio::test]
async fn clarify_without_candidates_asks_a_question() {
	let h = Harness::new();
	let mut session = session();
	let reply = expect_reply(
		h.service.ground(&intent(Action::Clarify, Explicitness::Low), &mut session, "hmm", &[]).await,
	);

	assert!(reply.starts_with("Could you tell me a bit more"));
	assert!(session.is_empty());
}

#[tokio::test]
async fn retrieval_failure_is_a_direct_message() {
	let h = Harness::new();

	h.store.fail_search(true);

	let mut session = session();
	let reply = expect_reply(h.service.ground(&search("x"), &mut session, "x", &[]).await);

	assert_eq!(reply, SEARCH_UNAVAILABLE);
	assert!(session.is_empty());
}
