#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end replan flow against a mock Gemini server:
//!   1. Generate an initial plan and load it into a session
//!   2. Check off progress and lock a chunk
//!   3. Replan with the locked chunk riding along in the request
//!   4. Review the diff: kept, reworked, dropped, and new chunks
//!   5. Accept, and verify progress and locks reset
//!   6. Add a stuck suggestion and watch the fallback cover an outage

use momentum_core::{
    DiffStatus, GenerationClient, GenerationConfig, PlanSession, RetryConfig, SessionState,
    diff_plans,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn candidate_response(payload: &Value) -> Value {
    json!({
        "candidates": [
            { "content": { "parts": [{ "text": payload.to_string() }] } }
        ]
    })
}

fn initial_plan_json() -> Value {
    json!({
        "chunks": [
            {
                "chunkTitle": "Lay out the pieces",
                "energyTag": "Low",
                "subSteps": [
                    { "description": "Unbox everything", "estimate": "10 min" },
                    { "description": "Check the manual", "estimate": "5 min" }
                ]
            },
            {
                "chunkTitle": "Build the frame",
                "energyTag": "High",
                "subSteps": [
                    { "description": "Attach the legs", "estimate": "30 min" }
                ]
            },
            {
                "chunkTitle": "Finish the surface",
                "energyTag": "Medium",
                "subSteps": [
                    { "description": "Sand it down", "estimate": "20 min" }
                ]
            }
        ],
        "acceptanceCriteria": ["Table stands level", "No leftover screws"]
    })
}

/// The replan keeps the locked chunk verbatim, reworks "Build the frame",
/// drops "Finish the surface", and adds "Paint it".
fn replan_json() -> Value {
    json!({
        "chunks": [
            {
                "chunkTitle": "Lay out the pieces",
                "energyTag": "Low",
                "subSteps": [
                    { "description": "Unbox everything", "estimate": "10 min" },
                    { "description": "Check the manual", "estimate": "5 min" }
                ]
            },
            {
                "chunkTitle": "Build the frame",
                "energyTag": "High",
                "subSteps": [
                    { "description": "Attach the legs", "estimate": "30 min" },
                    { "description": "Tighten every bolt", "estimate": "10 min" }
                ]
            },
            {
                "chunkTitle": "Paint it",
                "energyTag": "Medium",
                "subSteps": [
                    { "description": "Apply the first coat", "estimate": "25 min" }
                ]
            }
        ],
        "acceptanceCriteria": ["Table stands level", "Surface is painted"]
    })
}

#[tokio::test]
async fn replan_round_trip_preserves_locks_and_resets_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash:generateContent"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(candidate_response(&initial_plan_json())),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(candidate_response(&replan_json())))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Anything after the two generations is down, which the stuck-suggestion
    // fallback has to absorb.
    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let config = GenerationConfig {
        base_url: server.uri(),
        retry: RetryConfig {
            initial_backoff_ms: 10,
            ..Default::default()
        },
        ..Default::default()
    };
    let client = GenerationClient::new("test-key", config);
    let cancel = CancellationToken::new();

    // 1. Generate and load the initial plan.
    let mut session = PlanSession::new("assemble the new table");
    let plan = client
        .generate_plan(session.goal_text(), &cancel)
        .await
        .expect("initial generation");
    session.load_plan(plan);
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.remaining_chunks(), 3);

    // 2. Work through the first chunk and lock it.
    session.toggle_step(0, 0).unwrap();
    session.toggle_step(0, 1).unwrap();
    session.toggle_lock(0).unwrap();
    assert_eq!(session.remaining_chunks(), 2);

    // 3. Replan around the locked chunk.
    session.begin_replan().unwrap();
    assert_eq!(session.state(), SessionState::Replanning);
    let locked = session.locked_chunk_values();
    assert_eq!(locked.len(), 1);
    let candidate = client
        .generate_replan(session.goal_text(), &locked, &cancel)
        .await
        .expect("replan generation");
    session.complete_replan(candidate).unwrap();
    assert_eq!(session.state(), SessionState::ReviewingDiff);

    let requests = server.received_requests().await.unwrap();
    let replan_body: Value = requests[1].body_json().unwrap();
    let user_text = replan_body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(user_text.contains("Lay out the pieces"));
    assert!(user_text.contains("Check the manual"));

    // 4. The diff shows exactly what changed.
    let diff = session.review_diff().unwrap();
    let statuses: Vec<(&str, DiffStatus)> = diff
        .chunks
        .iter()
        .map(|entry| (entry.data.chunk_title.as_str(), entry.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("Lay out the pieces", DiffStatus::Unchanged),
            ("Build the frame", DiffStatus::Modified),
            ("Finish the surface", DiffStatus::Removed),
            ("Paint it", DiffStatus::Added),
        ]
    );
    let frame_steps = diff.chunks[1].sub_step_diffs.as_ref().unwrap();
    assert_eq!(frame_steps[0].status, DiffStatus::Unchanged);
    assert_eq!(frame_steps[1].status, DiffStatus::Added);
    assert_eq!(frame_steps[1].data.description, "Tighten every bolt");
    assert!(diff.chunks[2].sub_step_diffs.is_none());
    assert!(diff.chunks[3].sub_step_diffs.is_none());

    // 5. Accept: the candidate becomes current, progress and locks reset.
    session.accept_replan().unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert!(!session.is_step_checked(0, 0));
    assert!(!session.is_chunk_locked(0));
    assert_eq!(session.remaining_chunks(), 3);
    let accepted = session.plan().unwrap();
    assert_eq!(accepted.chunks[2].chunk_title, "Paint it");
    assert_eq!(
        accepted.acceptance_criteria,
        vec!["Table stands level".to_string(), "Surface is painted".to_string()]
    );

    // Accepting a plan and diffing it against itself reports no changes.
    let self_diff = diff_plans(accepted, accepted);
    assert!(
        self_diff
            .chunks
            .iter()
            .all(|entry| entry.status == DiffStatus::Unchanged)
    );

    // 6. Stuck on painting: the suggestion lands even though the model is
    //    down, and the appended sub-step carries the fixed estimate.
    let suggestions = client
        .generate_stuck_suggestions(session.goal_text(), &accepted.chunks[2])
        .await;
    assert_eq!(suggestions.len(), 3);
    assert_eq!(suggestions[0], "Take a 5-minute break and come back.");

    session.add_stuck_suggestion(2, suggestions[0].clone()).unwrap();
    let updated = session.plan().unwrap();
    let appended = updated.chunks[2].sub_steps.last().unwrap();
    assert_eq!(appended.description, "Take a 5-minute break and come back.");
    assert_eq!(appended.estimate, "Just do it");
}
