use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::db::types::QuizStatus;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn student_slots_open_an_attempt_without_answers() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let school = test_support::insert_school(db, "Eastwood").await;
    let (user, student) = test_support::insert_student(db, "reader", &school.id, 7).await;
    let quiz = test_support::insert_quiz(db, "Round one", true).await;
    for index in 1..=3 {
        let question = test_support::insert_question(db, &format!("q-{index}"), 1, vec![index]).await;
        test_support::insert_slot(db, &quiz.id, &question.id, index as i32, 0).await;
    }
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/quizzes/{}/slots", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("slots");

    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    let slots = body["slots"].as_array().expect("slots array");
    assert_eq!(slots.len(), 3);
    assert!(slots.iter().all(|slot| slot.get("answers").is_none()));
    assert_eq!(body["attempt"]["state"], "in_progress");

    let attempt = repositories::quiz_attempts::find_by_quiz_student(db, &quiz.id, &student.id)
        .await
        .expect("load attempt");
    assert!(attempt.is_some());
}

#[tokio::test]
async fn admin_sees_answers_in_slot_order() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let admin = test_support::insert_admin(db, "boss").await;
    let quiz = test_support::insert_quiz(db, "Ordered", false).await;
    let second = test_support::insert_question(db, "q-second", 1, vec![2]).await;
    let first = test_support::insert_question(db, "q-first", 1, vec![1]).await;
    test_support::insert_slot(db, &quiz.id, &second.id, 2, 0).await;
    test_support::insert_slot(db, &quiz.id, &first.id, 1, 0).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/quizzes/{}/slots", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("slots");

    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["slots"][0]["question_id"], first.id);
    assert_eq!(body["slots"][0]["answers"], json!([1]));
    assert_eq!(body["slots"][1]["question_id"], second.id);
    assert!(body["attempt"].is_null());
}

#[tokio::test]
async fn duplicate_slot_index_is_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let admin = test_support::insert_admin(db, "editor").await;
    let quiz = test_support::insert_quiz(db, "Clash", false).await;
    let a = test_support::insert_question(db, "q-a", 1, vec![1]).await;
    let b = test_support::insert_question(db, "q-b", 1, vec![2]).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/quizzes/{}/slots", quiz.id),
            Some(&token),
            Some(json!([
                { "question_id": a.id, "slot_index": 1 },
                { "question_id": b.id, "slot_index": 1 }
            ])),
        ))
        .await
        .expect("replace slots");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let stored = repositories::quiz_slots::list_by_quiz(db, &quiz.id).await.expect("slots");
    assert!(stored.is_empty());
}

#[tokio::test]
async fn empty_slot_list_keeps_existing_slots() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let admin = test_support::insert_admin(db, "tidier").await;
    let quiz = test_support::insert_quiz(db, "Keepers", false).await;
    let question = test_support::insert_question(db, "q-keep", 1, vec![1]).await;
    test_support::insert_slot(db, &quiz.id, &question.id, 1, 0).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/quizzes/{}/slots", quiz.id),
            Some(&token),
            Some(json!([])),
        ))
        .await
        .expect("replace slots");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test_support::read_json(response).await["detail"], "At least one slot is required");
    let stored = repositories::quiz_slots::list_by_quiz(db, &quiz.id).await.expect("slots");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn replacing_slots_recomputes_total_marks() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let admin = test_support::insert_admin(db, "setter").await;
    let quiz = test_support::insert_quiz(db, "Totals", false).await;
    let a = test_support::insert_question(db, "q-two", 2, vec![1]).await;
    let b = test_support::insert_question(db, "q-three", 3, vec![2]).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/quizzes/{}/slots", quiz.id),
            Some(&token),
            Some(json!({ "slots": [
                { "question_id": a.id, "slot_index": 1 },
                { "question_id": b.id, "slot_index": 2, "block": 1 }
            ] })),
        ))
        .await
        .expect("replace slots");

    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["total_marks"], 5);
    assert_eq!(body["slots"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn marking_twice_gives_the_same_totals() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let admin = test_support::insert_admin(db, "marker").await;
    let school = test_support::insert_school(db, "Westfield").await;
    let (user, _student) = test_support::insert_student(db, "candidate", &school.id, 8).await;
    let quiz = test_support::insert_quiz(db, "Final", true).await;
    let question = test_support::insert_question(db, "q-final", 4, vec![12]).await;
    test_support::insert_slot(db, &quiz.id, &question.id, 1, 0).await;
    let student_token = test_support::bearer_token(&user.id, ctx.state.settings());
    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/quiz-attempts",
            Some(&student_token),
            Some(json!({ "quiz_id": quiz.id })),
        ))
        .await
        .expect("create attempt");
    let attempt = test_support::read_json(response).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/question-attempts",
            Some(&student_token),
            Some(json!({
                "quiz_attempt_id": attempt["id"],
                "question_id": question.id,
                "answer_student": 12
            })),
        ))
        .await
        .expect("answer");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(test_support::read_json(response).await["is_correct"].is_null());

    let mut summaries = Vec::new();
    for _ in 0..2 {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/quizzes/{}/marking", quiz.id),
                Some(&admin_token),
                None,
            ))
            .await
            .expect("marking");
        assert_eq!(response.status(), StatusCode::OK);
        summaries.push(test_support::read_json(response).await);
    }
    assert_eq!(summaries[0], summaries[1]);
    assert_eq!(summaries[0]["correct"], 1);

    let stored = repositories::quiz_attempts::find_by_id(db, attempt["id"].as_str().unwrap())
        .await
        .expect("load attempt")
        .expect("attempt");
    assert_eq!(stored.total_marks, 4);
}

#[tokio::test]
async fn extension_opens_an_untouched_attempt_after_close() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let school = test_support::insert_school(db, "Latecomers").await;
    let (user, student) = test_support::insert_student(db, "slowpoke", &school.id, 9).await;
    let opened = primitive_now_utc() - Duration::minutes(90);
    let quiz = test_support::insert_quiz_with(
        db,
        "Closed comp",
        true,
        Some(opened),
        Some(10),
        QuizStatus::Finished,
    )
    .await;
    let attempt = repositories::quiz_attempts::create(
        db,
        repositories::quiz_attempts::CreateAttempt {
            id: "attempt-late",
            quiz_id: &quiz.id,
            student_id: &student.id,
            team_id: None,
            shuffle_seed: 7,
            time_start: opened,
        },
    )
    .await
    .expect("insert attempt")
    .expect("new attempt");
    repositories::students::set_extension(db, &student.id, 30, primitive_now_utc())
        .await
        .expect("grant extension");
    let token = test_support::bearer_token(&user.id, ctx.state.settings());
    let uri = format!("/api/v1/quiz-attempts/{}/availability", attempt.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&token), None))
        .await
        .expect("availability");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["available"], true);
    assert_eq!(body["state"], "in_progress");

    let student = repositories::students::find_by_id(db, &student.id)
        .await
        .expect("load student")
        .expect("student");
    assert_eq!(student.extension_time, 0);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, &uri, Some(&token), None))
        .await
        .expect("availability again");
    let body = test_support::read_json(response).await;
    assert_eq!(body["available"], true);
}

#[tokio::test]
async fn competition_without_open_time_is_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let admin = test_support::insert_admin(ctx.state.db(), "planner").await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/quizzes",
            Some(&token),
            Some(json!({ "name": "Regional", "is_comp": true })),
        ))
        .await
        .expect("create quiz");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_time_limits_are_rejected() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let admin = test_support::insert_admin(db, "stretcher").await;
    let quiz = test_support::insert_quiz(db, "Bounded", false).await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/quizzes",
            Some(&token),
            Some(json!({ "name": "Forever", "is_comp": false, "time_limit": i32::MAX })),
        ))
        .await
        .expect("create quiz");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/quizzes/{}", quiz.id),
            Some(&token),
            Some(json!({ "time_window": 1441 })),
        ))
        .await
        .expect("update quiz");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let stored = repositories::quizzes::find_by_id(db, &quiz.id)
        .await
        .expect("load quiz")
        .expect("quiz");
    assert_eq!(stored.time_window, quiz.time_window);
}

#[tokio::test]
async fn hidden_quizzes_are_not_found_for_students() {
    let Some(ctx) = test_support::setup_test_context().await else { return };
    let db = ctx.state.db();
    let school = test_support::insert_school(db, "Hidden Hills").await;
    let (user, _student) = test_support::insert_student(db, "curious", &school.id, 7).await;
    let quiz = test_support::insert_quiz(db, "Secret", false).await;
    repositories::quizzes::update(
        db,
        &quiz.id,
        repositories::quizzes::UpdateQuiz { visible: Some(false), ..Default::default() },
        primitive_now_utc(),
    )
    .await
    .expect("hide quiz");
    let token = test_support::bearer_token(&user.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/quizzes/{}", quiz.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get quiz");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
