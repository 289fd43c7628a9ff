use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{CurrentUser, Question, Quiz, QuizId, SessionSettings, UserId};
use quiz_core::time::fixed_now;
use services::{
    AdvanceOutcome, AdvanceTrigger, AttemptHistoryService, Clock, QuizSessionService,
    SessionView, StaticIdentity,
};
use storage::repository::{AttemptRepository, InMemoryRepository, QuizRepository};
use tokio::time::sleep;

async fn seeded(correct: &[usize]) -> (InMemoryRepository, QuizSessionService) {
    let repo = InMemoryRepository::new();
    let questions = correct
        .iter()
        .enumerate()
        .map(|(i, c)| {
            Question::new(
                i,
                format!("Question {i}"),
                vec!["red".into(), "green".into(), "blue".into()],
                *c,
            )
            .unwrap()
        })
        .collect();
    let quiz = Quiz::new(
        QuizId::new(7),
        "Smoke Quiz",
        Some("colours".into()),
        questions,
        UserId::new("author"),
        fixed_now(),
    )
    .unwrap();
    repo.upsert_quiz(&quiz).await.unwrap();

    let player = CurrentUser::new(UserId::new("player"), "player@example.com");
    let svc = QuizSessionService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(StaticIdentity::signed_in(player)),
    )
    .with_settings(SessionSettings::new(30).unwrap());
    (repo, svc)
}

#[tokio::test(start_paused = true)]
async fn all_correct_before_timeout_scores_full_marks() {
    let (repo, svc) = seeded(&[0, 1, 2]).await;
    let handle = svc.start_session(QuizId::new(7)).await.unwrap();

    for option in 0..3 {
        sleep(Duration::from_secs(5)).await;
        handle.select_answer(option).await.unwrap();
        handle.advance().await.unwrap();
    }

    let report = handle.close().await.unwrap();
    let result = report.result.expect("completed");
    assert_eq!(result.correct_answers(), 3);
    assert_eq!(result.score(), 100);
    assert_eq!(report.triggers, vec![AdvanceTrigger::User; 3]);

    let history = AttemptHistoryService::new(Arc::new(repo));
    let items = history
        .list_for_user(&UserId::new("player"), 10)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(Some(items[0].id), report.attempt_id);
}

#[tokio::test(start_paused = true)]
async fn timed_out_question_scores_as_incorrect() {
    let (repo, svc) = seeded(&[0, 1]).await;
    let handle = svc.start_session(QuizId::new(7)).await.unwrap();

    sleep(Duration::from_secs(31)).await;
    assert_eq!(handle.view().question(), Some(1));
    assert!(handle.remaining_secs() >= 29);

    handle.select_answer(1).await.unwrap();
    let outcome = handle.advance().await.unwrap();
    let AdvanceOutcome::Completed(result) = outcome else {
        panic!("expected completion");
    };
    assert_eq!(result.correct_answers(), 1);
    assert_eq!(result.score(), 50);
    assert_eq!(result.answers(), &[None, Some(1)]);

    let report = handle.close().await.unwrap();
    assert_eq!(
        report.triggers,
        vec![AdvanceTrigger::Timeout, AdvanceTrigger::User]
    );
    let stored = repo.get_attempt(report.attempt_id.unwrap()).await.unwrap();
    assert_eq!(stored, result);
}

#[tokio::test(start_paused = true)]
async fn unattended_session_completes_by_timeouts() {
    let (repo, svc) = seeded(&[0, 0]).await;
    let handle = svc.start_session(QuizId::new(7)).await.unwrap();
    let mut views = handle.subscribe();

    let result = handle.completed().await.unwrap();
    assert_eq!(result.correct_answers(), 0);
    assert_eq!(result.score(), 0);
    assert!(matches!(
        &*views.borrow_and_update(),
        SessionView::Completed(_)
    ));

    let report = handle.close().await.unwrap();
    assert_eq!(report.triggers, vec![AdvanceTrigger::Timeout; 2]);
    assert!(report.attempt_id.is_some());
    assert_eq!(
        repo.list_attempts_for_quiz(QuizId::new(7), 10)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn last_selection_wins() {
    let (_repo, svc) = seeded(&[2]).await;
    let handle = svc.start_session(QuizId::new(7)).await.unwrap();
    handle.select_answer(0).await.unwrap();
    handle.select_answer(1).await.unwrap();
    handle.select_answer(2).await.unwrap();
    handle.advance().await.unwrap();

    let report = handle.close().await.unwrap();
    assert_eq!(report.result.unwrap().correct_answers(), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_session_persists_nothing() {
    let (repo, svc) = seeded(&[0, 1]).await;
    let handle = svc.start_session(QuizId::new(7)).await.unwrap();
    handle.select_answer(0).await.unwrap();
    drop(handle);

    sleep(Duration::from_secs(120)).await;
    assert!(
        repo.list_attempts_for_user(&UserId::new("player"), 10)
            .await
            .unwrap()
            .is_empty()
    );
}
