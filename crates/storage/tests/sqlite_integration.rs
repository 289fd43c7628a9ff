use chrono::Duration;
use quiz_core::model::{AnswerTracker, AttemptResult, CurrentUser, Question, Quiz, QuizId, UserId};
use quiz_core::time::fixed_now;
use storage::repository::{AttemptRepository, QuizRepository, StorageError};
use storage::sqlite::SqliteRepository;

fn build_quiz(id: u64) -> Quiz {
    let questions = vec![
        Question::new(
            0,
            "Largest planet?",
            vec!["Mars".into(), "Jupiter".into(), "Venus".into()],
            1,
        )
        .unwrap(),
        Question::new(1, "H2O is?", vec!["Water".into(), "Salt".into()], 0).unwrap(),
    ];
    Quiz::new(
        QuizId::new(id),
        "Science",
        Some("Warm-up".into()),
        questions,
        UserId::new("author-1"),
        fixed_now(),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrips_quiz_questions() {
    let repo = connect("memdb_quiz_roundtrip").await;
    let quiz = build_quiz(1);
    repo.upsert_quiz(&quiz).await.unwrap();

    let fetched = repo.get_quiz(quiz.id()).await.expect("fetch");
    assert_eq!(fetched, quiz);
    assert_eq!(fetched.question(0).unwrap().options()[1], "Jupiter");

    let listed = repo.list_quizzes(10).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn sqlite_missing_quiz_is_not_found() {
    let repo = connect("memdb_quiz_missing").await;
    let err = repo.get_quiz(QuizId::new(404)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_rejects_stored_quiz_with_single_option() {
    let repo = connect("memdb_quiz_invalid").await;
    sqlx::query(
        r#"
        INSERT INTO quizzes (id, title, description, questions, created_by, created_at)
        VALUES (7, 'Broken', NULL, '[{"question":"Q","options":["only"],"correctAnswer":0}]', 'a', ?1)
        "#,
    )
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap();

    let err = repo.get_quiz(QuizId::new(7)).await.unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[tokio::test]
async fn sqlite_appends_and_lists_attempts() {
    let repo = connect("memdb_attempts").await;
    let quiz = build_quiz(1);
    repo.upsert_quiz(&quiz).await.unwrap();

    let user = CurrentUser::new(UserId::new("player"), "player@example.com");
    let mut tracker = AnswerTracker::for_quiz(&quiz);
    tracker.set(0, 1).unwrap();
    let early = AttemptResult::from_session(&quiz, &tracker, &user, fixed_now());
    tracker.set(1, 0).unwrap();
    let late = AttemptResult::from_session(
        &quiz,
        &tracker,
        &user,
        fixed_now() + Duration::minutes(5),
    );

    let early_id = repo.append_attempt(&early).await.unwrap();
    let late_id = repo.append_attempt(&late).await.unwrap();

    let stored = repo.get_attempt(early_id).await.unwrap();
    assert_eq!(stored, early);
    assert_eq!(stored.answers(), &[Some(1), None]);
    assert_eq!(stored.score(), 50);

    let rows = repo
        .list_attempts_for_user(&UserId::new("player"), 10)
        .await
        .unwrap();
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![late_id, early_id]);
    assert_eq!(rows[0].attempt.score(), 100);

    let by_quiz = repo.list_attempts_for_quiz(quiz.id(), 1).await.unwrap();
    assert_eq!(by_quiz.len(), 1);
    assert_eq!(by_quiz[0].id, late_id);

    let none = repo
        .list_attempts_for_user(&UserId::new("someone-else"), 10)
        .await
        .unwrap();
    assert!(none.is_empty());
}
