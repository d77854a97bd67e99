use pbq_core::determinism::shuffle::ShuffleSeed;
use pbq_core::progress::ProgressTracker;
use pbq_core::quiz::bank::question_bank_v1;
use pbq_core::quiz::{select_questions, QuizMode, QuizSession};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

/// Answers every question, getting the first `wrong` of them wrong.
fn play(quiz: &mut QuizSession, wrong: usize) {
    let mut idx = 0;
    loop {
        let q = quiz.current().unwrap();
        let pick = if idx < wrong {
            (q.correct_answer + 1) % q.options.len()
        } else {
            q.correct_answer
        };
        quiz.answer(pick).unwrap();
        idx += 1;
        if !quiz.next_question().unwrap() {
            break;
        }
    }
}

#[test]
fn missed_questions_feed_review_mode_until_answered() {
    let bank = question_bank_v1().unwrap();
    let mut tracker = ProgressTracker::new();

    let domain = QuizMode::Domain("1.0 General Security Concepts".to_string());
    let questions =
        select_questions(&bank, &domain, tracker.missed_questions(), ShuffleSeed::Fixed(3))
            .unwrap();
    let first_two: BTreeSet<u32> = questions.iter().take(2).map(|q| q.id).collect();
    let mut quiz = QuizSession::new(questions).unwrap();
    play(&mut quiz, 2);

    let report = quiz.report();
    assert_eq!(report.total, 15);
    assert_eq!(report.correct_count, 13);
    assert_eq!(report.score, 87);
    assert_eq!(report.by_domain()["1.0 General Security Concepts"], (13, 15));
    tracker.record_quiz(&report);
    assert_eq!(tracker.missed_questions(), &first_two);

    let review = select_questions(
        &bank,
        &QuizMode::Review,
        tracker.missed_questions(),
        ShuffleSeed::Entropy,
    )
    .unwrap();
    assert_eq!(review.len(), 2);
    let mut quiz = QuizSession::new(review).unwrap();
    play(&mut quiz, 0);
    assert_eq!(quiz.report().score, 100);
    tracker.record_quiz(&quiz.report());

    assert!(tracker.missed_questions().is_empty());
    assert_eq!(tracker.quizzes_taken(), 2);
    assert!(select_questions(
        &bank,
        &QuizMode::Review,
        tracker.missed_questions(),
        ShuffleSeed::Identity
    )
    .is_err());
}

#[test]
fn skipped_questions_count_as_missed() {
    let bank = question_bank_v1().unwrap();
    let questions = select_questions(
        &bank,
        &QuizMode::Random { count: 4 },
        &BTreeSet::new(),
        ShuffleSeed::Fixed(11),
    )
    .unwrap();
    let ids: Vec<u32> = questions.iter().map(|q| q.id).collect();
    let mut quiz = QuizSession::new(questions).unwrap();
    while quiz.next_question().unwrap() {}

    let report = quiz.report();
    assert_eq!(report.score, 0);
    assert_eq!(report.missed_ids(), ids);
    assert!(report.results.iter().all(|r| r.chosen.is_none()));
}
