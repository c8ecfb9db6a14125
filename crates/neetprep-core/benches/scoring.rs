use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use neetprep_core::catalog::dedup_by_id;
use neetprep_core::ids::QuestionId;
use neetprep_core::model::{OptionLabel, Question};
use neetprep_core::scoring::{score_attempt, MarkingScheme};

const SUBJECTS: [&str; 3] = ["phy", "chem", "bio"];

fn make_questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question {
            id: QuestionId::new(i.to_string()),
            body: format!("Question {i}"),
            image: None,
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: Some(OptionLabel::ALL[i % 4]),
            hint: None,
            question_type_id: if i % 5 == 0 { "assertion".into() } else { "mcq".into() },
            subject_id: SUBJECTS[i % 3].into(),
            chapter_id: format!("ch{}", i % 40).into(),
        })
        .collect()
}

fn make_answers(questions: &[Question]) -> HashMap<QuestionId, OptionLabel> {
    questions
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 4 != 3)
        .map(|(i, q)| (q.id.clone(), OptionLabel::ALL[(i / 2) % 4]))
        .collect()
}

fn bench_score_attempt(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_attempt");
    let scheme = MarkingScheme::default();

    for n in [45usize, 180, 720] {
        let questions = make_questions(n);
        let answers = make_answers(&questions);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| score_attempt(black_box(&questions), black_box(&answers), &scheme))
        });
    }

    group.finish();
}

fn bench_dedup(c: &mut Criterion) {
    let mut questions = make_questions(720);
    questions.extend(make_questions(180));

    c.bench_function("dedup_by_id/900", |b| {
        b.iter(|| dedup_by_id(black_box(questions.clone())))
    });
}

criterion_group!(benches, bench_score_attempt, bench_dedup);
criterion_main!(benches);
