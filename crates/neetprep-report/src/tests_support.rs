use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use neetprep_core::ids::{ChapterId, QuestionTypeId, SubjectId};
use neetprep_core::model::TestVariant;
use neetprep_core::report::ResultRecord;
use neetprep_core::scoring::{ChapterBreakdown, Tally, TypeBreakdown};

fn tally(attempted: u32, correct: u32) -> Tally {
    Tally {
        attempted,
        correct,
        wrong: attempted - correct,
    }
}

/// Four questions, three answered, two right.
pub fn make_record() -> ResultRecord {
    let mut subjects = BTreeMap::new();
    subjects.insert(SubjectId::from("phy"), tally(3, 2));

    let mut by_type = BTreeMap::new();
    by_type.insert(
        QuestionTypeId::from("mcq"),
        TypeBreakdown {
            tally: tally(3, 2),
            subjects,
        },
    );

    let mut by_chapter = BTreeMap::new();
    by_chapter.insert(
        ChapterId::from("laws-of-motion"),
        ChapterBreakdown {
            subject_id: SubjectId::from("phy"),
            tally: tally(2, 1),
        },
    );
    by_chapter.insert(
        ChapterId::from("units"),
        ChapterBreakdown {
            subject_id: SubjectId::from("phy"),
            tally: tally(1, 1),
        },
    );

    ResultRecord {
        id: Uuid::new_v4(),
        user_id: "learner-7".into(),
        variant: TestVariant::ByPortion {
            portion: "11".into(),
        },
        score: 3,
        total_marks: 16,
        total_questions: 4,
        answered: 3,
        correct: 2,
        wrong: 1,
        unanswered: 1,
        accuracy: 67,
        total_time_taken: "2:05".into(),
        elapsed_secs: 125,
        total_time_secs: 240,
        results_by_type: by_type,
        results_by_chapter: by_chapter,
        completed_at: Utc::now(),
    }
}
