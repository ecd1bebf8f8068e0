use serde::{Deserialize, Serialize};

pub type QuestionId = i32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub question: String,
    #[serde(default = "default_marks")]
    pub marks: i32,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

fn default_marks() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    FreeText,
    Code,
}

impl QuestionType {
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

/// Everything `fetchQuestions` returns for a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSet {
    pub duration_minutes: i32,
    #[serde(default)]
    pub total_marks: i32,
    #[serde(default)]
    pub instructions: Option<String>,
    pub questions: Vec<Question>,
}

impl QuestionSet {
    pub fn duration_seconds(&self) -> u64 {
        (self.duration_minutes.max(0) as u64) * 60
    }

    pub fn find(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_backend_question_shape() {
        let raw = json!({
            "duration_minutes": 45,
            "questions": [
                {"id": 1, "type": "single_choice", "question": "2+2?", "options": ["3", "4"]},
                {"id": 2, "type": "code", "question": "Reverse a list", "marks": 5, "language": "rust"}
            ]
        });
        let set: QuestionSet = serde_json::from_value(raw).unwrap();
        assert_eq!(set.duration_seconds(), 2_700);
        assert_eq!(set.questions[0].marks, 1);
        assert_eq!(set.find(2).map(|q| q.question_type), Some(QuestionType::Code));
        assert!(set.questions[1].options.is_empty());
    }
}
