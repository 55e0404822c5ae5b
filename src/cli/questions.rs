use anyhow::{Context, Result};
use serde::Serialize;

use super::{OutputFormat, Target};
use crate::calendar::DirectoryService;
use crate::models::{select_service, CustomQuestion};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRow {
    pub id: String,
    pub display_name: String,
    pub answer_input_type: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub service: String,
    pub questions: Vec<QuestionRow>,
}

impl std::fmt::Display for QuestionsResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.questions.is_empty() {
            return writeln!(f, "{} asks no questions.", self.service);
        }
        writeln!(f, "{} asks:", self.service)?;
        for q in &self.questions {
            let marker = if q.required { " (required)" } else { "" };
            write!(f, "  {}{} [--answer {}=...]", q.display_name, marker, q.id)?;
            if !q.options.is_empty() {
                write!(f, " one of: {}", q.options.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

fn question_rows(questions: Vec<CustomQuestion>, required: &[&str]) -> Vec<QuestionRow> {
    questions
        .into_iter()
        .map(|q| QuestionRow {
            required: required.contains(&q.id.as_str()),
            id: q.id,
            display_name: q.display_name,
            answer_input_type: q.answer_input_type,
            options: q.answer_options,
        })
        .collect()
}

/// List the custom questions asked when booking a service
pub async fn run_questions(target: &Target, format: OutputFormat) -> Result<()> {
    let (client, session) = target.resolve()?;
    let services = client
        .list_services(session.slug())
        .await
        .context("Failed to list services")?;
    let service = select_service(&services, target.service.as_deref())
        .context("No services available for booking")?;

    let questions = if service.custom_questions.is_empty() {
        Vec::new()
    } else {
        let all = client
            .list_custom_questions(session.slug())
            .await
            .context("Failed to load custom questions")?;
        service.questions_from(&all)
    };
    let required: Vec<&str> = service.required_question_ids().collect();

    format.print(&QuestionsResponse {
        service: service.display_name.clone(),
        questions: question_rows(questions, &required),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_rows_mark_required() {
        let questions = vec![
            CustomQuestion {
                id: "q-1".to_string(),
                display_name: "Gate code".to_string(),
                answer_input_type: "text".to_string(),
                answer_options: Vec::new(),
            },
            CustomQuestion {
                id: "q-2".to_string(),
                display_name: "Parking".to_string(),
                answer_input_type: "radioButton".to_string(),
                answer_options: vec!["Street".to_string(), "Garage".to_string()],
            },
        ];

        let response = QuestionsResponse {
            service: "Repair".to_string(),
            questions: question_rows(questions, &["q-2"]),
        };

        assert!(!response.questions[0].required);
        assert!(response.questions[1].required);
        let text = response.to_string();
        assert!(text.contains("Parking (required) [--answer q-2=...] one of: Street, Garage"));
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["questions"][0].get("options").is_none());
        assert_eq!(json["questions"][1]["answerInputType"], "radioButton");
    }
}
