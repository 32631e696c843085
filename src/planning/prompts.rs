//! User prompts sent to the plan generator

use serde::Serialize;

use crate::domain::PlanItem;

#[derive(Serialize)]
struct PromptItem<'a> {
    title: &'a str,
    level: u8,
    comments: &'a str,
}

#[derive(Serialize)]
struct PromptPlan<'a> {
    #[serde(rename = "planItems")]
    plan_items: Vec<PromptItem<'a>>,
}

/// Current plan as pretty JSON, reduced to the fields the model may change
pub fn plan_json(plan: &[PlanItem]) -> String {
    let prompt_plan = PromptPlan {
        plan_items: plan
            .iter()
            .map(|item| PromptItem {
                title: &item.title,
                level: item.level.as_u8(),
                comments: &item.comments,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&prompt_plan).unwrap_or_else(|_| "{\"planItems\": []}".to_string())
}

/// User prompt for updating an existing plan
pub fn update_prompt(plan: &[PlanItem], request: &str) -> String {
    format!(
        "Here is my current plan:\n{}\n\nI want to update it as follows: {}",
        plan_json(plan),
        request.trim()
    )
}
