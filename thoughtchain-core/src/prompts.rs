//! Prompt templates and message layout

use crate::classifier::TaskType;
use thoughtchain_provider::ChatMessage;

pub const CLASSIFICATION_PROMPT: &str = "\
Analyze the user's request and determine:
1. The most appropriate task type, one of: product_development, scientific_research, creative_writing, coding, general
2. Relevant evaluation criteria (comma-separated list)

Respond in exactly this format:
Task Type: [determined task type]
Evaluation Criteria: [criterion1, criterion2, ...]";

const SELF_EVALUATION_TEMPLATE: &str = "\
Rate the following thought process on a scale from 0 to 1, where 0 is completely flawed and 1 is flawless:

{thought_process}

Judge it on:
1. Logical coherence
2. Depth of analysis
3. Consideration of alternative viewpoints
4. Use of relevant information
5. Clarity of expression

Reply with a single number between 0 and 1 and nothing else.";

/// Structured instructions for one task type
pub fn task_template(task: TaskType) -> &'static str {
    match task {
        TaskType::ProductDevelopment => "\
You are an expert in product development. Work through these steps:
1. Identify the core problem or need from market trends and user pain points.
2. Explore technological innovations that could address it.
3. Develop candidate solutions or products.
4. Compare the candidates on cost, feasibility and likely market reception.
5. Propose a solution based on that comparison.",
        TaskType::ScientificResearch => "\
You are a seasoned scientist. Structure your reasoning like this:
1. State the research question or hypothesis precisely.
2. Summarize the existing literature that frames it.
3. Outline a methodology and the rationale for each step.
4. Account for variables, controls and limitations.
5. Predict outcomes and suggest next steps.",
        TaskType::CreativeWriting => "\
You are a creative writer. Let this structure guide you:
1. Define the core theme or emotion to explore.
2. Develop the main characters: motivations, conflicts, backstory.
3. Outline the story arc through climax and resolution.
4. Use literary devices such as metaphor, symbolism or foreshadowing.
5. Reflect on how the story answers or challenges the theme.",
        TaskType::Coding => "\
You are an experienced programmer. Approach the problem like this:
1. Clarify the task and pin down the requirements.
2. Break it into small, manageable parts.
3. Write the code for each part and explain the approach.
4. Keep the code readable, idiomatic and efficient.
5. Test against edge cases and propose improvements.",
        TaskType::General => "\
You are a knowledgeable assistant. Work through these steps:
1. Clarify the request and break it into smaller parts if needed.
2. Present relevant background information.
3. Explore several possible solutions or viewpoints.
4. Weigh the pros and cons of each.
5. Recommend a course of action based on the analysis.",
    }
}

/// System prompt for thought iteration `iteration` (1-based)
pub fn thought_prompt(
    task: TaskType,
    iteration: u32,
    solution_marker: &str,
    dead_end_marker: &str,
) -> String {
    let mut prompt = format!("This is iteration {} of the thought process.\n", iteration);
    if iteration > 1 {
        prompt.push_str("Refine and expand upon the previous thoughts instead of starting over.\n");
    }
    prompt.push_str("Follow the structured process below to keep a logical flow:\n");
    prompt.push_str(task_template(task));
    prompt.push_str(
        "\n\nExplore hypothetical \"what-if\" scenarios and potential counterarguments.\n\
         Incorporate quantitative analysis where appropriate.\n",
    );
    prompt.push_str(&format!(
        "If you reach a dead end, state \"{}\" and explain why, then suggest a new approach.\n\
         If you are convinced you have found a solution, state \"{}\" followed by a brief explanation.\n",
        dead_end_marker, solution_marker
    ));
    prompt.push_str("Do not return a final answer, only the step-by-step thought process.");
    prompt
}

/// System prompt for the final answer
pub fn final_answer_prompt(thought_process: &str, criteria: &[String]) -> String {
    format!(
        "You are providing a final answer based on the following thought process:\n\n\
         {}\n\n\
         Evaluate the solution against these criteria: {}.\n\
         Provide citations for any factual claims or data points.\n\
         Consider potential limitations or areas for further research.\n\
         Give one concise and clear final answer to the user's request.",
        thought_process,
        criteria.join(", ")
    )
}

pub fn self_evaluation_prompt(thought_process: &str) -> String {
    SELF_EVALUATION_TEMPLATE.replace("{thought_process}", thought_process)
}

/// Lay out one request: recent history, then the system prompt (with the
/// previous thought process appended when there is one), then the user
/// request context.
pub fn build_messages(
    history: Vec<ChatMessage>,
    system_prompt: &str,
    thought_process: Option<&str>,
    request_context: &str,
) -> Vec<ChatMessage> {
    let mut system = system_prompt.to_string();
    if let Some(previous) = thought_process.filter(|t| !t.is_empty()) {
        system.push_str("\n\nPrevious thought process:\n");
        system.push_str(previous);
    }

    let mut messages = history;
    messages.push(ChatMessage::system(system));
    messages.push(ChatMessage::user(request_context));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use thoughtchain_provider::Role;

    #[test]
    fn test_first_iteration_does_not_ask_to_refine() {
        let prompt = thought_prompt(TaskType::Coding, 1, "SOLUTION FOUND:", "DEAD END:");
        assert!(prompt.starts_with("This is iteration 1 of the thought process."));
        assert!(!prompt.contains("Refine"));
        assert!(prompt.contains("experienced programmer"));
        assert!(prompt.contains("\"SOLUTION FOUND:\""));
        assert!(prompt.contains("\"DEAD END:\""));
        assert!(prompt.ends_with("only the step-by-step thought process."));
    }

    #[test]
    fn test_later_iterations_refine() {
        let prompt = thought_prompt(TaskType::General, 3, "DONE:", "STUCK:");
        assert!(prompt.contains("iteration 3"));
        assert!(prompt.contains("Refine and expand upon the previous thoughts"));
        assert!(prompt.contains("\"DONE:\""));
    }

    #[test]
    fn test_every_task_has_a_template() {
        for task in TaskType::ALL {
            assert!(!task_template(task).is_empty());
        }
    }

    #[test]
    fn test_final_answer_prompt() {
        let criteria = vec!["clarity".to_string(), "accuracy".to_string()];
        let prompt = final_answer_prompt("\n\nIteration 1:\nthink", &criteria);
        assert!(prompt.contains("Iteration 1:\nthink"));
        assert!(prompt.contains("criteria: clarity, accuracy."));
        assert!(prompt.contains("citations"));
        assert!(prompt.contains("limitations"));
    }

    #[test]
    fn test_self_evaluation_prompt_embeds_process() {
        let prompt = self_evaluation_prompt("step one");
        assert!(prompt.contains("\n\nstep one\n\n"));
        assert!(!prompt.contains("{thought_process}"));
    }

    #[test]
    fn test_build_messages_layout() {
        let history = vec![ChatMessage::user("earlier"), ChatMessage::assistant("reply")];
        let messages = build_messages(history, "SYSTEM", Some("\n\nIteration 1:\nx"), "request");

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::System, Role::User]);
        assert_eq!(
            messages[2].content,
            "SYSTEM\n\nPrevious thought process:\n\n\nIteration 1:\nx"
        );
        assert_eq!(messages[3].content, "request");
    }

    #[test]
    fn test_build_messages_without_thoughts() {
        let messages = build_messages(Vec::new(), "SYSTEM", Some(""), "request");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "SYSTEM");

        let messages = build_messages(Vec::new(), "SYSTEM", None, "request");
        assert_eq!(messages[0].content, "SYSTEM");
    }
}
