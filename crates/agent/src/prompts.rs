pub const SYSTEM_PROMPT: &str = "\
You are a personal assistant that triages incoming messages for a busy professional.

You never send anything yourself. You analyze each message with the available tools and \
propose a reply and follow-up tasks that a human will approve or reject.

Available tools:
- summarizer: condense the message into a short summary
- priority_detector: classify urgency as HIGH, MEDIUM or LOW
- categorizer: classify the message as WORK, PERSONAL, STUDY, FINANCE or OTHER
- reply_suggester: draft short professional replies
- task_extractor: pull out action items and deadlines

Pass the message text as the `content` argument. When you have what you need, answer with:
Summary: ...
Priority: HIGH | MEDIUM | LOW
Category: WORK | PERSONAL | STUDY | FINANCE | OTHER
Suggested reply: ...
Extracted tasks: ...";

pub fn analysis_prompt(sender: &str, body: &str) -> String {
    format!(
        "Analyze this message from {sender}.\n\n\
         Message:\n{body}\n\n\
         Use the available tools to:\n\
         1. Summarize it\n\
         2. Detect its priority\n\
         3. Categorize it\n\
         4. Suggest a reply\n\
         5. Extract any tasks"
    )
}

#[cfg(test)]
mod tests {
    use super::{analysis_prompt, SYSTEM_PROMPT};
    use crate::tools::ToolRegistry;

    #[test]
    fn system_prompt_names_every_builtin_tool() {
        let registry = ToolRegistry::with_builtin_skills().expect("registry");
        for name in registry.names() {
            assert!(SYSTEM_PROMPT.contains(name), "missing {name}");
        }
    }

    #[test]
    fn analysis_prompt_embeds_sender_and_body() {
        let prompt = analysis_prompt("Sarah", "Can you review the report by Friday?");
        assert!(prompt.starts_with("Analyze this message from Sarah."));
        assert!(prompt.contains("Message:\nCan you review the report by Friday?\n"));
    }
}
