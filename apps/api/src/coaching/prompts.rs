// LLM prompt constants for the coaching module.

use crate::coaching::InterviewContext;

/// Fixed coach persona. Every coaching call uses this directive verbatim,
/// optionally extended with candidate context.
pub const COACH_SYSTEM: &str = "You are an expert interview coach helping a candidate
respond to interview questions. Your responses should be:

1. Concise (2-3 sentences max for quick reading)
2. Actionable (give specific talking points)
3. Structured (use STAR method when appropriate)
4. Natural (sound conversational, not robotic)
5. Confident (project competence and enthusiasm)

Provide the candidate with a suggested response they can use.";

/// Builds the system prompt: the fixed persona plus any caller-supplied
/// resume / job-description background.
pub fn build_system_prompt(context: &InterviewContext) -> String {
    let mut prompt = COACH_SYSTEM.to_string();

    if context.resume.is_some() || context.job_description.is_some() {
        prompt.push_str("\n\nContext:\n");
        if let Some(resume) = &context.resume {
            prompt.push_str(&format!("Candidate's background: {resume}\n"));
        }
        if let Some(jd) = &context.job_description {
            prompt.push_str(&format!("Job description: {jd}\n"));
        }
    }

    prompt
}

/// Frames the transcript as the user-turn question.
pub fn build_user_prompt(question: &str) -> String {
    format!("Interview question: {question}")
}
