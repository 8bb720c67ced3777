// AI screening collaborators.
// Turn uploaded files into text, text into assessed candidates, and recruiter
// feedback into fresh buckets. All LLM calls go through llm_client.

pub mod extract;
pub mod prompts;
pub mod rescoring;
pub mod resume_parser;
