use crate::JobRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Analyze { url: String },
    IssueCommand(JobRequest),
    Notify { title: String, body: String },
}
