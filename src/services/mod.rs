pub(crate) mod attempt_creation;
pub(crate) mod attempt_submission;
pub(crate) mod attempt_view;
pub(crate) mod content_fetch;
pub(crate) mod grade_callback;
pub(crate) mod grading;
pub(crate) mod oracle_client;
pub(crate) mod randomization;
pub(crate) mod score;
pub(crate) mod translation;
pub(crate) mod visibility;
