use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "displayorder", rename_all = "lowercase")]
pub(crate) enum DisplayOrder {
    Natural,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questiontype", rename_all = "snake_case")]
pub(crate) enum QuestionType {
    Text,
    Url,
    LinkFile,
    Upload,
    TrueFalse,
    SingleCorrect,
    MultipleCorrect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "responsesubtype", rename_all = "snake_case")]
pub(crate) enum ResponseSubtype {
    Code,
    LiveRecording,
    Presentation,
}
