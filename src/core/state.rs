use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::grade_callback::GradeRecorder;
use crate::services::grading::GradingDispatcher;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    dispatcher: GradingDispatcher,
    recorder: Arc<dyn GradeRecorder>,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        dispatcher: GradingDispatcher,
        recorder: Arc<dyn GradeRecorder>,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, dispatcher, recorder }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn dispatcher(&self) -> &GradingDispatcher {
        &self.inner.dispatcher
    }

    pub(crate) fn recorder(&self) -> &Arc<dyn GradeRecorder> {
        &self.inner.recorder
    }
}
