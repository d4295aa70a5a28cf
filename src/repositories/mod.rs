pub(crate) mod assignments;
pub(crate) mod attempt_variants;
pub(crate) mod attempts;
pub(crate) mod questions;
pub(crate) mod responses;
pub(crate) mod translations;
