pub(crate) mod answer_recorder;
pub(crate) mod attempt_access;
pub(crate) mod attempt_builder;
pub(crate) mod attempt_timing;
pub(crate) mod errors;
pub(crate) mod flags;
pub(crate) mod grading;
pub(crate) mod randomness;
