pub(crate) mod bpm;
pub(crate) mod map;
