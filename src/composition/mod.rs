pub(crate) mod compose;
pub(crate) mod timeline;
pub(crate) mod verify;
