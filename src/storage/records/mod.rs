pub(crate) mod message;
pub(crate) mod student;
pub(crate) mod user;
