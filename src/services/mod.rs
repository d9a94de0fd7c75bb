pub mod conversation_service;
pub mod directory;
pub mod fanout;
pub mod health_service;
pub mod message_service;
