pub mod notification;
pub mod token;
