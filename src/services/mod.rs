pub mod dispatcher;
pub mod token_registry;
