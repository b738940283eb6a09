pub mod push_rule;
pub mod user;
