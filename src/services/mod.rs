pub mod push;
pub mod timeout;
