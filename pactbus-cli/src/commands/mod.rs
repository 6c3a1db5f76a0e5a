pub mod project;
pub mod publish;
pub mod sniff;
