pub mod defaults;
pub mod issue;
