pub mod completion;
pub mod generate;
pub mod prompts;
pub mod stats;
