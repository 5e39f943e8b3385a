pub mod run;
pub mod status;
pub mod template;
