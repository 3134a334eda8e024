#![forbid(unsafe_code)]

//! Headless host for the Stu walkthrough.

pub mod cli;
pub mod script;
pub mod tee;
