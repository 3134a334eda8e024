#![forbid(unsafe_code)]

//! Core: host input events and pixel geometry for the Stu walkthrough.

pub mod event;
pub mod geometry;
