#![allow(dead_code)]

pub mod catalog;
pub mod media;
pub mod publisher;
pub mod store;
pub mod transcoder;
