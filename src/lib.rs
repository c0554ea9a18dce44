//! pitchboard: a small self-hosted board for publishing and browsing
//! startup pitches. Content lives in a hosted Sanity dataset; this
//! service renders the pages, validates submissions, stages uploaded
//! images and runs the submission pipeline against the content store.

pub mod config;
pub mod db;
pub mod intake;
pub mod maint;
pub mod model;
pub mod pipeline;
pub mod sanity;
pub mod session;
pub mod slug;
pub mod validate;
pub mod web;
