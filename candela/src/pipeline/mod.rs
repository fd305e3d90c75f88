//! Stages of one symbol's ingestion cycle and the batch runner that drives them.
pub mod backoff;
pub mod batch;
pub mod cycle;
pub mod fetch;
pub mod heal;
pub mod strategy;
