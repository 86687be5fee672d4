pub mod aggregator;
pub mod dispatch;
pub mod error;
pub mod executable_utils;
pub mod model;
pub mod processor;
pub mod router;
pub mod scorers;
pub mod storage;
