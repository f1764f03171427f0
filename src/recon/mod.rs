pub mod archive;
pub mod audit;
pub mod classify;
pub mod config;
pub mod filename;
pub mod kind;
pub mod ledger;
pub mod notify;
pub mod paths;
pub mod payload;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod summary;
pub mod util;
pub mod warn;
