// Library root: re-exports all pipeline modules so integration tests and the
// binary share one public API.

pub mod dispatch;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod roster;
pub mod tasks;
pub mod worker;
