pub mod response;

pub use response::{ActionResponse, ErrorBody, Page};
