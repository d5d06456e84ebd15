pub mod headers;
pub mod json_response;
pub mod request_data;
pub mod validate;

pub use json_response::api_return;
pub use request_data::{ApiRequest, RequestData};
