//! 档案服务
//!
//! CRUD 档案存储契约、内存实现、日志与指标装饰器，以及服务端端点。

pub mod endpoints;
pub mod middleware;
pub mod profile;
pub mod store;

pub use endpoints::{make_server_endpoint, ProfileRequest, ProfileResponse, ServerEndpoint};
pub use middleware::{
    InstrumentingLayer, InstrumentingService, LoggingLayer, LoggingService,
};
pub use profile::{Address, Profile};
pub use store::{InMemoryProfileService, ProfileService};
