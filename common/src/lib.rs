//! 查询控制台公共模块
//!
//! 供各服务共享的配置、错误类型、响应包装、中间件与数据模型。

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
