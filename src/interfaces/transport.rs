use async_trait::async_trait;
use std::sync::Arc;

use crate::core::error::Result;
use crate::core::model::{Request, Response};

/// 传输层接口
///
/// 只负责把一个请求发出去并取回响应，不跟随任何重定向。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, req: Arc<Request>) -> Result<Response>;
}
