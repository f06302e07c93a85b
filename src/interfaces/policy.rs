use crate::core::error::Result;
use crate::core::model::{Request, Response, SpiderContext};

/// 策略判定结果
#[derive(Debug)]
pub enum PolicyResult {
    /// 检查通过，将 Response 原样传递给下一个策略或 Parser
    Pass(Response),
    /// 需要发起后续请求
    Redirect(Request),
}

/// 响应策略接口
///
/// - 策略负责：识别跳转信号，构造后续请求及其元数据。
/// - 策略不负责：不发起请求，不修改原请求与原响应。
///
/// 返回 `Err` 意味着整条链路应被丢弃。
pub trait NetworkPolicy: Send + Sync + std::fmt::Debug {
    /// 策略名称 (用于调试/日志)
    fn name(&self) -> &str;

    /// 检查响应并决定后续行为
    /// @param resp: 原始响应（所有权转移，不跳转时原样交回）
    /// @param spider: 爬虫声明的状态码处理范围
    fn check(&self, resp: Response, spider: &SpiderContext) -> Result<PolicyResult>;
}

/// 请求策略接口
///
/// 在每次发送前（包括每个重定向后续请求）对请求做就地调整。
pub trait RequestPolicy: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn prepare(&self, req: &mut Request) -> Result<()>;
}
