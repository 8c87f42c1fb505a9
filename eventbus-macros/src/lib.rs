//! eventbus 过程宏
//!
//! 以静态方法表的方式声明监听器的订阅处理器，代替运行时反射。
//!
use proc_macro::TokenStream;

mod subscribers;

/// 监听器宏
/// - 标注在监听器类型的固有 `impl` 块上，每个类型只能标注一处
/// - 块内以 `#[subscribe]` 标注的方法成为订阅处理器：
///   接收 `&self`，且只声明一个 `&Event` 参数，返回 `()` 或 `Result<(), E>`
/// - `#[subscribe(priority = expr, label = "..", concurrent)]` 设置优先级、标签与并发进入
/// - `#[subscribers(extends(field, ..))]` 继承内嵌字段类型的订阅方法，
///   自身同名同事件的处理器优先
///
/// ```ignore
/// #[subscribers(extends(base))]
/// impl Auditor {
///     #[subscribe(priority = Priority::HIGHEST, label = "audit")]
///     fn on_login(&self, event: &Login) -> anyhow::Result<()> { .. }
/// }
/// ```
#[proc_macro_attribute]
pub fn subscribers(attr: TokenStream, item: TokenStream) -> TokenStream {
    subscribers::expand(attr, item)
}
