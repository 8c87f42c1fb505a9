//! 订阅优先级（Priority）
//!
//! 数值越大越先执行；同一优先级按注册先后执行。
//!
use std::fmt;

/// 订阅方法的优先级
///
/// 常用档位以关联常量给出，也可以直接使用任意整数：
///
/// ```
/// use eventbus::Priority;
///
/// assert!(Priority::HIGHEST > Priority::NORMAL);
/// assert_eq!(Priority::default(), Priority::NORMAL);
/// assert_eq!(Priority::from(250).value(), 250);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(i32);

impl Priority {
    pub const LOWEST: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(100);
    pub const HIGH: Priority = Priority(200);
    pub const HIGHER: Priority = Priority(300);
    pub const HIGHEST: Priority = Priority(400);

    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
