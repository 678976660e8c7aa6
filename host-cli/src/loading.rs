//! # Loading 模块
//!
//! 加载界面的计时闸门。
//!
//! 闸门持有一个截止时间，由事件循环每轮调用 [`LoadingGate::poll`]。
//! 到期后恰好产出一次 `ShowTitle`；取消后永不产出。

use std::time::{Duration, Instant};

use story_runtime::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Pending(Instant),
    Fired,
    Cancelled,
}

/// 加载闸门
#[derive(Debug, Clone)]
pub struct LoadingGate {
    state: GateState,
}

impl LoadingGate {
    /// 从 `now` 起等待 `delay`
    pub fn new(now: Instant, delay: Duration) -> Self {
        Self {
            state: GateState::Pending(now + delay),
        }
    }

    /// 到期时返回 `ShowTitle`，之后不再返回
    pub fn poll(&mut self, now: Instant) -> Option<Action> {
        match self.state {
            GateState::Pending(deadline) if now >= deadline => {
                self.state = GateState::Fired;
                Some(Action::ShowTitle)
            }
            _ => None,
        }
    }

    /// 距到期的剩余时间；已触发或已取消时为 None
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            GateState::Pending(deadline) => Some(deadline.saturating_duration_since(now)),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        if matches!(self.state, GateState::Pending(_)) {
            self.state = GateState::Cancelled;
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, GateState::Pending(_))
    }
}
