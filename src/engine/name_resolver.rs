// ==========================================
// 标高导入系统 - 名称解析器
// ==========================================
// 阶段 5: 为新建标高与派生视图生成无冲突名称
// 红线: 比较不区分大小写；标高与视图的名称域互不干扰
// ==========================================
// 标高: "名称 (N)"，N 取使名称唯一的最小正整数
// 视图: "名称 (yyyyMMdd_HHmmss)"，仍冲突则 "名称 (yyyyMMdd_HHmmss_N)"
// ==========================================

use crate::domain::level::name_key;
use chrono::{DateTime, Local};
use std::collections::HashSet;

// ==========================================
// SuffixStrategy - 冲突后缀策略
// ==========================================
pub trait SuffixStrategy {
    /// 第 attempt 次（1 起）冲突时的候选名称
    fn candidate(&self, base: &str, attempt: usize) -> String;
}

/// 计数后缀 " (N)"
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSuffix;

impl SuffixStrategy for CounterSuffix {
    fn candidate(&self, base: &str, attempt: usize) -> String {
        format!("{} ({})", base, attempt)
    }
}

/// 时间戳后缀 " (yyyyMMdd_HHmmss)"，再冲突追加序号
#[derive(Debug, Clone)]
pub struct TimestampSuffix {
    stamp: String,
}

impl TimestampSuffix {
    pub fn at(now: DateTime<Local>) -> Self {
        Self {
            stamp: now.format("%Y%m%d_%H%M%S").to_string(),
        }
    }
}

impl SuffixStrategy for TimestampSuffix {
    fn candidate(&self, base: &str, attempt: usize) -> String {
        if attempt <= 1 {
            format!("{} ({})", base, self.stamp)
        } else {
            format!("{} ({}_{})", base, self.stamp, attempt - 1)
        }
    }
}

// ==========================================
// NameResolver - 名称解析器
// ==========================================
// 持有当前已知名称集合；每次 resolve 的结果立即登记
#[derive(Debug, Clone)]
pub struct NameResolver<S> {
    taken: HashSet<String>,
    strategy: S,
}

impl<S: SuffixStrategy> NameResolver<S> {
    pub fn new<I, N>(existing: I, strategy: S) -> Self
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        Self {
            taken: existing.into_iter().map(|n| name_key(n.as_ref())).collect(),
            strategy,
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&name_key(name))
    }

    /// 登记一个已存在的名称
    pub fn reserve(&mut self, name: &str) {
        self.taken.insert(name_key(name));
    }

    /// 释放名称（名称最终未被采用时）
    pub fn release(&mut self, name: &str) {
        self.taken.remove(&name_key(name));
    }

    /// 生成无冲突名称并登记
    pub fn resolve(&mut self, desired: &str) -> String {
        let base = desired.trim();
        let resolved = if !self.is_taken(base) {
            base.to_string()
        } else {
            (1..)
                .map(|attempt| self.strategy.candidate(base, attempt))
                .find(|candidate| !self.is_taken(candidate))
                .unwrap_or_else(|| base.to_string())
        };
        self.reserve(&resolved);
        resolved
    }
}

/// 标高名称解析器（计数后缀）
pub fn level_name_resolver<I, N>(existing: I) -> NameResolver<CounterSuffix>
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    NameResolver::new(existing, CounterSuffix)
}

/// 视图名称解析器（时间戳后缀）
pub fn view_name_resolver<I, N>(existing: I, now: DateTime<Local>) -> NameResolver<TimestampSuffix>
where
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    NameResolver::new(existing, TimestampSuffix::at(now))
}
