//! 原型 Bean 创建跟踪
//!
//! 单例的“正在创建”集合是全局的（创建过程持有单例锁），
//! 原型可以在多个线程上同时创建，所以按线程分别记录。

use std::collections::{HashMap, HashSet};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

/// 按线程记录正在创建的 Bean
#[derive(Debug, Default)]
pub struct CreationTracker {
    creating: Mutex<HashMap<ThreadId, HashSet<String>>>,
}

impl CreationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前线程是否正在创建 name
    pub fn is_creating(&self, name: &str) -> bool {
        self.creating
            .lock()
            .get(&thread::current().id())
            .map_or(false, |names| names.contains(name))
    }

    /// 标记当前线程开始创建 name
    ///
    /// 返回 `false` 表示当前线程已经在创建它（循环引用）
    pub fn start_creating(&self, name: &str) -> bool {
        self.creating
            .lock()
            .entry(thread::current().id())
            .or_default()
            .insert(name.to_string())
    }

    /// 标记当前线程完成创建 name
    pub fn finish_creating(&self, name: &str) {
        let id = thread::current().id();
        let mut creating = self.creating.lock();
        if let Some(names) = creating.get_mut(&id) {
            names.remove(name);
            if names.is_empty() {
                creating.remove(&id);
            }
        }
    }

    /// 当前线程正在创建的 Bean
    pub fn current_creating(&self) -> Vec<String> {
        self.creating
            .lock()
            .get(&thread::current().id())
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 标记开始创建，返回的守卫在离开作用域时结束标记
    pub fn guard<'a>(&'a self, name: &str) -> CreationGuard<'a> {
        self.start_creating(name);
        CreationGuard {
            tracker: self,
            name: name.to_string(),
        }
    }
}

/// RAII guard：无论创建成功还是失败都会清理标记
pub struct CreationGuard<'a> {
    tracker: &'a CreationTracker,
    name: String,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish_creating(&self.name);
    }
}
