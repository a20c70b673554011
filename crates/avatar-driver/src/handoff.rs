//! 单写单读交接缓冲（三缓冲）
//!
//! 写端和读端各自持有一个私有槽位，第三个槽位作为"中间槽"。
//! 写端写完私有槽后，用一次原子 swap 把它换成中间槽，并置新数据标志；
//! 读端发现标志后同样用一次 swap 取走中间槽。
//!
//! - 写端永远不等待读端（swap 只交换索引）
//! - 读端看到的总是某一次完整的 publish，不会撕裂
//! - 读端看到的数据只会越来越新，不会回退
//!
//! 槽位上的 `Mutex` 只用来向编译器证明独占访问：索引协议保证
//! 三个槽位同一时刻分属不同角色，因此锁永远不会发生竞争。
//!
//! [`HandoffWriter`] / [`HandoffReader`] 不实现 `Clone`，
//! 单写单读由类型系统保证。

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const INDEX_MASK: u8 = 0b011;
const FRESH_BIT: u8 = 0b100;

struct Slots<T> {
    slots: [Mutex<T>; 3],
    /// 中间槽位索引（低 2 位）+ 新数据标志
    middle: AtomicU8,
}

/// 创建交接缓冲，三个槽位都初始化为 `initial`
pub fn handoff<T: Clone>(initial: T) -> (HandoffWriter<T>, HandoffReader<T>) {
    let shared = Arc::new(Slots {
        slots: [
            Mutex::new(initial.clone()),
            Mutex::new(initial.clone()),
            Mutex::new(initial),
        ],
        middle: AtomicU8::new(1),
    });

    (
        HandoffWriter {
            shared: shared.clone(),
            index: 0,
        },
        HandoffReader { shared, index: 2 },
    )
}

/// 写端（唯一）
pub struct HandoffWriter<T> {
    shared: Arc<Slots<T>>,
    index: u8,
}

impl<T> HandoffWriter<T> {
    /// 在私有槽位上原地写入，然后发布
    ///
    /// 闭包拿到的是上上次发布后留下的旧值，适合 `copy_from` 式覆盖，
    /// 容量足够时不产生分配。
    pub fn publish_with(&mut self, write: impl FnOnce(&mut T)) {
        {
            let mut slot = self.shared.slots[self.index as usize].lock();
            write(&mut slot);
        }
        let previous = self
            .shared
            .middle
            .swap(self.index | FRESH_BIT, Ordering::AcqRel);
        self.index = previous & INDEX_MASK;
    }

    /// 发布一个值（`clone_from` 覆盖私有槽位）
    pub fn publish(&mut self, value: &T)
    where
        T: Clone,
    {
        self.publish_with(|slot| slot.clone_from(value));
    }
}

/// 读端（唯一）
pub struct HandoffReader<T> {
    shared: Arc<Slots<T>>,
    index: u8,
}

impl<T> HandoffReader<T> {
    /// 如果有新发布，换入最新槽位
    ///
    /// 返回是否换入了新数据。
    pub fn refresh(&mut self) -> bool {
        if self.shared.middle.load(Ordering::Acquire) & FRESH_BIT == 0 {
            return false;
        }
        let previous = self.shared.middle.swap(self.index, Ordering::AcqRel);
        self.index = previous & INDEX_MASK;
        true
    }

    /// 刷新后在最新值上执行只读闭包
    pub fn read_with<R>(&mut self, read: impl FnOnce(&T) -> R) -> R {
        self.refresh();
        let slot = self.shared.slots[self.index as usize].lock();
        read(&slot)
    }

    /// 刷新并返回最新值的副本
    pub fn latest(&mut self) -> T
    where
        T: Clone,
    {
        self.read_with(T::clone)
    }

    /// 刷新一次，然后在当前槽位上执行只读闭包
    ///
    /// 返回这次刷新是否换入了新数据。闭包内不再刷新，
    /// 期间落地的发布留给下一次调用报告。
    pub fn update_with(&mut self, read: impl FnOnce(&T)) -> bool {
        let fresh = self.refresh();
        let slot = self.shared.slots[self.index as usize].lock();
        read(&slot);
        fresh
    }

    /// 刷新并把最新值复制到 `dst`
    ///
    /// 返回自上次读取以来是否有新发布。
    pub fn latest_into(&mut self, dst: &mut T) -> bool
    where
        T: Clone,
    {
        self.update_with(|slot| dst.clone_from(slot))
    }
}
