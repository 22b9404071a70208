//! CycleList: кольцо отслеживаемых окон.
//!
//! Кольцо хранится как арена узлов, индексированная PID процесса; связи `next`/`prev`
//! это PID соседей, а не указатели. Все публичные операции выполняются целиком под
//! одной блокировкой, внешние вызовы к оконной системе под ней не делаются.

use crate::error::Result;
use crate::events::{CycleItem, WindowSnapshot};
use crate::services::window_system::WindowSystem;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::{debug, info};

/// Результат `CycleList::focus_next`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    /// Курсор перемещён на открытое окно, запрошен фокус
    Focused(CycleItem),
    /// Обошли всё кольцо, открытых окон нет; курсор не изменился
    NoneOpen,
    /// Кольцо пустое
    Empty,
}

#[derive(Debug)]
struct Node {
    item: CycleItem,
    next: u32,
    prev: u32,
}

#[derive(Debug, Default)]
struct Ring {
    nodes: HashMap<u32, Node>,
    head: Option<u32>,
    current: Option<u32>,
}

impl Ring {
    fn insert_after_current(&mut self, item: CycleItem) -> bool {
        let pid = item.process_id;
        if self.nodes.contains_key(&pid) {
            return false;
        }

        match self.current {
            None => {
                self.nodes.insert(pid, Node { item, next: pid, prev: pid });
                self.head = Some(pid);
                self.current = Some(pid);
            }
            Some(current) => {
                let Some(after) = self.nodes.get(&current).map(|n| n.next) else {
                    return false;
                };
                if let Some(node) = self.nodes.get_mut(&after) {
                    node.prev = pid;
                }
                if let Some(node) = self.nodes.get_mut(&current) {
                    node.next = pid;
                }
                self.nodes.insert(pid, Node { item, next: after, prev: current });
            }
        }

        true
    }

    fn unlink(&mut self, pid: u32) -> Option<CycleItem> {
        let node = self.nodes.remove(&pid)?;

        if node.next == pid {
            // Последний элемент - кольцо опустело
            self.head = None;
            self.current = None;
            return Some(node.item);
        }

        if let Some(prev) = self.nodes.get_mut(&node.prev) {
            prev.next = node.next;
        }
        if let Some(next) = self.nodes.get_mut(&node.next) {
            next.prev = node.prev;
        }
        if self.head == Some(pid) {
            self.head = Some(node.next);
        }
        if self.current == Some(pid) {
            self.current = Some(node.next);
        }

        Some(node.item)
    }

    /// PID элементов по `next`, начиная со `start`, пока не вернёмся к нему
    fn walk_from(&self, start: u32) -> Vec<u32> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut id = start;
        loop {
            order.push(id);
            match self.nodes.get(&id) {
                Some(node) if node.next != start && order.len() < self.nodes.len() => id = node.next,
                _ => break,
            }
        }
        order
    }

    fn item(&self, pid: u32) -> Option<&CycleItem> {
        self.nodes.get(&pid).map(|n| &n.item)
    }

    #[cfg(test)]
    fn check_invariants(&self) -> std::result::Result<(), String> {
        let len = self.nodes.len();

        if len == 0 {
            if self.head.is_some() || self.current.is_some() {
                return Err("пустое кольцо с head/current".to_string());
            }
            return Ok(());
        }

        let head = self.head.ok_or("head отсутствует")?;
        let current = self.current.ok_or("current отсутствует")?;
        if !self.nodes.contains_key(&head) || !self.nodes.contains_key(&current) {
            return Err("head/current указывают вне арены".to_string());
        }

        for (pid, node) in &self.nodes {
            if node.item.process_id != *pid {
                return Err(format!("ключ {} не совпадает с PID элемента", pid));
            }
            let next = self.nodes.get(&node.next).ok_or(format!("висячий next у {}", pid))?;
            let prev = self.nodes.get(&node.prev).ok_or(format!("висячий prev у {}", pid))?;
            if next.prev != *pid || prev.next != *pid {
                return Err(format!("next/prev не взаимно обратны у {}", pid));
            }
        }

        for (step, direction) in [(true, "next"), (false, "prev")] {
            let mut seen = std::collections::HashSet::new();
            let mut id = head;
            for _ in 0..len {
                seen.insert(id);
                let node = &self.nodes[&id];
                id = if step { node.next } else { node.prev };
            }
            if id != head || seen.len() != len {
                return Err(format!("обход по {} не замыкается за {} шагов", direction, len));
            }
        }

        Ok(())
    }
}

/// Общее кольцо отслеживаемых окон с курсором фокуса
#[derive(Debug, Default)]
pub struct CycleList {
    ring: Mutex<Ring>,
}

impl CycleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить окно сразу после курсора. Повторное добавление того же PID - no-op.
    pub fn add(&self, snapshot: WindowSnapshot) -> bool {
        let window_id = snapshot.window_id.clone();
        let item = CycleItem::from(snapshot);
        let description = item.to_string();

        let added = self.ring.lock().insert_after_current(item);
        if added {
            info!("Добавлено окно: {} (окно {})", description, window_id);
        } else {
            info!("Окно уже в списке: {}", description);
        }
        added
    }

    /// Удалить окно по PID. Неизвестный PID - no-op.
    pub fn remove(&self, process_id: u32) -> Option<CycleItem> {
        let removed = self.ring.lock().unlink(process_id);
        match &removed {
            Some(item) => info!("Удалено окно: {}", item),
            None => info!("PID {} не отслеживается, удалять нечего", process_id),
        }
        removed
    }

    /// Перевести курсор на следующее открытое окно и запросить для него фокус.
    ///
    /// Кандидаты проверяются по порядку кольца начиная с элемента после курсора;
    /// сам курсор проверяется последним. Закрытые окна пропускаются, но из кольца
    /// не удаляются. Поиск окна и запрос фокуса выполняются без блокировки.
    pub fn focus_next(&self, window_system: &dyn WindowSystem) -> Result<FocusOutcome> {
        let candidates = {
            let ring = self.ring.lock();
            let Some(current) = ring.current else {
                info!("Список окон пуст");
                return Ok(FocusOutcome::Empty);
            };
            match ring.nodes.get(&current) {
                Some(node) => ring.walk_from(node.next),
                None => return Ok(FocusOutcome::Empty),
            }
        };

        for pid in candidates {
            let window = match window_system.find_window(pid) {
                Ok(window) => window,
                Err(e) => {
                    debug!("Окно процесса {} не найдено, пропускаем: {}", pid, e);
                    continue;
                }
            };

            let item = {
                let mut ring = self.ring.lock();
                let Some(item) = ring.item(pid).cloned() else {
                    // Удалено другим потоком пока мы проверяли
                    continue;
                };
                ring.current = Some(pid);
                item
            };

            window_system.focus(&window)?;
            info!("Фокус переключён на окно: {}", item);
            return Ok(FocusOutcome::Focused(item));
        }

        info!("В списке нет открытых окон");
        Ok(FocusOutcome::NoneOpen)
    }

    /// Снимок элементов начиная с курсора по `next`
    pub fn items(&self) -> Vec<CycleItem> {
        let ring = self.ring.lock();
        let Some(current) = ring.current else {
            return Vec::new();
        };
        ring.walk_from(current)
            .into_iter()
            .filter_map(|pid| ring.item(pid).cloned())
            .collect()
    }

    pub fn current(&self) -> Option<CycleItem> {
        let ring = self.ring.lock();
        ring.current.and_then(|pid| ring.item(pid).cloned())
    }

    /// Переставить курсор на уже отслеживаемое окно без изменения состава кольца.
    /// Используется WindowMonitor при сверке с активным окном.
    pub(crate) fn sync_current(&self, process_id: u32) -> bool {
        let mut ring = self.ring.lock();
        if !ring.nodes.contains_key(&process_id) {
            return false;
        }
        let changed = ring.current != Some(process_id);
        ring.current = Some(process_id);
        changed
    }

    pub fn len(&self) -> usize {
        self.ring.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, process_id: u32) -> bool {
        self.ring.lock().nodes.contains_key(&process_id)
    }

    /// Текстовый список от head, для логов
    pub fn describe(&self) -> String {
        let ring = self.ring.lock();
        let Some(head) = ring.head else {
            return "Список окон пуст".to_string();
        };

        let mut out = String::from("Окна в списке:");
        for pid in ring.walk_from(head) {
            if let Some(item) = ring.item(pid) {
                let marker = if ring.current == Some(pid) { '>' } else { ' ' };
                let _ = write!(out, "\n {} {}", marker, item);
            }
        }
        out
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        self.ring.lock().check_invariants()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowId;
    use crate::services::window_system::DryRunWindowSystem;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn snapshot(pid: u32) -> WindowSnapshot {
        WindowSnapshot {
            window_id: WindowId(format!("0x{:x}", pid)),
            process_id: pid,
            title: format!("window-{}", pid),
            app_name: "app".to_string(),
        }
    }

    fn pids(items: &[CycleItem]) -> Vec<u32> {
        items.iter().map(|i| i.process_id).collect()
    }

    fn desktop(pids: &[u32]) -> DryRunWindowSystem {
        let desktop = DryRunWindowSystem::new();
        for pid in pids {
            desktop.open_window(*pid, &format!("window-{}", pid), "app");
        }
        desktop
    }

    #[test]
    fn test_empty_list() {
        let list = CycleList::new();
        assert!(list.is_empty());
        assert!(list.items().is_empty());
        assert_eq!(list.current(), None);
        assert!(list.check_invariants().is_ok());
    }

    #[test]
    fn test_add_splices_after_current() {
        let list = CycleList::new();
        assert!(list.add(snapshot(1)));
        assert!(list.add(snapshot(2)));
        assert!(list.add(snapshot(3)));

        // Курсор остаётся на первом, новые вставляются сразу за ним
        assert_eq!(list.current().map(|i| i.process_id), Some(1));
        assert_eq!(pids(&list.items()), vec![1, 3, 2]);
        assert!(list.check_invariants().is_ok());
    }

    #[test]
    fn test_add_is_idempotent() {
        let list = CycleList::new();
        list.add(snapshot(1));
        list.add(snapshot(2));
        let before = pids(&list.items());

        assert!(!list.add(snapshot(2)));
        assert_eq!(list.len(), 2);
        assert_eq!(pids(&list.items()), before);
        assert!(list.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_only_member_empties_list() {
        let list = CycleList::new();
        list.add(snapshot(7));

        assert_eq!(list.remove(7).map(|i| i.process_id), Some(7));
        assert!(list.is_empty());
        assert_eq!(list.current(), None);
        assert_eq!(list.describe(), "Список окон пуст");
        assert!(list.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_current_advances_to_successor() {
        let list = CycleList::new();
        list.add(snapshot(1));
        list.add(snapshot(2));
        list.add(snapshot(3));
        // кольцо: 1 -> 3 -> 2

        list.remove(1);
        assert_eq!(list.current().map(|i| i.process_id), Some(3));
        assert_eq!(pids(&list.items()), vec![3, 2]);
        assert!(list.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_head_advances_head_to_successor() {
        let list = CycleList::new();
        list.add(snapshot(1));
        list.add(snapshot(2));
        list.add(snapshot(3));
        // кольцо: 1 -> 3 -> 2, head на 1
        assert!(list.sync_current(2));

        list.remove(1);
        let text = list.describe();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("   window-3"), "{}", text);
        assert!(lines[2].starts_with(" > window-2"), "{}", text);
        assert_eq!(list.current().map(|i| i.process_id), Some(2));
        assert!(list.check_invariants().is_ok());
    }

    #[test]
    fn test_remove_untracked_is_noop() {
        let list = CycleList::new();
        list.add(snapshot(1));
        assert!(list.remove(99).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_focus_next_on_empty_list() {
        let list = CycleList::new();
        let desktop = DryRunWindowSystem::new();
        assert_eq!(list.focus_next(&desktop).unwrap(), FocusOutcome::Empty);
        assert!(desktop.focus_history().is_empty());
    }

    #[test]
    fn test_focus_next_skips_closed_windows() {
        let list = CycleList::new();
        list.add(snapshot(1));
        list.add(snapshot(2));
        assert!(list.sync_current(2));
        list.add(snapshot(3));
        // кольцо: 1 -> 2 -> 3, курсор на 3
        assert!(list.sync_current(3));

        let desktop = desktop(&[1, 3]);
        let mut visited = Vec::new();
        for _ in 0..3 {
            match list.focus_next(&desktop).unwrap() {
                FocusOutcome::Focused(item) => visited.push(item.process_id),
                other => panic!("неожиданный результат: {:?}", other),
            }
        }

        assert_eq!(visited, vec![1, 3, 1]);
        assert_eq!(desktop.focus_history().len(), 3);
        // Закрытое окно осталось в кольце
        assert!(list.contains(2));
    }

    /// Считает обращения к find_window
    struct CountingLookups {
        inner: DryRunWindowSystem,
        lookups: std::sync::atomic::AtomicUsize,
    }

    impl WindowSystem for CountingLookups {
        fn active_window(&self) -> Result<crate::events::ActiveWindow> {
            self.inner.active_window()
        }

        fn find_window(&self, process_id: u32) -> Result<WindowId> {
            self.lookups.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.find_window(process_id)
        }

        fn focus(&self, window: &WindowId) -> Result<()> {
            self.inner.focus(window)
        }

        fn application_name(&self, process_id: u32) -> Result<String> {
            self.inner.application_name(process_id)
        }
    }

    #[test]
    fn test_focus_next_looks_up_each_candidate_once() {
        let list = CycleList::new();
        list.add(snapshot(1));
        list.add(snapshot(2));
        list.add(snapshot(3));
        // кольцо: 1 -> 3 -> 2, открыто только 2
        let system = CountingLookups {
            inner: desktop(&[2]),
            lookups: Default::default(),
        };

        match list.focus_next(&system).unwrap() {
            FocusOutcome::Focused(item) => assert_eq!(item.process_id, 2),
            other => panic!("неожиданный результат: {:?}", other),
        }
        // 3 закрыто, 2 найдено: ровно два запроса
        assert_eq!(system.lookups.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(system.inner.focus_history().len(), 1);
    }

    #[test]
    fn test_focus_next_all_closed_leaves_current() {
        let list = CycleList::new();
        list.add(snapshot(1));
        list.add(snapshot(2));
        list.add(snapshot(3));
        let desktop = DryRunWindowSystem::new();

        assert_eq!(list.focus_next(&desktop).unwrap(), FocusOutcome::NoneOpen);
        assert_eq!(list.current().map(|i| i.process_id), Some(1));
        assert!(desktop.focus_history().is_empty());
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_focus_next_single_open_item_refocuses_it() {
        let list = CycleList::new();
        list.add(snapshot(5));
        let desktop = desktop(&[5]);

        match list.focus_next(&desktop).unwrap() {
            FocusOutcome::Focused(item) => assert_eq!(item.process_id, 5),
            other => panic!("неожиданный результат: {:?}", other),
        }
    }

    #[test]
    fn test_sync_current_ignores_untracked() {
        let list = CycleList::new();
        list.add(snapshot(1));
        assert!(!list.sync_current(42));
        assert!(!list.sync_current(1));
        assert_eq!(list.current().map(|i| i.process_id), Some(1));
    }

    #[test]
    fn test_describe_marks_current() {
        let list = CycleList::new();
        list.add(snapshot(1));
        list.add(snapshot(2));
        list.sync_current(2);

        let text = list.describe();
        assert!(text.contains("  window-1"));
        assert!(text.contains("> window-2"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32),
        Remove(u32),
        Sync(u32),
        FocusNext,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0u32..8).prop_map(Op::Add),
            2 => (0u32..8).prop_map(Op::Remove),
            1 => (0u32..8).prop_map(Op::Sync),
            1 => Just(Op::FocusNext),
        ]
    }

    fn apply(list: &CycleList, desktop: &DryRunWindowSystem, op: &Op) {
        match op {
            Op::Add(pid) => {
                list.add(snapshot(*pid));
            }
            Op::Remove(pid) => {
                list.remove(*pid);
            }
            Op::Sync(pid) => {
                list.sync_current(*pid);
            }
            Op::FocusNext => {
                let _ = list.focus_next(desktop);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_ring_invariants_hold(ops in prop::collection::vec(op_strategy(), 0..64)) {
            let list = CycleList::new();
            let desktop = desktop(&[0, 2, 4, 6]);
            let mut expected = std::collections::HashSet::new();

            for op in &ops {
                apply(&list, &desktop, op);
                match op {
                    Op::Add(pid) => { expected.insert(*pid); }
                    Op::Remove(pid) => { expected.remove(pid); }
                    _ => {}
                }
                prop_assert_eq!(list.check_invariants(), Ok(()));
                prop_assert_eq!(list.len(), expected.len());
            }

            let mut seen = pids(&list.items());
            seen.sort_unstable();
            let mut expected: Vec<u32> = expected.into_iter().collect();
            expected.sort_unstable();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn prop_concurrent_mutation_keeps_invariants(
            scripts in prop::collection::vec(prop::collection::vec(op_strategy(), 1..40), 2..5)
        ) {
            let list = Arc::new(CycleList::new());
            let desktop = Arc::new(desktop(&[1, 3, 5, 7]));

            let workers: Vec<_> = scripts
                .into_iter()
                .map(|script| {
                    let list = Arc::clone(&list);
                    let desktop = Arc::clone(&desktop);
                    std::thread::spawn(move || {
                        for op in &script {
                            apply(&list, &desktop, op);
                            if let Err(e) = list.check_invariants() {
                                return Err(e);
                            }
                        }
                        Ok(())
                    })
                })
                .collect();

            for worker in workers {
                let result = worker.join().map_err(|_| TestCaseError::fail("поток упал"))?;
                prop_assert_eq!(result, Ok(()));
            }

            prop_assert_eq!(list.check_invariants(), Ok(()));
            let items = pids(&list.items());
            let unique: std::collections::HashSet<_> = items.iter().collect();
            prop_assert_eq!(unique.len(), items.len());
            prop_assert_eq!(items.len(), list.len());
        }
    }
}
