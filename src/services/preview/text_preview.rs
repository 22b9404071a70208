use crate::debug_if_enabled;
use crate::events::CycleItem;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use super::r#trait::PreviewRenderer;

/// Текстовое превью в лог.
///
/// Хранит хэш последнего содержимого и не перерисовывает одинаковое: частые
/// обновления от тикера не порождают ни новых строк в логе, ни аллокаций.
pub struct TextPreview {
    visible: AtomicBool,
    content_hash: AtomicU64,
    rendered: RwLock<Arc<str>>, // Arc<str> чтобы не клонировать текст при чтении
    renders: AtomicU64,
    max_items: usize,
}

impl TextPreview {
    pub fn new(max_items: usize) -> Self {
        Self {
            visible: AtomicBool::new(false),
            content_hash: AtomicU64::new(0),
            rendered: RwLock::new(Arc::from("")),
            renders: AtomicU64::new(0),
            max_items,
        }
    }

    /// Последний отрисованный текст
    pub fn rendered(&self) -> Arc<str> {
        self.rendered.read().clone()
    }

    /// Сколько раз содержимое реально перерисовывалось
    pub fn render_count(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }

    fn render(&self, items: &[CycleItem], current: Option<&CycleItem>) -> String {
        if items.is_empty() {
            return "(empty)".to_string();
        }

        let shown = if self.max_items == 0 {
            items.len()
        } else {
            items.len().min(self.max_items)
        };

        let mut lines: Vec<String> = items[..shown]
            .iter()
            .map(|item| {
                let marker = if Some(item) == current { '>' } else { ' ' };
                format!("{} {} ({})", marker, item.title, item.app_name)
            })
            .collect();

        if shown < items.len() {
            lines.push(format!("  ... ещё {}", items.len() - shown));
        }

        lines.join("\n")
    }

    fn log_rendered(&self) {
        info!("Превью окон:\n{}", self.rendered());
    }
}

impl PreviewRenderer for TextPreview {
    fn show(&self) {
        if !self.visible.swap(true, Ordering::SeqCst) {
            self.log_rendered();
        }
    }

    fn hide(&self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            info!("Превью скрыто");
        }
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn update_content(&self, items: &[CycleItem], current: Option<&CycleItem>) {
        let mut hasher = DefaultHasher::new();
        items.hash(&mut hasher);
        current.map(|c| c.process_id).hash(&mut hasher);
        let new_hash = hasher.finish();

        let old_hash = self.content_hash.swap(new_hash, Ordering::Relaxed);
        if old_hash == new_hash && self.render_count() > 0 {
            return;
        }

        *self.rendered.write() = self.render(items, current).into();
        self.renders.fetch_add(1, Ordering::Relaxed);
        debug_if_enabled!("Превью перерисовано ({} окон)", items.len());

        if self.is_visible() {
            self.log_rendered();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pid: u32, title: &str) -> CycleItem {
        CycleItem {
            process_id: pid,
            title: title.to_string(),
            app_name: "app".to_string(),
        }
    }

    #[test]
    fn test_renders_current_marker() {
        let preview = TextPreview::new(0);
        let items = vec![item(1, "one"), item(2, "two")];
        preview.update_content(&items, Some(&items[1]));

        assert_eq!(&*preview.rendered(), "  one (app)\n> two (app)");
    }

    #[test]
    fn test_empty_list() {
        let preview = TextPreview::new(0);
        preview.update_content(&[], None);
        assert_eq!(&*preview.rendered(), "(empty)");
    }

    #[test]
    fn test_identical_content_is_not_rerendered() {
        let preview = TextPreview::new(0);
        let items = vec![item(1, "one")];
        for _ in 0..20 {
            preview.update_content(&items, Some(&items[0]));
        }
        assert_eq!(preview.render_count(), 1);

        preview.update_content(&items, None);
        assert_eq!(preview.render_count(), 2);
    }

    #[test]
    fn test_max_items_truncates() {
        let preview = TextPreview::new(1);
        let items = vec![item(1, "one"), item(2, "two"), item(3, "three")];
        preview.update_content(&items, Some(&items[0]));
        assert_eq!(&*preview.rendered(), "> one (app)\n  ... ещё 2");
    }

    #[test]
    fn test_show_hide_visibility() {
        let preview = TextPreview::new(0);
        assert!(!preview.is_visible());
        preview.show();
        assert!(preview.is_visible());
        preview.hide();
        assert!(!preview.is_visible());
    }
}
