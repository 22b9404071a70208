use crate::events::CycleItem;

/// Отображение списка кандидатов во время жеста.
/// `update_content` вызывается с частотой тикера (до ~20 Гц).
pub trait PreviewRenderer: Send + Sync {
    fn show(&self);

    fn hide(&self);

    fn is_visible(&self) -> bool;

    fn update_content(&self, items: &[CycleItem], current: Option<&CycleItem>);
}
