mod text_preview;
mod r#trait;

pub use self::r#trait::PreviewRenderer;
pub use self::text_preview::TextPreview;
